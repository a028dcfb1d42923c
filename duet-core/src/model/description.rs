use crate::error::SignalingError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SdpKind::Offer => "offer",
            SdpKind::Answer => "answer",
            SdpKind::Pranswer => "pranswer",
            SdpKind::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// Session description as exchanged on the wire: `{"type": "offer", "sdp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionSide {
    Local,
    Remote,
}

impl fmt::Display for DescriptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptionSide::Local => f.write_str("local"),
            DescriptionSide::Remote => f.write_str("remote"),
        }
    }
}

/// Signaling state of a transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SignalingState {
    #[default]
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    HaveLocalPranswer,
    HaveRemotePranswer,
    Closed,
}

impl SignalingState {
    /// State reached by applying a description of `kind` on `side`.
    ///
    /// Follows the JSEP transition table; anything else is rejected with
    /// [`SignalingError::InvalidSignalingState`] before the transport is touched.
    pub fn apply(
        self,
        side: DescriptionSide,
        kind: SdpKind,
    ) -> Result<SignalingState, SignalingError> {
        use DescriptionSide::{Local, Remote};
        use SdpKind::{Answer, Offer, Pranswer, Rollback};
        use SignalingState::*;

        let next = match (self, side, kind) {
            (Stable | HaveLocalOffer, Local, Offer) => Some(HaveLocalOffer),
            (HaveRemoteOffer | HaveLocalPranswer, Local, Pranswer) => Some(HaveLocalPranswer),
            (HaveRemoteOffer | HaveLocalPranswer, Local, Answer) => Some(Stable),
            (HaveLocalOffer, Local, Rollback) => Some(Stable),
            (Stable | HaveRemoteOffer, Remote, Offer) => Some(HaveRemoteOffer),
            (HaveLocalOffer | HaveRemotePranswer, Remote, Pranswer) => Some(HaveRemotePranswer),
            (HaveLocalOffer | HaveRemotePranswer, Remote, Answer) => Some(Stable),
            (HaveRemoteOffer, Remote, Rollback) => Some(Stable),
            _ => None,
        };

        next.ok_or_else(|| SignalingError::InvalidSignalingState {
            state: self.to_string(),
            operation: format!("set {side} {kind}"),
        })
    }

    /// Whether an answer can be created in this state.
    pub fn can_answer(self) -> bool {
        matches!(
            self,
            SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPranswer
        )
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalingState::Stable => "stable",
            SignalingState::HaveLocalOffer => "have-local-offer",
            SignalingState::HaveRemoteOffer => "have-remote-offer",
            SignalingState::HaveLocalPranswer => "have-local-pranswer",
            SignalingState::HaveRemotePranswer => "have-remote-pranswer",
            SignalingState::Closed => "closed",
        };
        f.write_str(name)
    }
}
