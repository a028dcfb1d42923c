mod attachment;
mod local_media;

pub use attachment::*;
pub use local_media::*;

use async_trait::async_trait;
use duet_core::SignalingError;
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

/// A captured local track.
#[derive(Clone)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
    pub local: Arc<TrackLocalStaticSample>,
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// Local stream, acquired once per call attempt.
#[derive(Debug, Clone)]
pub struct MediaHandle {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
}

/// Inbound stream from a counterpart. Grows as the transport surfaces tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteMedia {
    pub tracks: Vec<RemoteTrack>,
}

impl RemoteMedia {
    /// Returns false if a track with the same id is already present.
    pub fn add(&mut self, track: RemoteTrack) -> bool {
        if self.tracks.iter().any(|t| t.id == track.id) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.tracks.first().map(|t| t.stream_id.as_str())
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }
}

/// Local capture device access.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Fails with [`SignalingError::MediaUnavailable`] when permission is refused or no
    /// device matches the constraints.
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaHandle, SignalingError>;
}
