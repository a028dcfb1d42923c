use crate::media::{MediaConstraints, MediaHandle, MediaSource, MediaTrack, TrackKind};
use async_trait::async_trait;
use bytes::Bytes;
use duet_core::SignalingError;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// One 20 ms Opus frame of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
const FRAME: Duration = Duration::from_millis(20);

/// [`MediaSource`] producing sample-based tracks without capture hardware.
///
/// Audio can be fed with Opus silence so a real peer connection has packets to send.
#[derive(Debug, Clone, Default)]
pub struct SampleMediaSource {
    denied: Option<String>,
    feed_silence: bool,
}

impl SampleMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that refuses every request, like a user declining the permission prompt.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            denied: Some(reason.into()),
            feed_silence: false,
        }
    }

    pub fn with_silence(mut self) -> Self {
        self.feed_silence = true;
        self
    }
}

#[async_trait]
impl MediaSource for SampleMediaSource {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<MediaHandle, SignalingError> {
        if let Some(reason) = &self.denied {
            return Err(SignalingError::MediaUnavailable(reason.clone()));
        }
        if !constraints.audio && !constraints.video {
            return Err(SignalingError::MediaUnavailable(
                "no audio or video requested".to_string(),
            ));
        }

        let stream_id = format!("duet-{}", Uuid::new_v4());
        let mut tracks = Vec::new();

        if constraints.audio {
            let track = sample_track(TrackKind::Audio, &stream_id);
            if self.feed_silence {
                spawn_silence(Arc::downgrade(&track.local));
            }
            tracks.push(track);
        }
        if constraints.video {
            tracks.push(sample_track(TrackKind::Video, &stream_id));
        }

        info!("Acquired local media {} ({} track(s))", stream_id, tracks.len());
        Ok(MediaHandle {
            id: stream_id,
            tracks,
        })
    }
}

fn sample_track(kind: TrackKind, stream_id: &str) -> MediaTrack {
    let capability = match kind {
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48_000,
            channels: 2,
            ..Default::default()
        },
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90_000,
            ..Default::default()
        },
    };
    let id = format!("{}-{}", kind, Uuid::new_v4());
    let local = Arc::new(TrackLocalStaticSample::new(
        capability,
        id.clone(),
        stream_id.to_owned(),
    ));

    MediaTrack {
        id,
        kind,
        stream_id: stream_id.to_owned(),
        local,
    }
}

/// Write silence until the track is dropped.
fn spawn_silence(track: Weak<TrackLocalStaticSample>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(FRAME);
        loop {
            ticker.tick().await;
            let Some(track) = track.upgrade() else { break };
            let sample = Sample {
                data: Bytes::from_static(&OPUS_SILENCE),
                duration: FRAME,
                ..Default::default()
            };
            if let Err(e) = track.write_sample(&sample).await {
                debug!("Silence feeder stopped: {}", e);
                break;
            }
        }
    });
}
