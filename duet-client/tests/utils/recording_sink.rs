use duet_client::{BoundMedia, MediaSink, Surface};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Bind(Surface, usize),
    Clear(Surface),
}

/// MediaSink that remembers every call.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn binds_for(&self, surface: &Surface) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Bind(s, _) if s == surface))
            .count()
    }

    pub fn was_cleared(&self, surface: &Surface) -> bool {
        self.calls().contains(&SinkCall::Clear(surface.clone()))
    }
}

impl MediaSink for RecordingSink {
    fn bind(&self, surface: &Surface, media: &BoundMedia) {
        let tracks = match media {
            BoundMedia::Local(handle) => handle.tracks.len(),
            BoundMedia::Remote(remote) => remote.len(),
        };
        tracing::debug!("[RecordingSink] bind {:?} ({} tracks)", surface, tracks);
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Bind(surface.clone(), tracks));
    }

    fn clear(&self, surface: &Surface) {
        tracing::debug!("[RecordingSink] clear {:?}", surface);
        self.calls.lock().unwrap().push(SinkCall::Clear(surface.clone()));
    }
}
