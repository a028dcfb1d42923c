use crate::media::{MediaHandle, RemoteMedia};
use duet_core::ConnectionId;
use std::collections::HashMap;
use std::sync::Arc;

/// Where media is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Surface {
    Local,
    Remote(ConnectionId),
}

#[derive(Debug, Clone)]
pub enum BoundMedia {
    Local(MediaHandle),
    Remote(RemoteMedia),
}

/// What makes two bindings the same: the stream and how many tracks it has.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaIdentity {
    stream: Option<String>,
    tracks: usize,
}

impl BoundMedia {
    fn identity(&self) -> MediaIdentity {
        match self {
            BoundMedia::Local(handle) => MediaIdentity {
                stream: Some(handle.id.clone()),
                tracks: handle.tracks.len(),
            },
            BoundMedia::Remote(media) => MediaIdentity {
                stream: media.stream_id().map(str::to_owned),
                tracks: media.len(),
            },
        }
    }
}

/// Renders media. Implemented by the front-end.
pub trait MediaSink: Send + Sync {
    fn bind(&self, surface: &Surface, media: &BoundMedia);

    fn clear(&self, surface: &Surface);
}

/// Keeps surfaces in sync with the media they show, skipping redundant rebinds.
pub struct MediaAttachment {
    sink: Arc<dyn MediaSink>,
    bound: HashMap<Surface, MediaIdentity>,
}

impl MediaAttachment {
    pub fn new(sink: Arc<dyn MediaSink>) -> Self {
        Self {
            sink,
            bound: HashMap::new(),
        }
    }

    /// Returns true if the sink was called.
    pub fn bind(&mut self, surface: Surface, media: &BoundMedia) -> bool {
        let identity = media.identity();
        if self.bound.get(&surface) == Some(&identity) {
            return false;
        }
        self.sink.bind(&surface, media);
        self.bound.insert(surface, identity);
        true
    }

    pub fn detach(&mut self, surface: &Surface) -> bool {
        if self.bound.remove(surface).is_none() {
            return false;
        }
        self.sink.clear(surface);
        true
    }

    pub fn is_bound(&self, surface: &Surface) -> bool {
        self.bound.contains_key(surface)
    }
}
