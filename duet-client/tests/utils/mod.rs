pub mod harness;
pub mod recording_sink;

pub use flaky_transport::*;
pub use harness::*;
pub use recording_sink::*;
