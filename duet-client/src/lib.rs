pub mod engine;
pub mod lobby;
pub mod media;
pub mod signaling;
pub mod transport;

pub use engine::*;
pub use lobby::*;
pub use media::*;
pub use signaling::*;
pub use transport::*;
