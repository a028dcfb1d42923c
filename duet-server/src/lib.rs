pub mod config;
pub mod relay;
pub mod room;
pub mod signaling;

mod server;

pub use config::*;
pub use relay::*;
pub use room::*;
pub use server::{ServerState, router, serve, serve_on};
pub use signaling::*;
