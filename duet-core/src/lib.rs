pub mod model;

mod error;

pub use error::SignalingError;
pub use model::*;
