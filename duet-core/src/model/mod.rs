mod connection;
mod description;
mod ice;
mod participant;
mod room;
mod signaling;

pub use connection::ConnectionId;
pub use description::{DescriptionSide, SdpKind, SessionDescription, SignalingState};
pub use ice::{DEFAULT_STUN_SERVERS, IceCandidate, IceServerConfig};
pub use participant::ParticipantId;
pub use room::RoomId;
pub use signaling::{ClientEvent, RelayedEvent, ServerEvent};
