use duet_core::IceServerConfig;
use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 8000;

/// Settings for the signaling server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Candidate-gathering endpoints pushed to every client on connect.
    pub ice_servers: Vec<IceServerConfig>,
    /// Depth of each room actor's command queue.
    pub room_command_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            ice_servers: IceServerConfig::default_stun(),
            room_command_capacity: 100,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Replace the ICE servers with a single STUN entry. An empty list disables them.
    pub fn with_stun_servers(mut self, urls: Vec<String>) -> Self {
        self.ice_servers = if urls.is_empty() {
            Vec::new()
        } else {
            vec![IceServerConfig::stun(urls)]
        };
        self
    }
}
