use duet_core::IceServerConfig;

/// Configuration for new transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: IceServerConfig::default_stun(),
        }
    }
}
