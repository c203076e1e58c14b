use huddle_core::IceServerConfig;
use huddle_core::utils::default_stun_urls;
use std::time::Duration;

/// Settings for the native WebRTC backend.
#[derive(Debug, Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<IceServerConfig>,
    /// Upper bound on waiting for ICE gathering before a description is sent.
    pub gathering_timeout: Duration,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: default_stun_urls(),
                username: None,
                credential: None,
            }],
            gathering_timeout: Duration::from_secs(3),
        }
    }
}

impl RtcConfig {
    /// No STUN/TURN at all: host candidates only. Enough for loopback calls.
    pub fn local_only() -> Self {
        Self {
            ice_servers: Vec::new(),
            ..Default::default()
        }
    }
}
