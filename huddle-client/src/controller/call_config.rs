use crate::session::RtcConfig;
use huddle_core::IceServerConfig;
use std::time::Duration;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// How long an outgoing call may stay unanswered.
    pub call_timeout: Duration,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            ice_servers: RtcConfig::default().ice_servers,
        }
    }
}

impl CallConfig {
    pub fn rtc_config(&self) -> RtcConfig {
        RtcConfig {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        }
    }
}
