mod negotiator;
mod negotiator_event;
mod peer_session;
mod rtc_config;
mod rtc_negotiator;
mod session_state;

pub use negotiator::*;
pub use negotiator_event::*;
pub use peer_session::*;
pub use rtc_config::*;
pub use rtc_negotiator::*;
pub use session_state::*;
