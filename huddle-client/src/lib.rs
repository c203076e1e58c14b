mod controller;
mod error;
mod media;
mod session;
mod signaling;

pub use controller::*;
pub use error::*;
pub use media::*;
pub use session::*;
pub use signaling::*;
