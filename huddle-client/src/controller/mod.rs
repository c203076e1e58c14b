mod call_command;
mod call_config;
mod call_controller;
mod call_event;
mod call_handle;

pub use call_command::*;
pub use call_config::*;
pub use call_controller::*;
pub use call_event::*;
pub use call_handle::*;
