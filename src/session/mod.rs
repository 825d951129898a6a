pub mod config;
pub mod controller;
pub mod state;

pub use config::SessionConfig;
pub use controller::{MeetingController, SessionSnapshot};
pub use state::{MeetingStatus, StopReason};
