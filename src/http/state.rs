use std::sync::Arc;

use crate::session::MeetingController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single live meeting lifecycle controller
    pub controller: Arc<MeetingController>,
}

impl AppState {
    pub fn new(controller: Arc<MeetingController>) -> Self {
        Self { controller }
    }
}
