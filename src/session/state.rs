use serde::{Deserialize, Serialize};

use crate::error::TranscribeError;

/// Lifecycle of the single live meeting session.
///
/// IDLE -> RECORDING -> PROCESSING -> REVIEWING, with error paths from
/// RECORDING and PROCESSING back to IDLE. A session ends by explicit reset
/// from REVIEWING, not by a distinct terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Idle,
    Recording,
    Processing,
    Reviewing,
}

impl MeetingStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, MeetingStatus::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, MeetingStatus::Recording)
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, MeetingStatus::Processing)
    }

    pub fn is_reviewing(&self) -> bool {
        matches!(self, MeetingStatus::Reviewing)
    }

    /// A new session may only start from IDLE
    pub fn can_start(&self) -> bool {
        self.is_idle()
    }
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Idle => write!(f, "idle"),
            MeetingStatus::Recording => write!(f, "recording"),
            MeetingStatus::Processing => write!(f, "processing"),
            MeetingStatus::Reviewing => write!(f, "reviewing"),
        }
    }
}

/// Why a recording stopped. Every variant takes the same stop path.
#[derive(Debug)]
pub enum StopReason {
    /// Explicit stop from the caller
    Requested,
    /// The capture track ended (user stopped sharing)
    TrackEnded,
    /// The transcription session died
    Fatal(TranscribeError),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => write!(f, "requested"),
            StopReason::TrackEnded => write!(f, "track ended"),
            StopReason::Fatal(e) => write!(f, "fatal session error: {}", e),
        }
    }
}
