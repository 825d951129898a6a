use thiserror::Error;

use crate::session::MeetingStatus;

/// Errors raised while acquiring a capture stream
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("audio capture permission was denied by the user or the operating system")]
    PermissionDenied,

    #[error(
        "the shared stream has no audio track; sharing a single window usually drops audio. \
         Share a browser tab or the entire screen instead"
    )]
    NoAudioTrack,

    #[error("capture backend unavailable: {0}")]
    Backend(String),
}

/// Errors raised by a transcription session
#[derive(Error, Debug, Clone)]
pub enum TranscribeError {
    #[error("transcription service connection failed: {0}")]
    Connection(String),

    #[error("batch transcription window failed: {0}")]
    Batch(String),
}

impl TranscribeError {
    /// Connection loss ends the recording; a failed batch window is absorbed
    /// and the next window proceeds independently.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TranscribeError::Connection(_))
    }
}

/// Errors raised while generating meeting minutes
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("minutes generation request failed: {0}")]
    Request(String),

    #[error("minutes generation returned an unusable reply: {0}")]
    Parse(String),
}

/// Session-ending errors surfaced by the lifecycle controller
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Transcription(#[from] TranscribeError),

    #[error("transcript too short to summarize: {chars} characters, need at least {min}")]
    TranscriptTooShort { chars: usize, min: usize },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("{event} is not valid while the meeting is {status}")]
    InvalidTransition {
        status: MeetingStatus,
        event: &'static str,
    },
}
