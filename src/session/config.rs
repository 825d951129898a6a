use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audio::TARGET_SAMPLE_RATE;
use crate::transcribe::TranscriptionMode;

/// Configuration for meeting sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Target transport sample rate (speech services expect 16kHz)
    pub target_sample_rate: u32,

    /// Transcription protocol shape
    pub mode: TranscriptionMode,

    /// Batch accumulation window (batch mode only)
    pub batch_interval: Duration,

    /// Bound on the stop-time drain/flush before resources are released
    pub stop_flush_timeout: Duration,

    /// Minimum trimmed transcript length worth summarizing
    pub min_transcript_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: TARGET_SAMPLE_RATE,
            mode: TranscriptionMode::Streaming,
            batch_interval: Duration::from_secs(5),
            stop_flush_timeout: Duration::from_secs(5),
            min_transcript_chars: 10,
        }
    }
}
