use serde::{Deserialize, Serialize};

/// Reference capture frame size in samples
pub const FRAME_SIZE: usize = 4096;

/// Audio stream source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Shared screen/tab system audio
    SystemAudio,
    /// Microphone input
    Microphone,
}

/// One fixed-size block of mono samples delivered by the capture hardware
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Monotonic sequence number within the session
    pub sequence: u64,
}

/// Track processing requested from the capture layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain: bool,
}

impl CaptureConstraints {
    /// System audio must pass through unmodified for accurate transcription;
    /// microphone capture is voice-optimized.
    pub fn for_source(kind: SourceKind) -> Self {
        match kind {
            SourceKind::SystemAudio => Self {
                echo_cancellation: false,
                noise_suppression: false,
                auto_gain: false,
            },
            SourceKind::Microphone => Self {
                echo_cancellation: true,
                noise_suppression: true,
                auto_gain: false,
            },
        }
    }
}
