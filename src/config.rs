use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::session::SessionConfig;
use crate::transcribe::TranscriptionMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub capture: CaptureConfig,
    pub transcription: TranscriptionConfig,
    pub minutes: MinutesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Target transport sample rate (speech services expect 16kHz)
    pub target_sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Capture backend: "simulated" or "wav"
    pub backend: String,
    /// Native capture rate in Hz
    pub sample_rate: u32,
    /// Samples per capture frame
    pub frame_size: usize,
    /// WAV source path (wav backend only)
    pub wav_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub mode: TranscriptionMode,
    pub nats_url: String,
    /// Batch accumulation window in seconds
    pub batch_interval_secs: u64,
    /// Bound on the stop-time drain/flush in seconds
    pub stop_flush_timeout_secs: u64,
    /// Per-request timeout for batch transcription in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MinutesConfig {
    /// Minimum trimmed transcript length worth summarizing
    pub min_transcript_chars: usize,
    /// Generation request timeout in seconds
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session parameters derived from the loaded file
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            target_sample_rate: self.audio.target_sample_rate,
            mode: self.transcription.mode,
            batch_interval: Duration::from_secs(self.transcription.batch_interval_secs),
            stop_flush_timeout: Duration::from_secs(self.transcription.stop_flush_timeout_secs),
            min_transcript_chars: self.minutes.min_transcript_chars,
        }
    }
}
