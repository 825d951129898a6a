pub mod batch;
pub mod nats;
pub mod streaming;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::audio::EncodedAudioChunk;
use crate::error::TranscribeError;
use crate::transcript::TranscriptAccumulator;

pub use batch::BatchTranscription;
pub use nats::NatsSttService;
pub use streaming::StreamingTranscription;

/// Capacity of the chunk intake between the audio pump and a strategy.
/// Bounds client-side buffering; the pump never waits on network acks.
pub(crate) const INTAKE_CAPACITY: usize = 64;

/// One unit of recognized speech returned by the transcription service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Interim segments may later be superseded by a final segment for the
    /// same span; both are delivered.
    pub is_final: bool,
}

impl TranscriptSegment {
    /// A final segment stamped now, as produced by one batch window
    pub fn finalized(text: String) -> Self {
        Self {
            text,
            timestamp: Utc::now(),
            is_final: true,
        }
    }
}

/// Transcription protocol shape, selected at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionMode {
    Streaming,
    Batch,
}

/// Send half of an open streaming session
#[async_trait::async_trait]
pub trait StreamSender: Send {
    /// Dispatch one chunk. Implementations must not wait for recognition.
    async fn send(&mut self, chunk: &EncodedAudioChunk) -> Result<(), TranscribeError>;

    /// Flush pending sends and terminate the service session
    async fn close(&mut self) -> Result<(), TranscribeError>;
}

/// Streaming protocol shape: open a persistent session, push chunks,
/// receive segments asynchronously as recognition completes.
#[async_trait::async_trait]
pub trait StreamingTranscriptionService: Send + Sync {
    async fn open(
        &self,
        session_id: &str,
    ) -> Result<(Box<dyn StreamSender>, mpsc::Receiver<TranscriptSegment>), TranscribeError>;
}

/// Batch protocol shape: one transcribe-this-clip request per window
#[async_trait::async_trait]
pub trait BatchTranscriptionService: Send + Sync {
    async fn transcribe(
        &self,
        audio_base64: &str,
        mime_type: &str,
    ) -> Result<String, TranscribeError>;
}

/// Outward contract shared by both strategies.
#[async_trait::async_trait]
pub trait TranscriptionStrategy: Send {
    /// Opens the service conversation and returns the chunk intake the
    /// audio pump feeds. Segments are appended to `sink` as they arrive;
    /// session-fatal errors are reported on `fatal`.
    async fn start(
        &mut self,
        sink: Arc<TranscriptAccumulator>,
        fatal: mpsc::Sender<TranscribeError>,
    ) -> Result<mpsc::Sender<EncodedAudioChunk>, TranscribeError>;

    /// Drains pending work and releases the service session, regardless of
    /// whether the drain lands. Idempotent; no chunk is sent once this has
    /// begun.
    async fn stop(&mut self) -> Result<(), TranscribeError>;

    fn name(&self) -> &'static str;
}

/// Configured transcription service, one protocol shape per deployment
#[derive(Clone)]
pub enum TranscriptionService {
    Streaming(Arc<dyn StreamingTranscriptionService>),
    Batch(Arc<dyn BatchTranscriptionService>),
}

impl TranscriptionService {
    /// Builds the strategy for one session
    pub fn create_strategy(
        &self,
        session_id: &str,
        batch_interval: Duration,
        flush_timeout: Duration,
    ) -> Box<dyn TranscriptionStrategy> {
        match self {
            TranscriptionService::Streaming(service) => Box::new(StreamingTranscription::new(
                Arc::clone(service),
                session_id.to_string(),
                flush_timeout,
            )),
            TranscriptionService::Batch(service) => Box::new(BatchTranscription::new(
                Arc::clone(service),
                batch_interval,
                flush_timeout,
            )),
        }
    }
}
