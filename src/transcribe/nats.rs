use std::time::Duration;

use anyhow::{Context, Result};
use async_nats::Client;
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::EncodedAudioChunk;
use crate::error::TranscribeError;

use super::{
    BatchTranscriptionService, StreamSender, StreamingTranscriptionService, TranscriptSegment,
};

/// Subject for batch transcribe-this-clip requests
pub const BATCH_SUBJECT: &str = "stt.batch.transcribe";

fn audio_subject(session_id: &str) -> String {
    format!("stt.audio.{}", session_id)
}

fn segment_subject(session_id: &str) -> String {
    format!("stt.segment.{}", session_id)
}

/// Audio chunk message published to the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioChunkMessage {
    pub session_id: String,
    pub sequence: u64,
    /// Base64-encoded 16-bit little-endian PCM
    pub audio: String,
    pub mime_type: String,
    pub sample_rate: u32,
    /// RFC3339 timestamp
    pub timestamp: String,
    #[serde(rename = "final")]
    pub final_chunk: bool,
}

/// Transcript segment message received from the STT service
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentMessage {
    pub session_id: String,
    pub text: String,
    pub timestamp: String,
    #[serde(rename = "final")]
    pub final_segment: bool,
}

/// Batch request/reply payloads
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub audio: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub text: String,
}

/// NATS-backed transcription service, covering both protocol shapes over
/// one client connection.
pub struct NatsSttService {
    client: Client,
    request_timeout: Duration,
}

impl NatsSttService {
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    /// Connect a dedicated client
    pub async fn connect(url: &str, request_timeout: Duration) -> Result<Self> {
        info!("Connecting to NATS at {}", url);
        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;
        Ok(Self::new(client, request_timeout))
    }
}

#[async_trait::async_trait]
impl StreamingTranscriptionService for NatsSttService {
    async fn open(
        &self,
        session_id: &str,
    ) -> Result<(Box<dyn StreamSender>, mpsc::Receiver<TranscriptSegment>), TranscribeError> {
        let mut subscriber = self
            .client
            .subscribe(segment_subject(session_id))
            .await
            .map_err(|e| TranscribeError::Connection(e.to_string()))?;

        let (segment_tx, segment_rx) = mpsc::channel(64);
        let expected_session = session_id.to_string();

        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<SegmentMessage>(&msg.payload) {
                    Ok(message) => {
                        if message.session_id != expected_session {
                            continue;
                        }
                        let timestamp = DateTime::parse_from_rfc3339(&message.timestamp)
                            .map(|t| t.with_timezone(&Utc))
                            .unwrap_or_else(|_| Utc::now());
                        let segment = TranscriptSegment {
                            text: message.text,
                            timestamp,
                            is_final: message.final_segment,
                        };
                        if segment_tx.send(segment).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse segment message: {}", e);
                    }
                }
            }
        });

        let sender = NatsStreamSender {
            client: self.client.clone(),
            session_id: session_id.to_string(),
            sequence: 0,
            sample_rate: 0,
        };

        Ok((Box::new(sender), segment_rx))
    }
}

struct NatsStreamSender {
    client: Client,
    session_id: String,
    sequence: u64,
    sample_rate: u32,
}

impl NatsStreamSender {
    async fn publish(&mut self, message: AudioChunkMessage) -> Result<(), TranscribeError> {
        let payload =
            serde_json::to_vec(&message).map_err(|e| TranscribeError::Connection(e.to_string()))?;
        self.client
            .publish(audio_subject(&self.session_id), payload.into())
            .await
            .map_err(|e| TranscribeError::Connection(e.to_string()))
    }
}

#[async_trait::async_trait]
impl StreamSender for NatsStreamSender {
    async fn send(&mut self, chunk: &EncodedAudioChunk) -> Result<(), TranscribeError> {
        let message = AudioChunkMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence,
            audio: chunk.to_base64(),
            mime_type: chunk.mime_type(),
            sample_rate: chunk.sample_rate,
            timestamp: Utc::now().to_rfc3339(),
            final_chunk: false,
        };
        self.sample_rate = chunk.sample_rate;
        self.publish(message).await?;
        debug!(
            "Published chunk {} ({} bytes) for {}",
            self.sequence,
            chunk.pcm.len(),
            self.session_id
        );
        self.sequence += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TranscribeError> {
        // Final marker so the service flushes any pending recognition
        let message = AudioChunkMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence,
            audio: String::new(),
            mime_type: format!("audio/pcm;rate={}", self.sample_rate),
            sample_rate: self.sample_rate,
            timestamp: Utc::now().to_rfc3339(),
            final_chunk: true,
        };
        self.publish(message).await?;
        self.client
            .flush()
            .await
            .map_err(|e| TranscribeError::Connection(e.to_string()))
    }
}

#[async_trait::async_trait]
impl BatchTranscriptionService for NatsSttService {
    async fn transcribe(
        &self,
        audio_base64: &str,
        mime_type: &str,
    ) -> Result<String, TranscribeError> {
        let request = BatchRequest {
            audio: audio_base64.to_string(),
            mime_type: mime_type.to_string(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| TranscribeError::Batch(e.to_string()))?;

        let reply = tokio::time::timeout(
            self.request_timeout,
            self.client.request(BATCH_SUBJECT, payload.into()),
        )
        .await
        .map_err(|_| {
            TranscribeError::Batch(format!(
                "no reply within {:?} from {}",
                self.request_timeout, BATCH_SUBJECT
            ))
        })?
        .map_err(|e| TranscribeError::Batch(e.to_string()))?;

        let response: BatchResponse = serde_json::from_slice(&reply.payload)
            .map_err(|e| TranscribeError::Batch(format!("unparseable reply: {}", e)))?;

        Ok(response.text)
    }
}
