use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::EncodedAudioChunk;
use crate::error::TranscribeError;
use crate::transcript::TranscriptAccumulator;

use super::{StreamingTranscriptionService, TranscriptionStrategy, INTAKE_CAPACITY};

/// Persistent-session strategy: every chunk is pushed as it is produced and
/// segments arrive asynchronously from the service. Connection failure is
/// fatal to the recording.
pub struct StreamingTranscription {
    service: Arc<dyn StreamingTranscriptionService>,
    session_id: String,
    flush_timeout: Duration,
    running: Option<Running>,
}

struct Running {
    closed: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
    send_task: JoinHandle<()>,
    recv_task: JoinHandle<()>,
}

impl StreamingTranscription {
    pub fn new(
        service: Arc<dyn StreamingTranscriptionService>,
        session_id: String,
        flush_timeout: Duration,
    ) -> Self {
        Self {
            service,
            session_id,
            flush_timeout,
            running: None,
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionStrategy for StreamingTranscription {
    async fn start(
        &mut self,
        sink: Arc<TranscriptAccumulator>,
        fatal: mpsc::Sender<TranscribeError>,
    ) -> Result<mpsc::Sender<EncodedAudioChunk>, TranscribeError> {
        let (mut sender, mut segments) = self.service.open(&self.session_id).await?;
        info!("Streaming transcription session {} opened", self.session_id);

        let (intake_tx, mut intake_rx) = mpsc::channel::<EncodedAudioChunk>(INTAKE_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let send_closed = Arc::clone(&closed);
        let send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    chunk = intake_rx.recv() => {
                        let Some(chunk) = chunk else { break };
                        if send_closed.load(Ordering::SeqCst) {
                            break;
                        }
                        if let Err(e) = sender.send(&chunk).await {
                            if e.is_fatal() {
                                warn!("Streaming send failed, ending session: {}", e);
                                let _ = fatal.send(e).await;
                                break;
                            }
                            warn!("Dropped one chunk: {}", e);
                        }
                    }
                }
            }
            // Release the service session no matter how the loop ended
            if let Err(e) = sender.close().await {
                warn!("Failed to close streaming session: {}", e);
            }
        });

        let recv_task = tokio::spawn(async move {
            while let Some(segment) = segments.recv().await {
                debug!(
                    "Transcript segment ({} chars, final={})",
                    segment.text.chars().count(),
                    segment.is_final
                );
                sink.append(segment);
            }
        });

        self.running = Some(Running {
            closed,
            shutdown: shutdown_tx,
            send_task,
            recv_task,
        });

        Ok(intake_tx)
    }

    async fn stop(&mut self) -> Result<(), TranscribeError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        // No chunk may be sent once stop has begun; the in-flight send (if
        // any) completes, then the send task closes the service session.
        running.closed.store(true, Ordering::SeqCst);
        let _ = running.shutdown.send(true);

        if tokio::time::timeout(self.flush_timeout, running.send_task)
            .await
            .is_err()
        {
            warn!(
                "Streaming drain did not finish within {:?}; abandoning it",
                self.flush_timeout
            );
        }
        running.recv_task.abort();

        info!("Streaming transcription session {} closed", self.session_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "streaming"
    }
}
