use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::EncodedAudioChunk;
use crate::error::TranscribeError;
use crate::transcript::TranscriptAccumulator;

use super::{BatchTranscriptionService, TranscriptSegment, TranscriptionStrategy, INTAKE_CAPACITY};

/// Periodic-batch strategy: chunks accumulate in memory and every interval
/// the buffered audio is sent as one transcribe-this-clip request. A failed
/// window is logged and discarded; recording continues uninterrupted.
pub struct BatchTranscription {
    service: Arc<dyn BatchTranscriptionService>,
    interval: Duration,
    flush_timeout: Duration,
    running: Option<Running>,
}

/// Pending audio for the current window. The swap to a payload is a
/// `mem::take` under the same lock the intake appends under.
#[derive(Default)]
struct WindowBuffer {
    pcm: Vec<u8>,
    sample_rate: u32,
}

impl WindowBuffer {
    fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    fn into_chunk(self) -> EncodedAudioChunk {
        EncodedAudioChunk {
            pcm: self.pcm,
            sample_rate: self.sample_rate,
        }
    }
}

struct Running {
    buffer: Arc<Mutex<WindowBuffer>>,
    sink: Arc<TranscriptAccumulator>,
    shutdown: watch::Sender<bool>,
    intake_task: JoinHandle<()>,
    timer_task: JoinHandle<()>,
}

impl BatchTranscription {
    pub fn new(
        service: Arc<dyn BatchTranscriptionService>,
        interval: Duration,
        flush_timeout: Duration,
    ) -> Self {
        Self {
            service,
            interval,
            flush_timeout,
            running: None,
        }
    }

    fn take_window(buffer: &Mutex<WindowBuffer>) -> WindowBuffer {
        std::mem::take(&mut *buffer.lock().unwrap())
    }

    /// One transcription attempt for one window's audio. Failure is
    /// absorbed here: the window is lost, the session continues.
    async fn transcribe_window(
        service: &Arc<dyn BatchTranscriptionService>,
        sink: &TranscriptAccumulator,
        window: WindowBuffer,
    ) {
        let chunk = window.into_chunk();
        debug!(
            "Transcribing batch window ({} samples at {} Hz)",
            chunk.sample_count(),
            chunk.sample_rate
        );

        match service
            .transcribe(&chunk.to_base64(), &chunk.mime_type())
            .await
        {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    debug!("Batch window produced no speech");
                } else {
                    sink.append(TranscriptSegment::finalized(trimmed.to_string()));
                }
            }
            Err(e) => {
                warn!("Batch window failed, its audio is discarded: {}", e);
            }
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionStrategy for BatchTranscription {
    async fn start(
        &mut self,
        sink: Arc<TranscriptAccumulator>,
        _fatal: mpsc::Sender<TranscribeError>,
    ) -> Result<mpsc::Sender<EncodedAudioChunk>, TranscribeError> {
        let (intake_tx, mut intake_rx) = mpsc::channel::<EncodedAudioChunk>(INTAKE_CAPACITY);
        let buffer = Arc::new(Mutex::new(WindowBuffer::default()));
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let intake_buffer = Arc::clone(&buffer);
        let intake_task = tokio::spawn(async move {
            while let Some(chunk) = intake_rx.recv().await {
                let mut pending = intake_buffer.lock().unwrap();
                pending.sample_rate = chunk.sample_rate;
                pending.pcm.extend_from_slice(&chunk.pcm);
            }
        });

        let timer_buffer = Arc::clone(&buffer);
        let timer_sink = Arc::clone(&sink);
        let timer_service = Arc::clone(&self.service);
        let interval = self.interval;
        let timer_task = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        // Sequential swap -> request: a tick never re-enters
                        // while the previous window is still in flight.
                        let window = Self::take_window(&timer_buffer);
                        if window.is_empty() {
                            continue;
                        }
                        Self::transcribe_window(&timer_service, &timer_sink, window).await;
                    }
                }
            }
        });

        info!(
            "Batch transcription started ({}s windows)",
            self.interval.as_secs_f64()
        );

        self.running = Some(Running {
            buffer,
            sink,
            shutdown: shutdown_tx,
            intake_task,
            timer_task,
        });

        Ok(intake_tx)
    }

    async fn stop(&mut self) -> Result<(), TranscribeError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let _ = running.shutdown.send(true);
        if tokio::time::timeout(self.flush_timeout, running.timer_task)
            .await
            .is_err()
        {
            warn!("Batch timer did not stop within {:?}", self.flush_timeout);
        }

        // Flush whatever accumulated since the last window through exactly
        // one final attempt, so the tail of speech is not silently dropped.
        let window = Self::take_window(&running.buffer);
        if !window.is_empty() {
            if tokio::time::timeout(
                self.flush_timeout,
                Self::transcribe_window(&self.service, &running.sink, window),
            )
            .await
            .is_err()
            {
                warn!(
                    "Final batch flush did not finish within {:?}",
                    self.flush_timeout
                );
            }
        }

        running.intake_task.abort();
        info!("Batch transcription stopped");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "batch"
    }
}
