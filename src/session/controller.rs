use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::audio::{
    rms, AudioPipeline, CaptureBackend, CaptureStream, EncodedAudioChunk, SourceKind,
    SourceManager, VolumeSmoother,
};
use crate::error::{SessionError, TranscribeError};
use crate::minutes::{MeetingMinutes, MinutesGenerator};
use crate::transcribe::{TranscriptSegment, TranscriptionService, TranscriptionStrategy};
use crate::transcript::TranscriptAccumulator;

use super::config::SessionConfig;
use super::state::{MeetingStatus, StopReason};

/// Point-in-time view of the live session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: MeetingStatus,
    pub session_id: Option<String>,
    pub source: Option<SourceKind>,
    /// Smoothed input level, for liveness/no-audio indication
    pub volume: f32,
    pub segment_count: usize,
    pub transcript_chars: usize,
    pub has_minutes: bool,
    pub last_error: Option<String>,
}

/// Resources that exist only while the state is RECORDING
struct LiveSession {
    backend: Box<dyn CaptureBackend>,
    strategy: Box<dyn TranscriptionStrategy>,
    pump: JoinHandle<()>,
    accepting: Arc<AtomicBool>,
}

#[derive(Default)]
struct SessionInner {
    status: MeetingStatus,
    session_id: Option<String>,
    source_kind: Option<SourceKind>,
    minutes: Option<MeetingMinutes>,
    last_error: Option<String>,
    live: Option<LiveSession>,
}

/// Orchestrates the meeting lifecycle: IDLE -> RECORDING -> PROCESSING ->
/// REVIEWING, with every stop trigger (explicit, track-ended, fatal session
/// error) funneled through one idempotent stop path.
pub struct MeetingController {
    config: SessionConfig,
    sources: SourceManager,
    transcription: TranscriptionService,
    minutes: Arc<dyn MinutesGenerator>,
    transcript: Arc<TranscriptAccumulator>,
    volume: Arc<watch::Sender<f32>>,
    status_tx: watch::Sender<MeetingStatus>,
    inner: Mutex<SessionInner>,
}

impl MeetingController {
    pub fn new(
        config: SessionConfig,
        sources: SourceManager,
        transcription: TranscriptionService,
        minutes: Arc<dyn MinutesGenerator>,
    ) -> Arc<Self> {
        let (volume, _) = watch::channel(0.0);
        let (status_tx, _) = watch::channel(MeetingStatus::Idle);
        Arc::new(Self {
            config,
            sources,
            transcription,
            minutes,
            transcript: Arc::new(TranscriptAccumulator::new()),
            volume: Arc::new(volume),
            status_tx,
            inner: Mutex::new(SessionInner::default()),
        })
    }

    /// IDLE -> RECORDING. Acquisition or connection failure leaves the
    /// state in IDLE with the error surfaced to the caller.
    pub async fn start(self: &Arc<Self>, kind: SourceKind) -> Result<MeetingStatus, SessionError> {
        let mut inner = self.inner.lock().await;
        if !inner.status.can_start() {
            return Err(SessionError::InvalidTransition {
                status: inner.status,
                event: "start",
            });
        }

        let session_id = format!("meeting-{}", uuid::Uuid::new_v4());
        info!("Starting meeting session {} ({:?})", session_id, kind);

        let (backend, stream) = match self.sources.acquire(kind).await {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!("Acquisition failed: {}", e);
                inner.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        // Fresh session: nothing from a previous one may survive
        self.transcript.clear();
        inner.minutes = None;
        inner.last_error = None;
        let _ = self.volume.send(0.0);

        let mut strategy = self.transcription.create_strategy(
            &session_id,
            self.config.batch_interval,
            self.config.stop_flush_timeout,
        );

        info!("Opening {} transcription session", strategy.name());
        let (fatal_tx, fatal_rx) = mpsc::channel::<TranscribeError>(1);
        let intake = match strategy.start(Arc::clone(&self.transcript), fatal_tx).await {
            Ok(intake) => intake,
            Err(e) => {
                error!("Failed to open transcription session: {}", e);
                let mut backend = backend;
                if let Err(release_err) = backend.stop().await {
                    warn!("Releasing capture after failed start: {}", release_err);
                }
                inner.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let accepting = Arc::new(AtomicBool::new(true));
        let (ended_tx, ended_rx) = mpsc::channel::<()>(1);
        let pump = tokio::spawn(pump_frames(
            stream,
            intake,
            Arc::clone(&accepting),
            Arc::clone(&self.volume),
            AudioPipeline::new(self.config.target_sample_rate),
            ended_tx,
        ));

        self.spawn_supervisor(ended_rx, fatal_rx);

        inner.live = Some(LiveSession {
            backend,
            strategy,
            pump,
            accepting,
        });
        inner.session_id = Some(session_id);
        inner.source_kind = Some(kind);
        inner.status = MeetingStatus::Recording;
        drop(inner);
        let _ = self.status_tx.send(MeetingStatus::Recording);

        Ok(MeetingStatus::Recording)
    }

    /// Maps track-ended and fatal session errors into the stop path
    fn spawn_supervisor(
        self: &Arc<Self>,
        mut ended_rx: mpsc::Receiver<()>,
        mut fatal_rx: mpsc::Receiver<TranscribeError>,
    ) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ended_open = true;
            let mut fatal_open = true;
            let reason = loop {
                tokio::select! {
                    ended = ended_rx.recv(), if ended_open => match ended {
                        Some(()) => break Some(StopReason::TrackEnded),
                        None => ended_open = false,
                    },
                    fatal = fatal_rx.recv(), if fatal_open => match fatal {
                        Some(e) => break Some(StopReason::Fatal(e)),
                        None => fatal_open = false,
                    },
                    else => break None,
                }
            };
            if let Some(reason) = reason {
                warn!("Recording interrupted: {}", reason);
                if let Err(e) = controller.stop_with(reason).await {
                    warn!("Implicit stop finished with: {}", e);
                }
            }
        });
    }

    /// RECORDING -> PROCESSING -> (REVIEWING | IDLE). The single
    /// cancellation point; safe to call repeatedly.
    pub async fn stop(&self) -> Result<MeetingStatus, SessionError> {
        self.stop_with(StopReason::Requested).await
    }

    pub(crate) async fn stop_with(&self, reason: StopReason) -> Result<MeetingStatus, SessionError> {
        let (live, session_id) = {
            let mut inner = self.inner.lock().await;
            if !inner.status.is_recording() {
                return Ok(inner.status);
            }
            let live = inner.live.take();
            inner.status = MeetingStatus::Processing;
            if let StopReason::Fatal(ref e) = reason {
                inner.last_error = Some(e.to_string());
            }
            (live, inner.session_id.clone())
        };
        let _ = self.status_tx.send(MeetingStatus::Processing);
        info!(
            "Stopping recording ({}) for session {:?}",
            reason, session_id
        );

        if let Some(mut live) = live {
            // Ordered, unconditional teardown: stop accepting frames first,
            // then flush-and-close the transcription session, then release
            // the media tracks and audio graph. Steps after a failed or
            // timed-out flush still run, so hardware is never leaked.
            live.accepting.store(false, Ordering::SeqCst);

            match tokio::time::timeout(self.config.stop_flush_timeout, live.strategy.stop()).await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Transcription flush failed: {}", e),
                Err(_) => warn!(
                    "Transcription flush timed out after {:?}",
                    self.config.stop_flush_timeout
                ),
            }

            if let Err(e) = live.backend.stop().await {
                warn!("Failed to release capture backend: {}", e);
            }

            if tokio::time::timeout(Duration::from_secs(1), &mut live.pump)
                .await
                .is_err()
            {
                live.pump.abort();
            }
        }

        self.finish_processing().await
    }

    /// PROCESSING: validate the frozen transcript and hand it to the
    /// minutes generator.
    async fn finish_processing(&self) -> Result<MeetingStatus, SessionError> {
        let text = self.transcript.snapshot();
        let trimmed = text.trim();
        let chars = trimmed.chars().count();

        if chars < self.config.min_transcript_chars {
            let err = SessionError::TranscriptTooShort {
                chars,
                min: self.config.min_transcript_chars,
            };
            warn!("{}", err);
            self.discard_session(err.to_string()).await;
            return Err(err);
        }

        info!("Generating minutes from {} characters of transcript", chars);
        match self.minutes.generate(trimmed).await {
            Ok(minutes) => {
                {
                    let mut inner = self.inner.lock().await;
                    inner.minutes = Some(minutes);
                    inner.status = MeetingStatus::Reviewing;
                }
                let _ = self.status_tx.send(MeetingStatus::Reviewing);
                info!("Minutes ready; session is under review");
                Ok(MeetingStatus::Reviewing)
            }
            Err(e) => {
                error!("Minutes generation failed: {}", e);
                let err = SessionError::from(e);
                self.discard_session(err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Back to IDLE with nothing retained beyond the error message
    async fn discard_session(&self, message: String) {
        self.transcript.clear();
        {
            let mut inner = self.inner.lock().await;
            inner.minutes = None;
            inner.session_id = None;
            inner.source_kind = None;
            inner.last_error = Some(message);
            inner.status = MeetingStatus::Idle;
        }
        let _ = self.status_tx.send(MeetingStatus::Idle);
        let _ = self.volume.send(0.0);
    }

    /// REVIEWING -> IDLE, clearing the transcript and minutes
    pub async fn reset(&self) -> Result<MeetingStatus, SessionError> {
        let mut inner = self.inner.lock().await;
        match inner.status {
            MeetingStatus::Reviewing => {
                self.transcript.clear();
                inner.minutes = None;
                inner.session_id = None;
                inner.source_kind = None;
                inner.last_error = None;
                inner.status = MeetingStatus::Idle;
                drop(inner);
                let _ = self.status_tx.send(MeetingStatus::Idle);
                let _ = self.volume.send(0.0);
                info!("Session reset");
                Ok(MeetingStatus::Idle)
            }
            MeetingStatus::Idle => {
                inner.last_error = None;
                Ok(MeetingStatus::Idle)
            }
            status => Err(SessionError::InvalidTransition {
                status,
                event: "reset",
            }),
        }
    }

    pub async fn status(&self) -> MeetingStatus {
        self.inner.lock().await.status
    }

    /// Status updates for observers
    pub fn watch_status(&self) -> watch::Receiver<MeetingStatus> {
        self.status_tx.subscribe()
    }

    /// Smoothed input level updates
    pub fn watch_volume(&self) -> watch::Receiver<f32> {
        self.volume.subscribe()
    }

    pub fn transcript_text(&self) -> String {
        self.transcript.snapshot()
    }

    pub fn segments(&self) -> Vec<TranscriptSegment> {
        self.transcript.segments()
    }

    pub async fn minutes(&self) -> Option<MeetingMinutes> {
        self.inner.lock().await.minutes.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        SessionSnapshot {
            status: inner.status,
            session_id: inner.session_id.clone(),
            source: inner.source_kind,
            volume: *self.volume.borrow(),
            segment_count: self.transcript.segment_count(),
            transcript_chars: self.transcript.char_count(),
            has_minutes: inner.minutes.is_some(),
            last_error: inner.last_error.clone(),
        }
    }
}

/// Audio pump: one task per session pulling frames in capture order,
/// metering volume, resampling + encoding, and feeding the strategy intake.
/// Never waits on network completion; the intake bound is the only
/// client-side queue.
async fn pump_frames(
    mut stream: CaptureStream,
    intake: mpsc::Sender<EncodedAudioChunk>,
    accepting: Arc<AtomicBool>,
    volume: Arc<watch::Sender<f32>>,
    pipeline: AudioPipeline,
    ended: mpsc::Sender<()>,
) {
    debug!("Audio pump started ({} Hz capture)", stream.sample_rate);
    let mut smoother = VolumeSmoother::new();

    loop {
        match stream.frames.recv().await {
            Some(frame) => {
                if !accepting.load(Ordering::SeqCst) {
                    break;
                }
                let level = smoother.update(rms(&frame.samples));
                let _ = volume.send(level);

                let chunk = pipeline.process(&frame);
                if intake.send(chunk).await.is_err() {
                    // Strategy went away (stop or fatal); nothing left to feed
                    break;
                }
            }
            None => {
                if accepting.load(Ordering::SeqCst) {
                    // Channel closed underneath us: the user stopped sharing
                    let _ = ended.send(()).await;
                }
                break;
            }
        }
    }

    debug!("Audio pump stopped");
}
