// Shared fakes for integration tests: capture backends that record their
// release, scripted transcription services, and a counting minutes
// generator.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use meetscribe::audio::{
    CaptureBackend, CaptureBackendFactory, CaptureConstraints, CaptureStream, EncodedAudioChunk,
    SimulatedBackend, SimulatedSpec, SourceKind, SourceManager,
};
use meetscribe::error::{AcquisitionError, GenerationError, TranscribeError};
use meetscribe::minutes::{MeetingMinutes, MinutesGenerator};
use meetscribe::session::{MeetingController, MeetingStatus, SessionConfig};
use meetscribe::transcribe::{
    BatchTranscriptionService, StreamSender, StreamingTranscriptionService, TranscriptSegment,
    TranscriptionService,
};

/// Factory producing simulated backends that record their release
pub struct TrackingFactory {
    spec: SimulatedSpec,
    released: Arc<AtomicBool>,
}

impl TrackingFactory {
    pub fn new(spec: SimulatedSpec) -> (Arc<Self>, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Arc::new(Self {
                spec,
                released: Arc::clone(&released),
            }),
            released,
        )
    }
}

impl CaptureBackendFactory for TrackingFactory {
    fn create(
        &self,
        _kind: SourceKind,
        _constraints: &CaptureConstraints,
    ) -> std::result::Result<Box<dyn CaptureBackend>, AcquisitionError> {
        Ok(Box::new(TrackingBackend {
            inner: SimulatedBackend::new(self.spec.clone()),
            released: Arc::clone(&self.released),
        }))
    }
}

#[derive(Debug)]
pub struct TrackingBackend {
    inner: SimulatedBackend,
    released: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl CaptureBackend for TrackingBackend {
    async fn start(&mut self) -> std::result::Result<CaptureStream, AcquisitionError> {
        self.inner.start().await
    }

    async fn stop(&mut self) -> Result<()> {
        self.released.store(true, Ordering::SeqCst);
        self.inner.stop().await
    }

    fn name(&self) -> &str {
        "tracking"
    }
}

/// Streaming service delivering scripted segments on open
pub struct FakeStreamingService {
    segments: Vec<TranscriptSegment>,
    fail_sends: bool,
    pub sent: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
}

impl FakeStreamingService {
    pub fn with_text(text: &str) -> Self {
        Self {
            segments: vec![TranscriptSegment::finalized(text.to_string())],
            fail_sends: false,
            sent: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_segments(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            segments,
            fail_sends: false,
            sent: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing() -> Self {
        Self {
            segments: Vec::new(),
            fail_sends: true,
            sent: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl StreamingTranscriptionService for FakeStreamingService {
    async fn open(
        &self,
        _session_id: &str,
    ) -> std::result::Result<
        (Box<dyn StreamSender>, mpsc::Receiver<TranscriptSegment>),
        TranscribeError,
    > {
        let (tx, rx) = mpsc::channel(64);
        for segment in self.segments.clone() {
            let _ = tx.try_send(segment);
        }
        let sender = FakeStreamSender {
            fail: self.fail_sends,
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        };
        Ok((Box::new(sender), rx))
    }
}

pub struct FakeStreamSender {
    fail: bool,
    sent: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl StreamSender for FakeStreamSender {
    async fn send(
        &mut self,
        _chunk: &EncodedAudioChunk,
    ) -> std::result::Result<(), TranscribeError> {
        if self.fail {
            return Err(TranscribeError::Connection(
                "stream reset by peer".to_string(),
            ));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> std::result::Result<(), TranscribeError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Batch service counting requests and recording payload sizes
pub struct FakeBatchService {
    reply: String,
    pub fail: Arc<AtomicBool>,
    pub calls: Arc<AtomicUsize>,
    pub payload_sizes: Arc<Mutex<Vec<usize>>>,
}

impl FakeBatchService {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
            payload_sizes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BatchTranscriptionService for FakeBatchService {
    async fn transcribe(
        &self,
        audio_base64: &str,
        _mime_type: &str,
    ) -> std::result::Result<String, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payload_sizes
            .lock()
            .unwrap()
            .push(audio_base64.len());
        if self.fail.load(Ordering::SeqCst) {
            return Err(TranscribeError::Batch("stt worker unavailable".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// Minutes generator returning a fixed document
pub struct FakeMinutesGenerator {
    fail: bool,
    pub calls: Arc<AtomicUsize>,
    pub received: Arc<Mutex<Vec<String>>>,
}

impl FakeMinutesGenerator {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MinutesGenerator for FakeMinutesGenerator {
    async fn generate(
        &self,
        transcript: &str,
    ) -> std::result::Result<MeetingMinutes, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(transcript.to_string());
        if self.fail {
            return Err(GenerationError::Request("llm unavailable".to_string()));
        }
        Ok(MeetingMinutes {
            title: "Test meeting".to_string(),
            date: "2025-11-03".to_string(),
            ..MeetingMinutes::default()
        })
    }
}

/// Fast session config for tests
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        stop_flush_timeout: Duration::from_millis(500),
        batch_interval: Duration::from_millis(100),
        ..SessionConfig::default()
    }
}

/// A quick simulated source: 16kHz, 100ms frames, unpaced
pub fn fast_spec() -> SimulatedSpec {
    SimulatedSpec {
        sample_rate: 16_000,
        frame_size: 1600,
        amplitude: 0.5,
        realtime: true,
        ..SimulatedSpec::default()
    }
}

pub fn streaming_controller(
    spec: SimulatedSpec,
    service: FakeStreamingService,
    generator: FakeMinutesGenerator,
) -> (Arc<MeetingController>, Arc<AtomicBool>) {
    let (factory, released) = TrackingFactory::new(spec);
    let controller = MeetingController::new(
        test_session_config(),
        SourceManager::new(factory),
        TranscriptionService::Streaming(Arc::new(service)),
        Arc::new(generator),
    );
    (controller, released)
}

pub fn batch_controller(
    spec: SimulatedSpec,
    service: Arc<FakeBatchService>,
    generator: FakeMinutesGenerator,
) -> (Arc<MeetingController>, Arc<AtomicBool>) {
    let (factory, released) = TrackingFactory::new(spec);
    let controller = MeetingController::new(
        test_session_config(),
        SourceManager::new(factory),
        TranscriptionService::Batch(service),
        Arc::new(generator),
    );
    (controller, released)
}

/// Polls until the controller reports `want` or the timeout elapses
pub async fn wait_for_status(
    controller: &MeetingController,
    want: MeetingStatus,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if controller.status().await == want {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
