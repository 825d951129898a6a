use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::CaptureConfig;
use crate::error::AcquisitionError;

use super::frame::{AudioFrame, CaptureConstraints, SourceKind};
use super::sim::{SimulatedBackend, SimulatedSpec};
use super::wav::WavFileBackend;

/// Live stream handed back by a capture backend
#[derive(Debug)]
pub struct CaptureStream {
    /// Bounded frame delivery channel; closes when the track ends
    pub frames: mpsc::Receiver<AudioFrame>,
    /// Number of audio tracks attached to the stream
    pub audio_tracks: usize,
    /// Native capture rate in Hz
    pub sample_rate: u32,
}

/// Audio capture backend trait
///
/// The platform display/microphone capture itself is an external
/// capability; in-tree backends are the simulated generator and the
/// WAV-file source used for development and tests.
#[async_trait::async_trait]
pub trait CaptureBackend: std::fmt::Debug + Send + Sync {
    /// Start capturing and return the live stream
    async fn start(&mut self) -> Result<CaptureStream, AcquisitionError>;

    /// Stop capturing and release the tracks and audio graph. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Creates a backend for a source kind under the given constraints
pub trait CaptureBackendFactory: Send + Sync {
    fn create(
        &self,
        kind: SourceKind,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureBackend>, AcquisitionError>;
}

/// Acquires and validates a capture stream for a meeting session
pub struct SourceManager {
    factory: Arc<dyn CaptureBackendFactory>,
}

impl SourceManager {
    pub fn new(factory: Arc<dyn CaptureBackendFactory>) -> Self {
        Self { factory }
    }

    /// Acquire a stream for `kind`, failing if it carries no audio track.
    ///
    /// A stream without audio tracks is released immediately; the user most
    /// likely shared a single window, which rarely carries audio.
    pub async fn acquire(
        &self,
        kind: SourceKind,
    ) -> Result<(Box<dyn CaptureBackend>, CaptureStream), AcquisitionError> {
        let constraints = CaptureConstraints::for_source(kind);
        debug!(
            "Acquiring {:?} (echo_cancellation={}, noise_suppression={}, auto_gain={})",
            kind,
            constraints.echo_cancellation,
            constraints.noise_suppression,
            constraints.auto_gain
        );

        let mut backend = self.factory.create(kind, &constraints)?;
        let stream = backend.start().await?;

        if stream.audio_tracks == 0 {
            if let Err(e) = backend.stop().await {
                warn!("Failed to release audioless stream: {}", e);
            }
            return Err(AcquisitionError::NoAudioTrack);
        }

        info!(
            "Acquired {:?} via {} ({} Hz, {} audio track(s))",
            kind,
            backend.name(),
            stream.sample_rate,
            stream.audio_tracks
        );

        Ok((backend, stream))
    }
}

/// Config-driven backend selection, in lieu of a platform capture layer
pub struct DefaultCaptureFactory {
    config: CaptureConfig,
}

impl DefaultCaptureFactory {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

impl CaptureBackendFactory for DefaultCaptureFactory {
    fn create(
        &self,
        _kind: SourceKind,
        _constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureBackend>, AcquisitionError> {
        match self.config.backend.as_str() {
            "simulated" => {
                let spec = SimulatedSpec {
                    sample_rate: self.config.sample_rate,
                    frame_size: self.config.frame_size,
                    ..SimulatedSpec::default()
                };
                Ok(Box::new(SimulatedBackend::new(spec)))
            }
            "wav" => {
                let path = self.config.wav_path.as_ref().ok_or_else(|| {
                    AcquisitionError::Backend(
                        "capture.wav_path is required when capture.backend = \"wav\"".to_string(),
                    )
                })?;
                Ok(Box::new(WavFileBackend::new(path, self.config.frame_size)))
            }
            other => Err(AcquisitionError::Backend(format!(
                "no capture integration named '{}'",
                other
            ))),
        }
    }
}
