use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::AcquisitionError;

use super::frame::{AudioFrame, FRAME_SIZE};
use super::source::{CaptureBackend, CaptureStream};

/// Shape of the simulated capture stream
#[derive(Debug, Clone)]
pub struct SimulatedSpec {
    /// Native capture rate in Hz
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_size: usize,
    /// Advertised audio track count; 0 simulates a window share without audio
    pub audio_tracks: usize,
    /// Peak amplitude of the generated tone; 0.0 produces silence
    pub amplitude: f32,
    /// Tone frequency in Hz
    pub frequency: f32,
    /// End the track after this many frames (user stopped sharing)
    pub frame_limit: Option<u64>,
    /// Pace frame delivery at the hardware cadence
    pub realtime: bool,
    /// Simulate the user declining the capture prompt
    pub deny_permission: bool,
}

impl Default for SimulatedSpec {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            frame_size: FRAME_SIZE,
            audio_tracks: 1,
            amplitude: 0.25,
            frequency: 440.0,
            frame_limit: None,
            realtime: true,
            deny_permission: false,
        }
    }
}

/// Deterministic tone/silence capture backend for development and tests
#[derive(Debug)]
pub struct SimulatedBackend {
    spec: SimulatedSpec,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl SimulatedBackend {
    pub fn new(spec: SimulatedSpec) -> Self {
        Self {
            spec,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SimulatedBackend {
    async fn start(&mut self) -> Result<CaptureStream, AcquisitionError> {
        if self.spec.deny_permission {
            return Err(AcquisitionError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(100);

        if self.spec.audio_tracks == 0 {
            // Stream opens, but no audio track ever attaches; dropping the
            // sender closes the frame channel right away.
            return Ok(CaptureStream {
                frames: rx,
                audio_tracks: 0,
                sample_rate: self.spec.sample_rate,
            });
        }

        self.running.store(true, Ordering::SeqCst);

        let spec = self.spec.clone();
        let running = Arc::clone(&self.running);
        let frame_duration =
            Duration::from_secs_f64(spec.frame_size as f64 / spec.sample_rate as f64);

        let task = tokio::spawn(async move {
            let step = 2.0 * PI * spec.frequency / spec.sample_rate as f32;
            let mut phase = 0.0f32;
            let mut sequence = 0u64;

            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if let Some(limit) = spec.frame_limit {
                    if sequence >= limit {
                        break;
                    }
                }

                let mut samples = Vec::with_capacity(spec.frame_size);
                for _ in 0..spec.frame_size {
                    samples.push(phase.sin() * spec.amplitude);
                    phase += step;
                    if phase > 2.0 * PI {
                        phase -= 2.0 * PI;
                    }
                }

                let frame = AudioFrame {
                    samples,
                    sample_rate: spec.sample_rate,
                    sequence,
                };
                sequence += 1;

                if tx.send(frame).await.is_err() {
                    break;
                }

                if spec.realtime {
                    tokio::time::sleep(frame_duration).await;
                }
            }
        });

        self.task = Some(task);

        Ok(CaptureStream {
            frames: rx,
            audio_tracks: self.spec.audio_tracks,
            sample_rate: self.spec.sample_rate,
        })
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Simulated capture stopped");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
