use std::path::{Path, PathBuf};

use anyhow::Result;
use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::AcquisitionError;

use super::frame::AudioFrame;
use super::source::{CaptureBackend, CaptureStream};

/// Streams a WAV file as capture frames.
///
/// The frame channel closes at end-of-file, which drives the same
/// track-ended path a real stream takes when the user stops sharing.
#[derive(Debug)]
pub struct WavFileBackend {
    path: PathBuf,
    frame_size: usize,
    task: Option<JoinHandle<()>>,
}

impl WavFileBackend {
    pub fn new(path: impl AsRef<Path>, frame_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            frame_size,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for WavFileBackend {
    async fn start(&mut self) -> Result<CaptureStream, AcquisitionError> {
        let reader = WavReader::open(&self.path).map_err(|e| {
            AcquisitionError::Backend(format!("failed to open {}: {}", self.path.display(), e))
        })?;

        let spec = reader.spec();
        let raw: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                AcquisitionError::Backend(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        // Downmix to mono and normalize to [-1, 1]
        let samples: Vec<f32> = match spec.channels {
            1 => raw.iter().map(|&s| s as f32 / 32768.0).collect(),
            _ => raw
                .chunks(spec.channels as usize)
                .map(|frame| {
                    frame.iter().map(|&s| s as f32 / 32768.0).sum::<f32>()
                        / frame.len() as f32
                })
                .collect(),
        };

        info!(
            "WAV capture source: {} ({:.1}s, {} Hz, {} channel(s))",
            self.path.display(),
            samples.len() as f64 / spec.sample_rate as f64,
            spec.sample_rate,
            spec.channels
        );

        let (tx, rx) = mpsc::channel(100);
        let frame_size = self.frame_size;
        let sample_rate = spec.sample_rate;

        let task = tokio::spawn(async move {
            let mut sequence = 0u64;
            for block in samples.chunks(frame_size) {
                let frame = AudioFrame {
                    samples: block.to_vec(),
                    sample_rate,
                    sequence,
                };
                sequence += 1;
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
            // Sender drops here: the track has ended
        });

        self.task = Some(task);

        Ok(CaptureStream {
            frames: rx,
            audio_tracks: 1,
            sample_rate: spec.sample_rate,
        })
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
