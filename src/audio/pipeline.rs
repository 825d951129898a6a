use base64::Engine;

use super::frame::AudioFrame;

/// Target transport sample rate (speech services expect 16kHz)
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Root-mean-square level of one frame
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Exponential moving average over per-frame RMS, used as the live level
/// indicator. Owned by the session, not the pipeline.
#[derive(Debug, Clone, Default)]
pub struct VolumeSmoother {
    level: f32,
}

impl VolumeSmoother {
    pub fn new() -> Self {
        Self { level: 0.0 }
    }

    /// Folds one frame's RMS into the smoothed level (0.8 old / 0.2 new)
    pub fn update(&mut self, frame_rms: f32) -> f32 {
        self.level = self.level * 0.8 + frame_rms * 0.2;
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

/// Box-filter decimation: each output sample is the mean of the input
/// samples in its window, with boundaries at `round((i + 1) * in/out)`.
/// Good enough for speech intelligibility, not for archival fidelity.
/// Identity when the rates already match.
pub fn downsample(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input_rate == output_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = input_rate as f64 / output_rate as f64;
    let out_len = (samples.len() as f64 * output_rate as f64 / input_rate as f64).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    let mut start = 0usize;
    for i in 0..out_len {
        if start >= samples.len() {
            break;
        }
        let end = (((i + 1) as f64 * ratio).round() as usize)
            .min(samples.len())
            .max(start + 1);
        let window = &samples[start..end];
        out.push(window.iter().sum::<f32>() / window.len() as f32);
        start = end;
    }

    out
}

/// 16-bit signed little-endian PCM encoding. Samples are clamped to
/// [-1, 1]; non-negative values scale by 32767 and negative by 32768, so
/// the full signed range is used without overflow.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut pcm = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = if clamped >= 0.0 {
            (clamped * 32767.0) as i16
        } else {
            (clamped * 32768.0) as i16
        };
        pcm.extend_from_slice(&value.to_le_bytes());
    }
    pcm
}

/// Encoded form of one or more frames, ready for transport
#[derive(Debug, Clone)]
pub struct EncodedAudioChunk {
    /// 16-bit signed little-endian PCM
    pub pcm: Vec<u8>,
    /// Declared sample rate after resampling
    pub sample_rate: u32,
}

impl EncodedAudioChunk {
    /// MIME-style descriptor carrying the declared rate
    pub fn mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.sample_rate)
    }

    /// Text-safe transport representation of the PCM bytes
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.pcm)
    }

    pub fn sample_count(&self) -> usize {
        self.pcm.len() / 2
    }
}

/// Turns captured frames into transport-ready chunks. Stateless per frame.
#[derive(Debug, Clone)]
pub struct AudioPipeline {
    target_rate: u32,
}

impl AudioPipeline {
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    /// Resample to the target rate and encode as PCM16
    pub fn process(&self, frame: &AudioFrame) -> EncodedAudioChunk {
        let samples = downsample(&frame.samples, frame.sample_rate, self.target_rate);
        EncodedAudioChunk {
            pcm: encode_pcm16(&samples),
            sample_rate: self.target_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_mime_type_carries_rate() {
        let chunk = EncodedAudioChunk {
            pcm: vec![0, 0],
            sample_rate: 16000,
        };
        assert_eq!(chunk.mime_type(), "audio/pcm;rate=16000");
        assert_eq!(chunk.sample_count(), 1);
    }

    #[test]
    fn test_chunk_base64_known_bytes() {
        let chunk = EncodedAudioChunk {
            pcm: vec![0x01, 0x02, 0x03],
            sample_rate: 16000,
        };
        assert_eq!(chunk.to_base64(), "AQID");
    }

    #[test]
    fn test_pipeline_passthrough_at_target_rate() {
        let pipeline = AudioPipeline::new(16000);
        let frame = AudioFrame {
            samples: vec![0.0, 0.5, -0.5],
            sample_rate: 16000,
            sequence: 0,
        };
        let chunk = pipeline.process(&frame);
        assert_eq!(chunk.sample_count(), 3);
        assert_eq!(chunk.sample_rate, 16000);
    }
}
