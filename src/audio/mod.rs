pub mod frame;
pub mod pipeline;
pub mod sim;
pub mod source;
pub mod wav;

pub use frame::{AudioFrame, CaptureConstraints, SourceKind, FRAME_SIZE};
pub use pipeline::{
    downsample, encode_pcm16, rms, AudioPipeline, EncodedAudioChunk, VolumeSmoother,
    TARGET_SAMPLE_RATE,
};
pub use sim::{SimulatedBackend, SimulatedSpec};
pub use source::{
    CaptureBackend, CaptureBackendFactory, CaptureStream, DefaultCaptureFactory, SourceManager,
};
pub use wav::WavFileBackend;
