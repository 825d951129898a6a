pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod minutes;
pub mod session;
pub mod transcribe;
pub mod transcript;

pub use audio::{
    AudioFrame, AudioPipeline, CaptureBackend, CaptureBackendFactory, CaptureConstraints,
    CaptureStream, DefaultCaptureFactory, EncodedAudioChunk, SimulatedBackend, SimulatedSpec,
    SourceKind, SourceManager, VolumeSmoother, WavFileBackend,
};
pub use config::Config;
pub use error::{AcquisitionError, GenerationError, SessionError, TranscribeError};
pub use http::{create_router, AppState};
pub use minutes::{ActionItem, MeetingMinutes, MinutesGenerator, NatsMinutesGenerator};
pub use session::{MeetingController, MeetingStatus, SessionConfig, SessionSnapshot, StopReason};
pub use transcribe::{
    BatchTranscriptionService, NatsSttService, StreamSender, StreamingTranscriptionService,
    TranscriptSegment, TranscriptionMode, TranscriptionService, TranscriptionStrategy,
};
pub use transcript::TranscriptAccumulator;
