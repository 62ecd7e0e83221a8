pub mod audio;
pub mod capture;
pub mod codec;
pub mod config;
pub mod http;
pub mod lipsync;
pub mod playback;
pub mod recording;
pub mod session;
pub mod transport;

/// Sample rate of all audio on the wire, in both directions
pub const TARGET_SAMPLE_RATE: u32 = 24_000;

pub use audio::{
    AudioFile, AudioFrame, AudioMixer, AudioSink, AudioStreamSource, CaptureDevice, ChannelDevice,
    LinearResampler, ManualClock, NullSink, OutputClock, SystemClock, WavFileDevice, WavFileSink,
};
pub use capture::{AudioChunk, CaptureConfig, CapturePipeline};
pub use codec::CodecError;
pub use config::Config;
pub use http::{create_router, AppState};
pub use lipsync::{AlignmentEvent, AvatarAnimator, BlendShapeSmoother, LipSyncTimeline, Viseme, VisemeWeight};
pub use playback::{PlaybackConfig, PlaybackEvent, PlaybackPipeline, ScheduledChunk};
pub use recording::{
    ChannelMediaSource, HttpUploader, MediaSource, MixedAudioSource, RecordingConfig,
    RecordingPipeline, UploadOutcome,
};
pub use session::{
    CapturePolicy, SessionConfig, SessionController, SessionHandle, SessionReport, SessionResources,
    SessionStats, SessionStatus, TranscriptEntry,
};
pub use transport::{ClientMessage, Connector, MemoryConnector, ServerMessage, WsConnector};
