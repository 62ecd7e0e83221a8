pub mod backend;
pub mod clock;
pub mod file;
pub mod mixer;
pub mod resample;
pub mod sink;

pub use backend::{AudioFrame, AudioStreamSource, CaptureDevice, ChannelDevice, ChannelDeviceSender};
pub use clock::{ManualClock, OutputClock, SystemClock};
pub use file::{AudioFile, WavFileDevice};
pub use mixer::{AudioMixer, MixerConfig};
pub use resample::LinearResampler;
pub use sink::{AudioSink, NullSink, WavFileSink};
