use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::{
    AudioFrame, AudioMixer, AudioStreamSource, CaptureDevice, LinearResampler, MixerConfig,
};
use crate::codec;

/// Producer of recording bytes, polled once per timeslice
#[async_trait::async_trait]
pub trait MediaSource: Send {
    /// Bytes produced since the previous call; may be empty
    async fn take_chunk(&mut self) -> Result<Vec<u8>>;

    /// Turn the collected chunks into the uploaded blob
    fn finalize(&mut self, chunks: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        Ok(chunks.concat())
    }

    fn mime_type(&self) -> &str;

    /// File extension for the fallback copy
    fn extension(&self) -> &str;
}

/// Container bytes encoded elsewhere (e.g. a browser or camera encoder)
///
/// Chunks are already self-describing pieces of one container stream, so the
/// final blob is their plain concatenation.
pub struct ChannelMediaSource {
    rx: mpsc::Receiver<Vec<u8>>,
    mime_type: String,
    extension: String,
}

impl ChannelMediaSource {
    pub fn new(
        mime_type: impl Into<String>,
        extension: impl Into<String>,
    ) -> (Self, mpsc::Sender<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(64);
        let source = Self {
            rx,
            mime_type: mime_type.into(),
            extension: extension.into(),
        };
        (source, tx)
    }

    /// WebM video, the usual camera container
    pub fn webm() -> (Self, mpsc::Sender<Vec<u8>>) {
        Self::new("video/webm", "webm")
    }
}

#[async_trait::async_trait]
impl MediaSource for ChannelMediaSource {
    async fn take_chunk(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        while let Ok(chunk) = self.rx.try_recv() {
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn extension(&self) -> &str {
        &self.extension
    }
}

/// Candidate microphone mixed with the interviewer's speech
///
/// Microphone frames set the pace: for every resampled mic frame the same
/// number of remote samples is taken from the speech backlog (silence when
/// there is none), so bursty speech lands where it was heard. Chunks carry
/// raw 16-bit PCM; `finalize` adds the WAV header.
pub struct MixedAudioSource {
    mic_rx: mpsc::Receiver<AudioFrame>,
    remote_rx: mpsc::Receiver<AudioFrame>,
    mic_resampler: LinearResampler,
    remote_resampler: Option<LinearResampler>,
    remote_backlog: VecDeque<f32>,
    mixer: AudioMixer,
    sample_rate: u32,
}

impl MixedAudioSource {
    /// Subscribe to `device`; returns the source and the sender for remote speech
    pub async fn start(
        device: Arc<dyn CaptureDevice>,
        config: MixerConfig,
    ) -> Result<(Self, mpsc::Sender<AudioFrame>)> {
        let mic_rx = device
            .subscribe()
            .await
            .context("Failed to subscribe recording to microphone")?;
        let (remote_tx, remote_rx) = mpsc::channel(256);

        let sample_rate = config.sample_rate;

        info!(
            "Mixed audio recording started from {} ({}Hz -> {}Hz)",
            device.name(),
            device.sample_rate(),
            sample_rate
        );

        let source = Self {
            mic_rx,
            remote_rx,
            mic_resampler: LinearResampler::new(device.sample_rate(), sample_rate),
            remote_resampler: None,
            remote_backlog: VecDeque::new(),
            mixer: AudioMixer::new(config),
            sample_rate,
        };

        Ok((source, remote_tx))
    }

    fn collect_remote(&mut self) {
        while let Ok(frame) = self.remote_rx.try_recv() {
            let mono = frame.to_mono();
            let samples = if frame.sample_rate == self.sample_rate {
                mono
            } else {
                let target = self.sample_rate;
                let resampler = self
                    .remote_resampler
                    .get_or_insert_with(|| LinearResampler::new(frame.sample_rate, target));
                resampler.process(&mono)
            };
            self.remote_backlog.extend(samples);
        }
    }

    fn mix_pending(&mut self) -> Result<Vec<f32>> {
        self.collect_remote();

        while let Ok(frame) = self.mic_rx.try_recv() {
            let mic = self.mic_resampler.process(&frame.to_mono());
            if mic.is_empty() {
                continue;
            }

            let take = mic.len().min(self.remote_backlog.len());
            let mut remote: Vec<f32> = self.remote_backlog.drain(..take).collect();
            remote.resize(mic.len(), 0.0);

            for (samples, source) in [
                (mic, AudioStreamSource::Microphone),
                (remote, AudioStreamSource::Remote),
            ] {
                self.mixer.push_frame(AudioFrame {
                    samples,
                    sample_rate: self.sample_rate,
                    channels: 1,
                    timestamp_ms: frame.timestamp_ms,
                    source,
                });
            }
        }

        self.mixer.drain()
    }
}

#[async_trait::async_trait]
impl MediaSource for MixedAudioSource {
    async fn take_chunk(&mut self) -> Result<Vec<u8>> {
        let mixed = self.mix_pending()?;
        debug!("Mixed {} recording samples", mixed.len());
        Ok(codec::pcm16_to_bytes(&codec::float_to_pcm16(&mixed)))
    }

    fn finalize(&mut self, chunks: Vec<Vec<u8>>) -> Result<Vec<u8>> {
        let pcm = chunks.concat();
        if pcm.len() % 2 != 0 {
            warn!("Recording has a trailing odd byte; dropping it");
        }

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
            for pair in pcm.chunks_exact(2) {
                writer
                    .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV recording")?;
        }

        Ok(cursor.into_inner())
    }

    fn mime_type(&self) -> &str {
        "audio/wav"
    }

    fn extension(&self) -> &str {
        "wav"
    }
}
