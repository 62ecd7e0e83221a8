use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::backend::{AudioFrame, AudioStreamSource, CaptureDevice};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
            anyhow::bail!(
                "Unsupported WAV format: {} bits {:?} (expected 16-bit PCM)",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Interleaved samples as floats in [-1, 1]
    pub fn to_float(&self) -> Vec<f32> {
        crate::codec::pcm16_to_float(&self.samples)
    }
}

/// Plays a WAV file as if it were a live microphone
///
/// Every subscriber receives the file in realtime-paced frames, followed by
/// silence for as long as the subscription is held, so downstream consumers
/// see an uninterrupted device.
pub struct WavFileDevice {
    name: String,
    sample_rate: u32,
    channels: u16,
    samples: Arc<Vec<f32>>,
    frame_duration: Duration,
}

impl WavFileDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = AudioFile::open(path)?;

        Ok(Self {
            name: file.path.clone(),
            sample_rate: file.sample_rate,
            channels: file.channels,
            samples: Arc::new(file.to_float()),
            frame_duration: Duration::from_millis(10),
        })
    }

    pub fn with_frame_duration(mut self, frame_duration: Duration) -> Self {
        self.frame_duration = frame_duration;
        self
    }

    fn frame_len(&self) -> usize {
        let per_channel =
            (self.sample_rate as f64 * self.frame_duration.as_secs_f64()).round() as usize;
        per_channel.max(1) * self.channels.max(1) as usize
    }
}

#[async_trait::async_trait]
impl CaptureDevice for WavFileDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(100);

        let samples = Arc::clone(&self.samples);
        let frame_len = self.frame_len();
        let frame_duration = self.frame_duration;
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);
            let mut offset = 0usize;
            let mut timestamp_ms = 0u64;

            loop {
                ticker.tick().await;

                let chunk = if offset < samples.len() {
                    let end = (offset + frame_len).min(samples.len());
                    let mut chunk = samples[offset..end].to_vec();
                    chunk.resize(frame_len, 0.0);
                    offset = end;
                    chunk
                } else {
                    vec![0.0; frame_len]
                };

                let frame = AudioFrame {
                    samples: chunk,
                    sample_rate,
                    channels,
                    timestamp_ms,
                    source: AudioStreamSource::Microphone,
                };

                if tx.send(frame).await.is_err() {
                    debug!("File device subscriber went away");
                    break;
                }

                timestamp_ms += frame_duration.as_millis() as u64;
            }
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
