//! Microphone capture pipeline
//!
//! Pulls native-rate frames from a [`CaptureDevice`], downmixes to mono,
//! resamples to the wire rate and slices fixed-duration frames that are
//! emitted as sequenced, encoded [`AudioChunk`]s.

use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::audio::{AudioFrame, CaptureDevice, LinearResampler};
use crate::codec;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Wire sample rate (default: 24kHz)
    pub target_sample_rate: u32,
    /// Duration of each emitted chunk (default: 100ms)
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: crate::TARGET_SAMPLE_RATE,
            frame_duration_ms: 100,
        }
    }
}

impl CaptureConfig {
    /// Samples per emitted frame at the target rate
    pub fn frame_samples(&self) -> usize {
        (self.target_sample_rate as u64 * self.frame_duration_ms / 1000) as usize
    }
}

/// One outbound frame of microphone audio
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Position in the outbound stream, starting at 0
    pub seq: u64,
    /// 16-bit mono samples at the target rate
    pub samples: Vec<i16>,
    /// Base64 text of the little-endian samples
    pub encoded: String,
}

impl AudioChunk {
    /// Size of the PCM payload before text encoding
    pub fn byte_len(&self) -> usize {
        self.samples.len() * 2
    }
}

pub struct CapturePipeline {
    device: Arc<dyn CaptureDevice>,
    config: CaptureConfig,
    resampler: LinearResampler,
    /// Target-rate samples not yet sliced into a frame
    buffer: Vec<f32>,
    ready: VecDeque<AudioChunk>,
    frames_rx: Option<mpsc::Receiver<AudioFrame>>,
    seq: u64,
    capturing: bool,
    disposed: bool,
}

impl CapturePipeline {
    /// Bind to a device at its native rate
    pub fn new(device: Arc<dyn CaptureDevice>, config: CaptureConfig) -> Self {
        let resampler = LinearResampler::new(device.sample_rate(), config.target_sample_rate);

        info!(
            "Capture pipeline bound to {} ({}Hz -> {}Hz, {}ms frames)",
            device.name(),
            device.sample_rate(),
            config.target_sample_rate,
            config.frame_duration_ms
        );

        Self {
            device,
            config,
            resampler,
            buffer: Vec::new(),
            ready: VecDeque::new(),
            frames_rx: None,
            seq: 0,
            capturing: false,
            disposed: false,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Begin continuous capture; sequence numbers restart at 0
    pub async fn start(&mut self) -> Result<()> {
        if self.disposed {
            bail!("Capture pipeline has been disposed");
        }
        if self.capturing {
            warn!("Capture already started");
            return Ok(());
        }

        let rx = self
            .device
            .subscribe()
            .await
            .with_context(|| format!("Failed to open capture device {}", self.device.name()))?;

        self.reset_cycle();
        self.frames_rx = Some(rx);
        self.capturing = true;

        info!("Capture started");
        Ok(())
    }

    /// Handle one device callback's worth of audio
    ///
    /// Returns every complete frame the callback finished, in sequence order.
    pub fn ingest(&mut self, frame: &AudioFrame) -> Vec<AudioChunk> {
        if !self.capturing {
            return Vec::new();
        }

        if frame.sample_rate != self.resampler.source_rate() {
            warn!(
                "Device rate changed from {}Hz to {}Hz",
                self.resampler.source_rate(),
                frame.sample_rate
            );
            self.resampler = LinearResampler::new(frame.sample_rate, self.config.target_sample_rate);
        }

        let mono = frame.to_mono();
        let resampled = self.resampler.process(&mono);
        self.buffer.extend_from_slice(&resampled);

        let frame_samples = self.config.frame_samples().max(1);
        let mut chunks = Vec::new();

        while self.buffer.len() >= frame_samples {
            let rest = self.buffer.split_off(frame_samples);
            let frame = std::mem::replace(&mut self.buffer, rest);

            let samples = codec::float_to_pcm16(&frame);
            let encoded = codec::encode_pcm16(&samples);
            let chunk = AudioChunk {
                seq: self.seq,
                samples,
                encoded,
            };
            self.seq += 1;

            debug!("Captured chunk {} ({} bytes)", chunk.seq, chunk.byte_len());
            chunks.push(chunk);
        }

        chunks
    }

    /// Wait for the next completed frame
    ///
    /// Returns None when capture is stopped or the device stream ends.
    /// Cancel-safe: frames pulled from the device are parked until returned.
    pub async fn next_chunk(&mut self) -> Option<AudioChunk> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(chunk);
            }
            if !self.capturing {
                return None;
            }

            let frame = self.frames_rx.as_mut()?.recv().await;
            match frame {
                Some(frame) => {
                    let chunks = self.ingest(&frame);
                    self.ready.extend(chunks);
                }
                None => {
                    warn!("Capture device stream ended");
                    self.capturing = false;
                    self.frames_rx = None;
                    return None;
                }
            }
        }
    }

    /// Halt emission; the partial frame still buffered is dropped, not flushed
    pub fn stop(&mut self) {
        if !self.capturing {
            return;
        }

        if !self.buffer.is_empty() {
            debug!("Dropping {} buffered samples on stop", self.buffer.len());
        }

        self.capturing = false;
        self.frames_rx = None;
        self.buffer.clear();
        self.ready.clear();

        info!("Capture stopped after {} chunks", self.seq);
    }

    /// Release the device subscription
    ///
    /// The device itself keeps running; other consumers may still hold it.
    pub fn dispose(&mut self) {
        self.stop();
        self.disposed = true;
        info!("Capture pipeline released {}", self.device.name());
    }

    /// Number of chunks emitted in the current cycle
    pub fn chunks_emitted(&self) -> u64 {
        self.seq
    }

    fn reset_cycle(&mut self) {
        self.seq = 0;
        self.buffer.clear();
        self.ready.clear();
        self.resampler.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioStreamSource, ChannelDevice};

    fn mic_frame(samples: Vec<f32>, sample_rate: u32) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels: 1,
            timestamp_ms: 0,
            source: AudioStreamSource::Microphone,
        }
    }

    #[test]
    fn test_frame_samples_at_24khz() {
        assert_eq!(CaptureConfig::default().frame_samples(), 2400);
    }

    #[tokio::test]
    async fn test_ingest_before_start_emits_nothing() {
        let device = Arc::new(ChannelDevice::new(48000, 1));
        let mut capture = CapturePipeline::new(device, CaptureConfig::default());

        assert!(capture.ingest(&mic_frame(vec![0.0; 9600], 48000)).is_empty());
    }

    #[tokio::test]
    async fn test_remainder_is_retained_between_callbacks() {
        let device = Arc::new(ChannelDevice::new(48000, 1));
        let mut capture = CapturePipeline::new(device, CaptureConfig::default());
        capture.start().await.unwrap();

        // 60ms per callback: nothing, then one frame, then one more
        assert!(capture.ingest(&mic_frame(vec![0.0; 2880], 48000)).is_empty());
        let chunks = capture.ingest(&mic_frame(vec![0.0; 2880], 48000));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].seq, 0);
        let chunks = capture.ingest(&mic_frame(vec![0.0; 4800], 48000));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].seq, 1);
    }

    #[tokio::test]
    async fn test_samples_are_clamped_to_pcm16() {
        let device = Arc::new(ChannelDevice::new(24000, 1));
        let mut capture = CapturePipeline::new(device, CaptureConfig::default());
        capture.start().await.unwrap();

        let chunks = capture.ingest(&mic_frame(vec![1.5; 2400], 24000));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].samples.iter().all(|&s| s == i16::MAX));
    }

    #[tokio::test]
    async fn test_restart_resets_sequence() {
        let device = Arc::new(ChannelDevice::new(24000, 1));
        let mut capture = CapturePipeline::new(device, CaptureConfig::default());

        capture.start().await.unwrap();
        capture.ingest(&mic_frame(vec![0.0; 4800], 24000));
        assert_eq!(capture.chunks_emitted(), 2);
        capture.stop();

        capture.start().await.unwrap();
        let chunks = capture.ingest(&mic_frame(vec![0.0; 2400], 24000));
        assert_eq!(chunks[0].seq, 0);
    }

    #[tokio::test]
    async fn test_start_after_dispose_fails() {
        let device = Arc::new(ChannelDevice::new(24000, 1));
        let mut capture = CapturePipeline::new(device, CaptureConfig::default());
        capture.dispose();
        assert!(capture.start().await.is_err());
    }
}
