use anyhow::{bail, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Audio stream source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioStreamSource {
    /// Candidate microphone
    Microphone,
    /// Synthesized speech received from the backend
    Remote,
}

/// Block of float samples delivered by a device callback (interleaved, [-1, 1])
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the device started
    pub timestamp_ms: u64,
    pub source: AudioStreamSource,
}

impl AudioFrame {
    pub fn duration_ms(&self) -> f64 {
        let per_channel = self.samples.len() / self.channels.max(1) as usize;
        per_channel as f64 * 1000.0 / self.sample_rate.max(1) as f64
    }

    /// Average interleaved channels down to one
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Live audio input device
///
/// A device may be shared by several consumers (capture, recording); each
/// `subscribe` call returns an independent stream of frames, and dropping the
/// receiver releases that subscription without stopping the device.
#[async_trait::async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Native sample rate in Hz
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Start receiving frames
    async fn subscribe(&self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Device name for logging
    fn name(&self) -> &str;
}

/// Device fed from an in-process channel
///
/// Frames pushed through [`ChannelDevice::sender`] are fanned out to every
/// live subscriber. Used when an embedding application owns the real
/// microphone callback.
pub struct ChannelDevice {
    sample_rate: u32,
    channels: u16,
    subscribers: Arc<Mutex<Vec<mpsc::Sender<AudioFrame>>>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelDevice {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            subscribers: Arc::new(Mutex::new(Vec::new())),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle used to push frames into the device
    pub fn sender(&self) -> ChannelDeviceSender {
        ChannelDeviceSender {
            subscribers: Arc::clone(&self.subscribers),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

#[derive(Clone)]
pub struct ChannelDeviceSender {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<AudioFrame>>>>,
    dropped: Arc<AtomicU64>,
}

impl ChannelDeviceSender {
    /// Deliver a frame to all subscribers, dropping closed ones
    ///
    /// Never waits: a subscriber whose queue is full misses the frame, so a
    /// slow consumer cannot stall the others. Returns the number of
    /// subscribers that received the frame.
    pub fn push(&self, frame: AudioFrame) -> usize {
        let targets: Vec<mpsc::Sender<AudioFrame>> = match self.subscribers.lock() {
            Ok(subs) => subs.clone(),
            Err(_) => return 0,
        };

        let mut delivered = 0;
        for tx in &targets {
            match tx.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!("Subscriber lagging; dropped frame at {}ms ({} total)", frame.timestamp_ms, dropped);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| !tx.is_closed());
        }

        delivered
    }

    /// Frames missed by lagging subscribers so far
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ChannelDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(100);
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => bail!("Channel device is poisoned"),
        }

        info!(
            "Subscribed to channel device ({}Hz, {} channels)",
            self.sample_rate, self.channels
        );

        Ok(rx)
    }

    fn name(&self) -> &str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_frame_downmixes_by_averaging() {
        let frame = AudioFrame {
            samples: vec![0.5, 0.1, -0.2, -0.4],
            sample_rate: 48000,
            channels: 2,
            timestamp_ms: 0,
            source: AudioStreamSource::Microphone,
        };

        let mono = frame.to_mono();
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_frame_duration() {
        let frame = AudioFrame {
            samples: vec![0.0; 4800],
            sample_rate: 48000,
            channels: 1,
            timestamp_ms: 0,
            source: AudioStreamSource::Microphone,
        };
        assert!((frame.duration_ms() - 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_channel_device_fans_out_to_subscribers() {
        let device = ChannelDevice::new(48000, 1);
        let mut a = device.subscribe().await.unwrap();
        let mut b = device.subscribe().await.unwrap();

        let sender = device.sender();
        let frame = AudioFrame {
            samples: vec![0.25; 10],
            sample_rate: 48000,
            channels: 1,
            timestamp_ms: 0,
            source: AudioStreamSource::Microphone,
        };
        assert_eq!(sender.push(frame), 2);

        assert_eq!(a.recv().await.unwrap().samples.len(), 10);
        assert_eq!(b.recv().await.unwrap().samples.len(), 10);

        drop(a);
        let frame = AudioFrame {
            samples: vec![0.0; 4],
            sample_rate: 48000,
            channels: 1,
            timestamp_ms: 10,
            source: AudioStreamSource::Microphone,
        };
        assert_eq!(sender.push(frame), 1);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_stall_others() {
        let device = ChannelDevice::new(24000, 1);
        let _lagging = device.subscribe().await.unwrap();
        let mut live = device.subscribe().await.unwrap();
        let sender = device.sender();

        for i in 0..150u64 {
            let frame = AudioFrame {
                samples: vec![0.0; 48],
                sample_rate: 24000,
                channels: 1,
                timestamp_ms: i * 2,
                source: AudioStreamSource::Microphone,
            };
            let delivered = sender.push(frame);
            assert_eq!(delivered, if i < 100 { 2 } else { 1 });
            assert_eq!(live.recv().await.unwrap().timestamp_ms, i * 2);
        }

        assert_eq!(sender.dropped_frames(), 50);
    }
}
