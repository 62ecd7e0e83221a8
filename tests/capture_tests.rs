// Integration tests for the capture pipeline
//
// These tests push device-rate frames through a channel device and verify
// that sequenced 100ms chunks come out at the wire rate.

use anyhow::Result;
use interview_media::audio::{AudioFrame, AudioStreamSource, CaptureDevice, ChannelDevice};
use interview_media::codec;
use interview_media::{CaptureConfig, CapturePipeline};
use std::sync::Arc;

fn mic_frame(samples: Vec<f32>, sample_rate: u32, channels: u16, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate,
        channels,
        timestamp_ms,
        source: AudioStreamSource::Microphone,
    }
}

#[tokio::test]
async fn test_three_callbacks_at_48khz_yield_three_chunks() -> Result<()> {
    let device = Arc::new(ChannelDevice::new(48000, 1));
    let sender = device.sender();
    let mut capture = CapturePipeline::new(device, CaptureConfig::default());
    capture.start().await?;

    // 3 x 100ms at 48kHz
    for i in 0..3 {
        sender.push(mic_frame(vec![0.1; 4800], 48000, 1, i * 100));
    }

    for expected_seq in 0..3 {
        let chunk = capture.next_chunk().await.expect("chunk");
        assert_eq!(chunk.seq, expected_seq);
        assert_eq!(chunk.byte_len(), 4800);

        // The encoded text decodes back to the same 2400 samples
        let decoded = codec::decode_pcm16(&chunk.encoded)?;
        assert_eq!(decoded.len(), 2400);
        assert_eq!(decoded, chunk.samples);
    }

    assert_eq!(capture.chunks_emitted(), 3);
    Ok(())
}

#[tokio::test]
async fn test_stereo_device_is_downmixed() -> Result<()> {
    let device = Arc::new(ChannelDevice::new(24000, 2));
    let sender = device.sender();
    let mut capture = CapturePipeline::new(device, CaptureConfig::default());
    capture.start().await?;

    // Left at 0.5, right at -0.5 averages to silence
    let samples: Vec<f32> = (0..4800).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
    sender.push(mic_frame(samples, 24000, 2, 0));

    let chunk = capture.next_chunk().await.expect("chunk");
    assert_eq!(chunk.samples.len(), 2400);
    assert!(chunk.samples.iter().all(|&s| s == 0));
    Ok(())
}

#[tokio::test]
async fn test_sequence_is_strictly_increasing_across_uneven_callbacks() -> Result<()> {
    let device = Arc::new(ChannelDevice::new(44100, 1));
    let sender = device.sender();
    let mut capture = CapturePipeline::new(device, CaptureConfig::default());
    capture.start().await?;

    // About one second of 44.1kHz audio in odd-sized callbacks
    for i in 0..43 {
        sender.push(mic_frame(vec![0.0; 1031], 44100, 1, i * 23));
    }

    let mut last = None;
    for _ in 0..9 {
        let chunk = capture.next_chunk().await.expect("chunk");
        if let Some(prev) = last {
            assert_eq!(chunk.seq, prev + 1);
        }
        assert_eq!(chunk.samples.len(), 2400);
        last = Some(chunk.seq);
    }

    Ok(())
}

#[tokio::test]
async fn test_stop_ends_the_chunk_stream() -> Result<()> {
    let device = Arc::new(ChannelDevice::new(24000, 1));
    let sender = device.sender();
    let mut capture = CapturePipeline::new(device, CaptureConfig::default());
    capture.start().await?;

    // Half a frame stays buffered
    sender.push(mic_frame(vec![0.0; 1200], 24000, 1, 0));
    capture.stop();

    assert!(!capture.is_capturing());
    assert!(capture.next_chunk().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_device_stream_end_is_reported() -> Result<()> {
    struct ClosedDevice;

    #[async_trait::async_trait]
    impl CaptureDevice for ClosedDevice {
        fn sample_rate(&self) -> u32 {
            24000
        }
        fn channels(&self) -> u16 {
            1
        }
        async fn subscribe(&self) -> Result<tokio::sync::mpsc::Receiver<AudioFrame>> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(rx)
        }
        fn name(&self) -> &str {
            "closed"
        }
    }

    let mut capture = CapturePipeline::new(Arc::new(ClosedDevice), CaptureConfig::default());
    capture.start().await?;

    assert!(capture.next_chunk().await.is_none());
    assert!(!capture.is_capturing());
    Ok(())
}
