use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Audio output that plays buffers at absolute output-clock times
pub trait AudioSink: Send {
    /// Queue mono samples to start sounding at `start` on the output clock
    fn schedule(&mut self, samples: &[f32], sample_rate: u32, start: Duration) -> Result<()>;

    /// Drop everything queued that has not sounded yet
    fn stop(&mut self);
}

/// Sink that discards audio
#[derive(Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn schedule(&mut self, _samples: &[f32], _sample_rate: u32, _start: Duration) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Renders scheduled audio into a 16-bit mono WAV file
///
/// Output time zero is the first scheduled start; gaps between scheduled
/// buffers are written as silence so the file mirrors what a speaker would
/// have played.
pub struct WavFileSink {
    path: PathBuf,
    sample_rate: u32,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    origin: Option<Duration>,
    written_samples: u64,
}

impl WavFileSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        info!("Writing playback to {}", path.display());

        Ok(Self {
            path,
            sample_rate,
            writer: Some(writer),
            origin: None,
            written_samples: 0,
        })
    }

    /// Flush and close the file
    pub fn finish(mut self) -> Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
        }
        Ok(self.path.clone())
    }
}

impl AudioSink for WavFileSink {
    fn schedule(&mut self, samples: &[f32], sample_rate: u32, start: Duration) -> Result<()> {
        if sample_rate != self.sample_rate {
            warn!(
                "Playback sample rate mismatch: sink {}Hz, chunk {}Hz",
                self.sample_rate, sample_rate
            );
        }

        let origin = *self.origin.get_or_insert(start);
        let start_sample =
            (start.saturating_sub(origin).as_secs_f64() * self.sample_rate as f64).round() as u64;

        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        while self.written_samples < start_sample {
            writer.write_sample(0i16).context("Failed to write sample to WAV")?;
            self.written_samples += 1;
        }

        for &sample in crate::codec::float_to_pcm16(samples).iter() {
            writer.write_sample(sample).context("Failed to write sample to WAV")?;
        }
        self.written_samples += samples.len() as u64;

        debug!(
            "Wrote {} samples at {:.3}s",
            samples.len(),
            start_sample as f64 / self.sample_rate as f64
        );

        Ok(())
    }

    fn stop(&mut self) {
        // Audio already written has been "played"; nothing to cancel in a file.
    }
}

impl Drop for WavFileSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_sink_fills_gaps_with_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let mut sink = WavFileSink::create(&path, 1000).unwrap();
        sink.schedule(&[0.5; 10], 1000, Duration::from_millis(100)).unwrap();
        // 10 ms gap after the first buffer
        sink.schedule(&[0.5; 10], 1000, Duration::from_millis(120)).unwrap();
        sink.finish().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 30);
        assert!(samples[..10].iter().all(|&s| s > 0));
        assert!(samples[10..20].iter().all(|&s| s == 0));
        assert!(samples[20..].iter().all(|&s| s > 0));
    }
}
