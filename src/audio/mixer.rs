// Audio mixer for combining the candidate's microphone with remote speech
//
// This module provides mixing of two audio streams for the review recording:
// - Microphone input (the candidate)
// - Remote audio (synthesized interviewer speech played back locally)
//
// The mixer buffers frames from each stream, drops frames that fall too far
// behind, and mixes the samples together using simple addition with clipping.

use anyhow::Result;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

use super::backend::{AudioFrame, AudioStreamSource};

/// Configuration for audio mixer
///
/// Input and output are mono at `sample_rate`.
#[derive(Debug, Clone)]
pub struct MixerConfig {
    /// Sample rate every input frame must already have
    pub sample_rate: u32,
    /// Maximum buffering delay in milliseconds (default: 200ms)
    /// Frames older than this are dropped to prevent unbounded buffering
    pub max_buffer_delay_ms: u64,
    /// Sources to include in the mix
    pub enabled_sources: HashSet<AudioStreamSource>,
}

impl Default for MixerConfig {
    fn default() -> Self {
        let mut enabled_sources = HashSet::new();
        enabled_sources.insert(AudioStreamSource::Microphone);
        enabled_sources.insert(AudioStreamSource::Remote);

        Self {
            sample_rate: crate::TARGET_SAMPLE_RATE,
            max_buffer_delay_ms: 200,
            enabled_sources,
        }
    }
}

/// Audio mixer that combines multiple audio streams
pub struct AudioMixer {
    config: MixerConfig,
    /// Buffers for each audio source type
    buffers: HashMap<AudioStreamSource, VecDeque<AudioFrame>>,
    current_position_ms: u64,
}

impl AudioMixer {
    pub fn new(config: MixerConfig) -> Self {
        info!(
            "Audio mixer initialized: {}Hz mono, {} enabled sources, {}ms max delay",
            config.sample_rate,
            config.enabled_sources.len(),
            config.max_buffer_delay_ms
        );

        let mut buffers = HashMap::new();
        for source in &config.enabled_sources {
            buffers.insert(*source, VecDeque::new());
        }

        Self {
            config,
            buffers,
            current_position_ms: 0,
        }
    }

    /// Buffer a frame based on its source type
    pub fn push_frame(&mut self, frame: AudioFrame) {
        if !self.config.enabled_sources.contains(&frame.source) {
            debug!(
                "Skipping frame from disabled source: {:?} at {}ms",
                frame.source, frame.timestamp_ms
            );
            return;
        }

        if frame.sample_rate != self.config.sample_rate {
            warn!(
                "Frame sample rate mismatch: expected {}, got {}. Dropping frame.",
                self.config.sample_rate, frame.sample_rate
            );
            return;
        }

        if frame.channels != 1 {
            warn!(
                "Mixer takes mono frames, got {} channels. Dropping frame.",
                frame.channels
            );
            return;
        }

        if let Some(buffer) = self.buffers.get_mut(&frame.source) {
            buffer.push_back(frame);
        }

        self.cleanup_old_frames();
    }

    /// Mix everything currently buffered
    pub fn drain(&mut self) -> Result<Vec<f32>> {
        let mut mixed = Vec::new();
        while let Some(frame) = self.mix_next_chunk()? {
            mixed.extend(frame.samples);
        }
        Ok(mixed)
    }

    /// Remove frames that are too old (beyond max buffer delay)
    fn cleanup_old_frames(&mut self) {
        let cutoff_time = self
            .current_position_ms
            .saturating_sub(self.config.max_buffer_delay_ms);

        for (source, buffer) in &mut self.buffers {
            while let Some(frame) = buffer.front() {
                if frame.timestamp_ms < cutoff_time {
                    warn!(
                        "Dropping old {:?} frame at {}ms (current position: {}ms)",
                        source, frame.timestamp_ms, self.current_position_ms
                    );
                    buffer.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    /// Mix the next chunk of audio from all enabled source buffers
    ///
    /// Returns None if there's no data available in any buffer
    fn mix_next_chunk(&mut self) -> Result<Option<AudioFrame>> {
        let mut frames_to_mix: Vec<AudioFrame> = Vec::new();

        for buffer in self.buffers.values_mut() {
            if let Some(frame) = buffer.pop_front() {
                frames_to_mix.push(frame);
            }
        }

        if frames_to_mix.is_empty() {
            return Ok(None);
        }

        let mixed = self.mix_multiple_frames(&frames_to_mix)?;
        self.current_position_ms = self
            .current_position_ms
            .max(mixed.timestamp_ms + mixed.duration_ms() as u64);
        Ok(Some(mixed))
    }

    /// Mix audio frames together by adding their samples with clipping
    fn mix_multiple_frames(&self, frames: &[AudioFrame]) -> Result<AudioFrame> {
        if frames.is_empty() {
            anyhow::bail!("Cannot mix zero frames");
        }

        let timestamp_ms = frames
            .iter()
            .map(|f| f.timestamp_ms)
            .min()
            .unwrap_or(0);

        // Output is as long as the longest frame
        let max_len = frames.iter().map(|f| f.samples.len()).max().unwrap_or(0);
        let mut mixed_samples = Vec::with_capacity(max_len);

        for i in 0..max_len {
            let sum: f32 = frames
                .iter()
                .map(|frame| frame.samples.get(i).copied().unwrap_or(0.0))
                .sum();
            mixed_samples.push(sum.clamp(-1.0, 1.0));
        }

        Ok(AudioFrame {
            samples: mixed_samples,
            sample_rate: self.config.sample_rate,
            channels: 1,
            timestamp_ms,
            source: AudioStreamSource::Microphone,
        })
    }
}
