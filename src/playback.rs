//! Gapless playback scheduling
//!
//! Inbound chunks arrive in bursts and at irregular intervals. Each one is
//! placed on the output clock exactly where the previous one ends, so as long
//! as chunks arrive faster than realtime on average the utterance plays
//! without gaps. The first chunk of an utterance is pushed out by a small
//! lookahead to absorb decode jitter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::audio::{AudioSink, OutputClock};
use crate::codec::{self, CodecError};

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Sample rate of inbound speech (default: 24kHz)
    pub sample_rate: u32,
    /// Delay before the first chunk of an utterance (default: 50ms)
    pub lookahead: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::TARGET_SAMPLE_RATE,
            lookahead: Duration::from_millis(50),
        }
    }
}

/// Utterance boundaries, delivered through [`PlaybackPipeline::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// First chunk of an utterance was scheduled; audio sounds from `at`
    Started { at: Duration },
    /// Nothing further is scheduled, or playback was stopped
    Ended,
}

/// Where a chunk landed on the output clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledChunk {
    pub start: Duration,
    pub duration: Duration,
    /// This chunk opened a new utterance
    pub opened_utterance: bool,
}

#[derive(Debug, Clone, Copy)]
struct Utterance {
    started_at: Duration,
    next_start: Duration,
    chunks: u64,
}

pub struct PlaybackPipeline {
    clock: Arc<dyn OutputClock>,
    sink: Box<dyn AudioSink>,
    config: PlaybackConfig,
    utterance: Option<Utterance>,
    events: VecDeque<PlaybackEvent>,
}

impl PlaybackPipeline {
    pub fn new(clock: Arc<dyn OutputClock>, sink: Box<dyn AudioSink>, config: PlaybackConfig) -> Self {
        info!(
            "Playback pipeline initialized ({}Hz, {}ms lookahead)",
            config.sample_rate,
            config.lookahead.as_millis()
        );

        Self {
            clock,
            sink,
            config,
            utterance: None,
            events: VecDeque::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Decode a wire chunk and append it to the schedule
    ///
    /// A malformed payload is rejected before any scheduling state changes.
    /// An empty payload is a heartbeat: it opens an utterance if none is
    /// playing but schedules no audio.
    pub fn play_chunk(&mut self, encoded: &str) -> Result<ScheduledChunk, CodecError> {
        let samples = codec::decode_chunk(encoded)?;
        Ok(self.play_samples(&samples))
    }

    /// Append already-decoded samples to the schedule
    pub fn play_samples(&mut self, samples: &[f32]) -> ScheduledChunk {
        let now = self.clock.now();
        self.check_finished(now);

        let opened_utterance = self.utterance.is_none();
        let utterance = self.utterance.get_or_insert_with(|| {
            let start = now + self.config.lookahead;
            self.events.push_back(PlaybackEvent::Started { at: start });
            info!("Playback started at {:.3}s", start.as_secs_f64());
            Utterance {
                started_at: start,
                next_start: start,
                chunks: 0,
            }
        });

        let start = utterance.next_start;
        let duration =
            Duration::from_secs_f64(samples.len() as f64 / self.config.sample_rate.max(1) as f64);

        if !samples.is_empty() {
            if let Err(e) = self.sink.schedule(samples, self.config.sample_rate, start) {
                warn!("Audio sink rejected chunk: {}", e);
            }
        }

        utterance.next_start = start + duration;
        utterance.chunks += 1;

        debug!(
            "Scheduled chunk {} at {:.3}s for {}ms",
            utterance.chunks,
            start.as_secs_f64(),
            duration.as_millis()
        );

        ScheduledChunk {
            start,
            duration,
            opened_utterance,
        }
    }

    /// Next pending utterance event, if any
    pub fn poll(&mut self) -> Option<PlaybackEvent> {
        let now = self.clock.now();
        self.check_finished(now);
        self.events.pop_front()
    }

    /// Time since the current utterance started sounding; zero when idle
    pub fn current_playback_time(&self) -> Duration {
        let now = self.clock.now();
        match &self.utterance {
            Some(u) if now < u.next_start => now.saturating_sub(u.started_at),
            _ => Duration::ZERO,
        }
    }

    /// Output-clock time at which everything scheduled will have played
    pub fn scheduled_until(&self) -> Option<Duration> {
        self.utterance.as_ref().map(|u| u.next_start)
    }

    pub fn is_active(&self) -> bool {
        self.utterance.is_some()
    }

    /// Abandon the current utterance immediately
    ///
    /// Audio already handed to the sink may still sound briefly, but the
    /// utterance is finished for control purposes. Emits exactly one `Ended`
    /// per active utterance; repeated calls do nothing.
    pub fn stop(&mut self) {
        if let Some(utterance) = self.utterance.take() {
            self.sink.stop();
            self.events.push_back(PlaybackEvent::Ended);
            info!("Playback stopped after {} chunks", utterance.chunks);
        }
    }

    fn check_finished(&mut self, now: Duration) {
        if let Some(utterance) = &self.utterance {
            if now >= utterance.next_start {
                info!(
                    "Playback finished ({} chunks, {}ms)",
                    utterance.chunks,
                    utterance.next_start.saturating_sub(utterance.started_at).as_millis()
                );
                self.utterance = None;
                self.events.push_back(PlaybackEvent::Ended);
            }
        }
    }
}
