use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::viseme::{Viseme, VisemeWeight};

/// Timing annotation for one phoneme or character of an utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentEvent {
    pub label: String,
    /// Offset from the start of the utterance
    pub offset: Duration,
    pub duration: Duration,
}

impl AlignmentEvent {
    pub fn new(label: impl Into<String>, offset: Duration, duration: Duration) -> Self {
        Self {
            label: label.into(),
            offset,
            duration,
        }
    }
}

/// Alignment event placed on the output clock
#[derive(Debug, Clone, Copy)]
struct TimedViseme {
    viseme: Viseme,
    start: Duration,
    end: Duration,
}

/// Answers "which mouth shapes are active at time t" for the playing utterance
#[derive(Debug, Default)]
pub struct LipSyncTimeline {
    events: Vec<TimedViseme>,
}

impl LipSyncTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a batch anchored at `base` on the output clock
    pub fn add_alignment_data(&mut self, events: &[AlignmentEvent], base: Duration) {
        for event in events {
            let start = base + event.offset;
            self.events.push(TimedViseme {
                viseme: Viseme::from_label(&event.label),
                start,
                end: start + event.duration,
            });
        }

        debug!(
            "Added {} alignment events at {:.3}s ({} stored)",
            events.len(),
            base.as_secs_f64(),
            self.events.len()
        );
    }

    /// Active blend targets at `t`, each at full weight
    ///
    /// Windows are half-open (`start <= t < end`). When no window contains
    /// `t` the silence target is returned.
    pub fn current_visemes(&self, t: Duration) -> Vec<VisemeWeight> {
        let mut active: Vec<Viseme> = self
            .events
            .iter()
            .filter(|e| e.start <= t && t < e.end)
            .map(|e| e.viseme)
            .collect();

        active.sort();
        active.dedup();

        if active.is_empty() {
            return vec![VisemeWeight::silence()];
        }

        active.into_iter().map(VisemeWeight::full).collect()
    }

    /// Drop events that finished before `t`
    pub fn prune(&mut self, t: Duration) {
        self.events.retain(|e| e.end > t);
    }

    pub fn clear(&mut self) {
        if !self.events.is_empty() {
            debug!("Clearing {} alignment events", self.events.len());
        }
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
