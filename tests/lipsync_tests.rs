// Integration tests for lip-sync against the playback schedule
//
// Alignment offsets are relative to the chunk that carried them, so the
// timeline must line up with where playback actually placed that chunk.

use interview_media::audio::{ManualClock, NullSink};
use interview_media::lipsync::{AvatarAnimator, BlendShapeSmoother, LipSyncTimeline, Viseme};
use interview_media::transport::AlignmentPayload;
use interview_media::{PlaybackConfig, PlaybackPipeline};
use std::sync::Arc;
use std::time::Duration;

fn payload(json: &str) -> AlignmentPayload {
    serde_json::from_str(json).unwrap()
}

fn active(timeline: &LipSyncTimeline, ms: u64) -> Vec<Viseme> {
    timeline
        .current_visemes(Duration::from_millis(ms))
        .into_iter()
        .map(|w| w.viseme)
        .collect()
}

#[test]
fn test_alignment_follows_scheduled_chunk_start() {
    let clock = ManualClock::new();
    let mut playback = PlaybackPipeline::new(
        Arc::new(clock.clone()),
        Box::new(NullSink),
        PlaybackConfig::default(),
    );
    let mut timeline = LipSyncTimeline::new();

    // First chunk lands at 50ms (lookahead), second right after it at 250ms
    let first = playback.play_samples(&vec![0.0f32; 4800]);
    let align = payload(
        r#"{"chars": ["h", "i"], "char_start_times_ms": [0, 100], "char_durations_ms": [100, 100]}"#,
    );
    timeline.add_alignment_data(&align.to_events(), first.start);

    let second = playback.play_samples(&vec![0.0f32; 4800]);
    assert_eq!(second.start, Duration::from_millis(250));
    let align = payload(
        r#"{"phonemes": ["B", "OW1"], "start_times_ms": [0, 80], "durations_ms": [80, 120]}"#,
    );
    timeline.add_alignment_data(&align.to_events(), second.start);

    assert_eq!(active(&timeline, 0), vec![Viseme::Silence]);
    assert_eq!(active(&timeline, 60), vec![Viseme::KK]);
    assert_eq!(active(&timeline, 150), vec![Viseme::I]);
    assert_eq!(active(&timeline, 260), vec![Viseme::PP]);
    assert_eq!(active(&timeline, 330), vec![Viseme::O]);
    assert_eq!(active(&timeline, 450), vec![Viseme::Silence]);

    timeline.prune(Duration::from_millis(340));
    assert_eq!(timeline.len(), 1);
}

#[test]
fn test_mismatched_alignment_arrays_are_truncated() {
    let align = payload(
        r#"{"chars": ["a", "b", "c"], "char_start_times_ms": [0, 50], "char_durations_ms": [50, 50, 50]}"#,
    );
    let events = align.to_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].label, "b");
    assert_eq!(events[1].offset, Duration::from_millis(50));
}

#[test]
fn test_animator_eases_every_mesh_toward_targets() {
    let head = BlendShapeSmoother::with_all_targets("Wolf3D_Head", 12.0);
    let teeth = BlendShapeSmoother::new("Wolf3D_Teeth", [Viseme::AA, Viseme::O], 12.0);
    let mut animator = AvatarAnimator::new(vec![head, teeth], 60);

    let mut timeline = LipSyncTimeline::new();
    timeline.add_alignment_data(
        &payload(r#"{"chars": ["a"], "char_start_times_ms": [0], "char_durations_ms": [500]}"#)
            .to_events(),
        Duration::ZERO,
    );

    let targets = timeline.current_visemes(Duration::from_millis(10));
    for _ in 0..30 {
        animator.tick(&targets);
    }

    for mesh in animator.meshes() {
        let w = mesh.weight(Viseme::AA);
        assert!(w > 0.9 && w <= 1.0, "{} weight {}", mesh.mesh(), w);
        assert_eq!(mesh.weight(Viseme::PP), 0.0);
    }

    // Teeth mesh has no silence target; asking for silence only decays
    let silence = timeline.current_visemes(Duration::from_secs(1));
    for _ in 0..60 {
        animator.tick(&silence);
    }
    assert!(animator.meshes()[1].weight(Viseme::AA) < 0.01);
    assert!(!animator.meshes()[1].has_target(Viseme::Silence));
}
