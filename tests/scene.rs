//! Scene playback integration tests
//!
//! Plays scenes end to end through the driver with mock collaborators.

use std::sync::Arc;

use rehearsal_partner::{Mode, RunState, Scene, SceneSettings, SceneSummary, Validation};

mod common;
use common::{
    Harness, MockMicrophone, MockRecognizer, MockSynthesizer, RecordingObserver, Seen,
    silent_take, two_hander,
};

fn scene_as_b(mode: Mode, threshold: i32) -> Scene {
    Scene::new(
        two_hander(),
        SceneSettings {
            mode,
            threshold,
            user_character: Some("b".to_string()),
        },
    )
}

#[test]
fn test_tracker_walkthrough() {
    let script = two_hander();
    let mut state = RunState::new(&script);
    state.set_user_character("B");

    assert!(script.is_ai_turn(&state));
    state.advance();
    assert!(!script.is_ai_turn(&state));

    assert_eq!(
        script.validate(&state, "je vais bien merci", 70),
        Validation {
            passed: true,
            score: 100
        }
    );
    let miss = script.validate(&state, "je ne sais pas", 70);
    assert!(!miss.passed);
    assert!(miss.score < 70);

    state.advance();
    assert!(script.current_line(&state).is_none());
    assert!(!script.is_ai_turn(&state));
    assert_eq!(script.validate(&state, "anything", 0), Validation::NO_LINE);
}

#[test]
fn test_threshold_edges() {
    let script = two_hander();
    let state = RunState::new(&script);

    for text in ["", "bonjour comment vas tu", "rien a voir"] {
        assert!(script.validate(&state, text, 0).passed);
        assert!(!script.validate(&state, text, 101).passed);
    }
}

#[tokio::test]
async fn test_rehearsal_mode_gives_feedback_per_line() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::replying(&["Je vais bien, merci !"]),
        MockMicrophone::default(),
    );
    let mut scene = scene_as_b(Mode::Rehearsal, 70);
    let mut observer = RecordingObserver::default();

    let summary = harness.rehearsal.run(&mut scene, &mut observer).await;

    assert!(summary.is_none());
    assert_eq!(harness.player.played_texts(), ["Bonjour comment vas tu"]);
    assert_eq!(harness.player.cues(), 1);
    assert_eq!(harness.recognizer.calls(), 1);

    assert_eq!(observer.seen.len(), 5);
    assert_eq!(observer.seen[0], Seen::Line(0, "A".to_string(), true));
    assert_eq!(observer.seen[1], Seen::Line(1, "B".to_string(), false));
    assert_eq!(
        observer.seen[2],
        Seen::Transcript(1, "Je vais bien, merci !".to_string())
    );
    let Seen::Feedback(feedback) = &observer.seen[3] else {
        panic!("expected feedback, got {:?}", observer.seen[3]);
    };
    assert_eq!(feedback.index, 1);
    assert_eq!(feedback.validation.score, 100);
    assert!(feedback.validation.passed);
    assert_eq!(observer.seen[4], Seen::Finish(None));
}

#[tokio::test]
async fn test_performance_mode_summarizes() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::replying(&["je ne sais pas"]),
        MockMicrophone::default(),
    );
    let mut scene = scene_as_b(Mode::Performance, 70);
    let mut observer = RecordingObserver::default();

    let summary = harness
        .rehearsal
        .run(&mut scene, &mut observer)
        .await
        .expect("one line was scored");

    assert_eq!(summary.scored_lines, 1);
    assert!((summary.average - 44.0).abs() < f64::EPSILON);
    assert!(!summary.passed);
    assert!(!observer.seen.iter().any(|s| matches!(s, Seen::Feedback(_))));
    assert_eq!(observer.seen.last(), Some(&Seen::Finish(Some(summary))));
}

#[tokio::test]
async fn test_synthesis_failure_skips_line() {
    let mut harness = Harness::new(
        MockSynthesizer::failing_on("Bonjour comment vas tu"),
        MockRecognizer::replying(&["je vais bien merci"]),
        MockMicrophone::default(),
    );
    let mut scene = scene_as_b(Mode::Performance, 70);
    let mut observer = RecordingObserver::default();

    let summary = harness.rehearsal.run(&mut scene, &mut observer).await;

    assert!(harness.player.played_texts().is_empty());
    assert!(observer.seen.contains(&Seen::Error(0)));
    // The actor's line is still heard and scored
    assert_eq!(
        summary,
        Some(SceneSummary {
            scored_lines: 1,
            average: 100.0,
            threshold: 70,
            passed: true
        })
    );
}

#[tokio::test]
async fn test_silent_take_skips_recognizer() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::replying(&["should not be used"]),
        MockMicrophone::with_takes(vec![silent_take()]),
    );
    let mut scene = scene_as_b(Mode::Performance, 40);
    let mut observer = RecordingObserver::default();

    let summary = harness
        .rehearsal
        .run(&mut scene, &mut observer)
        .await
        .expect("silence is scored");

    assert_eq!(harness.recognizer.calls(), 0);
    assert!(observer.seen.contains(&Seen::Transcript(1, String::new())));
    assert_eq!(summary.scored_lines, 1);
    assert!(summary.average.abs() < f64::EPSILON);
    assert!(!summary.passed);
}

#[tokio::test]
async fn test_capture_failure_advances_without_score() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::default(),
        MockMicrophone::broken(),
    );
    let mut scene = scene_as_b(Mode::Performance, 40);
    let mut observer = RecordingObserver::default();

    let summary = harness.rehearsal.run(&mut scene, &mut observer).await;

    assert!(summary.is_none());
    assert!(observer.seen.contains(&Seen::Error(1)));
    assert!(scene.run_state().is_complete());
    assert!(scene.run_state().accumulated_scores().is_empty());
}

#[tokio::test]
async fn test_recognition_failure_advances_without_score() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::failing(),
        MockMicrophone::default(),
    );
    let mut scene = scene_as_b(Mode::Rehearsal, 40);
    let mut observer = RecordingObserver::default();

    harness.rehearsal.run(&mut scene, &mut observer).await;

    assert_eq!(harness.recognizer.calls(), 1);
    assert!(observer.seen.contains(&Seen::Error(1)));
    assert!(!observer.seen.iter().any(|s| matches!(s, Seen::Feedback(_))));
}

#[tokio::test]
async fn test_without_role_every_line_is_voiced() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::default(),
        MockMicrophone::default(),
    );
    let mut scene = Scene::new(two_hander(), SceneSettings::default());
    let mut observer = RecordingObserver::default();

    let summary = harness.rehearsal.run(&mut scene, &mut observer).await;

    assert!(summary.is_none());
    assert_eq!(
        harness.player.played_texts(),
        ["Bonjour comment vas tu", "Je vais bien merci"]
    );
    assert_eq!(harness.recognizer.calls(), 0);
    assert_eq!(harness.player.cues(), 0);
}

#[tokio::test]
async fn test_second_run_plays_from_cache() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::replying(&["je vais bien merci", "je vais bien merci"]),
        MockMicrophone::default(),
    );

    for _ in 0..2 {
        let mut scene = scene_as_b(Mode::Performance, 40);
        harness
            .rehearsal
            .run(&mut scene, &mut common::RecordingObserver::default())
            .await;
    }

    assert_eq!(harness.synthesizer.calls(), ["Bonjour comment vas tu"]);
    assert_eq!(harness.player.played_texts().len(), 2);
    assert!(harness.dir.path().join("0000_A.mp3").exists());
}

#[tokio::test]
async fn test_pregenerate_then_run() {
    let script = Arc::new(common::script(&[
        ("A", "Un"),
        ("B", "Deux"),
        ("A", "Trois"),
        ("C", "Quatre"),
    ]));
    let mut harness = Harness::new(
        MockSynthesizer::failing_on("Quatre"),
        MockRecognizer::replying(&["deux"]),
        MockMicrophone::default(),
    );
    let mut scene = Scene::new(
        Arc::clone(&script),
        SceneSettings {
            mode: Mode::Performance,
            threshold: 40,
            user_character: Some("B".to_string()),
        },
    );

    let report = harness.rehearsal.pregenerate(&scene).await;
    assert_eq!(report.generated, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total(), 3);

    let again = harness.rehearsal.pregenerate(&scene).await;
    assert_eq!(again.reused, 2);
    assert_eq!(again.generated, 0);

    let mut observer = RecordingObserver::default();
    harness.rehearsal.run(&mut scene, &mut observer).await;

    // "Un" and "Trois" came from the cache; "Quatre" was retried live
    let mut calls = harness.synthesizer.calls();
    calls.sort();
    assert_eq!(calls, ["Quatre", "Quatre", "Quatre", "Trois", "Un"]);
    assert_eq!(harness.player.played_texts(), ["Un", "Trois"]);
    assert!(observer.seen.contains(&Seen::Error(3)));
}

#[tokio::test]
async fn test_empty_clip_on_disk_is_synthesized_again() {
    let mut harness = Harness::new(
        MockSynthesizer::default(),
        MockRecognizer::replying(&["je vais bien merci"]),
        MockMicrophone::default(),
    );
    let clip = harness.dir.path().join("0000_A.mp3");
    std::fs::write(&clip, b"").unwrap();

    let mut scene = scene_as_b(Mode::Performance, 40);
    let report = harness.rehearsal.pregenerate(&scene).await;
    assert_eq!(report.generated, 1);
    assert_eq!(report.reused, 0);

    harness
        .rehearsal
        .run(&mut scene, &mut RecordingObserver::default())
        .await;

    assert_eq!(harness.synthesizer.calls(), ["Bonjour comment vas tu"]);
    assert_eq!(harness.player.played_texts(), ["Bonjour comment vas tu"]);
    assert!(std::fs::metadata(&clip).unwrap().len() > 0);
}
