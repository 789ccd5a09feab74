// ABOUTME: End-to-end tests of the assembled engine over a file-backed SQLite database
// ABOUTME: Debounced set input, resume after restart, and signal-driven reconciliation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_session_config, init_test_logging, leg_day_template, RecordingNotifier};
use pierre_workout_engine::{
    auth::StaticAuthProvider,
    config::{DatabaseConfig, DatabaseUrl, EngineConfig, RecoveryConfig},
    engine::WorkoutEngine,
    errors::ErrorCode,
    models::ExerciseStatusUpdate,
    notifications::Notifier,
    recovery::{EnvironmentSignal, PassKind},
    session::SetInputBuffer,
};
use tempfile::TempDir;
use uuid::Uuid;

fn file_config(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        database: DatabaseConfig {
            url: DatabaseUrl::SQLite {
                path: dir.path().join("workouts.db"),
            },
            auto_migrate: true,
        },
        session: fast_session_config(),
        recovery: RecoveryConfig {
            reconcile_debounce: Duration::from_millis(30),
            ..RecoveryConfig::default()
        },
        ..EngineConfig::default()
    }
}

async fn engine(config: &EngineConfig, user_id: Uuid) -> (WorkoutEngine, Arc<RecordingNotifier>) {
    init_test_logging();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = WorkoutEngine::connect(
        config,
        Arc::new(StaticAuthProvider::signed_in(user_id)),
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    )
    .await
    .unwrap();
    (engine, notifier)
}

#[tokio::test]
async fn test_session_survives_engine_restart() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    let user_id = Uuid::new_v4();

    let (first, _) = engine(&config, user_id).await;
    let started = first.controller().start(&leg_day_template()).await.unwrap();
    first.controller().set_weight("squat", 0, 80.0).await.unwrap();
    first.shutdown().await;

    let (second, _) = engine(&config, user_id).await;
    let resumed = second.controller().load_active_session().await.unwrap();

    assert_eq!(resumed.id, started.id);
    assert_eq!(resumed.progress_for("squat").unwrap().sets[0].weight, 80.0);
    second.shutdown().await;
}

#[tokio::test]
async fn test_keystrokes_coalesce_into_one_write() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&file_config(&dir), Uuid::new_v4()).await;
    engine.controller().start(&leg_day_template()).await.unwrap();
    let input = engine.input();

    input.set_weight("squat", 0, 1.0).await.unwrap();
    input.set_weight("squat", 0, 10.0).await.unwrap();
    input.set_weight("squat", 0, 100.0).await.unwrap();
    input.set_reps("squat", 0, 5).await;
    assert_eq!(input.pending().await, 2);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(input.pending().await, 0);
    let session = engine.controller().current_session().await.unwrap();
    let first = session.progress_for("squat").unwrap().sets[0];
    assert_eq!(first.weight, 100.0);
    assert_eq!(first.reps, 5);
}

#[tokio::test]
async fn test_toggle_flushes_pending_input_first() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&file_config(&dir), Uuid::new_v4()).await;
    engine.controller().start(&leg_day_template()).await.unwrap();
    let input = SetInputBuffer::with_delay(Arc::clone(engine.controller()), Duration::from_secs(60));

    input.set_weight("bench", 1, 70.0).await.unwrap();
    input.set_completed("bench", 1, true).await.unwrap();

    assert_eq!(input.pending().await, 0);
    let set = engine
        .controller()
        .current_session()
        .await
        .unwrap()
        .progress_for("bench")
        .unwrap()
        .sets[1];
    assert_eq!(set.weight, 70.0);
    assert!(set.completed);
}

#[tokio::test]
async fn test_remove_set_writes_pending_input_before_renumbering() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&file_config(&dir), Uuid::new_v4()).await;
    engine.controller().start(&leg_day_template()).await.unwrap();
    let input = SetInputBuffer::with_delay(Arc::clone(engine.controller()), Duration::from_secs(60));

    input.set_weight("squat", 2, 100.0).await.unwrap();
    input.remove_set("squat", 0).await.unwrap();

    assert_eq!(input.pending().await, 0);
    let session = engine.controller().current_session().await.unwrap();
    let weights: Vec<f64> = session
        .progress_for("squat")
        .unwrap()
        .sets
        .iter()
        .map(|set| set.weight)
        .collect();
    assert_eq!(weights, vec![0.0, 100.0]);
}

#[tokio::test]
async fn test_add_set_and_status_update_flush_pending_input() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&file_config(&dir), Uuid::new_v4()).await;
    engine.controller().start(&leg_day_template()).await.unwrap();
    let input = SetInputBuffer::with_delay(Arc::clone(engine.controller()), Duration::from_secs(60));

    input.set_reps("row", 0, 12).await;
    input.add_set("row").await.unwrap();
    assert_eq!(input.pending().await, 0);

    input.set_weight("row", 3, 40.0).await.unwrap();
    input
        .update_exercise_status("row", ExerciseStatusUpdate::completed(true))
        .await
        .unwrap();

    assert_eq!(input.pending().await, 0);
    let session = engine.controller().current_session().await.unwrap();
    let row = session.progress_for("row").unwrap();
    assert!(row.completed);
    assert_eq!(row.sets.len(), 4);
    assert_eq!(row.sets[0].reps, 12);
    assert_eq!(row.sets[3].weight, 40.0);
}

#[tokio::test]
async fn test_complete_through_input_flushes_and_settles() {
    let dir = TempDir::new().unwrap();
    let user_id = Uuid::new_v4();
    let (engine, _) = engine(&file_config(&dir), user_id).await;
    engine.controller().start(&leg_day_template()).await.unwrap();
    let input = SetInputBuffer::with_delay(Arc::clone(engine.controller()), Duration::from_secs(60));

    engine
        .controller()
        .update_exercise_status("squat", ExerciseStatusUpdate::completed(true))
        .await
        .unwrap();
    input.set_completed("squat", 0, true).await.unwrap();
    input.set_weight("squat", 0, 110.0).await.unwrap();

    let summary = input.complete().await.unwrap();

    assert_eq!(summary.xp_earned, 25);
    assert_eq!(summary.weight_updates.len(), 1);
    assert_eq!(summary.weight_updates[0].weight, 110.0);
    assert_eq!(
        engine
            .database()
            .latest_exercise_weight(user_id, "squat")
            .await
            .unwrap(),
        Some(110.0)
    );
}

#[tokio::test]
async fn test_cancel_through_input_discards_pending_input() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&file_config(&dir), Uuid::new_v4()).await;
    engine.controller().start(&leg_day_template()).await.unwrap();
    let input = engine.input();

    input.set_reps("row", 0, 12).await;
    assert!(input.cancel().await.unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(input.pending().await, 0);
    assert!(!engine.controller().has_active_session().await);
}

#[tokio::test]
async fn test_negative_weight_is_rejected_before_buffering() {
    let dir = TempDir::new().unwrap();
    let (engine, _) = engine(&file_config(&dir), Uuid::new_v4()).await;
    engine.controller().start(&leg_day_template()).await.unwrap();

    let err = engine.input().set_weight("squat", 0, -1.0).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(engine.input().pending().await, 0);
}

#[tokio::test]
async fn test_foreground_signal_reloads_engine_state() {
    let dir = TempDir::new().unwrap();
    let config = file_config(&dir);
    let user_id = Uuid::new_v4();
    let (phone, _) = engine(&config, user_id).await;
    let (tablet, _) = engine(&config, user_id).await;

    phone.controller().start(&leg_day_template()).await.unwrap();
    phone
        .recovery()
        .handle(EnvironmentSignal::WentBackground {
            location: "/workout".to_owned(),
            scroll_offset: 0.0,
        })
        .await;

    // The user finishes the workout on another device
    tablet.controller().load_active_session().await.unwrap();
    tablet.controller().complete().await.unwrap();

    let kind = phone
        .recovery()
        .handle(EnvironmentSignal::CameForeground {
            location: "/workout".to_owned(),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(kind, Some(PassKind::Routine));
    assert!(!phone.controller().has_active_session().await);
    assert_eq!(phone.recovery().coordinator().completed_passes(), 1);
}
