// ABOUTME: Maintenance CLI for inspecting and repairing a user's workout session state
// ABOUTME: Shows, cleans up and cancels active sessions; lists weight ledger, history and XP
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Usage:
//! ```bash
//! # Show the active session for a user
//! cargo run --bin workout-admin -- show --user 5f0c...
//!
//! # Remove orphaned session rows, keeping the newest
//! cargo run --bin workout-admin -- cleanup --user 5f0c...
//!
//! # Cancel the active session
//! cargo run --bin workout-admin -- cancel --user 5f0c...
//!
//! # Latest weights, or the full ledger for one exercise
//! cargo run --bin workout-admin -- weights --user 5f0c... --exercise squat
//!
//! # Completed workouts and XP
//! cargo run --bin workout-admin -- history --user 5f0c...
//! cargo run --bin workout-admin -- xp --user 5f0c...
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pierre_workout_engine::{
    auth::StaticAuthProvider,
    config::{DatabaseUrl, EngineConfig},
    engine::WorkoutEngine,
    logging::LoggingConfig,
    models::UserLevel,
    notifications::TracingNotifier,
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "workout-admin",
    about = "Pierre workout session maintenance",
    long_about = "Inspect and repair active workout sessions, the weight ledger, workout history and XP for a single user."
)]
struct WorkoutAdminArgs {
    #[command(subcommand)]
    command: AdminCommand,

    /// Database URL override
    #[arg(long)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Print the user's active session, if any
    Show {
        /// User ID
        #[arg(long)]
        user: Uuid,
    },

    /// Delete all but the newest active session and purge completed rows
    Cleanup {
        /// User ID
        #[arg(long)]
        user: Uuid,
    },

    /// Cancel the user's active session without recording history
    Cancel {
        /// User ID
        #[arg(long)]
        user: Uuid,
    },

    /// Latest weight per exercise, or the full ledger for one exercise
    Weights {
        /// User ID
        #[arg(long)]
        user: Uuid,

        /// Exercise ID to show the full ledger for
        #[arg(long)]
        exercise: Option<String>,
    },

    /// Completed workouts, newest first
    History {
        /// User ID
        #[arg(long)]
        user: Uuid,
    },

    /// Cumulative XP and derived level
    Xp {
        /// User ID
        #[arg(long)]
        user: Uuid,
    },
}

impl AdminCommand {
    const fn user(&self) -> Uuid {
        match self {
            Self::Show { user }
            | Self::Cleanup { user }
            | Self::Cancel { user }
            | Self::Weights { user, .. }
            | Self::History { user }
            | Self::Xp { user } => *user,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = WorkoutAdminArgs::parse();

    let logging = LoggingConfig::for_cli(args.verbose);
    logging.init()?;

    let mut config = EngineConfig::from_env()?;
    if let Some(url) = &args.database_url {
        config.database.url = DatabaseUrl::parse_url(url)?;
    }
    debug!(config = %config.summary(), "Engine configuration");

    let user_id = args.command.user();
    let auth = Arc::new(StaticAuthProvider::signed_in(user_id));
    let engine = WorkoutEngine::connect(&config, auth, Arc::new(TracingNotifier)).await?;

    let outcome = run_command(&engine, args.command).await;
    engine.shutdown().await;
    outcome
}

async fn run_command(engine: &WorkoutEngine, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Show { .. } => show_command(engine).await,
        AdminCommand::Cleanup { user } => cleanup_command(engine, user).await,
        AdminCommand::Cancel { user } => cancel_command(engine, user).await,
        AdminCommand::Weights { user, exercise } => {
            weights_command(engine, user, exercise.as_deref()).await
        }
        AdminCommand::History { user } => history_command(engine, user).await,
        AdminCommand::Xp { user } => xp_command(engine, user).await,
    }
}

async fn show_command(engine: &WorkoutEngine) -> Result<()> {
    match engine.controller().reload().await? {
        Some(session) => {
            let summary = session.progress_summary();
            println!("{}", serde_json::to_string_pretty(&session)?);
            println!(
                "Progress: {}/{} exercises, {}/{} sets",
                summary.completed_exercises,
                summary.total_exercises,
                summary.completed_sets,
                summary.total_sets
            );
        }
        None => println!("No active session"),
    }
    Ok(())
}

async fn cleanup_command(engine: &WorkoutEngine, user_id: Uuid) -> Result<()> {
    let removed = engine.controller().cleanup_orphans().await?;
    info!(user.id = %user_id, removed, "Cleanup finished");
    println!("Removed {removed} orphaned session(s)");
    Ok(())
}

async fn cancel_command(engine: &WorkoutEngine, user_id: Uuid) -> Result<()> {
    let controller = engine.controller();
    controller.reload().await?;
    if controller.cancel().await? {
        info!(user.id = %user_id, "Active session cancelled");
        println!("Active session cancelled");
    } else {
        println!("No active session");
    }
    Ok(())
}

async fn weights_command(
    engine: &WorkoutEngine,
    user_id: Uuid,
    exercise_id: Option<&str>,
) -> Result<()> {
    let database = engine.database();
    let entries = match exercise_id {
        Some(exercise_id) => database.weight_history(user_id, exercise_id).await?,
        None => database.latest_weights_for_user(user_id).await?,
    };
    if entries.is_empty() {
        println!("No recorded weights");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{:<24} {:>8.2} {} {}",
            entry.exercise_id,
            entry.weight,
            entry.recorded_at.format("%Y-%m-%d %H:%M"),
            if entry.is_latest { "latest" } else { "" }
        );
    }
    Ok(())
}

async fn history_command(engine: &WorkoutEngine, user_id: Uuid) -> Result<()> {
    let records = engine.database().list_workout_history(user_id).await?;
    if records.is_empty() {
        println!("No completed workouts");
        return Ok(());
    }
    for record in records {
        let completed = record.exercises.iter().filter(|e| e.completed).count();
        println!(
            "{} {:<24} {:>3}/{:<3} exercises {:>5} min {:>4} XP",
            record.completed_at.format("%Y-%m-%d %H:%M"),
            record.template_name,
            completed,
            record.exercises.len(),
            record.duration_secs / 60,
            record.xp_earned
        );
    }
    Ok(())
}

async fn xp_command(engine: &WorkoutEngine, user_id: Uuid) -> Result<()> {
    let xp = engine.database().get_user_xp(user_id).await?;
    let level = UserLevel::from_xp(xp);
    println!(
        "XP: {xp}  Level: {}  ({} to next level)",
        level.level, level.xp_to_next_level
    );
    Ok(())
}
