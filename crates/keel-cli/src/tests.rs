//! CLI command tests
//!
//! This module contains tests for the CLI commands, run against a
//! temporary JSON store.

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands;

fn temp_store() -> (tempfile::TempDir, Option<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    (dir, Some(path))
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_enroll() {
    let cli = Cli::parse_from([
        "keel", "enroll", "--user", "alice", "--savings", "1000", "--goal", "100000", "--income",
        "3000", "--expenses", "2000", "--skills", "writing,design",
    ]);

    match cli.command {
        Commands::Enroll {
            user,
            week,
            skills,
            ..
        } => {
            assert_eq!(user, "alice");
            assert_eq!(week, 1);
            assert_eq!(skills, vec!["writing", "design"]);
        }
        _ => panic!("expected enroll command"),
    }
}

#[test]
fn test_parse_schedule_default_time() {
    let cli = Cli::parse_from(["keel", "schedule"]);
    match cli.command {
        Commands::Schedule { at } => assert_eq!(at, "02:30"),
        _ => panic!("expected schedule command"),
    }
}

#[test]
fn test_parse_run_with_store_override() {
    let cli = Cli::parse_from(["keel", "--store", "/tmp/keel.json", "run"]);
    assert_eq!(cli.store, Some(PathBuf::from("/tmp/keel.json")));
    assert!(matches!(cli.command, Commands::Run));
}

// ========== Command Workflow Tests ==========

#[tokio::test]
async fn test_enroll_then_run_then_status() {
    let (_dir, store) = temp_store();

    commands::cmd_enroll(
        &store, &None, "alice", 1000.0, 100_000.0, 3000.0, 2000.0, 1, &[],
    )
    .await
    .unwrap();

    commands::cmd_run(&store, &None).await.unwrap();
    commands::cmd_status(&store, &None, "alice").await.unwrap();
}

#[tokio::test]
async fn test_plan_requires_enrollment() {
    let (_dir, store) = temp_store();
    assert!(commands::cmd_plan(&store, &None, "nobody", false)
        .await
        .is_err());
}

#[tokio::test]
async fn test_plan_regenerate() {
    let (_dir, store) = temp_store();

    commands::cmd_enroll(
        &store, &None, "bob", 500.0, 50_000.0, 4000.0, 2500.0, 2, &[],
    )
    .await
    .unwrap();

    commands::cmd_plan(&store, &None, "bob", true).await.unwrap();
}

#[tokio::test]
async fn test_clear_emergency_requires_emergency() {
    let (_dir, store) = temp_store();

    // healthy profile: never enters emergency
    commands::cmd_enroll(
        &store, &None, "carol", 80_000.0, 100_000.0, 5000.0, 2000.0, 3, &[],
    )
    .await
    .unwrap();
    commands::cmd_run(&store, &None).await.unwrap();

    assert!(commands::cmd_clear_emergency(&store, &None, "carol")
        .await
        .is_err());
}

#[test]
fn test_score_is_store_free() {
    commands::cmd_score(&None, 1000.0, 100_000.0, 3000.0, 2000.0, 1).unwrap();
}
