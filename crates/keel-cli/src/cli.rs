//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keel - Adaptive savings coaching engine
#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Goal tracking and risk monitoring for savings cycles", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the user store (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enroll a user: store their snapshot and generate a cycle plan
    Enroll {
        /// Opaque user id
        #[arg(short, long)]
        user: String,

        /// Current savings balance
        #[arg(long)]
        savings: f64,

        /// Savings goal for the cycle
        #[arg(long)]
        goal: f64,

        /// Monthly income
        #[arg(long)]
        income: f64,

        /// Monthly expenses
        #[arg(long)]
        expenses: f64,

        /// Current week in the cycle (1-7)
        #[arg(long, default_value = "1")]
        week: u32,

        /// Declared skills, comma separated (e.g. writing,design)
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,
    },

    /// Show (or regenerate) a user's cycle plan
    Plan {
        /// Opaque user id
        #[arg(short, long)]
        user: String,

        /// Regenerate the plan from the current snapshot
        #[arg(long)]
        regenerate: bool,
    },

    /// Run one batch sweep over every enrolled user
    Run,

    /// Run the daily sweep scheduler in the foreground
    Schedule {
        /// Local time of day to fire, HH:MM
        #[arg(long, default_value = "02:30")]
        at: String,
    },

    /// Score an ad-hoc snapshot without touching the store
    Score {
        /// Current savings balance
        #[arg(long)]
        savings: f64,

        /// Savings goal
        #[arg(long)]
        goal: f64,

        /// Monthly income
        #[arg(long)]
        income: f64,

        /// Monthly expenses
        #[arg(long)]
        expenses: f64,

        /// Current week in the cycle (1-7)
        #[arg(long, default_value = "1")]
        week: u32,
    },

    /// Show a user's last analysis result
    Status {
        /// Opaque user id
        #[arg(short, long)]
        user: String,
    },

    /// Administratively clear a user's emergency lockdown
    ClearEmergency {
        /// Opaque user id
        #[arg(short, long)]
        user: String,
    },
}
