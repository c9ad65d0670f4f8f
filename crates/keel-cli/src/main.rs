//! Keel CLI - Savings coaching engine
//!
//! Usage:
//!   keel enroll --user alice --savings 1000 --goal 100000 --income 3000 --expenses 2000
//!   keel run                  Run one batch sweep
//!   keel schedule --at 02:30  Run the daily scheduler
//!   keel status --user alice  Show the last analysis result

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Enroll {
            user,
            savings,
            goal,
            income,
            expenses,
            week,
            skills,
        } => {
            commands::cmd_enroll(
                &cli.store, &cli.config, &user, savings, goal, income, expenses, week, &skills,
            )
            .await
        }
        Commands::Plan { user, regenerate } => {
            commands::cmd_plan(&cli.store, &cli.config, &user, regenerate).await
        }
        Commands::Run => commands::cmd_run(&cli.store, &cli.config).await,
        Commands::Schedule { at } => commands::cmd_schedule(&cli.store, &cli.config, &at).await,
        Commands::Score {
            savings,
            goal,
            income,
            expenses,
            week,
        } => commands::cmd_score(&cli.config, savings, goal, income, expenses, week),
        Commands::Status { user } => commands::cmd_status(&cli.store, &cli.config, &user).await,
        Commands::ClearEmergency { user } => {
            commands::cmd_clear_emergency(&cli.store, &cli.config, &user).await
        }
    }
}
