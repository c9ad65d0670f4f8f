//! Sweep commands: manual runs, the scheduler, ad-hoc scoring

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveTime;

use keel_core::{plan::PlanGenerator, risk, watchdog, FinancialSnapshot, SweepScheduler};

use super::{build_engine, load_config};

pub async fn cmd_run(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
) -> Result<()> {
    let (engine, _) = build_engine(store_path, config_path)?;

    println!("🔍 Running batch sweep...");
    let summary = engine.run_sweep().await.context("Sweep failed")?;

    println!("✅ Sweep complete");
    println!("   Users analyzed:            {}", summary.users_analyzed);
    println!("   High risk:                 {}", summary.high_risk_count);
    println!("   On track:                  {}", summary.on_track_count);
    println!(
        "   Recommendations generated: {}",
        summary.recommendations_generated
    );
    if summary.failed_count > 0 {
        println!("   ⚠️  Failed:                 {}", summary.failed_count);
    }
    Ok(())
}

pub async fn cmd_schedule(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
    at: &str,
) -> Result<()> {
    let run_at = NaiveTime::parse_from_str(at, "%H:%M")
        .with_context(|| format!("Invalid schedule time {:?} (use HH:MM)", at))?;

    let (engine, _) = build_engine(store_path, config_path)?;
    let scheduler = SweepScheduler::new(engine, run_at);

    println!("⏰ Scheduler running, sweeping daily at {}", at);
    scheduler.run_forever().await;
    Ok(())
}

pub fn cmd_score(
    config_path: &Option<PathBuf>,
    savings: f64,
    goal: f64,
    income: f64,
    expenses: f64,
    week: u32,
) -> Result<()> {
    let config = load_config(config_path)?;

    let (snapshot, _) = FinancialSnapshot {
        current_savings: savings,
        savings_goal: goal,
        monthly_income: income,
        monthly_expenses: expenses,
        current_week: week,
        skills: BTreeSet::new(),
    }
    .normalized();

    let plan = PlanGenerator::new(config.plan).generate(snapshot.monthly_income);
    let assessment = risk::assess(&snapshot, &plan);
    let report = watchdog::evaluate(&snapshot, assessment.score, None);

    println!("📊 Risk assessment");
    println!("   Savings ratio:  {:.2}", assessment.savings_ratio);
    println!("   Expense ratio:  {:.2}", assessment.expense_ratio);
    println!("   Schedule ratio: {:.2}", assessment.schedule_ratio);
    println!("   Risk score:     {}/100", assessment.score);
    println!("   State:          {}", report.state);
    println!("   {}", report.message);
    for action in &report.recommended_actions {
        println!("   - {}", action);
    }
    if let Some(lockdown) = &report.lockdown {
        println!("   🔒 Lockdown:");
        for action in &lockdown.mandatory_actions {
            println!(
                "      {}. {} ({}, target: {})",
                action.priority, action.action, action.deadline, action.target
            );
        }
    }
    Ok(())
}
