//! User-facing commands: enrollment, plans, status, emergency clearing

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use keel_core::{CyclePlan, FinancialSnapshot, UserStore};

use super::build_engine;

#[allow(clippy::too_many_arguments)]
pub async fn cmd_enroll(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
    user: &str,
    savings: f64,
    goal: f64,
    income: f64,
    expenses: f64,
    week: u32,
    skills: &[String],
) -> Result<()> {
    let (engine, _) = build_engine(store_path, config_path)?;

    let snapshot = FinancialSnapshot {
        current_savings: savings,
        savings_goal: goal,
        monthly_income: income,
        monthly_expenses: expenses,
        current_week: week,
        skills: skills.iter().map(|s| s.trim().to_string()).collect::<BTreeSet<_>>(),
    };

    let plan = engine
        .enroll(user, &snapshot)
        .await
        .with_context(|| format!("Failed to enroll {}", user))?;

    println!("✅ Enrolled {}", user);
    print_plan(&plan);
    Ok(())
}

pub async fn cmd_plan(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
    user: &str,
    regenerate: bool,
) -> Result<()> {
    let (engine, store) = build_engine(store_path, config_path)?;

    let plan = if regenerate {
        let plan = engine
            .replan(user)
            .await
            .with_context(|| format!("Failed to regenerate plan for {}", user))?;
        println!("🔄 Plan regenerated for {}", user);
        plan
    } else {
        store
            .get_plan(user)
            .await
            .with_context(|| format!("No plan on record for {}", user))?
    };

    print_plan(&plan);
    Ok(())
}

pub async fn cmd_status(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
    user: &str,
) -> Result<()> {
    let (_, store) = build_engine(store_path, config_path)?;

    let result = store
        .get_result(user)
        .await
        .with_context(|| format!("Failed to read results for {}", user))?;

    match result {
        Some(result) => {
            println!("📊 Last analysis for {}", user);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        None => println!("No analysis on record for {} (run `keel run` first)", user),
    }
    Ok(())
}

pub async fn cmd_clear_emergency(
    store_path: &Option<PathBuf>,
    config_path: &Option<PathBuf>,
    user: &str,
) -> Result<()> {
    let (engine, _) = build_engine(store_path, config_path)?;

    let result = engine
        .clear_emergency(user)
        .await
        .with_context(|| format!("Failed to clear emergency for {}", user))?;

    println!(
        "✅ Emergency cleared for {} (now {}, risk score {})",
        user, result.watchdog.state, result.watchdog.risk_score
    );
    Ok(())
}

fn print_plan(plan: &CyclePlan) {
    println!();
    println!("Week  Savings target  Income target  Tier");
    for week in &plan.weeks {
        println!(
            "{:<5} {:>14.0} {:>14.0}  {}",
            week.week_number, week.savings_target, week.income_target, week.difficulty_tier
        );
    }
    println!();
}
