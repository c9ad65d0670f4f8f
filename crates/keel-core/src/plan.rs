//! Progressive savings plan generation
//!
//! Builds the 7-week target curve for a user: a base weekly target seeded
//! from monthly income, grown by a fixed rate each week, with a floor so a
//! low (or missing) income never produces a zero plan.

use chrono::Utc;

use crate::config::PlanConfig;
use crate::models::{CyclePlan, DifficultyTier, WeekTarget, DEFAULT_MONTHLY_INCOME};

/// Generates target curves from a plan configuration
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    config: PlanConfig,
}

impl Default for PlanGenerator {
    fn default() -> Self {
        Self::new(PlanConfig::default())
    }
}

impl PlanGenerator {
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    /// Generate a full cycle plan from a user's monthly income.
    ///
    /// A non-positive income falls back to the global default before the
    /// base target is computed, so the curve never collapses to zero.
    /// Savings targets are guaranteed non-decreasing across weeks.
    pub fn generate(&self, monthly_income: f64) -> CyclePlan {
        let income = if monthly_income > 0.0 {
            monthly_income
        } else {
            DEFAULT_MONTHLY_INCOME
        };

        let weekly_income = income / 4.0;
        let base_target = (weekly_income * self.config.base_income_share)
            .max(self.config.weekly_floor);

        let mut weeks = Vec::with_capacity(self.config.weeks as usize);
        let mut previous_target = 0.0_f64;

        for week_number in 1..=self.config.weeks {
            let growth = 1.0 + (week_number - 1) as f64 * self.config.growth_rate;
            let raw = (base_target * growth).max(self.config.weekly_floor);
            // never step down, even under a pathological growth_rate override
            let savings_target = raw.max(previous_target);
            previous_target = savings_target;

            let tier = difficulty_for_week(week_number);

            weeks.push(WeekTarget {
                week_number,
                savings_target,
                income_target: savings_target * self.config.income_target_factor,
                difficulty_tier: tier,
                challenges: challenges_for_week(week_number, tier),
            });
        }

        CyclePlan {
            weeks,
            generated_at: Utc::now(),
        }
    }
}

fn difficulty_for_week(week_number: u32) -> DifficultyTier {
    match week_number {
        0..=2 => DifficultyTier::Beginner,
        3..=5 => DifficultyTier::Intermediate,
        _ => DifficultyTier::Advanced,
    }
}

/// Deterministic weekly challenges, keyed by tier with one week-specific
/// entry so consecutive weeks don't repeat verbatim.
fn challenges_for_week(week_number: u32, tier: DifficultyTier) -> Vec<String> {
    let tier_challenges: &[&str] = match tier {
        DifficultyTier::Beginner => &[
            "Track every expense this week",
            "Cook at home five nights",
            "Cancel one unused subscription",
        ],
        DifficultyTier::Intermediate => &[
            "Negotiate one recurring bill",
            "Sell one item you no longer use",
            "Plan a no-spend weekend",
        ],
        DifficultyTier::Advanced => &[
            "Pitch one side-income opportunity",
            "Automate a transfer on payday",
            "Review and rebalance the weekly budget",
        ],
    };

    let rotation = week_number as usize % tier_challenges.len();
    vec![
        tier_challenges[rotation].to_string(),
        tier_challenges[(rotation + 1) % tier_challenges.len()].to_string(),
    ]
}
