//! Risk scoring
//!
//! Pure mapping from a financial snapshot (plus its plan) to a 0-100 risk
//! score. Raw risk accumulates as integer points (max 8) across three
//! ratios, then scales by 12.5 onto the single 0-100 scale used everywhere
//! downstream. The ordinal point total never leaves this module.

use crate::models::{CyclePlan, FinancialSnapshot, CYCLE_WEEKS};

/// Maximum raw points the ladder can accumulate
const MAX_POINTS: u32 = 8;
/// Scale factor from raw points onto the 0-100 risk score
const POINTS_TO_SCORE: f64 = 12.5;

/// Result of scoring one snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    /// current_savings / savings_goal (0 when the goal is unset)
    pub savings_ratio: f64,
    /// monthly_expenses / monthly_income (worst-cased to 1.0 on no income)
    pub expense_ratio: f64,
    /// current_week / cycle length
    pub schedule_ratio: f64,
    /// Raw ladder points, 0..=8
    pub points: u32,
    /// 0-100 risk score
    pub score: u8,
}

/// Score a snapshot against its plan. Pure, no side effects.
pub fn assess(snapshot: &FinancialSnapshot, plan: &CyclePlan) -> RiskAssessment {
    let periods = if plan.weeks.is_empty() {
        CYCLE_WEEKS
    } else {
        plan.weeks.len() as u32
    };

    let savings_ratio = if snapshot.savings_goal > 0.0 {
        snapshot.current_savings / snapshot.savings_goal
    } else {
        0.0
    };

    // no income is the worst case, never a division by zero
    let expense_ratio = if snapshot.monthly_income > 0.0 {
        snapshot.monthly_expenses / snapshot.monthly_income
    } else {
        1.0
    };

    let schedule_ratio = snapshot.current_week as f64 / periods as f64;

    let mut points = 0u32;

    points += if savings_ratio < 0.1 {
        3
    } else if savings_ratio < 0.3 {
        2
    } else if savings_ratio < 0.5 {
        1
    } else {
        0
    };

    points += if expense_ratio > 0.9 {
        3
    } else if expense_ratio > 0.8 {
        2
    } else if expense_ratio > 0.6 {
        1
    } else {
        0
    };

    // late in the cycle with little saved
    if schedule_ratio > 0.5 && savings_ratio < 0.2 {
        points += 2;
    }

    RiskAssessment {
        savings_ratio,
        expense_ratio,
        schedule_ratio,
        points,
        score: scale_points(points),
    }
}

/// Map raw ladder points onto the 0-100 scale, clamped to range.
fn scale_points(points: u32) -> u8 {
    if points > MAX_POINTS {
        tracing::warn!(points, "risk points above ladder maximum, clamping");
    }
    let scaled = (points as f64 * POINTS_TO_SCORE).round();
    scaled.clamp(0.0, 100.0) as u8
}
