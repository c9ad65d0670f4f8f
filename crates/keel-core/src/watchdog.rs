//! Watchdog state machine
//!
//! Maps a risk score onto one of four monitoring states. Entry is a pure
//! function of the current score; no history is consulted. The one
//! exception is leaving Emergency: a lower score alone never clears it,
//! only the explicit clear operation does.
//!
//! State bands (inclusive lower bound):
//! - Passive    [0, 40)
//! - Active     [40, 65)
//! - Aggressive [65, 85)
//! - Emergency  [85, 100]

use crate::models::{
    FinancialSnapshot, Lockdown, MandatoryAction, SpendingLimits, WatchdogReport, WatchdogState,
    DEFAULT_MONTHLY_INCOME,
};

const ACTIVE_THRESHOLD: u8 = 40;
const AGGRESSIVE_THRESHOLD: u8 = 65;
const EMERGENCY_THRESHOLD: u8 = 85;

/// Pure score-to-state mapping. Identical score, identical state,
/// regardless of call order or prior state.
pub fn classify(risk_score: u8) -> WatchdogState {
    match risk_score {
        s if s >= EMERGENCY_THRESHOLD => WatchdogState::Emergency,
        s if s >= AGGRESSIVE_THRESHOLD => WatchdogState::Aggressive,
        s if s >= ACTIVE_THRESHOLD => WatchdogState::Active,
        _ => WatchdogState::Passive,
    }
}

/// Evaluate the machine for one run.
///
/// `previous` is the state stored from the last run, if any. A previous
/// Emergency is retained even when the score has dropped below the
/// Emergency band; [`clear_emergency`] is the only exit.
pub fn evaluate(
    snapshot: &FinancialSnapshot,
    risk_score: u8,
    previous: Option<WatchdogState>,
) -> WatchdogReport {
    let scored_state = classify(risk_score);

    let state = if previous == Some(WatchdogState::Emergency)
        && scored_state != WatchdogState::Emergency
    {
        tracing::debug!(
            risk_score,
            "score below emergency band but lockdown persists until cleared"
        );
        WatchdogState::Emergency
    } else {
        scored_state
    };

    build_report(snapshot, state, risk_score)
}

/// Re-evaluate from the score alone, ignoring a stored Emergency.
///
/// This is the explicit administrative exit from lockdown.
pub fn clear_emergency(snapshot: &FinancialSnapshot, risk_score: u8) -> WatchdogReport {
    let state = classify(risk_score);
    tracing::info!(risk_score, state = %state, "emergency cleared, re-evaluated from score");
    build_report(snapshot, state, risk_score)
}

fn build_report(
    snapshot: &FinancialSnapshot,
    state: WatchdogState,
    risk_score: u8,
) -> WatchdogReport {
    let (message, recommended_actions) = state_guidance(state);

    let lockdown = match state {
        WatchdogState::Emergency => Some(build_lockdown(snapshot)),
        _ => None,
    };

    WatchdogReport {
        state,
        risk_score,
        message: message.to_string(),
        recommended_actions: recommended_actions.iter().map(|s| s.to_string()).collect(),
        lockdown,
    }
}

fn state_guidance(state: WatchdogState) -> (&'static str, &'static [&'static str]) {
    match state {
        WatchdogState::Passive => (
            "Goal on a healthy track. Routine monitoring only.",
            &["Keep the current savings cadence"],
        ),
        WatchdogState::Active => (
            "Risk factors present. Watching weekly progress closely.",
            &[
                "Review discretionary spending",
                "Confirm this week's savings transfer went through",
            ],
        ),
        WatchdogState::Aggressive => (
            "High risk to the savings goal. Corrective action recommended.",
            &[
                "Cut non-essential spending this week",
                "Move savings at the start of the week, not the end",
                "Line up one source of extra income",
            ],
        ),
        WatchdogState::Emergency => (
            "Critical risk. Lockdown protocol engaged until manually cleared.",
            &[
                "Work through the lockdown actions in priority order",
                "Pause all non-essential payments",
                "Re-plan the cycle once spending stabilizes",
            ],
        ),
    }
}

/// Build the lockdown protocol for an Emergency entry.
///
/// Always yields at least one mandatory action, ordered by ascending
/// priority. Spending caps are cut to an essentials-only budget derived
/// from the snapshot, so the protocol is deterministic per snapshot.
fn build_lockdown(snapshot: &FinancialSnapshot) -> Lockdown {
    let essentials_monthly = if snapshot.monthly_expenses > 0.0 {
        snapshot.monthly_expenses * 0.6
    } else if snapshot.monthly_income > 0.0 {
        snapshot.monthly_income * 0.5
    } else {
        DEFAULT_MONTHLY_INCOME * 0.5
    };

    let weekly_transfer = (snapshot.monthly_income / 4.0 * 0.1).max(50.0);
    let recurring_cut = (snapshot.monthly_expenses * 0.1).max(25.0);

    let mut actions = vec![
        MandatoryAction {
            priority: 1,
            action: "Freeze all discretionary spending".to_string(),
            deadline: "within 24 hours".to_string(),
            target: "zero non-essential purchases".to_string(),
        },
        MandatoryAction {
            priority: 2,
            action: "Review and cancel recurring charges".to_string(),
            deadline: "within 48 hours".to_string(),
            target: format!("free up {:.0}/month", recurring_cut),
        },
        MandatoryAction {
            priority: 3,
            action: "Set up an automatic savings transfer".to_string(),
            deadline: "within 7 days".to_string(),
            target: format!("move {:.0}/week", weekly_transfer),
        },
    ];
    actions.sort_by_key(|a| a.priority);

    Lockdown {
        locked_categories: vec![
            "dining_out".to_string(),
            "entertainment".to_string(),
            "shopping".to_string(),
            "subscriptions".to_string(),
        ],
        spending_limits: SpendingLimits {
            daily: essentials_monthly / 30.0,
            weekly: essentials_monthly / 4.0,
            monthly: essentials_monthly,
        },
        mandatory_actions: actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            current_savings: 500.0,
            savings_goal: 100_000.0,
            monthly_income: 3000.0,
            monthly_expenses: 2900.0,
            current_week: 5,
            skills: BTreeSet::new(),
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(classify(0), WatchdogState::Passive);
        assert_eq!(classify(39), WatchdogState::Passive);
        assert_eq!(classify(40), WatchdogState::Active);
        assert_eq!(classify(64), WatchdogState::Active);
        assert_eq!(classify(65), WatchdogState::Aggressive);
        assert_eq!(classify(84), WatchdogState::Aggressive);
        assert_eq!(classify(85), WatchdogState::Emergency);
        assert_eq!(classify(100), WatchdogState::Emergency);
    }

    #[test]
    fn test_classification_ignores_history() {
        // identical score, identical state, whatever came before
        for prior in [
            None,
            Some(WatchdogState::Passive),
            Some(WatchdogState::Aggressive),
        ] {
            let report = evaluate(&snapshot(), 50, prior);
            assert_eq!(report.state, WatchdogState::Active);
        }
    }

    #[test]
    fn test_downgrades_between_lower_states_are_free() {
        let report = evaluate(&snapshot(), 10, Some(WatchdogState::Aggressive));
        assert_eq!(report.state, WatchdogState::Passive);
    }

    #[test]
    fn test_emergency_is_sticky() {
        let report = evaluate(&snapshot(), 20, Some(WatchdogState::Emergency));
        assert_eq!(report.state, WatchdogState::Emergency);
        assert!(report.lockdown.is_some());
    }

    #[test]
    fn test_clear_emergency_reclassifies_from_score() {
        let report = clear_emergency(&snapshot(), 20);
        assert_eq!(report.state, WatchdogState::Passive);
        assert!(report.lockdown.is_none());
    }

    #[test]
    fn test_emergency_always_has_lockdown_actions() {
        let report = evaluate(&snapshot(), 90, None);
        assert_eq!(report.state, WatchdogState::Emergency);

        let lockdown = report.lockdown.expect("emergency must carry a lockdown");
        assert!(!lockdown.mandatory_actions.is_empty());
        assert!(!lockdown.locked_categories.is_empty());
        assert!(lockdown.spending_limits.monthly > 0.0);

        // ascending priority, every action fully specified
        let priorities: Vec<u32> = lockdown.mandatory_actions.iter().map(|a| a.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
        for action in &lockdown.mandatory_actions {
            assert!(!action.deadline.is_empty());
            assert!(!action.target.is_empty());
        }
    }

    #[test]
    fn test_non_emergency_has_no_lockdown() {
        for score in [0, 45, 70] {
            let report = evaluate(&snapshot(), score, None);
            assert!(report.lockdown.is_none());
        }
    }

    #[test]
    fn test_report_carries_guidance() {
        let report = evaluate(&snapshot(), 70, None);
        assert!(!report.message.is_empty());
        assert!(!report.recommended_actions.is_empty());
        assert_eq!(report.risk_score, 70);
    }
}
