//! Domain models for Keel

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version stamped on every alert payload so downstream consumers can
/// evolve independently of the engine.
pub const ALERT_SCHEMA_VERSION: u32 = 1;

/// Fallback monthly income when a snapshot reports none (plan generation only).
pub const DEFAULT_MONTHLY_INCOME: f64 = 3000.0;
/// Fallback savings goal for snapshots with a zero or negative goal.
pub const DEFAULT_SAVINGS_GOAL: f64 = 100_000.0;
/// Fallback cycle week for snapshots with an out-of-range week.
pub const DEFAULT_CURRENT_WEEK: u32 = 1;

/// Number of weeks in a savings cycle.
pub const CYCLE_WEEKS: u32 = 7;

/// A user's financial picture at analysis time.
///
/// Owned by the persistence collaborator; the engine treats it as an
/// immutable input per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub current_savings: f64,
    pub savings_goal: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    /// Position in the 7-week cycle, 1-based.
    pub current_week: u32,
    /// Declared skills, used for supplementary recommendations.
    /// Sorted set so recommendation output is stable across runs.
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

impl FinancialSnapshot {
    /// Substitute documented defaults for degenerate values.
    ///
    /// Returns the normalized snapshot and whether anything changed.
    /// `monthly_income <= 0` is deliberately left alone: plan generation
    /// and risk scoring each have their own handling for it.
    pub fn normalized(&self) -> (Self, bool) {
        let mut snapshot = self.clone();
        let mut changed = false;

        if snapshot.savings_goal <= 0.0 {
            snapshot.savings_goal = DEFAULT_SAVINGS_GOAL;
            changed = true;
        }
        if snapshot.current_week < 1 || snapshot.current_week > CYCLE_WEEKS {
            snapshot.current_week = DEFAULT_CURRENT_WEEK;
            changed = true;
        }

        (snapshot, changed)
    }
}

/// Difficulty tier of a cycle week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl std::str::FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(format!("Unknown difficulty tier: {}", s)),
        }
    }
}

impl std::fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One week of the progressive savings plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekTarget {
    /// 1-based week number
    pub week_number: u32,
    pub savings_target: f64,
    pub income_target: f64,
    pub difficulty_tier: DifficultyTier,
    pub challenges: Vec<String>,
}

/// The full 7-week progressive savings plan.
///
/// Created at enrollment and read-only afterwards, except for the explicit
/// re-plan operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclePlan {
    pub weeks: Vec<WeekTarget>,
    pub generated_at: DateTime<Utc>,
}

impl CyclePlan {
    /// Target for a 1-based week number, if within the cycle
    pub fn week(&self, week_number: u32) -> Option<&WeekTarget> {
        self.weeks.iter().find(|w| w.week_number == week_number)
    }

    /// Savings targets never decrease from one week to the next
    pub fn is_monotonic(&self) -> bool {
        self.weeks
            .windows(2)
            .all(|pair| pair[0].savings_target <= pair[1].savings_target)
    }
}

/// Monitoring intensity required for a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchdogState {
    Passive,
    Active,
    Aggressive,
    Emergency,
}

impl WatchdogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passive => "passive",
            Self::Active => "active",
            Self::Aggressive => "aggressive",
            Self::Emergency => "emergency",
        }
    }

    /// Numeric severity for ordering (higher = more urgent)
    pub fn severity(&self) -> u8 {
        match self {
            Self::Passive => 1,
            Self::Active => 2,
            Self::Aggressive => 3,
            Self::Emergency => 4,
        }
    }

    /// States that always produce an alert
    pub fn is_severe(&self) -> bool {
        matches!(self, Self::Aggressive | Self::Emergency)
    }
}

impl std::str::FromStr for WatchdogState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passive" => Ok(Self::Passive),
            "active" => Ok(Self::Active),
            "aggressive" => Ok(Self::Aggressive),
            "emergency" => Ok(Self::Emergency),
            _ => Err(format!("Unknown watchdog state: {}", s)),
        }
    }
}

impl std::fmt::Display for WatchdogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spending caps applied during a lockdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingLimits {
    pub daily: f64,
    pub weekly: f64,
    pub monthly: f64,
}

/// A single required action under lockdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MandatoryAction {
    /// 1 = most urgent
    pub priority: u32,
    pub action: String,
    pub deadline: String,
    pub target: String,
}

/// Restrictions applied when the Emergency state is entered.
///
/// Always non-empty: at least one mandatory action, ordered by ascending
/// priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockdown {
    pub locked_categories: Vec<String>,
    pub spending_limits: SpendingLimits,
    pub mandatory_actions: Vec<MandatoryAction>,
}

/// Output of one watchdog evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogReport {
    pub state: WatchdogState,
    /// 0-100 scale, derived from the raw point total
    pub risk_score: u8,
    pub message: String,
    pub recommended_actions: Vec<String>,
    /// Present only in the Emergency state
    pub lockdown: Option<Lockdown>,
}

/// Weekly pace classification against the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeeklyPerformance {
    Ahead,
    OnTrack,
    Behind,
    Poor,
    NotStarted,
}

impl WeeklyPerformance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ahead => "ahead",
            Self::OnTrack => "on_track",
            Self::Behind => "behind",
            Self::Poor => "poor",
            Self::NotStarted => "not_started",
        }
    }
}

impl std::str::FromStr for WeeklyPerformance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ahead" => Ok(Self::Ahead),
            "on_track" => Ok(Self::OnTrack),
            "behind" => Ok(Self::Behind),
            "poor" => Ok(Self::Poor),
            "not_started" => Ok(Self::NotStarted),
            _ => Err(format!("Unknown weekly performance: {}", s)),
        }
    }
}

impl std::fmt::Display for WeeklyPerformance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scaling applied to the coming week's target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextWeekAdjustment {
    pub multiplier: f64,
    pub reason: String,
}

/// Per-user, per-run output of the batch analyzer.
///
/// Overwritten on every sweep; read-only for dashboards and notification
/// logic between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub goal_progress_pct: f64,
    pub weekly_performance: WeeklyPerformance,
    pub watchdog: WatchdogReport,
    /// At most 5 entries
    pub recommendations: Vec<String>,
    pub next_week_adjustment: NextWeekAdjustment,
    pub analyzed_at: DateTime<Utc>,
    pub analysis_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Record handed to the notification collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub user_id: String,
    pub state: WatchdogState,
    pub risk_score: u8,
    pub recommended_actions: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
    pub schema_version: u32,
}

/// Outcome of one full batch sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    /// All users the sweep touched, including failed ones
    pub users_analyzed: usize,
    /// Users in the Aggressive or Emergency state
    pub high_risk_count: usize,
    /// Users classified exactly on_track
    pub on_track_count: usize,
    pub recommendations_generated: usize,
    pub failed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_watchdog_state_roundtrip() {
        assert_eq!(WatchdogState::Emergency.as_str(), "emergency");
        assert_eq!(
            WatchdogState::from_str("aggressive").unwrap(),
            WatchdogState::Aggressive
        );
        assert!(WatchdogState::from_str("calm").is_err());
    }

    #[test]
    fn test_state_severity_ordering() {
        assert!(WatchdogState::Emergency.severity() > WatchdogState::Aggressive.severity());
        assert!(WatchdogState::Aggressive.severity() > WatchdogState::Active.severity());
        assert!(WatchdogState::Active.severity() > WatchdogState::Passive.severity());
    }

    #[test]
    fn test_severe_states() {
        assert!(WatchdogState::Aggressive.is_severe());
        assert!(WatchdogState::Emergency.is_severe());
        assert!(!WatchdogState::Active.is_severe());
        assert!(!WatchdogState::Passive.is_severe());
    }

    #[test]
    fn test_snapshot_normalization() {
        let snapshot = FinancialSnapshot {
            current_savings: 100.0,
            savings_goal: -5.0,
            monthly_income: 0.0,
            monthly_expenses: 500.0,
            current_week: 12,
            skills: BTreeSet::new(),
        };

        let (normalized, changed) = snapshot.normalized();
        assert!(changed);
        assert_eq!(normalized.savings_goal, DEFAULT_SAVINGS_GOAL);
        assert_eq!(normalized.current_week, DEFAULT_CURRENT_WEEK);
        // income stays as-is, each component handles it explicitly
        assert_eq!(normalized.monthly_income, 0.0);
    }

    #[test]
    fn test_snapshot_missing_skills_defaults_empty() {
        let json = r#"{
            "current_savings": 100.0,
            "savings_goal": 1000.0,
            "monthly_income": 3000.0,
            "monthly_expenses": 2000.0,
            "current_week": 2
        }"#;
        let snapshot: FinancialSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.skills.is_empty());
    }

    #[test]
    fn test_snapshot_missing_income_is_an_error() {
        let json = r#"{
            "current_savings": 100.0,
            "savings_goal": 1000.0,
            "monthly_expenses": 2000.0,
            "current_week": 2
        }"#;
        assert!(serde_json::from_str::<FinancialSnapshot>(json).is_err());
    }

    #[test]
    fn test_weekly_performance_serialization() {
        assert_eq!(WeeklyPerformance::NotStarted.as_str(), "not_started");
        assert_eq!(
            WeeklyPerformance::from_str("on_track").unwrap(),
            WeeklyPerformance::OnTrack
        );
    }
}
