//! Batch analysis sweep
//!
//! Runs the full per-user pipeline for every enrolled user: fetch snapshot
//! and plan, score risk, drive the watchdog, classify weekly pace, build
//! recommendations and the next-week adjustment, persist the result, and
//! hand severe or changed states to the alert dispatcher.
//!
//! Per-user work is isolated: one bad record, timeout, or store hiccup
//! marks that user failed and the sweep moves on. Only a failure to
//! enumerate the user set fails the run itself.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::dispatch::{AlertDispatcher, AlertSink};
use crate::error::{Error, Result};
use crate::models::{
    AnalysisResult, CyclePlan, FinancialSnapshot, NextWeekAdjustment, SweepSummary,
    WatchdogReport, WatchdogState, WeeklyPerformance,
};
use crate::plan::PlanGenerator;
use crate::risk;
use crate::scheduler::SweepGuard;
use crate::store::UserStore;
use crate::watchdog;

/// Orchestrates analysis sweeps over the enrolled user set.
///
/// Cheap to clone; all heavy state is shared behind `Arc`s, including the
/// sweep guard, so clones and the scheduler contend on the same mutual
/// exclusion.
#[derive(Clone)]
pub struct BatchAnalyzer {
    store: Arc<dyn UserStore>,
    dispatcher: AlertDispatcher,
    config: EngineConfig,
    plan_generator: PlanGenerator,
    guard: Arc<SweepGuard>,
}

impl BatchAnalyzer {
    pub fn new(store: Arc<dyn UserStore>, sink: Arc<dyn AlertSink>, config: EngineConfig) -> Self {
        let guard = Arc::new(SweepGuard::new(Duration::from_secs(
            config.sweep.guard_stale_secs,
        )));
        Self {
            store,
            dispatcher: AlertDispatcher::new(sink),
            plan_generator: PlanGenerator::new(config.plan.clone()),
            config,
            guard,
        }
    }

    /// Enroll a user: persist the snapshot and generate their cycle plan.
    pub async fn enroll(&self, user_id: &str, snapshot: &FinancialSnapshot) -> Result<CyclePlan> {
        self.with_retry(|| self.store.put_snapshot(user_id, snapshot))
            .await?;
        let plan = self.plan_generator.generate(snapshot.monthly_income);
        self.with_retry(|| self.store.put_plan(user_id, &plan))
            .await?;
        tracing::info!(user_id = %user_id, "user enrolled");
        Ok(plan)
    }

    /// Explicitly regenerate a user's plan from their current snapshot.
    pub async fn replan(&self, user_id: &str) -> Result<CyclePlan> {
        let snapshot = self.with_retry(|| self.store.get_snapshot(user_id)).await?;
        let plan = self.plan_generator.generate(snapshot.monthly_income);
        self.with_retry(|| self.store.put_plan(user_id, &plan))
            .await?;
        tracing::info!(user_id = %user_id, "plan regenerated");
        Ok(plan)
    }

    /// Run one full sweep over every enrolled user.
    ///
    /// Guarded: a second concurrent call fails with
    /// [`Error::SweepInProgress`]. A failure to enumerate users fails the
    /// run; per-user failures only mark that user.
    pub async fn run_sweep(&self) -> Result<SweepSummary> {
        let _permit = self.guard.acquire()?;

        let users = self
            .store
            .list_users()
            .await
            .map_err(|e| Error::SweepFailed(format!("could not enumerate users: {}", e)))?;
        tracing::info!(users = users.len(), "sweep started");

        let semaphore = Arc::new(Semaphore::new(self.config.sweep.pool_size.max(1)));
        let timeout = Duration::from_secs(self.config.sweep.user_timeout_secs);

        let mut tasks = JoinSet::new();
        for user_id in users {
            let analyzer = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                // bounded pool: a slot frees only when a user finishes
                let _slot = semaphore.acquire_owned().await.ok();
                let result = match tokio::time::timeout(
                    timeout,
                    analyzer.analyze_and_record(&user_id),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        let err = Error::Timeout(user_id.clone());
                        tracing::warn!(user_id = %user_id, timeout_secs = timeout.as_secs(), "user analysis timed out");
                        let failed =
                            failed_result(format!("{} after {}s", err, timeout.as_secs()));
                        if let Err(e) = analyzer.store.put_result(&user_id, &failed).await {
                            tracing::warn!(user_id = %user_id, error = %e, "could not persist timeout marker");
                        }
                        failed
                    }
                };
                (user_id, result)
            });
        }

        let mut summary = SweepSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((user_id, result)) => {
                    summary.users_analyzed += 1;
                    if result.analysis_failed {
                        summary.failed_count += 1;
                    } else {
                        if result.watchdog.state.is_severe() {
                            summary.high_risk_count += 1;
                        }
                        if result.weekly_performance == WeeklyPerformance::OnTrack {
                            summary.on_track_count += 1;
                        }
                        summary.recommendations_generated += result.recommendations.len();
                    }
                    tracing::debug!(
                        user_id = %user_id,
                        state = %result.watchdog.state,
                        failed = result.analysis_failed,
                        "user analyzed"
                    );
                }
                Err(e) => {
                    summary.users_analyzed += 1;
                    summary.failed_count += 1;
                    tracing::error!(error = %e, "analysis task aborted");
                }
            }
        }

        tracing::info!(
            users = summary.users_analyzed,
            high_risk = summary.high_risk_count,
            on_track = summary.on_track_count,
            failed = summary.failed_count,
            "sweep complete"
        );
        Ok(summary)
    }

    /// Analyze one user, persist the result, dispatch any alert.
    ///
    /// Infallible by design: every error path collapses into a result with
    /// `analysis_failed` set, so one user can never abort a sweep.
    pub async fn analyze_and_record(&self, user_id: &str) -> AnalysisResult {
        let (mut result, baseline) = match self.try_analyze(user_id).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "user analysis failed");
                (failed_result(e.to_string()), None)
            }
        };

        if let Err(e) = self
            .with_retry(|| self.store.put_result(user_id, &result))
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "could not persist analysis result");
            result.analysis_failed = true;
            result.failure_reason = Some(format!("result write failed: {}", e));
        }

        self.dispatcher.dispatch(user_id, &result, baseline).await;
        result
    }

    /// Administrative exit from the Emergency state.
    ///
    /// Re-evaluates the user purely from their current risk score and
    /// persists the downgraded result; the dispatcher sees the state
    /// change and alerts downstream consumers.
    pub async fn clear_emergency(&self, user_id: &str) -> Result<AnalysisResult> {
        let previous = self
            .store
            .get_result(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("result for user {}", user_id)))?;
        if previous.watchdog.state != WatchdogState::Emergency {
            return Err(Error::InvalidData(format!(
                "user {} is in state {}, not emergency",
                user_id, previous.watchdog.state
            )));
        }

        let (snapshot, _) = self
            .with_retry(|| self.store.get_snapshot(user_id))
            .await?
            .normalized();
        let plan = self.fetch_or_generate_plan(user_id, &snapshot).await?;

        let assessment = risk::assess(&snapshot, &plan);
        let report = watchdog::clear_emergency(&snapshot, assessment.score);
        let result = self.compose_result(&snapshot, &plan, report);

        self.with_retry(|| self.store.put_result(user_id, &result))
            .await?;
        self.dispatcher
            .dispatch(user_id, &result, Some(WatchdogState::Emergency))
            .await;
        Ok(result)
    }

    async fn try_analyze(
        &self,
        user_id: &str,
    ) -> Result<(AnalysisResult, Option<WatchdogState>)> {
        let raw = self.with_retry(|| self.store.get_snapshot(user_id)).await?;
        let (snapshot, normalized) = raw.normalized();
        if normalized {
            tracing::debug!(user_id = %user_id, "degenerate snapshot fields replaced with defaults");
        }

        let plan = self.fetch_or_generate_plan(user_id, &snapshot).await?;

        // the previous run's state: sticky-emergency input and alert baseline
        let baseline = match self.store.get_result(user_id).await {
            Ok(Some(prev)) if !prev.analysis_failed => Some(prev.watchdog.state),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(user_id = %user_id, error = %e, "previous result unavailable");
                None
            }
        };

        let assessment = risk::assess(&snapshot, &plan);
        let report = watchdog::evaluate(&snapshot, assessment.score, baseline);
        let result = self.compose_result(&snapshot, &plan, report);

        Ok((result, baseline))
    }

    async fn fetch_or_generate_plan(
        &self,
        user_id: &str,
        snapshot: &FinancialSnapshot,
    ) -> Result<CyclePlan> {
        match self.with_retry(|| self.store.get_plan(user_id)).await {
            Ok(plan) => Ok(plan),
            Err(Error::NotFound(_)) => {
                tracing::info!(user_id = %user_id, "no plan on record, generating one");
                let plan = self.plan_generator.generate(snapshot.monthly_income);
                self.with_retry(|| self.store.put_plan(user_id, &plan))
                    .await?;
                Ok(plan)
            }
            Err(e) => Err(e),
        }
    }

    fn compose_result(
        &self,
        snapshot: &FinancialSnapshot,
        plan: &CyclePlan,
        watchdog: WatchdogReport,
    ) -> AnalysisResult {
        let goal_progress_pct = if snapshot.savings_goal > 0.0 {
            snapshot.current_savings / snapshot.savings_goal * 100.0
        } else {
            0.0
        };

        let periods = plan.weeks.len().max(1) as f64;
        let expected_pace_pct = (snapshot.current_week.saturating_sub(1)) as f64 / periods * 100.0;

        let weekly_performance =
            classify_performance(goal_progress_pct, expected_pace_pct, snapshot.current_week);
        let recommendations = build_recommendations(goal_progress_pct, snapshot);
        let next_week_adjustment = adjustment_for(goal_progress_pct, weekly_performance);

        AnalysisResult {
            goal_progress_pct,
            weekly_performance,
            watchdog,
            recommendations,
            next_week_adjustment,
            analyzed_at: Utc::now(),
            analysis_failed: false,
            failure_reason: None,
        }
    }

    /// Run a store operation, retrying transient failures once after a
    /// short backoff. Definitive errors (missing or malformed records)
    /// are never retried.
    async fn with_retry<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match op().await {
            Err(e) if is_transient(&e) => {
                tracing::debug!(error = %e, "store operation failed, retrying once");
                tokio::time::sleep(Duration::from_millis(self.config.sweep.retry_backoff_ms))
                    .await;
                op().await
            }
            other => other,
        }
    }
}

fn is_transient(error: &Error) -> bool {
    matches!(error, Error::Store(_) | Error::Io(_))
}

/// Pace classification against the plan's expected progress.
fn classify_performance(
    goal_progress_pct: f64,
    expected_pace_pct: f64,
    current_week: u32,
) -> WeeklyPerformance {
    if current_week <= 1 {
        WeeklyPerformance::NotStarted
    } else if goal_progress_pct >= expected_pace_pct * 1.1 {
        WeeklyPerformance::Ahead
    } else if goal_progress_pct >= expected_pace_pct * 0.9 {
        WeeklyPerformance::OnTrack
    } else if goal_progress_pct >= expected_pace_pct * 0.7 {
        WeeklyPerformance::Behind
    } else {
        WeeklyPerformance::Poor
    }
}

/// Deterministic recommendation table: three entries keyed by progress
/// bucket, up to two supplements keyed by declared skills, capped at five.
fn build_recommendations(goal_progress_pct: f64, snapshot: &FinancialSnapshot) -> Vec<String> {
    let base: &[&str] = if goal_progress_pct < 25.0 {
        &[
            "Set up an automatic transfer on payday",
            "Cut one recurring expense this week",
            "Review daily spending against the weekly target",
        ]
    } else if goal_progress_pct < 50.0 {
        &[
            "Raise the weekly transfer by a small fixed amount",
            "Batch errands to avoid impulse purchases",
            "Check progress midweek, not only at the end",
        ]
    } else {
        &[
            "Keep the current pace, the plan is working",
            "Sweep any windfalls straight into savings",
            "Consider raising the goal once the cycle completes",
        ]
    };

    let mut recommendations: Vec<String> = base.iter().map(|s| s.to_string()).collect();

    // skills iterate in sorted order, so the same snapshot always yields
    // the same supplements
    for skill in snapshot.skills.iter().take(2) {
        recommendations.push(skill_recommendation(skill));
    }

    recommendations.truncate(5);
    recommendations
}

fn skill_recommendation(skill: &str) -> String {
    match skill.to_lowercase().as_str() {
        "writing" => "Pick up a short freelance writing job toward the income target".to_string(),
        "design" => "Offer a small design package to a past client".to_string(),
        "programming" | "coding" => {
            "Take on a short contract project for extra income".to_string()
        }
        "teaching" => "Book a paid tutoring session this week".to_string(),
        "photography" => "Sell a photo session or stock images".to_string(),
        other => format!("Spend one hour this week earning from your {} skill", other),
    }
}

/// Next-week multiplier keyed by the same progress buckets as the
/// recommendation table; week-1 users keep their plan untouched.
fn adjustment_for(goal_progress_pct: f64, performance: WeeklyPerformance) -> NextWeekAdjustment {
    if performance == WeeklyPerformance::NotStarted {
        NextWeekAdjustment {
            multiplier: 1.0,
            reason: "First week of the cycle, targets stay as planned".to_string(),
        }
    } else if goal_progress_pct < 25.0 {
        NextWeekAdjustment {
            multiplier: 1.3,
            reason: "Progress under 25%, raising next week's target to catch up".to_string(),
        }
    } else if goal_progress_pct < 50.0 {
        NextWeekAdjustment {
            multiplier: 1.15,
            reason: "Progress between 25% and 50%, nudging next week's target up".to_string(),
        }
    } else {
        NextWeekAdjustment {
            multiplier: 0.95,
            reason: "Progress at or above 50%, easing next week's target slightly".to_string(),
        }
    }
}

/// Placeholder result recorded when a user's analysis could not complete.
fn failed_result(reason: String) -> AnalysisResult {
    AnalysisResult {
        goal_progress_pct: 0.0,
        weekly_performance: WeeklyPerformance::NotStarted,
        watchdog: WatchdogReport {
            state: WatchdogState::Passive,
            risk_score: 0,
            message: "Analysis did not complete".to_string(),
            recommended_actions: vec![],
            lockdown: None,
        },
        recommendations: vec![],
        next_week_adjustment: NextWeekAdjustment {
            multiplier: 1.0,
            reason: "Analysis failed, targets unchanged".to_string(),
        },
        analyzed_at: Utc::now(),
        analysis_failed: true,
        failure_reason: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn snapshot_with_skills(skills: &[&str]) -> FinancialSnapshot {
        FinancialSnapshot {
            current_savings: 1000.0,
            savings_goal: 100_000.0,
            monthly_income: 3000.0,
            monthly_expenses: 2000.0,
            current_week: 2,
            skills: skills.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_week_one_is_not_started() {
        assert_eq!(
            classify_performance(0.0, 0.0, 1),
            WeeklyPerformance::NotStarted
        );
        // even a well-funded week-1 user hasn't started the cycle
        assert_eq!(
            classify_performance(80.0, 0.0, 1),
            WeeklyPerformance::NotStarted
        );
    }

    #[test]
    fn test_ahead_classification() {
        // 80% progress vs 71.4% expected pace in week 6
        let expected = 5.0 / 7.0 * 100.0;
        assert_eq!(
            classify_performance(80.0, expected, 6),
            WeeklyPerformance::Ahead
        );
    }

    #[test]
    fn test_poor_classification() {
        // 0.5% progress vs ~57% expected pace in week 5
        let expected = 4.0 / 7.0 * 100.0;
        assert_eq!(
            classify_performance(0.5, expected, 5),
            WeeklyPerformance::Poor
        );
    }

    #[test]
    fn test_on_track_and_behind_bands() {
        let expected = 50.0;
        assert_eq!(
            classify_performance(47.0, expected, 4),
            WeeklyPerformance::OnTrack
        );
        assert_eq!(
            classify_performance(40.0, expected, 4),
            WeeklyPerformance::Behind
        );
        assert_eq!(
            classify_performance(34.0, expected, 4),
            WeeklyPerformance::Poor
        );
    }

    #[test]
    fn test_adjustment_buckets() {
        assert_eq!(
            adjustment_for(10.0, WeeklyPerformance::Poor).multiplier,
            1.3
        );
        assert_eq!(
            adjustment_for(40.0, WeeklyPerformance::Behind).multiplier,
            1.15
        );
        assert_eq!(
            adjustment_for(80.0, WeeklyPerformance::Ahead).multiplier,
            0.95
        );
        assert_eq!(
            adjustment_for(0.0, WeeklyPerformance::NotStarted).multiplier,
            1.0
        );
    }

    #[test]
    fn test_adjustment_carries_reason() {
        let adjustment = adjustment_for(10.0, WeeklyPerformance::Poor);
        assert!(!adjustment.reason.is_empty());
    }

    #[test]
    fn test_recommendations_capped_at_five() {
        let snapshot = snapshot_with_skills(&["writing", "design", "teaching"]);
        let recommendations = build_recommendations(1.0, &snapshot);
        assert_eq!(recommendations.len(), 5);
    }

    #[test]
    fn test_recommendations_without_skills() {
        let snapshot = snapshot_with_skills(&[]);
        let recommendations = build_recommendations(1.0, &snapshot);
        assert_eq!(recommendations.len(), 3);
    }

    #[test]
    fn test_skill_supplements_are_deterministic() {
        let snapshot = snapshot_with_skills(&["writing", "design"]);
        let first = build_recommendations(30.0, &snapshot);
        let second = build_recommendations(30.0, &snapshot);
        assert_eq!(first, second);
        // sorted skill order: design before writing
        assert!(first[3].contains("design package"));
        assert!(first[4].contains("writing job"));
    }

    #[test]
    fn test_unknown_skill_gets_generic_supplement() {
        let snapshot = snapshot_with_skills(&["juggling"]);
        let recommendations = build_recommendations(30.0, &snapshot);
        assert!(recommendations[3].contains("juggling"));
    }

    #[test]
    fn test_failed_result_shape() {
        let result = failed_result("boom".to_string());
        assert!(result.analysis_failed);
        assert_eq!(result.failure_reason.as_deref(), Some("boom"));
        assert!(result.recommendations.is_empty());
        assert_eq!(result.next_week_adjustment.multiplier, 1.0);
    }
}
