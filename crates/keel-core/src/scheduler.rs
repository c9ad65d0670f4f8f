//! Sweep scheduling and mutual exclusion
//!
//! The scheduler fires the batch sweep once a day at a fixed local time.
//! It owns an injected clock so the firing logic is testable, and shares
//! the engine's single sweep guard with manual triggers, so two sweeps
//! never run concurrently no matter who started them.
//!
//! The guard releases itself after a stale bound: a run that crashed while
//! holding it cannot wedge every future sweep.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, NaiveTime};

use crate::analyzer::BatchAnalyzer;
use crate::error::{Error, Result};

/// Wall-clock source for the scheduler
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// System local time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[derive(Default)]
struct GuardState {
    held_since: Option<Instant>,
    generation: u64,
}

/// Mutual-exclusion guard around the batch sweep.
///
/// `acquire` fails with [`Error::SweepInProgress`] while a permit is live.
/// A permit held longer than the stale bound is treated as abandoned and
/// reclaimed; generations keep a late drop of the abandoned permit from
/// releasing the reclaimer's hold.
pub struct SweepGuard {
    state: Mutex<GuardState>,
    stale_after: Duration,
}

impl SweepGuard {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            state: Mutex::new(GuardState::default()),
            stale_after,
        }
    }

    pub fn acquire(&self) -> Result<SweepPermit<'_>> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(since) = state.held_since {
            if since.elapsed() < self.stale_after {
                return Err(Error::SweepInProgress);
            }
            tracing::warn!(
                held_secs = since.elapsed().as_secs(),
                "sweep guard held past the stale bound, reclaiming"
            );
        }

        state.generation += 1;
        state.held_since = Some(Instant::now());
        Ok(SweepPermit {
            guard: self,
            generation: state.generation,
        })
    }

    fn release(&self, generation: u64) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.generation == generation {
            state.held_since = None;
        }
    }
}

/// Live hold on the sweep guard; releases on drop
pub struct SweepPermit<'a> {
    guard: &'a SweepGuard,
    generation: u64,
}

impl Drop for SweepPermit<'_> {
    fn drop(&mut self) {
        self.guard.release(self.generation);
    }
}

/// Fires the batch sweep at a fixed daily local time.
pub struct SweepScheduler {
    analyzer: BatchAnalyzer,
    clock: Arc<dyn Clock>,
    run_at: NaiveTime,
}

impl SweepScheduler {
    pub fn new(analyzer: BatchAnalyzer, run_at: NaiveTime) -> Self {
        Self::with_clock(analyzer, run_at, Arc::new(SystemClock))
    }

    pub fn with_clock(analyzer: BatchAnalyzer, run_at: NaiveTime, clock: Arc<dyn Clock>) -> Self {
        Self {
            analyzer,
            clock,
            run_at,
        }
    }

    /// Time until the next scheduled firing
    pub fn next_run_delay(&self) -> Duration {
        let now = self.clock.now();
        let mut target = now.date().and_time(self.run_at);
        if target <= now {
            target += chrono::Duration::days(1);
        }
        (target - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Run one sweep now, sharing the guard with every other trigger
    pub async fn run_once(&self) -> Result<crate::models::SweepSummary> {
        self.analyzer.run_sweep().await
    }

    /// Sleep-and-sweep loop. Never returns; spawn it as a background task.
    pub async fn run_forever(&self) {
        loop {
            let delay = self.next_run_delay();
            tracing::info!(in_secs = delay.as_secs(), "next scheduled sweep");
            tokio::time::sleep(delay).await;

            match self.run_once().await {
                Ok(summary) => tracing::info!(
                    users = summary.users_analyzed,
                    high_risk = summary.high_risk_count,
                    failed = summary.failed_count,
                    "scheduled sweep complete"
                ),
                Err(Error::SweepInProgress) => {
                    tracing::warn!("scheduled sweep skipped, another sweep in flight")
                }
                Err(e) => tracing::error!(error = %e, "scheduled sweep failed"),
            }
        }
    }
}
