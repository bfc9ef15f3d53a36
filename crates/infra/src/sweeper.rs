use std::future::Future;
use std::time::{Duration, Instant};

use promptboard_domain::error::DomainError;
use promptboard_domain::jobs::{next_sweep_delay_ms, now_ms};
use promptboard_domain::scoring::{RecomputeReport, ScoreMaintainer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepSchedule {
    pub interval_ms: u64,
    /// First retry delay after a failed sweep; doubles per consecutive failure.
    pub retry_base_ms: u64,
}

impl SweepSchedule {
    pub fn every(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            retry_base_ms: (interval_ms / 60).clamp(1_000, 60_000),
        }
    }
}

#[derive(Debug)]
pub enum SweepOutcome {
    Completed {
        report: RecomputeReport,
        duration: Duration,
    },
    Failed {
        error: DomainError,
        duration: Duration,
    },
}

pub async fn sweep_once(maintainer: &ScoreMaintainer) -> SweepOutcome {
    let started = Instant::now();
    match maintainer.recompute_all(now_ms()).await {
        Ok(report) => {
            let duration = started.elapsed();
            tracing::info!(
                scanned = report.scanned,
                updated = report.updated,
                superseded = report.superseded,
                failed = report.failed,
                duration_ms = duration.as_millis() as u64,
                "hot score sweep finished"
            );
            SweepOutcome::Completed { report, duration }
        }
        Err(error) => {
            let duration = started.elapsed();
            tracing::error!(error = %error, "hot score sweep failed");
            SweepOutcome::Failed { error, duration }
        }
    }
}

/// Sweeps immediately, then on `schedule` until `shutdown` resolves. A sweep
/// in flight when shutdown fires is dropped between prompt rewrites.
pub async fn run_sweeps<S, F>(
    maintainer: ScoreMaintainer,
    schedule: SweepSchedule,
    shutdown: S,
    mut observe: F,
) where
    S: Future<Output = ()>,
    F: FnMut(&SweepOutcome),
{
    tokio::pin!(shutdown);
    let mut consecutive_failures: u32 = 0;

    loop {
        let outcome = tokio::select! {
            _ = &mut shutdown => break,
            outcome = sweep_once(&maintainer) => outcome,
        };
        observe(&outcome);

        consecutive_failures = match outcome {
            SweepOutcome::Completed { .. } => 0,
            SweepOutcome::Failed { .. } => consecutive_failures.saturating_add(1),
        };
        let delay_ms = next_sweep_delay_ms(
            schedule.interval_ms,
            consecutive_failures,
            schedule.retry_base_ms,
        );
        tracing::debug!(delay_ms, consecutive_failures, "next sweep scheduled");

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
        }
    }

    tracing::info!("sweep loop stopped");
}
