use std::net::SocketAddr;

use anyhow::Result;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use promptboard_infra::sweeper::SweepOutcome;

const SWEEPS_TOTAL: &str = "promptboard_worker_sweeps_total";
const SWEEP_DURATION_SECONDS: &str = "promptboard_worker_sweep_duration_seconds";
const SWEEP_PROMPTS_TOTAL: &str = "promptboard_worker_sweep_prompts_total";
const LAST_SWEEP_SCANNED_GAUGE: &str = "promptboard_worker_last_sweep_scanned";

/// Serves `/metrics` on `port`; 0 disables the exporter.
pub fn init_metrics(port: u16) -> Result<()> {
    if port == 0 {
        tracing::info!("worker metrics exporter disabled");
        return Ok(());
    }
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "worker metrics exporter listening");
    Ok(())
}

pub fn register_sweep(outcome: &SweepOutcome) {
    match outcome {
        SweepOutcome::Completed { report, duration } => {
            counter!(SWEEPS_TOTAL, "result" => "completed").increment(1);
            histogram!(SWEEP_DURATION_SECONDS, "result" => "completed")
                .record(duration.as_secs_f64());
            for (kind, count) in [
                ("updated", report.updated),
                ("superseded", report.superseded),
                ("failed", report.failed),
            ] {
                counter!(SWEEP_PROMPTS_TOTAL, "outcome" => kind).increment(count);
            }
            gauge!(LAST_SWEEP_SCANNED_GAUGE).set(report.scanned as f64);
        }
        SweepOutcome::Failed { duration, .. } => {
            counter!(SWEEPS_TOTAL, "result" => "failed").increment(1);
            histogram!(SWEEP_DURATION_SECONDS, "result" => "failed")
                .record(duration.as_secs_f64());
        }
    }
}
