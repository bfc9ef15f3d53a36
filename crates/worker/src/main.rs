mod observability;

use anyhow::bail;
use promptboard_domain::scoring::ScoreMaintainer;
use promptboard_infra::repositories::build_repositories;
use promptboard_infra::sweeper::{SweepSchedule, run_sweeps};
use promptboard_infra::{config::AppConfig, logging::init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config)?;

    // The memory backend is local to the API process.
    if !config.uses_redis() {
        bail!(
            "worker requires DATA_BACKEND=redis (got `{}`)",
            config.data_backend
        );
    }

    observability::init_metrics(config.worker_metrics_port)?;

    let repositories = build_repositories(&config).await?;
    let maintainer = ScoreMaintainer::new(repositories.prompts.clone())
        .with_sweep_concurrency(config.recompute_concurrency);
    let schedule = SweepSchedule::every(config.recompute_interval_ms);

    info!(
        interval_ms = schedule.interval_ms,
        concurrency = config.recompute_concurrency,
        "hot score worker starting"
    );

    run_sweeps(
        maintainer,
        schedule,
        async {
            let _ = tokio::signal::ctrl_c().await;
        },
        observability::register_sweep,
    )
    .await;

    info!("hot score worker shutdown");
    Ok(())
}
