use crate::catalog::CatalogStats;
use crate::server::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Start the periodic statistics refresh.
///
/// `schedule` is a cron expression with seconds first. An empty schedule
/// disables the refresh and returns `None`.
pub async fn start_scheduler(state: Arc<AppState>, schedule: &str) -> Result<Option<JobScheduler>> {
    if schedule.trim().is_empty() {
        info!("Statistics refresh disabled");
        return Ok(None);
    }

    let scheduler = JobScheduler::new().await?;

    let job_state = Arc::clone(&state);
    let job = Job::new_async(schedule, move |_uuid, _l| {
        let state = Arc::clone(&job_state);

        Box::pin(async move {
            if let Err(e) = refresh_stats(&state).await {
                error!("Statistics refresh failed: {:#}", e);
            }
        })
    })
    .with_context(|| format!("Invalid refresh schedule \"{schedule}\""))?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("Scheduled statistics refresh ({})", schedule);

    Ok(Some(scheduler))
}

/// Reload the catalog and publish a snapshot carrying fresh statistics.
/// The live snapshot is never modified.
pub async fn refresh_stats(state: &AppState) -> Result<()> {
    state
        .catalog()
        .refresh()
        .await
        .context("Failed to refresh catalog")?;
    let stats = CatalogStats::collect(state.catalog())
        .await
        .context("Failed to collect catalog statistics")?;

    info!(
        "Refreshed statistics: {} games on {} platforms",
        stats.total_games,
        stats.platforms.len()
    );
    let next = state.site().with_stats(stats);
    state.publish(next);

    Ok(())
}
