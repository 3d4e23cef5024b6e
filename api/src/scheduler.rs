use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{App, harvest, retention, trending};

const CYCLE_PERIOD: Duration = Duration::from_hours(1);

/// Past this point a cycle is eating into the next tick's slot.
const CYCLE_BUDGET: Duration = Duration::from_mins(55);
const MIN_CYCLE_INTERVAL: Duration = Duration::from_mins(10);

/// Single-flight state for the sync pipeline; only one cycle runs at a time.
pub struct SyncState {
    in_progress: Mutex<bool>,
    last_cycle_at: Mutex<Option<Instant>>,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            in_progress: Mutex::new(false),
            last_cycle_at: Mutex::new(None),
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn start_background_sync(ctx: App) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CYCLE_PERIOD);
        loop {
            interval.tick().await;
            if let Err(err) = run_cycle(ctx.clone()).await {
                tracing::error!(?err, "Sync cycle failed");
            }
        }
    });
}

/// Harvest, orphan pass, trending, retention; strictly in that order. Phase
/// failures are contained: scoring still runs over whatever the harvest
/// managed to persist, and retention runs regardless.
pub async fn run_cycle(ctx: App) -> Result<(), eyre::Error> {
    {
        let mut in_progress = ctx.sync.in_progress.lock().await;
        if *in_progress {
            tracing::debug!("Cycle already in progress, skipping");
            return Ok(());
        }

        let last_cycle = ctx.sync.last_cycle_at.lock().await;
        if let Some(last) = *last_cycle
            && last.elapsed() < MIN_CYCLE_INTERVAL
        {
            tracing::debug!("Cycle ran recently, skipping");
            return Ok(());
        }

        *in_progress = true;
    }

    let started = Instant::now();

    match harvest::run_harvest(&ctx).await {
        Ok(outcome) => {
            tracing::info!(
                observed = outcome.observed.len(),
                persisted = outcome.persisted,
                failed = outcome.failed,
                "Harvest finished"
            );
            if let Err(err) = harvest::mark_orphans(&ctx, &outcome.observed).await {
                tracing::error!(?err, "Orphan marking failed");
            }
        }
        Err(err) => {
            tracing::error!(?err, "Harvest failed, scoring runs on last persisted state");
        }
    }

    if let Err(err) = trending::engine::run_trending(&ctx).await {
        tracing::error!(?err, "Trending computation failed");
    }

    if let Err(err) = retention::run_retention(&ctx).await {
        tracing::error!(?err, "Retention sweep failed");
    }

    let elapsed = started.elapsed();
    if elapsed > CYCLE_BUDGET {
        tracing::warn!(
            elapsed_secs = elapsed.as_secs(),
            budget_secs = CYCLE_BUDGET.as_secs(),
            "Cycle duration is approaching the schedule period"
        );
    } else {
        tracing::info!(elapsed_secs = elapsed.as_secs(), "Cycle complete");
    }

    {
        let mut in_progress = ctx.sync.in_progress.lock().await;
        *in_progress = false;
        let mut last_cycle = ctx.sync.last_cycle_at.lock().await;
        *last_cycle = Some(Instant::now());
    }

    Ok(())
}
