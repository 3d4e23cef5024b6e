use std::time::Duration;

use chrono::NaiveDateTime;
use diesel::sql_types::Timestamp;
use diesel_async::RunQueryDsl;

use crate::App;

const SNAPSHOT_RETENTION_DAYS: i64 = 95;
const RANK_HISTORY_RETENTION_DAYS: i64 = 7;

/// Rows deleted per statement; batching keeps the locks short under
/// concurrent read traffic.
const DELETE_BATCH_SIZE: usize = 10_000;
const BATCH_PAUSE: Duration = Duration::from_millis(200);

#[tracing::instrument(skip(ctx))]
pub async fn run_retention(ctx: &App) -> Result<(), eyre::Error> {
    let now = chrono::Utc::now().naive_utc();

    let snapshots_deleted = sweep(
        ctx,
        "snapshots",
        now - chrono::Duration::days(SNAPSHOT_RETENTION_DAYS),
    )
    .await?;
    let ranks_deleted = sweep(
        ctx,
        "rank_history",
        now - chrono::Duration::days(RANK_HISTORY_RETENTION_DAYS),
    )
    .await?;

    tracing::info!(snapshots_deleted, ranks_deleted, "Retention sweep complete");
    Ok(())
}

async fn sweep(ctx: &App, table: &str, cutoff: NaiveDateTime) -> Result<usize, eyre::Error> {
    let sql = format!(
        "DELETE FROM {table} WHERE id IN \
         (SELECT id FROM {table} WHERE recorded_at < $1 LIMIT {DELETE_BATCH_SIZE})"
    );

    let mut total = 0;
    loop {
        let mut conn = ctx.diesel.get().await?;
        let deleted = diesel::sql_query(&sql)
            .bind::<Timestamp, _>(cutoff)
            .execute(&mut conn)
            .await?;
        drop(conn);

        total += deleted;
        if deleted < DELETE_BATCH_SIZE {
            break;
        }
        tokio::time::sleep(BATCH_PAUSE).await;
    }

    if total > 0 {
        tracing::debug!(table, total, %cutoff, "Swept expired rows");
    }
    Ok(total)
}
