use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Timestamp};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use eyre::eyre;

use crate::App;
use crate::models::trending::{NewRankHistory, TrendingScore, TrendingScoreUpsert};

pub const TOP_N: i64 = 20;

const HOT_MIN_DOWNLOADS: i64 = 500;
const RISING_MIN_DOWNLOADS: i64 = 50;
const RISING_MAX_DOWNLOADS: i64 = 10_000;

const HOT_GRAVITY: f64 = 1.5;
const RISING_GRAVITY: f64 = 1.8;
const AGE_OFFSET_HOURS: f64 = 2.0;

const UPDATE_BOOST_VALUE: f64 = 10.0;
const DEFAULT_P95_DOWNLOADS: f64 = 500_000.0;

// Signal = fixed linear blend of download velocity, endorsement velocity and
// update recency. The growth signal applies the same weights to the growth
// percentages.
const WEIGHT_DOWNLOADS: f64 = 0.7;
const WEIGHT_THUMBS: f64 = 0.2;
const WEIGHT_UPDATE_BOOST: f64 = 0.1;

const CONFIDENT_MIN_SNAPSHOTS: i64 = 5;
const CONFIDENT_MIN_DELTA: i64 = 10;

const HOURS_24H: f64 = 24.0;
const HOURS_7D: f64 = 168.0;

pub const CATEGORY_HOT: &str = "hot";
pub const CATEGORY_RISING: &str = "rising";

/// Everything the scoring math needs for one item, pre-aggregated from the
/// snapshot history. Deltas are window max - min and never negative: the
/// upstream counters only grow, so a decrease is a data anomaly and is
/// ignored for velocity purposes.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScoreInputs {
    pub downloads: i64,
    pub thumbs: i64,
    pub snap_count_24h: i64,
    pub delta_downloads_24h: i64,
    pub delta_downloads_7d: i64,
    pub delta_thumbs_24h: i64,
    pub delta_thumbs_7d: i64,
    /// Hours between the oldest and newest snapshot inside each window;
    /// keeps early velocities honest while the history is still short.
    pub span_hours_24h: f64,
    pub span_hours_7d: f64,
    pub min_downloads_7d: i64,
    pub updated_within_7d: bool,
    pub update_days_90d: i64,
    pub p95_downloads: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Computed {
    pub hot_score: f64,
    pub rising_score: f64,
    pub download_velocity: f64,
    pub thumbs_velocity: f64,
    pub download_growth_pct: f64,
    pub thumbs_growth_pct: f64,
    pub size_multiplier: f64,
    pub maintenance_multiplier: f64,
    pub first_hot_at: Option<NaiveDateTime>,
    pub first_rising_at: Option<NaiveDateTime>,
}

fn window_velocity(delta: i64, span_hours: f64, window_hours: f64) -> f64 {
    delta.max(0) as f64 / span_hours.clamp(1.0, window_hours)
}

fn confident(snap_count_24h: i64, delta_24h: i64) -> bool {
    snap_count_24h >= CONFIDENT_MIN_SNAPSHOTS && delta_24h >= CONFIDENT_MIN_DELTA
}

/// Prefer the 24h window when it is statistically meaningful, otherwise let
/// the 7d window dominate.
fn blended_velocity(v24: f64, v7: f64, confident: bool) -> f64 {
    if confident {
        0.8 * v24 + 0.2 * v7
    } else {
        0.3 * v24 + 0.7 * v7
    }
}

fn growth_pct(delta_7d: i64, baseline: i64) -> f64 {
    if baseline <= 0 {
        return 0.0;
    }
    delta_7d.max(0) as f64 / baseline as f64 * 100.0
}

/// Smooth [0.1, 1.0] weighting against the catalog's 95th percentile of
/// total downloads; log scale so mid-sized items are not crushed.
fn size_multiplier(downloads: i64, p95: f64) -> f64 {
    if p95 <= 0.0 {
        return 1.0;
    }
    if downloads <= 0 {
        return 0.1;
    }
    ((downloads as f64 + 1.0).log10() / (p95 + 1.0).log10()).clamp(0.1, 1.0)
}

/// Step function of release cadence over the last 90 days.
fn maintenance_multiplier(update_days_90d: i64) -> f64 {
    if update_days_90d == 0 {
        return 0.95;
    }
    let avg_days_between = 90.0 / update_days_90d as f64;
    if avg_days_between <= 14.0 {
        1.15
    } else if avg_days_between <= 30.0 {
        1.10
    } else if avg_days_between <= 60.0 {
        1.05
    } else {
        1.00
    }
}

fn blend_signal(downloads_term: f64, thumbs_term: f64, update_boost: bool) -> f64 {
    WEIGHT_DOWNLOADS * downloads_term
        + WEIGHT_THUMBS * thumbs_term
        + WEIGHT_UPDATE_BOOST * if update_boost { UPDATE_BOOST_VALUE } else { 0.0 }
}

fn decayed(signal: f64, size_mult: f64, maint_mult: f64, age_hours: f64, gravity: f64) -> f64 {
    signal * size_mult * maint_mult / (age_hours + AGE_OFFSET_HOURS).powf(gravity)
}

fn age_hours(now: NaiveDateTime, since: NaiveDateTime) -> f64 {
    ((now - since).num_seconds() as f64 / 3600.0).max(0.0)
}

/// Score one item. `prev_first_hot_at` / `prev_first_rising_at` come from
/// the previous run and drive the gravity age; a fresh entry starts at age 0.
pub(crate) fn compute_scores(
    inputs: &ScoreInputs,
    now: NaiveDateTime,
    prev_first_hot_at: Option<NaiveDateTime>,
    prev_first_rising_at: Option<NaiveDateTime>,
) -> Computed {
    let dv24 = window_velocity(inputs.delta_downloads_24h, inputs.span_hours_24h, HOURS_24H);
    let dv7 = window_velocity(inputs.delta_downloads_7d, inputs.span_hours_7d, HOURS_7D);
    let download_velocity = blended_velocity(
        dv24,
        dv7,
        confident(inputs.snap_count_24h, inputs.delta_downloads_24h),
    );

    let tv24 = window_velocity(inputs.delta_thumbs_24h, inputs.span_hours_24h, HOURS_24H);
    let tv7 = window_velocity(inputs.delta_thumbs_7d, inputs.span_hours_7d, HOURS_7D);
    let thumbs_velocity = blended_velocity(
        tv24,
        tv7,
        confident(inputs.snap_count_24h, inputs.delta_thumbs_24h),
    );

    let download_growth_pct = growth_pct(inputs.delta_downloads_7d, inputs.min_downloads_7d);
    let thumbs_growth_pct = growth_pct(
        inputs.delta_thumbs_7d,
        inputs.thumbs - inputs.delta_thumbs_7d,
    );

    let size_mult = size_multiplier(inputs.downloads, inputs.p95_downloads);
    let maint_mult = maintenance_multiplier(inputs.update_days_90d);

    let signal = blend_signal(download_velocity, thumbs_velocity, inputs.updated_within_7d);
    let growth_signal = blend_signal(
        download_growth_pct,
        thumbs_growth_pct,
        inputs.updated_within_7d,
    );

    let hot_eligible = inputs.downloads >= HOT_MIN_DOWNLOADS && signal > 0.0;
    let (first_hot_at, hot_score) = if hot_eligible {
        let since = prev_first_hot_at.unwrap_or(now);
        let age = age_hours(now, since);
        (
            Some(since),
            decayed(signal, size_mult, maint_mult, age, HOT_GRAVITY),
        )
    } else {
        (None, 0.0)
    };

    let rising_eligible = (RISING_MIN_DOWNLOADS..=RISING_MAX_DOWNLOADS).contains(&inputs.downloads)
        && growth_signal > 0.0;
    let (first_rising_at, rising_score) = if rising_eligible {
        let since = prev_first_rising_at.unwrap_or(now);
        let age = age_hours(now, since);
        (
            Some(since),
            decayed(growth_signal, size_mult, maint_mult, age, RISING_GRAVITY),
        )
    } else {
        (None, 0.0)
    };

    Computed {
        hot_score,
        rising_score,
        download_velocity,
        thumbs_velocity,
        download_growth_pct,
        thumbs_growth_pct,
        size_multiplier: size_mult,
        maintenance_multiplier: maint_mult,
        first_hot_at,
        first_rising_at,
    }
}

#[derive(QueryableByName, Debug)]
struct AggregateRow {
    #[diesel(sql_type = Integer)]
    item_id: i32,
    #[diesel(sql_type = BigInt)]
    download_count: i64,
    #[diesel(sql_type = Integer)]
    thumbs_up_count: i32,
    #[diesel(sql_type = Nullable<Timestamp>)]
    latest_file_at: Option<NaiveDateTime>,
    #[diesel(sql_type = BigInt)]
    snap_count_24h: i64,
    #[diesel(sql_type = Nullable<BigInt>)]
    min_downloads_24h: Option<i64>,
    #[diesel(sql_type = Nullable<BigInt>)]
    max_downloads_24h: Option<i64>,
    #[diesel(sql_type = Nullable<BigInt>)]
    min_downloads_7d: Option<i64>,
    #[diesel(sql_type = Nullable<BigInt>)]
    max_downloads_7d: Option<i64>,
    #[diesel(sql_type = Nullable<Integer>)]
    min_thumbs_24h: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    max_thumbs_24h: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    min_thumbs_7d: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    max_thumbs_7d: Option<i32>,
    #[diesel(sql_type = Nullable<Timestamp>)]
    oldest_24h: Option<NaiveDateTime>,
    #[diesel(sql_type = Nullable<Timestamp>)]
    oldest_7d: Option<NaiveDateTime>,
    #[diesel(sql_type = Nullable<Timestamp>)]
    newest: Option<NaiveDateTime>,
}

#[derive(QueryableByName, Debug)]
struct UpdateCadenceRow {
    #[diesel(sql_type = Integer)]
    item_id: i32,
    #[diesel(sql_type = BigInt)]
    update_days: i64,
}

#[derive(QueryableByName, Debug)]
struct PercentileRow {
    #[diesel(sql_type = Nullable<Double>)]
    p95: Option<f64>,
}

async fn load_aggregates(
    conn: &mut AsyncPgConnection,
    now: NaiveDateTime,
) -> Result<Vec<AggregateRow>, diesel::result::Error> {
    diesel::sql_query(
        "
        SELECT
            i.id AS item_id,
            i.download_count,
            i.thumbs_up_count,
            i.latest_file_at,
            COUNT(*) FILTER (WHERE s.recorded_at >= $1) AS snap_count_24h,
            MIN(s.download_count) FILTER (WHERE s.recorded_at >= $1) AS min_downloads_24h,
            MAX(s.download_count) FILTER (WHERE s.recorded_at >= $1) AS max_downloads_24h,
            MIN(s.download_count) AS min_downloads_7d,
            MAX(s.download_count) AS max_downloads_7d,
            MIN(s.thumbs_up_count) FILTER (WHERE s.recorded_at >= $1) AS min_thumbs_24h,
            MAX(s.thumbs_up_count) FILTER (WHERE s.recorded_at >= $1) AS max_thumbs_24h,
            MIN(s.thumbs_up_count) AS min_thumbs_7d,
            MAX(s.thumbs_up_count) AS max_thumbs_7d,
            MIN(s.recorded_at) FILTER (WHERE s.recorded_at >= $1) AS oldest_24h,
            MIN(s.recorded_at) AS oldest_7d,
            MAX(s.recorded_at) AS newest
        FROM items i
        JOIN snapshots s ON s.item_id = i.id
        WHERE i.status = 'active' AND s.recorded_at >= $2
        GROUP BY i.id
        ",
    )
    .bind::<Timestamp, _>(now - chrono::Duration::hours(24))
    .bind::<Timestamp, _>(now - chrono::Duration::days(7))
    .load(conn)
    .await
}

/// Distinct calendar days on which the latest-file timestamp moved inside
/// the last 90 days; a cheap proxy for release cadence.
async fn load_update_cadence(
    conn: &mut AsyncPgConnection,
    now: NaiveDateTime,
) -> Result<HashMap<i32, i64>, diesel::result::Error> {
    let rows: Vec<UpdateCadenceRow> = diesel::sql_query(
        "
        SELECT item_id, COUNT(DISTINCT latest_file_at::date)::INT8 AS update_days
        FROM snapshots
        WHERE latest_file_at IS NOT NULL AND latest_file_at >= $1
        GROUP BY item_id
        ",
    )
    .bind::<Timestamp, _>(now - chrono::Duration::days(90))
    .load(conn)
    .await?;

    Ok(rows.into_iter().map(|r| (r.item_id, r.update_days)).collect())
}

async fn load_p95(conn: &mut AsyncPgConnection) -> Result<Option<f64>, diesel::result::Error> {
    let row: PercentileRow = diesel::sql_query(
        "
        SELECT PERCENTILE_CONT(0.95) WITHIN GROUP (ORDER BY download_count::FLOAT8) AS p95
        FROM items
        WHERE status = 'active'
        ",
    )
    .get_result(conn)
    .await?;

    Ok(row.p95)
}

async fn load_previous(
    conn: &mut AsyncPgConnection,
) -> Result<HashMap<i32, (Option<NaiveDateTime>, Option<NaiveDateTime>)>, diesel::result::Error> {
    use crate::schema::trending_scores::dsl as scores_dsl;

    let rows: Vec<TrendingScore> = scores_dsl::trending_scores
        .select(TrendingScore::as_select())
        .load(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.item_id, (r.first_hot_at, r.first_rising_at)))
        .collect())
}

fn score_inputs(
    row: &AggregateRow,
    update_days_90d: i64,
    p95_downloads: f64,
    now: NaiveDateTime,
) -> ScoreInputs {
    let span = |oldest: Option<NaiveDateTime>| match (oldest, row.newest) {
        (Some(oldest), Some(newest)) => (newest - oldest).num_seconds() as f64 / 3600.0,
        _ => 0.0,
    };

    let delta = |max: Option<i64>, min: Option<i64>| match (max, min) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    };

    ScoreInputs {
        downloads: row.download_count,
        thumbs: row.thumbs_up_count as i64,
        snap_count_24h: row.snap_count_24h,
        delta_downloads_24h: delta(row.max_downloads_24h, row.min_downloads_24h),
        delta_downloads_7d: delta(row.max_downloads_7d, row.min_downloads_7d),
        delta_thumbs_24h: delta(
            row.max_thumbs_24h.map(i64::from),
            row.min_thumbs_24h.map(i64::from),
        ),
        delta_thumbs_7d: delta(
            row.max_thumbs_7d.map(i64::from),
            row.min_thumbs_7d.map(i64::from),
        ),
        span_hours_24h: span(row.oldest_24h),
        span_hours_7d: span(row.oldest_7d),
        min_downloads_7d: row.min_downloads_7d.unwrap_or(0),
        updated_within_7d: row
            .latest_file_at
            .is_some_and(|t| t >= now - chrono::Duration::days(7)),
        update_days_90d,
        p95_downloads,
    }
}

fn decimal(value: f64, scale: i64) -> Result<BigDecimal, eyre::Error> {
    BigDecimal::try_from(value)
        .map(|d| d.with_scale(scale))
        .map_err(|err| eyre!("score value {value} is not representable: {err}"))
}

fn score_upsert(
    item_id: i32,
    computed: &Computed,
    now: NaiveDateTime,
) -> Result<TrendingScoreUpsert, eyre::Error> {
    Ok(TrendingScoreUpsert {
        item_id,
        hot_score: decimal(computed.hot_score, 6)?,
        rising_score: decimal(computed.rising_score, 6)?,
        download_velocity: decimal(computed.download_velocity, 6)?,
        thumbs_velocity: decimal(computed.thumbs_velocity, 6)?,
        download_growth_pct: decimal(computed.download_growth_pct, 6)?,
        thumbs_growth_pct: decimal(computed.thumbs_growth_pct, 6)?,
        size_multiplier: decimal(computed.size_multiplier, 4)?,
        maintenance_multiplier: decimal(computed.maintenance_multiplier, 4)?,
        first_hot_at: computed.first_hot_at,
        first_rising_at: computed.first_rising_at,
        calculated_at: now,
    })
}

/// Recompute both ranked lists: bulk aggregate load, per-item scoring,
/// score upserts, then top-N rank recording with age reset for drop-outs.
#[tracing::instrument(skip(ctx))]
pub async fn run_trending(ctx: &App) -> Result<(), eyre::Error> {
    use crate::schema::trending_scores::dsl as scores_dsl;

    let now = chrono::Utc::now().naive_utc();
    let mut conn = ctx.diesel.get().await?;

    let aggregates = load_aggregates(&mut conn, now).await?;
    let cadence = load_update_cadence(&mut conn, now).await?;
    let p95 = match load_p95(&mut conn).await {
        Ok(Some(p95)) if p95 > 0.0 => p95,
        Ok(_) => DEFAULT_P95_DOWNLOADS,
        Err(err) => {
            tracing::warn!(?err, "Percentile query failed, using the default ceiling");
            DEFAULT_P95_DOWNLOADS
        }
    };
    let previous = load_previous(&mut conn).await?;

    tracing::info!(items = aggregates.len(), p95, "Scoring aggregated items");

    let mut scored = 0usize;
    for row in &aggregates {
        let inputs = score_inputs(row, cadence.get(&row.item_id).copied().unwrap_or(0), p95, now);
        let (prev_hot, prev_rising) = previous
            .get(&row.item_id)
            .copied()
            .unwrap_or((None, None));
        let computed = compute_scores(&inputs, now, prev_hot, prev_rising);

        let upsert = match score_upsert(row.item_id, &computed, now) {
            Ok(upsert) => upsert,
            Err(err) => {
                tracing::warn!(item_id = row.item_id, ?err, "Skipping unscorable item");
                continue;
            }
        };

        diesel::insert_into(scores_dsl::trending_scores)
            .values(&upsert)
            .on_conflict(scores_dsl::item_id)
            .do_update()
            .set(&upsert)
            .execute(&mut conn)
            .await?;
        scored += 1;
    }

    let (hot_ids, rising_ids) = record_ranks(&mut conn, now).await?;

    tracing::info!(
        scored,
        hot = hot_ids.len(),
        rising = rising_ids.len(),
        "Trending computation complete"
    );
    Ok(())
}

/// Read back the top-N per category, append the rank history rows, and clear
/// the first-seen timestamps of every item that fell off its list so a later
/// re-entry starts from age 0.
async fn record_ranks(
    conn: &mut AsyncPgConnection,
    now: NaiveDateTime,
) -> Result<(Vec<i32>, Vec<i32>), eyre::Error> {
    use crate::schema::items::dsl as items_dsl;
    use crate::schema::rank_history::dsl as history_dsl;
    use crate::schema::trending_scores::dsl as scores_dsl;

    let zero = BigDecimal::from(0);

    // Join through items: a row orphaned since its last scoring keeps a
    // stale positive score but must not hold a list position.
    let hot_top: Vec<(i32, BigDecimal)> = scores_dsl::trending_scores
        .inner_join(items_dsl::items)
        .filter(items_dsl::status.eq(crate::models::item::STATUS_ACTIVE))
        .filter(scores_dsl::hot_score.gt(zero.clone()))
        .order(scores_dsl::hot_score.desc())
        .limit(TOP_N)
        .select((scores_dsl::item_id, scores_dsl::hot_score))
        .load(conn)
        .await?;
    let hot_ids: Vec<i32> = hot_top.iter().map(|(id, _)| *id).collect();

    // Rising never shows what Hot already features.
    let rising_top: Vec<(i32, BigDecimal)> = scores_dsl::trending_scores
        .inner_join(items_dsl::items)
        .filter(items_dsl::status.eq(crate::models::item::STATUS_ACTIVE))
        .filter(scores_dsl::rising_score.gt(zero))
        .filter(scores_dsl::item_id.ne_all(&hot_ids))
        .order(scores_dsl::rising_score.desc())
        .limit(TOP_N)
        .select((scores_dsl::item_id, scores_dsl::rising_score))
        .load(conn)
        .await?;
    let rising_ids: Vec<i32> = rising_top.iter().map(|(id, _)| *id).collect();

    let ranked_rows = |top: &[(i32, BigDecimal)], category: &str| -> Vec<NewRankHistory> {
        top.iter()
            .enumerate()
            .map(|(i, (item_id, score))| NewRankHistory {
                item_id: *item_id,
                category: category.to_string(),
                rank: i as i32 + 1,
                score: score.clone(),
                recorded_at: now,
            })
            .collect()
    };

    diesel::insert_into(history_dsl::rank_history)
        .values(ranked_rows(&hot_top, CATEGORY_HOT))
        .execute(conn)
        .await?;
    diesel::insert_into(history_dsl::rank_history)
        .values(ranked_rows(&rising_top, CATEGORY_RISING))
        .execute(conn)
        .await?;

    diesel::update(
        scores_dsl::trending_scores
            .filter(scores_dsl::item_id.ne_all(&hot_ids))
            .filter(scores_dsl::first_hot_at.is_not_null()),
    )
    .set(scores_dsl::first_hot_at.eq(None::<NaiveDateTime>))
    .execute(conn)
    .await?;

    diesel::update(
        scores_dsl::trending_scores
            .filter(scores_dsl::item_id.ne_all(&rising_ids))
            .filter(scores_dsl::first_rising_at.is_not_null()),
    )
    .set(scores_dsl::first_rising_at.eq(None::<NaiveDateTime>))
    .execute(conn)
    .await?;

    Ok((hot_ids, rising_ids))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32) -> NaiveDateTime {
        Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0)
            .unwrap()
            .naive_utc()
    }

    fn base_inputs() -> ScoreInputs {
        ScoreInputs {
            p95_downloads: DEFAULT_P95_DOWNLOADS,
            ..Default::default()
        }
    }

    #[test]
    fn confidence_needs_both_snapshots_and_delta() {
        assert!(!confident(4, 1_000_000), "4 snapshots is never confident");
        assert!(confident(5, 10));
        assert!(!confident(5, 9));
    }

    #[test]
    fn velocity_blend_weights_flip_with_confidence() {
        assert!((blended_velocity(100.0, 10.0, true) - 82.0).abs() < 1e-9);
        assert!((blended_velocity(100.0, 10.0, false) - 37.0).abs() < 1e-9);
    }

    #[test]
    fn negative_deltas_are_ignored() {
        assert_eq!(window_velocity(-500, 24.0, 24.0), 0.0);
    }

    #[test]
    fn short_history_uses_the_actual_span() {
        // 24 hours of data inside the 7d window: both velocities agree
        assert!((window_velocity(2400, 24.0, 168.0) - 100.0).abs() < 1e-9);
        assert!((window_velocity(2400, 168.0, 168.0) - 2400.0 / 168.0).abs() < 1e-9);
    }

    #[test]
    fn size_multiplier_extremes() {
        assert_eq!(size_multiplier(0, 500_000.0), 0.1);
        assert_eq!(size_multiplier(500_000, 500_000.0), 1.0);
        assert_eq!(size_multiplier(10_000_000, 500_000.0), 1.0, "clamped above p95");
        assert_eq!(size_multiplier(123, 0.0), 1.0, "degenerate percentile");
    }

    #[test]
    fn maintenance_multiplier_steps() {
        assert_eq!(maintenance_multiplier(0), 0.95);
        assert_eq!(maintenance_multiplier(1), 1.00); // every 90 days
        assert_eq!(maintenance_multiplier(2), 1.05); // every 45 days
        assert_eq!(maintenance_multiplier(3), 1.10); // every 30 days
        assert_eq!(maintenance_multiplier(7), 1.15); // roughly every 13 days
    }

    #[test]
    fn growth_pct_guards_the_denominator() {
        assert_eq!(growth_pct(200, 100), 200.0);
        assert_eq!(growth_pct(200, 0), 0.0);
        assert_eq!(growth_pct(-10, 100), 0.0);
    }

    #[test]
    fn hot_eligibility_boundary_is_500_downloads() {
        let now = at(12);
        let mut inputs = base_inputs();
        inputs.snap_count_24h = 25;
        inputs.delta_downloads_24h = 100;
        inputs.delta_downloads_7d = 100;
        inputs.span_hours_24h = 24.0;
        inputs.span_hours_7d = 24.0;
        inputs.min_downloads_7d = 400;

        inputs.downloads = 500;
        let eligible = compute_scores(&inputs, now, None, None);
        assert!(eligible.hot_score > 0.0);
        assert_eq!(eligible.first_hot_at, Some(now));

        inputs.downloads = 499;
        let not_eligible = compute_scores(&inputs, now, None, None);
        assert_eq!(not_eligible.hot_score, 0.0);
        assert_eq!(not_eligible.first_hot_at, None);
    }

    #[test]
    fn rising_band_is_inclusive_of_both_edges() {
        let now = at(12);
        let mut inputs = base_inputs();
        inputs.delta_downloads_7d = 40;
        inputs.span_hours_7d = 168.0;
        inputs.min_downloads_7d = 60;

        for downloads in [50, 10_000] {
            inputs.downloads = downloads;
            let computed = compute_scores(&inputs, now, None, None);
            assert!(
                computed.rising_score > 0.0,
                "{downloads} downloads should be rising-eligible"
            );
        }

        for downloads in [49, 10_001] {
            inputs.downloads = downloads;
            let computed = compute_scores(&inputs, now, None, None);
            assert_eq!(
                computed.rising_score, 0.0,
                "{downloads} downloads should not be rising-eligible"
            );
        }
    }

    /// 24 hourly snapshots climbing 1000 -> 3400, no recent release.
    #[test]
    fn steady_growth_scores_like_the_reference_run() {
        let now = at(12);
        let inputs = ScoreInputs {
            downloads: 3400,
            snap_count_24h: 25,
            delta_downloads_24h: 2400,
            delta_downloads_7d: 2400,
            span_hours_24h: 24.0,
            span_hours_7d: 24.0,
            min_downloads_7d: 1000,
            p95_downloads: 500_000.0,
            ..Default::default()
        };

        let computed = compute_scores(&inputs, now, None, None);

        assert!((computed.download_velocity - 100.0).abs() < 1e-6);
        assert!((computed.size_multiplier - 0.6197).abs() < 0.001);
        assert_eq!(computed.maintenance_multiplier, 0.95);
        // 0.7 * 100 * 0.6197 * 0.95 / 2^1.5
        assert!(
            (computed.hot_score - 14.57).abs() < 0.05,
            "hot_score was {}",
            computed.hot_score
        );
    }

    /// Small item tripling over a week: rising, never hot.
    #[test]
    fn small_fast_grower_is_rising_only() {
        let now = at(12);
        let inputs = ScoreInputs {
            downloads: 300,
            snap_count_24h: 24,
            delta_downloads_24h: 30,
            delta_downloads_7d: 200,
            span_hours_24h: 24.0,
            span_hours_7d: 168.0,
            min_downloads_7d: 100,
            p95_downloads: 500_000.0,
            ..Default::default()
        };

        let computed = compute_scores(&inputs, now, None, None);

        assert!((computed.download_growth_pct - 200.0).abs() < 1e-9);
        assert_eq!(computed.hot_score, 0.0, "below the hot floor");
        // growth signal 140, size ~0.435, maint 0.95, age 0 at gravity 1.8
        assert!(
            (computed.rising_score - 16.6).abs() < 0.15,
            "rising_score was {}",
            computed.rising_score
        );
    }

    #[test]
    fn age_is_carried_from_the_previous_run() {
        let now = at(12);
        let ten_hours_ago = at(2);
        let inputs = ScoreInputs {
            downloads: 5000,
            snap_count_24h: 25,
            delta_downloads_24h: 2400,
            delta_downloads_7d: 2400,
            span_hours_24h: 24.0,
            span_hours_7d: 24.0,
            min_downloads_7d: 1000,
            p95_downloads: 500_000.0,
            ..Default::default()
        };

        let fresh = compute_scores(&inputs, now, None, None);
        let aged = compute_scores(&inputs, now, Some(ten_hours_ago), None);

        assert_eq!(aged.first_hot_at, Some(ten_hours_ago));
        assert!(
            aged.hot_score < fresh.hot_score,
            "gravity must decay an aged entry"
        );

        let expected_ratio = (AGE_OFFSET_HOURS / (10.0 + AGE_OFFSET_HOURS)).powf(HOT_GRAVITY);
        assert!((aged.hot_score / fresh.hot_score - expected_ratio).abs() < 1e-9);
    }

    #[test]
    fn update_boost_requires_a_release_within_seven_days() {
        let now = at(12);
        let mut inputs = ScoreInputs {
            downloads: 5000,
            snap_count_24h: 25,
            delta_downloads_24h: 2400,
            delta_downloads_7d: 2400,
            span_hours_24h: 24.0,
            span_hours_7d: 24.0,
            min_downloads_7d: 1000,
            p95_downloads: 500_000.0,
            ..Default::default()
        };

        let without = compute_scores(&inputs, now, None, None);
        inputs.updated_within_7d = true;
        let with = compute_scores(&inputs, now, None, None);

        let boost = WEIGHT_UPDATE_BOOST * UPDATE_BOOST_VALUE;
        let expected = (without.hot_score / without.size_multiplier
            / without.maintenance_multiplier
            * AGE_OFFSET_HOURS.powf(HOT_GRAVITY)
            + boost)
            * with.size_multiplier
            * with.maintenance_multiplier
            / AGE_OFFSET_HOURS.powf(HOT_GRAVITY);
        assert!((with.hot_score - expected).abs() < 1e-9);
    }

    #[test]
    fn aggregate_gaps_produce_a_zero_score_row() {
        // Fresh install: one snapshot, no deltas, no spans.
        let now = at(12);
        let inputs = ScoreInputs {
            downloads: 40_000,
            snap_count_24h: 1,
            p95_downloads: 500_000.0,
            ..Default::default()
        };

        let computed = compute_scores(&inputs, now, None, None);
        assert_eq!(computed.hot_score, 0.0);
        assert_eq!(computed.rising_score, 0.0);
        assert_eq!(computed.first_hot_at, None);
    }
}
