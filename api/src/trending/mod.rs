use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Integer, Nullable, Text, Timestamp};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    App,
    error::AppError,
    response::{Paginated, offset, page_params},
};

pub mod engine;

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/hot", get(get_hot))
        .route("/rising", get(get_rising))
}

#[derive(Clone, Copy, PartialEq)]
enum ListKind {
    Hot,
    Rising,
}

impl ListKind {
    fn category(self) -> &'static str {
        match self {
            ListKind::Hot => engine::CATEGORY_HOT,
            ListKind::Rising => engine::CATEGORY_RISING,
        }
    }

    fn score_column(self) -> &'static str {
        match self {
            ListKind::Hot => "hot_score",
            ListKind::Rising => "rising_score",
        }
    }
}

#[derive(Deserialize)]
pub struct TrendingQuery {
    page: Option<i64>,
    per_page: Option<i64>,
}

#[derive(Serialize)]
pub struct TrendingEntry {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub summary: String,
    pub author_name: String,
    pub logo_url: Option<String>,
    pub download_count: i64,
    pub thumbs_up_count: i32,
    pub rank: i64,
    pub score: f64,
    pub download_velocity: f64,
    /// Positive = climbed since then; null = not on the list at that age.
    pub rank_change_24h: Option<i32>,
    pub rank_change_7d: Option<i32>,
}

#[derive(QueryableByName, Debug)]
struct TrendingRow {
    #[diesel(sql_type = Integer)]
    id: i32,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    slug: String,
    #[diesel(sql_type = Text)]
    summary: String,
    #[diesel(sql_type = Text)]
    author_name: String,
    #[diesel(sql_type = Nullable<Text>)]
    logo_url: Option<String>,
    #[diesel(sql_type = BigInt)]
    download_count: i64,
    #[diesel(sql_type = Integer)]
    thumbs_up_count: i32,
    #[diesel(sql_type = Double)]
    score: f64,
    #[diesel(sql_type = Double)]
    download_velocity: f64,
    #[diesel(sql_type = Nullable<Integer>)]
    latest_rank: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    rank_24h_ago: Option<i32>,
    #[diesel(sql_type = Nullable<Integer>)]
    rank_7d_ago: Option<i32>,
}

/// Positive when the item climbed; None when it was not on the list at the
/// prior horizon ("new to list") or is not on it now.
fn rank_change(prior: Option<i32>, current: Option<i32>) -> Option<i32> {
    match (prior, current) {
        (Some(prior), Some(current)) => Some(prior - current),
        _ => None,
    }
}

async fn get_hot(
    State(ctx): State<App>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Paginated<TrendingEntry>>, AppError> {
    list_trending(ctx, ListKind::Hot, query).await
}

async fn get_rising(
    State(ctx): State<App>,
    Query(query): Query<TrendingQuery>,
) -> Result<Json<Paginated<TrendingEntry>>, AppError> {
    list_trending(ctx, ListKind::Rising, query).await
}

async fn list_trending(
    ctx: App,
    kind: ListKind,
    query: TrendingQuery,
) -> Result<Json<Paginated<TrendingEntry>>, AppError> {
    use crate::schema::items::dsl as items_dsl;
    use crate::schema::trending_scores::dsl as scores_dsl;

    let (page, per_page) = page_params(query.page, query.per_page);
    let mut conn = ctx.diesel.get().await?;

    let zero = BigDecimal::from(0);
    let total: i64 = match kind {
        ListKind::Hot => {
            scores_dsl::trending_scores
                .inner_join(items_dsl::items)
                .filter(items_dsl::status.eq(crate::models::item::STATUS_ACTIVE))
                .filter(scores_dsl::hot_score.gt(zero))
                .count()
                .get_result(&mut conn)
                .await?
        }
        ListKind::Rising => {
            // The hot top-N is exactly the set with first_hot_at still set.
            scores_dsl::trending_scores
                .inner_join(items_dsl::items)
                .filter(items_dsl::status.eq(crate::models::item::STATUS_ACTIVE))
                .filter(scores_dsl::rising_score.gt(zero))
                .filter(scores_dsl::first_hot_at.is_null())
                .count()
                .get_result(&mut conn)
                .await?
        }
    };

    let score_column = kind.score_column();
    let rising_exclusion = match kind {
        ListKind::Hot => "",
        ListKind::Rising => "AND ts.first_hot_at IS NULL",
    };

    // Rank change is resolved at read time against the recorded rank history:
    // the latest row per item vs the closest row at or before each horizon.
    let sql = format!(
        "
        SELECT
            i.id,
            i.name,
            i.slug,
            i.summary,
            i.author_name,
            i.logo_url,
            i.download_count,
            i.thumbs_up_count,
            ts.{score_column}::FLOAT8 AS score,
            ts.download_velocity::FLOAT8 AS download_velocity,
            latest.rank AS latest_rank,
            prior24.rank AS rank_24h_ago,
            prior7d.rank AS rank_7d_ago
        FROM trending_scores ts
        JOIN items i ON i.id = ts.item_id
        LEFT JOIN LATERAL (
            SELECT rh.rank
            FROM rank_history rh
            WHERE rh.item_id = ts.item_id AND rh.category = $1
            ORDER BY rh.recorded_at DESC
            LIMIT 1
        ) latest ON TRUE
        LEFT JOIN LATERAL (
            SELECT rh.rank
            FROM rank_history rh
            WHERE rh.item_id = ts.item_id AND rh.category = $1 AND rh.recorded_at <= $2
            ORDER BY rh.recorded_at DESC
            LIMIT 1
        ) prior24 ON TRUE
        LEFT JOIN LATERAL (
            SELECT rh.rank
            FROM rank_history rh
            WHERE rh.item_id = ts.item_id AND rh.category = $1 AND rh.recorded_at <= $3
            ORDER BY rh.recorded_at DESC
            LIMIT 1
        ) prior7d ON TRUE
        WHERE i.status = 'active' AND ts.{score_column} > 0 {rising_exclusion}
        ORDER BY ts.{score_column} DESC, i.id
        LIMIT $4 OFFSET $5
        "
    );

    let now = chrono::Utc::now().naive_utc();
    let rows: Vec<TrendingRow> = diesel::sql_query(sql)
        .bind::<Text, _>(kind.category())
        .bind::<Timestamp, _>(now - chrono::Duration::hours(24))
        .bind::<Timestamp, _>(now - chrono::Duration::days(7))
        .bind::<BigInt, _>(per_page)
        .bind::<BigInt, _>(offset(page, per_page))
        .load(&mut conn)
        .await?;

    let entries = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            TrendingEntry {
                rank: offset(page, per_page) + i as i64 + 1,
                rank_change_24h: rank_change(row.rank_24h_ago, row.latest_rank),
                rank_change_7d: rank_change(row.rank_7d_ago, row.latest_rank),
                id: row.id,
                name: row.name,
                slug: row.slug,
                summary: row.summary,
                author_name: row.author_name,
                logo_url: row.logo_url,
                download_count: row.download_count,
                thumbs_up_count: row.thumbs_up_count,
                score: row.score,
                download_velocity: row.download_velocity,
            }
        })
        .collect();

    Ok(Json(Paginated::new(entries, page, per_page, total)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rank_change_is_prior_minus_current() {
        assert_eq!(rank_change(Some(5), Some(2)), Some(3), "climbed three places");
        assert_eq!(rank_change(Some(2), Some(5)), Some(-3), "fell three places");
        assert_eq!(rank_change(None, Some(1)), None, "new to the list");
        assert_eq!(rank_change(Some(1), None), None, "no longer recorded");
    }

    #[test]
    fn list_kinds_map_to_their_columns() {
        assert_eq!(ListKind::Hot.score_column(), "hot_score");
        assert_eq!(ListKind::Rising.score_column(), "rising_score");
        assert_eq!(ListKind::Hot.category(), "hot");
        assert_eq!(ListKind::Rising.category(), "rising");
    }
}
