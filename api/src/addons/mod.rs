use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    App,
    error::AppError,
    models::category::Category,
    models::item::{Item, STATUS_ACTIVE, Snapshot},
    response::{Entity, Paginated, offset, page_params},
};

const DEFAULT_HISTORY_HOURS: i64 = 168;
const MAX_HISTORY_HOURS: i64 = 720;

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/", get(list_addons))
        .route("/{slug}", get(get_addon))
        .route("/{slug}/history", get(get_history))
}

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    search: Option<String>,
    category: Option<String>,
}

/// The category filter is lenient: an unparseable id yields an empty page,
/// not a client error.
fn parse_category(raw: Option<&str>) -> Result<Option<i32>, ()> {
    match raw {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<i32>().map(Some).map_err(|_| ()),
    }
}

async fn list_addons(
    State(ctx): State<App>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<Item>>, AppError> {
    use crate::schema::items::dsl as items_dsl;

    let (page, per_page) = page_params(query.page, query.per_page);

    let category_id = match parse_category(query.category.as_deref()) {
        Ok(id) => id,
        Err(()) => return Ok(Json(Paginated::new(vec![], page, per_page, 0))),
    };
    let search_pattern = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let filtered = || {
        let mut q = items_dsl::items
            .filter(items_dsl::status.eq(STATUS_ACTIVE))
            .into_boxed();
        if let Some(pattern) = &search_pattern {
            q = q.filter(
                items_dsl::name
                    .ilike(pattern.clone())
                    .or(items_dsl::summary.ilike(pattern.clone())),
            );
        }
        if let Some(id) = category_id {
            q = q.filter(items_dsl::category_ids.contains(vec![id]));
        }
        q
    };

    let mut conn = ctx.diesel.get().await?;

    let total: i64 = filtered().count().get_result(&mut conn).await?;
    let items: Vec<Item> = filtered()
        .order((items_dsl::download_count.desc(), items_dsl::id.asc()))
        .limit(per_page)
        .offset(offset(page, per_page))
        .select(Item::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(Paginated::new(items, page, per_page, total)))
}

async fn get_addon(
    State(ctx): State<App>,
    Path(slug): Path<String>,
) -> Result<Json<Entity<Item>>, AppError> {
    use crate::schema::items::dsl as items_dsl;

    let mut conn = ctx.diesel.get().await?;
    let item = items_dsl::items
        .filter(items_dsl::slug.eq(&slug))
        .select(Item::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or(AppError::NotFound("addon"))?;

    Ok(Json(Entity { data: item }))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    /// Window in hours, newest first.
    limit: Option<i64>,
}

fn clamp_history_hours(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_HOURS)
        .clamp(1, MAX_HISTORY_HOURS)
}

async fn get_history(
    State(ctx): State<App>,
    Path(slug): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Entity<Vec<Snapshot>>>, AppError> {
    use crate::schema::items::dsl as items_dsl;
    use crate::schema::snapshots::dsl as snapshots_dsl;

    let hours = clamp_history_hours(query.limit);
    let mut conn = ctx.diesel.get().await?;

    let item_id = items_dsl::items
        .filter(items_dsl::slug.eq(&slug))
        .select(items_dsl::id)
        .first::<i32>(&mut conn)
        .await
        .optional()?
        .ok_or(AppError::NotFound("addon"))?;

    let since = chrono::Utc::now().naive_utc() - chrono::Duration::hours(hours);
    let snapshots: Vec<Snapshot> = snapshots_dsl::snapshots
        .filter(snapshots_dsl::item_id.eq(item_id))
        .filter(snapshots_dsl::recorded_at.ge(since))
        .order(snapshots_dsl::recorded_at.desc())
        .select(Snapshot::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(Entity { data: snapshots }))
}

pub async fn list_categories(
    State(ctx): State<App>,
) -> Result<Json<Entity<Vec<Category>>>, AppError> {
    use crate::schema::categories::dsl as categories_dsl;

    let mut conn = ctx.diesel.get().await?;
    let categories: Vec<Category> = categories_dsl::categories
        .order(categories_dsl::name.asc())
        .select(Category::as_select())
        .load(&mut conn)
        .await?;

    Ok(Json(Entity { data: categories }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn category_parse_is_lenient_but_typed() {
        assert_eq!(parse_category(None), Ok(None));
        assert_eq!(parse_category(Some("12")), Ok(Some(12)));
        assert_eq!(parse_category(Some(" 12 ")), Ok(Some(12)));
        assert_eq!(parse_category(Some("combat")), Err(()));
        assert_eq!(parse_category(Some("")), Err(()));
    }

    #[test]
    fn history_window_is_clamped_to_thirty_days() {
        assert_eq!(clamp_history_hours(None), 168);
        assert_eq!(clamp_history_hours(Some(0)), 1);
        assert_eq!(clamp_history_hours(Some(24)), 24);
        assert_eq!(clamp_history_hours(Some(100_000)), 720);
    }
}
