use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use eyre::eyre;
use futures::stream::StreamExt;

use crate::App;
use crate::curseforge::{RemoteMod, SERVER_CEILING, SortField};
use crate::models::category::CategoryUpsert;
use crate::models::item::{ItemUpsert, NewSnapshot, STATUS_ACTIVE, STATUS_INACTIVE};

pub const PAGE_SIZE: i32 = 50;
const PAGE_DELAY: Duration = Duration::from_millis(300);
const MAX_CONCURRENT_UPSERTS: usize = 4;

/// Below this many observed items the cycle is assumed to be a remote outage
/// and the orphan pass is skipped wholesale.
const SAFETY_MIN_OBSERVED: usize = 1000;

/// Fraction of per-item persistence failures the cycle tolerates.
const MAX_ITEM_ERROR_RATE: f64 = 0.01;

pub struct HarvestOutcome {
    pub observed: HashSet<i32>,
    pub persisted: usize,
    pub failed: usize,
}

/// One full harvest: category sync, multi-sort catalog enumeration, then a
/// per-item upsert + snapshot transaction for every distinct observed mod.
#[tracing::instrument(skip(ctx))]
pub async fn run_harvest(ctx: &App) -> Result<HarvestOutcome, eyre::Error> {
    if let Err(err) = sync_categories(ctx).await {
        tracing::error!(?err, "Category sync failed, continuing with the harvest");
    }

    let mods = enumerate_catalog(ctx).await?;
    let observed: HashSet<i32> = mods.keys().copied().collect();
    tracing::info!(observed = observed.len(), "Catalog enumeration complete");

    let now = chrono::Utc::now().naive_utc();
    let failures: Vec<i32> = futures::stream::iter(mods.into_values())
        .map(|m| {
            let ctx = ctx.clone();
            async move {
                let id = m.id;
                persist_item(&ctx, m, now).await.map_err(|err| {
                    tracing::warn!(item_id = id, ?err, "Failed to persist item");
                    id
                })
            }
        })
        .buffer_unordered(MAX_CONCURRENT_UPSERTS)
        .filter_map(|result| async move { result.err() })
        .collect()
        .await;

    let failed = failures.len();
    let persisted = observed.len() - failed;

    if failed as f64 > observed.len() as f64 * MAX_ITEM_ERROR_RATE {
        return Err(eyre!(
            "harvest cycle failed: {failed} of {} item transactions errored",
            observed.len()
        ));
    }

    Ok(HarvestOutcome {
        observed,
        persisted,
        failed,
    })
}

/// The server caps any single sorted query at [`SERVER_CEILING`] results, so
/// the universe is reconstructed as the union of three complete paginations
/// under different sort fields, de-duplicated by remote id.
async fn enumerate_catalog(ctx: &App) -> Result<HashMap<i32, RemoteMod>, eyre::Error> {
    let mut seen: HashMap<i32, RemoteMod> = HashMap::new();

    for sort in SortField::ALL {
        if let Err(err) = enumerate_sort(ctx, sort, &mut seen).await {
            if seen.is_empty() {
                // Nothing fetched at all: treat as a catalog-level outage.
                return Err(eyre!("catalog enumeration failed on {sort:?}: {err}"));
            }
            tracing::error!(?sort, ?err, "Sort enumeration failed, keeping partial coverage");
        }
    }

    Ok(seen)
}

#[tracing::instrument(skip(ctx, seen))]
async fn enumerate_sort(
    ctx: &App,
    sort: SortField,
    seen: &mut HashMap<i32, RemoteMod>,
) -> Result<(), eyre::Error> {
    let mut index = 0;

    loop {
        let page = ctx
            .curseforge
            .search_page(
                ctx.config.game_id,
                ctx.config.game_version_type_id,
                sort,
                index,
                PAGE_SIZE,
            )
            .await?;

        let result_count = page.data.len();
        for m in page.data {
            seen.entry(m.id).or_insert(m);
        }

        index += PAGE_SIZE;
        if walk_finished(result_count, PAGE_SIZE, index, page.pagination.total_count) {
            tracing::debug!(
                ?sort,
                fetched_up_to = index,
                total_count = page.pagination.total_count,
                "Sort enumeration finished"
            );
            return Ok(());
        }

        tokio::time::sleep(PAGE_DELAY).await;
    }
}

/// A pagination stops on a short page, when it has covered the reported
/// total, or when the next page would cross the server's result ceiling.
fn walk_finished(result_count: usize, page_size: i32, next_index: i32, total_count: i64) -> bool {
    result_count < page_size as usize
        || next_index as i64 >= total_count
        || next_index + page_size > SERVER_CEILING
}

/// Item row and its snapshot commit or roll back together; the cycle never
/// leaves an item update without the matching observation.
async fn persist_item(ctx: &App, m: RemoteMod, now: NaiveDateTime) -> Result<(), eyre::Error> {
    use crate::schema::items::dsl as items_dsl;
    use crate::schema::snapshots::dsl as snapshots_dsl;

    let item = item_upsert(&m, now);
    let snapshot = new_snapshot(&m, now);

    let mut conn = ctx.diesel.get().await?;
    conn.transaction(|conn| {
        Box::pin(async move {
            diesel::insert_into(items_dsl::items)
                .values(&item)
                .on_conflict(items_dsl::id)
                .do_update()
                .set(&item)
                .execute(conn)
                .await?;

            diesel::insert_into(snapshots_dsl::snapshots)
                .values(&snapshot)
                .on_conflict_do_nothing()
                .execute(conn)
                .await?;

            Ok::<_, diesel::result::Error>(())
        })
    })
    .await?;

    Ok(())
}

fn item_upsert(m: &RemoteMod, now: NaiveDateTime) -> ItemUpsert {
    let author = m.authors.as_slice().first();
    let mut game_versions: Vec<String> = m
        .latest_files
        .iter()
        .flat_map(|f| f.game_versions.iter().cloned())
        .collect();
    game_versions.sort();
    game_versions.dedup();

    ItemUpsert {
        id: m.id,
        name: m.name.clone(),
        slug: m.slug.clone(),
        summary: m.summary.clone(),
        author_id: author.map(|a| a.id),
        author_name: author.map(|a| a.name.clone()).unwrap_or_default(),
        logo_url: m.logo.as_ref().and_then(|l| l.thumbnail_url.clone()),
        primary_category_id: m.categories.as_slice().first().map(|c| c.id),
        category_ids: m.categories.iter().map(|c| c.id).collect(),
        game_versions,
        download_count: m.download_count,
        thumbs_up_count: m.thumbs_up_count,
        popularity_rank: m.popularity_rank,
        rating: m.rating,
        latest_file_at: latest_file_at(m),
        date_created: m.date_created.naive_utc(),
        date_modified: m.date_modified.naive_utc(),
        last_synced_at: now,
        status: STATUS_ACTIVE.to_string(),
        updated_at: now,
    }
}

fn new_snapshot(m: &RemoteMod, now: NaiveDateTime) -> NewSnapshot {
    NewSnapshot {
        item_id: m.id,
        recorded_at: now,
        download_count: m.download_count,
        thumbs_up_count: m.thumbs_up_count,
        popularity_rank: m.popularity_rank,
        rating: m.rating,
        latest_file_at: latest_file_at(m),
    }
}

fn latest_file_at(m: &RemoteMod) -> Option<NaiveDateTime> {
    m.latest_files
        .as_slice()
        .first()
        .and_then(|f| f.file_date)
        .map(|d| d.naive_utc())
}

/// Categories form a parent/child graph whose parents are not guaranteed to
/// precede their children in the listing, so the sync runs in two phases:
/// every category first lands with a NULL parent, then the parent links are
/// written once all rows exist.
#[tracing::instrument(skip(ctx))]
async fn sync_categories(ctx: &App) -> Result<(), eyre::Error> {
    use crate::schema::categories::dsl as categories_dsl;

    let remote = ctx.curseforge.categories(ctx.config.game_id).await?;
    let now = chrono::Utc::now().naive_utc();
    let mut conn = ctx.diesel.get().await?;

    for cat in &remote {
        let row = CategoryUpsert {
            id: cat.id,
            name: cat.name.clone(),
            slug: cat.slug.clone(),
            parent_id: None,
            icon_url: cat.icon_url.clone(),
            updated_at: now,
        };
        diesel::insert_into(categories_dsl::categories)
            .values(&row)
            .on_conflict(categories_dsl::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await?;
    }

    for cat in &remote {
        let Some(parent_id) = cat.parent_category_id.filter(|p| *p != 0) else {
            continue;
        };
        let updated = diesel::update(categories_dsl::categories.find(cat.id))
            .set(categories_dsl::parent_id.eq(parent_id))
            .execute(&mut conn)
            .await;
        if let Err(err) = updated {
            tracing::warn!(
                category_id = cat.id,
                parent_id,
                ?err,
                "Could not link category to its parent"
            );
        }
    }

    tracing::debug!(count = remote.len(), "Category sync complete");
    Ok(())
}

fn orphan_pass_allowed(observed: usize) -> bool {
    observed >= SAFETY_MIN_OBSERVED
}

/// Flip items that were not observed this cycle to inactive. Guarded: a
/// near-empty observation set means the upstream failed, not that the whole
/// catalog vanished.
#[tracing::instrument(skip(ctx, observed), fields(observed = observed.len()))]
pub async fn mark_orphans(ctx: &App, observed: &HashSet<i32>) -> Result<usize, eyre::Error> {
    use crate::schema::items::dsl as items_dsl;

    if !orphan_pass_allowed(observed.len()) {
        tracing::warn!(
            observed = observed.len(),
            minimum = SAFETY_MIN_OBSERVED,
            "Observed set is suspiciously small, skipping orphan marking"
        );
        return Ok(0);
    }

    let mut conn = ctx.diesel.get().await?;
    let active: Vec<i32> = items_dsl::items
        .filter(items_dsl::status.eq(STATUS_ACTIVE))
        .select(items_dsl::id)
        .load(&mut conn)
        .await?;

    let orphans: Vec<i32> = active
        .into_iter()
        .filter(|id| !observed.contains(id))
        .collect();
    if orphans.is_empty() {
        return Ok(0);
    }

    let now = chrono::Utc::now().naive_utc();
    let marked = diesel::update(items_dsl::items.filter(items_dsl::id.eq_any(&orphans)))
        .set((
            items_dsl::status.eq(STATUS_INACTIVE),
            items_dsl::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await?;

    tracing::info!(marked, "Marked unobserved items inactive");
    Ok(marked)
}
