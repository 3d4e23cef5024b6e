use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

#[derive(Queryable, Selectable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub summary: String,
    pub author_id: Option<i32>,
    pub author_name: String,
    pub logo_url: Option<String>,
    pub primary_category_id: Option<i32>,
    pub category_ids: Vec<i32>,
    pub game_versions: Vec<String>,
    pub download_count: i64,
    pub thumbs_up_count: i32,
    pub popularity_rank: Option<i32>,
    pub rating: Option<f64>,
    pub latest_file_at: Option<NaiveDateTime>,
    pub date_created: NaiveDateTime,
    pub date_modified: NaiveDateTime,
    pub last_synced_at: NaiveDateTime,
    pub status: String,
    #[serde(skip_serializing)]
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing)]
    pub updated_at: NaiveDateTime,
}

/// One row per observed catalog entry; doubles as the conflict-by-id
/// changeset so a harvest pass overwrites every mutable column.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::items)]
#[diesel(treat_none_as_null = true)]
pub struct ItemUpsert {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub summary: String,
    pub author_id: Option<i32>,
    pub author_name: String,
    pub logo_url: Option<String>,
    pub primary_category_id: Option<i32>,
    pub category_ids: Vec<i32>,
    pub game_versions: Vec<String>,
    pub download_count: i64,
    pub thumbs_up_count: i32,
    pub popularity_rank: Option<i32>,
    pub rating: Option<f64>,
    pub latest_file_at: Option<NaiveDateTime>,
    pub date_created: NaiveDateTime,
    pub date_modified: NaiveDateTime,
    pub last_synced_at: NaiveDateTime,
    pub status: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Queryable, Selectable, Debug, Serialize, Clone)]
#[diesel(table_name = crate::schema::snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Snapshot {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(skip_serializing)]
    pub item_id: i32,
    pub recorded_at: NaiveDateTime,
    pub download_count: i64,
    pub thumbs_up_count: i32,
    pub popularity_rank: Option<i32>,
    pub rating: Option<f64>,
    pub latest_file_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::snapshots)]
pub struct NewSnapshot {
    pub item_id: i32,
    pub recorded_at: NaiveDateTime,
    pub download_count: i64,
    pub thumbs_up_count: i32,
    pub popularity_rank: Option<i32>,
    pub rating: Option<f64>,
    pub latest_file_at: Option<NaiveDateTime>,
}
