use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Persisted scoring state for one item. Scores are stored as fixed-scale
/// decimals so successive runs read back exactly what was written.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::trending_scores)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrendingScore {
    pub item_id: i32,
    pub hot_score: BigDecimal,
    pub rising_score: BigDecimal,
    pub download_velocity: BigDecimal,
    pub thumbs_velocity: BigDecimal,
    pub download_growth_pct: BigDecimal,
    pub thumbs_growth_pct: BigDecimal,
    pub size_multiplier: BigDecimal,
    pub maintenance_multiplier: BigDecimal,
    pub first_hot_at: Option<NaiveDateTime>,
    pub first_rising_at: Option<NaiveDateTime>,
    pub calculated_at: NaiveDateTime,
}

// treat_none_as_null: a cleared first_hot_at must actually write NULL,
// otherwise re-entry age accounting never resets.
#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::trending_scores)]
#[diesel(treat_none_as_null = true)]
pub struct TrendingScoreUpsert {
    pub item_id: i32,
    pub hot_score: BigDecimal,
    pub rising_score: BigDecimal,
    pub download_velocity: BigDecimal,
    pub thumbs_velocity: BigDecimal,
    pub download_growth_pct: BigDecimal,
    pub thumbs_growth_pct: BigDecimal,
    pub size_multiplier: BigDecimal,
    pub maintenance_multiplier: BigDecimal,
    pub first_hot_at: Option<NaiveDateTime>,
    pub first_rising_at: Option<NaiveDateTime>,
    pub calculated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::rank_history)]
pub struct NewRankHistory {
    pub item_id: i32,
    pub category: String,
    pub rank: i32,
    pub score: BigDecimal,
    pub recorded_at: NaiveDateTime,
}
