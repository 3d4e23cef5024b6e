use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.curseforge.com";

/// Hard cap the catalog places on `index + pageSize` within one sorted query.
pub const SERVER_CEILING: i32 = 10_000;
pub const MAX_PAGE_SIZE: i32 = 50;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_SECS: u64 = 1;

/// Search sort axes the harvest enumerates, with the catalog's numeric
/// discriminants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Popularity,
    LastUpdated,
    TotalDownloads,
}

impl SortField {
    pub const ALL: [SortField; 3] = [
        SortField::Popularity,
        SortField::LastUpdated,
        SortField::TotalDownloads,
    ];

    pub fn remote_value(self) -> u8 {
        match self {
            SortField::Popularity => 2,
            SortField::LastUpdated => 3,
            SortField::TotalDownloads => 6,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CurseforgeError {
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed upstream body: {0}")]
    Decode(reqwest::Error),
}

impl CurseforgeError {
    /// Transient failures are worth a retry: connectivity problems,
    /// timeouts, server-side errors and rate limiting. Other 4xx and
    /// malformed bodies fail the request immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            CurseforgeError::Transport(_) => true,
            CurseforgeError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            CurseforgeError::Decode(_) => false,
        }
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(BACKOFF_BASE_SECS << attempt)
}

#[derive(Debug, Deserialize)]
pub struct SearchPage {
    pub data: Vec<RemoteMod>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub index: i32,
    pub page_size: i32,
    pub result_count: i32,
    pub total_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMod {
    pub id: i32,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub download_count: i64,
    #[serde(default)]
    pub thumbs_up_count: i32,
    pub rating: Option<f64>,
    pub popularity_rank: Option<i32>,
    pub date_created: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<RemoteModCategory>,
    #[serde(default)]
    pub authors: Vec<RemoteAuthor>,
    pub logo: Option<RemoteLogo>,
    #[serde(default)]
    pub latest_files: Vec<RemoteFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteModCategory {
    pub id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAuthor {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteLogo {
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub file_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub game_versions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCategory {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_category_id: Option<i32>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    data: Vec<RemoteCategory>,
}

/// Thin client over the catalog's REST API. Holds the shared reqwest client,
/// the base URL and the credential; retries are handled per request.
pub struct CurseforgeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CurseforgeClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
        }
    }

    /// One page of the paginated search. The caller keeps
    /// `index + page_size` within [`SERVER_CEILING`].
    pub async fn search_page(
        &self,
        game_id: i32,
        game_version_type_id: i32,
        sort: SortField,
        index: i32,
        page_size: i32,
    ) -> Result<SearchPage, CurseforgeError> {
        debug_assert!(index >= 0);
        debug_assert!((1..=MAX_PAGE_SIZE).contains(&page_size));
        debug_assert!(index + page_size <= SERVER_CEILING);

        let url = format!("{}/v1/mods/search", self.base_url);
        let query = [
            ("gameId", game_id.to_string()),
            ("gameVersionTypeId", game_version_type_id.to_string()),
            ("sortField", sort.remote_value().to_string()),
            ("sortOrder", "desc".to_string()),
            ("index", index.to_string()),
            ("pageSize", page_size.to_string()),
        ];

        self.get_with_retry(&url, &query).await
    }

    pub async fn categories(&self, game_id: i32) -> Result<Vec<RemoteCategory>, CurseforgeError> {
        let url = format!("{}/v1/categories", self.base_url);
        let query = [("gameId", game_id.to_string())];

        let response: CategoriesResponse = self.get_with_retry(&url, &query).await?;
        Ok(response.data)
    }

    /// Attempt, classify, sleep, retry. Transient failures get up to
    /// [`MAX_RETRIES`] extra attempts with exponential backoff; terminal
    /// failures surface to the caller straight away.
    async fn get_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CurseforgeError> {
        let mut attempt = 0;
        loop {
            match self.get_json(url, query).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < MAX_RETRIES && err.is_transient() => {
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        %url,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "Transient upstream failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, CurseforgeError> {
        let response = self
            .http
            .get(url)
            .header("x-api-key", &self.api_key)
            .query(query)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CurseforgeError::Status { status, body });
        }

        response.json::<T>().await.map_err(|err| {
            // A body that stops arriving mid-read is still a transport
            // problem; only an unparseable payload is a decode failure.
            if err.is_decode() {
                CurseforgeError::Decode(err)
            } else {
                CurseforgeError::Transport(err)
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn status_error(status: StatusCode) -> CurseforgeError {
        CurseforgeError::Status {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        assert!(status_error(StatusCode::INTERNAL_SERVER_ERROR).is_transient());
        assert!(status_error(StatusCode::BAD_GATEWAY).is_transient());
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS).is_transient());
    }

    #[test]
    fn client_errors_are_terminal() {
        assert!(!status_error(StatusCode::BAD_REQUEST).is_transient());
        assert!(!status_error(StatusCode::FORBIDDEN).is_transient());
        assert!(!status_error(StatusCode::NOT_FOUND).is_transient());
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn sort_fields_carry_remote_discriminants() {
        assert_eq!(SortField::Popularity.remote_value(), 2);
        assert_eq!(SortField::LastUpdated.remote_value(), 3);
        assert_eq!(SortField::TotalDownloads.remote_value(), 6);
    }

    #[test]
    fn search_page_decodes_the_consumed_field_set() {
        let raw = serde_json::json!({
            "data": [{
                "id": 42,
                "name": "Details! Damage Meter",
                "slug": "details",
                "summary": "A damage meter.",
                "downloadCount": 1_234_567,
                "thumbsUpCount": 89,
                "rating": 4.7,
                "popularityRank": 3,
                "dateCreated": "2014-03-02T10:00:00Z",
                "dateModified": "2026-05-01T12:30:00Z",
                "categories": [{"id": 1021, "name": "Combat", "slug": "combat"}],
                "authors": [{"id": 7, "name": "terciob"}],
                "logo": {"thumbnailUrl": "https://cdn.example/details.png"},
                "latestFiles": [{
                    "fileDate": "2026-04-28T08:00:00Z",
                    "gameVersions": ["11.1.0", "11.1.5"]
                }]
            }],
            "pagination": {"index": 0, "pageSize": 50, "resultCount": 1, "totalCount": 9000}
        });

        let page: SearchPage = serde_json::from_value(raw).expect("page should decode");
        assert_eq!(page.pagination.total_count, 9000);

        let m = &page.data[0];
        assert_eq!(m.id, 42);
        assert_eq!(m.download_count, 1_234_567);
        assert_eq!(m.popularity_rank, Some(3));
        assert_eq!(m.categories[0].id, 1021);
        assert_eq!(m.authors[0].name, "terciob");
        assert_eq!(
            m.logo.as_ref().unwrap().thumbnail_url.as_deref(),
            Some("https://cdn.example/details.png")
        );
        assert_eq!(m.latest_files[0].game_versions.len(), 2);
    }

    #[test]
    fn missing_optional_fields_default() {
        let raw = serde_json::json!({
            "id": 1,
            "name": "Bare",
            "slug": "bare",
            "dateCreated": "2020-01-01T00:00:00Z",
            "dateModified": "2020-01-01T00:00:00Z"
        });

        let m: RemoteMod = serde_json::from_value(raw).expect("mod should decode");
        assert_eq!(m.download_count, 0);
        assert!(m.latest_files.is_empty());
        assert!(m.logo.is_none());
    }
}
