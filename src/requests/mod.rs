//! Structs and utilities for making requests to mangadex servers

pub mod author;
pub mod chapter;
pub mod cover;
pub mod manga;
pub mod query_utils;
pub mod scanlation_group;
pub mod tag;

use crate::MangoClient;
use author::AuthorSummary;
use chapter::{ChapterImageList, ChapterSummary, ImageQuality};
use manga::{AdvancedSearch, MangaSummary};
use query_utils::{lenient, ContentRatingFilter, Query, ResponseResultOk as _};
use scanlation_group::GroupSummary;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use std::fmt;

/// Error object as returned by mangadex inside the `errors` array of an envelope. Members
/// of an unexpected type are read as their default so the rest still comes through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerResponseError {
    #[serde(deserialize_with = "lenient")]
    pub id: String,
    #[serde(deserialize_with = "lenient_status")]
    pub status: i32,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub detail: Option<String>,
    pub context: Option<Value>,
}

/// Accepts `400` as well as `"400"`
fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Value = Deserialize::deserialize(deserializer)?;

    Ok(match raw {
        Value::Number(status) => status.as_i64().and_then(|s| i32::try_from(s).ok()),
        Value::String(status) => status.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or_default())
}

impl fmt::Display for ServerResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} (id: {})",
            self.status,
            self.title,
            self.detail.as_deref().unwrap_or("no details provided"),
            self.id
        )
    }
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way an operation of this crate can fail
#[derive(Error, Debug)]
pub enum Error {
    /// Server answered with a status other than 200, or could not be reached at all
    /// (`status` is `None` then)
    #[error("{operation}: {}", describe_connection(.status))]
    ConnectionFailure {
        operation: &'static str,
        status: Option<u16>,
        #[source]
        source: Option<reqwest_middleware::Error>,
    },
    /// Body of a 200 response is not json
    #[error("{operation}: failed to parse response payload")]
    PayloadParseError {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation}: server reported error {error}")]
    ApiReportedError {
        operation: &'static str,
        error: ServerResponseError,
    },
    /// Rejected locally, before anything was sent
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("{operation} failed: {source}")]
    OperationFailed {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

fn describe_connection(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("server responded with status code {status}"),
        None => "could not reach the server".to_owned(),
    }
}

/// Type alias for the [`Result`](std::result::Result) that is used in the crate's functions
pub type Result<T> = std::result::Result<T, Error>;

/// [Entity] is implemented for the raw shapes of mangadex entities that get deserialized
/// from the `data` member of a response
pub trait Entity {}
impl<T: Entity> Entity for Vec<T> {}

/// Serialized with [serde_qs] into `{base_url}{path}?{query}`. Empty queries add no `?`.
pub fn build_url(base_url: &str, path: &str, query: &impl Query) -> Result<String> {
    let query_data = serde_qs::to_string(query)
        .map_err(|e| Error::InvalidParameter(format!("failed to encode query: {e}")))?;

    Ok(if query_data.is_empty() {
        format!("{base_url}{path}")
    } else {
        format!("{base_url}{path}?{query_data}")
    })
}

/// Checks an id that goes into a url path. Mangadex ids are uuids, so anything beyond
/// ascii letters, digits and `-` is rejected rather than allowed to alter the path.
pub fn path_id<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        Ok(id)
    } else {
        Err(Error::InvalidParameter(format!("malformed {kind} id '{id}'")))
    }
}

/// Anything but 200 is a failure, and the body is not looked at
pub fn check_status(operation: &'static str, status: StatusCode) -> Result<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        tracing::error!("{operation}: failed to fetch, status code: {status}");

        Err(Error::ConnectionFailure {
            operation,
            status: Some(status.as_u16()),
            source: None,
        })
    }
}

/// Parses the body and turns a `"result": "error"` envelope into
/// [`ApiReportedError`](Error::ApiReportedError) carrying the first reported error
pub fn decode_envelope(operation: &'static str, body: &[u8]) -> Result<Value> {
    let mut resp: Value = serde_json::from_slice(body).map_err(|source| {
        tracing::error!("{operation}: failed to parse payload as json");

        Error::PayloadParseError { operation, source }
    })?;

    if resp.response_result_ok() {
        return Ok(resp);
    }

    let first = resp
        .get_mut("errors")
        .and_then(|errors| errors.get_mut(0))
        .map(Value::take)
        .filter(Value::is_object)
        .and_then(|error| serde_json::from_value::<ServerResponseError>(error).ok());

    match first {
        Some(error) => {
            tracing::error!("{operation}: error {error}");

            Err(Error::ApiReportedError { operation, error })
        }
        None => Err(Error::OperationFailed {
            operation,
            source: "server reported an error without details".into(),
        }),
    }
}

/// Deserializes the `data` member of an already decoded envelope
pub(crate) fn parse_respond_data<T>(operation: &'static str, mut resp: Value) -> Result<T>
where
    T: Entity + DeserializeOwned,
{
    let data = match resp.get_mut("data") {
        Some(data) => data.take(),
        None => {
            return Err(Error::OperationFailed {
                operation,
                source: "response carried no data".into(),
            })
        }
    };

    serde_json::from_value(data).map_err(|e| Error::OperationFailed {
        operation,
        source: Box::new(e),
    })
}

/// Like [parse_respond_data] for a `data` array, except that an item which does not decode
/// is skipped with a warning instead of failing the whole list
pub(crate) fn parse_respond_list<T>(operation: &'static str, mut resp: Value) -> Result<Vec<T>>
where
    T: Entity + DeserializeOwned,
{
    let items = match resp.get_mut("data").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(Error::OperationFailed {
                operation,
                source: "response carried no data list".into(),
            })
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value(item) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!("{operation}: skipping item {idx} that failed to decode: {e}");
                None
            }
        })
        .collect())
}

impl MangoClient {
    /// Renders the url of an endpoint below the configured base url
    pub(crate) fn endpoint(&self, path: &str, query: &impl Query) -> Result<String> {
        build_url(&self.config().base_url, path, query)
    }

    /// Lowest level function: one GET on a fresh session, then status and envelope checks.
    /// The session is dropped when this returns, whatever the outcome.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn query(&self, operation: &'static str, url: &str) -> Result<Value> {
        let session = self.session().map_err(|e| Error::OperationFailed {
            operation,
            source: Box::new(e),
        })?;

        let resp = match session.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!("{operation}: request failed: {e}");

                return Err(Error::ConnectionFailure {
                    operation,
                    status: None,
                    source: Some(e),
                });
            }
        };

        check_status(operation, resp.status())?;

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("{operation}: failed to read response body: {e}");

                return Err(Error::ConnectionFailure {
                    operation,
                    status: Some(StatusCode::OK.as_u16()),
                    source: Some(e.into()),
                });
            }
        };

        decode_envelope(operation, &body)
    }

    /// Searches manga by title. Returns at most `max_results` entries (5 by default) in
    /// the order the server ranked them.
    pub async fn search_manga(
        &self,
        title: &str,
        content_rating: ContentRatingFilter,
        max_results: Option<u32>,
    ) -> Result<Vec<MangaSummary>> {
        self.traced(self.fetch_manga_search(title, &content_rating, max_results))
            .await
    }

    /// Searches authors by name, 5 results by default
    pub async fn search_author(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<AuthorSummary>> {
        self.traced(self.fetch_author_search(name, max_results)).await
    }

    /// Searches scanlation groups by name, 5 results by default
    pub async fn search_group(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<GroupSummary>> {
        self.traced(self.fetch_group_search(name, max_results)).await
    }

    pub async fn random_manga(&self, content_rating: ContentRatingFilter) -> Result<MangaSummary> {
        self.traced(self.fetch_random_manga(&content_rating)).await
    }

    /// Filtered search, see [AdvancedSearch]. Tag names and the sort code are checked before
    /// any request is made. With an author name, the author is looked up first and any
    /// failure of that lookup (including no match) is reported as
    /// [`OperationFailed`](Error::OperationFailed).
    pub async fn advanced_search(&self, search: &AdvancedSearch) -> Result<Vec<MangaSummary>> {
        self.traced(self.fetch_advanced_search(search)).await
    }

    /// Lists chapters of a manga, newest volume and chapter first, 40 by default
    pub async fn list_chapters(
        &self,
        manga_id: &str,
        max_chapters: Option<u32>,
    ) -> Result<Vec<ChapterSummary>> {
        self.traced(self.fetch_chapters(manga_id, max_chapters)).await
    }

    /// Full quality page urls of a chapter in reading order
    pub async fn chapter_image_urls(&self, chapter_id: &str) -> Result<ChapterImageList> {
        self.chapter_image_urls_with_quality(chapter_id, ImageQuality::Data)
            .await
    }

    pub async fn chapter_image_urls_with_quality(
        &self,
        chapter_id: &str,
        quality: ImageQuality,
    ) -> Result<ChapterImageList> {
        self.traced(self.fetch_chapter_images(chapter_id, quality))
            .await
    }
}
