use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query_utils::{
    first_relationship, lenient, lenient_list, ContentRating, EntityType, Order, OrderOption, Query, Relationship,
    SortingOptions,
};
use super::{parse_respond_list, path_id, Entity, Error, Result};
use crate::MangoClient;

pub const DEFAULT_CHAPTER_LIMIT: u32 = 40;

const MISSING: &str = "None";
const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";

/// Query for `GET /manga/{id}/feed`. The feed is not filtered by rating, every rating is
/// requested explicitly.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MangaFeedQuery {
    pub limit: u32,
    pub includes: Vec<EntityType>,
    pub order: SortingOptions,
    pub offset: u32,
    pub content_rating: Vec<ContentRating>,
}
impl Query for MangaFeedQuery {}

impl MangaFeedQuery {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            includes: vec![EntityType::ScanlationGroup, EntityType::User],
            order: SortingOptions::from([
                (OrderOption::Volume, Order::Desc),
                (OrderOption::Chapter, Order::Desc),
            ]),
            offset: 0,
            content_rating: vec![
                ContentRating::Safe,
                ContentRating::Suggestive,
                ContentRating::Erotica,
                ContentRating::Pornographic,
            ],
        }
    }
}

#[derive(Serialize, Debug)]
struct AtHomeQuery {}
impl Query for AtHomeQuery {}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ChapterAttributes {
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    volume: Option<String>,
    #[serde(deserialize_with = "lenient")]
    chapter: Option<String>,
    #[serde(deserialize_with = "lenient")]
    translated_language: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ChapterData {
    id: String,
    #[serde(default, deserialize_with = "lenient")]
    attributes: ChapterAttributes,
    #[serde(default, deserialize_with = "lenient_list")]
    relationships: Vec<Relationship>,
}

impl Entity for ChapterData {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: String,
    /// `"None"` when the chapter has no number
    pub chapter_number: String,
    /// `"None"` when the chapter is not part of a volume
    pub volume_number: String,
    pub translated_language: String,
    pub title: String,
    /// Name of the first credited scanlation group
    pub publisher_name: Option<String>,
}

impl From<ChapterData> for ChapterSummary {
    fn from(data: ChapterData) -> Self {
        let publisher_name = first_relationship(&data.relationships, EntityType::ScanlationGroup)
            .map(|group| {
                group
                    .attributes
                    .as_ref()
                    .and_then(|attributes| attributes.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_PUBLISHER)
                    .to_owned()
            });

        let attributes = data.attributes;
        let or_missing = |value: Option<String>| value.unwrap_or_else(|| MISSING.to_owned());

        Self {
            id: data.id,
            chapter_number: or_missing(attributes.chapter),
            volume_number: or_missing(attributes.volume),
            translated_language: or_missing(attributes.translated_language),
            title: attributes
                .title
                .unwrap_or_else(|| UNKNOWN_TITLE.to_owned()),
            publisher_name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageQuality {
    /// Original uploads
    #[default]
    Data,
    /// Compressed pages
    DataSaver,
}

impl ImageQuality {
    fn path_segment(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::DataSaver => "data-saver",
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ChapterMeta {
    pub hash: String,
    pub data: Vec<String>,
    pub data_saver: Vec<String>,
}

/// Answer of the at-home endpoint: which server to load the pages of a chapter from
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ChapterDownloadMeta {
    pub base_url: String,
    pub chapter: ChapterMeta,
}

/// Page urls of a chapter in reading order
pub type ChapterImageList = Vec<String>;

impl ChapterDownloadMeta {
    pub fn page_urls(&self, quality: ImageQuality) -> ChapterImageList {
        let pages = match quality {
            ImageQuality::Data => &self.chapter.data,
            ImageQuality::DataSaver => &self.chapter.data_saver,
        };
        let segment = quality.path_segment();

        pages
            .iter()
            .map(|page| format!("{}/{segment}/{}/{page}", self.base_url, self.chapter.hash))
            .collect()
    }
}

impl MangoClient {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_chapters(
        &self,
        manga_id: &str,
        max_chapters: Option<u32>,
    ) -> Result<Vec<ChapterSummary>> {
        const OPERATION: &str = "list_chapters";

        let limit = max_chapters.unwrap_or(DEFAULT_CHAPTER_LIMIT);
        tracing::info!("fetching chapters for manga id: {manga_id} (limit: {limit})");

        let manga_id = path_id("manga", manga_id)?;
        let url = self.endpoint(&format!("/manga/{manga_id}/feed"), &MangaFeedQuery::new(limit))?;
        let resp = self.query(OPERATION, &url).await?;

        let data: Vec<ChapterData> = parse_respond_list(OPERATION, resp)?;
        let chapters: Vec<ChapterSummary> = data.into_iter().map(ChapterSummary::from).collect();
        tracing::info!("fetched {} chapters", chapters.len());

        Ok(chapters)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_chapter_images(
        &self,
        chapter_id: &str,
        quality: ImageQuality,
    ) -> Result<ChapterImageList> {
        const OPERATION: &str = "chapter_image_urls";

        let chapter_id = path_id("chapter", chapter_id)?;
        let url = self.endpoint(&format!("/at-home/server/{chapter_id}"), &AtHomeQuery {})?;
        let resp = self.query(OPERATION, &url).await?;

        let meta: ChapterDownloadMeta =
            serde_json::from_value(resp).map_err(|e| Error::OperationFailed {
                operation: OPERATION,
                source: Box::new(e),
            })?;

        let pages = meta.page_urls(quality);
        tracing::debug!("chapter {chapter_id} has {} pages", pages.len());

        Ok(pages)
    }
}
