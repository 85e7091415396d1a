use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::cover::cover_urls;
use super::query_utils::{
    lenient, lenient_list, lenient_localized, sorting_for_code, ContentRating, ContentRatingFilter, DemographicFilter,
    EntityType, LocalizedString, Order, OrderOption, PublicationDemographic, Query, Relationship,
    SortingOptions,
};
use super::tag::{resolve_tag_names, Tag, TagFilter, TagsMode};
use super::{parse_respond_data, parse_respond_list, Entity, Error, Result};
use crate::MangoClient;

pub const DEFAULT_SEARCH_LIMIT: u32 = 5;
pub const DEFAULT_ADVANCED_SEARCH_LIMIT: u32 = 1;

/// Query for `GET /manga` by title
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MangaQuery<'a> {
    pub title: &'a str,
    pub limit: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_rating: Vec<ContentRating>,
    pub includes: Vec<EntityType>,
    pub order: SortingOptions,
}
impl Query for MangaQuery<'_> {}

impl<'a> MangaQuery<'a> {
    pub fn new(title: &'a str, content_rating: &ContentRatingFilter, limit: u32) -> Self {
        Self {
            title,
            limit,
            content_rating: content_rating.ratings(),
            includes: vec![EntityType::CoverArt],
            order: SortingOptions::from([(OrderOption::Relevance, Order::Desc)]),
        }
    }
}

/// Query for `GET /manga/random`
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RandomMangaQuery {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_rating: Vec<ContentRating>,
    pub includes: Vec<EntityType>,
}
impl Query for RandomMangaQuery {}

impl RandomMangaQuery {
    pub fn new(content_rating: &ContentRatingFilter) -> Self {
        Self {
            content_rating: content_rating.ratings(),
            includes: vec![EntityType::Artist, EntityType::Author, EntityType::CoverArt],
        }
    }
}

/// Parameters of [`advanced_search`](MangoClient::advanced_search).
///
/// `sort` takes the codes below; 1 or nothing leaves the order to the server:
///
/// | code | order |
/// |------|-------|
/// | 1 | relevance |
/// | 2, 3 | latest uploaded chapter desc, asc |
/// | 4, 5 | title asc, desc |
/// | 6, 7 | rating desc, asc |
/// | 8, 9 | followed count desc, asc |
/// | 10, 11 | created at desc, asc |
/// | 12, 13 | year asc, desc |
#[derive(Builder, Debug, Clone)]
pub struct AdvancedSearch {
    /// Free text matched against titles
    #[builder(into)]
    pub query: Option<String>,
    /// Tag names from any group, all of which a result must carry
    #[builder(default)]
    pub tags: Vec<String>,
    #[builder(default)]
    pub tag_filter: TagFilter,
    /// Resolved to an author id with a separate request before searching
    #[builder(into)]
    pub author: Option<String>,
    #[builder(default = DEFAULT_ADVANCED_SEARCH_LIMIT)]
    pub max_results: u32,
    #[builder(default)]
    pub content_rating: ContentRatingFilter,
    #[builder(default)]
    pub demographic: DemographicFilter,
    #[builder(default = true)]
    pub has_available_chapters: bool,
    pub sort: Option<u8>,
}

impl Default for AdvancedSearch {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Query for `GET /manga` with filters
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedSearchQuery<'a> {
    pub limit: u32,
    pub offset: u32,
    pub includes: Vec<EntityType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content_rating: Vec<ContentRating>,
    pub has_available_chapters: bool,
    pub included_tags_mode: TagsMode,
    pub excluded_tags_mode: TagsMode,
    pub publication_demographic: Vec<PublicationDemographic>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub included_tags: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "SortingOptions::is_empty")]
    pub order: SortingOptions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
}
impl Query for AdvancedSearchQuery<'_> {}

impl<'a> AdvancedSearchQuery<'a> {
    /// Resolves tags and the sort code. Fails with
    /// [`InvalidParameter`](Error::InvalidParameter) on anything the tables do not know.
    pub fn new(search: &'a AdvancedSearch, author_id: Option<String>) -> Result<Self> {
        let mut included_tags = resolve_tag_names(&search.tags)?;
        included_tags.extend(search.tag_filter.resolve()?);

        Ok(Self {
            limit: search.max_results,
            offset: 0,
            includes: vec![EntityType::CoverArt],
            content_rating: search.content_rating.ratings(),
            has_available_chapters: search.has_available_chapters,
            included_tags_mode: TagsMode::And,
            excluded_tags_mode: TagsMode::Or,
            publication_demographic: search.demographic.demographics(),
            included_tags,
            title: search.query.as_deref().filter(|query| !query.is_empty()),
            order: sorting_for_code(search.sort)?,
            authors: author_id.into_iter().collect(),
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct MangaAttributes {
    #[serde(deserialize_with = "lenient_localized")]
    title: LocalizedString,
    #[serde(deserialize_with = "lenient_list")]
    alt_titles: Vec<Value>,
    #[serde(deserialize_with = "lenient_localized")]
    description: LocalizedString,
    #[serde(deserialize_with = "lenient")]
    year: Option<i32>,
    #[serde(deserialize_with = "lenient_list")]
    tags: Vec<Tag>,
    #[serde(deserialize_with = "lenient")]
    status: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct MangaData {
    id: String,
    #[serde(default, deserialize_with = "lenient")]
    attributes: MangaAttributes,
    #[serde(default, deserialize_with = "lenient_list")]
    relationships: Vec<Relationship>,
}

impl Entity for MangaData {}

/// Flattened manga as returned by the search operations. Texts are the english ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MangaSummary {
    pub id: String,
    /// `"Unknown Title"` when there is no english title
    pub title: String,
    pub alt_titles: Vec<String>,
    pub description: String,
    pub year: Option<i32>,
    pub tags: Vec<String>,
    /// `"Unknown"` when the server sent none
    pub status: String,
    pub cover_small_url: Option<String>,
    pub cover_large_url: Option<String>,
}

impl MangaSummary {
    pub(crate) fn from_data(data: MangaData, cover_base_url: &str) -> Self {
        let covers = cover_urls(cover_base_url, &data.id, &data.relationships);
        let MangaAttributes {
            mut title,
            alt_titles,
            mut description,
            year,
            tags,
            status,
        } = data.attributes;

        Self {
            title: title
                .remove("en")
                .unwrap_or_else(|| "Unknown Title".to_owned()),
            alt_titles: alt_titles
                .iter()
                .filter_map(|alt| alt.get("en").and_then(Value::as_str))
                .map(str::to_owned)
                .collect(),
            description: description.remove("en").unwrap_or_default(),
            year,
            tags: tags
                .into_iter()
                .filter_map(|mut tag| tag.attributes.name.remove("en"))
                .collect(),
            status: status.unwrap_or_else(|| "Unknown".to_owned()),
            cover_small_url: covers.as_ref().map(|urls| urls.small.clone()),
            cover_large_url: covers.map(|urls| urls.large),
            id: data.id,
        }
    }
}

impl MangoClient {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_manga_search(
        &self,
        title: &str,
        content_rating: &ContentRatingFilter,
        max_results: Option<u32>,
    ) -> Result<Vec<MangaSummary>> {
        const OPERATION: &str = "search_manga";

        let limit = max_results.unwrap_or(DEFAULT_SEARCH_LIMIT);
        tracing::info!("searching for manga with title: {title} (limit: {limit})");

        let url = self.endpoint("/manga", &MangaQuery::new(title, content_rating, limit))?;
        let resp = self.query(OPERATION, &url).await?;

        let found = self.shape_manga_list(OPERATION, resp)?;
        tracing::info!("found {} manga entries", found.len());

        Ok(found)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_random_manga(
        &self,
        content_rating: &ContentRatingFilter,
    ) -> Result<MangaSummary> {
        const OPERATION: &str = "random_manga";

        tracing::info!("fetching a random manga");

        let url = self.endpoint("/manga/random", &RandomMangaQuery::new(content_rating))?;
        let resp = self.query(OPERATION, &url).await?;

        let data: MangaData = parse_respond_data(OPERATION, resp)?;
        let manga = MangaSummary::from_data(data, self.cover_base_url());
        tracing::info!("fetched random manga {}", manga.id);

        Ok(manga)
    }

    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_advanced_search(
        &self,
        search: &AdvancedSearch,
    ) -> Result<Vec<MangaSummary>> {
        const OPERATION: &str = "advanced_search";

        // Validates tags and sort before the author lookup goes out
        AdvancedSearchQuery::new(search, None)?;

        let author_id = match &search.author {
            Some(name) => match self.resolve_author_id(name).await {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::error!("{OPERATION}: failed to resolve author '{name}': {e}");

                    return Err(Error::OperationFailed {
                        operation: OPERATION,
                        source: Box::new(e),
                    });
                }
            },
            None => None,
        };

        let url = self.endpoint("/manga", &AdvancedSearchQuery::new(search, author_id)?)?;
        let resp = self.query(OPERATION, &url).await?;

        let found = self.shape_manga_list(OPERATION, resp)?;
        tracing::info!("found {} manga entries", found.len());

        Ok(found)
    }

    fn shape_manga_list(&self, operation: &'static str, resp: Value) -> Result<Vec<MangaSummary>> {
        let data: Vec<MangaData> = parse_respond_list(operation, resp)?;

        Ok(data
            .into_iter()
            .map(|manga| MangaSummary::from_data(manga, self.cover_base_url()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::build_url;
    use crate::requests::tag::{GENRE_TAGS, THEME_TAGS};

    fn manga_json() -> Value {
        serde_json::json!({
            "id": "a77742b1-befd-49a4-bff5-1ad4e6b0ef7b",
            "type": "manga",
            "attributes": {
                "title": {"en": "Chainsaw Man"},
                "altTitles": [{"ja": "チェンソーマン"}, {"en": "Chainsawman"}, {"en": "CSM"}],
                "description": {"en": "Denji is a teenage boy", "ru": "..."},
                "year": 2018,
                "status": "ongoing",
                "tags": [
                    {"id": "t1", "type": "tag", "attributes": {"name": {"en": "Action"}, "group": "genre"}},
                    {"id": "t2", "type": "tag", "attributes": {"name": {"en": "Comedy"}, "group": "genre"}}
                ]
            },
            "relationships": [
                {"id": "au", "type": "author"},
                {"id": "c1", "type": "cover_art", "attributes": {"fileName": "first.jpg"}},
                {"id": "c2", "type": "cover_art", "attributes": {"fileName": "second.jpg"}}
            ]
        })
    }

    fn shape(value: Value) -> MangaSummary {
        MangaSummary::from_data(serde_json::from_value(value).unwrap(), "https://covers")
    }

    #[test]
    fn shapes_full_entry() {
        let manga = shape(manga_json());

        assert_eq!(manga.id, "a77742b1-befd-49a4-bff5-1ad4e6b0ef7b");
        assert_eq!(manga.title, "Chainsaw Man");
        assert_eq!(manga.alt_titles, vec!["Chainsawman", "CSM"]);
        assert_eq!(manga.description, "Denji is a teenage boy");
        assert_eq!(manga.year, Some(2018));
        assert_eq!(manga.tags, vec!["Action", "Comedy"]);
        assert_eq!(manga.status, "ongoing");
        assert_eq!(
            manga.cover_large_url.as_deref(),
            Some("https://covers/a77742b1-befd-49a4-bff5-1ad4e6b0ef7b/first.jpg")
        );
        assert_eq!(
            manga.cover_small_url.as_deref(),
            Some("https://covers/a77742b1-befd-49a4-bff5-1ad4e6b0ef7b/first.jpg.256.jpg")
        );
    }

    #[test]
    fn missing_fields_use_sentinels() {
        let manga = shape(serde_json::json!({
            "id": "m",
            "attributes": {
                "title": {"ja": "タイトル"},
                "description": [],
                "year": null
            },
            "relationships": []
        }));

        assert_eq!(manga.title, "Unknown Title");
        assert!(manga.alt_titles.is_empty());
        assert_eq!(manga.description, "");
        assert_eq!(manga.year, None);
        assert_eq!(manga.status, "Unknown");
        assert_eq!(manga.cover_small_url, None);
    }

    #[test]
    fn malformed_nested_fields_use_sentinels() {
        let manga = shape(serde_json::json!({
            "id": "m",
            "attributes": {
                "title": {"en": "T"},
                "altTitles": null,
                "tags": null,
                "year": "2018",
                "status": 3
            },
            "relationships": null
        }));

        assert_eq!(manga.title, "T");
        assert!(manga.alt_titles.is_empty());
        assert!(manga.tags.is_empty());
        assert_eq!(manga.year, None);
        assert_eq!(manga.status, "Unknown");
        assert_eq!(manga.cover_large_url, None);

        let manga = shape(serde_json::json!({"id": "m", "attributes": null}));
        assert_eq!(manga.title, "Unknown Title");
    }

    #[test]
    fn unknown_tag_group_keeps_the_tag() {
        let manga = shape(serde_json::json!({
            "id": "m",
            "attributes": {
                "tags": [
                    {"id": "t1", "attributes": {"name": {"en": "Action"}, "group": "new_group"}},
                    "not a tag",
                    {"id": "t2", "attributes": {"name": {"en": "Comedy"}, "group": "genre"}}
                ]
            }
        }));

        assert_eq!(manga.tags, vec!["Action", "Comedy"]);
    }

    #[test]
    fn one_broken_entry_keeps_the_others() {
        let resp = serde_json::json!({
            "result": "ok",
            "data": [manga_json(), {"attributes": {}}, {"id": "second", "attributes": {"altTitles": null}}]
        });

        let client = MangoClient::new().unwrap();
        let found = client.shape_manga_list("search_manga", resp).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].title, "Chainsaw Man");
        assert_eq!(found[1].id, "second");
    }

    #[test]
    fn absent_optionals_are_serialized_not_omitted() {
        let manga = shape(serde_json::json!({"id": "m"}));
        let json = serde_json::to_value(&manga).unwrap();

        assert_eq!(json["year"], Value::Null);
        assert!(json.as_object().unwrap().contains_key("year"));
        assert_eq!(json["altTitles"], serde_json::json!([]));
        assert_eq!(json["description"], "");
        assert!(json.as_object().unwrap().contains_key("coverSmallUrl"));
    }

    #[test]
    fn title_query_string() {
        let query = MangaQuery::new("Chainsaw Man", &ContentRatingFilter::All, 5);

        assert_eq!(
            build_url("https://api.mangadex.org", "/manga", &query).unwrap(),
            "https://api.mangadex.org/manga?title=Chainsaw+Man&limit=5\
             &contentRating[0]=safe&contentRating[1]=suggestive&contentRating[2]=erotica\
             &includes[0]=cover_art&order[relevance]=desc"
        );
    }

    #[test]
    fn unrecognized_rating_is_left_out() {
        let query = MangaQuery::new("x", &ContentRatingFilter::from("everything"), 5);
        let url = build_url("", "/manga", &query).unwrap();
        assert!(!url.contains("contentRating"));

        let url = build_url("", "/manga/random", &RandomMangaQuery::new(&"nope".into())).unwrap();
        assert_eq!(
            url,
            "/manga/random?includes[0]=artist&includes[1]=author&includes[2]=cover_art"
        );
    }

    #[test]
    fn advanced_query_string() {
        let search = AdvancedSearch::builder()
            .query("One Piece")
            .tags(vec!["Action".to_owned()])
            .tag_filter(TagFilter::builder().theme(1).build())
            .max_results(3)
            .content_rating(ContentRatingFilter::Safe)
            .demographic(DemographicFilter::Shounen)
            .sort(8)
            .build();

        let query = AdvancedSearchQuery::new(&search, Some("author-id".to_owned())).unwrap();
        let url = build_url("", "/manga", &query).unwrap();

        assert_eq!(
            url,
            format!(
                "/manga?limit=3&offset=0&includes[0]=cover_art&contentRating[0]=safe\
                 &hasAvailableChapters=true&includedTagsMode=AND&excludedTagsMode=OR\
                 &publicationDemographic[0]=shounen&includedTags[0]={}&includedTags[1]={}\
                 &title=One+Piece&order[followedCount]=desc&authors[0]=author-id",
                GENRE_TAGS[0].1, THEME_TAGS[0].1
            )
        );
    }

    #[test]
    fn advanced_defaults() {
        let search = AdvancedSearch::default();
        assert_eq!(search.max_results, 1);
        assert!(search.has_available_chapters);

        let url = build_url("", "/manga", &AdvancedSearchQuery::new(&search, None).unwrap()).unwrap();
        assert!(url.contains("publicationDemographic[0]=none"));
        assert!(!url.contains("order["));
        assert!(!url.contains("title="));
        assert!(!url.contains("authors"));
    }

    #[test]
    fn every_sort_code_yields_at_most_one_order_clause() {
        for code in 1..=13u8 {
            let search = AdvancedSearch::builder().sort(code).build();
            let url = build_url("", "/manga", &AdvancedSearchQuery::new(&search, None).unwrap())
                .unwrap();
            let clauses = url.matches("order[").count();

            assert_eq!(clauses, usize::from(code != 1), "code {code}");
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let search = AdvancedSearch::builder()
            .tags(vec!["Definitely Not A Tag".to_owned()])
            .build();

        assert!(matches!(
            AdvancedSearchQuery::new(&search, None),
            Err(Error::InvalidParameter(_))
        ));
    }
}
