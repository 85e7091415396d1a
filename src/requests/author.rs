use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::manga::DEFAULT_SEARCH_LIMIT;
use super::query_utils::{lenient, lenient_localized, social_links, LocalizedString, Query, SocialLinks};
use super::{parse_respond_list, Entity, Error, Result};
use crate::MangoClient;

use std::collections::HashMap;

/// Author attributes that are reported as social media, in the order they are checked
pub const AUTHOR_SOCIAL_FIELDS: [&str; 14] = [
    "twitter",
    "pixiv",
    "melonBook",
    "fanBox",
    "booth",
    "namicomi",
    "nicoVideo",
    "skeb",
    "fantia",
    "tumblr",
    "youtube",
    "weibo",
    "naver",
    "website",
];

/// Query for `GET /author`
#[derive(Serialize, Debug, Clone)]
pub struct AuthorQuery<'a> {
    pub name: &'a str,
    pub limit: u32,
}
impl Query for AuthorQuery<'_> {}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct AuthorAttributes {
    #[serde(deserialize_with = "lenient")]
    name: String,
    #[serde(deserialize_with = "lenient_localized")]
    biography: LocalizedString,
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct AuthorData {
    id: String,
    #[serde(default, deserialize_with = "lenient")]
    attributes: AuthorAttributes,
}

impl Entity for AuthorData {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    /// Language code to biography, empty when the author has none
    pub biography: LocalizedString,
    pub social_media: SocialLinks,
}

impl From<AuthorData> for AuthorSummary {
    fn from(data: AuthorData) -> Self {
        Self {
            social_media: social_links(&AUTHOR_SOCIAL_FIELDS, &data.attributes.rest),
            id: data.id,
            name: data.attributes.name,
            biography: data.attributes.biography,
        }
    }
}

impl MangoClient {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_author_search(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<AuthorSummary>> {
        const OPERATION: &str = "search_author";

        let limit = max_results.unwrap_or(DEFAULT_SEARCH_LIMIT);
        tracing::info!("searching for author with name: {name} (limit: {limit})");

        let url = self.endpoint("/author", &AuthorQuery { name, limit })?;
        let resp = self.query(OPERATION, &url).await?;

        let data: Vec<AuthorData> = parse_respond_list(OPERATION, resp)?;
        let found: Vec<AuthorSummary> = data.into_iter().map(AuthorSummary::from).collect();
        tracing::info!("found {} author entries", found.len());

        Ok(found)
    }

    /// Id of the best match for `name`
    pub(crate) async fn resolve_author_id(&self, name: &str) -> Result<String> {
        const OPERATION: &str = "resolve_author";

        match self.fetch_author_search(name, Some(1)).await?.into_iter().next() {
            Some(author) => Ok(author.id),
            None => Err(Error::OperationFailed {
                operation: OPERATION,
                source: format!("no author found matching '{name}'").into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::build_url;

    #[test]
    fn shapes_author() {
        let data: AuthorData = serde_json::from_value(serde_json::json!({
            "id": "f5ba2b1c-9ef2-4d3f-b4a4-c0bf23ad5c44",
            "type": "author",
            "attributes": {
                "name": "Fujimoto Tatsuki",
                "imageUrl": null,
                "biography": {"en": "Mangaka from Akita"},
                "twitter": "https://twitter.com/tatsukifujimoto",
                "pixiv": null,
                "website": "None",
                "youtube": "",
                "version": 3
            }
        }))
        .unwrap();

        let author = AuthorSummary::from(data);
        assert_eq!(author.id, "f5ba2b1c-9ef2-4d3f-b4a4-c0bf23ad5c44");
        assert_eq!(author.name, "Fujimoto Tatsuki");
        assert_eq!(author.biography.get("en").map(String::as_str), Some("Mangaka from Akita"));
        assert_eq!(author.social_media.len(), 1);
        assert_eq!(
            author.social_media.get("twitter").map(String::as_str),
            Some("https://twitter.com/tatsukifujimoto")
        );
    }

    #[test]
    fn empty_biography_array() {
        let data: AuthorData = serde_json::from_value(serde_json::json!({
            "id": "a",
            "attributes": {"name": "Oda Eiichiro", "biography": []}
        }))
        .unwrap();

        let author = AuthorSummary::from(data);
        assert!(author.biography.is_empty());
        assert!(author.social_media.is_empty());
    }

    #[test]
    fn null_name_and_attributes() {
        let data: AuthorData =
            serde_json::from_value(serde_json::json!({"id": "a", "attributes": {"name": null}}))
                .unwrap();
        assert_eq!(AuthorSummary::from(data).name, "");

        let data: AuthorData =
            serde_json::from_value(serde_json::json!({"id": "b", "attributes": null})).unwrap();
        let author = AuthorSummary::from(data);
        assert_eq!(author.id, "b");
        assert!(author.biography.is_empty());
    }

    #[test]
    fn query_string() {
        let url = build_url("", "/author", &AuthorQuery { name: "Oda Eiichiro", limit: 5 }).unwrap();
        assert_eq!(url, "/author?name=Oda+Eiichiro&limit=5");
    }
}
