use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::manga::DEFAULT_SEARCH_LIMIT;
use super::query_utils::{lenient, lenient_list, social_links, EntityType, Query, SocialLinks};
use super::{parse_respond_list, Entity, Result};
use crate::MangoClient;

use std::collections::HashMap;

/// Group attributes that are reported as social media
pub const GROUP_SOCIAL_FIELDS: [&str; 7] = [
    "website",
    "ircServer",
    "ircChannel",
    "discord",
    "contactEmail",
    "twitter",
    "mangaUpdates",
];

/// Query for `GET /group`
#[derive(Serialize, Debug, Clone)]
pub struct GroupQuery<'a> {
    pub name: &'a str,
    pub limit: u32,
    pub includes: Vec<EntityType>,
}
impl Query for GroupQuery<'_> {}

impl<'a> GroupQuery<'a> {
    pub fn new(name: &'a str, limit: u32) -> Self {
        Self {
            name,
            limit,
            includes: vec![EntityType::Leader],
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct ScanlationGroupAttributes {
    #[serde(deserialize_with = "lenient")]
    name: String,
    /// One single-entry object per alternative name, keyed by language
    #[serde(deserialize_with = "lenient_list")]
    alt_names: Vec<Map<String, Value>>,
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ScanlationGroupData {
    id: String,
    #[serde(default, deserialize_with = "lenient")]
    attributes: ScanlationGroupAttributes,
}

impl Entity for ScanlationGroupData {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub alt_names: Vec<String>,
    pub social_media: SocialLinks,
}

impl From<ScanlationGroupData> for GroupSummary {
    fn from(data: ScanlationGroupData) -> Self {
        let attributes = data.attributes;

        let alt_names = attributes
            .alt_names
            .into_iter()
            .flat_map(|names| names.into_iter())
            .filter_map(|(_, name)| match name {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect();

        Self {
            social_media: social_links(&GROUP_SOCIAL_FIELDS, &attributes.rest),
            id: data.id,
            name: attributes.name,
            alt_names,
        }
    }
}

impl MangoClient {
    #[tracing::instrument(skip(self))]
    pub(crate) async fn fetch_group_search(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<GroupSummary>> {
        const OPERATION: &str = "search_group";

        let limit = max_results.unwrap_or(DEFAULT_SEARCH_LIMIT);
        tracing::info!("searching for scanlation group with name: {name} (limit: {limit})");

        let url = self.endpoint("/group", &GroupQuery::new(name, limit))?;
        let resp = self.query(OPERATION, &url).await?;

        let data: Vec<ScanlationGroupData> = parse_respond_list(OPERATION, resp)?;

        Ok(data.into_iter().map(GroupSummary::from).collect())
    }
}
