//! Cover art as it arrives in the `cover_art` relationship of a manga.
//!
//! The meaning of the attributes can be found at <https://api.mangadex.org/docs/03-manga/covers/>

use serde::{Deserialize, Serialize};

use super::query_utils::{first_relationship, EntityType, Relationship};

/// Used for deserialization of the relationship attributes
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CoverArtAttributes {
    pub file_name: String,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverUrls {
    /// 256px wide thumbnail
    pub small: String,
    pub large: String,
}

/// Builds the cover urls from the first `cover_art` relationship. A first cover without a
/// file name yields `None` even if a later one has it.
pub fn cover_urls(
    cover_base_url: &str,
    manga_id: &str,
    relationships: &[Relationship],
) -> Option<CoverUrls> {
    let cover = first_relationship(relationships, EntityType::CoverArt)?;
    let attributes =
        serde_json::from_value::<CoverArtAttributes>(cover.attributes.clone()?).ok()?;

    let large = format!("{cover_base_url}/{manga_id}/{}", attributes.file_name);

    Some(CoverUrls {
        small: format!("{large}.256.jpg"),
        large,
    })
}
