use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Error, Result};

use std::collections::{BTreeMap, HashMap};

/// Marker for every struct that is sent to the server as a query string
pub trait Query: Serialize + std::fmt::Debug {}

/// Language code to text, as mangadex sends titles, descriptions and biographies
pub type LocalizedString = HashMap<String, String>;

/// Mangadex serializes empty localized objects as `[]` and sometimes sends `null`,
/// both of which are read as an empty map here
pub(crate) fn lenient_localized<'de, D>(deserializer: D) -> std::result::Result<LocalizedString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Value = Deserialize::deserialize(deserializer)?;

    Ok(match raw {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(lang, text)| match text {
                Value::String(text) => Some((lang, text)),
                _ => None,
            })
            .collect(),
        _ => LocalizedString::new(),
    })
}

/// Reads a value of the wrong type, `null` included, as the default
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw: Value = Deserialize::deserialize(deserializer)?;

    Ok(serde_json::from_value(raw).unwrap_or_default())
}

/// Anything but an array reads as empty. Items that do not decode are skipped, the rest
/// keep their order.
pub(crate) fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Value = Deserialize::deserialize(deserializer)?;

    Ok(match raw {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Platform name to link or handle
pub type SocialLinks = BTreeMap<String, String>;

/// Collects the listed attributes that hold a usable value. Missing members, `null`,
/// the literal `"None"` and empty strings are left out.
pub(crate) fn social_links(fields: &[&str], attributes: &HashMap<String, Value>) -> SocialLinks {
    fields
        .iter()
        .filter_map(|&field| match attributes.get(field) {
            Some(Value::String(value)) if !value.is_empty() && value != "None" => {
                Some((field.to_owned(), value.clone()))
            }
            _ => None,
        })
        .collect()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Manga,
    CoverArt,
    Chapter,
    Author,
    ApiClient,
    ReportReason,
    ScanlationGroup,
    User,
    Tag,
    Artist,
    Creator,
    Leader,
    Member,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub related: Option<String>,
    #[serde(default)]
    pub attributes: Option<Value>,
}

/// Returns the first relationship of the given type. Later entries of the same type
/// are never considered.
pub fn first_relationship(
    relationships: &[Relationship],
    entity_type: EntityType,
) -> Option<&Relationship> {
    relationships
        .iter()
        .find(|relationship| relationship.entity_type == entity_type)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OrderOption {
    Title,
    Year,
    CreatedAt,
    UpdatedAt,
    LatestUploadedChapter,
    FollowedCount,
    Rating,
    Relevance,
    Volume,
    Chapter,
}

/// Ordered so that the query string is stable: `BTreeMap` walks keys in declaration order
/// of [OrderOption]
pub type SortingOptions = BTreeMap<OrderOption, Order>;

/// Sort codes accepted by advanced search, indexed by `code - 1`
const SORT_TABLE: [(OrderOption, Order); 13] = [
    (OrderOption::Relevance, Order::Desc),
    (OrderOption::LatestUploadedChapter, Order::Desc),
    (OrderOption::LatestUploadedChapter, Order::Asc),
    (OrderOption::Title, Order::Asc),
    (OrderOption::Title, Order::Desc),
    (OrderOption::Rating, Order::Desc),
    (OrderOption::Rating, Order::Asc),
    (OrderOption::FollowedCount, Order::Desc),
    (OrderOption::FollowedCount, Order::Asc),
    (OrderOption::CreatedAt, Order::Desc),
    (OrderOption::CreatedAt, Order::Asc),
    (OrderOption::Year, Order::Asc),
    (OrderOption::Year, Order::Desc),
];

/// Looks up a sort code (1 to 13) in the fixed table
pub fn sort_option(code: u8) -> Result<(OrderOption, Order)> {
    code.checked_sub(1)
        .and_then(|idx| SORT_TABLE.get(usize::from(idx)))
        .copied()
        .ok_or_else(|| Error::InvalidParameter(format!("unknown sort code {code}, expected 1-13")))
}

/// Builds the `order[...]` clause for a sort code. Relevance (code 1) and no code at all
/// leave the ordering to the server, so they produce an empty map.
pub fn sorting_for_code(code: Option<u8>) -> Result<SortingOptions> {
    let mut sorting = SortingOptions::new();

    match code {
        None | Some(1) => {}
        Some(code) => {
            let (option, order) = sort_option(code)?;
            sorting.insert(option, order);
        }
    }

    Ok(sorting)
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    Safe,
    Suggestive,
    Erotica,
    Pornographic,
}

/// Content rating selection for searches.
///
/// Names outside `all`, `safe`, `suggestive` and `erotica` become
/// [`Unrecognized`](ContentRatingFilter::Unrecognized), which adds no rating clause and
/// leaves the choice to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentRatingFilter {
    #[default]
    All,
    Safe,
    Suggestive,
    Erotica,
    Unrecognized(String),
}

impl ContentRatingFilter {
    pub fn ratings(&self) -> Vec<ContentRating> {
        match self {
            Self::All => vec![
                ContentRating::Safe,
                ContentRating::Suggestive,
                ContentRating::Erotica,
            ],
            Self::Safe => vec![ContentRating::Safe],
            Self::Suggestive => vec![ContentRating::Suggestive],
            Self::Erotica => vec![ContentRating::Erotica],
            Self::Unrecognized(_) => Vec::new(),
        }
    }
}

impl From<&str> for ContentRatingFilter {
    fn from(name: &str) -> Self {
        match name {
            "all" => Self::All,
            "safe" => Self::Safe,
            "suggestive" => Self::Suggestive,
            "erotica" => Self::Erotica,
            other => Self::Unrecognized(other.to_owned()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublicationDemographic {
    Shounen,
    Shoujo,
    Josei,
    Seinen,
    #[serde(rename = "none")]
    Unspecified,
}

/// Demographic selection for advanced search. Absence means titles without a demographic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DemographicFilter {
    #[default]
    None,
    All,
    Shoujo,
    Shounen,
    Seinen,
    Josei,
}

impl DemographicFilter {
    pub fn demographics(self) -> Vec<PublicationDemographic> {
        match self {
            Self::None => vec![PublicationDemographic::Unspecified],
            Self::All => vec![
                PublicationDemographic::Shoujo,
                PublicationDemographic::Seinen,
                PublicationDemographic::Shounen,
                PublicationDemographic::Josei,
                PublicationDemographic::Unspecified,
            ],
            Self::Shoujo => vec![PublicationDemographic::Shoujo],
            Self::Shounen => vec![PublicationDemographic::Shounen],
            Self::Seinen => vec![PublicationDemographic::Seinen],
            Self::Josei => vec![PublicationDemographic::Josei],
        }
    }
}

impl std::str::FromStr for DemographicFilter {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "none" => Ok(Self::None),
            "all" => Ok(Self::All),
            "shoujo" => Ok(Self::Shoujo),
            "shounen" => Ok(Self::Shounen),
            "seinen" => Ok(Self::Seinen),
            "josei" => Ok(Self::Josei),
            other => Err(Error::InvalidParameter(format!(
                "unknown demographic '{other}'"
            ))),
        }
    }
}

pub trait ResponseResultOk {
    fn response_result_ok(&self) -> bool;
}

impl ResponseResultOk for Value {
    /// Envelopes without a `result` member are treated as successful; only an explicit
    /// `"error"` marks a failure
    fn response_result_ok(&self) -> bool {
        !matches!(self.get("result").and_then(Value::as_str), Some("error"))
    }
}
