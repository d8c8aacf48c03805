use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriviaItem {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(rename = "genres", default, deserialize_with = "null_as_empty")]
    pub categories: BTreeSet<String>,
    #[serde(rename = "level", default)]
    pub difficulty_level: i64,
}

impl TriviaItem {
    pub fn is_tagged(&self, category: PlaceCategory) -> bool {
        self.categories.iter().any(|tag| category.matches_tag(tag))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Station,
    Convenience,
    Park,
}

impl PlaceCategory {
    pub const ALL: [PlaceCategory; 3] = [PlaceCategory::Station, PlaceCategory::Convenience, PlaceCategory::Park];

    /// Label used in notification titles and as the canonical trivia tag.
    pub fn label(&self) -> &'static str {
        match self {
            PlaceCategory::Station => "station",
            PlaceCategory::Convenience => "convenience_store",
            PlaceCategory::Park => "park",
        }
    }

    /// Value of the `type` parameter for a nearby-places search.
    pub fn search_type(&self) -> &'static str {
        match self {
            PlaceCategory::Station => "train_station",
            PlaceCategory::Convenience => "convenience_store",
            PlaceCategory::Park => "park",
        }
    }

    // The deployed catalog tags items in Japanese.
    fn native_tag(&self) -> &'static str {
        match self {
            PlaceCategory::Station => "駅",
            PlaceCategory::Convenience => "コンビニ",
            PlaceCategory::Park => "公園",
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            PlaceCategory::Station => "station",
            PlaceCategory::Convenience => "convenience",
            PlaceCategory::Park => "park",
        }
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        tag.eq_ignore_ascii_case(self.label())
            || tag.eq_ignore_ascii_case(self.variant_name())
            || tag == self.native_tag()
    }

    pub fn parse(value: &str) -> Option<PlaceCategory> {
        PlaceCategory::ALL.into_iter().find(|category| {
            category.matches_tag(value) || value.trim().eq_ignore_ascii_case(category.search_type())
        })
    }
}

impl fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.variant_name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub vicinity: String,
    pub coordinates: GeoPoint,
    pub category: PlaceCategory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePayload {
    pub user_id: i64,
    #[serde(rename = "common_sense_id")]
    pub trivia_item_id: i64,
    pub recognized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(default)]
    pub id: Option<i64>,
    pub user_id: i64,
    #[serde(rename = "common_sense_id")]
    pub trivia_item_id: i64,
    pub recognized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStats {
    #[serde(rename = "common_sense_id", default, skip_serializing_if = "Option::is_none")]
    pub trivia_item_id: Option<i64>,
    pub known: u64,
    pub unknown: u64,
}

impl VoteStats {
    pub fn total(&self) -> u64 {
        self.known + self.unknown
    }

    /// Share of voters who already knew the fact, `None` before the first vote.
    pub fn known_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.known as f64 / total as f64),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVote {
    pub common_sense_id: i64,
    pub title: String,
    pub content: String,
    pub recognized: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOut {
    pub user_id: i64,
    pub user_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLevel {
    pub level_sum: i64,
    pub user_level: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub trivia_item_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub data: NotificationData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}
