use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type ProfileId = i64;
pub type CategoryId = i64;
pub type DomainId = i64;
pub type ItemId = i64;

/// Top-level grouping of skill domains for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Named subset of skills within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
}

/// Smallest evaluable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "etat", alias = "state", default)]
    pub state: ItemState,
    #[serde(
        rename = "modified_at",
        alias = "last_modified_at",
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn new(id: ItemId, state: ItemState) -> Self {
        Self {
            id,
            state,
            last_modified_at: None,
        }
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified_at = Some(at);
        self
    }

    /// Only rated items may carry recent activity.
    pub fn is_evaluated(&self) -> bool {
        self.state != ItemState::NotRated
    }
}

/// Evaluation outcome of an item.
///
/// Decoding is total: a value outside the known set is a data-integrity problem
/// in the backend and is read as [`ItemState::NotRated`] so one bad record
/// never aborts a domain. That covers `null` and non-string values too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Value")]
pub enum ItemState {
    #[serde(rename = "ACQUIS")]
    Acquired,
    #[serde(rename = "PARTIEL")]
    Partial,
    #[serde(rename = "NON_ACQUIS")]
    NotAcquired,
    #[default]
    #[serde(rename = "NON_COTE")]
    NotRated,
}

impl ItemState {
    /// Parse a wire value. Returns `None` for anything outside the closed set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACQUIS" | "ACQUIRED" => Some(Self::Acquired),
            "PARTIEL" | "PARTIAL" => Some(Self::Partial),
            "NON_ACQUIS" | "NOT_ACQUIRED" => Some(Self::NotAcquired),
            "NON_COTE" | "NOT_RATED" => Some(Self::NotRated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquired => "ACQUIS",
            Self::Partial => "PARTIEL",
            Self::NotAcquired => "NON_ACQUIS",
            Self::NotRated => "NON_COTE",
        }
    }
}

impl From<String> for ItemState {
    fn from(raw: String) -> Self {
        Self::parse(&raw).unwrap_or_else(|| {
            tracing::warn!("Unknown item state {:?}, counting it as not rated", raw);
            Self::NotRated
        })
    }
}

impl From<Value> for ItemState {
    fn from(raw: Value) -> Self {
        match raw {
            Value::String(s) => Self::from(s),
            other => {
                tracing::warn!("Non-string item state {}, counting it as not rated", other);
                Self::NotRated
            }
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// The backend sends `null`, `""`, numbers or garbage for items that were never
// touched; none of those should fail the whole item list.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(raw) => Ok(parse_timestamp(&raw)),
        Value::Null => Ok(None),
        other => {
            tracing::warn!("Ignoring non-string timestamp {}", other);
            Ok(None)
        }
    }
}

/// Parse an RFC 3339 timestamp, falling back to a naive `YYYY-MM-DDTHH:MM:SS[.f]` read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    match chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc()),
        Err(e) => {
            tracing::warn!("Ignoring unparsable timestamp {:?}: {}", raw, e);
            None
        }
    }
}
