//! Shared types between the orchestration layer and presentation code
//!
//! These types are used by both:
//! - the `bulletin` orchestrators and HTTP clients (native Rust)
//! - the web presentation layer (TypeScript, via ts-rs exports)
//!
//! Serializable with serde for JSON over HTTP

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// ============================================================================
// Identity
// ============================================================================

/// Join key shared by search hits, recommendation hits and records.
///
/// The record store uses integer primary keys, but the services are free to
/// hand back string ids, so both shapes are accepted on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl std::str::FromStr for RecordId {
    type Err = std::convert::Infallible;

    /// Numeric input becomes `Int`, anything else is kept as text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(value) => Self::Int(value),
            Err(_) => Self::Text(trimmed.to_string()),
        })
    }
}

// ============================================================================
// Remote service payloads
// ============================================================================

/// A ranked source returned by the QA search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct SearchHit {
    #[ts(type = "number | string")]
    pub id: RecordId,
    pub score: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Body of `POST /qa/search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct SearchRequest {
    pub query: String,
    pub top_k: u32,
    pub min_score: f64,
}

/// Response of `POST /qa/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SearchHit>,
}

/// One entry of the personalized feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct RecommendationHit {
    #[ts(type = "number | string")]
    pub id: RecordId,
    pub hybrid_score: f64,
}

/// Tuning knobs forwarded to the recommendation endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct RecommendParams {
    pub lambda: f64,
    pub alpha: f64,
    pub top_k: u32,
}

impl Default for RecommendParams {
    fn default() -> Self {
        Self {
            lambda: 0.5,
            alpha: 0.5,
            top_k: 6,
        }
    }
}

// ============================================================================
// Record store
// ============================================================================

/// Column list requested from the record collection.
pub const RECORD_FIELDS: &str = "id,topic,content,url,department,image";

/// Descriptive entity stored in the record collection.
///
/// A record without `content` is a stub: it only carries metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct Record {
    #[ts(type = "number | string")]
    pub id: RecordId,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Row inserted into the browse collection when a user opens an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct BrowseEvent {
    pub user_id: String,
    #[ts(type = "number | string")]
    pub info_id: RecordId,
}

// ============================================================================
// View model
// ============================================================================

/// Display-ready merge of a hit and its record, if one was found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../web/src/types/generated.ts")]
pub struct EnrichedItem {
    #[ts(type = "number | string")]
    pub id: RecordId,
    pub topic: String,
    pub content: Option<String>,
    pub url: Option<String>,
    pub department: Option<String>,
    pub image: Option<String>,
    pub score: f64,
}

impl EnrichedItem {
    /// True when no full text was available for this item.
    pub fn is_stub(&self) -> bool {
        self.content.is_none()
    }

    /// First `max_chars` characters of the content, for list previews.
    pub fn excerpt(&self, max_chars: usize) -> Option<String> {
        let content = self.content.as_deref()?;
        if content.chars().count() <= max_chars {
            return Some(content.to_string());
        }
        let mut preview: String = content.chars().take(max_chars).collect();
        preview.push_str("...");
        Some(preview)
    }
}
