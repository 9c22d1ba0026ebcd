//! Agency data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A (title, chapter) pointer associating an agency with a portion of a
/// title's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CfrReference {
    /// Referenced title number
    pub title: u32,

    /// Chapter within the title (upstream records occasionally omit it)
    #[serde(default)]
    pub chapter: Option<String>,
}

/// An organizational entity responsible for one or more regulatory
/// references. Agencies form a forest: a child carries a weak
/// back-reference to its parent's slug and its own derived metrics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agency {
    /// Stable unique identifier
    pub slug: String,

    /// Full display name
    pub name: String,

    /// Abbreviated display name
    pub short_name: String,

    /// Derived word count; written only by the sync pass
    pub word_count: u64,

    /// Number of CFR references attributed to this agency
    pub regulation_count: u64,

    /// Ordered references into the title corpus
    pub cfr_references: Vec<CfrReference>,

    /// Parent agency slug, if this is a child agency (lookup only)
    #[serde(default)]
    pub parent_slug: Option<String>,

    /// When this row was last refreshed
    pub last_updated: DateTime<Utc>,
}

impl Agency {
    /// True for agencies without a parent.
    pub fn is_top_level(&self) -> bool {
        self.parent_slug.is_none()
    }

    /// Compare everything except the `last_updated` stamp.
    pub fn content_eq(&self, other: &Agency) -> bool {
        self.slug == other.slug
            && self.name == other.name
            && self.short_name == other.short_name
            && self.word_count == other.word_count
            && self.regulation_count == other.regulation_count
            && self.cfr_references == other.cfr_references
            && self.parent_slug == other.parent_slug
    }
}
