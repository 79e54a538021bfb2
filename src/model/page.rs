// src/model/page.rs
//! Wiki page records and the batch shapes traversal works with.

use crate::formatting;
use crate::types::{PageId, SpaceKey};
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::fmt;

/// Opaque continuation token for a paginated listing.
///
/// Confluence paginates by start offset, so the token carries the offset of
/// the next batch. Callers never inspect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(String);

impl PageToken {
    pub fn from_offset(offset: usize) -> Self {
        Self(offset.to_string())
    }

    /// Offset encoded in the token; unreadable tokens restart at zero.
    pub fn offset(&self) -> usize {
        self.0.parse().unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fetched wiki page.
///
/// Immutable once built. The markdown rendering of the body is computed the
/// first time it is asked for and reused afterwards.
#[derive(Debug, Clone)]
pub struct PageRecord {
    id: PageId,
    title: String,
    space_key: SpaceKey,
    version: u32,
    parent_id: Option<PageId>,
    last_updated: Option<DateTime<Utc>>,
    raw_body: String,
    normalized: OnceCell<String>,
}

impl PageRecord {
    pub fn new(
        id: PageId,
        title: impl Into<String>,
        space_key: SpaceKey,
        version: u32,
        raw_body: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            space_key,
            version,
            parent_id: None,
            last_updated: None,
            raw_body: raw_body.into(),
            normalized: OnceCell::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: Option<PageId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_last_updated(mut self, last_updated: Option<DateTime<Utc>>) -> Self {
        self.last_updated = last_updated;
        self
    }

    pub fn id(&self) -> &PageId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn space_key(&self) -> &SpaceKey {
        &self.space_key
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn parent_id(&self) -> Option<&PageId> {
        self.parent_id.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// The body in Confluence storage format, exactly as fetched.
    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// The body rendered to markdown. Computed at most once per record.
    pub fn normalized_body(&self) -> &str {
        self.normalized
            .get_or_init(|| formatting::render_storage(&self.raw_body))
    }

    /// Whether the markdown rendering has been computed yet.
    pub fn is_normalized(&self) -> bool {
        self.normalized.get().is_some()
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            version: self.version,
            parent_id: self.parent_id.clone(),
        }
    }
}

impl PageUpdate {
    /// Builds the next version of `current` with a new body and, optionally,
    /// a new title.
    pub fn replacing(current: &PageRecord, title: Option<String>, body: String) -> Self {
        Self {
            id: current.id.clone(),
            space_key: current.space_key.clone(),
            title: title.unwrap_or_else(|| current.title.clone()),
            version: current.version,
            body,
        }
    }
}

impl PartialEq for PageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.space_key == other.space_key
            && self.version == other.version
            && self.parent_id == other.parent_id
            && self.last_updated == other.last_updated
            && self.raw_body == other.raw_body
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct PageBatch {
    pub records: Vec<PageRecord>,
    /// Present when the server reports more results after this batch.
    pub next: Option<PageToken>,
}

impl PageBatch {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            next: None,
        }
    }
}

/// The listing view of a page, as printed by `pages list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageSummary {
    pub id: PageId,
    pub title: String,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PageId>,
}

/// A page to be created. `body` is already in storage format.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub space_key: SpaceKey,
    pub title: String,
    pub parent_id: Option<PageId>,
    pub body: String,
}

/// A new version of an existing page.
///
/// `version` is the version being replaced; the server receives the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct PageUpdate {
    pub id: PageId,
    pub space_key: SpaceKey,
    pub title: String,
    pub version: u32,
    pub body: String,
}
