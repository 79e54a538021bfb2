// src/api/responses.rs
//! Serde shapes for the Confluence and Jira responses the clients read, and
//! their conversion into domain types.

use crate::error::AppError;
use crate::model::{PageBatch, PageRecord, PageToken, RemoteLink, Transition};
use crate::types::{IssueKey, PageId, SpaceKey};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

// --- Confluence ---

/// A paginated content listing (`results` plus offset bookkeeping).
#[derive(Debug, Deserialize)]
pub struct ContentList {
    #[serde(default)]
    pub results: Vec<ContentEntity>,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub size: usize,
    #[serde(rename = "_links", default)]
    pub links: ListLinks,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLinks {
    pub next: Option<String>,
}

impl ContentList {
    /// Converts the listing into a batch. The next token is the offset after
    /// this batch, present only when the server links to a next page.
    pub fn into_batch(self, fallback_space: &SpaceKey) -> Result<PageBatch, AppError> {
        let fetched = if self.size > 0 { self.size } else { self.results.len() };
        let next = self
            .links
            .next
            .as_ref()
            .map(|_| PageToken::from_offset(self.start + fetched));

        let records = self
            .results
            .into_iter()
            .map(|entity| entity.into_record(Some(fallback_space)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageBatch { records, next })
    }
}

/// One Confluence content object with the fields `CONFLUENCE_PAGE_EXPAND`
/// asks for.
#[derive(Debug, Deserialize)]
pub struct ContentEntity {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub space: Option<SpaceRef>,
    #[serde(default)]
    pub version: Option<VersionInfo>,
    #[serde(default)]
    pub body: Option<BodyInfo>,
    #[serde(default)]
    pub ancestors: Vec<AncestorRef>,
}

#[derive(Debug, Deserialize)]
pub struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct VersionInfo {
    pub number: u32,
    #[serde(default)]
    pub when: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BodyInfo {
    #[serde(default)]
    pub storage: Option<StorageBody>,
}

#[derive(Debug, Deserialize)]
pub struct StorageBody {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct AncestorRef {
    pub id: String,
}

impl ContentEntity {
    /// Builds a `PageRecord`. The space comes from the entity when expanded,
    /// otherwise from `fallback_space`; the parent is the nearest ancestor.
    pub fn into_record(self, fallback_space: Option<&SpaceKey>) -> Result<PageRecord, AppError> {
        let id = PageId::parse(&self.id)
            .map_err(|e| AppError::MalformedResponse(format!("content id: {e}")))?;

        let space_key = match (self.space, fallback_space) {
            (Some(space), _) => SpaceKey::new(space.key)
                .map_err(|e| AppError::MalformedResponse(format!("space key: {e}")))?,
            (None, Some(fallback)) => fallback.clone(),
            (None, None) => {
                return Err(AppError::MalformedResponse(format!(
                    "content {} has no space",
                    self.id
                )))
            }
        };

        let (version, last_updated) = match self.version {
            Some(v) => (v.number, v.when.as_deref().and_then(parse_timestamp)),
            None => (1, None),
        };

        let parent = self
            .ancestors
            .last()
            .and_then(|ancestor| PageId::parse(&ancestor.id).ok());

        let raw_body = self
            .body
            .and_then(|body| body.storage)
            .map(|storage| storage.value)
            .unwrap_or_default();

        Ok(PageRecord::new(id, self.title, space_key, version, raw_body)
            .with_parent(parent)
            .with_last_updated(last_updated))
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

// --- Jira ---

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionList {
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Jira's remote link shape, with the display fields nested under `object`.
#[derive(Debug, Deserialize)]
pub struct RemoteLinkEntity {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub relationship: Option<String>,
    pub object: RemoteObject,
}

#[derive(Debug, Deserialize)]
pub struct RemoteObject {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl RemoteLinkEntity {
    pub fn into_link(self, issue: &IssueKey) -> RemoteLink {
        RemoteLink {
            issue: issue.clone(),
            id: self.id,
            title: self.object.title.unwrap_or_else(|| self.object.url.clone()),
            url: self.object.url,
            relationship: self.relationship,
        }
    }
}
