// src/api/mod.rs
//! Remote platform access: the ability to read and write wiki pages and
//! issues on an Atlassian site.
//!
//! Business logic depends on the `WikiRepository` and `IssueTracker` traits,
//! never on HTTP details.

pub mod client;
mod confluence;
mod jira;
pub mod parser;
mod responses;

use crate::error::AppError;
use crate::model::{
    IssueDraft, IssueUpdate, PageBatch, PageDraft, PageRecord, PageToken, PageUpdate, RemoteLink,
    Transition,
};
use crate::types::{IssueKey, PageId, SpaceKey};
use serde_json::Value;

pub use client::AtlassianHttpClient;
pub use confluence::ConfluenceClient;
pub use jira::JiraClient;

/// Which listing a batch is drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BatchScope {
    /// Top-level pages of the space.
    Root,
    /// Direct children of a page.
    Children(PageId),
    /// Every page of the space regardless of where it sits.
    Space,
}

/// One paginated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub space: SpaceKey,
    pub scope: BatchScope,
    pub limit: usize,
    /// Continuation from the previous batch; `None` starts at the beginning.
    pub token: Option<PageToken>,
}

/// The ability to read and write Confluence pages.
#[async_trait::async_trait]
pub trait WikiRepository: Send + Sync {
    async fn fetch_page(&self, id: &PageId) -> Result<PageRecord, AppError>;
    async fn fetch_page_by_title(&self, space: &SpaceKey, title: &str) -> Result<PageRecord, AppError>;
    async fn fetch_batch(&self, request: &BatchRequest) -> Result<PageBatch, AppError>;
    async fn create_page(&self, draft: &PageDraft) -> Result<PageRecord, AppError>;
    async fn update_page(&self, update: &PageUpdate) -> Result<PageRecord, AppError>;
    async fn current_user(&self) -> Result<Value, AppError>;
}

/// The ability to read and change Jira issues.
#[async_trait::async_trait]
pub trait IssueTracker: Send + Sync {
    async fn get_issue(&self, key: &IssueKey) -> Result<Value, AppError>;
    async fn search(&self, jql: &str, max_results: usize) -> Result<Vec<Value>, AppError>;
    async fn create_issue(&self, draft: &IssueDraft) -> Result<Value, AppError>;
    async fn update_issue(&self, key: &IssueKey, update: &IssueUpdate) -> Result<(), AppError>;
    async fn add_comment(&self, key: &IssueKey, body: &str) -> Result<Value, AppError>;
    async fn transitions(&self, key: &IssueKey) -> Result<Vec<Transition>, AppError>;
    async fn transition_issue(&self, key: &IssueKey, transition_id: &str) -> Result<(), AppError>;
    async fn remote_links(&self, key: &IssueKey) -> Result<Vec<RemoteLink>, AppError>;
    async fn myself(&self) -> Result<Value, AppError>;

    /// Moves an issue to `status` through whichever available transition
    /// leads there.
    async fn transition_status(&self, key: &IssueKey, status: &str) -> Result<Transition, AppError> {
        let transitions = self.transitions(key).await?;
        let Some(transition) = transitions.iter().find(|t| t.leads_to(status)).cloned() else {
            let available: Vec<&str> = transitions.iter().map(|t| t.name.as_str()).collect();
            return Err(AppError::NotFound(format!(
                "Status '{}' is not reachable from {}; available transitions: {}",
                status,
                key,
                available.join(", ")
            )));
        };

        self.transition_issue(key, &transition.id).await?;
        log::info!("Moved {} via '{}'", key, transition.name);
        Ok(transition)
    }
}
