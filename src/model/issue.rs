// src/model/issue.rs
//! Jira write payloads and the few response shapes the CLI reads back.
//!
//! Issues themselves stay as JSON: the field set differs per project and the
//! CLI prints them as-is.

use crate::types::IssueKey;
use serde::{Deserialize, Serialize};

/// A new issue. `description` is already in Jira wiki markup.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDraft {
    pub project_key: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
}

/// Fields to change on an existing issue. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IssueUpdate {
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl IssueUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.description.is_none()
    }
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "to", deserialize_with = "status_name")]
    pub to_status: Option<String>,
}

impl Transition {
    /// Whether this transition is the way to reach `status`, matching either
    /// the transition name or its target status, case-insensitively.
    pub fn leads_to(&self, status: &str) -> bool {
        self.name.eq_ignore_ascii_case(status)
            || self
                .to_status
                .as_deref()
                .is_some_and(|to| to.eq_ignore_ascii_case(status))
    }
}

fn status_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Status {
        name: Option<String>,
    }
    let status: Option<Status> = Option::deserialize(deserializer)?;
    Ok(status.and_then(|s| s.name))
}

/// A remote link attached to an issue, flattened for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteLink {
    pub issue: IssueKey,
    pub id: Option<u64>,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}
