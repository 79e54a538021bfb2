//! Identifiers for wiki pages, spaces and issues.
//!
//! Each identifier validates its shape once at the boundary so the rest of
//! the crate can pass them around without re-checking.

use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static ISSUE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-[0-9]+$").expect("issue key pattern is valid"));

/// A Confluence content ID (numeric string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Parses a page ID, accepting either a bare ID or a page URL containing
    /// `/pages/<id>`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let candidate = extract_id_from_url(trimmed).unwrap_or(trimmed);

        if candidate.is_empty() {
            return Err(ValidationError::InvalidPageId {
                input: input.to_string(),
                reason: "page ID cannot be empty".to_string(),
            });
        }
        if !candidate.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPageId {
                input: input.to_string(),
                reason: "page ID must be numeric".to_string(),
            });
        }
        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Pulls the numeric segment following `/pages/` out of a Confluence URL.
fn extract_id_from_url(input: &str) -> Option<&str> {
    if !(input.starts_with("http://") || input.starts_with("https://")) {
        return None;
    }
    let (_, rest) = input.split_once("/pages/")?;
    rest.split(['/', '?', '#']).next()
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Confluence space key (`DOCS`, `~jdoe`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceKey(String);

impl SpaceKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();
        let trimmed = key.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '~' | '.'));
        if !valid {
            return Err(ValidationError::InvalidSpaceKey(key));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Jira issue key (`PROJ-123`). Lowercase input is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueKey(String);

impl IssueKey {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_uppercase();
        if !ISSUE_KEY_PATTERN.is_match(&normalized) {
            return Err(ValidationError::InvalidIssueKey(input.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
