// src/commands/general.rs
//! Commands that are not tied to one platform's content.

use super::emit;
use crate::api::{IssueTracker, WikiRepository};
use crate::config::ConduitConfig;
use crate::content::ContentFileManager;
use crate::error::AppError;
use crate::pipeline::ContentDelivery;
use serde_json::Value;

/// Allocates a content file and prints its path for the caller to fill in.
pub fn get_content_path(
    content: &ContentFileManager,
    purpose: &str,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let handle = content.allocate(purpose)?;
    emit(out, handle.path().display().to_string())
}

pub async fn connect_confluence(
    repo: &dyn WikiRepository,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let user = repo.current_user().await?;
    emit(
        out,
        format!("Successfully connected to confluence as {}", display_name(&user)),
    )
}

pub async fn connect_jira(
    tracker: &dyn IssueTracker,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let user = tracker.myself().await?;
    emit(
        out,
        format!("Successfully connected to jira as {}", display_name(&user)),
    )
}

pub fn config_list(config: &ConduitConfig, out: &dyn ContentDelivery) -> Result<(), AppError> {
    emit(out, config.masked_summary())
}

/// The most readable identity a user object offers.
fn display_name(user: &Value) -> &str {
    ["displayName", "publicName", "emailAddress", "name", "accountId"]
        .iter()
        .find_map(|field| user.get(*field).and_then(Value::as_str))
        .unwrap_or("unknown user")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::Captured;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn content_path_is_printed_but_not_created() {
        let dir = TempDir::new().unwrap();
        let content = ContentFileManager::new(dir.path());
        let out = Captured::default();

        get_content_path(&content, "issue description", &out).unwrap();
        let printed = out.text();
        assert!(printed.contains("issue-description_"));
        assert!(!std::path::Path::new(&printed).exists());
    }

    #[test]
    fn display_name_prefers_human_fields() {
        assert_eq!(
            display_name(&json!({"accountId": "5b10", "displayName": "Dana"})),
            "Dana"
        );
        assert_eq!(display_name(&json!({"accountId": "5b10"})), "5b10");
        assert_eq!(display_name(&json!({})), "unknown user");
    }
}
