// src/commands/jira.rs
//! `conduit jira issue ...`

use super::{emit, with_content_file, Context};
use crate::api::IssueTracker;
use crate::authoring::markdown_to_jira;
use crate::constants::JIRA_SEARCH_DEFAULT_MAX_RESULTS;
use crate::content::ContentFileManager;
use crate::error::AppError;
use crate::model::{IssueDraft, IssueUpdate};
use crate::pipeline::{ContentDelivery, Destination};
use crate::types::{IssueKey, ValidationError};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct JiraArgs {
    /// Site alias from the configuration
    #[arg(long, global = true)]
    pub site: Option<String>,

    #[command(subcommand)]
    pub command: JiraCommand,
}

#[derive(Subcommand, Debug)]
pub enum JiraCommand {
    /// Read and change issues
    #[command(subcommand)]
    Issue(IssueCommand),
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// Print an issue as JSON
    Get { key: String },
    /// Search issues with JQL
    Search {
        jql: String,
        #[arg(long, default_value_t = JIRA_SEARCH_DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },
    /// Create an issue with a markdown description
    Create {
        project: String,
        #[arg(long)]
        summary: String,
        #[arg(long)]
        content_file: PathBuf,
        #[arg(long = "type", default_value = "Task")]
        issue_type: String,
    },
    /// Change an issue's summary and/or description
    Update {
        key: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Add a markdown comment
    Comment {
        key: String,
        #[arg(long)]
        content_file: PathBuf,
    },
    /// Move an issue to a status through the matching transition
    Status { key: String, status: String },
    /// List the remote links on an issue
    RemoteLinks { key: String },
}

pub(super) async fn run(
    ctx: &Context,
    tracker: &dyn IssueTracker,
    command: JiraCommand,
) -> Result<(), AppError> {
    let stdout = Destination::default();
    let JiraCommand::Issue(command) = command;
    match command {
        IssueCommand::Get { key } => get_issue(tracker, &IssueKey::parse(&key)?, &stdout).await,
        IssueCommand::Search { jql, max_results } => {
            search_issues(tracker, &jql, max_results, &stdout).await
        }
        IssueCommand::Create {
            project,
            summary,
            content_file,
            issue_type,
        } => {
            let request = CreateRequest {
                project_key: project,
                summary,
                issue_type,
            };
            create_issue(tracker, &ctx.content, request, &content_file, &stdout).await
        }
        IssueCommand::Update {
            key,
            summary,
            content_file,
        } => {
            let key = IssueKey::parse(&key)?;
            update_issue(
                tracker,
                &ctx.content,
                &key,
                summary,
                content_file.as_deref(),
                &stdout,
            )
            .await
        }
        IssueCommand::Comment { key, content_file } => {
            let key = IssueKey::parse(&key)?;
            add_comment(tracker, &ctx.content, &key, &content_file, &stdout).await
        }
        IssueCommand::Status { key, status } => {
            change_status(tracker, &IssueKey::parse(&key)?, &status, &stdout).await
        }
        IssueCommand::RemoteLinks { key } => {
            remote_links(tracker, &IssueKey::parse(&key)?, &stdout).await
        }
    }
}

/// Fields of `issue create` other than the description.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub project_key: String,
    pub summary: String,
    pub issue_type: String,
}

pub async fn get_issue(
    tracker: &dyn IssueTracker,
    key: &IssueKey,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let issue = tracker.get_issue(key).await?;
    emit(out, pretty(&issue)?)
}

pub async fn search_issues(
    tracker: &dyn IssueTracker,
    jql: &str,
    max_results: usize,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let issues = tracker.search(jql, max_results).await?;
    emit(out, pretty(&issues)?)
}

pub async fn create_issue(
    tracker: &dyn IssueTracker,
    content: &ContentFileManager,
    request: CreateRequest,
    content_file: &Path,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    if request.summary.trim().is_empty() {
        return Err(ValidationError::EmptyField("summary").into());
    }
    let created = with_content_file(content, content_file, |markdown| async move {
        let draft = IssueDraft {
            project_key: request.project_key,
            summary: request.summary,
            description: markdown_to_jira(&markdown),
            issue_type: request.issue_type,
        };
        tracker.create_issue(&draft).await
    })
    .await?;

    let key = created
        .get("key")
        .and_then(|k| k.as_str())
        .unwrap_or("(unknown key)");
    emit(out, format!("Created issue {}", key))
}

pub async fn update_issue(
    tracker: &dyn IssueTracker,
    content: &ContentFileManager,
    key: &IssueKey,
    summary: Option<String>,
    content_file: Option<&Path>,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    match content_file {
        Some(path) => {
            with_content_file(content, path, |markdown| async move {
                let update = IssueUpdate {
                    summary,
                    description: Some(markdown_to_jira(&markdown)),
                };
                tracker.update_issue(key, &update).await
            })
            .await?
        }
        None => {
            let update = IssueUpdate {
                summary,
                description: None,
            };
            if update.is_empty() {
                return Err(ValidationError::EmptyField("--summary or --content-file").into());
            }
            tracker.update_issue(key, &update).await?
        }
    }
    emit(out, format!("Updated issue {}", key))
}

pub async fn add_comment(
    tracker: &dyn IssueTracker,
    content: &ContentFileManager,
    key: &IssueKey,
    content_file: &Path,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    with_content_file(content, content_file, |markdown| async move {
        tracker.add_comment(key, &markdown_to_jira(&markdown)).await
    })
    .await?;
    emit(out, format!("Added comment to {}", key))
}

pub async fn change_status(
    tracker: &dyn IssueTracker,
    key: &IssueKey,
    status: &str,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let transition = tracker.transition_status(key, status).await?;
    emit(
        out,
        format!(
            "Moved {} to {} via '{}'",
            key,
            transition.to_status.as_deref().unwrap_or(status),
            transition.name
        ),
    )
}

pub async fn remote_links(
    tracker: &dyn IssueTracker,
    key: &IssueKey,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let links = tracker.remote_links(key).await?;
    emit(out, pretty(&links)?)
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}
