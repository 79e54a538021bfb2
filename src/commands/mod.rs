// src/commands/mod.rs
//! Command handlers behind the CLI.
//!
//! Handlers take their collaborators as trait objects (repository, tracker,
//! delivery) so each can run against in-memory doubles. `dispatch` builds
//! the real ones from configuration.

pub mod confluence;
pub mod general;
pub mod jira;

use crate::api::{ConfluenceClient, JiraClient};
use crate::config::{ConduitConfig, Platform};
use crate::constants::DEFAULT_CONTENT_PURPOSE;
use crate::content::ContentFileManager;
use crate::error::AppError;
use crate::pipeline::{ContentDelivery, Destination};
use clap::Subcommand;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub use confluence::{ConfluenceArgs, ConfluenceCommand, PagesCommand};
pub use jira::{IssueCommand, JiraArgs, JiraCommand};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Allocate a content file path for long-form text and print it
    GetContentPath {
        /// Purpose tag embedded in the file name
        #[arg(long, default_value = DEFAULT_CONTENT_PURPOSE)]
        purpose: String,
    },
    /// Verify credentials for a platform
    Connect {
        #[arg(value_enum)]
        platform: Platform,
        /// Site alias from the configuration
        #[arg(long)]
        site: Option<String>,
    },
    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Confluence pages
    Confluence(ConfluenceArgs),
    /// Jira issues
    Jira(JiraArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print configured sites with tokens masked
    List,
}

/// Everything a command needs from the invocation.
#[derive(Debug)]
pub struct Context {
    pub config: ConduitConfig,
    pub content: ContentFileManager,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(config: ConduitConfig, cancel: CancellationToken) -> Self {
        let content = config.content_manager();
        Self {
            config,
            content,
            cancel,
        }
    }

    fn confluence(&self, site: Option<&str>) -> Result<ConfluenceClient, AppError> {
        let site = self.config.site(Platform::Confluence, site)?;
        log::debug!("Using Confluence site '{}' at {}", site.alias, site.url);
        ConfluenceClient::connect(&site.url, &site.email, site.token)
    }

    fn jira(&self, site: Option<&str>) -> Result<JiraClient, AppError> {
        let site = self.config.site(Platform::Jira, site)?;
        log::debug!("Using Jira site '{}' at {}", site.alias, site.url);
        JiraClient::connect(&site.url, &site.email, site.token)
    }
}

/// Runs one command to completion.
pub async fn dispatch(ctx: &Context, command: Command) -> Result<(), AppError> {
    let stdout = Destination::default();
    match command {
        Command::GetContentPath { purpose } => {
            general::get_content_path(&ctx.content, &purpose, &stdout)
        }
        Command::Connect { platform, site } => match platform {
            Platform::Confluence => {
                let client = ctx.confluence(site.as_deref())?;
                general::connect_confluence(&client, &stdout).await
            }
            Platform::Jira => {
                let client = ctx.jira(site.as_deref())?;
                general::connect_jira(&client, &stdout).await
            }
        },
        Command::Config(ConfigCommand::List) => general::config_list(&ctx.config, &stdout),
        Command::Confluence(args) => {
            let client = ctx.confluence(args.site.as_deref())?;
            confluence::run(ctx, &client, args.command).await
        }
        Command::Jira(args) => {
            let client = ctx.jira(args.site.as_deref())?;
            jira::run(ctx, &client, args.command).await
        }
    }
}

/// Runs `op` on the text of a `--content-file`.
///
/// Files in the scratch directory are finalized afterwards (deleted on
/// success, archived on failure); files elsewhere are only read.
pub async fn with_content_file<T, F, Fut>(
    content: &ContentFileManager,
    path: &Path,
    op: F,
) -> Result<T, AppError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    if content.manages(path) {
        let handle = content.adopt(path)?;
        content.run_with_content(handle, op).await
    } else {
        log::debug!(
            "{} is outside the content directory; leaving it in place",
            path.display()
        );
        let text = content.read(path)?;
        op(text).await
    }
}

/// Sends a line of command output.
fn emit(out: &dyn ContentDelivery, text: impl Into<String>) -> Result<(), AppError> {
    out.deliver(text.into()).map(|_| ())
}
