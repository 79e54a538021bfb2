// src/commands/confluence.rs
//! `conduit confluence pages ...`

use super::{emit, with_content_file, Context};
use crate::api::WikiRepository;
use crate::authoring::markdown_to_storage;
use crate::constants::{CONFLUENCE_DEFAULT_BATCH_SIZE, TRAVERSAL_DEFAULT_MAX_PAGES};
use crate::content::ContentFileManager;
use crate::error::AppError;
use crate::formatting::{render_page_as, BodyFormat};
use crate::model::{PageDraft, PageRecord, PageUpdate};
use crate::pipeline::{ContentDelivery, Destination, MarkdownComposer, PageComposer, PageSource};
use crate::traversal::{DepthPolicy, SpaceTraversal, TraversalCursor, TraversalReport};
use crate::types::{PageId, SpaceKey};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ConfluenceArgs {
    /// Site alias from the configuration
    #[arg(long, global = true)]
    pub site: Option<String>,

    #[command(subcommand)]
    pub command: ConfluenceCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfluenceCommand {
    /// Read and write pages
    #[command(subcommand)]
    Pages(PagesCommand),
}

#[derive(Subcommand, Debug)]
pub enum PagesCommand {
    /// List the top-level pages of a space (one batch)
    List {
        space: String,
        #[arg(long, default_value_t = CONFLUENCE_DEFAULT_BATCH_SIZE)]
        limit: usize,
        /// Print JSON instead of a text list
        #[arg(long)]
        json: bool,
    },
    /// List every page in a space, one flat listing paged in batches
    ListAll {
        space: String,
        #[arg(long, default_value_t = CONFLUENCE_DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long)]
        json: bool,
    },
    /// List the direct children of a page
    Children {
        parent_id: String,
        #[arg(long, default_value_t = CONFLUENCE_DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long)]
        json: bool,
    },
    /// Render pages as markdown documents
    Content {
        space: String,
        #[arg(long, value_enum, default_value_t = DepthPolicy::Root)]
        depth: DepthPolicy,
        /// Anchor page for `children` (and optionally `all`)
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, value_enum, default_value_t = BodyFormat::Clean)]
        format: BodyFormat,
        #[arg(long, default_value_t = CONFLUENCE_DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        #[arg(long, default_value_t = TRAVERSAL_DEFAULT_MAX_PAGES)]
        max_pages: usize,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Render one page looked up by title
    Get {
        space: String,
        title: String,
        #[arg(long, value_enum, default_value_t = BodyFormat::Clean)]
        format: BodyFormat,
    },
    /// Create a page from a markdown content file
    Create {
        space: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        content_file: PathBuf,
    },
    /// Replace a page's body with a markdown content file
    Update {
        page_id: String,
        #[arg(long)]
        content_file: PathBuf,
        /// New title; the current one is kept otherwise
        #[arg(long)]
        title: Option<String>,
    },
}

/// The parameters of `pages content`.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub cursor: TraversalCursor,
    pub format: BodyFormat,
}

pub(super) async fn run(
    ctx: &Context,
    repo: &dyn WikiRepository,
    command: ConfluenceCommand,
) -> Result<(), AppError> {
    let stdout = Destination::default();
    let ConfluenceCommand::Pages(command) = command;
    match command {
        PagesCommand::List { space, limit, json } => {
            list_pages(repo, &SpaceKey::new(space)?, limit, json, &stdout).await
        }
        PagesCommand::ListAll {
            space,
            batch_size,
            json,
        } => list_all(repo, &SpaceKey::new(space)?, batch_size, json, &ctx.cancel, &stdout).await,
        PagesCommand::Children {
            parent_id,
            batch_size,
            json,
        } => {
            let parent = PageId::parse(&parent_id)?;
            list_children(repo, &parent, batch_size, json, &ctx.cancel, &stdout).await
        }
        PagesCommand::Content {
            space,
            depth,
            parent,
            format,
            batch_size,
            max_pages,
            output,
        } => {
            let anchor = parent.as_deref().map(PageId::parse).transpose()?;
            let cursor = TraversalCursor::new(SpaceKey::new(space)?, depth, anchor, batch_size)?
                .with_max_pages(max_pages);
            let destination = Destination { output };
            page_content(repo, ContentRequest { cursor, format }, &ctx.cancel, &destination).await
        }
        PagesCommand::Get {
            space,
            title,
            format,
        } => get_page(repo, &SpaceKey::new(space)?, &title, format, &stdout).await,
        PagesCommand::Create {
            space,
            title,
            parent,
            content_file,
        } => {
            let parent = parent.as_deref().map(PageId::parse).transpose()?;
            create_page(
                repo,
                &ctx.content,
                SpaceKey::new(space)?,
                title,
                parent,
                &content_file,
                &stdout,
            )
            .await
        }
        PagesCommand::Update {
            page_id,
            content_file,
            title,
        } => {
            let id = PageId::parse(&page_id)?;
            update_page(repo, &ctx.content, &id, &content_file, title, &stdout).await
        }
    }
}

/// One batch of root pages.
pub async fn list_pages(
    repo: &dyn WikiRepository,
    space: &SpaceKey,
    limit: usize,
    json: bool,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let cursor = TraversalCursor::new(space.clone(), DepthPolicy::Root, None, limit)?;
    let mut traversal = SpaceTraversal::new(repo, cursor);
    let records = traversal.next_batch().await?.unwrap_or_default();
    emit(out, page_list(&records, &format!("Pages in space {}", space), json)?)
}

/// Every page of a space from the flat space listing, `batch_size` pages
/// per request.
pub async fn list_all(
    repo: &dyn WikiRepository,
    space: &SpaceKey,
    batch_size: usize,
    json: bool,
    cancel: &CancellationToken,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let cursor = TraversalCursor::new(space.clone(), DepthPolicy::Space, None, batch_size)?;
    list_traversal(repo, cursor, json, cancel, out).await
}

/// Direct children of a page. The parent is fetched first to learn its
/// space.
pub async fn list_children(
    repo: &dyn WikiRepository,
    parent: &PageId,
    batch_size: usize,
    json: bool,
    cancel: &CancellationToken,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let parent_page = repo.fetch_page(parent).await?;
    let cursor = TraversalCursor::new(
        parent_page.space_key().clone(),
        DepthPolicy::Children,
        Some(parent.clone()),
        batch_size,
    )?;
    list_traversal(repo, cursor, json, cancel, out).await
}

/// Lists whatever a traversal yields; partial results are printed before
/// the error that cut them short is returned.
pub async fn list_traversal(
    repo: &dyn WikiRepository,
    cursor: TraversalCursor,
    json: bool,
    cancel: &CancellationToken,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let heading = match (cursor.depth(), cursor.anchor()) {
        (DepthPolicy::Children, Some(parent)) => format!("Child pages of {}", parent),
        _ => format!("Pages in space {}", cursor.space()),
    };
    let report = repo.pages(cursor, cancel).await;
    let (records, error) = finish(report);
    emit(out, page_list(&records, &heading, json)?)?;
    error.map_or(Ok(()), Err)
}

/// Renders pages as markdown documents separated by `---`.
pub async fn page_content(
    repo: &dyn WikiRepository,
    request: ContentRequest,
    cancel: &CancellationToken,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let report = repo.pages(request.cursor, cancel).await;
    let (records, error) = finish(report);
    let composer = MarkdownComposer {
        format: request.format,
    };
    if !records.is_empty() || error.is_none() {
        out.deliver(composer.compose(&records))?;
    }
    error.map_or(Ok(()), Err)
}

pub async fn get_page(
    repo: &dyn WikiRepository,
    space: &SpaceKey,
    title: &str,
    format: BodyFormat,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let page = repo.fetch_page_by_title(space, title).await?;
    emit(out, render_page_as(&page, format))
}

pub async fn create_page(
    repo: &dyn WikiRepository,
    content: &ContentFileManager,
    space: SpaceKey,
    title: String,
    parent: Option<PageId>,
    content_file: &Path,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let created = with_content_file(content, content_file, |markdown| async move {
        let draft = PageDraft {
            space_key: space,
            title,
            parent_id: parent,
            body: markdown_to_storage(&markdown),
        };
        repo.create_page(&draft).await
    })
    .await?;

    emit(
        out,
        format!(
            "Created page '{}' (ID: {}) in space {}",
            created.title(),
            created.id(),
            created.space_key()
        ),
    )
}

pub async fn update_page(
    repo: &dyn WikiRepository,
    content: &ContentFileManager,
    id: &PageId,
    content_file: &Path,
    title: Option<String>,
    out: &dyn ContentDelivery,
) -> Result<(), AppError> {
    let updated = with_content_file(content, content_file, |markdown| async move {
        let current = repo.fetch_page(id).await?;
        let update = PageUpdate::replacing(&current, title, markdown_to_storage(&markdown));
        repo.update_page(&update).await
    })
    .await?;

    emit(
        out,
        format!(
            "Updated page '{}' (ID: {}) to version {}",
            updated.title(),
            updated.id(),
            updated.version()
        ),
    )
}

/// Splits a report, logging how an incomplete traversal ended.
fn finish(report: TraversalReport) -> (Vec<PageRecord>, Option<AppError>) {
    log::debug!(
        "Traversal fetched {} batch(es), yielded {} page(s)",
        report.stats.batches_fetched,
        report.stats.records_yielded
    );
    let (records, error) = report.into_parts();
    if let Some(e) = &error {
        log::warn!("Showing {} page(s) retrieved before: {}", records.len(), e);
    }
    (records, error)
}

fn page_list(records: &[PageRecord], heading: &str, json: bool) -> Result<String, AppError> {
    if json {
        let summaries: Vec<_> = records.iter().map(PageRecord::summary).collect();
        return Ok(serde_json::to_string_pretty(&summaries)?);
    }
    if records.is_empty() {
        return Ok(format!("{}: none found", heading));
    }
    let mut lines = vec![format!("{} ({}):", heading, records.len())];
    lines.extend(
        records
            .iter()
            .map(|r| format!("- {} (ID: {})", r.title(), r.id())),
    );
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::BatchRequest;
    use crate::commands::testing::Captured;
    use crate::error::AtlassianErrorCode;
    use crate::model::{PageBatch, PageToken};
    use serde_json::Value;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// A flat space of numbered pages, with recorded writes.
    struct FlatSpace {
        pages: Vec<PageRecord>,
        fail_after: Option<usize>,
        written: Mutex<Vec<String>>,
    }

    impl FlatSpace {
        fn new(count: usize) -> Self {
            Self {
                pages: (1..=count).map(|n| page(n, "<p>body</p>")).collect(),
                fail_after: None,
                written: Mutex::new(Vec::new()),
            }
        }
    }

    fn page(n: usize, body: &str) -> PageRecord {
        PageRecord::new(
            PageId::parse(&n.to_string()).unwrap(),
            format!("Page {n}"),
            SpaceKey::new("DOCS").unwrap(),
            4,
            body,
        )
    }

    #[async_trait::async_trait]
    impl WikiRepository for FlatSpace {
        async fn fetch_page(&self, id: &PageId) -> Result<PageRecord, AppError> {
            self.pages
                .iter()
                .find(|p| p.id() == id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(id.to_string()))
        }

        async fn fetch_page_by_title(&self, _: &SpaceKey, title: &str) -> Result<PageRecord, AppError> {
            self.pages
                .iter()
                .find(|p| p.title() == title)
                .cloned()
                .ok_or_else(|| AppError::NotFound(title.to_string()))
        }

        async fn fetch_batch(&self, request: &BatchRequest) -> Result<PageBatch, AppError> {
            let start = request.token.as_ref().map(PageToken::offset).unwrap_or(0);
            if matches!(request.scope, crate::api::BatchScope::Children(_)) {
                return Ok(PageBatch::empty());
            }
            if self.fail_after.is_some_and(|n| start >= n) {
                return Err(AppError::RemoteService {
                    code: AtlassianErrorCode::ServerError(500),
                    message: "boom".to_string(),
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    url: "mock".to_string(),
                });
            }
            let records: Vec<_> = self.pages.iter().skip(start).take(request.limit).cloned().collect();
            let end = start + records.len();
            Ok(PageBatch {
                records,
                next: (end < self.pages.len()).then(|| PageToken::from_offset(end)),
            })
        }

        async fn create_page(&self, draft: &PageDraft) -> Result<PageRecord, AppError> {
            self.written.lock().unwrap().push(draft.body.clone());
            Ok(PageRecord::new(
                PageId::parse("900").unwrap(),
                draft.title.clone(),
                draft.space_key.clone(),
                1,
                draft.body.clone(),
            ))
        }

        async fn update_page(&self, update: &PageUpdate) -> Result<PageRecord, AppError> {
            self.written.lock().unwrap().push(update.body.clone());
            Ok(PageRecord::new(
                update.id.clone(),
                update.title.clone(),
                update.space_key.clone(),
                update.version + 1,
                update.body.clone(),
            ))
        }

        async fn current_user(&self) -> Result<Value, AppError> {
            Ok(Value::Null)
        }
    }

    fn space() -> SpaceKey {
        SpaceKey::new("DOCS").unwrap()
    }

    #[tokio::test]
    async fn list_prints_titles_and_ids() {
        let repo = FlatSpace::new(3);
        let out = Captured::default();
        list_pages(&repo, &space(), 2, false, &out).await.unwrap();
        assert_eq!(
            out.text(),
            "Pages in space DOCS (2):\n- Page 1 (ID: 1)\n- Page 2 (ID: 2)"
        );
    }

    #[tokio::test]
    async fn list_json_uses_summaries() {
        let repo = FlatSpace::new(1);
        let out = Captured::default();
        list_pages(&repo, &space(), 10, true, &out).await.unwrap();
        let parsed: Value = serde_json::from_str(&out.text()).unwrap();
        assert_eq!(parsed[0]["id"], "1");
        assert_eq!(parsed[0]["version"], 4);
    }

    #[tokio::test]
    async fn content_prints_partial_results_before_failing() {
        let mut repo = FlatSpace::new(6);
        repo.fail_after = Some(4);
        let out = Captured::default();
        let cursor = TraversalCursor::new(space(), DepthPolicy::Root, None, 2).unwrap();
        let result = page_content(
            &repo,
            ContentRequest {
                cursor,
                format: BodyFormat::Clean,
            },
            &CancellationToken::new(),
            &out,
        )
        .await;

        assert!(matches!(result, Err(AppError::RemoteFetch { retrieved: 4, .. })));
        assert_eq!(out.text().matches("**Page Details:**").count(), 4);
    }

    #[tokio::test]
    async fn get_renders_single_page() {
        let repo = FlatSpace::new(2);
        let out = Captured::default();
        get_page(&repo, &space(), "Page 2", BodyFormat::Clean, &out)
            .await
            .unwrap();
        assert!(out.text().starts_with("# Page 2\n"));
        assert!(out.text().ends_with("**Content:**\nbody"));
    }

    #[tokio::test]
    async fn create_converts_markdown_and_removes_content_file() {
        let dir = TempDir::new().unwrap();
        let content = ContentFileManager::new(dir.path());
        let handle = content.allocate("page").unwrap();
        content.write(&handle, "# Heading\n\nSome **bold**.").unwrap();
        let path = handle.path().to_path_buf();

        let repo = FlatSpace::new(0);
        let out = Captured::default();
        create_page(&repo, &content, space(), "New".to_string(), None, &path, &out)
            .await
            .unwrap();

        assert!(!path.exists());
        let written = repo.written.lock().unwrap().clone();
        assert_eq!(written, vec!["<h1>Heading</h1><p>Some <strong>bold</strong>.</p>"]);
        assert!(out.text().contains("Created page 'New' (ID: 900)"));
    }

    #[tokio::test]
    async fn failed_update_archives_content_file() {
        let dir = TempDir::new().unwrap();
        let content = ContentFileManager::new(dir.path());
        let handle = content.allocate("page").unwrap();
        content.write(&handle, "text").unwrap();
        let name = handle.file_name().to_string();
        let path = handle.path().to_path_buf();

        let repo = FlatSpace::new(1);
        let missing = PageId::parse("77").unwrap();
        let result = update_page(&repo, &content, &missing, &path, None, &Captured::default()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(!path.exists());
        assert!(content.archive_dir().join(name).exists());
    }

    #[tokio::test]
    async fn update_bumps_version_and_keeps_title() {
        let dir = TempDir::new().unwrap();
        let content = ContentFileManager::new(dir.path());
        let handle = content.allocate("page").unwrap();
        content.write(&handle, "new body").unwrap();

        let repo = FlatSpace::new(1);
        let out = Captured::default();
        let id = PageId::parse("1").unwrap();
        update_page(&repo, &content, &id, handle.path(), None, &out)
            .await
            .unwrap();
        assert_eq!(out.text(), "Updated page 'Page 1' (ID: 1) to version 5");
    }
}
