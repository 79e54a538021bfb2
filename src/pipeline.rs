// src/pipeline.rs
//! Capability traits for the three stages of a read command: gather pages,
//! compose a document, deliver it.
//!
//! Each stage is tested in isolation; the commands wire them together.

use crate::api::WikiRepository;
use crate::error::AppError;
use crate::formatting::{render_page_as, BodyFormat};
use crate::model::PageRecord;
use crate::output::{deliver_all, OutputPlan, OutputReport};
use crate::traversal::{SpaceTraversal, TraversalCursor, TraversalReport};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Separator between page documents in multi-page output.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieves the pages a cursor describes.
#[async_trait::async_trait]
pub trait PageSource {
    async fn pages(&self, cursor: TraversalCursor, cancel: &CancellationToken) -> TraversalReport;
}

#[async_trait::async_trait]
impl<R: WikiRepository + ?Sized> PageSource for R {
    async fn pages(&self, cursor: TraversalCursor, cancel: &CancellationToken) -> TraversalReport {
        SpaceTraversal::new(self, cursor).collect(cancel).await
    }
}

/// Turns pages into one document.
pub trait PageComposer {
    fn compose(&self, pages: &[PageRecord]) -> String;
}

/// Renders each page with its details header and joins them with `---`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownComposer {
    pub format: BodyFormat,
}

impl PageComposer for MarkdownComposer {
    fn compose(&self, pages: &[PageRecord]) -> String {
        pages
            .iter()
            .map(|page| render_page_as(page, self.format))
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }
}

/// Sends a composed document to its destination.
pub trait ContentDelivery {
    fn deliver(&self, document: String) -> Result<OutputReport, AppError>;
}

/// A file when a path is given, stdout otherwise.
#[derive(Debug, Clone, Default)]
pub struct Destination {
    pub output: Option<PathBuf>,
}

impl ContentDelivery for Destination {
    fn deliver(&self, document: String) -> Result<OutputReport, AppError> {
        deliver_all(OutputPlan::for_destination(self.output.clone(), document))
    }
}
