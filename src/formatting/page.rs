// src/formatting/page.rs
//! Page-level documents: a title, page details and the body.

use crate::model::PageRecord;
use std::fmt::Write;

/// Which form of the page body to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BodyFormat {
    /// Markdown rendered from the storage format
    #[default]
    Clean,
    /// The storage format exactly as fetched
    Storage,
}

/// Composes a page into a markdown document for AI consumption.
pub fn render_page(record: &PageRecord) -> String {
    render_page_as(record, BodyFormat::Clean)
}

/// Composes a page document with the body in the requested format.
pub fn render_page_as(record: &PageRecord, format: BodyFormat) -> String {
    let body = match format {
        BodyFormat::Clean => record.normalized_body(),
        BodyFormat::Storage => record.raw_body(),
    };
    let last_updated = record
        .last_updated()
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "Unknown".to_string());

    let mut out = String::with_capacity(body.len() + 256);
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "# {}\n\n**Page Details:**\n- ID: {}\n- Space: {}\n- Version: {}\n- Last Updated: {}\n\n**Content:**\n{}",
        record.title(),
        record.id(),
        record.space_key(),
        record.version(),
        last_updated,
        body
    );
    log::debug!(
        "Composed page '{}' ({} bytes of {:?} content)",
        record.title(),
        body.len(),
        format
    );
    out
}
