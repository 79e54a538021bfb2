//! Markdown authoring: converts content files into the formats the remote
//! platforms accept.

mod jira;
mod storage;

pub use jira::markdown_to_jira;
pub use storage::markdown_to_storage;

use pulldown_cmark::Options;

/// Markdown extensions understood by both converters.
fn markdown_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}
