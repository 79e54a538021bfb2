// src/formatting/mod.rs
//! Renders storage-format trees into markdown and composes page documents.

mod inline;
mod macros;
mod page;
mod renderer;
mod state;

pub use self::page::{render_page, render_page_as, BodyFormat};
pub use self::renderer::render;

use crate::storage;

/// Parses storage markup and renders it to markdown in one step.
pub fn render_storage(raw: &str) -> String {
    render(&storage::parse(raw))
}
