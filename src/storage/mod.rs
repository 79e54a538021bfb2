//! Confluence storage format reading.
//!
//! Storage format is XHTML with Confluence-specific `ac:` and `ri:`
//! elements. This module turns it into a [`StructuralNode`] tree; it accepts
//! any input, including fragments and broken markup.

mod entities;
mod lexer;
mod node;
mod parser;

pub use entities::decode_entities;
pub use lexer::MarkupIssue;
pub use node::{Emphasis, ListKind, MacroKind, StructuralNode};
pub use parser::{parse, parse_with_diagnostics};
