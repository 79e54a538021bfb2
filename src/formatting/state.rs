// src/formatting/state.rs
//! Immutable formatting state with pure transitions for markdown generation.
//!
//! The renderer threads a `FormatContext` down the tree. Every transition
//! returns a new context, so siblings never see each other's state.

use crate::constants::{LIST_MAX_NESTING, NODE_MAX_RENDER_DEPTH};
use crate::storage::ListKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListContext {
    kind: ListKind,
}

/// Formatting context tracking how deep the renderer is in the tree.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    /// Current recursion depth
    recursion_depth: usize,
    /// Stack of enclosing lists, innermost last
    list_stack: Vec<ListContext>,
    /// Whether we are rendering inside a table cell
    in_table_cell: bool,
}

impl FormatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if the recursion depth limit has been reached.
    pub fn depth_limit_reached(&self) -> bool {
        self.recursion_depth >= NODE_MAX_RENDER_DEPTH
    }

    pub fn current_recursion_depth(&self) -> usize {
        self.recursion_depth
    }

    /// Enters a child node, incrementing recursion depth.
    pub fn enter_node(&self) -> Self {
        let mut new_context = self.clone();
        new_context.recursion_depth += 1;
        new_context
    }

    pub fn list_depth(&self) -> usize {
        self.list_stack.len()
    }

    /// Enters the body of an item of a list of `kind`.
    pub fn enter_list(&self, kind: ListKind) -> Self {
        let mut new_context = self.enter_node();
        new_context.list_stack.push(ListContext { kind });
        new_context
    }

    /// Kind of the innermost enclosing list.
    pub fn current_list_kind(&self) -> Option<ListKind> {
        self.list_stack.last().map(|ctx| ctx.kind)
    }

    /// Whether nested content may still be indented further.
    pub fn can_indent(&self) -> bool {
        self.list_depth() <= LIST_MAX_NESTING
    }

    pub fn enter_table_cell(&self) -> Self {
        let mut new_context = self.enter_node();
        new_context.in_table_cell = true;
        new_context
    }

    pub fn in_table_cell(&self) -> bool {
        self.in_table_cell
    }
}
