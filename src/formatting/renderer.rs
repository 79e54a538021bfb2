// src/formatting/renderer.rs
//! Block rendering engine: converts the structural tree to markdown.
//!
//! Rendering happens in two steps. The tree is flattened into a sequence of
//! rendered blocks, each tagged with its kind, and the blocks are then
//! joined with the separator their kinds require.

use super::inline::{longest_backtick_run, render_lines};
use super::macros;
use super::state::FormatContext;
use crate::constants::CHARS_PER_NODE_ESTIMATE;
use crate::storage::{Emphasis, ListKind, MacroKind, StructuralNode};
use std::borrow::Cow;
use std::slice;

// --- Core Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Paragraph,
    Heading,
    List,
    Table,
    Code,
    Quote,
    Rule,
}

#[derive(Debug)]
struct RenderedBlock {
    kind: BlockKind,
    text: String,
}

// --- Public API ---

/// Renders a node (normally a `Document`) to markdown.
///
/// Deterministic and total. Blocks are separated by a newline, with a blank
/// line where markdown would otherwise merge neighbours. The output has no
/// trailing newline.
pub fn render(node: &StructuralNode) -> String {
    let mut blocks = Vec::new();
    collect_blocks(slice::from_ref(node), &FormatContext::new(), &mut blocks);
    let markdown = join_blocks(&blocks, node.node_count() * CHARS_PER_NODE_ESTIMATE);
    log::trace!(
        "Rendered {} block(s) into {} bytes",
        blocks.len(),
        markdown.len()
    );
    markdown
}

// --- Block Assembly ---

fn join_blocks(blocks: &[RenderedBlock], capacity: usize) -> String {
    let mut out = String::with_capacity(capacity);
    let mut previous: Option<BlockKind> = None;
    for block in blocks.iter().filter(|b| !b.text.is_empty()) {
        if let Some(previous) = previous {
            out.push_str(separator(previous, block.kind));
        }
        out.push_str(&block.text);
        previous = Some(block.kind);
    }
    out
}

/// A blank line goes wherever a single newline would let markdown read the
/// next block as a continuation of the previous one.
fn separator(previous: BlockKind, next: BlockKind) -> &'static str {
    use BlockKind::*;
    let blank = matches!(previous, Table | Quote)
        || (matches!(previous, Paragraph | List) && matches!(next, Paragraph | Table | Rule));
    if blank {
        "\n\n"
    } else {
        "\n"
    }
}

fn render_children(children: &[StructuralNode], ctx: &FormatContext) -> String {
    let mut blocks = Vec::new();
    collect_blocks(children, ctx, &mut blocks);
    join_blocks(&blocks, 0)
}

/// Flattens nodes into blocks. Consecutive inline nodes form one paragraph.
fn collect_blocks(nodes: &[StructuralNode], ctx: &FormatContext, out: &mut Vec<RenderedBlock>) {
    let mut run_start: Option<usize> = None;
    for (index, node) in nodes.iter().enumerate() {
        if node.is_inline() {
            run_start.get_or_insert(index);
            continue;
        }
        if let Some(start) = run_start.take() {
            push_paragraph(&nodes[start..index], out);
        }
        render_block(node, ctx, out);
    }
    if let Some(start) = run_start {
        push_paragraph(&nodes[start..], out);
    }
}

fn push(out: &mut Vec<RenderedBlock>, kind: BlockKind, text: String) {
    if !text.is_empty() {
        out.push(RenderedBlock { kind, text });
    }
}

fn push_paragraph(nodes: &[StructuralNode], out: &mut Vec<RenderedBlock>) {
    let lines = render_lines(nodes);
    let text = lines.join("\n");
    push(out, BlockKind::Paragraph, text.trim_matches('\n').to_string());
}

fn render_block(node: &StructuralNode, ctx: &FormatContext, out: &mut Vec<RenderedBlock>) {
    if ctx.depth_limit_reached() {
        log::debug!(
            "Render depth limit reached at depth {}; flattening subtree",
            ctx.current_recursion_depth()
        );
        let text = node.plain_text().split_whitespace().collect::<Vec<_>>().join(" ");
        push(out, BlockKind::Paragraph, text);
        return;
    }
    let ctx = ctx.enter_node();

    match node {
        StructuralNode::Document { children } | StructuralNode::Paragraph { children } => {
            collect_blocks(children, &ctx, out)
        }
        StructuralNode::Section { level, children } => {
            push(out, BlockKind::Heading, render_heading(*level, children))
        }
        StructuralNode::List { kind, items } => {
            push(out, BlockKind::List, render_list(*kind, items, &ctx))
        }
        StructuralNode::ListItem { .. } => {
            // A stray item takes the marker style of the list it sits in.
            let kind = ctx.current_list_kind().unwrap_or(ListKind::Unordered);
            push(out, BlockKind::List, render_list(kind, slice::from_ref(node), &ctx))
        }
        StructuralNode::Table { rows } => push(out, BlockKind::Table, render_table(rows, &ctx)),
        StructuralNode::TableRow { .. } | StructuralNode::TableCell { .. } => push(
            out,
            BlockKind::Table,
            render_table(slice::from_ref(node), &ctx),
        ),
        StructuralNode::CodeBlock { language, text } => {
            if ctx.in_table_cell() {
                let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
                let span = vec![StructuralNode::styled(flattened, Emphasis::CODE)];
                push_paragraph(&span, out);
            } else {
                push(out, BlockKind::Code, render_code(language.as_deref(), text));
            }
        }
        StructuralNode::Macro {
            kind,
            params,
            children,
            ..
        } => render_macro(node, kind, params, children, &ctx, out),
        StructuralNode::InlineText { .. } | StructuralNode::Link { .. } => {
            push_paragraph(slice::from_ref(node), out)
        }
    }
}

// --- Headings ---

/// Block children of a heading contribute their plain text.
fn inline_only(children: &[StructuralNode]) -> Cow<'_, [StructuralNode]> {
    if children.iter().all(StructuralNode::is_inline) {
        return Cow::Borrowed(children);
    }
    Cow::Owned(
        children
            .iter()
            .map(|child| {
                if child.is_inline() {
                    child.clone()
                } else {
                    StructuralNode::text(format!(" {} ", child.plain_text()))
                }
            })
            .collect(),
    )
}

fn render_heading(level: u8, children: &[StructuralNode]) -> String {
    let text = render_lines(&inline_only(children))
        .into_iter()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return String::new();
    }
    format!("{} {}", "#".repeat(usize::from(level.clamp(1, 6))), text)
}

// --- Lists ---

fn render_list(kind: ListKind, items: &[StructuralNode], ctx: &FormatContext) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let (checked, children) = match item {
            StructuralNode::ListItem { checked, children } => (*checked, children.as_slice()),
            other => (None, slice::from_ref(other)),
        };

        let marker = match (kind, checked) {
            (ListKind::Ordered, _) => format!("{}. ", index + 1),
            (ListKind::Task, state) | (_, state @ Some(_)) => {
                if state == Some(true) {
                    "- [x] ".to_string()
                } else {
                    "- [ ] ".to_string()
                }
            }
            _ => "- ".to_string(),
        };
        let width = match kind {
            ListKind::Ordered => marker.len(),
            ListKind::Unordered | ListKind::Task => 2,
        };

        let item_ctx = ctx.enter_list(kind);
        let body = render_children(children, &item_ctx);
        let indent = if item_ctx.can_indent() {
            " ".repeat(width)
        } else {
            String::new()
        };

        let mut body_lines = body.lines();
        match body_lines.next() {
            Some(first) => lines.push(format!("{marker}{first}")),
            None => lines.push(marker.trim_end().to_string()),
        }
        for line in body_lines {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{indent}{line}"));
            }
        }
    }
    lines.join("\n")
}

// --- Tables ---

fn render_table(nodes: &[StructuralNode], ctx: &FormatContext) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut loose_cells: Vec<String> = Vec::new();

    for node in nodes {
        match node {
            StructuralNode::TableRow { cells } => {
                if !loose_cells.is_empty() {
                    rows.push(std::mem::take(&mut loose_cells));
                }
                rows.push(cells.iter().map(|cell| render_cell(cell, ctx)).collect());
            }
            StructuralNode::TableCell { .. } => loose_cells.push(render_cell(node, ctx)),
            _ => {}
        }
    }
    if !loose_cells.is_empty() {
        rows.push(loose_cells);
    }

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return String::new();
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (index, mut row) in rows.into_iter().enumerate() {
        row.resize(columns, String::new());
        lines.push(format!("| {} |", row.join(" | ")));
        if index == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }
    lines.join("\n")
}

/// A cell's content on one line, with pipes escaped.
fn render_cell(node: &StructuralNode, ctx: &FormatContext) -> String {
    let children = match node {
        StructuralNode::TableCell { children, .. } => children.as_slice(),
        other => slice::from_ref(other),
    };
    let body = render_children(children, &ctx.enter_table_cell());
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

// --- Code ---

fn render_code(language: Option<&str>, text: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(text).max(2) + 1);
    let mut out = format!("{fence}{}\n{text}", language.unwrap_or_default());
    if !text.is_empty() && !text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out
}

// --- Macros ---

fn render_macro(
    node: &StructuralNode,
    kind: &MacroKind,
    params: &std::collections::BTreeMap<String, String>,
    children: &[StructuralNode],
    ctx: &FormatContext,
    out: &mut Vec<RenderedBlock>,
) {
    match kind {
        MacroKind::Container => collect_blocks(children, ctx, out),
        MacroKind::Expand => {
            push(out, BlockKind::Paragraph, macros::expand_title(params));
            collect_blocks(children, ctx, out);
        }
        MacroKind::Info | MacroKind::Note | MacroKind::Warning | MacroKind::Tip => {
            let label = kind.admonition_label().unwrap_or("Note");
            let body = render_children(children, ctx);
            let inline_start = children.first().is_some_and(|first| {
                first.is_inline() || matches!(first, StructuralNode::Paragraph { .. })
            });
            push(
                out,
                BlockKind::Quote,
                macros::admonition(label, macros::title(params), &body, inline_start),
            );
        }
        MacroKind::Panel => {
            let body = render_children(children, ctx);
            push(out, BlockKind::Quote, macros::panel(params, &body));
        }
        MacroKind::Quote => {
            let body = render_children(children, ctx);
            push(out, BlockKind::Quote, macros::quote(&body));
        }
        MacroKind::Rule => push(out, BlockKind::Rule, "---".to_string()),
        MacroKind::Status
        | MacroKind::Image
        | MacroKind::Emoticon
        | MacroKind::JiraIssue
        | MacroKind::Anchor => push_paragraph(slice::from_ref(node), out),
        MacroKind::TableOfContents => {}
        MacroKind::Unknown(name) => {
            log::debug!("No markdown form for macro '{}'; omitting it", name);
        }
    }
}
