// src/formatting/inline.rs
//! Inline content rendering: emphasis, links and inline macros.

use super::macros::render_inline_macro;
use crate::storage::{Emphasis, StructuralNode};

/// Renders a run of inline nodes to a single markdown string.
///
/// Adjacent text with identical emphasis is merged first, so markers wrap
/// whole phrases rather than fragments.
pub fn render_inline(nodes: &[StructuralNode]) -> String {
    let mut out = String::new();
    let mut pending: Option<(String, Emphasis)> = None;

    for node in nodes {
        if let StructuralNode::InlineText { text, emphasis } = node {
            let merged = match &mut pending {
                Some((buffer, current)) if *current == *emphasis => {
                    buffer.push_str(text);
                    true
                }
                _ => false,
            };
            if !merged {
                if let Some((buffer, current)) = pending.take() {
                    out.push_str(&styled(&buffer, current));
                }
                pending = Some((text.clone(), *emphasis));
            }
            continue;
        }

        if let Some((buffer, current)) = pending.take() {
            out.push_str(&styled(&buffer, current));
        }
        match node {
            StructuralNode::Link { target, text } => out.push_str(&link(target, text)),
            StructuralNode::Macro { kind, params, .. } => {
                out.push_str(&render_inline_macro(kind, params))
            }
            other => out.push_str(&other.plain_text()),
        }
    }
    if let Some((buffer, current)) = pending {
        out.push_str(&styled(&buffer, current));
    }
    out
}

/// Renders inline content as trimmed lines, one per hard line break.
pub fn render_lines(nodes: &[StructuralNode]) -> Vec<String> {
    render_inline(nodes)
        .lines()
        .map(|line| line.trim().to_string())
        .collect()
}

/// Wraps text in emphasis markers. Leading and trailing whitespace stays
/// outside the markers, since `** bold**` is not emphasis in markdown.
fn styled(text: &str, emphasis: Emphasis) -> String {
    if emphasis.is_plain() {
        return text.to_string();
    }
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let start = text.len() - text.trim_start().len();
    let leading = &text[..start];
    let trailing = &text[start + core.len()..];

    let mut inner = if emphasis.code {
        code_span(core)
    } else {
        core.to_string()
    };
    if emphasis.strike {
        inner = format!("~~{inner}~~");
    }
    if emphasis.italic {
        inner = format!("*{inner}*");
    }
    if emphasis.bold {
        inner = format!("**{inner}**");
    }
    format!("{leading}{inner}{trailing}")
}

/// A code span whose delimiter is longer than any backtick run inside it.
fn code_span(text: &str) -> String {
    let longest = longest_backtick_run(text);
    if longest == 0 {
        return format!("`{text}`");
    }
    let fence = "`".repeat(longest + 1);
    format!("{fence} {text} {fence}")
}

pub(super) fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// `[text](target)`, falling back to the target as text. Targets containing
/// spaces (page titles) are wrapped in angle brackets.
pub fn link(target: &str, text: &str) -> String {
    let text = if text.trim().is_empty() { target } else { text };
    if target.chars().any(char::is_whitespace) {
        format!("[{text}](<{target}>)")
    } else {
        format!("[{text}]({target})")
    }
}
