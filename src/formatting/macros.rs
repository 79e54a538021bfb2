// src/formatting/macros.rs
//! Plain-text approximations of Confluence macros.

use crate::storage::MacroKind;
use std::collections::BTreeMap;

fn param<'a>(params: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Renders a macro that sits within a line of text.
pub fn render_inline_macro(kind: &MacroKind, params: &BTreeMap<String, String>) -> String {
    match kind {
        MacroKind::Status => {
            let label = param(params, "title")
                .or_else(|| param(params, "colour"))
                .unwrap_or("status");
            format!("[{}]", label.to_uppercase())
        }
        MacroKind::Emoticon => {
            format!(":{}:", param(params, "name").unwrap_or("smile"))
        }
        MacroKind::JiraIssue => param(params, "key").unwrap_or_default().to_string(),
        MacroKind::Image => match param(params, "src") {
            Some(src) => {
                let alt = param(params, "alt").unwrap_or_default();
                if src.chars().any(char::is_whitespace) {
                    format!("![{alt}](<{src}>)")
                } else {
                    format!("![{alt}]({src})")
                }
            }
            None => String::new(),
        },
        _ => String::new(),
    }
}

/// Prefixes every line with `> `; blank lines become a bare `>`.
pub fn quote(body: &str) -> String {
    body.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// An info/note/warning/tip box as a labelled blockquote.
///
/// Untitled boxes put the label in front of the first line of the body
/// when that line is plain prose (`inline_start`); otherwise the label
/// gets its own line.
pub fn admonition(label: &str, title: Option<&str>, body: &str, inline_start: bool) -> String {
    let content = match title {
        Some(title) if body.is_empty() => format!("**{label}: {title}**"),
        Some(title) => format!("**{label}: {title}**\n{body}"),
        None if body.is_empty() => format!("**{label}:**"),
        None if inline_start => format!("**{label}:** {body}"),
        None => format!("**{label}:**\n{body}"),
    };
    quote(&content)
}

/// A panel as a blockquote, headed by its title when it has one.
pub fn panel(params: &BTreeMap<String, String>, body: &str) -> String {
    let content = match param(params, "title") {
        Some(title) if body.is_empty() => format!("**{title}**"),
        Some(title) => format!("**{title}**\n{body}"),
        None => body.to_string(),
    };
    quote(&content)
}

/// The title line of an expand macro.
pub fn expand_title(params: &BTreeMap<String, String>) -> String {
    format!("**{}**", param(params, "title").unwrap_or("Details"))
}

/// The `title` parameter of a macro, if set.
pub fn title(params: &BTreeMap<String, String>) -> Option<&str> {
    param(params, "title")
}
