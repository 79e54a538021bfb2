// src/storage/node.rs
//! The structural tree produced from Confluence storage format.
//!
//! Children are owned by value, so every node has exactly one parent and the
//! tree can be walked without reference counting. Structures outside the
//! core vocabulary are carried as `Macro` nodes that keep their source.

use std::collections::BTreeMap;

/// A node in the parsed document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuralNode {
    Document {
        children: Vec<StructuralNode>,
    },
    /// A heading; `level` is 1 through 6. Children are inline content.
    Section {
        level: u8,
        children: Vec<StructuralNode>,
    },
    Paragraph {
        children: Vec<StructuralNode>,
    },
    List {
        kind: ListKind,
        items: Vec<StructuralNode>,
    },
    /// `checked` is set only for task-list items.
    ListItem {
        checked: Option<bool>,
        children: Vec<StructuralNode>,
    },
    Table {
        rows: Vec<StructuralNode>,
    },
    TableRow {
        cells: Vec<StructuralNode>,
    },
    TableCell {
        header: bool,
        children: Vec<StructuralNode>,
    },
    /// Preformatted text. `text` is kept exactly as it appeared.
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    Link {
        target: String,
        text: String,
    },
    InlineText {
        text: String,
        emphasis: Emphasis,
    },
    Macro {
        kind: MacroKind,
        /// Source markup, verbatim. Only kept for `MacroKind::Unknown`;
        /// empty for kinds the normalizer understands.
        raw: String,
        params: BTreeMap<String, String>,
        children: Vec<StructuralNode>,
    },
}

impl StructuralNode {
    pub fn text(text: impl Into<String>) -> Self {
        StructuralNode::InlineText {
            text: text.into(),
            emphasis: Emphasis::default(),
        }
    }

    pub fn styled(text: impl Into<String>, emphasis: Emphasis) -> Self {
        StructuralNode::InlineText {
            text: text.into(),
            emphasis,
        }
    }

    pub fn line_break() -> Self {
        Self::text("\n")
    }

    /// Whether the node flows within a line rather than standing as a block.
    pub fn is_inline(&self) -> bool {
        match self {
            StructuralNode::InlineText { .. } | StructuralNode::Link { .. } => true,
            StructuralNode::Macro { kind, .. } => kind.is_inline(),
            _ => false,
        }
    }

    /// Child nodes in document order; leaves return an empty slice.
    pub fn children(&self) -> &[StructuralNode] {
        match self {
            StructuralNode::Document { children }
            | StructuralNode::Section { children, .. }
            | StructuralNode::Paragraph { children }
            | StructuralNode::ListItem { children, .. }
            | StructuralNode::TableCell { children, .. }
            | StructuralNode::Macro { children, .. } => children,
            StructuralNode::List { items, .. } => items,
            StructuralNode::Table { rows } => rows,
            StructuralNode::TableRow { cells } => cells,
            StructuralNode::CodeBlock { .. }
            | StructuralNode::Link { .. }
            | StructuralNode::InlineText { .. } => &[],
        }
    }

    /// Concatenated text content of the subtree, without markup.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match node {
                StructuralNode::InlineText { text, .. } => out.push_str(text),
                StructuralNode::Link { text, target } => {
                    out.push_str(if text.is_empty() { target } else { text })
                }
                StructuralNode::CodeBlock { text, .. } => out.push_str(text),
                other => pending.extend(other.children().iter().rev()),
            }
        }
        out
    }

    /// Number of nodes in the subtree, including this one.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children());
        }
        count
    }
}

/// Inline formatting flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Emphasis {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strike: bool,
}

impl Emphasis {
    pub const BOLD: Emphasis = Emphasis {
        bold: true,
        italic: false,
        code: false,
        strike: false,
    };
    pub const ITALIC: Emphasis = Emphasis {
        bold: false,
        italic: true,
        code: false,
        strike: false,
    };
    pub const CODE: Emphasis = Emphasis {
        bold: false,
        italic: false,
        code: true,
        strike: false,
    };
    pub const STRIKE: Emphasis = Emphasis {
        bold: false,
        italic: false,
        code: false,
        strike: true,
    };

    pub fn is_plain(&self) -> bool {
        *self == Emphasis::default()
    }

    pub fn union(self, other: Emphasis) -> Emphasis {
        Emphasis {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            code: self.code || other.code,
            strike: self.strike || other.strike,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Ordered,
    Unordered,
    Task,
}

/// Macros and auxiliary structures the normalizer knows how to approximate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MacroKind {
    Info,
    Note,
    Warning,
    Tip,
    Panel,
    Expand,
    Status,
    Quote,
    Rule,
    Image,
    Emoticon,
    JiraIssue,
    TableOfContents,
    Anchor,
    /// Layout-only macros (`section`, `column`, `details`) whose body is
    /// ordinary content.
    Container,
    /// Anything else, named by its macro or tag name.
    Unknown(String),
}

impl MacroKind {
    /// Maps a structured-macro name (`ac:name`) to its kind.
    pub fn from_macro_name(name: &str) -> MacroKind {
        match name.to_ascii_lowercase().as_str() {
            "info" => MacroKind::Info,
            "note" => MacroKind::Note,
            "warning" => MacroKind::Warning,
            "tip" => MacroKind::Tip,
            "panel" => MacroKind::Panel,
            "expand" => MacroKind::Expand,
            "status" => MacroKind::Status,
            "toc" => MacroKind::TableOfContents,
            "anchor" => MacroKind::Anchor,
            "jira" => MacroKind::JiraIssue,
            "section" | "column" | "details" => MacroKind::Container,
            _ => MacroKind::Unknown(name.to_string()),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            MacroKind::Status
                | MacroKind::Image
                | MacroKind::Emoticon
                | MacroKind::JiraIssue
                | MacroKind::Anchor
        )
    }

    /// Label used when the macro renders as an admonition.
    pub fn admonition_label(&self) -> Option<&'static str> {
        match self {
            MacroKind::Info => Some("Info"),
            MacroKind::Note => Some("Note"),
            MacroKind::Warning => Some("Warning"),
            MacroKind::Tip => Some("Tip"),
            _ => None,
        }
    }
}
