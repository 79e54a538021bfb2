// src/storage/parser.rs
//! Single-pass tree builder over the token stream.
//!
//! Open elements live on a frame stack. A closing tag pops every frame down
//! to its match, a closing tag with no match is dropped, and whatever is
//! still open at end of input is closed in order. Each frame decides what
//! node (if any) it becomes when it closes.
//!
//! At most `STORAGE_MAX_NESTING_DEPTH` frames are open at once. Elements
//! opened beyond that are not given frames: their content flows into the
//! innermost open frame, so the tree depth stays bounded whatever the input.

use super::entities::decode_entities;
use super::lexer::{Lexer, MarkupIssue, TokenKind};
use super::node::{Emphasis, ListKind, MacroKind, StructuralNode};
use crate::constants::STORAGE_MAX_NESTING_DEPTH;
use log::debug;
use std::collections::BTreeMap;

/// Parses storage-format markup into a `Document` node. Never fails.
pub fn parse(raw: &str) -> StructuralNode {
    let (document, issues) = parse_with_diagnostics(raw);
    if !issues.is_empty() {
        debug!(
            "Recovered from {} markup issue(s); first: {}",
            issues.len(),
            issues[0]
        );
    }
    document
}

/// Parses markup and also returns the problems recovered from.
pub fn parse_with_diagnostics(raw: &str) -> (StructuralNode, Vec<MarkupIssue>) {
    let mut builder = TreeBuilder::new(raw);
    let mut lexer = Lexer::new(raw);
    for token in lexer.by_ref() {
        match token.kind {
            TokenKind::Open {
                name,
                attrs,
                self_closing,
            } => builder.open(name, attrs, self_closing, token.span.start, token.span.end),
            TokenKind::Close { name } => builder.close(&name, token.span.start, token.span.end),
            TokenKind::Text(text) => builder.text(text),
            TokenKind::CData(text) => builder.cdata(text),
            TokenKind::Comment => {}
        }
    }
    let mut issues = lexer.take_issues();
    let (document, builder_issues) = builder.finish();
    issues.extend(builder_issues);
    (document, issues)
}

/// Elements that never have content or a closing tag.
fn is_void(name: &str) -> bool {
    matches!(
        name,
        "br" | "hr"
            | "img"
            | "col"
            | "wbr"
            | "input"
            | "meta"
            | "link"
            | "area"
            | "base"
            | "source"
            | "embed"
            | "param"
            | "track"
    )
}

/// HTML block elements that end an open paragraph.
fn closes_paragraph(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "table"
            | "pre"
            | "blockquote"
            | "hr"
    )
}

/// Elements whose end tag may be left out.
fn end_tag_optional(name: &str) -> bool {
    matches!(
        name,
        "p" | "li" | "tr" | "td" | "th" | "tbody" | "thead" | "tfoot"
    )
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// What an open element turns into when it closes.
#[derive(Debug)]
enum FrameKind {
    Document,
    Section(u8),
    Paragraph,
    /// `<div>`: inline runs become paragraphs, nested blocks pass through.
    Division,
    List(ListKind),
    ListItem { checked: Option<bool> },
    Table,
    TableRow,
    TableCell { header: bool },
    /// `<pre>`: collects text only.
    Pre { text: String },
    /// The `code` and `noformat` macros.
    CodeMacro {
        language: Option<String>,
        text: String,
    },
    Emphasis(Emphasis),
    Anchor { href: Option<String> },
    /// `<ac:link>`; the target comes from a nested `ri:` resource.
    WikiLink {
        target: Option<String>,
        body: Option<String>,
    },
    /// `<ac:image>`; the source comes from a nested `ri:` resource.
    Image {
        src: Option<String>,
        alt: Option<String>,
    },
    Macro {
        kind: MacroKind,
        params: BTreeMap<String, String>,
    },
    Quote,
    /// `<ac:parameter>`: text becomes a parameter of the enclosing macro.
    Parameter { name: String, value: String },
    /// `<ac:plain-text-body>` and `<ac:plain-text-link-body>`.
    PlainBody { text: String },
    /// `<ac:task-status>`.
    TaskStatus { text: String },
    /// Content that is dropped, such as `<ac:task-id>`.
    Discard,
    /// Wrappers whose children belong to the parent.
    Transparent,
    Unknown(String),
}

impl FrameKind {
    /// Frames that only hold blocks, where whitespace between children is
    /// formatting noise.
    fn is_block_container(&self) -> bool {
        matches!(
            self,
            FrameKind::Document
                | FrameKind::List(_)
                | FrameKind::Table
                | FrameKind::TableRow
                | FrameKind::Quote
                | FrameKind::Macro { .. }
        )
    }

    /// Frames that collect raw text instead of child nodes.
    fn text_sink(&mut self) -> Option<&mut String> {
        match self {
            FrameKind::Pre { text }
            | FrameKind::PlainBody { text }
            | FrameKind::TaskStatus { text } => Some(text),
            FrameKind::Parameter { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Paragraph search stops here; a `<p>` inside a cell does not close one
    /// outside it.
    fn is_scope_boundary(&self) -> bool {
        matches!(
            self,
            FrameKind::Document
                | FrameKind::ListItem { .. }
                | FrameKind::TableCell { .. }
                | FrameKind::Macro { .. }
                | FrameKind::Quote
                | FrameKind::Unknown(_)
        )
    }
}

#[derive(Debug)]
struct Frame {
    /// Tag name the frame was opened with, used to match closing tags.
    name: String,
    kind: FrameKind,
    children: Vec<StructuralNode>,
    /// Byte offset of the opening tag.
    start: usize,
    /// Emphasis in effect inside this frame, including every enclosing one.
    emphasis: Emphasis,
}

struct TreeBuilder<'a> {
    source: &'a str,
    stack: Vec<Frame>,
    /// Names of elements opened past the nesting cap, innermost last.
    flattened: Vec<String>,
    issues: Vec<MarkupIssue>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            stack: vec![Frame {
                name: String::new(),
                kind: FrameKind::Document,
                children: Vec::new(),
                start: 0,
                emphasis: Emphasis::default(),
            }],
            flattened: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn current_emphasis(&self) -> Emphasis {
        self.stack.last().map(|frame| frame.emphasis).unwrap_or_default()
    }

    fn push(&mut self, name: String, kind: FrameKind, start: usize) {
        let emphasis = match kind {
            FrameKind::Emphasis(own) => self.current_emphasis().union(own),
            _ => self.current_emphasis(),
        };
        self.stack.push(Frame {
            name,
            kind,
            children: Vec::new(),
            start,
            emphasis,
        });
    }

    /// Records an element opened past the nesting cap instead of giving it
    /// a frame.
    fn flatten(&mut self, name: String, start: usize) {
        if self.flattened.is_empty() {
            self.issues.push(MarkupIssue::NestingTooDeep {
                limit: STORAGE_MAX_NESTING_DEPTH,
                offset: start,
            });
        }
        self.flattened.push(name);
    }

    fn append(&mut self, nodes: Vec<StructuralNode>) {
        self.top().children.extend(nodes);
    }

    /// Closes frames from the top down to (and including) `index`.
    fn close_to(&mut self, index: usize, end: usize, report: bool) {
        while self.stack.len() > index.max(1) {
            let Some(frame) = self.stack.pop() else {
                break;
            };
            if report && self.stack.len() > index && !end_tag_optional(&frame.name) {
                self.issues.push(MarkupIssue::UnclosedElement {
                    name: frame.name.clone(),
                    offset: frame.start,
                });
            }
            self.complete(frame, end);
        }
    }

    /// Index of the innermost frame satisfying `matches`, searching no
    /// further out than the first frame satisfying `stop`.
    fn find_open(
        &self,
        matches: impl Fn(&FrameKind) -> bool,
        stop: impl Fn(&FrameKind) -> bool,
    ) -> Option<usize> {
        for (index, frame) in self.stack.iter().enumerate().rev() {
            if matches(&frame.kind) {
                return Some(index);
            }
            if stop(&frame.kind) {
                return None;
            }
        }
        None
    }

    /// Implicitly closes elements the new tag cannot be nested in.
    fn close_implied(&mut self, name: &str, start: usize) {
        let implied = match name {
            "li" => self.find_open(
                |k| matches!(k, FrameKind::ListItem { .. }),
                |k| matches!(k, FrameKind::List(_)) || k.is_scope_boundary(),
            ),
            "ac:task" => self.find_open(
                |k| matches!(k, FrameKind::ListItem { .. }),
                |k| matches!(k, FrameKind::List(_)),
            ),
            "tr" => self.find_open(
                |k| matches!(k, FrameKind::TableRow),
                |k| matches!(k, FrameKind::Table) || k.is_scope_boundary(),
            ),
            "td" | "th" => self.find_open(
                |k| matches!(k, FrameKind::TableCell { .. }),
                |k| matches!(k, FrameKind::TableRow | FrameKind::Table),
            ),
            other if closes_paragraph(other) => self.find_open(
                |k| matches!(k, FrameKind::Paragraph),
                FrameKind::is_scope_boundary,
            ),
            _ => None,
        };
        if let Some(index) = implied {
            self.close_to(index, start, false);
        }
    }

    fn open(
        &mut self,
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
        start: usize,
        end: usize,
    ) {
        // Inside <pre> everything but text and line breaks is ignored.
        if matches!(self.top().kind, FrameKind::Pre { .. }) {
            if name == "br" {
                if let FrameKind::Pre { text } = &mut self.top().kind {
                    text.push('\n');
                }
            }
            return;
        }

        if self.stack.len() >= STORAGE_MAX_NESTING_DEPTH && !self_closing && !is_void(&name) {
            self.flatten(name, start);
            return;
        }

        if name.starts_with("ri:") {
            self.attach_resource(&name, &attrs);
            if !self_closing {
                self.push(name, FrameKind::Discard, start);
            }
            return;
        }

        self.close_implied(&name, start);

        let kind = match self.frame_kind(&name, &attrs) {
            Some(kind) => kind,
            None => {
                // Leaf elements that produce a node without a frame.
                let nodes = self.leaf_nodes(&name, &attrs);
                self.append(nodes);
                if !self_closing && !is_void(&name) {
                    self.push(name, FrameKind::Discard, start);
                }
                return;
            }
        };

        self.push(name, kind, start);
        if self_closing || is_void(&self.top().name) {
            let index = self.stack.len() - 1;
            self.close_to(index, end, false);
        }
    }

    fn frame_kind(&self, name: &str, attrs: &[(String, String)]) -> Option<FrameKind> {
        if let Some(level) = heading_level(name) {
            return Some(FrameKind::Section(level));
        }
        let kind = match name {
            "p" => FrameKind::Paragraph,
            "div" => FrameKind::Division,
            "ul" => FrameKind::List(ListKind::Unordered),
            "ol" => FrameKind::List(ListKind::Ordered),
            "ac:task-list" => FrameKind::List(ListKind::Task),
            "li" => FrameKind::ListItem { checked: None },
            "ac:task" => FrameKind::ListItem {
                checked: Some(false),
            },
            "ac:task-status" => FrameKind::TaskStatus {
                text: String::new(),
            },
            "ac:task-id" | "ac:task-uuid" | "ac:placeholder" => FrameKind::Discard,
            "table" => FrameKind::Table,
            "tr" => FrameKind::TableRow,
            "td" => FrameKind::TableCell { header: false },
            "th" => FrameKind::TableCell { header: true },
            "pre" => FrameKind::Pre {
                text: String::new(),
            },
            "strong" | "b" => FrameKind::Emphasis(Emphasis::BOLD),
            "em" | "i" => FrameKind::Emphasis(Emphasis::ITALIC),
            "code" | "tt" => FrameKind::Emphasis(Emphasis::CODE),
            "s" | "del" | "strike" => FrameKind::Emphasis(Emphasis::STRIKE),
            "a" => FrameKind::Anchor {
                href: attr(attrs, "href").map(str::to_string),
            },
            "ac:link" => FrameKind::WikiLink {
                target: attr(attrs, "ac:anchor").map(|a| format!("#{a}")),
                body: None,
            },
            "ac:image" => FrameKind::Image {
                src: None,
                alt: attr(attrs, "ac:alt")
                    .or_else(|| attr(attrs, "ac:title"))
                    .map(str::to_string),
            },
            "blockquote" => FrameKind::Quote,
            "ac:structured-macro" | "ac:macro" => {
                let macro_name = attr(attrs, "ac:name").unwrap_or_default();
                match macro_name.to_ascii_lowercase().as_str() {
                    "code" | "noformat" => FrameKind::CodeMacro {
                        language: None,
                        text: String::new(),
                    },
                    _ => FrameKind::Macro {
                        kind: MacroKind::from_macro_name(macro_name),
                        params: BTreeMap::new(),
                    },
                }
            }
            "ac:parameter" => FrameKind::Parameter {
                name: attr(attrs, "ac:name").unwrap_or_default().to_string(),
                value: String::new(),
            },
            "ac:plain-text-body" | "ac:plain-text-link-body" => FrameKind::PlainBody {
                text: String::new(),
            },
            "ac:rich-text-body" | "ac:link-body" | "ac:task-body" | "ac:layout"
            | "ac:layout-section" | "ac:layout-cell" | "tbody" | "thead" | "tfoot"
            | "span" | "u" | "sup" | "sub" | "small" | "big" | "font" | "ins" | "mark"
            | "abbr" | "cite" | "center" | "ac:inline-comment-marker" => FrameKind::Transparent,
            "br" | "hr" | "img" | "ac:emoticon" | "time" => return None,
            other if is_void(other) => FrameKind::Discard,
            other => FrameKind::Unknown(other.to_string()),
        };
        Some(kind)
    }

    /// Nodes for elements that carry everything in their attributes.
    fn leaf_nodes(&self, name: &str, attrs: &[(String, String)]) -> Vec<StructuralNode> {
        match name {
            "br" => vec![StructuralNode::line_break()],
            "hr" => vec![simple_macro(MacroKind::Rule, BTreeMap::new())],
            "img" => {
                let mut params = BTreeMap::new();
                if let Some(src) = attr(attrs, "src") {
                    params.insert("src".to_string(), src.to_string());
                }
                if let Some(alt) = attr(attrs, "alt") {
                    params.insert("alt".to_string(), alt.to_string());
                }
                vec![simple_macro(MacroKind::Image, params)]
            }
            "ac:emoticon" => {
                let mut params = BTreeMap::new();
                let emoticon = attr(attrs, "ac:name")
                    .or_else(|| attr(attrs, "ac:emoji-shortname"))
                    .unwrap_or("smile")
                    .trim_matches(':');
                params.insert("name".to_string(), emoticon.to_string());
                vec![simple_macro(MacroKind::Emoticon, params)]
            }
            "time" => attr(attrs, "datetime")
                .map(|d| vec![StructuralNode::styled(d, self.current_emphasis())])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Applies a `ri:` resource to the innermost link or image.
    fn attach_resource(&mut self, name: &str, attrs: &[(String, String)]) {
        let resolved = match name {
            "ri:page" | "ri:blog-post" => attr(attrs, "ri:content-title"),
            "ri:url" => attr(attrs, "ri:value"),
            "ri:attachment" => attr(attrs, "ri:filename"),
            "ri:space" => attr(attrs, "ri:space-key"),
            "ri:user" => attr(attrs, "ri:account-id").or_else(|| attr(attrs, "ri:username")),
            _ => None,
        };
        let Some(resolved) = resolved else {
            return;
        };
        for frame in self.stack.iter_mut().rev() {
            match &mut frame.kind {
                FrameKind::WikiLink { target, .. } => {
                    if target.as_deref().map_or(true, |t| t.starts_with('#')) {
                        let anchor = target.take().unwrap_or_default();
                        let user_prefix = if name == "ri:user" { "@" } else { "" };
                        *target = Some(format!("{user_prefix}{resolved}{anchor}"));
                    }
                    return;
                }
                FrameKind::Image { src, .. } => {
                    src.get_or_insert_with(|| resolved.to_string());
                    return;
                }
                FrameKind::Discard => continue,
                _ if frame.name.starts_with("ri:") => continue,
                _ => return,
            }
        }
    }

    fn close(&mut self, name: &str, start: usize, end: usize) {
        if matches!(self.top().kind, FrameKind::Pre { .. }) && name != "pre" {
            return;
        }
        let window = self.flattened.len().saturating_sub(STORAGE_MAX_NESTING_DEPTH);
        if let Some(offset) = self.flattened[window..].iter().rposition(|open| open == name) {
            self.flattened.truncate(window + offset);
            return;
        }
        let found = self
            .stack
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, frame)| frame.name == name)
            .map(|(index, _)| index);
        match found {
            Some(index) => {
                self.flattened.clear();
                self.close_to(index, end, true)
            }
            None if is_void(name) => {}
            None => self.issues.push(MarkupIssue::StrayClosingTag {
                name: name.to_string(),
                offset: start,
            }),
        }
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        if let Some(sink) = self.top().kind.text_sink() {
            sink.push_str(&decoded);
            return;
        }
        if matches!(
            self.top().kind,
            FrameKind::Discard | FrameKind::CodeMacro { .. }
        ) {
            return;
        }

        let collapsed = collapse_whitespace(&decoded);
        if collapsed.trim().is_empty() {
            let frame = self.top();
            let leading = frame.children.last().map_or(true, |c| !c.is_inline());
            if frame.kind.is_block_container() || leading {
                return;
            }
        }
        let emphasis = self.current_emphasis();
        self.top()
            .children
            .push(StructuralNode::styled(collapsed, emphasis));
    }

    fn cdata(&mut self, raw: &str) {
        if let Some(sink) = self.top().kind.text_sink() {
            sink.push_str(raw);
            return;
        }
        if let FrameKind::CodeMacro { text, .. } = &mut self.top().kind {
            text.push_str(raw);
            return;
        }
        if matches!(self.top().kind, FrameKind::Discard) {
            return;
        }
        let emphasis = self.current_emphasis();
        self.top()
            .children
            .push(StructuralNode::styled(raw, emphasis));
    }

    /// Turns a closed frame into nodes for its parent, or folds it into the
    /// parent frame's state.
    fn complete(&mut self, frame: Frame, end: usize) {
        let Frame {
            kind,
            children,
            start,
            ..
        } = frame;
        let nodes = match kind {
            FrameKind::Document => children,
            FrameKind::Section(level) => vec![StructuralNode::Section { level, children }],
            FrameKind::Paragraph => vec![StructuralNode::Paragraph { children }],
            FrameKind::Division => wrap_inline_runs(children),
            FrameKind::List(kind) => vec![StructuralNode::List {
                kind,
                items: children,
            }],
            FrameKind::ListItem { checked } => {
                vec![StructuralNode::ListItem { checked, children }]
            }
            FrameKind::Table => vec![StructuralNode::Table { rows: children }],
            FrameKind::TableRow => vec![StructuralNode::TableRow { cells: children }],
            FrameKind::TableCell { header } => {
                vec![StructuralNode::TableCell { header, children }]
            }
            FrameKind::Pre { text } => vec![StructuralNode::CodeBlock {
                language: None,
                text,
            }],
            FrameKind::CodeMacro { language, text } => {
                vec![StructuralNode::CodeBlock { language, text }]
            }
            FrameKind::Emphasis(_) | FrameKind::Transparent => children,
            FrameKind::Anchor { href } => match href {
                Some(target) if !target.is_empty() => vec![StructuralNode::Link {
                    target,
                    text: link_text(&children),
                }],
                _ => children,
            },
            FrameKind::WikiLink { target, body } => {
                let text = body
                    .map(|b| b.trim().to_string())
                    .unwrap_or_else(|| link_text(&children));
                match target {
                    Some(target) => vec![StructuralNode::Link { target, text }],
                    None if !text.is_empty() => vec![StructuralNode::text(text)],
                    None => Vec::new(),
                }
            }
            FrameKind::Image { src, alt } => {
                let mut params = BTreeMap::new();
                if let Some(src) = src {
                    params.insert("src".to_string(), src);
                }
                if let Some(alt) = alt {
                    params.insert("alt".to_string(), alt);
                }
                vec![simple_macro(MacroKind::Image, params)]
            }
            FrameKind::Macro { kind, params } => {
                let raw = match kind {
                    MacroKind::Unknown(_) => self.slice(start, end),
                    _ => String::new(),
                };
                vec![StructuralNode::Macro {
                    kind,
                    raw,
                    params,
                    children,
                }]
            }
            FrameKind::Quote => vec![StructuralNode::Macro {
                kind: MacroKind::Quote,
                raw: String::new(),
                params: BTreeMap::new(),
                children,
            }],
            FrameKind::Unknown(name) => vec![StructuralNode::Macro {
                kind: MacroKind::Unknown(name),
                raw: self.slice(start, end),
                params: BTreeMap::new(),
                children,
            }],
            FrameKind::Parameter { name, value } => {
                self.set_parameter(name, value);
                Vec::new()
            }
            FrameKind::PlainBody { text } => self.attach_plain_body(text),
            FrameKind::TaskStatus { text } => {
                let complete = text.trim().eq_ignore_ascii_case("complete");
                for frame in self.stack.iter_mut().rev() {
                    if let FrameKind::ListItem { checked } = &mut frame.kind {
                        *checked = Some(complete);
                        break;
                    }
                }
                Vec::new()
            }
            FrameKind::Discard => Vec::new(),
        };
        self.append(nodes);
    }

    fn set_parameter(&mut self, name: String, value: String) {
        match &mut self.top().kind {
            FrameKind::CodeMacro { language, .. } => {
                if name.eq_ignore_ascii_case("language") && !value.trim().is_empty() {
                    *language = Some(value.trim().to_string());
                }
            }
            FrameKind::Macro { params, .. } => {
                params.insert(name, value);
            }
            _ => {}
        }
    }

    fn attach_plain_body(&mut self, body: String) -> Vec<StructuralNode> {
        match &mut self.top().kind {
            FrameKind::CodeMacro { text, .. } => {
                text.push_str(&body);
                Vec::new()
            }
            FrameKind::WikiLink { body: link_body, .. } => {
                *link_body = Some(body);
                Vec::new()
            }
            _ if body.trim().is_empty() => Vec::new(),
            _ => vec![StructuralNode::Paragraph {
                children: vec![StructuralNode::text(body)],
            }],
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.source
            .get(start..end.min(self.source.len()))
            .unwrap_or_default()
            .to_string()
    }

    fn finish(mut self) -> (StructuralNode, Vec<MarkupIssue>) {
        let end = self.source.len();
        while self.stack.len() > 1 {
            if let Some(frame) = self.stack.last() {
                if !end_tag_optional(&frame.name) {
                    self.issues.push(MarkupIssue::UnclosedElement {
                        name: frame.name.clone(),
                        offset: frame.start,
                    });
                }
            }
            let index = self.stack.len() - 1;
            self.close_to(index, end, false);
        }
        let children = self
            .stack
            .pop()
            .map(|frame| frame.children)
            .unwrap_or_default();
        (StructuralNode::Document { children }, self.issues)
    }
}

fn simple_macro(kind: MacroKind, params: BTreeMap<String, String>) -> StructuralNode {
    StructuralNode::Macro {
        kind,
        raw: String::new(),
        params,
        children: Vec::new(),
    }
}

/// Groups consecutive inline nodes into paragraphs, leaving blocks as they
/// are. Runs that are only whitespace are dropped.
fn wrap_inline_runs(children: Vec<StructuralNode>) -> Vec<StructuralNode> {
    let mut out = Vec::new();
    let mut run: Vec<StructuralNode> = Vec::new();
    let flush = |run: &mut Vec<StructuralNode>, out: &mut Vec<StructuralNode>| {
        let blank = run
            .iter()
            .all(|node| node.plain_text().trim().is_empty() && !matches!(node, StructuralNode::Macro { .. }));
        let children = std::mem::take(run);
        if !blank {
            out.push(StructuralNode::Paragraph { children });
        }
    };
    for child in children {
        if child.is_inline() {
            run.push(child);
        } else {
            flush(&mut run, &mut out);
            out.push(child);
        }
    }
    flush(&mut run, &mut out);
    out
}

fn link_text(children: &[StructuralNode]) -> String {
    let text: String = children.iter().map(StructuralNode::plain_text).collect();
    text.trim().to_string()
}

/// Collapses each whitespace run to a single space, keeping text edges.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
