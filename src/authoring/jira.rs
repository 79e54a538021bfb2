// src/authoring/jira.rs
//! Markdown to Jira wiki markup.

use super::markdown_options;
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use regex::Regex;

static EXCESS_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

/// Converts markdown to Jira wiki markup for descriptions and comments.
pub fn markdown_to_jira(markdown: &str) -> String {
    let mut writer = JiraWriter::default();
    for event in Parser::new_ext(markdown, markdown_options()) {
        writer.handle(event);
    }
    let collapsed = EXCESS_BLANK_LINES.replace_all(&writer.out, "\n\n");
    collapsed.trim().to_string()
}

#[derive(Debug, Default)]
struct JiraWriter {
    out: String,
    /// `true` for ordered lists, innermost last.
    lists: Vec<bool>,
    quote_depth: usize,
    code: Option<(Option<String>, String)>,
    link: Option<String>,
    link_text: String,
    in_table_head: bool,
}

impl JiraWriter {
    fn handle(&mut self, event: Event<'_>) {
        if self.code.is_some() {
            match event {
                Event::Text(t) => {
                    if let Some((_, text)) = &mut self.code {
                        text.push_str(&t);
                    }
                }
                Event::End(TagEnd::CodeBlock) => self.finish_code(),
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.write(&text),
            Event::Code(code) => {
                let span = format!("{{{{{code}}}}}");
                self.write(&span);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.write(&html),
            Event::SoftBreak => self.write("\n"),
            Event::HardBreak => self.write("\\\\\n"),
            Event::Rule => {
                self.blank_line();
                self.out.push_str("----");
                self.blank_line();
            }
            Event::TaskListMarker(checked) => self.write(if checked { "(/) " } else { "(x) " }),
            _ => {}
        }
    }

    /// Writes inline text, into the pending link label when inside a link.
    fn write(&mut self, text: &str) {
        if self.link.is_some() {
            self.link_text.push_str(text);
        } else {
            self.out.push_str(text);
        }
    }

    fn newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn blank_line(&mut self) {
        if self.out.is_empty() || self.out.ends_with("{quote}\n") {
            return;
        }
        self.newline();
        if !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Tag::Heading { level, .. } => {
                self.blank_line();
                self.out.push_str(&format!("h{}. ", level as usize));
            }
            Tag::BlockQuote { .. } => {
                self.blank_line();
                self.quote_depth += 1;
                if self.quote_depth == 1 {
                    self.out.push_str("{quote}\n");
                }
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
                self.lists.push(start.is_some());
            }
            Tag::Item => {
                self.newline();
                let prefix: String = self
                    .lists
                    .iter()
                    .map(|ordered| if *ordered { '#' } else { '*' })
                    .collect();
                self.out.push_str(&prefix);
                self.out.push(' ');
            }
            Tag::Table(_) => self.blank_line(),
            Tag::TableHead => self.in_table_head = true,
            Tag::TableRow => self.newline(),
            Tag::TableCell => self.out.push_str(if self.in_table_head { "||" } else { "|" }),
            Tag::Emphasis => self.write("_"),
            Tag::Strong => self.write("*"),
            Tag::Strikethrough => self.write("-"),
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.link_text.clear();
            }
            Tag::Image { dest_url, .. } => self.write(&format!("!{dest_url}!")),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => self.blank_line(),
            TagEnd::BlockQuote { .. } => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 {
                    while self.out.ends_with('\n') {
                        self.out.pop();
                    }
                    self.out.push_str("\n{quote}");
                    self.blank_line();
                }
            }
            TagEnd::List { .. } => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::TableHead => {
                // Header cells close with a trailing `||`.
                self.out.push_str("||");
                self.in_table_head = false;
            }
            TagEnd::TableRow => self.out.push('|'),
            TagEnd::Table => self.blank_line(),
            TagEnd::Emphasis => self.write("_"),
            TagEnd::Strong => self.write("*"),
            TagEnd::Strikethrough => self.write("-"),
            TagEnd::Link => {
                if let Some(url) = self.link.take() {
                    let text = std::mem::take(&mut self.link_text);
                    let link = if text.is_empty() || text == url {
                        format!("[{url}]")
                    } else {
                        format!("[{text}|{url}]")
                    };
                    self.write(&link);
                }
            }
            _ => {}
        }
    }

    fn finish_code(&mut self) {
        let Some((language, text)) = self.code.take() else {
            return;
        };
        self.blank_line();
        match language {
            Some(language) => self.out.push_str(&format!("{{code:{language}}}\n")),
            None => self.out.push_str("{code}\n"),
        }
        self.out.push_str(&text);
        self.newline();
        self.out.push_str("{code}");
        self.blank_line();
    }
}
