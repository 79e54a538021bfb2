// src/authoring/storage.rs
//! Markdown to Confluence storage format.

use super::markdown_options;
use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

/// Converts markdown to storage-format XHTML suitable for page bodies.
///
/// Fenced code becomes the `code` macro and task lists become native
/// Confluence task lists; everything else maps to plain XHTML.
pub fn markdown_to_storage(markdown: &str) -> String {
    let mut writer = StorageWriter::default();
    for event in Parser::new_ext(markdown, markdown_options()) {
        writer.handle(event);
    }
    writer.out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMode {
    Bulleted,
    Numbered,
    Task,
}

#[derive(Debug)]
struct ListState {
    ordered: bool,
    start: u64,
    /// Decided when the first item shows whether it carries a task marker.
    mode: Option<ListMode>,
    /// An item has started but its opening tag has not been written yet.
    pending_item: bool,
    /// A paragraph started inside the pending item.
    pending_paragraph: bool,
}

#[derive(Debug, Default)]
struct StorageWriter {
    out: String,
    lists: Vec<ListState>,
    code: Option<(Option<String>, String)>,
    image: Option<(String, String)>,
    in_table_head: bool,
    next_task_id: usize,
}

impl StorageWriter {
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
        if self.image.is_some() {
            match event {
                Event::Text(t) | Event::Code(t) => {
                    if let Some((_, alt)) = &mut self.image {
                        alt.push_str(&t);
                    }
                }
                Event::End(TagEnd::Image) => self.finish_image(),
                _ => {}
            }
            return;
        }

        if self.item_pending() {
            match &event {
                Event::TaskListMarker(checked) => {
                    self.open_item(Some(*checked));
                    return;
                }
                Event::Start(Tag::Paragraph) => {
                    if let Some(list) = self.lists.last_mut() {
                        list.pending_paragraph = true;
                    }
                    return;
                }
                _ => self.open_item(None),
            }
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.out.push_str(&escape(&text)),
            Event::Code(code) => {
                self.out.push_str("<code>");
                self.out.push_str(&escape(&code));
                self.out.push_str("</code>");
            }
            Event::Html(html) | Event::InlineHtml(html) => self.out.push_str(&html),
            Event::SoftBreak => self.out.push(' '),
            Event::HardBreak => self.out.push_str("<br />"),
            Event::Rule => self.out.push_str("<hr />"),
            Event::TaskListMarker(checked) => {
                self.out.push_str(if checked { "[x] " } else { "[ ] " })
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.out.push_str("<p>"),
            Tag::Heading { level, .. } => self.out.push_str(&format!("<h{}>", level as usize)),
            Tag::BlockQuote { .. } => self.out.push_str("<blockquote>"),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => self.lists.push(ListState {
                ordered: start.is_some(),
                start: start.unwrap_or(1),
                mode: None,
                pending_item: false,
                pending_paragraph: false,
            }),
            Tag::Item => {
                if let Some(list) = self.lists.last_mut() {
                    list.pending_item = true;
                    list.pending_paragraph = false;
                }
            }
            Tag::Table(_) => self.out.push_str("<table><tbody>"),
            Tag::TableHead => {
                self.in_table_head = true;
                self.out.push_str("<tr>");
            }
            Tag::TableRow => self.out.push_str("<tr>"),
            Tag::TableCell => self.out.push_str(if self.in_table_head { "<th>" } else { "<td>" }),
            Tag::Emphasis => self.out.push_str("<em>"),
            Tag::Strong => self.out.push_str("<strong>"),
            Tag::Strikethrough => self.out.push_str("<s>"),
            Tag::Link { dest_url, .. } => {
                self.out.push_str(&format!("<a href=\"{}\">", escape_attr(&dest_url)))
            }
            Tag::Image { dest_url, .. } => self.image = Some((dest_url.to_string(), String::new())),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.out.push_str("</p>"),
            TagEnd::Heading(level) => self.out.push_str(&format!("</h{}>", level as usize)),
            TagEnd::BlockQuote { .. } => self.out.push_str("</blockquote>"),
            TagEnd::List { .. } => {
                if let Some(list) = self.lists.pop() {
                    match list.mode {
                        Some(ListMode::Task) => self.out.push_str("</ac:task-list>"),
                        Some(ListMode::Numbered) => self.out.push_str("</ol>"),
                        Some(ListMode::Bulleted) => self.out.push_str("</ul>"),
                        None => {}
                    }
                }
            }
            TagEnd::Item => match self.lists.last().and_then(|l| l.mode) {
                Some(ListMode::Task) => self.out.push_str("</ac:task-body></ac:task>"),
                _ => self.out.push_str("</li>"),
            },
            TagEnd::Table => self.out.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.in_table_head = false;
                self.out.push_str("</tr>");
            }
            TagEnd::TableRow => self.out.push_str("</tr>"),
            TagEnd::TableCell => {
                self.out
                    .push_str(if self.in_table_head { "</th>" } else { "</td>" })
            }
            TagEnd::Emphasis => self.out.push_str("</em>"),
            TagEnd::Strong => self.out.push_str("</strong>"),
            TagEnd::Strikethrough => self.out.push_str("</s>"),
            TagEnd::Link => self.out.push_str("</a>"),
            _ => {}
        }
    }

    fn item_pending(&self) -> bool {
        self.lists.last().is_some_and(|list| list.pending_item)
    }

    /// Writes the opening tags of the pending item, deciding the list's mode
    /// if this is its first item.
    fn open_item(&mut self, task_marker: Option<bool>) {
        let Some(list) = self.lists.last_mut() else {
            return;
        };
        list.pending_item = false;

        if list.mode.is_none() {
            let mode = match (task_marker, list.ordered) {
                (Some(_), _) => ListMode::Task,
                (None, true) => ListMode::Numbered,
                (None, false) => ListMode::Bulleted,
            };
            list.mode = Some(mode);
            match mode {
                ListMode::Task => self.out.push_str("<ac:task-list>"),
                ListMode::Numbered if list.start != 1 => {
                    self.out.push_str(&format!("<ol start=\"{}\">", list.start))
                }
                ListMode::Numbered => self.out.push_str("<ol>"),
                ListMode::Bulleted => self.out.push_str("<ul>"),
            }
        }

        let pending_paragraph = std::mem::take(&mut list.pending_paragraph);
        match list.mode {
            Some(ListMode::Task) => {
                self.next_task_id += 1;
                let status = if task_marker == Some(true) {
                    "complete"
                } else {
                    "incomplete"
                };
                self.out.push_str(&format!(
                    "<ac:task><ac:task-id>{}</ac:task-id><ac:task-status>{}</ac:task-status><ac:task-body>",
                    self.next_task_id, status
                ));
            }
            _ => {
                self.out.push_str("<li>");
                if let Some(checked) = task_marker {
                    self.out.push_str(if checked { "[x] " } else { "[ ] " });
                }
            }
        }
        if pending_paragraph {
            self.out.push_str("<p>");
        }
    }

    fn finish_code(&mut self) {
        let Some((language, mut text)) = self.code.take() else {
            return;
        };
        if text.ends_with('\n') {
            text.pop();
        }
        self.out
            .push_str("<ac:structured-macro ac:name=\"code\">");
        if let Some(language) = language {
            self.out.push_str(&format!(
                "<ac:parameter ac:name=\"language\">{}</ac:parameter>",
                escape(&language)
            ));
        }
        self.out.push_str("<ac:plain-text-body>");
        self.out.push_str(&cdata(&text));
        self.out
            .push_str("</ac:plain-text-body></ac:structured-macro>");
    }

    fn finish_image(&mut self) {
        let Some((url, alt)) = self.image.take() else {
            return;
        };
        if alt.is_empty() {
            self.out.push_str("<ac:image>");
        } else {
            self.out
                .push_str(&format!("<ac:image ac:alt=\"{}\">", escape_attr(&alt)));
        }
        self.out.push_str(&format!(
            "<ri:url ri:value=\"{}\" /></ac:image>",
            escape_attr(&url)
        ));
    }
}

/// Wraps text in CDATA, splitting any `]]>` it contains.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape(text).replace('"', "&quot;")
}
