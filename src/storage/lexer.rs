// src/storage/lexer.rs
//! Tolerant tokenizer for storage-format markup.
//!
//! The lexer never fails. Constructs it cannot make sense of are emitted as
//! text, and anything unterminated runs to the end of input with an issue
//! recorded for diagnostics.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use thiserror::Error;

static ATTRIBUTE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

/// Problems noticed while reading markup. None of them stop parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkupIssue {
    #[error("element <{name}> opened at byte {offset} was never closed")]
    UnclosedElement { name: String, offset: usize },

    #[error("closing tag </{name}> at byte {offset} has no matching element")]
    StrayClosingTag { name: String, offset: usize },

    #[error("{construct} starting at byte {offset} is not terminated")]
    UnterminatedConstruct {
        construct: &'static str,
        offset: usize,
    },

    #[error("elements nested deeper than {limit} levels from byte {offset} were flattened")]
    NestingTooDeep { limit: usize, offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// Start tag. `name` is lowercased; attribute names keep their case.
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    /// Raw text, entities not yet decoded.
    Text(&'a str),
    /// CDATA section contents, verbatim.
    CData(&'a str),
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Byte range of the token in the source.
    pub span: Range<usize>,
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    issues: Vec<MarkupIssue>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            issues: Vec::new(),
        }
    }

    /// Issues recorded so far.
    pub fn take_issues(&mut self) -> Vec<MarkupIssue> {
        std::mem::take(&mut self.issues)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn emit(&mut self, kind: TokenKind<'a>, end: usize) -> Token<'a> {
        let span = self.pos..end;
        self.pos = end;
        Token { kind, span }
    }

    /// Text up to the next `<` after the current position, which may itself
    /// be a `<` that could not start markup.
    fn text_from(&mut self, skip: usize) -> Token<'a> {
        let start = self.pos;
        let end = self.source[start + skip..]
            .find('<')
            .map(|i| start + skip + i)
            .unwrap_or(self.source.len());
        self.emit(TokenKind::Text(&self.source[start..end]), end)
    }

    fn unterminated(&mut self, construct: &'static str) {
        self.issues.push(MarkupIssue::UnterminatedConstruct {
            construct,
            offset: self.pos,
        });
    }

    fn lex_comment(&mut self) -> Token<'a> {
        let end = match self.rest()[4..].find("-->") {
            Some(i) => self.pos + 4 + i + 3,
            None => {
                self.unterminated("comment");
                self.source.len()
            }
        };
        self.emit(TokenKind::Comment, end)
    }

    fn lex_cdata(&mut self) -> Token<'a> {
        let body_start = self.pos + 9;
        let (body_end, end) = match self.source[body_start..].find("]]>") {
            Some(i) => (body_start + i, body_start + i + 3),
            None => {
                self.unterminated("CDATA section");
                (self.source.len(), self.source.len())
            }
        };
        let body = &self.source[body_start..body_end];
        self.emit(TokenKind::CData(body), end)
    }

    /// `<!DOCTYPE ...>` and `<?xml ...?>` carry nothing we render.
    fn lex_declaration(&mut self) -> Token<'a> {
        let end = match self.rest().find('>') {
            Some(i) => self.pos + i + 1,
            None => {
                self.unterminated("declaration");
                self.source.len()
            }
        };
        self.emit(TokenKind::Comment, end)
    }

    fn lex_close(&mut self) -> Token<'a> {
        let rest = self.rest();
        let name_len = tag_name_len(&rest[2..]);
        if name_len == 0 {
            return self.text_from(1);
        }
        let name = rest[2..2 + name_len].to_ascii_lowercase();
        match rest[2 + name_len..].find('>') {
            Some(i) => {
                let end = self.pos + 2 + name_len + i + 1;
                self.emit(TokenKind::Close { name }, end)
            }
            None => {
                self.unterminated("closing tag");
                self.text_from(1)
            }
        }
    }

    fn lex_open(&mut self) -> Token<'a> {
        let rest = self.rest();
        let name_len = tag_name_len(&rest[1..]);
        if name_len == 0 {
            return self.text_from(1);
        }
        let name = rest[1..1 + name_len].to_ascii_lowercase();
        let after_name = &rest[1 + name_len..];

        let Some(tag_end) = find_tag_end(after_name) else {
            self.unterminated("start tag");
            return self.text_from(1);
        };

        let inner = &after_name[..tag_end];
        let self_closing = inner.trim_end().ends_with('/');
        let attrs = parse_attributes(inner.trim_end().trim_end_matches('/'));
        let end = self.pos + 1 + name_len + tag_end + 1;
        self.emit(
            TokenKind::Open {
                name,
                attrs,
                self_closing,
            },
            end,
        )
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let token = if !rest.starts_with('<') {
            self.text_from(0)
        } else if rest.starts_with("<!--") {
            self.lex_comment()
        } else if rest.starts_with("<![CDATA[") {
            self.lex_cdata()
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            self.lex_declaration()
        } else if rest.starts_with("</") {
            self.lex_close()
        } else {
            self.lex_open()
        };
        Some(token)
    }
}

/// Length of a tag name at the start of `s`, or 0 if `s` does not start one.
fn tag_name_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.')))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Index of the `>` ending a start tag, skipping quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (None, '<') => return None,
            _ => {}
        }
    }
    None
}

fn parse_attributes(s: &str) -> Vec<(String, String)> {
    ATTRIBUTE_PATTERN
        .captures_iter(s)
        .map(|caps| {
            let name = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| super::entities::decode_entities(m.as_str()).into_owned())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}
