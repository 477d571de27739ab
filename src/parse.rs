//! Markup parser.
//!
//! Turns template text into an attributed tree of elements. Tokens come from
//! the html5ever tokenizer; the tree is built from the tag stream alone, so
//! elements nest exactly as written. No HTML5 tree-construction rules apply:
//! nothing is reparented, implied or moved into template contents.
//!
//! Text, comments and doctypes are dropped, as are `<script>` and `<style>`
//! elements with their contents. Parsing never fails outright: problems are
//! collected as error strings next to whatever tree could be built.

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tendril::StrTendril;

lazy_static! {
    /// HTML void elements - never closed, never hold children.
    static ref VOID_TAGS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("area");
        s.insert("base");
        s.insert("br");
        s.insert("col");
        s.insert("embed");
        s.insert("hr");
        s.insert("img");
        s.insert("input");
        s.insert("link");
        s.insert("meta");
        s.insert("param");
        s.insert("source");
        s.insert("track");
        s.insert("wbr");
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTED TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<MarkupAttribute>,
    #[serde(default)]
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &[MarkupAttribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[MarkupNode] {
        &self.children
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkupTree {
    pub nodes: Vec<MarkupNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseOutput {
    pub tree: MarkupTree,
    pub errors: Vec<String>,
}

impl ParseOutput {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(tag.to_ascii_lowercase().as_str())
}

/// Elements dropped together with their contents.
fn raw_text_kind(tag: &str) -> Option<RawKind> {
    match tag {
        "script" => Some(RawKind::ScriptData),
        "style" => Some(RawKind::Rawtext),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE CASING
// ═══════════════════════════════════════════════════════════════════════════════

/// Start-tag names in source order, as written. The tokenizer lowercases tag
/// names, so component tags like `<MyDiv>` get their casing back from here.
/// Quoted attribute values and script/style bodies are skipped so a `<`
/// inside them is not taken for a tag.
fn source_tag_names(text: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &text[i..];
        if rest.starts_with("<!--") {
            i += rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }

        let start = i + 1;
        if !bytes.get(start).is_some_and(|b| b.is_ascii_alphabetic()) {
            i += 1;
            continue;
        }
        let mut end = start;
        while end < bytes.len() && !matches!(bytes[end], b'/' | b'>') && !bytes[end].is_ascii_whitespace() {
            end += 1;
        }
        let name = &text[start..end];
        names.push(name.to_string());
        i = skip_tag(bytes, end);

        let lower = name.to_ascii_lowercase();
        if raw_text_kind(&lower).is_some() {
            let close = format!("</{}", lower);
            i += text[i..].to_ascii_lowercase().find(&close).unwrap_or(text.len() - i);
        }
    }
    names
}

/// Index just past the `>` ending the tag whose attributes start at `i`.
fn skip_tag(bytes: &[u8], mut i: usize) -> usize {
    let mut quote: Option<u8> = None;
    let mut after_eq = false;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'>' => return i + 1,
                b'"' | b'\'' if after_eq => quote = Some(b),
                b'=' => {
                    after_eq = true;
                    i += 1;
                    continue;
                }
                _ if b.is_ascii_whitespace() => {
                    i += 1;
                    continue;
                }
                _ => {}
            },
        }
        after_eq = false;
        i += 1;
    }
    i
}

// ═══════════════════════════════════════════════════════════════════════════════
// TREE BUILDING
// ═══════════════════════════════════════════════════════════════════════════════

/// Token sink that nests elements by matching start and end tags.
struct MarkupSink {
    source_names: std::vec::IntoIter<String>,
    open: Vec<MarkupNode>,
    nodes: Vec<MarkupNode>,
    errors: Vec<String>,
}

impl MarkupSink {
    fn new(source_names: Vec<String>) -> Self {
        MarkupSink {
            source_names: source_names.into_iter(),
            open: Vec::new(),
            nodes: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn cased_name(&mut self, name: &str) -> String {
        match self.source_names.next() {
            Some(source) if source.eq_ignore_ascii_case(name) => source,
            _ => name.to_string(),
        }
    }

    fn process_tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        match tag.kind {
            TagKind::StartTag => {
                let cased = self.cased_name(&name);
                if let Some(kind) = raw_text_kind(&name) {
                    return TokenSinkResult::RawData(kind);
                }
                let node = MarkupNode {
                    tag: cased,
                    attributes: tag
                        .attrs
                        .iter()
                        .map(|attr| MarkupAttribute {
                            name: attr.name.local.to_string(),
                            value: attr.value.to_string(),
                        })
                        .collect(),
                    children: Vec::new(),
                };
                if tag.self_closing || is_void(&name) {
                    self.append(node);
                } else {
                    self.open.push(node);
                }
            }
            TagKind::EndTag => {
                if !is_void(&name) && raw_text_kind(&name).is_none() {
                    self.close(&name);
                }
            }
        }
        TokenSinkResult::Continue
    }

    /// Close the innermost open element named `name`, closing anything still
    /// open inside it first.
    fn close(&mut self, name: &str) {
        let Some(pos) = self
            .open
            .iter()
            .rposition(|node| node.tag.eq_ignore_ascii_case(name))
        else {
            self.errors.push(format!("unexpected closing tag </{}>", name));
            return;
        };
        for unclosed in &self.open[pos + 1..] {
            self.errors.push(format!(
                "element <{}> is never closed",
                unclosed.tag.to_ascii_lowercase()
            ));
        }
        while self.open.len() > pos {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(node) = self.open.pop() {
            self.append(node);
        }
    }

    fn append(&mut self, node: MarkupNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.nodes.push(node),
        }
    }

    fn finish(mut self) -> ParseOutput {
        for unclosed in &self.open {
            self.errors.push(format!(
                "element <{}> is never closed",
                unclosed.tag.to_ascii_lowercase()
            ));
        }
        while !self.open.is_empty() {
            self.pop();
        }
        ParseOutput {
            tree: MarkupTree { nodes: self.nodes },
            errors: self.errors,
        }
    }
}

impl TokenSink for MarkupSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => self.process_tag(tag),
            Token::ParseError(message) => {
                self.errors.push(format!("line {}: {}", line_number, message));
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Parse markup text into an attributed tree plus any errors found.
pub fn parse_markup(text: &str) -> ParseOutput {
    let sink = MarkupSink::new(source_tag_names(text));
    let mut tokenizer = Tokenizer::new(sink, TokenizerOpts::default());

    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(text));
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    tokenizer.sink.finish()
}
