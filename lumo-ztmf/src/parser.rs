use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

use crate::blocky::expand_blocky;
use crate::document::{split_document, ZtmfDocument};
use crate::meta::{parse_meta_block, Grammar};

/// One item inside a `cont { ... }` construct, in rendering order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentNode {
    Break,
    RawFragment { html: String },
    Block { name: String, inner_raw: String },
}

/// Top-level structure of a parsed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodySegment {
    /// Text passed through untouched.
    Markup { html: String },
    Cont { nodes: Vec<ContentNode> },
    /// `name { inner }` outside of the cont construct.
    Container { name: String, inner: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedBody {
    pub grammar: Grammar,
    pub segments: Vec<BodySegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components_spec: Option<String>,
}

// ─── Public parse functions ──────────────────────────────────────────────────

/// Parse a complete ZTMF document. Never fails; malformed input degrades.
pub fn parse_document(text: &str) -> ZtmfDocument {
    let raw = split_document(text);
    let (meta, inline_style) = parse_meta_block(&raw.meta_raw);
    let body = parse_body(&raw.body_raw, meta.grammar());
    ZtmfDocument {
        meta,
        inline_style,
        body,
    }
}

/// Parse a body segment with the requested grammar.
pub fn parse_body(body_raw: &str, grammar: Grammar) -> ParsedBody {
    match grammar {
        Grammar::Cont => parse_cont_body(body_raw),
        Grammar::Blocky => parse_blocky_body(body_raw),
    }
}

/// Default grammar: one `cont { ... }` construct plus generic containers around it.
pub fn parse_cont_body(body_raw: &str) -> ParsedBody {
    let (body, components_spec) = split_components_spec(body_raw);
    let mut segments = Vec::new();

    match find_cont(&body) {
        Some(cont) => {
            segments.extend(generic_segments(&body[..cont.start]));
            segments.push(BodySegment::Cont {
                nodes: tokenize_cont(body[cont.inner_start..cont.inner_end].trim()),
            });
            segments.extend(generic_segments(&body[cont.end..]));
        }
        None => segments.extend(generic_segments(&body)),
    }

    ParsedBody {
        grammar: Grammar::Cont,
        segments,
        components_spec,
    }
}

/// Alternate grammar: nested `name{...}` / `name[...]` spans anywhere.
pub fn parse_blocky_body(body_raw: &str) -> ParsedBody {
    let (body, components_spec) = split_components_spec(body_raw);
    let outcome = expand_blocky(&body);
    if outcome.exhausted {
        debug!(
            replacements = outcome.replacements,
            "blocky expansion budget exhausted, keeping partial markup"
        );
    }
    let html = outcome.html.trim();

    let segments = if html.is_empty() {
        Vec::new()
    } else {
        vec![BodySegment::Markup {
            html: html.to_string(),
        }]
    };

    ParsedBody {
        grammar: Grammar::Blocky,
        segments,
        components_spec,
    }
}

/// Cut the trailing `components = ...` declaration off a body.
///
/// Everything from the first `components =` to the end of the body is the
/// component spec.
pub fn split_components_spec(body_raw: &str) -> (String, Option<String>) {
    static COMPONENTS: OnceLock<Regex> = OnceLock::new();
    let re = COMPONENTS.get_or_init(|| Regex::new(r"(?is)components\s*=\s*(.*)$").unwrap());

    match re.captures(body_raw) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.start()).unwrap_or(body_raw.len());
            let spec = caps[1].trim();
            let spec = (!spec.is_empty()).then(|| spec.to_string());
            (body_raw[..whole].trim().to_string(), spec)
        }
        None => (body_raw.trim().to_string(), None),
    }
}

// ─── cont construct ──────────────────────────────────────────────────────────

struct ContSpan {
    start: usize,
    inner_start: usize,
    inner_end: usize,
    end: usize,
}

/// Locate the first `cont {` and its matching `}`.
///
/// An unbalanced construct extends to the end of the body.
fn find_cont(body: &str) -> Option<ContSpan> {
    static CONT_OPEN: OnceLock<Regex> = OnceLock::new();
    let re = CONT_OPEN.get_or_init(|| Regex::new(r"(?i)cont\s*\{").unwrap());

    let open = re
        .find_iter(body)
        .find(|m| !body[..m.start()].bytes().last().is_some_and(is_ident_byte))?;

    let inner_start = open.end();
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut j = inner_start;
    while j < bytes.len() {
        match bytes[j] {
            b'{' => depth += 1,
            b'}' if depth == 0 => {
                return Some(ContSpan {
                    start: open.start(),
                    inner_start,
                    inner_end: j,
                    end: j + 1,
                });
            }
            b'}' => depth -= 1,
            _ => {}
        }
        j += 1;
    }

    Some(ContSpan {
        start: open.start(),
        inner_start,
        inner_end: body.len(),
        end: body.len(),
    })
}

/// Result of trying to read `name[...]` at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockScan<'a> {
    NotABlock,
    /// `name[` with no matching `]` before the end of input.
    Unclosed,
    Closed(BlockSpan<'a>),
}

/// A balanced `name[...]` span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSpan<'a> {
    pub name: &'a str,
    /// Text between the outer brackets, untrimmed.
    pub inner: &'a str,
    pub start: usize,
    /// Byte offset just past the closing bracket.
    pub end: usize,
}

/// Read a block starting at `start`: identifier, optional whitespace, `[`,
/// then everything up to the bracket that brings the depth back to zero.
pub fn scan_block(input: &str, start: usize) -> BlockScan<'_> {
    let bytes = input.as_bytes();
    let mut i = start;
    while i < bytes.len() && is_ident_byte(bytes[i]) {
        i += 1;
    }
    if i == start {
        return BlockScan::NotABlock;
    }
    let name = &input[start..i];

    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'[' {
        return BlockScan::NotABlock;
    }

    let inner_start = i + 1;
    let mut depth = 0usize;
    let mut j = inner_start;
    while j < bytes.len() {
        match bytes[j] {
            b'[' => depth += 1,
            b']' if depth == 0 => {
                return BlockScan::Closed(BlockSpan {
                    name,
                    inner: &input[inner_start..j],
                    start,
                    end: j + 1,
                });
            }
            b']' => depth -= 1,
            _ => {}
        }
        j += 1;
    }

    BlockScan::Unclosed
}

/// Split the inside of `cont { ... }` into ordered nodes.
pub fn tokenize_cont(inner: &str) -> Vec<ContentNode> {
    let bytes = inner.as_bytes();
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < inner.len() {
        let Some(ch) = inner[i..].chars().next() else {
            break;
        };
        if ch.is_whitespace() {
            i += ch.len_utf8();
            continue;
        }

        if inner[i..]
            .get(..4)
            .is_some_and(|s| s.eq_ignore_ascii_case("<br>"))
        {
            nodes.push(ContentNode::Break);
            i += 4;
            continue;
        }

        match scan_block(inner, i) {
            BlockScan::Closed(block) => {
                nodes.push(ContentNode::Block {
                    name: block.name.to_string(),
                    inner_raw: block.inner.trim().to_string(),
                });
                i = block.end;
                if bytes.get(i) == Some(&b',') {
                    i += 1;
                }
                continue;
            }
            BlockScan::Unclosed => {
                push_raw(&mut nodes, &inner[i..]);
                break;
            }
            BlockScan::NotABlock => {}
        }

        match find_top_level_comma(inner, i) {
            Some(comma) => {
                push_raw(&mut nodes, &inner[i..comma]);
                i = comma + 1;
            }
            None => {
                push_raw(&mut nodes, &inner[i..]);
                break;
            }
        }
    }

    nodes
}

fn push_raw(nodes: &mut Vec<ContentNode>, text: &str) {
    let html = text.trim();
    if !html.is_empty() {
        nodes.push(ContentNode::RawFragment {
            html: html.to_string(),
        });
    }
}

/// Next comma at or after `from` that is not inside an open `[...]` span.
fn find_top_level_comma(input: &str, from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, b) in input.as_bytes()[from..].iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => return Some(from + offset),
            _ => {}
        }
    }
    None
}

// ─── generic containers ──────────────────────────────────────────────────────

/// `name { inner }` spans (first `}` closes) become containers; the text in
/// between is kept as markup.
fn generic_segments(text: &str) -> Vec<BodySegment> {
    static GENERIC: OnceLock<Regex> = OnceLock::new();
    let re = GENERIC
        .get_or_init(|| Regex::new(r"(?s)([a-zA-Z0-9_-]+)\s*\{\s*(.*?)\s*\}").unwrap());

    let mut segments = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_markup(&mut segments, &text[last..whole.start()]);
        segments.push(BodySegment::Container {
            name: caps[1].to_string(),
            inner: caps[2].trim().to_string(),
        });
        last = whole.end();
    }
    push_markup(&mut segments, &text[last..]);
    segments
}

fn push_markup(segments: &mut Vec<BodySegment>, text: &str) {
    if !text.trim().is_empty() {
        segments.push(BodySegment::Markup {
            html: text.to_string(),
        });
    }
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}
