//! The "blocky" body grammar: `name{...}` and `name[...]` may appear anywhere
//! and nest freely. Spans are expanded innermost-first, one per step, until
//! nothing matches or the iteration budget runs out.

use crate::parser::is_ident_byte;

/// Upper bound on expansions for a single body. Malformed input stops here.
pub const BLOCKY_ITERATION_BUDGET: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockyOutcome {
    pub html: String,
    pub replacements: usize,
    /// The budget ran out before the text stopped changing.
    pub exhausted: bool,
}

struct InnermostSpan {
    start: usize,
    name_end: usize,
    inner_start: usize,
    inner_end: usize,
    end: usize,
}

/// Expand every named span of `text` into a generic container.
pub fn expand_blocky(text: &str) -> BlockyOutcome {
    expand_blocky_with_budget(text, BLOCKY_ITERATION_BUDGET)
}

pub fn expand_blocky_with_budget(text: &str, budget: usize) -> BlockyOutcome {
    let mut html = text.to_string();
    let mut replacements = 0;

    while replacements < budget {
        let Some(span) = find_innermost_span(&html) else {
            return BlockyOutcome {
                html,
                replacements,
                exhausted: false,
            };
        };

        let name = &html[span.start..span.name_end];
        let inner = trim_separators(&html[span.inner_start..span.inner_end]);
        let container = format!("<div class=\"{}\">{}</div>", name, inner);

        let rest = if is_enclosed(&html[..span.start]) {
            skip_separator(&html, span.end)
        } else {
            span.end
        };
        html = format!("{}{}{}", &html[..span.start], container, &html[rest..]);
        replacements += 1;
    }

    let exhausted = find_innermost_span(&html).is_some();
    BlockyOutcome {
        html,
        replacements,
        exhausted,
    }
}

/// First `name{...}` / `name[...]` whose content holds no further delimiter.
///
/// Bare or mismatched pairs are skipped over.
fn find_innermost_span(text: &str) -> Option<InnermostSpan> {
    let bytes = text.as_bytes();
    let mut open: Option<(usize, u8)> = None;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'{' | b'[' => open = Some((i, b)),
            b'}' | b']' => {
                let candidate = open.take();
                let Some((o, opener)) = candidate else {
                    continue;
                };
                let matches = (opener == b'{' && b == b'}') || (opener == b'[' && b == b']');
                if !matches {
                    continue;
                }

                let mut name_end = o;
                while name_end > 0 && bytes[name_end - 1].is_ascii_whitespace() {
                    name_end -= 1;
                }
                let mut start = name_end;
                while start > 0 && is_ident_byte(bytes[start - 1]) {
                    start -= 1;
                }
                if start == name_end {
                    continue;
                }

                return Some(InnermostSpan {
                    start,
                    name_end,
                    inner_start: o + 1,
                    inner_end: i,
                    end: i + 1,
                });
            }
            _ => {}
        }
    }

    None
}

fn trim_separators(inner: &str) -> &str {
    inner
        .trim()
        .trim_start_matches(',')
        .trim_end_matches(',')
        .trim()
}

/// Whether `prefix` leaves a `{` or `[` open.
fn is_enclosed(prefix: &str) -> bool {
    let mut depth = 0usize;
    for b in prefix.bytes() {
        match b {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth > 0
}

/// Consume one separator comma (and the whitespace before it) after a span.
fn skip_separator(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    let trimmed = rest.trim_start();
    if trimmed.starts_with(',') {
        from + (rest.len() - trimmed.len()) + 1
    } else {
        from
    }
}
