//! Converts a parsed ZTMF body to HTML.
//! Fragments are inserted verbatim; no sanitization happens here.

use std::fmt::Write;

use crate::document::ZtmfDocument;
use crate::parser::{BodySegment, ContentNode, ParsedBody};

/// Markup for the main content area, wrapped in `.lumo-body`.
pub fn body_to_html(body: &ParsedBody) -> String {
    let mut out = String::from(r#"<div class="lumo-body">"#);
    for segment in &body.segments {
        segment_to_html(segment, &mut out);
    }
    out.push_str("</div>");
    out
}

fn segment_to_html(segment: &BodySegment, out: &mut String) {
    match segment {
        BodySegment::Markup { html } => out.push_str(html),
        BodySegment::Cont { nodes } => {
            out.push_str(r#"<div class="cont">"#);
            for node in nodes {
                node_to_html(node, out);
            }
            out.push_str("</div>");
        }
        BodySegment::Container { name, inner } => {
            let _ = write!(out, r#"<div class="{}">{}</div>"#, name, inner);
        }
    }
}

/// One node of a cont construct. Header blocks are followed by a line break;
/// every block gets its own container, so repeated names never merge.
pub fn node_to_html(node: &ContentNode, out: &mut String) {
    match node {
        ContentNode::Break => out.push_str("<br>"),
        ContentNode::RawFragment { html } => out.push_str(html),
        ContentNode::Block { name, inner_raw } => {
            let lowered = name.to_lowercase();
            let _ = match lowered.as_str() {
                "center" | "left" | "right" => write!(
                    out,
                    r#"<div class="cont-header-{}">{}</div><br>"#,
                    lowered, inner_raw
                ),
                "grid" => write!(out, r#"<div class="cont-links cont-grid">{}</div>"#, inner_raw),
                "column" => write!(
                    out,
                    r#"<div class="cont-links cont-column">{}</div>"#,
                    inner_raw
                ),
                _ => write!(out, r#"<div class="{}">{}</div>"#, name, inner_raw),
            };
        }
    }
}

/// Standalone page: title, inline style and body. Used by the CLI.
pub fn document_to_page(doc: &ZtmfDocument) -> String {
    let title = doc.title().unwrap_or("ZTMF");
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
"#,
        escape_html(title)
    );
    for href in doc.meta.stylesheets() {
        let _ = writeln!(html, r#"<link rel="stylesheet" href="{}">"#, escape_html(href));
    }
    if let Some(css) = &doc.inline_style {
        let _ = writeln!(html, r#"<style id="lumo-inline-style">{}</style>"#, css);
    }
    let _ = write!(
        html,
        "</head>\n<body>\n<div id=\"app\">{}</div>\n</body>\n</html>\n",
        doc.to_html()
    );
    html
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
