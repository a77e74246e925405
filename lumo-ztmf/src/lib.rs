//! # ZTMF parser
//!
//! Text-to-structure layer of Lumo: turns a ZTMF document into a meta
//! mapping, an optional inline stylesheet, an ordered body tree and the
//! list of components the page asks for.
//!
//! Parsing never fails. Unbalanced brackets and unmatched blocks degrade to
//! raw fragments so a half-written page still renders.
//!
//! ## Example
//! ```ignore
//! use lumo_ztmf::parse_document;
//!
//! let text = r#"
//! <meta> title="Home" style="main.css" </meta>
//! <body>
//!   cont { center[<h1>Hi</h1>], grid[<a href="x.ztmf">Go</a>] }
//!   components = theme{bottom-right}
//! </body>
//! "#;
//!
//! let doc = parse_document(text);
//! assert_eq!(doc.title(), Some("Home"));
//! assert_eq!(doc.components().len(), 1);
//! let html = doc.to_html();
//! ```

pub mod blocky;
pub mod components;
pub mod document;
pub mod error;
pub mod markup;
pub mod meta;
pub mod parser;
pub mod render;

// --- Core types ---
pub use components::{parse_component_spec, ComponentDeclaration};
pub use document::{split_document, RawDocument, ZtmfDocument};
pub use error::{ZtmfError, ZtmfResult};
pub use markup::{is_markup, scan_canvases, CanvasTag};
pub use meta::{extract_inline_style, parse_meta, parse_meta_block, Grammar, Meta};
pub use parser::{parse_body, BodySegment, ContentNode, ParsedBody};

/// File extension of ZTMF documents, without the dot.
pub const ZTMF_EXTENSION: &str = "ztmf";

/// Parse a ZTMF document (meta + body, either body grammar).
pub fn parse_document(text: &str) -> ZtmfDocument {
    parser::parse_document(text)
}

/// Parse a document and reject one with no recognizable section.
///
/// The structural check behind `ztmf check`; rendering never needs it.
pub fn parse_document_strict(text: &str) -> ZtmfResult<ZtmfDocument> {
    let raw = split_document(text);
    if raw.is_empty() {
        return Err(ZtmfError::EmptyDocument);
    }
    if !raw.meta_raw.is_empty() && raw.body_raw.is_empty() && !has_body_tag(text) {
        return Err(ZtmfError::MissingBody);
    }
    Ok(parser::parse_document(text))
}

fn has_body_tag(text: &str) -> bool {
    text.to_ascii_lowercase().contains("<body>")
}
