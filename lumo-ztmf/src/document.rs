use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::components::{parse_component_spec, ComponentDeclaration};
use crate::meta::Meta;
use crate::parser::ParsedBody;
use crate::render;

/// The two raw segments of a ZTMF document, both trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    pub meta_raw: String,
    pub body_raw: String,
}

impl RawDocument {
    pub fn is_empty(&self) -> bool {
        self.meta_raw.is_empty() && self.body_raw.is_empty()
    }
}

/// Extract the first `<meta>...</meta>` and `<body>...</body>` spans.
///
/// A missing section yields an empty segment.
pub fn split_document(text: &str) -> RawDocument {
    static META: OnceLock<Regex> = OnceLock::new();
    static BODY: OnceLock<Regex> = OnceLock::new();

    let meta = META.get_or_init(|| Regex::new(r"(?is)<meta>(.*?)</meta>").unwrap());
    let body = BODY.get_or_init(|| Regex::new(r"(?is)<body>(.*?)</body>").unwrap());

    let segment = |re: &Regex| {
        re.captures(text)
            .map(|caps| caps[1].trim().to_string())
            .unwrap_or_default()
    };

    RawDocument {
        meta_raw: segment(meta),
        body_raw: segment(body),
    }
}

/// A fully parsed ZTMF document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZtmfDocument {
    pub meta: Meta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_style: Option<String>,
    pub body: ParsedBody,
}

impl ZtmfDocument {
    /// Declarations of the trailing `components = ...` list, in source order.
    pub fn components(&self) -> Vec<ComponentDeclaration> {
        self.body
            .components_spec
            .as_deref()
            .map(parse_component_spec)
            .unwrap_or_default()
    }

    /// Markup for the main content area.
    pub fn to_html(&self) -> String {
        render::body_to_html(&self.body)
    }

    pub fn title(&self) -> Option<&str> {
        self.meta.title()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_both_sections() {
        let raw = split_document("<META> title=x </Meta>\n<body>\n cont{ a } \n</BODY>");
        assert_eq!(raw.meta_raw, "title=x");
        assert_eq!(raw.body_raw, "cont{ a }");
    }

    #[test]
    fn test_split_missing_sections() {
        let raw = split_document("<body>only</body>");
        assert_eq!(raw.meta_raw, "");
        assert_eq!(raw.body_raw, "only");

        let raw = split_document("plain text");
        assert!(raw.is_empty());
    }

    #[test]
    fn test_split_takes_first_span() {
        let raw = split_document("<body>one</body><body>two</body>");
        assert_eq!(raw.body_raw, "one");
    }
}
