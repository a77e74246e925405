use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Key/value header of a ZTMF document.
///
/// Quoted pairs (`key="value"`) are collected first; unquoted pairs
/// (`key=value`) only fill keys the quoted pass left absent. A later quoted
/// pair overwrites an earlier one, an unquoted pair never overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Meta {
    entries: BTreeMap<String, String>,
}

/// Body grammar requested by the meta block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    #[default]
    Cont,
    Blocky,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title").filter(|t| !t.is_empty())
    }

    pub fn icon(&self) -> Option<&str> {
        self.get("icon").filter(|i| !i.is_empty())
    }

    /// External stylesheets from the comma-separated `style` key.
    pub fn stylesheets(&self) -> Vec<&str> {
        self.get("style")
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Lowercased `type` key (`main`, `other`, `html`, ...).
    pub fn page_type(&self) -> Option<String> {
        self.get("type").map(|t| t.to_lowercase())
    }

    /// Where a `type=html` document wants to send the browser.
    pub fn redirect_target(&self) -> Option<&str> {
        ["href", "url", "link"]
            .iter()
            .find_map(|k| self.get(k).filter(|v| !v.is_empty()))
    }

    /// `rmb_menu` set to false/0/no/off disables the context menu.
    pub fn context_menu_disabled(&self) -> bool {
        self.get("rmb_menu")
            .map(|v| matches!(v.to_lowercase().as_str(), "false" | "0" | "no" | "off"))
            .unwrap_or(false)
    }

    pub fn grammar(&self) -> Grammar {
        let requested = ["grammar", "syntax", "mode"]
            .iter()
            .find_map(|k| self.get(k));
        match requested {
            Some(g) if g.eq_ignore_ascii_case("blocky") => Grammar::Blocky,
            _ => Grammar::Cont,
        }
    }
}

fn quoted_pair_regex() -> &'static Regex {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    QUOTED.get_or_init(|| Regex::new(r#"([a-zA-Z0-9_-]+)\s*=\s*"([^"]*)""#).unwrap())
}

fn unquoted_pair_regex() -> &'static Regex {
    static UNQUOTED: OnceLock<Regex> = OnceLock::new();
    UNQUOTED.get_or_init(|| Regex::new(r#"([a-zA-Z0-9_-]+)\s*=\s*([^\s"']+)"#).unwrap())
}

/// Parse the key/value pairs of a meta segment.
pub fn parse_meta(meta_raw: &str) -> Meta {
    let mut meta = Meta::new();

    for caps in quoted_pair_regex().captures_iter(meta_raw) {
        meta.insert(&caps[1], &caps[2]);
    }

    for caps in unquoted_pair_regex().captures_iter(meta_raw) {
        if !meta.contains_key(&caps[1]) {
            meta.insert(&caps[1], &caps[2]);
        }
    }

    meta
}

/// Extract the `style { ... }` payload of a meta segment.
///
/// A construct closing at the very end of the segment wins, so nested CSS
/// rules survive; otherwise the first `style { ... }` up to its first `}`.
pub fn extract_inline_style(meta_raw: &str) -> Option<String> {
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    static ANYWHERE: OnceLock<Regex> = OnceLock::new();
    static OPEN_TAG: OnceLock<Regex> = OnceLock::new();
    static CLOSE_TAG: OnceLock<Regex> = OnceLock::new();

    let trailing = TRAILING.get_or_init(|| Regex::new(r"(?is)style\s*\{(.*?)\}\s*$").unwrap());
    let anywhere = ANYWHERE.get_or_init(|| Regex::new(r"(?is)style\s*\{(.*?)\}").unwrap());

    let caps = trailing
        .captures(meta_raw)
        .or_else(|| anywhere.captures(meta_raw))?;

    let open_tag = OPEN_TAG.get_or_init(|| Regex::new(r"(?i)^\s*<style[^>]*>").unwrap());
    let close_tag = CLOSE_TAG.get_or_init(|| Regex::new(r"(?i)</style>\s*$").unwrap());

    let content = open_tag.replace(&caps[1], "");
    let content = close_tag.replace(&content, "");
    Some(content.trim().to_string())
}

/// Meta mapping and inline stylesheet of one meta segment.
pub fn parse_meta_block(meta_raw: &str) -> (Meta, Option<String>) {
    (parse_meta(meta_raw), extract_inline_style(meta_raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_pass_wins_over_unquoted() {
        let meta = parse_meta(r#"a="1" a=2"#);
        assert_eq!(meta.get("a"), Some("1"));
    }

    #[test]
    fn test_unquoted_alone() {
        let meta = parse_meta("a=2");
        assert_eq!(meta.get("a"), Some("2"));
    }

    #[test]
    fn test_unquoted_before_quoted_still_loses() {
        let meta = parse_meta(r#"a=2 a="1""#);
        assert_eq!(meta.get("a"), Some("1"));
    }

    #[test]
    fn test_later_quoted_overwrites_earlier_quoted() {
        let meta = parse_meta(r#"title="One" title="Two""#);
        assert_eq!(meta.get("title"), Some("Two"));
    }

    #[test]
    fn test_mixed_keys() {
        let meta = parse_meta("title=\"My Page\"\nicon=fav.png\ntype=main");
        assert_eq!(meta.title(), Some("My Page"));
        assert_eq!(meta.icon(), Some("fav.png"));
        assert_eq!(meta.page_type().as_deref(), Some("main"));
        assert_eq!(meta.len(), 3);
    }

    #[test]
    fn test_stylesheets_split() {
        let meta = parse_meta(r#"style="a.css, b.css,,""#);
        assert_eq!(meta.stylesheets(), vec!["a.css", "b.css"]);
    }

    #[test]
    fn test_redirect_target_order() {
        let meta = parse_meta(r#"type=html url="https://x.test" link=other"#);
        assert_eq!(meta.redirect_target(), Some("https://x.test"));
    }

    #[test]
    fn test_context_menu_flag() {
        assert!(parse_meta("rmb_menu=Off").context_menu_disabled());
        assert!(parse_meta("rmb_menu=0").context_menu_disabled());
        assert!(!parse_meta("rmb_menu=yes").context_menu_disabled());
        assert!(!parse_meta("").context_menu_disabled());
    }

    #[test]
    fn test_grammar_selection() {
        assert_eq!(parse_meta("grammar=blocky").grammar(), Grammar::Blocky);
        assert_eq!(parse_meta(r#"mode="BLOCKY""#).grammar(), Grammar::Blocky);
        assert_eq!(parse_meta("grammar=cont").grammar(), Grammar::Cont);
        assert_eq!(parse_meta("").grammar(), Grammar::Cont);
    }

    #[test]
    fn test_inline_style_at_end_keeps_nested_rules() {
        let raw = "title=\"x\"\nstyle { body { color: red; } }";
        assert_eq!(
            extract_inline_style(raw).as_deref(),
            Some("body { color: red; }")
        );
    }

    #[test]
    fn test_inline_style_strips_style_tag() {
        let raw = "style { <style type=\"text/css\">h1 { margin: 0 }</style> }";
        assert_eq!(extract_inline_style(raw).as_deref(), Some("h1 { margin: 0 }"));
    }

    #[test]
    fn test_inline_style_not_at_end() {
        let raw = "style { a { b } title=\"t\"";
        assert_eq!(extract_inline_style(raw).as_deref(), Some("a { b"));
    }

    #[test]
    fn test_inline_style_absent() {
        assert_eq!(extract_inline_style(r#"style="main.css""#), None);
    }
}
