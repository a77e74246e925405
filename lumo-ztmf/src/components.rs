use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// One entry of a `components = ...` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDeclaration {
    pub name: String,
    /// Braced payload, trimmed. `None` when absent or empty.
    pub inner: Option<String>,
}

impl ComponentDeclaration {
    pub fn new(name: impl Into<String>, inner: Option<&str>) -> Self {
        Self {
            name: name.into(),
            inner: inner.map(str::to_string),
        }
    }

    /// Comma-separated payload arguments, trimmed, empty ones dropped.
    pub fn args(&self) -> Vec<&str> {
        self.inner
            .as_deref()
            .map(|inner| {
                inner
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parse a component spec such as `theme{bottom-right}, back{bottom-left, index}`.
///
/// Commas inside braces do not split. Parts that are not `name` or
/// `name{payload}` are dropped.
pub fn parse_component_spec(spec: &str) -> Vec<ComponentDeclaration> {
    static PART: OnceLock<Regex> = OnceLock::new();
    let re = PART.get_or_init(|| Regex::new(r"(?s)^([a-zA-Z0-9_-]+)\s*(\{(.*)\})?$").unwrap());

    split_top_level(spec)
        .into_iter()
        .filter_map(|part| {
            let caps = re.captures(part)?;
            let inner = caps
                .get(3)
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty());
            Some(ComponentDeclaration::new(&caps[1], inner))
        })
        .collect()
}

fn split_top_level(spec: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (i, b) in spec.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b',' if depth == 0 => {
                parts.push(spec[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(spec[start..].trim());

    parts.retain(|p| !p.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_commas_inside_braces_do_not_split() {
        let decls = parse_component_spec("theme{a,b}, back{x}");
        assert_eq!(
            decls,
            vec![
                ComponentDeclaration::new("theme", Some("a,b")),
                ComponentDeclaration::new("back", Some("x")),
            ]
        );
    }

    #[test]
    fn test_bare_and_empty_payloads() {
        let decls = parse_component_spec("theme, back{}, bg { <canvas bg=\"blob\"></canvas> }");
        assert_eq!(
            decls,
            vec![
                ComponentDeclaration::new("theme", None),
                ComponentDeclaration::new("back", None),
                ComponentDeclaration::new("bg", Some("<canvas bg=\"blob\"></canvas>")),
            ]
        );
    }

    #[test]
    fn test_malformed_parts_are_dropped() {
        let decls = parse_component_spec("theme{x}, <oops>, , footer{ hi }");
        assert_eq!(
            decls,
            vec![
                ComponentDeclaration::new("theme", Some("x")),
                ComponentDeclaration::new("footer", Some("hi")),
            ]
        );
    }

    #[test]
    fn test_nested_braces_kept_in_payload() {
        let decls = parse_component_spec("bg{ a{b, c} }, theme");
        assert_eq!(decls[0].inner.as_deref(), Some("a{b, c}"));
        assert_eq!(decls[1].name, "theme");
    }

    #[test]
    fn test_args() {
        let decl = ComponentDeclaration::new("back", Some(" bottom-left , ,index.ztmf"));
        assert_eq!(decl.args(), vec!["bottom-left", "index.ztmf"]);
        assert!(ComponentDeclaration::new("back", None).args().is_empty());
    }
}
