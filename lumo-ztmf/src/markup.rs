use serde::Serialize;

/// A `<canvas bg="name">` tag found in a markup payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanvasTag {
    /// Position among the canvases carrying a `bg` attribute.
    pub index: usize,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Whether a component payload is markup rather than a flat value list.
pub fn is_markup(payload: &str) -> bool {
    payload.trim_start().starts_with('<')
}

/// Collect every `<canvas ...>` tag with a non-empty `bg` attribute, in
/// document order.
pub fn scan_canvases(html: &str) -> Vec<CanvasTag> {
    let lower = html.to_ascii_lowercase();
    let mut canvases = Vec::new();
    let mut i = 0;

    while let Some(found) = lower[i..].find("<canvas") {
        let attrs_start = i + found + "<canvas".len();
        // `<canvasfoo` is a different tag
        if lower[attrs_start..]
            .chars()
            .next()
            .is_some_and(|c| !(c.is_whitespace() || c == '>' || c == '/'))
        {
            i = attrs_start;
            continue;
        }

        let attrs_end = lower[attrs_start..]
            .find('>')
            .map(|p| attrs_start + p)
            .unwrap_or(html.len());
        let attrs = parse_attributes(&html[attrs_start..attrs_end]);

        let value = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        };

        if let Some(provider) = value("bg").map(str::trim).filter(|p| !p.is_empty()) {
            canvases.push(CanvasTag {
                index: canvases.len(),
                provider: provider.to_string(),
                width: value("width").and_then(|w| w.trim().parse().ok()),
                height: value("height").and_then(|h| h.trim().parse().ok()),
            });
        }

        i = attrs_end;
        if i >= html.len() {
            break;
        }
    }

    canvases
}

/// Attribute list of one tag: `name`, `name=value`, `name="value"`, `name='value'`.
fn parse_attributes(src: &str) -> Vec<(String, String)> {
    let bytes = src.as_bytes();
    let len = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    while i < len {
        while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/' {
            i += 1;
        }
        if name_start == i {
            break;
        }
        let name = src[name_start..i].to_string();

        let mut j = i;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= len || bytes[j] != b'=' {
            attrs.push((name, String::new()));
            continue;
        }
        j += 1;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let value;
        if j < len && (bytes[j] == b'"' || bytes[j] == b'\'') {
            let quote = bytes[j];
            let start = j + 1;
            let mut k = start;
            while k < len && bytes[k] != quote {
                k += 1;
            }
            value = src[start..k].to_string();
            i = (k + 1).min(len);
        } else {
            let start = j;
            let mut k = start;
            while k < len && !bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            value = src[start..k].to_string();
            i = k;
        }
        attrs.push((name, value));
    }

    attrs
}
