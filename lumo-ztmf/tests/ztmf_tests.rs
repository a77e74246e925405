use lumo_ztmf::{
    parse_document, parse_document_strict, BodySegment, ComponentDeclaration, ContentNode,
    Grammar, ZtmfError,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

fn get_fixture_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("fixtures");
    path.push(filename);
    path
}

fn read_fixture(filename: &str) -> String {
    fs::read_to_string(get_fixture_path(filename)).unwrap()
}

// Fixture documents
#[test]
fn test_index_fixture_meta() {
    let doc = parse_document(&read_fixture("index.ztmf"));
    assert_eq!(doc.title(), Some("Lumo Home"));
    assert_eq!(doc.meta.icon(), Some("favicon.png"));
    assert_eq!(doc.meta.stylesheets(), vec!["css/main.css", "css/links.css"]);
    assert_eq!(doc.meta.page_type().as_deref(), Some("main"));
    assert!(doc.meta.context_menu_disabled());
    assert_eq!(
        doc.inline_style.as_deref(),
        Some(".cont-header-center { text-align: center; }")
    );
}

#[test]
fn test_index_fixture_body_order() {
    let doc = parse_document(&read_fixture("index.ztmf"));
    assert_eq!(doc.body.grammar, Grammar::Cont);
    assert_eq!(doc.body.segments.len(), 2);

    let BodySegment::Cont { nodes } = &doc.body.segments[0] else {
        panic!("expected the cont construct first");
    };
    let kinds: Vec<&str> = nodes
        .iter()
        .map(|n| match n {
            ContentNode::Break => "br",
            ContentNode::RawFragment { .. } => "raw",
            ContentNode::Block { name, .. } => name.as_str(),
        })
        .collect();
    assert_eq!(kinds, vec!["center", "br", "grid", "center"]);

    assert_eq!(
        doc.body.segments[1],
        BodySegment::Container {
            name: "footer".to_string(),
            inner: "<small>made with lumo</small>".to_string(),
        }
    );
}

#[test]
fn test_index_fixture_components() {
    let doc = parse_document(&read_fixture("index.ztmf"));
    assert_eq!(
        doc.components(),
        vec![
            ComponentDeclaration::new("theme", Some("bottom-right")),
            ComponentDeclaration::new("back", Some("bottom-left, index.ztmf")),
            ComponentDeclaration::new("bg", Some(r#"<canvas bg="blob"></canvas>"#)),
            ComponentDeclaration::new("notice", Some("<p>hello</p>")),
        ]
    );
}

#[test]
fn test_blocky_fixture() {
    let doc = parse_document(&read_fixture("blocky.ztmf"));
    assert_eq!(doc.body.grammar, Grammar::Blocky);
    let html = doc.to_html();
    assert!(html.starts_with(r#"<div class="lumo-body"><div class="page"><div class="header"><h1>Blocky</h1></div>"#));
    assert!(html.contains(
        r#"<div class="links"><div class="list"><a href="index.ztmf">Home</a></div></div></div>"#
    ));
    assert_eq!(
        doc.components(),
        vec![ComponentDeclaration::new("theme", Some("top-right"))]
    );
}

#[test]
fn test_broken_fixture_degrades() {
    let doc = parse_document(&read_fixture("broken.ztmf"));
    assert_eq!(
        doc.body.segments,
        vec![BodySegment::Cont {
            nodes: vec![ContentNode::RawFragment {
                html: r#"center[<h1>never closed</h1>, grid[<a href="x.ztmf">x</a>]"#.to_string()
            }]
        }]
    );
}

// End-to-end document from the format description
#[test]
fn test_header_grid_and_theme() {
    let text = "<body>cont{ center[<h1>Hi</h1>], grid[<a href=x.ztmf>Go</a>] } components=theme{bottom-right}</body>";
    let doc = parse_document(text);
    assert_eq!(
        doc.to_html(),
        concat!(
            r#"<div class="lumo-body"><div class="cont">"#,
            r#"<div class="cont-header-center"><h1>Hi</h1></div><br>"#,
            r#"<div class="cont-links cont-grid"><a href=x.ztmf>Go</a></div>"#,
            "</div></div>"
        )
    );
    assert_eq!(
        doc.components(),
        vec![ComponentDeclaration::new("theme", Some("bottom-right"))]
    );
}

#[test]
fn test_meta_precedence_through_document() {
    let doc = parse_document(r#"<meta>a="1" a=2 b=3</meta>"#);
    assert_eq!(doc.meta.get("a"), Some("1"));
    assert_eq!(doc.meta.get("b"), Some("3"));
}

// Strict check
#[test]
fn test_strict_empty_document() {
    assert!(matches!(
        parse_document_strict("hello"),
        Err(ZtmfError::EmptyDocument)
    ));
}

#[test]
fn test_strict_meta_without_body() {
    assert!(matches!(
        parse_document_strict("<meta>title=x</meta>"),
        Err(ZtmfError::MissingBody)
    ));
    assert!(parse_document_strict("<meta>title=x</meta><body></body>").is_ok());
}

#[test]
fn test_json_shape() {
    let doc = parse_document("<body>cont{ <br> } components = theme</body>");
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["body"]["grammar"], "cont");
    assert_eq!(value["body"]["segments"][0]["type"], "cont");
    assert_eq!(value["body"]["segments"][0]["nodes"][0]["type"], "break");
    assert_eq!(value["body"]["components_spec"], "theme");
}
