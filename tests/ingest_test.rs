//! End-to-end ingestion tests for the word-processor dialect.

use folia::dom::{DocumentTree, ElementKind, NodeId};
use folia::style::Style;
use folia::{Document, IngestOptions, ingest_str};

fn ingest(xml: &str) -> Document {
    ingest_str(xml, &IngestOptions::default()).expect("ingestion failed")
}

fn sections(tree: &DocumentTree, node: NodeId) -> Vec<NodeId> {
    tree.children(node)
        .iter()
        .copied()
        .filter(|&child| tree.kind(child) == Some(ElementKind::Section))
        .collect()
}

fn title_text(tree: &DocumentTree, section: NodeId) -> String {
    let first = tree.children(section)[0];
    assert_eq!(tree.kind(first), Some(ElementKind::Title));
    tree.text_content(first)
}

// ============================================================================
// Document shape
// ============================================================================

#[test]
fn test_heading_stream_builds_section_tree() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <body>
            <p><pPr><outlineLvl val="0"/></pPr><r><t>One</t></r></p>
            <p><r><t>Intro</t></r></p>
            <p><pPr><outlineLvl val="1"/></pPr><r><t>One.A</t></r></p>
            <p><r><t>Detail</t></r></p>
            <p><pPr><outlineLvl val="0"/></pPr><r><t>Two</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().expect("no body");
    let top = sections(tree, body);
    assert_eq!(top.len(), 2);
    assert_eq!(title_text(tree, top[0]), "One");
    assert_eq!(title_text(tree, top[1]), "Two");

    let nested = sections(tree, top[0]);
    assert_eq!(nested.len(), 1);
    assert_eq!(title_text(tree, nested[0]), "One.A");
    assert_eq!(tree.text_content(nested[0]), "One.ADetail");

    let outline = doc.outline();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0].children.len(), 1);
    assert_eq!(outline[0].children[0].title, "One.A");
}

#[test]
fn test_prefixed_names_are_accepted() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <w:document xmlns:w="http://example.com/wordprocessing">
          <w:body>
            <w:p><w:pPr><w:outlineLvl w:val="0"/></w:pPr><w:r><w:t>Chapter</w:t></w:r></w:p>
          </w:body>
        </w:document>"#,
    );

    let outline = doc.outline();
    assert_eq!(outline.len(), 1);
    assert_eq!(outline[0].title, "Chapter");
}

#[test]
fn test_empty_paragraph_still_emits_element() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document><body><p/><p><r><t>Text</t></r></p></body></document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let paragraphs: Vec<_> = tree
        .children(body)
        .iter()
        .copied()
        .filter(|&c| tree.kind(c) == Some(ElementKind::Paragraph))
        .collect();
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(tree.text_content(paragraphs[0]), "");
    assert_eq!(tree.text_content(paragraphs[1]), "Text");
}

#[test]
fn test_unknown_subtree_is_dropped_wholesale() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <body>
            <p><r><t>Before</t></r></p>
            <sectPr>
              <pgSz w="12240" h="15840"/>
              <p><r><t>Never seen</t></r></p>
            </sectPr>
            <p><r><t>After</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    assert_eq!(tree.child_count(body), 2);
    assert_eq!(tree.text_content(body), "BeforeAfter");
}

// ============================================================================
// Styles and CSS
// ============================================================================

#[test]
fn test_declared_styles_inherit_through_based_on() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <styles>
            <style styleId="Base" type="character">
              <name val="Base"/>
              <rPr><i/></rPr>
            </style>
            <style styleId="Strong" type="character">
              <name val="Strong"/>
              <basedOn val="Base"/>
              <rPr><b/></rPr>
            </style>
          </styles>
          <body><p><r><t>x</t></r></p></body>
        </document>"#,
    );

    let strong = doc.styles.get("Strong").expect("style not registered");
    let props = Style::run_props(&strong, &doc.styles);
    assert_eq!(props.bold, Some(true));
    assert_eq!(props.italic, Some(true));

    let base = doc.styles.get("Base").unwrap();
    let props = Style::run_props(&base, &doc.styles);
    assert_eq!(props.bold, None);
    assert_eq!(props.italic, Some(true));
}

#[test]
fn test_paragraph_style_css_attached() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <styles>
            <style styleId="Quote" type="paragraph">
              <name val="Quote"/>
              <pPr><jc val="center"/></pPr>
            </style>
          </styles>
          <body>
            <p><pPr><pStyle val="Quote"/></pPr><r><t>Centered</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let p = tree.children(body)[0];
    assert_eq!(tree.attribute(p, "style"), Some("text-align: center;"));
    assert_eq!(tree.css(p), Some("text-align: center;"));
}

#[test]
fn test_direct_formatting_overrides_named_style() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <styles>
            <style styleId="Quote" type="paragraph">
              <name val="Quote"/>
              <pPr><jc val="center"/></pPr>
            </style>
          </styles>
          <body>
            <p><pPr><pStyle val="Quote"/><jc val="right"/></pPr><r><t>Right</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let p = tree.children(body)[0];
    assert_eq!(tree.attribute(p, "style"), Some("text-align: right;"));
}

#[test]
fn test_run_formatting_wraps_styled_span() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <body>
            <p><r><rPr><b/><i/></rPr><t>Strong</t></r><r><t> plain</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let p = tree.children(body)[0];
    let children = tree.children(p);
    assert_eq!(children.len(), 2);

    let span = children[0];
    assert_eq!(tree.kind(span), Some(ElementKind::Span));
    assert_eq!(
        tree.attribute(span, "style"),
        Some("font-weight: bold; font-style: italic;")
    );
    assert_eq!(tree.text_content(span), "Strong");

    // The unformatted run stays plain text.
    assert_eq!(tree.text(children[1]), Some(" plain"));
}

#[test]
fn test_toggle_off_blocks_inherited_bold() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <styles>
            <style styleId="Strong" type="character">
              <name val="Strong"/>
              <rPr><b/></rPr>
            </style>
          </styles>
          <body>
            <p><r><rPr><rStyle val="Strong"/><b val="0"/></rPr><t>quiet</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let p = tree.children(body)[0];
    // Bold off and nothing else: the run needs no span at all.
    let children = tree.children(p);
    assert_eq!(children.len(), 1);
    assert_eq!(tree.text(children[0]), Some("quiet"));
}

#[test]
fn test_page_break_flags_map_to_one_declaration() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <body>
            <p><pPr><pageBreakBefore/><keepNext/></pPr><r><t>x</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let p = tree.children(body)[0];
    assert_eq!(tree.attribute(p, "style"), Some("page-break-before: always;"));
}

#[test]
fn test_heading_via_named_style_outline() {
    let doc = ingest(
        r#"<?xml version="1.0"?>
        <document>
          <styles>
            <style styleId="Heading1" type="paragraph">
              <name val="heading 1"/>
              <pPr><outlineLvl val="0"/></pPr>
            </style>
          </styles>
          <body>
            <p><pPr><pStyle val="Heading1"/></pPr><r><t>Chapter</t></r></p>
            <p><r><t>Body text</t></r></p>
          </body>
        </document>"#,
    );

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let top = sections(tree, body);
    assert_eq!(top.len(), 1);
    assert_eq!(title_text(tree, top[0]), "Chapter");

    let children = tree.children(top[0]);
    assert_eq!(tree.kind(children[0]), Some(ElementKind::Title));
    let heading = tree.children(children[0])[0];
    assert_eq!(tree.kind(heading), Some(ElementKind::Heading(1)));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_heading_classes_mode() {
    let options = IngestOptions {
        heading_classes: true,
        build_sections: true,
    };
    let doc = ingest_str(
        r#"<?xml version="1.0"?>
        <document>
          <body>
            <p><pPr><outlineLvl val="1"/></pPr><r><t>Part</t></r></p>
          </body>
        </document>"#,
        &options,
    )
    .unwrap();

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    let section = sections(tree, body)[0];
    let title = tree.children(section)[0];
    let heading = tree.children(title)[0];
    assert_eq!(tree.kind(heading), Some(ElementKind::Paragraph));
    assert_eq!(tree.attribute(heading, "class"), Some("h2"));
}

#[test]
fn test_flat_mode_keeps_body_flat() {
    let options = IngestOptions {
        heading_classes: false,
        build_sections: false,
    };
    let doc = ingest_str(
        r#"<?xml version="1.0"?>
        <document>
          <body>
            <p><pPr><outlineLvl val="0"/></pPr><r><t>One</t></r></p>
            <p><r><t>Text</t></r></p>
            <p><pPr><outlineLvl val="1"/></pPr><r><t>One.A</t></r></p>
          </body>
        </document>"#,
        &options,
    )
    .unwrap();

    let tree = &doc.tree;
    let body = doc.body().unwrap();
    assert!(sections(tree, body).is_empty());

    let kinds: Vec<_> = tree
        .children(body)
        .iter()
        .map(|&c| tree.kind(c).unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Heading(1),
            ElementKind::Paragraph,
            ElementKind::Heading(2),
        ]
    );

    let outline = doc.outline();
    assert_eq!(outline.len(), 2);
    assert_eq!(outline[0].title, "One");
    assert_eq!(outline[1].title, "One.A");
}

#[test]
fn test_declaration_encoding_recorded() {
    let doc = ingest(
        r#"<?xml version="1.0" encoding="windows-1251"?>
        <document><body><p><r><t>x</t></r></p></body></document>"#,
    );
    assert_eq!(doc.encoding, Some(encoding_rs::WINDOWS_1251));

    let doc = ingest("<document><body/></document>");
    assert_eq!(doc.encoding, None);
}

// ============================================================================
// Structural invariants over arbitrary heading streams
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    /// Check every section holds at most one title, as its first child.
    fn check_sections(tree: &DocumentTree, node: NodeId) {
        for (index, &child) in tree.children(node).iter().enumerate() {
            if tree.kind(child) == Some(ElementKind::Title) {
                assert_eq!(index, 0, "title must be its section's first child");
            }
            check_sections(tree, child);
        }
    }

    fn count_kind(tree: &DocumentTree, node: NodeId, kind: ElementKind) -> usize {
        let mut count = usize::from(tree.kind(node) == Some(kind));
        for &child in tree.children(node) {
            count += count_kind(tree, child, kind);
        }
        count
    }

    proptest! {
        #[test]
        fn prop_restructuring_preserves_content(
            blocks in prop::collection::vec(
                prop_oneof![
                    (1u8..=4).prop_map(Some),
                    Just(None),
                ],
                1..24
            )
        ) {
            let mut xml = String::from("<?xml version=\"1.0\"?><document><body>");
            let mut headings = 0;
            let mut paragraphs = 0;
            for (i, block) in blocks.iter().enumerate() {
                match block {
                    Some(level) => {
                        headings += 1;
                        xml.push_str(&format!(
                            "<p><pPr><outlineLvl val=\"{}\"/></pPr><r><t>H{i}</t></r></p>",
                            level - 1
                        ));
                    }
                    None => {
                        paragraphs += 1;
                        xml.push_str(&format!("<p><r><t>B{i}</t></r></p>"));
                    }
                }
            }
            xml.push_str("</body></document>");

            let doc = ingest_str(&xml, &IngestOptions::default()).unwrap();
            let tree = &doc.tree;
            let body = doc.body().unwrap();

            // No content block is lost or duplicated.
            prop_assert_eq!(count_kind(tree, body, ElementKind::Paragraph), paragraphs);
            prop_assert_eq!(count_kind(tree, body, ElementKind::Title), headings);

            // Every title is the first child of its section.
            check_sections(tree, body);

            // The whole text survives in document order within each block.
            for (i, block) in blocks.iter().enumerate() {
                let needle = match block {
                    Some(_) => format!("H{i}"),
                    None => format!("B{i}"),
                };
                prop_assert!(tree.text_content(body).contains(&needle));
            }
        }
    }
}
