//! Finished ingestion output.

use encoding_rs::Encoding;

use crate::dom::{Attachment, DocumentTree, ElementKind, NodeId};
use crate::style::StyleRegistry;

/// A document ready for layout: the canonical tree, the styles it
/// references, and any binary attachments delivered with the stream.
pub struct Document {
    pub tree: DocumentTree,
    pub styles: StyleRegistry,
    pub attachments: Vec<Attachment>,
    /// Encoding declared by the source stream, if any.
    pub encoding: Option<&'static Encoding>,
}

/// One entry in the document outline.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct OutlineEntry {
    pub level: u8,
    pub title: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<OutlineEntry>,
}

impl Document {
    /// The body element, if the stream produced one.
    pub fn body(&self) -> Option<NodeId> {
        self.tree
            .children(self.tree.root())
            .iter()
            .copied()
            .find(|&node| self.tree.kind(node) == Some(ElementKind::Body))
    }

    /// Extract the document outline from the section tree, falling back to
    /// in-place headings for documents ingested without sections.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        let Some(body) = self.body() else {
            return Vec::new();
        };
        let sections = self.collect_sections(body, 1);
        if !sections.is_empty() {
            return sections;
        }
        self.collect_headings(body)
    }

    fn collect_sections(&self, node: NodeId, level: u8) -> Vec<OutlineEntry> {
        self.tree
            .children(node)
            .iter()
            .copied()
            .filter(|&child| self.tree.kind(child) == Some(ElementKind::Section))
            .map(|section| {
                let title = self
                    .tree
                    .children(section)
                    .first()
                    .copied()
                    .filter(|&first| self.tree.kind(first) == Some(ElementKind::Title))
                    .map(|title| self.tree.text_content(title).trim().to_string())
                    .unwrap_or_default();
                OutlineEntry {
                    level,
                    title,
                    children: self.collect_sections(section, level + 1),
                }
            })
            .collect()
    }

    fn collect_headings(&self, body: NodeId) -> Vec<OutlineEntry> {
        self.tree
            .children(body)
            .iter()
            .copied()
            .filter_map(|child| {
                let level = match self.tree.kind(child)? {
                    ElementKind::Heading(level) => level,
                    ElementKind::Paragraph => heading_class_level(self.tree.attribute(child, "class")?)?,
                    _ => return None,
                };
                Some(OutlineEntry {
                    level,
                    title: self.tree.text_content(child).trim().to_string(),
                    children: Vec::new(),
                })
            })
            .collect()
    }
}

/// Heading level of a class-tagged paragraph (`h1` through `h6`).
fn heading_class_level(class: &str) -> Option<u8> {
    let level = class.strip_prefix('h')?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
