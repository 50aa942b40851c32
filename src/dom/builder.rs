//! Incremental tree construction driven by document-phase events.
//!
//! `TreeBuilder` is the sink the handlers emit canonical elements into. It
//! tracks the stack of open elements, routes declaration metadata (the
//! stream's encoding label) and binary attachments, and finalizes each
//! element's style/render state when its tag closes.

use encoding_rs::Encoding;

use super::{DocumentTree, ElementKind, NodeId};
use crate::reader::TextFlags;

/// Named binary payload delivered alongside the markup stream.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

/// Builds a [`DocumentTree`] from open/attribute/body/text/close events.
#[derive(Debug)]
pub struct TreeBuilder {
    tree: DocumentTree,
    /// Stack of open elements; last is the insertion point.
    open: Vec<NodeId>,
    /// Attributes of the innermost open element are complete.
    attrs_done: bool,
    encoding: Option<&'static Encoding>,
    attachments: Vec<Attachment>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            tree: DocumentTree::new(),
            open: Vec::new(),
            attrs_done: true,
            encoding: None,
            attachments: Vec::new(),
        }
    }

    /// Innermost open element, or the document root.
    pub fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(self.tree.root())
    }

    /// Open a new element as the last child of the current node.
    pub fn tag_open(&mut self, kind: ElementKind) -> NodeId {
        let node = self.tree.append_element(self.current(), kind);
        self.open.push(node);
        self.attrs_done = false;
        node
    }

    /// Set an attribute on the innermost open element. Attributes arriving
    /// after the tag body has started are dropped with a log entry.
    pub fn attribute(&mut self, name: &str, value: &str) {
        if self.attrs_done {
            log::warn!("attribute {name} arrived after tag body, dropped");
            return;
        }
        let current = self.current();
        self.tree.set_attribute(current, name, value);
    }

    /// All attributes of the innermost open element have been delivered.
    pub fn tag_body(&mut self) {
        self.attrs_done = true;
    }

    /// Close the innermost open element, finalizing its style and render
    /// state. A kind mismatch is reported and the element closed anyway.
    pub fn tag_close(&mut self, kind: ElementKind) {
        let Some(node) = self.open.pop() else {
            log::warn!("close of {} with no open element", kind.as_str());
            return;
        };
        if self.tree.kind(node) != Some(kind) {
            log::warn!("mismatched close of {}", kind.as_str());
        }
        self.tree.init_style(node);
        self.tree.init_render_method(node);
        self.attrs_done = true;
    }

    /// Append text under the current node.
    pub fn text(&mut self, text: &str, flags: TextFlags) {
        let parent = self.current();
        if !flags.contains(TextFlags::TRIM) {
            self.tree.append_text(parent, text);
            return;
        }
        let normalized = normalize_whitespace(text);
        if normalized.trim().is_empty() {
            // Separator-only event: keep a single space when it continues
            // existing text, drop it at the start of an element.
            let continues = self
                .tree
                .children(parent)
                .last()
                .and_then(|&child| self.tree.text(child))
                .is_some_and(|t| !t.ends_with(' '));
            if continues {
                self.tree.append_text(parent, " ");
            }
            return;
        }
        self.tree.append_text(parent, &normalized);
    }

    /// Attribute of the stream's declaration pseudo-tag. Only the encoding
    /// label carries document metadata; the rest is noted and dropped.
    pub fn declaration_attribute(&mut self, name: &str, value: &str) {
        if name == "encoding" {
            self.set_encoding_label(value);
        } else {
            log::debug!("ignoring declaration attribute {name}={value}");
        }
    }

    /// Resolve the declaration's encoding label through `encoding_rs`.
    pub fn set_encoding_label(&mut self, label: &str) {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => self.encoding = Some(encoding),
            None => log::warn!("unknown encoding label {label:?}"),
        }
    }

    /// Declared stream encoding, if the declaration carried a known label.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }

    /// Accept a binary attachment. Returns whether the payload was kept,
    /// so the stream source can decide whether to buffer or discard it.
    pub fn add_attachment(&mut self, name: &str, data: &[u8]) -> bool {
        if name.is_empty() {
            log::debug!("unnamed attachment rejected");
            return false;
        }
        if self.attachments.iter().any(|a| a.name == name) {
            log::debug!("duplicate attachment {name:?} rejected");
            return false;
        }
        self.attachments.push(Attachment {
            name: name.to_string(),
            data: data.to_vec(),
        });
        true
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DocumentTree {
        &mut self.tree
    }

    /// Tear down into the finished tree and its side channels.
    pub fn into_parts(self) -> (DocumentTree, Vec<Attachment>, Option<&'static Encoding>) {
        (self.tree, self.attachments, self.encoding)
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse whitespace runs to single spaces, keeping one leading or
/// trailing space so adjacent runs stay separated.
fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            in_space = true;
        } else {
            if in_space && !result.is_empty() {
                result.push(' ');
            }
            in_space = false;
            result.push(c);
        }
    }
    if in_space && !result.is_empty() {
        result.push(' ');
    }
    result
}
