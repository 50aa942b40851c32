//! Arena-based document tree.
//!
//! All nodes are stored in a contiguous vector; parents, children and the
//! "current section" handles held by restructuring handlers are indices
//! into it, so structural edits (insertions, range moves) are checked
//! operations rather than pointer surgery.

mod builder;

pub use builder::{Attachment, TreeBuilder};

/// Unique identifier for a node in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Canonical element vocabulary of the render tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Body,
    Section,
    Title,
    /// Leveled heading, 1-6.
    Heading(u8),
    Paragraph,
    Span,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Body => "body",
            ElementKind::Section => "section",
            ElementKind::Title => "title",
            ElementKind::Heading(1) => "h1",
            ElementKind::Heading(2) => "h2",
            ElementKind::Heading(3) => "h3",
            ElementKind::Heading(4) => "h4",
            ElementKind::Heading(5) => "h5",
            ElementKind::Heading(_) => "h6",
            ElementKind::Paragraph => "p",
            ElementKind::Span => "span",
        }
    }
}

/// How the renderer lays out an element's box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMethod {
    #[default]
    Block,
    Inline,
}

/// Element attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with canonical kind and attributes.
    Element {
        kind: ElementKind,
        attrs: Vec<Attribute>,
        /// Resolved CSS declaration text, cached by `init_style`.
        css: Option<String>,
        render: RenderMethod,
    },
    /// Text content.
    Text(String),
}

/// A node in the tree.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-owned document tree with ordered child lists.
#[derive(Debug)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DocumentTree {
    /// Create a new empty tree with a document root.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.alloc(Node::new(NodeData::Document));
        tree
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get the document root ID.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create an element and insert it into `parent`'s child list at
    /// `position` (clamped to the list length).
    pub fn create_element_child(
        &mut self,
        parent: NodeId,
        position: usize,
        kind: ElementKind,
    ) -> NodeId {
        let id = self.alloc(Node::new(NodeData::Element {
            kind,
            attrs: Vec::new(),
            css: None,
            render: RenderMethod::default(),
        }));
        self.nodes[id.0 as usize].parent = Some(parent);
        if let Some(parent) = self.get_mut(parent) {
            let position = position.min(parent.children.len());
            parent.children.insert(position, id);
        }
        id
    }

    /// Create an element as `parent`'s last child.
    pub fn append_element(&mut self, parent: NodeId, kind: ElementKind) -> NodeId {
        let position = self.child_count(parent);
        self.create_element_child(parent, position, kind)
    }

    /// Append text under `parent`, merging into a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.children(parent).last().copied();
        if let Some(last) = last {
            if let Some(Node {
                data: NodeData::Text(existing),
                ..
            }) = self.get_mut(last)
            {
                existing.push_str(text);
                return;
            }
        }

        let id = self.alloc(Node::new(NodeData::Text(text.to_string())));
        self.nodes[id.0 as usize].parent = Some(parent);
        if let Some(parent) = self.get_mut(parent) {
            parent.children.push(id);
        }
    }

    /// Number of children of a node.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |n| n.children.len())
    }

    /// Ordered children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Move `count` children of `from`, starting at `start`, to the end of
    /// `to`'s child list, preserving order. Out-of-range requests are
    /// clamped and logged, never undefined behavior.
    pub fn move_children(&mut self, from: NodeId, to: NodeId, start: usize, count: usize) {
        if from == to {
            log::warn!("refusing to move children of node onto itself");
            return;
        }
        let available = self.child_count(from);
        let start = start.min(available);
        let end = (start + count).min(available);
        if end - start < count {
            log::debug!("child range move clamped from {count} to {}", end - start);
        }
        if end == start {
            return;
        }
        let moved: Vec<NodeId> = {
            let from = &mut self.nodes[from.0 as usize];
            from.children.drain(start..end).collect()
        };
        for &child in &moved {
            self.nodes[child.0 as usize].parent = Some(to);
        }
        if let Some(to) = self.get_mut(to) {
            to.children.extend(moved);
        }
    }

    /// Refresh the node's cached CSS from its `style` attribute. Called
    /// after structural edits so a moved or freshly inserted element has
    /// its presentation state in place before rendering.
    pub fn init_style(&mut self, id: NodeId) {
        let css = self
            .attribute(id, "style")
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty());
        if let Some(NodeData::Element { css: slot, .. }) = self.get_mut(id).map(|n| &mut n.data) {
            *slot = css;
        }
    }

    /// Derive the node's render method from its element kind.
    pub fn init_render_method(&mut self, id: NodeId) {
        let Some(NodeData::Element { kind, render, .. }) =
            self.get_mut(id).map(|n| &mut n.data)
        else {
            return;
        };
        *render = match kind {
            ElementKind::Span => RenderMethod::Inline,
            _ => RenderMethod::Block,
        };
    }

    /// Set an attribute on an element, replacing an existing value.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(NodeData::Element { attrs, .. }) = self.get_mut(id).map(|n| &mut n.data) else {
            log::debug!("attribute {name} on non-element node dropped");
            return;
        };
        if let Some(attr) = attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value.to_string();
        } else {
            attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Get an attribute value from an element.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Element kind of a node, if it is an element.
    pub fn kind(&self, id: NodeId) -> Option<ElementKind> {
        match self.get(id)?.data {
            NodeData::Element { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Cached CSS of an element (populated by `init_style`).
    pub fn css(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { css, .. } => css.as_deref(),
            _ => None,
        }
    }

    /// Render method of an element.
    pub fn render_method(&self, id: NodeId) -> Option<RenderMethod> {
        match self.get(id)?.data {
            NodeData::Element { render, .. } => Some(render),
            _ => None,
        }
    }

    /// Text of a node, if it is a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of a node's descendants, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, result: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        if let NodeData::Text(text) = &node.data {
            result.push_str(text);
        }
        for &child in &node.children {
            self.collect_text(child, result);
        }
    }

    /// Find the first descendant of `id` (depth-first) matching `predicate`.
    pub fn find<F>(&self, id: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&Node) -> bool,
    {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if predicate(node) {
                    return Some(id);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        None
    }

    /// Get the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (only has the document root).
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}
