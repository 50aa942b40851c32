//! Heading-to-section restructuring.
//!
//! Word-processor documents encode headings as a flat sequence of styled
//! paragraphs with an outline level. [`SectionTitleHandler`] is the one
//! place that rebuilds the implied hierarchy: it opens and closes nested
//! section elements as heading levels rise and fall, and retroactively
//! wraps already-emitted sibling content into a new subsection when a
//! deeper heading arrives after non-heading content. [`FlatTitleHandler`]
//! emits plain heading elements with no structural effect, for targets
//! that keep the flat shape.

use crate::dom::{ElementKind, NodeId, TreeBuilder};

/// Sink for heading boundaries found in the paragraph stream.
pub trait TitleHandler {
    /// The document body opened. Returns the body node.
    fn on_body_start(&mut self, builder: &mut TreeBuilder) -> NodeId;

    /// A heading paragraph at `level` (1-based) begins. With `no_section`
    /// the heading must not affect document structure (a table-of-contents
    /// entry, for example).
    fn on_title_start(&mut self, builder: &mut TreeBuilder, level: u8, no_section: bool);

    /// The heading paragraph ended.
    fn on_title_end(&mut self, builder: &mut TreeBuilder);

    /// The document body is closing; release any structure still open.
    fn on_body_end(&mut self, _builder: &mut TreeBuilder) {}
}

/// Open a heading element: either a leveled tag (`h3`) or a paragraph
/// carrying a level-derived class, per configuration.
fn open_heading(builder: &mut TreeBuilder, level: u8, heading_classes: bool) {
    if heading_classes {
        builder.tag_open(ElementKind::Paragraph);
        builder.attribute("class", &format!("h{level}"));
    } else {
        builder.tag_open(ElementKind::Heading(level));
    }
}

fn close_heading(builder: &mut TreeBuilder, level: u8, heading_classes: bool) {
    if heading_classes {
        builder.tag_close(ElementKind::Paragraph);
    } else {
        builder.tag_close(ElementKind::Heading(level));
    }
}

/// Emits headings in place, leaving the document flat.
pub struct FlatTitleHandler {
    heading_classes: bool,
    level: u8,
}

impl FlatTitleHandler {
    pub fn new(heading_classes: bool) -> Self {
        Self {
            heading_classes,
            level: 0,
        }
    }
}

impl TitleHandler for FlatTitleHandler {
    fn on_body_start(&mut self, builder: &mut TreeBuilder) -> NodeId {
        builder.tag_open(ElementKind::Body)
    }

    fn on_title_start(&mut self, builder: &mut TreeBuilder, level: u8, _no_section: bool) {
        self.level = level;
        open_heading(builder, level, self.heading_classes);
    }

    fn on_title_end(&mut self, builder: &mut TreeBuilder) {
        close_heading(builder, self.level, self.heading_classes);
    }
}

/// Rebuilds the nested section tree implied by heading levels.
///
/// Each emitted section holds its title as first child, then its content,
/// then any subsections. The handler only holds arena ids, never node
/// references, so the range moves behind the restructuring stay checked
/// operations on the tree.
pub struct SectionTitleHandler {
    heading_classes: bool,
    /// Innermost section (or the body before any heading).
    section: NodeId,
    /// Current heading depth; 0 until the first heading opens.
    level: u8,
    /// The current section's first child is its title.
    has_title: bool,
    /// Level of an open heading emitted without structure (`no_section`).
    plain_heading: Option<u8>,
}

impl SectionTitleHandler {
    pub fn new(heading_classes: bool) -> Self {
        Self {
            heading_classes,
            section: NodeId(0),
            level: 0,
            has_title: false,
            plain_heading: None,
        }
    }

    /// Promote the current section's trailing content into a brand-new
    /// subsection inserted at `split` (right after the title, or at the
    /// front when there is none), which becomes the current section.
    fn make_section(&mut self, builder: &mut TreeBuilder, split: usize) {
        let tree = builder.tree_mut();
        let section = tree.create_element_child(self.section, split, ElementKind::Section);
        tree.init_style(section);
        let trailing = tree.child_count(self.section) - (split + 1);
        tree.move_children(self.section, section, split + 1, trailing);
        tree.init_render_method(section);
        self.section = section;
    }

    /// Open nested sections until the current depth reaches `level`.
    fn open_section(&mut self, builder: &mut TreeBuilder, level: u8) {
        for _ in self.level..level {
            self.section = builder.tag_open(ElementKind::Section);
            builder.tag_body();
        }
        self.level = level;
        self.has_title = false;
    }

    /// Close `count` section levels, walking back up the tree.
    fn close_section(&mut self, builder: &mut TreeBuilder, count: u8) {
        for _ in 0..count {
            builder.tag_close(ElementKind::Section);
            self.level = self.level.saturating_sub(1);
        }
        self.section = builder.current();
        self.has_title = false;
    }
}

impl TitleHandler for SectionTitleHandler {
    fn on_body_start(&mut self, builder: &mut TreeBuilder) -> NodeId {
        self.section = builder.tag_open(ElementKind::Body);
        self.level = 0;
        self.has_title = false;
        self.section
    }

    fn on_title_start(&mut self, builder: &mut TreeBuilder, level: u8, no_section: bool) {
        if no_section {
            self.plain_heading = Some(level);
            open_heading(builder, level, self.heading_classes);
            return;
        }
        if self.level < level {
            // Deeper heading: content already emitted after the current
            // section's title belongs to a new subsection.
            let split = if self.has_title { 1 } else { 0 };
            if builder.tree().child_count(self.section) > split {
                self.make_section(builder, split);
            }
        } else {
            self.close_section(builder, self.level - level + 1);
        }
        self.open_section(builder, level);

        builder.tag_open(ElementKind::Title);
        builder.tag_body();
        open_heading(builder, level, self.heading_classes);
    }

    fn on_title_end(&mut self, builder: &mut TreeBuilder) {
        if let Some(level) = self.plain_heading.take() {
            close_heading(builder, level, self.heading_classes);
            return;
        }
        close_heading(builder, self.level, self.heading_classes);
        builder.tag_close(ElementKind::Title);
        self.has_title = true;
    }

    fn on_body_end(&mut self, builder: &mut TreeBuilder) {
        if self.level > 0 {
            self.close_section(builder, self.level);
        }
    }
}
