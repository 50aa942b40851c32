//! Event dispatch from the raw markup stream to semantic handlers.
//!
//! The dispatcher is a small state machine between the tokenizer and the
//! active [`ElementHandler`]: it tracks whether the stream is in the
//! declaration or the document proper, drops skipped sub-trees wholesale,
//! and routes declaration metadata and binary attachments to their sinks.
//! Handlers never see stream-format concerns, only document-phase events.

mod handler;
mod xml;

pub use handler::{ElementHandler, TagId, tag_lookup};
pub use xml::feed_str;

use bitflags::bitflags;

use crate::dom::{NodeId, TreeBuilder};
use crate::style::StyleRegistry;

/// The declaration pseudo-tag delivered first by the tokenizer.
pub const DECLARATION_TAG: &str = "?xml";

bitflags! {
    /// Hints accompanying a text event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextFlags: u32 {
        /// Collapse insignificant whitespace.
        const TRIM = 1;
        /// Whitespace is significant (CDATA or resolved entity content).
        const PRESERVE = 1 << 1;
    }
}

/// Stream phase. The declaration always precedes the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    BeforeStart,
    Declaration,
    Document,
}

enum HandlerOp {
    Install(Box<dyn ElementHandler>),
    Finish,
}

/// Shared parse state handed to every handler callback: the tree under
/// construction, the style registry, and the control requests the
/// dispatcher applies once the callback returns.
pub struct ParseContext {
    pub builder: TreeBuilder,
    pub styles: StyleRegistry,
    ops: Vec<HandlerOp>,
    skip_requested: bool,
}

impl ParseContext {
    pub fn new() -> Self {
        Self {
            builder: TreeBuilder::new(),
            styles: StyleRegistry::new(),
            ops: Vec::new(),
            skip_requested: false,
        }
    }

    /// Ask the dispatcher to drop the sub-tree of the tag being opened.
    pub fn skip_subtree(&mut self) {
        self.skip_requested = true;
    }

    /// Install `handler` as the active handler once this callback returns.
    pub fn install(&mut self, handler: Box<dyn ElementHandler>) {
        self.ops.push(HandlerOp::Install(handler));
    }

    /// Uninstall the active handler, restoring its predecessor, once this
    /// callback returns.
    pub fn finish(&mut self) {
        self.ops.push(HandlerOp::Finish);
    }

    fn take_ops(&mut self) -> Vec<HandlerOp> {
        std::mem::take(&mut self.ops)
    }

    fn take_skip_request(&mut self) -> bool {
        std::mem::replace(&mut self.skip_requested, false)
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The stream-to-handler bridge.
pub struct DocReader {
    phase: Phase,
    skip_depth: u32,
    handlers: Vec<Box<dyn ElementHandler>>,
    pub ctx: ParseContext,
}

impl DocReader {
    pub fn new() -> Self {
        Self {
            phase: Phase::BeforeStart,
            skip_depth: 0,
            handlers: Vec::new(),
            ctx: ParseContext::new(),
        }
    }

    /// Reset for a new stream.
    pub fn on_start(&mut self) {
        self.skip_depth = 0;
        self.phase = Phase::BeforeStart;
    }

    /// A tag opened. Returns the tree node the handler created, if any.
    pub fn on_tag_open(&mut self, ns: &str, name: &str) -> Option<NodeId> {
        if self.phase == Phase::BeforeStart && name == DECLARATION_TAG {
            self.phase = Phase::Declaration;
            return None;
        }
        if self.is_skipping() {
            // Nested tag inside a skipped sub-tree.
            self.skip_depth += 1;
            return None;
        }
        let node = self
            .handlers
            .last_mut()
            .and_then(|h| h.handle_tag_open(&mut self.ctx, ns, name));
        self.apply_ops();
        node
    }

    /// All attributes of the open tag have been delivered.
    pub fn on_tag_body(&mut self) {
        if self.phase == Phase::Declaration || self.is_skipping() {
            return;
        }
        if let Some(h) = self.handlers.last_mut() {
            h.on_tag_body(&mut self.ctx);
            self.apply_ops();
        }
    }

    /// A tag closed.
    pub fn on_tag_close(&mut self, _ns: &str, name: &str) {
        match self.phase {
            Phase::Declaration => self.phase = Phase::Document,
            Phase::Document => {
                if self.is_skipping() {
                    self.skip_depth -= 1;
                    if self.skip_depth == 0 {
                        // Back at the level that started the skip.
                        if let Some(h) = self.handlers.last_mut() {
                            h.on_skip_end(&mut self.ctx);
                            self.apply_ops();
                        }
                    }
                } else if let Some(h) = self.handlers.last_mut() {
                    h.on_tag_close(&mut self.ctx, name);
                    self.apply_ops();
                }
            }
            Phase::BeforeStart => {
                log::error!("unexpected close of {name} before document start");
            }
        }
    }

    /// An attribute of the open tag. Declaration attributes feed the
    /// document metadata sink, not the handler.
    pub fn on_attribute(&mut self, ns: &str, name: &str, value: &str) {
        match self.phase {
            Phase::Declaration => self.ctx.builder.declaration_attribute(name, value),
            Phase::Document => {
                if self.is_skipping() {
                    return;
                }
                if let Some(h) = self.handlers.last_mut() {
                    h.on_attribute(&mut self.ctx, ns, name, value);
                    self.apply_ops();
                }
            }
            Phase::BeforeStart => {
                log::error!("unexpected attribute {name} before document start");
            }
        }
    }

    /// Character data.
    pub fn on_text(&mut self, text: &str, flags: TextFlags) {
        if self.is_skipping() {
            return;
        }
        if let Some(h) = self.handlers.last_mut() {
            h.on_text(&mut self.ctx, text, flags);
            self.apply_ops();
        }
    }

    /// Binary attachment. Returns whether the payload was accepted, so the
    /// stream source can decide whether to buffer or discard it.
    pub fn on_blob(&mut self, name: &str, data: &[u8]) -> bool {
        if self.is_skipping() {
            return false;
        }
        self.ctx.builder.add_attachment(name, data)
    }

    pub fn is_skipping(&self) -> bool {
        self.skip_depth > 0
    }

    pub fn skip_depth(&self) -> u32 {
        self.skip_depth
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of installed handlers.
    pub fn handler_depth(&self) -> usize {
        self.handlers.len()
    }

    /// Install `handler` as the active handler, resetting its state.
    pub fn push_handler(&mut self, mut handler: Box<dyn ElementHandler>) {
        handler.reset();
        self.handlers.push(handler);
    }

    /// Uninstall the active handler, restoring its predecessor.
    pub fn pop_handler(&mut self) {
        if self.handlers.pop().is_none() {
            log::warn!("handler uninstall with none installed");
        }
    }

    /// Install `handler` for the lifetime of the returned guard. The guard
    /// uninstalls it on drop, so an early return can never leave a stale
    /// handler active.
    pub fn scoped(&mut self, handler: Box<dyn ElementHandler>) -> HandlerGuard<'_> {
        self.push_handler(handler);
        HandlerGuard { reader: self }
    }

    /// Tear down into the parse results.
    pub fn into_context(self) -> ParseContext {
        self.ctx
    }

    fn apply_ops(&mut self) {
        for op in self.ctx.take_ops() {
            match op {
                HandlerOp::Install(handler) => self.push_handler(handler),
                HandlerOp::Finish => self.pop_handler(),
            }
        }
        if self.ctx.take_skip_request() {
            self.skip_depth = 1;
        }
    }
}

impl Default for DocReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard pairing a handler install with its uninstall.
pub struct HandlerGuard<'a> {
    reader: &'a mut DocReader,
}

impl Drop for HandlerGuard<'_> {
    fn drop(&mut self) {
        self.reader.pop_handler();
    }
}

impl std::ops::Deref for HandlerGuard<'_> {
    type Target = DocReader;

    fn deref(&self) -> &DocReader {
        self.reader
    }
}

impl std::ops::DerefMut for HandlerGuard<'_> {
    fn deref_mut(&mut self) -> &mut DocReader {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementKind;

    /// Records document-phase events; recognizes `a` and `b`.
    #[derive(Default)]
    struct Recorder {
        events: std::rc::Rc<std::cell::RefCell<Vec<String>>>,
    }

    impl ElementHandler for Recorder {
        fn tag_id(&self, name: &str) -> Option<TagId> {
            tag_lookup(&[("a", 1), ("b", 2)], name)
        }

        fn on_tag_open(&mut self, ctx: &mut ParseContext, tag: TagId) -> Option<NodeId> {
            self.events.borrow_mut().push(format!("open:{tag}"));
            Some(ctx.builder.tag_open(ElementKind::Paragraph))
        }

        fn on_tag_close(&mut self, ctx: &mut ParseContext, name: &str) {
            self.events.borrow_mut().push(format!("close:{name}"));
            ctx.builder.tag_close(ElementKind::Paragraph);
        }

        fn on_attribute(&mut self, _ctx: &mut ParseContext, _ns: &str, name: &str, value: &str) {
            self.events.borrow_mut().push(format!("attr:{name}={value}"));
        }

        fn on_text(&mut self, _ctx: &mut ParseContext, text: &str, _flags: TextFlags) {
            self.events.borrow_mut().push(format!("text:{text}"));
        }

        fn on_skip_end(&mut self, _ctx: &mut ParseContext) {
            self.events.borrow_mut().push("skip-end".to_string());
        }
    }

    fn recorder() -> (Recorder, std::rc::Rc<std::cell::RefCell<Vec<String>>>) {
        let events = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        (
            Recorder {
                events: events.clone(),
            },
            events,
        )
    }

    fn open_document(reader: &mut DocReader) {
        reader.on_start();
        reader.on_tag_open("", DECLARATION_TAG);
        reader.on_tag_close("", DECLARATION_TAG);
    }

    #[test]
    fn test_declaration_attributes_feed_metadata_sink() {
        let mut reader = DocReader::new();
        let (handler, events) = recorder();
        reader.push_handler(Box::new(handler));

        reader.on_start();
        reader.on_tag_open("", DECLARATION_TAG);
        reader.on_attribute("", "version", "1.0");
        reader.on_attribute("", "encoding", "utf-8");
        reader.on_tag_close("", DECLARATION_TAG);

        // Nothing reached the handler; the encoding reached the builder.
        assert!(events.borrow().is_empty());
        assert_eq!(reader.ctx.builder.encoding(), Some(encoding_rs::UTF_8));
        assert_eq!(reader.phase(), Phase::Document);
    }

    #[test]
    fn test_unknown_tag_skips_whole_subtree() {
        let mut reader = DocReader::new();
        let (handler, events) = recorder();
        reader.push_handler(Box::new(handler));
        open_document(&mut reader);

        reader.on_tag_open("", "a");
        reader.on_tag_body();

        // Unknown sub-tree with nested content.
        assert!(reader.on_tag_open("", "mystery").is_none());
        assert_eq!(reader.skip_depth(), 1);
        reader.on_attribute("", "id", "dropped");
        reader.on_tag_open("", "inner");
        assert_eq!(reader.skip_depth(), 2);
        reader.on_text("dropped", TextFlags::TRIM);
        reader.on_tag_close("", "inner");
        reader.on_tag_close("", "mystery");
        assert_eq!(reader.skip_depth(), 0);

        reader.on_tag_close("", "a");

        let events = events.borrow();
        assert_eq!(
            events.as_slice(),
            &["open:1", "skip-end", "close:a"],
            "skipped sub-tree produced no callbacks beyond the notification"
        );
    }

    #[test]
    fn test_skipped_subtree_creates_no_nodes() {
        let mut reader = DocReader::new();
        let (handler, _) = recorder();
        reader.push_handler(Box::new(handler));
        open_document(&mut reader);

        reader.on_tag_open("", "a");
        let before = reader.ctx.builder.tree().len();
        reader.on_tag_open("", "mystery");
        reader.on_tag_open("", "a");
        reader.on_text("inside", TextFlags::TRIM);
        reader.on_tag_close("", "a");
        reader.on_tag_close("", "mystery");
        assert_eq!(reader.ctx.builder.tree().len(), before);
    }

    #[test]
    fn test_close_before_start_is_reported_not_fatal() {
        let mut reader = DocReader::new();
        let (handler, events) = recorder();
        reader.push_handler(Box::new(handler));
        reader.on_start();

        // Out-of-order events in the before-start phase are no-ops.
        reader.on_tag_close("", "a");
        reader.on_attribute("", "id", "x");
        assert!(events.borrow().is_empty());
        assert_eq!(reader.phase(), Phase::BeforeStart);

        // The stream keeps working afterwards.
        reader.on_tag_open("", DECLARATION_TAG);
        reader.on_tag_close("", DECLARATION_TAG);
        reader.on_tag_open("", "a");
        assert_eq!(events.borrow().last().unwrap(), "open:1");
    }

    #[test]
    fn test_text_and_blob_dropped_while_skipping() {
        let mut reader = DocReader::new();
        let (handler, events) = recorder();
        reader.push_handler(Box::new(handler));
        open_document(&mut reader);

        reader.on_tag_open("", "mystery");
        reader.on_text("dropped", TextFlags::TRIM);
        assert!(!reader.on_blob("image", b"bytes"));
        reader.on_tag_close("", "mystery");

        assert_eq!(events.borrow().as_slice(), &["skip-end"]);
        assert!(reader.on_blob("image", b"bytes"));
    }

    #[test]
    fn test_handler_stack_discipline() {
        // Install/uninstall restores the previous handler exactly, three deep.
        struct Level {
            id: u32,
            log: std::rc::Rc<std::cell::RefCell<Vec<u32>>>,
        }

        impl ElementHandler for Level {
            fn tag_id(&self, _name: &str) -> Option<TagId> {
                Some(0)
            }
            fn on_tag_open(&mut self, _ctx: &mut ParseContext, _tag: TagId) -> Option<NodeId> {
                self.log.borrow_mut().push(self.id);
                None
            }
            fn on_tag_close(&mut self, ctx: &mut ParseContext, _name: &str) {
                ctx.finish();
            }
        }

        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut reader = DocReader::new();
        for id in 1..=3 {
            reader.push_handler(Box::new(Level { id, log: log.clone() }));
        }
        open_document(&mut reader);
        assert_eq!(reader.handler_depth(), 3);

        reader.on_tag_open("", "x");
        reader.on_tag_close("", "x");
        reader.on_tag_open("", "x");
        reader.on_tag_close("", "x");
        reader.on_tag_open("", "x");

        assert_eq!(log.borrow().as_slice(), &[3, 2, 1]);
        assert_eq!(reader.handler_depth(), 1);
    }

    #[test]
    fn test_scoped_guard_restores_on_early_exit() {
        let mut reader = DocReader::new();
        let (handler, _) = recorder();
        reader.push_handler(Box::new(handler));

        {
            let (inner, _) = recorder();
            let mut scope = reader.scoped(Box::new(inner));
            assert_eq!(scope.handler_depth(), 2);
            scope.on_start();
            // Early exit: the guard drops here.
        }
        assert_eq!(reader.handler_depth(), 1);
    }
}
