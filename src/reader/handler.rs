//! Semantic element handlers.
//!
//! A handler gives meaning to the tags of one document region. It maps raw
//! tag names onto small tag ids through its own table; a name with no entry
//! makes the dispatcher drop the whole sub-tree, which is how unknown or
//! irrelevant markup is filtered without error.

use super::{ParseContext, TextFlags};
use crate::dom::NodeId;

/// Small integer identifying a recognized semantic element.
pub type TagId = u32;

/// Look up a tag name in a handler's name-to-id table.
pub fn tag_lookup(table: &[(&str, TagId)], name: &str) -> Option<TagId> {
    table.iter().find(|(n, _)| *n == name).map(|&(_, id)| id)
}

/// One semantic handler in the dispatcher's handler stack.
///
/// Handlers only ever see document-phase events; declaration bookkeeping
/// and sub-tree skipping stay inside the dispatcher. A handler installs a
/// sub-handler with [`ParseContext::install`] and uninstalls itself with
/// [`ParseContext::finish`]; the dispatcher applies both after the current
/// callback returns, keeping installs and uninstalls strictly paired.
pub trait ElementHandler {
    /// Map a raw tag name to this handler's tag id, `None` if the tag is
    /// of no interest here.
    fn tag_id(&self, name: &str) -> Option<TagId>;

    /// A recognized tag opened. Returns the tree node created for it, if any.
    fn on_tag_open(&mut self, ctx: &mut ParseContext, tag: TagId) -> Option<NodeId>;

    /// A tag in this handler's region closed.
    fn on_tag_close(&mut self, ctx: &mut ParseContext, name: &str);

    /// All attributes of the open tag have been delivered.
    fn on_tag_body(&mut self, _ctx: &mut ParseContext) {}

    /// Attribute of the open tag.
    fn on_attribute(&mut self, _ctx: &mut ParseContext, _ns: &str, _name: &str, _value: &str) {}

    /// Character data.
    fn on_text(&mut self, _ctx: &mut ParseContext, _text: &str, _flags: TextFlags) {}

    /// A skipped sub-tree finished; the stream is back at this handler's level.
    fn on_skip_end(&mut self, _ctx: &mut ParseContext) {}

    /// Clear accumulated state. Called when the handler is installed; must
    /// be idempotent.
    fn reset(&mut self) {}

    /// Open dispatch: unrecognized tags skip their whole sub-tree.
    fn handle_tag_open(
        &mut self,
        ctx: &mut ParseContext,
        _ns: &str,
        name: &str,
    ) -> Option<NodeId> {
        match self.tag_id(name) {
            Some(tag) => self.on_tag_open(ctx, tag),
            None => {
                ctx.skip_subtree();
                None
            }
        }
    }
}
