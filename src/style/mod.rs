//! Named style records with late-bound inheritance.
//!
//! A word-processor document declares styles up front; paragraphs and runs
//! reference them by id. A style may name a base style it inherits from,
//! resolved by registry lookup at first property access rather than at
//! construction time, so definition order does not matter.

mod properties;

pub use properties::{ParaProperties, RunProperties, TextAlign, ToCss};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Formatting scope of a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
}

/// Shared handle to a style. Styles are owned jointly by the registry and
/// by any element that keeps a direct reference; parsing is single-threaded.
pub type StyleRef = Rc<RefCell<Style>>;

/// One named, identified style record.
#[derive(Debug, Clone)]
pub struct Style {
    id: String,
    name: String,
    kind: StyleKind,
    based_on: Option<String>,
    ppr: ParaProperties,
    rpr: RunProperties,
    // Whether lazy inheritance has already run for each container.
    ppr_merged: bool,
    rpr_merged: bool,
}

impl Style {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: StyleKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            based_on: None,
            ppr: ParaProperties::default(),
            rpr: RunProperties::default(),
            ppr_merged: false,
            rpr_merged: false,
        }
    }

    /// A style missing either its id or its name must never be registered
    /// or referenced.
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StyleKind {
        self.kind
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_kind(&mut self, kind: StyleKind) {
        self.kind = kind;
    }

    pub fn based_on(&self) -> Option<&str> {
        self.based_on.as_deref()
    }

    pub fn set_based_on(&mut self, id: impl Into<String>) {
        self.based_on = Some(id.into());
    }

    /// Direct (pre-merge) access to the paragraph container, for builders.
    pub fn ppr_mut(&mut self) -> &mut ParaProperties {
        &mut self.ppr
    }

    /// Direct (pre-merge) access to the character container, for builders.
    pub fn rpr_mut(&mut self) -> &mut RunProperties {
        &mut self.rpr
    }

    /// Resolve the base style through the registry.
    ///
    /// Returns `None` when no base name is set, the name is dangling, or
    /// the base has a different kind. All three degrade silently to "no
    /// inheritance".
    pub fn base_style(&self, registry: &StyleRegistry) -> Option<StyleRef> {
        let based_on = self.based_on.as_deref()?;
        let base = registry.get(based_on)?;
        // A base that is currently borrowed for resolution is this style
        // itself (or an ancestor in a cyclic chain); treat it as absent.
        let kind = match base.try_borrow() {
            Ok(base) => base.kind,
            Err(_) => {
                log::warn!("cyclic base-style chain detected during resolution");
                return None;
            }
        };
        if kind == self.kind { Some(base) } else { None }
    }

    /// Resolved paragraph properties, merging the base chain on first call.
    ///
    /// The base's own accessor is used recursively, so each style in a
    /// chain is merged at most once no matter how deep the chain is.
    pub fn para_props(this: &StyleRef, registry: &StyleRegistry) -> ParaProperties {
        let Ok(mut style) = this.try_borrow_mut() else {
            // Re-entered while this style is being resolved: the base-style
            // chain is cyclic. Break the chain instead of recursing forever.
            log::warn!("cyclic base-style chain detected during resolution");
            return ParaProperties::default();
        };
        if !style.ppr_merged {
            if let Some(base) = style.base_style(registry) {
                let merged = Style::para_props(&base, registry);
                style.ppr.combine_with(&merged);
            }
            style.ppr_merged = true;
        }
        style.ppr.clone()
    }

    /// Resolved character properties, merging the base chain on first call.
    pub fn run_props(this: &StyleRef, registry: &StyleRegistry) -> RunProperties {
        let Ok(mut style) = this.try_borrow_mut() else {
            log::warn!("cyclic base-style chain detected during resolution");
            return RunProperties::default();
        };
        if !style.rpr_merged {
            if let Some(base) = style.base_style(registry) {
                let merged = Style::run_props(&base, registry);
                style.rpr.combine_with(&merged);
            }
            style.rpr_merged = true;
        }
        style.rpr.clone()
    }

    /// CSS declaration text for the container matching this style's kind.
    pub fn css(this: &StyleRef, registry: &StyleRegistry) -> String {
        let kind = this.borrow().kind;
        match kind {
            StyleKind::Paragraph => Style::para_props(this, registry).to_css_string(),
            StyleKind::Character => Style::run_props(this, registry).to_css_string(),
        }
    }
}

/// Mapping from style id to shared style, used to resolve base references.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: HashMap<String, StyleRef>,
}

impl StyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a style under its own id, replacing any previous entry.
    /// Invalid styles are dropped, so references to them resolve as absent.
    pub fn add(&mut self, style: Style) {
        if !style.is_valid() {
            log::debug!("dropping style with missing id or name");
            return;
        }
        self.styles
            .insert(style.id.clone(), Rc::new(RefCell::new(style)));
    }

    /// Look up a registered style by id.
    pub fn get(&self, id: &str) -> Option<StyleRef> {
        self.styles.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
