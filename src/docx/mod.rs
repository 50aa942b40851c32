//! Word-processor dialect ingestion.
//!
//! Parses a DOCX-derived markup stream into the canonical render tree: a
//! `document` root holding a `styles` block (named styles with `basedOn`
//! inheritance) and a `body` of paragraphs and runs. Paragraphs whose
//! effective outline level is set are headings and drive the
//! section-restructuring handler; everything else becomes `p`/`span`
//! elements carrying resolved CSS.

mod section;

pub use section::{FlatTitleHandler, SectionTitleHandler, TitleHandler};

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::document::Document;
use crate::dom::{ElementKind, NodeId};
use crate::error::Result;
use crate::reader::{
    DocReader, ElementHandler, ParseContext, TagId, TextFlags, feed_str, tag_lookup,
};
use crate::style::{Style, StyleKind, TextAlign, ToCss};

/// Behavior switches for ingestion. These affect the produced tree shape,
/// not the parsing itself.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Emit headings as a paragraph with a level-derived class instead of
    /// a leveled heading tag.
    pub heading_classes: bool,
    /// Rebuild the nested section tree implied by heading levels. When
    /// off, headings are emitted in place and the body stays flat.
    pub build_sections: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            heading_classes: false,
            build_sections: true,
        }
    }
}

/// Ingest a dialect document from a string.
pub fn ingest_str(xml: &str, options: &IngestOptions) -> Result<Document> {
    let mut reader = DocReader::new();
    {
        let titles: Box<dyn TitleHandler> = if options.build_sections {
            Box::new(SectionTitleHandler::new(options.heading_classes))
        } else {
            Box::new(FlatTitleHandler::new(options.heading_classes))
        };
        let mut scope = reader.scoped(Box::new(DocumentHandler::new(titles)));
        feed_str(xml, &mut scope)?;
    }

    let ctx = reader.into_context();
    let styles = ctx.styles;
    let (tree, attachments, encoding) = ctx.builder.into_parts();
    Ok(Document {
        tree,
        styles,
        attachments,
        encoding,
    })
}

/// Ingest a dialect document from a file, honoring a byte-order mark.
pub fn ingest_file(path: impl AsRef<Path>, options: &IngestOptions) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    let encoding = encoding_rs::Encoding::for_bom(&bytes)
        .map(|(encoding, _)| encoding)
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(&bytes);
    ingest_str(&text, options)
}

/// Tag ids shared by the dialect handlers.
mod tag {
    use crate::reader::TagId;

    pub const DOCUMENT: TagId = 1;
    pub const STYLES: TagId = 2;
    pub const BODY: TagId = 3;
    pub const STYLE: TagId = 4;
    pub const NAME: TagId = 5;
    pub const BASED_ON: TagId = 6;
    pub const PPR: TagId = 7;
    pub const RPR: TagId = 8;
    pub const P: TagId = 9;
    pub const R: TagId = 10;
    pub const T: TagId = 11;
    pub const JC: TagId = 12;
    pub const PAGE_BREAK_BEFORE: TagId = 13;
    pub const KEEP_NEXT: TagId = 14;
    pub const OUTLINE_LVL: TagId = 15;
    pub const P_STYLE: TagId = 16;
    pub const R_STYLE: TagId = 17;
    pub const BOLD: TagId = 18;
    pub const ITALIC: TagId = 19;
    pub const UNDERLINE: TagId = 20;
    pub const STRIKE: TagId = 21;
}

/// Toggle elements are on when present; `val` can switch them off.
fn parse_toggle(val: &str) -> bool {
    !matches!(val, "0" | "false" | "none" | "off")
}

/// Heading level implied by a 0-based outline level.
fn heading_level(outline: u8) -> u8 {
    outline.saturating_add(1).min(6)
}

/// Root handler: recognizes the document envelope and hands its two
/// regions to their specialized handlers.
pub struct DocumentHandler {
    titles: Option<Box<dyn TitleHandler>>,
}

impl DocumentHandler {
    pub fn new(titles: Box<dyn TitleHandler>) -> Self {
        Self {
            titles: Some(titles),
        }
    }
}

impl ElementHandler for DocumentHandler {
    fn tag_id(&self, name: &str) -> Option<TagId> {
        tag_lookup(
            &[
                ("document", tag::DOCUMENT),
                ("styles", tag::STYLES),
                ("body", tag::BODY),
            ],
            name,
        )
    }

    fn on_tag_open(&mut self, ctx: &mut ParseContext, tag: TagId) -> Option<NodeId> {
        match tag {
            tag::STYLES => {
                ctx.install(Box::new(StylesHandler::new()));
                None
            }
            tag::BODY => {
                let Some(mut titles) = self.titles.take() else {
                    log::warn!("second body element skipped");
                    ctx.skip_subtree();
                    return None;
                };
                let body = titles.on_body_start(&mut ctx.builder);
                ctx.builder.tag_body();
                ctx.install(Box::new(BodyHandler::new(titles)));
                Some(body)
            }
            _ => None,
        }
    }

    fn on_tag_close(&mut self, _ctx: &mut ParseContext, _name: &str) {}
}

/// Parses the `styles` block into the registry.
struct StylesHandler {
    /// Style under construction, shared with the property sub-handler.
    style: Rc<RefCell<Style>>,
    in_style: bool,
    state: TagId,
}

impl StylesHandler {
    fn new() -> Self {
        Self {
            style: Rc::new(RefCell::new(Style::new("", "", StyleKind::Paragraph))),
            in_style: false,
            state: 0,
        }
    }
}

impl ElementHandler for StylesHandler {
    fn tag_id(&self, name: &str) -> Option<TagId> {
        tag_lookup(
            &[
                ("styles", tag::STYLES),
                ("style", tag::STYLE),
                ("name", tag::NAME),
                ("basedOn", tag::BASED_ON),
                ("pPr", tag::PPR),
                ("rPr", tag::RPR),
            ],
            name,
        )
    }

    fn on_tag_open(&mut self, ctx: &mut ParseContext, tag: TagId) -> Option<NodeId> {
        self.state = tag;
        match tag {
            tag::STYLE => {
                *self.style.borrow_mut() = Style::new("", "", StyleKind::Paragraph);
                self.in_style = true;
            }
            tag::PPR if self.in_style => {
                ctx.install(Box::new(PropsHandler::new(
                    self.style.clone(),
                    StyleKind::Paragraph,
                )));
            }
            tag::RPR if self.in_style => {
                ctx.install(Box::new(PropsHandler::new(
                    self.style.clone(),
                    StyleKind::Character,
                )));
            }
            _ => {}
        }
        None
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext, _ns: &str, name: &str, value: &str) {
        match self.state {
            tag::STYLE => match name {
                "styleId" => self.style.borrow_mut().set_id(value),
                "type" => self.style.borrow_mut().set_kind(match value {
                    "character" => StyleKind::Character,
                    _ => StyleKind::Paragraph,
                }),
                _ => {}
            },
            tag::NAME if name == "val" => self.style.borrow_mut().set_name(value),
            tag::BASED_ON if name == "val" => self.style.borrow_mut().set_based_on(value),
            _ => {}
        }
    }

    fn on_tag_close(&mut self, ctx: &mut ParseContext, name: &str) {
        match name {
            "style" => {
                let style = std::mem::replace(
                    &mut *self.style.borrow_mut(),
                    Style::new("", "", StyleKind::Paragraph),
                );
                // Invalid styles are dropped by the registry.
                ctx.styles.add(style);
                self.in_style = false;
            }
            "styles" => ctx.finish(),
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.in_style = false;
        self.state = 0;
    }
}

/// Parses one `pPr` or `rPr` sub-tree into the shared style's matching
/// property container.
struct PropsHandler {
    style: Rc<RefCell<Style>>,
    scope: StyleKind,
    state: TagId,
}

impl PropsHandler {
    fn new(style: Rc<RefCell<Style>>, scope: StyleKind) -> Self {
        Self {
            style,
            scope,
            state: 0,
        }
    }
}

const PARA_PROPS: &[(&str, TagId)] = &[
    ("jc", tag::JC),
    ("pageBreakBefore", tag::PAGE_BREAK_BEFORE),
    ("keepNext", tag::KEEP_NEXT),
    ("outlineLvl", tag::OUTLINE_LVL),
    ("pStyle", tag::P_STYLE),
];

const CHAR_PROPS: &[(&str, TagId)] = &[
    ("b", tag::BOLD),
    ("i", tag::ITALIC),
    ("u", tag::UNDERLINE),
    ("strike", tag::STRIKE),
    ("rStyle", tag::R_STYLE),
];

impl ElementHandler for PropsHandler {
    fn tag_id(&self, name: &str) -> Option<TagId> {
        match self.scope {
            StyleKind::Paragraph => tag_lookup(PARA_PROPS, name),
            StyleKind::Character => tag_lookup(CHAR_PROPS, name),
        }
    }

    fn on_tag_open(&mut self, _ctx: &mut ParseContext, tag: TagId) -> Option<NodeId> {
        self.state = tag;
        let mut style = self.style.borrow_mut();
        match tag {
            tag::BOLD => style.rpr_mut().bold = Some(true),
            tag::ITALIC => style.rpr_mut().italic = Some(true),
            tag::UNDERLINE => style.rpr_mut().underline = Some(true),
            tag::STRIKE => style.rpr_mut().strikethrough = Some(true),
            tag::PAGE_BREAK_BEFORE => style.ppr_mut().page_break_before = Some(true),
            tag::KEEP_NEXT => style.ppr_mut().keep_with_next = Some(true),
            _ => {}
        }
        None
    }

    fn on_attribute(&mut self, _ctx: &mut ParseContext, _ns: &str, name: &str, value: &str) {
        if name != "val" {
            return;
        }
        let mut style = self.style.borrow_mut();
        match self.state {
            tag::JC => style.ppr_mut().text_align = Some(TextAlign::from_word(value)),
            tag::OUTLINE_LVL => match value.parse::<u8>() {
                Ok(level) => style.ppr_mut().outline_level = Some(level),
                Err(_) => log::warn!("invalid outline level {value:?}"),
            },
            tag::P_STYLE | tag::R_STYLE => style.set_based_on(value),
            tag::BOLD => style.rpr_mut().bold = Some(parse_toggle(value)),
            tag::ITALIC => style.rpr_mut().italic = Some(parse_toggle(value)),
            tag::UNDERLINE => style.rpr_mut().underline = Some(parse_toggle(value)),
            tag::STRIKE => style.rpr_mut().strikethrough = Some(parse_toggle(value)),
            tag::PAGE_BREAK_BEFORE => {
                style.ppr_mut().page_break_before = Some(parse_toggle(value));
            }
            tag::KEEP_NEXT => style.ppr_mut().keep_with_next = Some(parse_toggle(value)),
            _ => {}
        }
    }

    fn on_tag_close(&mut self, ctx: &mut ParseContext, name: &str) {
        if name == "pPr" || name == "rPr" {
            ctx.finish();
        }
    }

    fn reset(&mut self) {
        self.state = 0;
    }
}

/// Parses the `body` region: paragraphs, runs and text, delegating
/// heading boundaries to the title handler.
struct BodyHandler {
    titles: Box<dyn TitleHandler>,
    /// Direct paragraph formatting; `pStyle` binds the named style as base.
    para: Rc<RefCell<Style>>,
    /// Direct run formatting; `rStyle` binds the named style as base.
    run: Rc<RefCell<Style>>,
    heading: bool,
    para_open: bool,
    span_open: bool,
}

impl BodyHandler {
    fn new(titles: Box<dyn TitleHandler>) -> Self {
        Self {
            titles,
            para: Rc::new(RefCell::new(Style::new("", "", StyleKind::Paragraph))),
            run: Rc::new(RefCell::new(Style::new("", "", StyleKind::Character))),
            heading: false,
            para_open: false,
            span_open: false,
        }
    }

    /// Emit the element for the current paragraph once its properties are
    /// known: a heading when the effective outline level is set, a plain
    /// paragraph otherwise. Resolved CSS is attached as a style attribute.
    fn emit_paragraph(&mut self, ctx: &mut ParseContext) {
        let props = Style::para_props(&self.para, &ctx.styles);
        let css = props.to_css_string();
        let css = css.trim_end();

        match props.outline_level {
            Some(outline) => {
                self.heading = true;
                self.titles
                    .on_title_start(&mut ctx.builder, heading_level(outline), false);
            }
            None => {
                ctx.builder.tag_open(ElementKind::Paragraph);
            }
        }
        if !css.is_empty() {
            ctx.builder.attribute("style", css);
        }
        ctx.builder.tag_body();
        self.para_open = true;
    }
}

impl ElementHandler for BodyHandler {
    fn tag_id(&self, name: &str) -> Option<TagId> {
        tag_lookup(
            &[
                ("body", tag::BODY),
                ("p", tag::P),
                ("pPr", tag::PPR),
                ("r", tag::R),
                ("rPr", tag::RPR),
                ("t", tag::T),
            ],
            name,
        )
    }

    fn on_tag_open(&mut self, ctx: &mut ParseContext, tag: TagId) -> Option<NodeId> {
        match tag {
            tag::P => {
                *self.para.borrow_mut() = Style::new("", "", StyleKind::Paragraph);
                self.heading = false;
                self.para_open = false;
                None
            }
            tag::PPR => {
                ctx.install(Box::new(PropsHandler::new(
                    self.para.clone(),
                    StyleKind::Paragraph,
                )));
                None
            }
            tag::R => {
                if !self.para_open {
                    self.emit_paragraph(ctx);
                }
                *self.run.borrow_mut() = Style::new("", "", StyleKind::Character);
                self.span_open = false;
                None
            }
            tag::RPR => {
                ctx.install(Box::new(PropsHandler::new(
                    self.run.clone(),
                    StyleKind::Character,
                )));
                None
            }
            tag::T => {
                if !self.para_open {
                    self.emit_paragraph(ctx);
                }
                if !self.span_open {
                    let css = Style::run_props(&self.run, &ctx.styles).to_css_string();
                    let css = css.trim_end();
                    if !css.is_empty() {
                        let span = ctx.builder.tag_open(ElementKind::Span);
                        ctx.builder.attribute("style", css);
                        ctx.builder.tag_body();
                        self.span_open = true;
                        return Some(span);
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn on_text(&mut self, ctx: &mut ParseContext, text: &str, flags: TextFlags) {
        ctx.builder.text(text, flags);
    }

    fn on_tag_close(&mut self, ctx: &mut ParseContext, name: &str) {
        match name {
            "r" => {
                if self.span_open {
                    ctx.builder.tag_close(ElementKind::Span);
                    self.span_open = false;
                }
            }
            "p" => {
                if !self.para_open {
                    // Paragraph with no runs still emits its element.
                    self.emit_paragraph(ctx);
                }
                if self.heading {
                    self.titles.on_title_end(&mut ctx.builder);
                } else {
                    ctx.builder.tag_close(ElementKind::Paragraph);
                }
                self.para_open = false;
                self.heading = false;
            }
            "body" => {
                self.titles.on_body_end(&mut ctx.builder);
                ctx.builder.tag_close(ElementKind::Body);
                ctx.finish();
            }
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.heading = false;
        self.para_open = false;
        self.span_open = false;
    }
}
