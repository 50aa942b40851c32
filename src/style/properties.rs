//! Sparse presentation-property containers for one style scope.
//!
//! Word-processor styles carry two property sets: paragraph-level (`pPr`)
//! and character-level (`rPr`). Each property is `Option`-wrapped so that
//! "explicitly given" and "inherited/absent" stay distinguishable until the
//! inheritance merge runs.

/// Trait for converting style values to CSS declaration text.
pub trait ToCss {
    /// Write this value as CSS to the buffer.
    fn to_css(&self, buf: &mut String);

    /// Convert to a CSS string (convenience method).
    fn to_css_string(&self) -> String {
        let mut buf = String::new();
        self.to_css(&mut buf);
        buf
    }
}

/// Paragraph text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextAlign {
    Left,
    Right,
    Center,
    Justify,
}

impl TextAlign {
    /// Map a word-processor `jc` value onto an alignment.
    ///
    /// Unrecognized values render justified, matching how the renderer
    /// treats any alignment it has no specific handling for.
    pub fn from_word(val: &str) -> TextAlign {
        match val {
            "left" | "start" => TextAlign::Left,
            "right" | "end" => TextAlign::Right,
            "center" => TextAlign::Center,
            _ => TextAlign::Justify,
        }
    }
}

impl ToCss for TextAlign {
    fn to_css(&self, buf: &mut String) {
        buf.push_str(match self {
            TextAlign::Left => "left",
            TextAlign::Right => "right",
            TextAlign::Center => "center",
            TextAlign::Justify => "justify",
        });
    }
}

/// Character-scope properties (`rPr`).
///
/// `None` means "not set here" and is filled from the base style during the
/// inheritance merge; `Some(false)` is an explicit local override that
/// blocks inheritance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunProperties {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
}

impl RunProperties {
    /// Fill properties this container left unset from `base`.
    /// Explicit local values always win over inherited ones.
    pub fn combine_with(&mut self, base: &RunProperties) {
        self.bold = self.bold.or(base.bold);
        self.italic = self.italic.or(base.italic);
        self.underline = self.underline.or(base.underline);
        self.strikethrough = self.strikethrough.or(base.strikethrough);
    }
}

impl ToCss for RunProperties {
    fn to_css(&self, buf: &mut String) {
        if self.bold == Some(true) {
            buf.push_str("font-weight: bold; ");
        }
        if self.italic == Some(true) {
            buf.push_str("font-style: italic; ");
        }
        if self.underline == Some(true) {
            buf.push_str("text-decoration: underline; ");
        }
        if self.strikethrough == Some(true) {
            buf.push_str("text-decoration: line-through; ");
        }
    }
}

/// Paragraph-scope properties (`pPr`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParaProperties {
    pub text_align: Option<TextAlign>,
    pub page_break_before: Option<bool>,
    pub keep_with_next: Option<bool>,
    /// Word-processor outline level, 0-based. A paragraph with an effective
    /// outline level is a heading.
    pub outline_level: Option<u8>,
}

impl ParaProperties {
    /// Fill properties this container left unset from `base`.
    pub fn combine_with(&mut self, base: &ParaProperties) {
        self.text_align = self.text_align.or(base.text_align);
        self.page_break_before = self.page_break_before.or(base.page_break_before);
        self.keep_with_next = self.keep_with_next.or(base.keep_with_next);
        self.outline_level = self.outline_level.or(base.outline_level);
    }
}

impl ToCss for ParaProperties {
    fn to_css(&self, buf: &mut String) {
        if let Some(align) = self.text_align {
            buf.push_str("text-align: ");
            align.to_css(buf);
            buf.push_str("; ");
        }
        // Both source flags map onto the same CSS property. Page-break-before
        // is checked first and wins when both are set.
        if self.page_break_before == Some(true) {
            buf.push_str("page-break-before: always; ");
        } else if self.keep_with_next == Some(true) {
            buf.push_str("page-break-before: avoid; ");
        }
    }
}
