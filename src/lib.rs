//! # folia
//!
//! A fast, lightweight library for ingesting markup documents into styled
//! document trees ready for layout and rendering.
//!
//! ## Features
//!
//! - SAX-style event dispatch with pluggable semantic handlers and
//!   whole-sub-tree skipping of unknown markup
//! - Word-processor dialect ingestion: named styles with `basedOn`
//!   inheritance, paragraph and run formatting resolved to CSS
//! - Heading-to-section restructuring: a flat heading stream becomes a
//!   properly nested section tree, titles attached to their sections
//!
//! ## Quick Start
//!
//! ```
//! use folia::{IngestOptions, ingest_str};
//!
//! let xml = r#"<?xml version="1.0"?>
//! <document>
//!   <body>
//!     <p><pPr><outlineLvl val="0"/></pPr><r><t>Chapter One</t></r></p>
//!     <p><r><t>It began at dawn.</t></r></p>
//!   </body>
//! </document>"#;
//!
//! let doc = ingest_str(xml, &IngestOptions::default()).unwrap();
//! let outline = doc.outline();
//! assert_eq!(outline[0].title, "Chapter One");
//! ```
//!
//! The [`Document`] bundles the finished tree with the style registry the
//! markup declared; per-element CSS is attached as `style` attributes
//! during ingestion.

pub mod document;
pub mod docx;
pub mod dom;
pub mod error;
pub mod reader;
pub mod style;

pub use document::{Document, OutlineEntry};
pub use docx::{IngestOptions, ingest_file, ingest_str};
pub use error::{Error, Result};
