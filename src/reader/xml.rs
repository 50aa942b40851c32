//! quick-xml adapter for the event dispatcher.
//!
//! Maps tokenizer events onto the dispatcher contract: the XML declaration
//! becomes the `?xml` pseudo-tag (synthesized when the source omits it, so
//! the dispatcher always sees the declaration phase), start tags become
//! open/attribute*/body sequences, and empty tags additionally emit the
//! matching close.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{DECLARATION_TAG, DocReader, TextFlags};
use crate::error::Result;

/// Feed an XML string through the dispatcher.
pub fn feed_str(xml: &str, reader: &mut DocReader) -> Result<()> {
    let mut r = Reader::from_str(xml);
    reader.on_start();
    let mut declared = false;

    loop {
        match r.read_event() {
            Ok(Event::Decl(d)) => {
                reader.on_tag_open("", DECLARATION_TAG);
                if let Ok(version) = d.version() {
                    reader.on_attribute("", "version", &String::from_utf8_lossy(&version));
                }
                if let Some(Ok(encoding)) = d.encoding() {
                    reader.on_attribute("", "encoding", &String::from_utf8_lossy(&encoding));
                }
                if let Some(Ok(standalone)) = d.standalone() {
                    reader.on_attribute("", "standalone", &String::from_utf8_lossy(&standalone));
                }
                reader.on_tag_body();
                reader.on_tag_close("", DECLARATION_TAG);
                declared = true;
            }
            Ok(Event::Start(e)) => {
                ensure_declaration(reader, &mut declared);
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let (ns, local) = split_qname(&name);
                reader.on_tag_open(ns, local);
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let (ans, alocal) = split_qname(&key);
                    let value = attr
                        .decode_and_unescape_value(r.decoder())
                        .unwrap_or_default();
                    reader.on_attribute(ans, alocal, &value);
                }
                reader.on_tag_body();
            }
            Ok(Event::Empty(e)) => {
                ensure_declaration(reader, &mut declared);
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let (ns, local) = split_qname(&name);
                reader.on_tag_open(ns, local);
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    let (ans, alocal) = split_qname(&key);
                    let value = attr
                        .decode_and_unescape_value(r.decoder())
                        .unwrap_or_default();
                    reader.on_attribute(ans, alocal, &value);
                }
                reader.on_tag_body();
                reader.on_tag_close(ns, local);
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let (ns, local) = split_qname(&name);
                reader.on_tag_close(ns, local);
            }
            Ok(Event::Text(t)) => {
                reader.on_text(&String::from_utf8_lossy(t.as_ref()), TextFlags::TRIM);
            }
            Ok(Event::CData(t)) => {
                reader.on_text(&String::from_utf8_lossy(t.as_ref()), TextFlags::PRESERVE);
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    reader.on_text(&resolved, TextFlags::PRESERVE);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {} // comments, processing instructions, doctype
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Synthesize the declaration pseudo-tag when the source has none.
fn ensure_declaration(reader: &mut DocReader, declared: &mut bool) {
    if !*declared {
        reader.on_tag_open("", DECLARATION_TAG);
        reader.on_tag_body();
        reader.on_tag_close("", DECLARATION_TAG);
        *declared = true;
    }
}

/// Split a qualified name into its namespace prefix and local part.
fn split_qname(name: &str) -> (&str, &str) {
    match name.split_once(':') {
        Some((ns, local)) => (ns, local),
        None => ("", name),
    }
}

/// Resolve a general entity reference to its text.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "amp" => Some("&".to_string()),
        "lt" => Some("<".to_string()),
        "gt" => Some(">".to_string()),
        "quot" => Some("\"".to_string()),
        "apos" => Some("'".to_string()),
        _ => {
            // Numeric character references: &#169; or &#xA9;
            let code = entity.strip_prefix('#')?;
            let value = if let Some(hex) = code.strip_prefix('x').or_else(|| code.strip_prefix('X'))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                code.parse().ok()?
            };
            char::from_u32(value).map(|c| c.to_string())
        }
    }
}
