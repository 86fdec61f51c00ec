//! XML → [`Element`] tree builder on top of `quick-xml` events.
//!
//! Text is kept byte-for-byte (no trimming) because rendering depends on the
//! exact split between an element's text and its children's tails.

use crate::model::Element;
use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::collections::HashMap;

/// DocBook 5 elements live in this namespace; they are treated as unqualified.
const DOCBOOK_NS: &str = "http://docbook.org/ns/docbook";

/// Parse a complete XML document and return its root element.
pub fn parse(xml: &str) -> Result<Element> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut builder = TreeBuilder::default();
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("malformed XML at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                let el = builder.open(&reader, &e)?;
                builder.stack.push(el);
            }
            Event::Empty(e) => {
                let el = builder.open(&reader, &e)?;
                builder.stack.push(el);
                builder.close()?;
            }
            Event::End(_) => builder.close()?,
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                builder.append_text(&text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                builder.append_text(&decode_entity(&entity));
            }
            Event::CData(e) => {
                builder.append_text(&String::from_utf8_lossy(&e));
            }
            Event::Comment(e) => {
                let text = reader.decoder().decode(&e)?;
                builder.push_comment(&text);
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    builder.finish()
}

#[derive(Default)]
struct TreeBuilder {
    /// Open elements, innermost last.
    stack: Vec<Element>,
    root: Option<Element>,
}

impl TreeBuilder {
    /// Element for a start tag. The reader's namespace scope must still be the
    /// one of this tag.
    fn open<R>(&mut self, reader: &NsReader<R>, e: &BytesStart) -> Result<Element> {
        if self.stack.is_empty() && self.root.is_some() {
            bail!("document has more than one root element");
        }

        let mut attrs = HashMap::new();
        for attr in e.attributes() {
            let attr = attr.context("malformed attribute")?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = decode_name(reader, attr.key.as_ref());
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            attrs.insert(key, value);
        }

        let (ns, local) = reader.resolver().resolve_element(e.name());
        let local = decode_name(reader, local.as_ref());
        let tag = match ns {
            ResolveResult::Unbound => local,
            ResolveResult::Bound(uri) => {
                let uri = decode_name(reader, uri.as_ref());
                if uri == DOCBOOK_NS {
                    local
                } else {
                    format!("{{{uri}}}{local}")
                }
            }
            // Undeclared prefix: keep the name as written.
            ResolveResult::Unknown(_) => decode_name(reader, e.name().as_ref()),
        };

        let mut el = Element::new(tag);
        el.attrs = attrs;
        Ok(el)
    }

    fn close(&mut self) -> Result<()> {
        let el = self.stack.pop().context("unexpected closing tag")?;
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(el),
            None => self.root = Some(el),
        }
        Ok(())
    }

    /// Append text to the innermost element, or to its last child's tail.
    /// Text outside the root element is ignored.
    fn append_text(&mut self, text: &str) {
        let Some(node) = self.stack.last_mut() else {
            return;
        };
        match node.children.last_mut() {
            Some(last) => last.tail.push_str(text),
            None => node.text.push_str(text),
        }
    }

    fn push_comment(&mut self, text: &str) {
        if let Some(node) = self.stack.last_mut() {
            node.children.push(Element::comment(text));
        }
    }

    fn finish(self) -> Result<Element> {
        if let Some(open) = self.stack.last() {
            bail!("unexpected end of document: <{}> is not closed", open.tag);
        }
        self.root.context("document has no root element")
    }
}

fn decode_name<R>(reader: &NsReader<R>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

/// Decode an entity reference. Entities declared in a DTD are not expanded
/// and stay in the text as `&name;`.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "apos" => "'".to_string(),
        "quot" => "\"".to_string(),
        s if s.starts_with('#') => {
            let code = if let Some(hex) = s.strip_prefix("#x").or_else(|| s.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}
