//! Tolerant XML element tree.
//!
//! Mod descriptors in the wild are frequently not well-formed: raw `&` in text,
//! attributes without separating whitespace, stray or mismatched closing tags.
//! [`parse_document`] accepts all of those and only fails when the document as a
//! whole cannot be read (syntax error, no root element, unclosed elements at EOF).

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// HTML elements serialized without a closing tag by [`Element::inner_markup`].
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img"];

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes().with_checks(false) {
            // Everything after a malformed attribute is unreliable.
            let Ok(attr) = attr else {
                break;
            };
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => unescape_lenient(&String::from_utf8_lossy(&attr.value)),
            };
            attributes.push((key, value));
        }

        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Value of the attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First child element called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    /// Follow a `/`-separated path of child element names.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |element, segment| element.child(segment))
    }

    /// All elements reached by a `/`-separated path, the last segment matching
    /// every sibling with that name.
    pub fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Element> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return Vec::new();
        };

        let parent = parents
            .iter()
            .try_fold(self, |element, segment| element.child(segment));

        match parent {
            Some(parent) => parent.elements().filter(|e| e.name == *last).collect(),
            None => Vec::new(),
        }
    }

    /// Direct text content, trimmed.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                text.push_str(t);
            }
        }
        text.trim().to_string()
    }

    /// Content of this element reproduced as markup: text as-is, child elements
    /// re-serialized with their attributes.
    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(&mut out, node);
        }
        out
    }
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
                out.push('"');
            }
            out.push('>');

            for child in &element.children {
                write_node(out, child);
            }

            // Void elements never get a closing tag, even when an unclosed
            // `<br>` swallowed the siblings that follow it.
            let is_void = VOID_ELEMENTS
                .iter()
                .any(|v| element.name.eq_ignore_ascii_case(v));
            if !is_void {
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

/// Resolve entity references one at a time, keeping anything that is not a
/// valid reference (a bare `&`, an unknown name) as written.
fn unescape_lenient(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp + 1..];
        let resolved = candidate
            .find(';')
            .filter(|&end| end > 0 && end <= 32)
            .and_then(|end| resolve_entity(&candidate[..end]).map(|r| (r, end)));

        match resolved {
            Some((value, end)) => {
                out.push(value);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn resolve_entity(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code).filter(|c| *c != '\0');
    }
    quick_xml::escape::resolve_predefined_entity(name)?.chars().next()
}

/// Decode raw document bytes: strip a UTF-8 BOM, replace invalid sequences.
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse `bytes` into its root element.
pub fn parse_document(bytes: &[u8]) -> Result<Element> {
    let text = decode_text(bytes);
    let mut reader = Reader::from_str(&text);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::MalformedDescriptor(format!(
                "{} (at byte {})",
                e,
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    // Trailing content after the root element is ignored.
                    continue;
                }
                stack.push(Element::from_start(&start));
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => {}
                }
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                // A closing tag with no matching open element is dropped.
                let Some(depth) = stack.iter().rposition(|e| e.name == name) else {
                    continue;
                };
                while stack.len() > depth {
                    let Some(element) = stack.pop() else {
                        break;
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
            }
            Event::Text(text) => {
                let Some(parent) = stack.last_mut() else {
                    continue;
                };
                let value = match text.unescape() {
                    Ok(value) => value.into_owned(),
                    Err(_) => unescape_lenient(&String::from_utf8_lossy(&text)),
                };
                parent.children.push(Node::Text(value));
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    let value = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    parent.children.push(Node::Text(value));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.first() {
        return Err(Error::MalformedDescriptor(format!(
            "unexpected end of document, <{}> is never closed",
            open.name
        )));
    }

    root.ok_or_else(|| Error::MalformedDescriptor("no root element".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let root = parse_document(
            br#"<?xml version="1.0" encoding="utf-8"?>
            <modDesc descVersion="37">
                <author>Jane</author>
                <multiplayer supported="true"/>
                <storeItems>
                    <storeItem xmlFilename="a.xml"/>
                    <storeItem xmlFilename="b.xml"/>
                </storeItems>
            </modDesc>"#,
        )
        .unwrap();

        assert_eq!(root.name, "modDesc");
        assert_eq!(root.attr("descVersion"), Some("37"));
        assert_eq!(root.child("author").unwrap().text(), "Jane");
        assert_eq!(
            root.find("multiplayer").unwrap().attr("supported"),
            Some("true")
        );

        let items = root.find_all("storeItems/storeItem");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].attr("xmlFilename"), Some("b.xml"));
        assert!(root.find_all("storeItems/missing").is_empty());
        assert!(root.find_all("nothing/storeItem").is_empty());
    }

    #[test]
    fn test_tolerates_raw_ampersand_and_stray_end_tags() {
        let root = parse_document(
            b"<modDesc><title>Fill & Go</title></stray><author>Bressel&Lade</author></modDesc>",
        )
        .unwrap();

        assert_eq!(root.child("title").unwrap().text(), "Fill & Go");
        assert_eq!(root.child("author").unwrap().text(), "Bressel&Lade");
    }

    #[test]
    fn test_mismatched_end_closes_inner_elements() {
        let root = parse_document(b"<modDesc><title><en>Name</title><version>1.0</version></modDesc>")
            .unwrap();

        assert_eq!(root.find("title/en").unwrap().text(), "Name");
        assert_eq!(root.child("version").unwrap().text(), "1.0");
    }

    #[test]
    fn test_cdata_and_inner_markup() {
        let root = parse_document(
            b"<d><en><![CDATA[First line\nSecond]]></en><de>Zeile<br/>zwei <b class=\"x\">fett</b></de></d>",
        )
        .unwrap();

        assert_eq!(root.child("en").unwrap().text(), "First line\nSecond");
        assert_eq!(
            root.child("de").unwrap().inner_markup(),
            "Zeile<br>zwei <b class=\"x\">fett</b>"
        );
    }

    #[test]
    fn test_unclosed_void_element_has_no_closing_tag() {
        let root = parse_document(b"<d><en>Line one<br>Line two</en></d>").unwrap();

        assert_eq!(
            root.child("en").unwrap().inner_markup(),
            "Line one<br>Line two"
        );
    }

    #[test]
    fn test_entities_resolved_next_to_bare_ampersand() {
        let root = parse_document(
            b"<modDesc><title>A &amp; B & C &#228;&#x41; &bogus;</title><i a=\"x &lt; y & z\"/></modDesc>",
        )
        .unwrap();

        assert_eq!(root.child("title").unwrap().text(), "A & B & C \u{e4}A &bogus;");
        assert_eq!(root.child("i").unwrap().attr("a"), Some("x < y & z"));
    }

    #[test]
    fn test_unescape_lenient() {
        assert_eq!(unescape_lenient("no refs"), "no refs");
        assert_eq!(unescape_lenient("&&amp;"), "&&");
        assert_eq!(unescape_lenient("trailing &"), "trailing &");
        assert_eq!(unescape_lenient("&#0; &#xZZ;"), "&#0; &#xZZ;");
        assert_eq!(unescape_lenient("&quot;&apos;&gt;"), "\"'>");
    }

    #[test]
    fn test_bom_is_stripped() {
        let root = parse_document(b"\xEF\xBB\xBF<modDesc><version>2</version></modDesc>").unwrap();
        assert_eq!(root.child("version").unwrap().text(), "2");
    }

    #[test]
    fn test_unclosed_document_fails() {
        let result = parse_document(b"<modDesc><title><en>Broken");
        assert!(matches!(result, Err(Error::MalformedDescriptor(_))));
    }

    #[test]
    fn test_plain_text_fails() {
        let result = parse_document(b"this is not markup at all");
        assert!(matches!(result, Err(Error::MalformedDescriptor(_))));
    }
}
