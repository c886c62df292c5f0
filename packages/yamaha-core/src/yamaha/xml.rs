//! Element tree over vendor XML with lenient and strict lookups.
//!
//! Receivers answer with small documents whose shape varies by model and
//! firmware, so most lookups are lenient: a missing path yields `None`.
//! Nodes the caller cannot work without go through [`XmlElement::require`],
//! which fails with an error naming the path.
//!
//! Text content is HTML-entity decoded once during parsing. Some fields
//! (track metadata) arrive double-encoded; use [`decode_entities`] again on
//! those.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors from parsing or querying an XML document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("Malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// The document has no root element.
    #[error("XML document has no root element")]
    Empty,

    /// A node required by the caller is absent.
    #[error("Required XML node not found: {0}")]
    MissingNode(String),
}

pub type XmlResult<T> = Result<T, XmlError>;

/// One parsed element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
    span: (usize, usize),
}

impl XmlElement {
    /// Qualified element name, namespace prefix included (`yamaha:X_device`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed, entity-decoded text content.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Walks a dot-separated path of first-matching children.
    ///
    /// `el.path("Volume.Lvl.Val")` is `el.child("Volume")?.child("Lvl")?.child("Val")`.
    #[must_use]
    pub fn path(&self, path: &str) -> Option<&XmlElement> {
        path.split('.')
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Returns the first path from `paths` that resolves.
    #[must_use]
    pub fn first_of(&self, paths: &[&str]) -> Option<&XmlElement> {
        paths.iter().find_map(|p| self.path(p))
    }

    /// Text at `path`, `None` when the node is absent.
    ///
    /// An empty element resolves to `Some("")`.
    #[must_use]
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.path(path).map(XmlElement::text)
    }

    /// Text of the first path from `paths` that resolves.
    #[must_use]
    pub fn text_of(&self, paths: &[&str]) -> Option<&str> {
        self.first_of(paths).map(XmlElement::text)
    }

    /// Strict variant of [`path`](Self::path).
    pub fn require(&self, path: &str) -> XmlResult<&XmlElement> {
        self.path(path)
            .ok_or_else(|| XmlError::MissingNode(path.to_string()))
    }

    /// Like [`text_at`](Self::text_at) but skips empty text.
    #[must_use]
    pub fn non_empty_text(&self, path: &str) -> Option<&str> {
        self.text_at(path).filter(|t| !t.is_empty())
    }
}

/// A parsed document. Keeps the source so fragments can be logged.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    source: String,
    root: XmlElement,
}

impl XmlDocument {
    /// Parses a complete document.
    pub fn parse(xml: &str) -> XmlResult<Self> {
        let root = parse_tree(xml)?;
        Ok(Self {
            source: xml.to_string(),
            root,
        })
    }

    #[must_use]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Raw source text of an element of this document.
    #[must_use]
    pub fn fragment(&self, element: &XmlElement) -> &str {
        let (start, end) = element.span;
        self.source
            .get(start..end)
            .map(str::trim)
            .unwrap_or_default()
    }
}

/// Decodes HTML entities (`&amp;`, `&#39;`, `&eacute;`, ...).
#[must_use]
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

fn malformed(position: u64, message: impl Into<String>) -> XmlError {
    XmlError::Malformed {
        position,
        message: message.into(),
    }
}

fn open_element(start: &BytesStart<'_>, position: usize) -> XmlResult<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(position as u64, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        attributes.push((key, decode_entities(&raw).into_owned()));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
        span: (position, position),
    })
}

fn close_element(mut element: XmlElement, raw_text: String, end: usize) -> XmlElement {
    element.text = decode_entities(raw_text.trim()).into_owned();
    element.span.1 = end;
    element
}

fn parse_tree(xml: &str) -> XmlResult<XmlElement> {
    let mut reader = Reader::from_str(xml);
    // (element, accumulated raw text)
    let mut stack: Vec<(XmlElement, String)> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| malformed(reader.error_position() as u64, e.to_string()))?;
        let after = reader.buffer_position() as usize;

        match event {
            Event::Start(ref e) => {
                if root.is_some() {
                    return Err(malformed(before as u64, "content after root element"));
                }
                stack.push((open_element(e, before)?, String::new()));
            }
            Event::Empty(ref e) => {
                let element = close_element(open_element(e, before)?, String::new(), after);
                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => return Err(malformed(before as u64, "content after root element")),
                }
            }
            Event::End(_) => {
                let (element, raw) = stack
                    .pop()
                    .ok_or_else(|| malformed(before as u64, "unexpected closing tag"))?;
                let element = close_element(element, raw, after);
                match stack.last_mut() {
                    Some((parent, _)) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(e) => {
                if let Some((_, raw)) = stack.last_mut() {
                    raw.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::CData(e) => {
                if let Some((_, raw)) = stack.last_mut() {
                    raw.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                // Entity references arrive as separate events; rebuild them so
                // the decode pass sees the full text.
                if let Some((_, raw)) = stack.last_mut() {
                    raw.push('&');
                    raw.push_str(&String::from_utf8_lossy(&e));
                    raw.push(';');
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some((open, _)) = stack.last() {
        return Err(malformed(
            xml.len() as u64,
            format!("unclosed element <{}>", open.name),
        ));
    }

    root.ok_or(XmlError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<YAMAHA_AV rsp="GET" RC="0">
  <Main_Zone>
    <Basic_Status>
      <Volume>
        <Lvl><Val>-320</Val><Exp>1</Exp><Unit>dB</Unit></Lvl>
        <Mute>Off</Mute>
      </Volume>
      <Input><Input_Sel>NET RADIO</Input_Sel></Input>
      <Empty/>
    </Basic_Status>
  </Main_Zone>
</YAMAHA_AV>"#;

    #[test]
    fn parses_nested_paths() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "YAMAHA_AV");
        assert_eq!(root.attr("RC"), Some("0"));
        assert_eq!(
            root.text_at("Main_Zone.Basic_Status.Volume.Lvl.Val"),
            Some("-320")
        );
        assert_eq!(
            root.text_at("Main_Zone.Basic_Status.Input.Input_Sel"),
            Some("NET RADIO")
        );
        assert_eq!(root.text_at("Main_Zone.Basic_Status.Empty"), Some(""));
        assert!(root.path("Main_Zone.Basic_Status.Subwoofer_Trim").is_none());
    }

    #[test]
    fn first_of_tries_alternates_in_order() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let status = doc.root().path("Main_Zone.Basic_Status").unwrap();
        let volume = status.first_of(&["Vol", "Volume"]).unwrap();
        assert_eq!(volume.name(), "Volume");
        assert!(status.first_of(&["Vol", "Volume_Level"]).is_none());
    }

    #[test]
    fn require_names_missing_path() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let err = doc.root().require("Zone_2.Basic_Status").unwrap_err();
        assert_eq!(err, XmlError::MissingNode("Zone_2.Basic_Status".into()));
    }

    #[test]
    fn decodes_entities_in_text_and_attributes() {
        let doc = XmlDocument::parse(
            r#"<root title="Rock &amp; Roll"><a>Simon &amp; Garfunkel</a><b>caf&#233;</b></root>"#,
        )
        .unwrap();
        assert_eq!(doc.root().attr("title"), Some("Rock & Roll"));
        assert_eq!(doc.root().text_at("a"), Some("Simon & Garfunkel"));
        assert_eq!(doc.root().text_at("b"), Some("café"));
    }

    #[test]
    fn double_encoded_text_needs_second_decode() {
        let doc = XmlDocument::parse("<a>AC&amp;amp;DC</a>").unwrap();
        assert_eq!(doc.root().text(), "AC&amp;DC");
        assert_eq!(decode_entities(doc.root().text()), "AC&DC");
    }

    #[test]
    fn keeps_namespace_prefixes() {
        let doc = XmlDocument::parse(
            r#"<root xmlns:yamaha="urn:schemas-yamaha-com:device-1-0"><yamaha:X_device><yamaha:X_URLBase>http://10.0.0.5:80/</yamaha:X_URLBase></yamaha:X_device></root>"#,
        )
        .unwrap();
        assert_eq!(
            doc.root().text_at("yamaha:X_device.yamaha:X_URLBase"),
            Some("http://10.0.0.5:80/")
        );
    }

    #[test]
    fn fragment_returns_source_text() {
        let doc = XmlDocument::parse("<root><device><name>x</name></device></root>").unwrap();
        let device = doc.root().child("device").unwrap();
        assert_eq!(doc.fragment(device), "<device><name>x</name></device>");
    }

    #[test]
    fn rejects_malformed_documents() {
        assert!(matches!(
            XmlDocument::parse("<a><b></a>"),
            Err(XmlError::Malformed { .. })
        ));
        assert!(matches!(
            XmlDocument::parse("<a><b>"),
            Err(XmlError::Malformed { .. })
        ));
        assert_eq!(XmlDocument::parse("").unwrap_err(), XmlError::Empty);
    }
}
