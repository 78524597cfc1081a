//! Minimal owned XML element tree.
//!
//! Request documents and DMR metadata are small, so they are read fully into
//! memory and walked by local name. Namespace prefixes are discarded.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{WcsError, WcsResult};

/// An XML element with its attributes, children and concatenated text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

/// Escape text for inclusion in element content or attribute values.
pub fn escape(raw: &str) -> String {
    quick_xml::escape::escape(raw).into_owned()
}

fn parse_error(message: impl std::fmt::Display) -> WcsError {
    WcsError::invalid("xml", format!("Unable to parse XML document: {}", message))
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> WcsResult<XmlElement> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(Self::from_start(&e)?),
                Ok(Event::Empty(e)) => {
                    let element = Self::from_start(&e)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| parse_error("unbalanced end tag"))?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(t)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape().map_err(parse_error)?);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(parse_error(format!(
                        "{} at position {}",
                        e,
                        reader.buffer_position()
                    )))
                }
            }
        }

        if !stack.is_empty() {
            return Err(parse_error("unexpected end of document"));
        }
        root.ok_or_else(|| parse_error("document has no root element"))
    }

    fn from_start(start: &BytesStart<'_>) -> WcsResult<XmlElement> {
        let mut element = XmlElement::new(String::from_utf8_lossy(start.local_name().as_ref()));

        for attr in start.attributes() {
            let attr = attr.map_err(parse_error)?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(parse_error)?.into_owned();
            element.attributes.push((key, value));
        }

        Ok(element)
    }

    fn attach(
        stack: &mut [XmlElement],
        root: &mut Option<XmlElement>,
        element: XmlElement,
    ) -> WcsResult<()> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => *root = Some(element),
            None => return Err(parse_error("multiple root elements")),
        }
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }

    /// All descendants (depth first, document order) with the given local name.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }
}
