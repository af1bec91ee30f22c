//! Minimal element tree over quick-xml, shared by the XML report parsers and
//! the XML-RPC codec.

use crate::core::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// An XML element with its attributes, child elements and concatenated text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Value of the attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First direct child called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children called `name`, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Whether a direct child called `name` exists.
    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..Default::default()
    };
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Parse a whole document and return its root element.
pub fn parse_document(content: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let closed = match reader.read_event()? {
            Event::Start(start) => {
                stack.push(open_element(&start)?);
                None
            }
            Event::Empty(start) => Some(open_element(&start)?),
            Event::End(_) => match stack.pop() {
                Some(element) => Some(element),
                None => return Err(Error::malformed_xml("unexpected closing tag")),
            },
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
                None
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
                None
            }
            Event::Eof => break,
            _ => None,
        };

        if let Some(element) = closed {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None if root.is_none() => root = Some(element),
                None => return Err(Error::malformed_xml("more than one root element")),
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::malformed_xml(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| Error::malformed_xml("document has no root element"))
}
