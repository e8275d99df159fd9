//! Minimal XML element tree over `quick-xml`.
//!
//! Descriptor documents are small enough to hold in memory, so each one is
//! read into a plain [`Element`] tree and the descriptor parsers walk that.
//! A reader is constructed per call; there is no shared parser state.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::parser::ParseError;

/// An XML element with its attributes, children and text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Attribute value, or the empty string when absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attr_opt(name).unwrap_or("")
    }

    pub fn attr_opt(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Children of the first `container` child named `item`.
    ///
    /// `<units><unit/>...</units>` style lists collapse to an empty iterator
    /// when the container is absent.
    pub fn list<'a>(&'a self, container: &'a str, item: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.child(container)
            .into_iter()
            .flat_map(move |c| c.children_named(item))
    }
}

/// Parse a whole document into its root element.
pub fn parse_document(bytes: &[u8], location: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| corrupt(location, format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(start) => {
                stack.push(element_from(&start, location)?);
            }
            Event::Empty(start) => {
                let element = element_from(&start, location)?;
                attach(&mut stack, &mut root, element, location)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| corrupt(location, "unbalanced end tag"))?;
                attach(&mut stack, &mut root, element, location)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| corrupt(location, e.to_string()))?;
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(corrupt(location, "unexpected end of document"));
    }
    root.ok_or_else(|| corrupt(location, "document has no root element"))
}

/// Read only the root element's name and attributes.
pub fn parse_root(bytes: &[u8], location: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => return element_from(&start, location),
            Ok(Event::Eof) => return Err(corrupt(location, "document has no root element")),
            Ok(_) => {}
            Err(e) => {
                return Err(corrupt(
                    location,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
        }
    }
}

/// Read a descriptor file, unpacking `inner` from a zip archive when given.
pub fn read_descriptor(path: &Path, inner: Option<&str>, location: &str) -> Result<Vec<u8>, ParseError> {
    let mut file = File::open(path).map_err(|e| corrupt(location, e.to_string()))?;

    let Some(inner) = inner else {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| corrupt(location, e.to_string()))?;
        return Ok(bytes);
    };

    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| corrupt(location, format!("not a valid archive: {}", e)))?;
    read_entry(&mut archive, inner, location)?
        .ok_or_else(|| corrupt(location, format!("archive has no entry '{}'", inner)))
}

/// Read a named entry from an open archive, if present.
pub fn read_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    location: &str,
) -> Result<Option<Vec<u8>>, ParseError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(corrupt(location, e.to_string())),
    };

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| corrupt(location, e.to_string()))?;
    Ok(Some(bytes))
}

fn element_from(start: &BytesStart<'_>, location: &str) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| corrupt(location, format!("in <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| corrupt(location, format!("in <{}>: {}", name, e)))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
    location: &str,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(corrupt(location, "multiple root elements")),
    }
    Ok(())
}

fn corrupt(location: &str, reason: impl Into<String>) -> ParseError {
    ParseError::DescriptorCorrupt {
        location: location.to_string(),
        reason: reason.into(),
    }
}
