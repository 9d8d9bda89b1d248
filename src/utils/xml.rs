// Copyright 2023 cotendo-sdk authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::io::Write;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use crate::error::CotendoError;

/// One piece of element content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, unescaped. Whitespace is kept as found.
    Text(String),
    CData(String),
    Comment(String),
}

/// A detached XML element: name, attributes in document order and its content nodes
/// in document order.
///
/// Processing instructions, the doctype and anything outside the root are dropped on
/// parse; everything inside the root survives a parse/write cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    nodes: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Qualified name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Sets an attribute, replacing the value in place if the key already exists.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    /// Child elements, skipping text and comments.
    pub fn children(&self) -> impl Iterator<Item = &Element> + '_ {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Element> + '_ {
        self.nodes.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First child whose local name matches `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children().find(|c| c.local_name() == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children_mut().find(|c| c.local_name() == name)
    }

    pub fn push_child(&mut self, child: Element) {
        self.nodes.push(Node::Element(child));
    }

    /// Text and CDATA found directly inside this element, concatenated.
    pub fn text(&self) -> String {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) | Node::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces the direct text and CDATA with a single text node placed first.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.nodes
            .retain(|node| !matches!(node, Node::Text(_) | Node::CData(_)));
        let text = text.into();
        if !text.is_empty() {
            self.nodes.insert(0, Node::Text(text));
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }

    fn from_start(start: &BytesStart) -> Result<Self, CotendoError> {
        let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), CotendoError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.nodes.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.nodes {
            match node {
                Node::Element(child) => child.write(writer)?,
                Node::Text(text) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text.as_str()))))?;
                }
                Node::CData(data) => {
                    for section in cdata_sections(data) {
                        writer.write_event(Event::CData(BytesCData::new(section)))?;
                    }
                }
                Node::Comment(comment) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Splits `value` so that no section contains `]]>`.
pub(crate) fn cdata_sections(value: &str) -> Vec<String> {
    let parts: Vec<&str> = value.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let mut section = String::new();
            if i > 0 {
                section.push('>');
            }
            section.push_str(part);
            if i < last {
                section.push_str("]]");
            }
            section
        })
        .collect()
}

/// Parses a whole document and returns its root element.
///
/// Fails when there is no root, more than one root, or an element is left open.
pub fn parse_document(body: &str) -> Result<Element, CotendoError> {
    let mut reader = Reader::from_str(body);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| CotendoError::MalformedDocument("unexpected closing tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let data = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    current.nodes.push(Node::CData(data));
                }
            }
            Event::Comment(comment) => {
                if let Some(current) = stack.last_mut() {
                    let comment = String::from_utf8_lossy(&comment.into_inner()).into_owned();
                    current.nodes.push(Node::Comment(comment));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CotendoError::MalformedDocument(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| CotendoError::MalformedDocument("document has no root element".into()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<(), CotendoError> {
    if let Some(parent) = stack.last_mut() {
        parent.nodes.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(CotendoError::MalformedDocument(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn declared<W: Write>(mut writer: Writer<W>) -> Result<Writer<W>, CotendoError> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

/// Writer for documents the SDK builds from scratch: two-space indent, UTF-8 declaration.
pub(crate) fn document_writer() -> Result<Writer<Vec<u8>>, CotendoError> {
    declared(Writer::new_with_indent(Vec::new(), b' ', 2))
}

pub(crate) fn finish(writer: Writer<Vec<u8>>) -> Result<String, CotendoError> {
    Ok(String::from_utf8(writer.into_inner())?)
}

/// Serializes a parsed element as a complete document. No indentation is added, so the
/// content written is the content that was read.
pub fn to_document(element: &Element) -> Result<String, CotendoError> {
    let mut writer = declared(Writer::new(Vec::new()))?;
    element.write(&mut writer)?;
    finish(writer)
}
