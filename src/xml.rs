//! A minimal element tree built from `quick-xml` events.
//!
//! The web service answers with small documents (a few KB), so building the whole tree
//! up front is cheaper to reason about than streaming extraction.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("no element found")]
    NoRoot,
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    #[error("junk after document element")]
    TrailingContent,
    #[error("text outside of the document element")]
    StrayText,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    fn new(name: &[u8]) -> Self {
        Element {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text of the first direct child with the given name.
    /// Missing children and blank text both map to `None`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(Element::trimmed_text)
    }

    pub fn trimmed_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    }

    /// Number of child elements under the named direct child, 0 if it is absent.
    pub fn child_count(&self, name: &str) -> usize {
        self.child(name).map_or(0, |c| c.children.len())
    }

    /// First element with the given name strictly below `self`, in document order.
    pub fn find_descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Every element with the given name strictly below `self`, in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    fn push_text(&mut self, text: &str) {
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_owned()),
        }
    }
}

/// Parses a complete document and returns its root element.
/// Namespace prefixes are dropped from element names.
pub fn parse_document(content: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                stack.push(Element::new(start.local_name().as_ref()));
            }
            Event::Empty(empty) => {
                let element = Element::new(empty.local_name().as_ref());
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // quick-xml already rejects mismatched end tags.
                let element = stack.pop().ok_or(XmlError::TrailingContent)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(current) => current.push_text(&text),
                    None if root.is_some() => return Err(XmlError::TrailingContent),
                    None => return Err(XmlError::StrayText),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = String::from_utf8_lossy(&data);
                match stack.last_mut() {
                    Some(current) => current.push_text(&text),
                    None => return Err(XmlError::StrayText),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn attach(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(XmlError::TrailingContent),
        None => *root = Some(element),
    }
    Ok(())
}
