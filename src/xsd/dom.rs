//! Minimal namespace-aware XML tree for schema rewriting.
//!
//! Whitespace-only text is dropped on read and the writer re-indents, so a
//! parse/write cycle normalizes layout but keeps every element, attribute,
//! comment and text run.

use crate::interchange::LoadError;
use crate::interchange::ecore::read_attributes;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Writer};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    Instruction(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Tag as written, including any prefix.
    pub name: String,
    /// Resolved namespace URI of the tag.
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        crate::interchange::ecore::local_name(&self.name)
    }

    /// Tag prefix, or `None` for an unprefixed tag.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children.retain(|node| matches!(node, Node::Element(_)));
        self.children.insert(0, Node::Text(text.into()));
    }

    /// Descendant at a child-index path (indices count element children only).
    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            current = current
                .children
                .iter_mut()
                .filter_map(|node| match node {
                    Node::Element(e) => Some(e),
                    _ => None,
                })
                .nth(index)?;
        }
        Some(current)
    }

    /// Every descendant matching `namespace:local`, in document order, with
    /// its element-index path and the chain of ancestors (outermost first).
    pub fn descendants<'a>(&'a self, namespace: &str, local: &str) -> Vec<Located<'a>> {
        let mut out = Vec::new();
        let mut ancestors = vec![self];
        let mut path = Vec::new();
        collect(self, namespace, local, &mut ancestors, &mut path, &mut out);
        out
    }
}

/// A descendant found by [`Element::descendants`].
pub struct Located<'a> {
    pub element: &'a Element,
    pub path: Vec<usize>,
    pub ancestors: Vec<&'a Element>,
}

fn collect<'a>(
    element: &'a Element,
    namespace: &str,
    local: &str,
    ancestors: &mut Vec<&'a Element>,
    path: &mut Vec<usize>,
    out: &mut Vec<Located<'a>>,
) {
    for (index, child) in element.elements().enumerate() {
        path.push(index);
        if child.is(namespace, local) {
            out.push(Located {
                element: child,
                path: path.clone(),
                ancestors: ancestors.clone(),
            });
        }
        ancestors.push(child);
        collect(child, namespace, local, ancestors, path, out);
        ancestors.pop();
        path.pop();
    }
}

/// A parsed document: the root element plus top-level comments and
/// processing instructions that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub prolog: Vec<Node>,
    pub root: Element,
}

fn element_from(e: &BytesStart<'_>, ns: ResolveResult<'_>) -> Result<Element, LoadError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| LoadError::xml(format!("Invalid UTF-8 in tag: {err}")))?
        .to_string();
    let namespace = match ns {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(LoadError::xml(format!(
                "Unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            )));
        }
    };
    Ok(Element {
        name,
        namespace,
        attributes: read_attributes(e)?,
        children: Vec::new(),
    })
}

impl Document {
    pub fn parse(input: &[u8]) -> Result<Self, LoadError> {
        let mut reader = NsReader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;
        let mut buf = Vec::new();

        let mut attach = |node: Node, stack: &mut Vec<Element>, root: &mut Option<Element>| {
            match (stack.last_mut(), node) {
                (Some(parent), node) => parent.children.push(node),
                (None, Node::Element(e)) => *root = Some(e),
                (None, node) => {
                    if root.is_none() {
                        prolog.push(node);
                    }
                }
            }
        };

        loop {
            match reader.read_resolved_event_into(&mut buf) {
                Ok((ns, Event::Start(e))) => stack.push(element_from(&e, ns)?),
                Ok((ns, Event::Empty(e))) => {
                    let element = element_from(&e, ns)?;
                    attach(Node::Element(element), &mut stack, &mut root);
                }
                Ok((_, Event::End(_))) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| LoadError::xml("Unexpected closing tag"))?;
                    attach(Node::Element(element), &mut stack, &mut root);
                }
                Ok((_, Event::Text(t))) => {
                    let text = t
                        .unescape()
                        .map_err(|e| LoadError::xml(format!("Text error: {e}")))?
                        .into_owned();
                    if !text.is_empty() {
                        attach(Node::Text(text), &mut stack, &mut root);
                    }
                }
                Ok((_, Event::CData(c))) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    attach(Node::CData(text), &mut stack, &mut root);
                }
                Ok((_, Event::Comment(c))) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    attach(Node::Comment(text), &mut stack, &mut root);
                }
                Ok((_, Event::PI(p))) => {
                    let text = String::from_utf8_lossy(&p.into_inner()).into_owned();
                    attach(Node::Instruction(text), &mut stack, &mut root);
                }
                Ok((_, Event::Decl(_) | Event::DocType(_))) => {}
                Ok((_, Event::Eof)) => break,
                Err(e) => {
                    return Err(LoadError::xml(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(LoadError::xml("Unclosed element at end of document"));
        }
        let root = root.ok_or_else(|| LoadError::invalid_element("document has no root element"))?;
        Ok(Self { prolog, root })
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LoadError> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);
        write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        let mut output = buffer.into_inner();
        output.push(b'\n');
        Ok(output)
    }
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), LoadError> {
    writer
        .write_event(event)
        .map_err(|e| LoadError::xml(format!("Write error: {e}")))
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &Node) -> Result<(), LoadError> {
    match node {
        Node::Element(e) => write_element(writer, e),
        Node::Text(t) => write_event(writer, Event::Text(BytesText::new(t))),
        Node::CData(t) => write_event(writer, Event::CData(BytesCData::new(t.as_str()))),
        Node::Comment(t) => write_event(writer, Event::Comment(BytesText::from_escaped(t.as_str()))),
        Node::Instruction(t) => write_event(writer, Event::PI(BytesPI::new(t.as_str()))),
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), LoadError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        return write_event(writer, Event::Empty(start));
    }
    write_event(writer, Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    write_event(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: &str = "http://www.w3.org/2001/XMLSchema";

    const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generated -->
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t">
  <xs:element name="Document" type="Doc"/>
  <xs:complexType name="Doc">
    <xs:sequence>
      <xs:element name="Id" type="xs:string"/>
    </xs:sequence>
  </xs:complexType>
  <xs:annotation><xs:documentation>a &amp; b</xs:documentation></xs:annotation>
</xs:schema>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        assert!(doc.root.is(XS, "schema"));
        assert_eq!(doc.root.prefix(), Some("xs"));
        assert_eq!(doc.root.attribute("targetNamespace"), Some("urn:t"));
        assert_eq!(doc.prolog, vec![Node::Comment(" generated ".into())]);

        let elements = doc.root.descendants(XS, "element");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].path, vec![1, 0, 0]);
        assert_eq!(elements[1].ancestors.len(), 3);
        assert_eq!(elements[1].ancestors[1].attribute("name"), Some("Doc"));
    }

    #[test]
    fn test_text_unescaped_and_rewritten() {
        let doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let annotation = doc.root.elements().last().unwrap();
        let documentation = annotation.elements().next().unwrap();
        assert_eq!(documentation.text(), "a & b");

        let bytes = doc.to_bytes().unwrap();
        let reparsed = Document::parse(&bytes).unwrap();
        assert_eq!(reparsed, doc);
        assert!(String::from_utf8(bytes).unwrap().contains("a &amp; b"));
    }

    #[test]
    fn test_path_lookup_and_edit() {
        let mut doc = Document::parse(SCHEMA.as_bytes()).unwrap();
        let id = doc.root.at_path_mut(&[1, 0, 0]).unwrap();
        id.set_attribute("minOccurs", "0");
        assert_eq!(id.attribute("name"), Some("Id"));
        assert!(doc.root.at_path_mut(&[9]).is_none());
    }

    #[test]
    fn test_malformed_document() {
        assert!(Document::parse(b"<a><b></a>").is_err());
        assert!(Document::parse(b"<!-- only -->").is_err());
        assert!(Document::parse(b"<p:a/>").is_err());
    }
}
