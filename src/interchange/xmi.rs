//! XMI instance documents.
//!
//! ## Structure
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <lib:Library xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI"
//!     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
//!     xmlns:lib="http://example.org/lib" name="City" featured="//@books.1">
//!   <books xmi:id="b1" title="Dune"/>
//!   <books xsi:type="lib:Novel" title="Emma" sequel="b1"/>
//! </lib:Library>
//! ```
//!
//! The root tag names a class through its namespace prefix. Nested tags are
//! feature names of the enclosing object; `xsi:type` picks a subclass.
//! Cross references are `xmi:id`s or fragment paths (`//@books.1`), resolved
//! once the whole document has been read.

use super::ecore::{local_name, read_attributes};
use super::metamodel::{ClassId, Feature, Metamodel};
use super::model::Instance;
use super::{LoadError, ModelAccess, ReferenceSlot, Value};
use crate::base::ObjectHandle;
use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, warn};

/// Namespace URIs used in XMI headers.
pub mod namespace {
    /// XMI 2.0 namespace (used with `xmi:version="2.0"`).
    pub const XMI: &str = "http://www.omg.org/XMI";
    /// XSI namespace for `xsi:type`.
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
}

// ============================================================================
// READER
// ============================================================================

/// Read an instance document conforming to `metamodel`.
pub fn read_xmi(input: &[u8], metamodel: Arc<Metamodel>) -> Result<Instance, LoadError> {
    let mut reader = XmiReader::new(metamodel);
    reader.read(input)?;
    Ok(reader.finish())
}

/// A cross reference awaiting resolution.
#[derive(Debug)]
struct PendingReference {
    owner: ObjectHandle,
    feature: SmolStr,
    raw: String,
}

#[derive(Debug)]
enum Frame {
    Wrapper,
    Object(ObjectHandle),
    /// Attribute value carried as element text.
    Value {
        owner: ObjectHandle,
        feature: SmolStr,
        text: String,
    },
    Skip,
}

/// What an opening tag is nested in.
#[derive(Debug, Clone, Copy)]
enum Parent {
    /// Top of the document, where an `xmi:XMI` wrapper may open.
    Document,
    /// Resource contents: the tag is a root object.
    Resource,
    Object(ObjectHandle),
    Ignored,
}

struct XmiReader {
    metamodel: Arc<Metamodel>,
    instance: Instance,
    namespaces: FxHashMap<String, String>,
    stack: Vec<Frame>,
    pending: Vec<PendingReference>,
}

impl XmiReader {
    fn new(metamodel: Arc<Metamodel>) -> Self {
        Self {
            instance: Instance::new(metamodel.clone()),
            metamodel,
            namespaces: FxHashMap::default(),
            stack: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn read(&mut self, input: &[u8]) -> Result<(), LoadError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => self.handle_start(e)?,
                Ok(Event::Empty(ref e)) => {
                    self.handle_start(e)?;
                    self.handle_end();
                }
                Ok(Event::End(_)) => self.handle_end(),
                Ok(Event::Text(ref e)) => {
                    if let Some(Frame::Value { text, .. }) = self.stack.last_mut() {
                        let chunk = e
                            .unescape()
                            .map_err(|e| LoadError::xml(format!("Text error: {e}")))?;
                        text.push_str(&chunk);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some(Frame::Value { text, .. }) = self.stack.last_mut() {
                        text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(LoadError::xml(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn handle_start(&mut self, e: &BytesStart<'_>) -> Result<(), LoadError> {
        let tag = std::str::from_utf8(e.name().as_ref())
            .map_err(|e| LoadError::xml(format!("Invalid tag name: {e}")))?
            .to_string();
        let attrs = read_attributes(e)?;
        for (key, value) in &attrs {
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                self.namespaces.insert(prefix.to_string(), value.clone());
            }
        }
        let type_attr = attrs
            .iter()
            .find(|(k, _)| k == "xsi:type" || k == "xmi:type")
            .map(|(_, v)| v.clone());

        let parent = match self.stack.last() {
            None if self.is_xmi_wrapper(&tag) => Parent::Document,
            None | Some(Frame::Wrapper) => Parent::Resource,
            Some(Frame::Object(parent)) => Parent::Object(*parent),
            Some(Frame::Value { .. } | Frame::Skip) => Parent::Ignored,
        };
        let frame = match parent {
            Parent::Document => Frame::Wrapper,
            Parent::Resource => {
                let class = self.resolve_class(type_attr.as_deref().unwrap_or(&tag))?;
                let handle = self.instance.create(class)?;
                self.instance.add_root(handle);
                self.apply_attributes(handle, &attrs);
                Frame::Object(handle)
            }
            Parent::Object(parent) => self.child_frame(parent, &tag, type_attr.as_deref(), &attrs)?,
            Parent::Ignored => Frame::Skip,
        };
        self.stack.push(frame);
        Ok(())
    }

    fn handle_end(&mut self) {
        if let Some(Frame::Value {
            owner,
            feature,
            text,
        }) = self.stack.pop()
        {
            self.push_text_value(owner, feature, &text);
        }
    }

    fn is_xmi_wrapper(&self, tag: &str) -> bool {
        match tag.split_once(':') {
            Some((prefix, "XMI")) => {
                prefix == "xmi" || self.namespaces.get(prefix).map(String::as_str) == Some(namespace::XMI)
            }
            _ => false,
        }
    }

    /// Resolve `prefix:Class` through the namespace declarations, falling
    /// back to a lookup by bare class name.
    fn resolve_class(&self, qualified: &str) -> Result<ClassId, LoadError> {
        let (ns_uri, name) = match qualified.split_once(':') {
            Some((prefix, name)) => (self.namespaces.get(prefix).cloned().unwrap_or_default(), name),
            None => (String::new(), qualified),
        };
        self.metamodel
            .find_class(&ns_uri, name)
            .or_else(|| self.metamodel.find_class_by_name(name))
            .ok_or(LoadError::UnknownClass {
                ns_uri,
                name: name.to_string(),
            })
    }

    fn child_frame(
        &mut self,
        parent: ObjectHandle,
        tag: &str,
        type_attr: Option<&str>,
        attrs: &[(String, String)],
    ) -> Result<Frame, LoadError> {
        let metamodel = self.metamodel.clone();
        let parent_class = self.instance.object(parent).class;
        let feature_name = local_name(tag);

        Ok(match metamodel.feature(parent_class, feature_name) {
            Some(Feature::Reference(reference)) if reference.containment => {
                let class = match type_attr {
                    Some(qualified) => self.resolve_class(qualified)?,
                    None => reference.target.ok_or_else(|| {
                        LoadError::invalid_feature(format!(
                            "containment {}.{} has no resolvable type {}",
                            metamodel.class(parent_class).name,
                            reference.name,
                            reference.type_name
                        ))
                    })?,
                };
                let child = self.instance.create(class)?;
                self.instance.add_child(parent, &reference.name, child);
                self.apply_attributes(child, attrs);
                Frame::Object(child)
            }
            Some(Feature::Reference(reference)) => {
                if let Some((_, href)) = attrs.iter().find(|(k, _)| k == "href") {
                    self.pending.push(PendingReference {
                        owner: parent,
                        feature: reference.name.clone(),
                        raw: href.clone(),
                    });
                }
                Frame::Skip
            }
            Some(Feature::Attribute(attribute)) => Frame::Value {
                owner: parent,
                feature: attribute.name.clone(),
                text: String::new(),
            },
            None => {
                warn!(
                    "Skipping unknown feature {} on class {}",
                    feature_name,
                    metamodel.class(parent_class).name
                );
                Frame::Skip
            }
        })
    }

    fn apply_attributes(&mut self, handle: ObjectHandle, attrs: &[(String, String)]) {
        let metamodel = self.metamodel.clone();
        let class = self.instance.object(handle).class;

        for (key, value) in attrs {
            if key == "xmlns"
                || key.starts_with("xmlns:")
                || matches!(key.as_str(), "xsi:type" | "xmi:type" | "xmi:version")
            {
                continue;
            }
            if key == "xmi:id" {
                self.instance.set_document_id(handle, value.as_str());
                continue;
            }
            match metamodel.feature(class, key) {
                Some(Feature::Attribute(attribute)) => {
                    let parsed = if attribute.many {
                        Value::List(
                            value
                                .split_whitespace()
                                .map(|token| Value::parse_scalar(token, attribute.kind))
                                .collect(),
                        )
                    } else {
                        Value::parse_scalar(value, attribute.kind)
                    };
                    self.instance.set_attribute(handle, key, parsed);
                }
                Some(Feature::Reference(reference)) => {
                    self.pending.push(PendingReference {
                        owner: handle,
                        feature: reference.name.clone(),
                        raw: value.clone(),
                    });
                }
                None if key == "id" => self.instance.set_document_id(handle, value.as_str()),
                None => self
                    .instance
                    .object_mut(handle)
                    .extra
                    .push((key.clone(), value.clone())),
            }
        }
    }

    fn push_text_value(&mut self, owner: ObjectHandle, feature: SmolStr, text: &str) {
        let class = self.instance.object(owner).class;
        let Some(Feature::Attribute(attribute)) = self.metamodel.feature(class, &feature) else {
            return;
        };
        let value = Value::parse_scalar(text, attribute.kind);
        if !attribute.many {
            self.instance.set_attribute(owner, &feature, value);
            return;
        }
        let slot = self
            .instance
            .object_mut(owner)
            .attributes
            .entry(feature)
            .or_insert_with(|| Value::List(Vec::new()));
        if let Value::List(items) = slot {
            items.push(value);
        }
    }

    fn finish(mut self) -> Instance {
        for pending in std::mem::take(&mut self.pending) {
            for token in pending.raw.split_whitespace() {
                let target = self.resolve_reference(token);
                if target.is_none() {
                    debug!(
                        "Unresolved reference {} from {}.{}",
                        token, pending.owner, pending.feature
                    );
                }
                self.instance
                    .add_reference(pending.owner, &pending.feature, target);
            }
        }
        debug!(
            "Read instance: objects={} roots={}",
            self.instance.len(),
            self.instance.roots().len()
        );
        self.instance
    }

    /// Local ids and fragment paths resolve; other documents become `None`.
    fn resolve_reference(&self, token: &str) -> Option<ObjectHandle> {
        let (document, fragment) = token.split_once('#').unwrap_or(("", token));
        if !document.is_empty() {
            return None;
        }
        if fragment.starts_with('/') {
            self.resolve_fragment_path(fragment)
        } else {
            self.instance.by_document_id(fragment)
        }
    }

    /// Walk `//@feature.N/@other` (first root) or `/K/@feature.N` (root K).
    fn resolve_fragment_path(&self, path: &str) -> Option<ObjectHandle> {
        let mut segments = path[1..].split('/');
        let root_index = match segments.next() {
            Some("") | None => 0,
            Some(index) => index.parse::<usize>().ok()?,
        };
        let mut current = *self.instance.roots().get(root_index)?;
        for segment in segments.filter(|s| !s.is_empty()) {
            let step = segment.strip_prefix('@')?;
            let (feature, index) = match step.rsplit_once('.') {
                Some((feature, index)) => match index.parse::<usize>() {
                    Ok(index) => (feature, index),
                    Err(_) => (step, 0),
                },
                None => (step, 0),
            };
            current = (*self
                .instance
                .object(current)
                .references
                .get(feature)?
                .get(index)?)?;
        }
        Some(current)
    }
}

// ============================================================================
// WRITER
// ============================================================================

/// Replacement reference slots layered over an [`Instance`] at write time.
///
/// Slots present in the overlay shadow the instance's own values; the
/// instance itself is never modified.
#[derive(Debug, Clone, Default)]
pub struct ReferenceOverlay {
    slots: FxHashMap<ObjectHandle, FxHashMap<SmolStr, Vec<Option<ObjectHandle>>>>,
}

impl ReferenceOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, obj: ObjectHandle, feature: &str, targets: Vec<Option<ObjectHandle>>) {
        self.slots
            .entry(obj)
            .or_default()
            .insert(SmolStr::new(feature), targets);
    }

    pub fn get(&self, obj: ObjectHandle, feature: &str) -> Option<&[Option<ObjectHandle>]> {
        self.slots
            .get(&obj)
            .and_then(|features| features.get(feature))
            .map(Vec::as_slice)
    }

    /// Number of overridden slots.
    pub fn len(&self) -> usize {
        self.slots.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Output tree: fragment path of every written object plus its written children.
#[derive(Default)]
struct Layout<'a> {
    fragments: FxHashMap<ObjectHandle, String>,
    children: FxHashMap<ObjectHandle, Vec<(&'a str, Vec<ObjectHandle>)>>,
}

/// Containment cursor for [`XmiWriter::assign`].
struct AssignFrame<'a> {
    obj: ObjectHandle,
    fragment: String,
    slots: Vec<ReferenceSlot<'a>>,
    slot: usize,
    index: usize,
    kids: Vec<ObjectHandle>,
    written: Vec<(&'a str, Vec<ObjectHandle>)>,
}

impl<'a> AssignFrame<'a> {
    fn new(instance: &'a Instance, obj: ObjectHandle, fragment: String) -> Self {
        Self {
            obj,
            fragment,
            slots: instance
                .reference_slots(obj)
                .into_iter()
                .filter(|s| s.containment)
                .collect(),
            slot: 0,
            index: 0,
            kids: Vec::new(),
            written: Vec::new(),
        }
    }
}

enum WriteStep {
    Open {
        obj: ObjectHandle,
        tag: String,
        type_attr: Option<String>,
    },
    Close(String),
}

/// Serializes an [`Instance`], optionally restricted to a selection.
pub struct XmiWriter<'a> {
    instance: &'a Instance,
    selection: Option<&'a FxHashSet<ObjectHandle>>,
    overlay: Option<&'a ReferenceOverlay>,
}

impl<'a> XmiWriter<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            selection: None,
            overlay: None,
        }
    }

    /// Only write selected objects; unselected children are dropped.
    pub fn with_selection(mut self, selection: &'a FxHashSet<ObjectHandle>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn with_overlay(mut self, overlay: &'a ReferenceOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    fn is_selected(&self, obj: ObjectHandle) -> bool {
        self.selection.is_none_or(|s| s.contains(&obj))
    }

    fn targets(&self, obj: ObjectHandle, feature: &str) -> &'a [Option<ObjectHandle>] {
        if let Some(targets) = self.overlay.and_then(|o| o.get(obj, feature)) {
            return targets;
        }
        self.instance
            .object(obj)
            .references
            .get(feature)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Write `roots` (one root element, or an `xmi:XMI` wrapper for several).
    pub fn write(&self, roots: &[ObjectHandle]) -> Result<Vec<u8>, LoadError> {
        let layout = self.layout(roots);
        let roots: Vec<ObjectHandle> = roots
            .iter()
            .copied()
            .filter(|r| layout.children.contains_key(r))
            .collect();

        let mut header = vec![
            ("xmi:version".to_string(), "2.0".to_string()),
            ("xmlns:xmi".to_string(), namespace::XMI.to_string()),
            ("xmlns:xsi".to_string(), namespace::XSI.to_string()),
        ];
        for (prefix, uri) in self.namespaces(&layout) {
            header.push((format!("xmlns:{prefix}"), uri));
        }

        let mut buffer = Cursor::new(Vec::new());
        let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;

        if let [root] = roots.as_slice() {
            let tag = self.qualified_name(self.instance.object(*root).class);
            self.write_object(&mut writer, &layout, *root, &tag, &header)?;
        } else {
            let mut start = BytesStart::new("xmi:XMI");
            for (key, value) in &header {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer
                .write_event(Event::Start(start))
                .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
            for root in &roots {
                let tag = self.qualified_name(self.instance.object(*root).class);
                self.write_object(&mut writer, &layout, *root, &tag, &[])?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("xmi:XMI")))
                .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
        }

        let mut output = buffer.into_inner();
        output.push(b'\n');
        Ok(output)
    }

    fn layout(&self, roots: &[ObjectHandle]) -> Layout<'a> {
        let mut layout = Layout::default();
        let single = roots.len() == 1;
        for (index, root) in roots.iter().enumerate() {
            if layout.fragments.contains_key(root) {
                continue;
            }
            let fragment = if single {
                "/".to_string()
            } else {
                format!("/{index}")
            };
            self.assign(*root, fragment, &mut layout);
        }
        layout
    }

    /// Give `root` and its selected containment descendants fragment paths.
    ///
    /// Pre-order; an object already placed keeps its first fragment.
    fn assign(&self, root: ObjectHandle, fragment: String, layout: &mut Layout<'a>) {
        layout.fragments.insert(root, fragment.clone());
        let mut stack = vec![AssignFrame::new(self.instance, root, fragment)];

        while let Some(frame) = stack.last_mut() {
            let Some(slot) = frame.slots.get(frame.slot) else {
                if let Some(done) = stack.pop() {
                    layout.children.insert(done.obj, done.written);
                }
                continue;
            };
            let (feature, many, targets) = (slot.feature, slot.many, slot.targets);
            let Some(member) = targets.get(frame.index).copied() else {
                let kids = std::mem::take(&mut frame.kids);
                if !kids.is_empty() {
                    frame.written.push((feature, kids));
                }
                frame.slot += 1;
                frame.index = 0;
                continue;
            };
            frame.index += 1;
            let Some(child) = member else {
                continue;
            };
            if !self.is_selected(child) || layout.fragments.contains_key(&child) {
                continue;
            }
            let child_fragment = if many {
                format!("{}/@{}.{}", frame.fragment, feature, frame.kids.len())
            } else {
                format!("{}/@{}", frame.fragment, feature)
            };
            frame.kids.push(child);
            layout.fragments.insert(child, child_fragment.clone());
            stack.push(AssignFrame::new(self.instance, child, child_fragment));
        }
    }

    fn namespaces(&self, layout: &Layout<'_>) -> IndexMap<String, String> {
        let mm = self.instance.metamodel();
        let mut written: Vec<ObjectHandle> = layout.fragments.keys().copied().collect();
        written.sort();
        let mut out = IndexMap::new();
        for obj in written {
            let package = mm.class(self.instance.object(obj).class).package;
            if let Some(uri) = mm.package(package).ns_uri.as_ref() {
                out.entry(mm.prefix_for(package).to_string())
                    .or_insert_with(|| uri.clone());
            }
        }
        out
    }

    fn qualified_name(&self, class: ClassId) -> String {
        let mm = self.instance.metamodel();
        let class = mm.class(class);
        format!("{}:{}", mm.prefix_for(class.package), class.name)
    }

    /// Reference token for a target: its `xmi:id`, else its fragment path.
    fn reference_token(&self, target: ObjectHandle, layout: &Layout<'_>) -> Option<String> {
        if let Some(id) = self.instance.object(target).document_id.as_ref() {
            return Some(id.clone());
        }
        layout.fragments.get(&target).cloned()
    }

    /// Write the start tag and attribute values of `obj`.
    ///
    /// Returns the written children when the element was left open.
    fn open_object<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        layout: &Layout<'_>,
        obj: ObjectHandle,
        tag: &str,
        type_attr: Option<String>,
        header: &[(String, String)],
    ) -> Result<Option<Vec<WriteStep>>, LoadError> {
        let mm = self.instance.metamodel();
        let object = self.instance.object(obj);
        let mut start = BytesStart::new(tag.to_string());
        for (key, value) in header {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if let Some(type_attr) = type_attr.as_deref() {
            start.push_attribute(("xsi:type", type_attr));
        }
        if let Some(id) = object.document_id.as_deref() {
            start.push_attribute(("xmi:id", id));
        }

        let mut many_values: Vec<(&str, Vec<String>)> = Vec::new();
        for attribute in mm.all_attributes(object.class) {
            let Some(value) = object.attributes.get(attribute.name.as_str()) else {
                continue;
            };
            match value {
                Value::Null => {}
                Value::List(items) if attribute.many => {
                    if !items.is_empty() {
                        many_values.push((
                            attribute.name.as_str(),
                            items.iter().map(Value::to_plain_string).collect(),
                        ));
                    }
                }
                other => {
                    let text = other.to_plain_string();
                    start.push_attribute((attribute.name.as_str(), text.as_str()));
                }
            }
        }

        for slot in self.instance.reference_slots(obj) {
            if slot.containment {
                continue;
            }
            let tokens: Vec<String> = self
                .targets(obj, slot.feature)
                .iter()
                .flatten()
                .filter_map(|target| self.reference_token(*target, layout))
                .collect();
            if !tokens.is_empty() {
                let joined = tokens.join(" ");
                start.push_attribute((slot.feature, joined.as_str()));
            }
        }

        for (key, value) in &object.extra {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        let children = layout.children.get(&obj).map(Vec::as_slice).unwrap_or(&[]);
        if many_values.is_empty() && children.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
            return Ok(None);
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;

        for (name, values) in &many_values {
            for value in values {
                writer
                    .write_event(Event::Start(BytesStart::new(*name)))
                    .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
                writer
                    .write_event(Event::Text(BytesText::new(value)))
                    .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
                writer
                    .write_event(Event::End(BytesEnd::new(*name)))
                    .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
            }
        }

        let mut steps = Vec::new();
        for (feature, kids) in children {
            let declared = match mm.feature(object.class, feature) {
                Some(Feature::Reference(reference)) => reference.target,
                _ => None,
            };
            for kid in kids {
                let kid_class = self.instance.object(*kid).class;
                steps.push(WriteStep::Open {
                    obj: *kid,
                    tag: feature.to_string(),
                    type_attr: (declared != Some(kid_class)).then(|| self.qualified_name(kid_class)),
                });
            }
        }
        Ok(Some(steps))
    }

    /// Write `root` and its laid-out descendants as nested elements.
    fn write_object<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        layout: &Layout<'_>,
        root: ObjectHandle,
        tag: &str,
        header: &[(String, String)],
    ) -> Result<(), LoadError> {
        let mut pending = vec![WriteStep::Open {
            obj: root,
            tag: tag.to_string(),
            type_attr: None,
        }];
        while let Some(step) = pending.pop() {
            match step {
                WriteStep::Open { obj, tag, type_attr } => {
                    let header = if obj == root { header } else { &[] };
                    let Some(children) =
                        self.open_object(writer, layout, obj, &tag, type_attr, header)?
                    else {
                        continue;
                    };
                    pending.push(WriteStep::Close(tag));
                    pending.extend(children.into_iter().rev());
                }
                WriteStep::Close(tag) => {
                    writer
                        .write_event(Event::End(BytesEnd::new(tag)))
                        .map_err(|e| LoadError::xml(format!("Write error: {e}")))?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize a whole instance.
pub fn write_xmi(instance: &Instance) -> Result<Vec<u8>, LoadError> {
    XmiWriter::new(instance).write(instance.roots())
}
