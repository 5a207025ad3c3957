//! XSD enrichment.
//!
//! Annotates named schema declarations with the identifiers of the model
//! objects they were generated from:
//!
//! ```text
//! <xs:complexType name="Party40Choice">
//!   <xs:annotation>
//!     <xs:appinfo source="xmi:id">_abc123</xs:appinfo>
//!     <xs:appinfo source="definition">Choice of party.</xs:appinfo>
//!     <xs:appinfo source="parent">_pkg1</xs:appinfo>
//!   </xs:annotation>
//!   ...
//! ```
//!
//! Model objects are indexed by `name` and `xmlTag`. Elements are first
//! looked up among the children of the model object matching their
//! enclosing complex type, then by their own name, then by their declared
//! type. When the schema's target namespace names a message definition,
//! element candidates are restricted to that definition.

mod dom;

pub use dom::{Document, Element, Located, Node};

use crate::base::ObjectHandle;
use crate::config::{ConfigError, load_config_file};
use crate::export::{ExportError, write_atomic};
use crate::graph::{ObjectGraph, build_object_graph};
use crate::interchange::{LoadError, ModelAccess, load_instance, load_metamodel};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

const TARGET_NAMESPACE_PREFIX: &str = "urn:iso:std:iso:20022:tech:xsd:";

/// Declaration kinds annotated, in processing order.
pub const KINDS: [&str; 4] = ["complexType", "simpleType", "element", "attribute"];

const INDEXED_CLASSES: [&str; 13] = [
    "MessageSet",
    "BusinessArea",
    "MessageDefinition",
    "ExternalSchema",
    "MessageBuildingBlock",
    "MessageComponent",
    "ChoiceComponent",
    "MessageComponentType",
    "MessageElement",
    "MessageAttribute",
    "MessageAssociationEnd",
    "DataType",
    "CodeSet",
];

const PARENT_PREFERENCES: [&str; 3] = ["MessageComponent", "MessageComponentType", "ChoiceComponent"];

/// Declaration kind → preferred model classes, most preferred first.
pub type KindPreferences = IndexMap<String, Vec<String>>;

pub fn default_kind_preferences() -> KindPreferences {
    let table: [(&str, &[&str]); 4] = [
        (
            "complexType",
            &["MessageDefinition", "MessageComponent", "MessageComponentType", "ChoiceComponent"],
        ),
        ("simpleType", &["DataType", "CodeSet"]),
        ("element", &["MessageElement", "MessageBuildingBlock", "MessageAssociationEnd"]),
        ("attribute", &["MessageAttribute"]),
    ];
    table
        .into_iter()
        .map(|(kind, classes)| {
            (
                kind.to_string(),
                classes.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}

/// Read a kind preference map from a JSON or YAML file.
pub fn load_preferences(path: &Path) -> Result<KindPreferences, ConfigError> {
    load_config_file(path)
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Write(#[from] ExportError),
}

#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    /// Overrides merged over [`default_kind_preferences`] per kind.
    pub kind_preferences: Option<KindPreferences>,
    /// Log candidate selection for this declaration name.
    pub trace_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    pub annotated: usize,
    pub missing: usize,
    pub total: usize,
}

// ============================================================================
// MODEL SIDE
// ============================================================================

fn string_attribute<M: ModelAccess + ?Sized>(model: &M, obj: ObjectHandle, name: &str) -> Option<String> {
    let value = model.attribute(obj, name)?;
    value.as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

fn strip_simple_type_suffix(name: &str) -> &str {
    name.strip_suffix("_SimpleType").unwrap_or(name)
}

/// Matching state over one model.
struct Matcher<'m, M: ModelAccess + ?Sized> {
    model: &'m M,
    index: FxHashMap<String, Vec<ObjectHandle>>,
    preferences: KindPreferences,
    /// `area.functionality.flavour.version` of the message definition the
    /// schema describes, when it could be found.
    message: Option<String>,
}

impl<'m, M: ModelAccess + ?Sized> Matcher<'m, M> {
    fn new(model: &'m M, graph: &ObjectGraph, preferences: KindPreferences) -> Self {
        let mut index: FxHashMap<String, Vec<ObjectHandle>> = FxHashMap::default();
        for info in graph.nodes() {
            let obj = info.handle;
            if !Self::indexed(model, obj) {
                continue;
            }
            let Some(name) = string_attribute(model, obj, "name") else {
                continue;
            };
            index.entry(name).or_default().push(obj);
            if let Some(tag) = string_attribute(model, obj, "xmlTag") {
                index.entry(tag).or_default().push(obj);
            }
        }
        debug!("Indexed {} model names", index.len());
        Self {
            model,
            index,
            preferences,
            message: None,
        }
    }

    fn indexed(model: &M, obj: ObjectHandle) -> bool {
        INDEXED_CLASSES.contains(&model.class_name(obj))
            || model
                .super_type_names(obj)
                .iter()
                .any(|s| *s == "DataType" || *s == "CodeSet")
    }

    fn class(&self, obj: ObjectHandle) -> &'m str {
        self.model.class_name(obj)
    }

    /// Dotted identifier of a `MessageDefinitionIdentifier` object.
    fn message_identifier(&self, obj: ObjectHandle) -> Option<String> {
        if self.class(obj) != "MessageDefinitionIdentifier" {
            return None;
        }
        let parts = ["businessArea", "messageFunctionality", "flavour", "version"]
            .iter()
            .map(|name| string_attribute(self.model, obj, name))
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("."))
    }

    fn belongs_to_message(&self, obj: ObjectHandle) -> bool {
        let Some(message) = &self.message else {
            return true;
        };
        let mut current = Some(obj);
        while let Some(obj) = current {
            if self.class(obj) == "MessageDefinition" {
                let identifier = self
                    .model
                    .reference(obj, "messageDefinitionIdentifier")
                    .and_then(|slot| slot.targets.iter().flatten().next().copied())
                    .and_then(|mdi| self.message_identifier(mdi));
                return identifier.as_deref() == Some(message.as_str());
            }
            current = self.model.container(obj);
        }
        false
    }

    fn scoped(&self, candidates: &[ObjectHandle]) -> Vec<ObjectHandle> {
        candidates
            .iter()
            .copied()
            .filter(|c| {
                !matches!(self.class(*c), "MessageBuildingBlock" | "MessageElement")
                    || self.belongs_to_message(*c)
            })
            .collect()
    }

    fn lookup(&self, name: &str) -> Vec<ObjectHandle> {
        self.index
            .get(name)
            .map(|found| self.scoped(found))
            .unwrap_or_default()
    }

    fn pick<S: AsRef<str>>(&self, candidates: &[ObjectHandle], preferences: &[S]) -> Option<ObjectHandle> {
        preferences
            .iter()
            .find_map(|pref| {
                candidates
                    .iter()
                    .copied()
                    .find(|c| self.class(*c) == pref.as_ref())
            })
            .or_else(|| candidates.first().copied())
    }

    /// Contained `MessageElement`/`MessageAttribute` children with the given tag.
    fn children_by_tag(&self, parent: ObjectHandle, tag: &str) -> Vec<ObjectHandle> {
        self.model
            .reference_slots(parent)
            .into_iter()
            .filter(|slot| slot.containment)
            .flat_map(|slot| slot.targets.iter().flatten().copied())
            .filter(|child| matches!(self.class(*child), "MessageElement" | "MessageAttribute"))
            .filter(|child| string_attribute(self.model, *child, "xmlTag").as_deref() == Some(tag))
            .collect()
    }

    fn candidates(&self, kind: &str, name: &str, located: &Located<'_>) -> Vec<ObjectHandle> {
        let mut candidates = Vec::new();
        if kind == "element" {
            let parent_type = located
                .ancestors
                .iter()
                .rev()
                .find(|a| a.is(XSD_NS, "complexType"))
                .and_then(|a| a.attribute("name"));
            if let Some(parent_type) = parent_type {
                let parents = self.lookup(parent_type);
                if let Some(parent) = self.pick(&parents, &PARENT_PREFERENCES) {
                    candidates = self.children_by_tag(parent, name);
                }
            }
        }
        if candidates.is_empty() {
            candidates = self.lookup(name);
        }
        if candidates.is_empty() && kind == "element" {
            if let Some(type_name) = located.element.attribute("type") {
                let local = type_name.split_once(':').map_or(type_name, |(_, l)| l);
                candidates = self.lookup(strip_simple_type_suffix(local));
            }
        }
        candidates
    }

    fn preferences_for(&self, kind: &str, name: &str) -> Vec<String> {
        let mut prefs = self.preferences.get(kind).cloned().unwrap_or_default();
        if name.ends_with("Code") {
            prefs.retain(|p| p != "CodeSet");
            prefs.insert(0, "CodeSet".to_string());
        }
        prefs
    }

    fn describe(&self, obj: ObjectHandle) -> String {
        format!("{}:{}", self.class(obj), self.model.display_name(obj))
    }
}

// ============================================================================
// SCHEMA SIDE
// ============================================================================

/// Set `xs:annotation/xs:appinfo[@source]` text on `element`, creating the
/// annotation as the first child when absent.
pub fn ensure_annotation(element: &mut Element, source: &str, value: &str) {
    let qualify = |local: &str| match element.prefix() {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    };
    let annotation_name = qualify("annotation");
    let appinfo_name = qualify("appinfo");

    let position = element.children.iter().position(
        |node| matches!(node, Node::Element(e) if e.is(XSD_NS, "annotation")),
    );
    let position = match position {
        Some(position) => position,
        None => {
            let annotation = Element::new(annotation_name, Some(XSD_NS));
            element.children.insert(0, Node::Element(annotation));
            0
        }
    };
    let Some(Node::Element(annotation)) = element.children.get_mut(position) else {
        return;
    };

    let existing = annotation.children.iter_mut().find_map(|node| match node {
        Node::Element(e) if e.is(XSD_NS, "appinfo") && e.attribute("source") == Some(source) => {
            Some(e)
        }
        _ => None,
    });
    match existing {
        Some(appinfo) => appinfo.set_text(value),
        None => {
            let mut appinfo = Element::new(appinfo_name, Some(XSD_NS));
            appinfo.set_attribute("source", source);
            appinfo.set_text(value);
            annotation.children.push(Node::Element(appinfo));
        }
    }
}

/// Annotations decided for one schema element.
struct Edit {
    path: Vec<usize>,
    entries: Vec<(&'static str, String)>,
}

/// Annotate `document` in place from `model`.
pub fn enrich_document<M: ModelAccess + ?Sized>(
    model: &M,
    graph: &ObjectGraph,
    document: &mut Document,
    options: &EnrichOptions,
) -> EnrichStats {
    let mut preferences = default_kind_preferences();
    if let Some(overrides) = &options.kind_preferences {
        preferences.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    let mut matcher = Matcher::new(model, graph, preferences);
    let mut edits: Vec<Edit> = Vec::new();

    let target = document
        .root
        .attribute("targetNamespace")
        .and_then(|ns| ns.strip_prefix(TARGET_NAMESPACE_PREFIX));
    if let Some(target) = target {
        let found = graph.nodes().iter().find_map(|info| {
            matcher
                .message_identifier(info.handle)
                .filter(|id| id == target)
                .map(|id| (info.handle, id))
        });
        if let Some((mdi, identifier)) = found {
            let mut entries = vec![("messageDefinitionIdentifier", identifier.clone())];
            for part in ["businessArea", "messageFunctionality", "flavour", "version"] {
                if let Some(value) = string_attribute(model, mdi, part) {
                    entries.push((part, value));
                }
            }
            if let Some(id) = model.container(mdi).and_then(|md| model.document_id(md)) {
                entries.push(("messageDefinition", id.to_string()));
            }
            info!("Schema matches message definition {identifier}");
            edits.push(Edit {
                path: Vec::new(),
                entries,
            });
            matcher.message = Some(identifier);
        }
    }

    let mut stats = EnrichStats::default();
    for kind in KINDS {
        for located in document.root.descendants(XSD_NS, kind) {
            let Some(name) = located.element.attribute("name") else {
                continue;
            };
            stats.total += 1;
            let lookup = strip_simple_type_suffix(name);
            let candidates = matcher.candidates(kind, lookup, &located);
            let picked = matcher.pick(&candidates, &matcher.preferences_for(kind, lookup));

            if options.trace_name.as_deref() == Some(lookup) {
                let listed: Vec<String> = candidates.iter().map(|c| matcher.describe(*c)).collect();
                info!(
                    "trace-name={lookup} kind={kind} candidates={listed:?} picked={:?}",
                    picked.map(|p| matcher.describe(p))
                );
            }

            let Some(picked) = picked else {
                stats.missing += 1;
                debug!("xsd={lookup} kind={kind} status=missing");
                continue;
            };
            let Some(id) = model.document_id(picked) else {
                stats.missing += 1;
                debug!("xsd={lookup} kind={kind} status=missing (no xmi:id)");
                continue;
            };

            let mut entries = vec![("xmi:id", id.to_string())];
            if let Some(definition) = string_attribute(model, picked, "definition") {
                entries.push(("definition", definition));
            }
            let parent = model.container(picked).and_then(|parent| {
                model
                    .document_id(parent)
                    .map(str::to_string)
                    .or_else(|| string_attribute(model, parent, "name"))
            });
            if let Some(parent) = parent {
                entries.push(("parent", parent));
            }
            edits.push(Edit {
                path: located.path,
                entries,
            });
            stats.annotated += 1;
            debug!("xsd={lookup} kind={kind} status=annotated");
        }
    }

    // Deepest and latest first, so inserted annotations never shift a
    // pending path.
    edits.sort_by(|a, b| b.path.cmp(&a.path));
    for edit in edits {
        match document.root.at_path_mut(&edit.path) {
            Some(element) => {
                for (source, value) in &edit.entries {
                    ensure_annotation(element, source, value);
                }
            }
            None => warn!("Schema element at {:?} disappeared during enrichment", edit.path),
        }
    }
    stats
}

/// Load the model files, annotate `xsd` and write the result to `output`.
pub fn enrich_xsd(
    ecore: &Path,
    instance: &Path,
    xsd: &Path,
    output: &Path,
    options: &EnrichOptions,
) -> Result<EnrichStats, EnrichError> {
    let metamodel = Arc::new(load_metamodel(ecore)?);
    let instance = load_instance(instance, &metamodel)?;
    let graph = build_object_graph(&instance, instance.roots());

    let bytes = std::fs::read(xsd).map_err(|e| LoadError::io(xsd, e))?;
    let mut document = Document::parse(&bytes)?;
    let stats = enrich_document(&instance, &graph, &mut document, options);
    write_atomic(output, &document.to_bytes()?)?;
    Ok(stats)
}
