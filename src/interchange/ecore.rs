//! Ecore metamodel reader.
//!
//! Reads the XMI serialization of Ecore (`.ecore` files):
//!
//! ```xml
//! <ecore:EPackage xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI"
//!     xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
//!     xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore"
//!     name="library" nsURI="http://example.org/library" nsPrefix="lib">
//!   <eClassifiers xsi:type="ecore:EClass" name="Book" eSuperTypes="#//Item">
//!     <eStructuralFeatures xsi:type="ecore:EAttribute" name="title"
//!         eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
//!     <eStructuralFeatures xsi:type="ecore:EReference" name="chapters"
//!         upperBound="-1" eType="#//Chapter" containment="true"/>
//!   </eClassifiers>
//! </ecore:EPackage>
//! ```
//!
//! Parsing runs in two passes: the XML is first read into raw package trees,
//! then classes are declared (so forward references resolve) and finally
//! supertypes and features are attached.

use super::LoadError;
use super::metamodel::{ClassId, DataKind, EAttribute, EDataType, EReference, Metamodel, MetamodelBuilder, PackageId};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, warn};

/// Namespace URI of the Ecore metamodel itself.
pub const ECORE_NS: &str = "http://www.eclipse.org/emf/2002/Ecore";

/// Read a metamodel from `.ecore` bytes. `source` names the document in errors.
pub fn read_ecore(input: &[u8], source: &str) -> Result<Metamodel, LoadError> {
    let roots = EcoreReader::default().read(input)?;
    if roots.is_empty() {
        return Err(LoadError::NoPackage(source.to_string()));
    }
    let metamodel = resolve(&roots);
    debug!(
        "Read metamodel {}: packages={} classes={}",
        source,
        metamodel.packages().count(),
        metamodel.class_count()
    );
    Ok(metamodel)
}

// ============================================================================
// RAW TREE
// ============================================================================

#[derive(Debug, Default)]
struct RawPackage {
    name: String,
    ns_uri: Option<String>,
    ns_prefix: Option<String>,
    classifiers: Vec<RawClassifier>,
    subpackages: Vec<RawPackage>,
}

#[derive(Debug)]
enum RawClassifier {
    Class(RawClass),
    Enum { name: String, literals: Vec<SmolStr> },
    DataType { name: String, instance_class: Option<String> },
}

#[derive(Debug, Default)]
struct RawClass {
    name: String,
    is_abstract: bool,
    is_interface: bool,
    super_types: Vec<String>,
    features: Vec<RawFeature>,
}

#[derive(Debug, Default)]
struct RawFeature {
    is_reference: bool,
    name: String,
    e_type: Option<String>,
    many: bool,
    containment: bool,
    default_literal: Option<String>,
}

/// Stack entry for nested elements.
#[derive(Debug)]
enum Frame {
    Wrapper,
    Package(RawPackage),
    Class(RawClass),
    Enum(String, Vec<SmolStr>),
    DataType(String, Option<String>),
    Feature(RawFeature),
    Skip,
}

#[derive(Default)]
struct EcoreReader {
    stack: Vec<Frame>,
    roots: Vec<RawPackage>,
}

impl EcoreReader {
    fn read(mut self, input: &[u8]) -> Result<Vec<RawPackage>, LoadError> {
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

        Ok(self.roots)
    }

    fn handle_start(&mut self, e: &BytesStart<'_>) -> Result<(), LoadError> {
        let tag = std::str::from_utf8(e.name().as_ref())
            .map_err(|e| LoadError::xml(format!("Invalid tag name: {e}")))?
            .to_string();
        let local = local_name(&tag);
        let attrs = read_attributes(e)?;
        let get = |key: &str| attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let xsi_type = get("xsi:type").or_else(|| get("xmi:type"));
        let xsi_local = xsi_type.as_deref().map(local_name);

        let frame = match (self.stack.last_mut(), local) {
            (None, "XMI") => Frame::Wrapper,
            (None | Some(Frame::Wrapper), "EPackage") | (Some(Frame::Package(_)), "eSubpackages") => {
                Frame::Package(RawPackage {
                    name: get("name").unwrap_or_default(),
                    ns_uri: get("nsURI"),
                    ns_prefix: get("nsPrefix"),
                    ..Default::default()
                })
            }
            (Some(Frame::Package(_)), "eClassifiers") => match xsi_local {
                Some("EEnum") => Frame::Enum(get("name").unwrap_or_default(), Vec::new()),
                Some("EDataType") => {
                    Frame::DataType(get("name").unwrap_or_default(), get("instanceClassName"))
                }
                _ => Frame::Class(RawClass {
                    name: get("name").unwrap_or_default(),
                    is_abstract: get("abstract").as_deref() == Some("true"),
                    is_interface: get("interface").as_deref() == Some("true"),
                    super_types: get("eSuperTypes")
                        .map(|s| s.split_whitespace().map(str::to_string).collect())
                        .unwrap_or_default(),
                    features: Vec::new(),
                }),
            },
            (Some(Frame::Class(class)), "eSuperTypes") => {
                if let Some(href) = get("href") {
                    class.super_types.push(href);
                }
                Frame::Skip
            }
            (Some(Frame::Class(class)), "eGenericSuperTypes") => {
                if let Some(classifier) = get("eClassifier") {
                    class.super_types.push(classifier);
                }
                Frame::Skip
            }
            (Some(Frame::Class(_)), "eStructuralFeatures") => {
                let upper = get("upperBound")
                    .and_then(|u| u.trim().parse::<i64>().ok())
                    .unwrap_or(1);
                Frame::Feature(RawFeature {
                    is_reference: xsi_local == Some("EReference"),
                    name: get("name").unwrap_or_default(),
                    e_type: get("eType"),
                    many: upper < 0 || upper > 1,
                    containment: get("containment").as_deref() == Some("true"),
                    default_literal: get("defaultValueLiteral"),
                })
            }
            (Some(Frame::Feature(feature)), "eType") => {
                if feature.e_type.is_none() {
                    feature.e_type = get("href");
                }
                Frame::Skip
            }
            (Some(Frame::Feature(feature)), "eGenericType") => {
                if feature.e_type.is_none() {
                    feature.e_type = get("eClassifier");
                }
                Frame::Skip
            }
            (Some(Frame::Enum(_, literals)), "eLiterals") => {
                if let Some(name) = get("name") {
                    literals.push(SmolStr::new(name));
                }
                Frame::Skip
            }
            _ => Frame::Skip,
        };

        self.stack.push(frame);
        Ok(())
    }

    fn handle_end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let classifier = match frame {
            Frame::Package(pkg) => {
                match self.stack.last_mut() {
                    Some(Frame::Package(parent)) => parent.subpackages.push(pkg),
                    _ => self.roots.push(pkg),
                }
                return;
            }
            Frame::Feature(feature) => {
                if let Some(Frame::Class(class)) = self.stack.last_mut() {
                    class.features.push(feature);
                }
                return;
            }
            Frame::Class(class) => RawClassifier::Class(class),
            Frame::Enum(name, literals) => RawClassifier::Enum { name, literals },
            Frame::DataType(name, instance_class) => RawClassifier::DataType {
                name,
                instance_class,
            },
            Frame::Wrapper | Frame::Skip => return,
        };
        if let Some(Frame::Package(parent)) = self.stack.last_mut() {
            parent.classifiers.push(classifier);
        }
    }
}

pub(crate) fn read_attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, LoadError> {
    let mut out = Vec::new();
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| LoadError::xml(format!("Attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| LoadError::xml(format!("Attribute key error: {e}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| LoadError::xml(format!("Attribute value error: {e}")))?
            .to_string();
        out.push((key, value));
    }
    Ok(out)
}

/// Local part of a possibly prefixed XML name.
pub(crate) fn local_name(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// A type reference split into document URI and fragment.
///
/// `"ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"` →
/// uri `http://www.eclipse.org/emf/2002/Ecore`, fragment `//EString`.
fn split_type_ref(raw: &str) -> (&str, &str) {
    let token = raw.split_whitespace().last().unwrap_or(raw);
    match token.split_once('#') {
        Some((uri, fragment)) => (uri, fragment),
        None => ("", token),
    }
}

fn fragment_name(fragment: &str) -> &str {
    fragment.rsplit('/').next().unwrap_or(fragment)
}

struct Resolver {
    builder: MetamodelBuilder,
    class_fragments: FxHashMap<String, ClassId>,
    class_names: FxHashMap<String, ClassId>,
    data_types: FxHashMap<String, DataKind>,
}

impl Resolver {
    fn declare<'r>(
        &mut self,
        pkg: &'r RawPackage,
        parent: Option<PackageId>,
        prefix: &str,
        pending: &mut Vec<(ClassId, &'r RawClass)>,
    ) {
        let id = self.builder.package(
            &pkg.name,
            pkg.ns_uri.as_deref(),
            pkg.ns_prefix.as_deref(),
            parent,
        );
        for classifier in &pkg.classifiers {
            match classifier {
                RawClassifier::Class(raw) => {
                    let class_id = self.builder.class(id, &raw.name);
                    {
                        let class = self.builder.class_mut(class_id);
                        class.is_abstract = raw.is_abstract;
                        class.is_interface = raw.is_interface;
                    }
                    self.class_fragments
                        .insert(format!("{prefix}{}", raw.name), class_id);
                    self.class_names.entry(raw.name.clone()).or_insert(class_id);
                    pending.push((class_id, raw));
                }
                RawClassifier::Enum { name, literals } => {
                    self.data_types.insert(name.clone(), DataKind::Enum);
                    self.builder.data_type(
                        id,
                        EDataType {
                            name: SmolStr::new(name),
                            kind: DataKind::Enum,
                            literals: literals.clone(),
                        },
                    );
                }
                RawClassifier::DataType {
                    name,
                    instance_class,
                } => {
                    let kind = instance_class
                        .as_deref()
                        .map(DataKind::from_instance_class)
                        .unwrap_or(DataKind::Other);
                    self.data_types.insert(name.clone(), kind);
                    self.builder.data_type(
                        id,
                        EDataType {
                            name: SmolStr::new(name),
                            kind,
                            literals: Vec::new(),
                        },
                    );
                }
            }
        }
        for sub in &pkg.subpackages {
            let sub_prefix = format!("{prefix}{}/", sub.name);
            self.declare(sub, Some(id), &sub_prefix, pending);
        }
    }

    fn resolve_class(&self, raw: &str) -> Option<ClassId> {
        let (uri, fragment) = split_type_ref(raw);
        if uri.is_empty() {
            if let Some(id) = self.class_fragments.get(fragment) {
                return Some(*id);
            }
        }
        self.class_names.get(fragment_name(fragment)).copied()
    }

    fn resolve_data_kind(&self, raw: &str) -> (SmolStr, DataKind) {
        let (uri, fragment) = split_type_ref(raw);
        let name = fragment_name(fragment);
        let kind = if uri == ECORE_NS {
            DataKind::from_type_name(name)
        } else {
            self.data_types
                .get(name)
                .copied()
                .unwrap_or_else(|| DataKind::from_type_name(name))
        };
        (SmolStr::new(name), kind)
    }

    fn attach(&mut self, class_id: ClassId, raw: &RawClass) {
        for sup in &raw.super_types {
            match self.resolve_class(sup) {
                Some(sup_id) => self.builder.super_type(class_id, sup_id),
                None => warn!(
                    "Unresolved supertype {} of class {}",
                    sup,
                    self.builder.class_name(class_id)
                ),
            }
        }
        for feature in &raw.features {
            let e_type = feature.e_type.as_deref().unwrap_or_default();
            if feature.is_reference {
                let target = self.resolve_class(e_type);
                let type_name = target
                    .map(|id| SmolStr::new(self.builder.class_name(id)))
                    .unwrap_or_else(|| SmolStr::new(fragment_name(split_type_ref(e_type).1)));
                if target.is_none() {
                    debug!(
                        "Reference {}.{} targets unknown type {}",
                        raw.name, feature.name, e_type
                    );
                }
                self.builder.class_mut(class_id).references.push(EReference {
                    name: SmolStr::new(&feature.name),
                    type_name,
                    target,
                    many: feature.many,
                    containment: feature.containment,
                });
            } else {
                let (type_name, kind) = self.resolve_data_kind(e_type);
                self.builder.class_mut(class_id).attributes.push(EAttribute {
                    name: SmolStr::new(&feature.name),
                    type_name,
                    kind,
                    many: feature.many,
                    default_literal: feature.default_literal.clone(),
                });
            }
        }
    }
}

fn resolve(roots: &[RawPackage]) -> Metamodel {
    let mut resolver = Resolver {
        builder: Metamodel::builder(),
        class_fragments: FxHashMap::default(),
        class_names: FxHashMap::default(),
        data_types: FxHashMap::default(),
    };
    let mut pending = Vec::new();
    for (index, root) in roots.iter().enumerate() {
        let prefix = if index == 0 {
            "//".to_string()
        } else {
            format!("/{index}/")
        };
        resolver.declare(root, None, &prefix, &mut pending);
    }
    for (class_id, raw) in pending {
        resolver.attach(class_id, raw);
    }
    resolver.builder.build()
}
