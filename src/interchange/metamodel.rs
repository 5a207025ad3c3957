//! Metamodel representation: packages, classes, attributes, references.
//!
//! ## Design
//!
//! Packages and classes live in flat arenas addressed by [`PackageId`] and
//! [`ClassId`]. Inherited feature lists are computed once in
//! [`MetamodelBuilder::build`] so per-object introspection never walks the
//! supertype graph.
//!
//! ```text
//! Metamodel
//! ├── packages: Vec<EPackage>        (document order, subpackages included)
//! ├── classes: Vec<EClass>
//! ├── layouts: Vec<ClassLayout>      (eAllSuperTypes / eAllAttributes / eAllReferences)
//! └── by_ns_uri: IndexMap<nsURI, PackageId>   (the namespace registry)
//! ```

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

// ============================================================================
// IDS
// ============================================================================

/// Index of a package in a [`Metamodel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a class in a [`Metamodel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// DATA TYPES
// ============================================================================

/// Primitive category of an attribute's data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Integer,
    Float,
    Boolean,
    String,
    Enum,
    Other,
}

impl DataKind {
    /// Category of a built-in Ecore data type (`EInt`, `EString`, ...).
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "EInt" | "EIntegerObject" | "ELong" | "ELongObject" | "EShort" | "EShortObject"
            | "EByte" | "EByteObject" | "EBigInteger" => Self::Integer,
            "EFloat" | "EFloatObject" | "EDouble" | "EDoubleObject" | "EBigDecimal" => Self::Float,
            "EBoolean" | "EBooleanObject" => Self::Boolean,
            "EString" | "EChar" | "ECharacterObject" => Self::String,
            "EEnumerator" => Self::Enum,
            _ => Self::Other,
        }
    }

    /// Category of a user data type from its Java `instanceClassName`.
    pub fn from_instance_class(name: &str) -> Self {
        match name {
            "int" | "long" | "short" | "byte" | "java.lang.Integer" | "java.lang.Long"
            | "java.lang.Short" | "java.lang.Byte" | "java.math.BigInteger" => Self::Integer,
            "float" | "double" | "java.lang.Float" | "java.lang.Double"
            | "java.math.BigDecimal" => Self::Float,
            "boolean" | "java.lang.Boolean" => Self::Boolean,
            "java.lang.String" | "char" | "java.lang.Character" => Self::String,
            _ => Self::Other,
        }
    }
}

/// A non-class classifier: data type or enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EDataType {
    pub name: SmolStr,
    pub kind: DataKind,
    /// Literal names, for enumerations.
    pub literals: Vec<SmolStr>,
}

// ============================================================================
// FEATURES
// ============================================================================

/// An attribute: a named, primitive-typed structural feature.
#[derive(Debug, Clone, PartialEq)]
pub struct EAttribute {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub kind: DataKind,
    pub many: bool,
    pub default_literal: Option<String>,
}

/// A reference: a named, class-typed structural feature.
#[derive(Debug, Clone, PartialEq)]
pub struct EReference {
    pub name: SmolStr,
    pub type_name: SmolStr,
    /// Resolved target class, if the type is defined in this metamodel.
    pub target: Option<ClassId>,
    pub many: bool,
    pub containment: bool,
}

/// A structural feature looked up by name.
#[derive(Debug, Clone, Copy)]
pub enum Feature<'m> {
    Attribute(&'m EAttribute),
    Reference(&'m EReference),
}

// ============================================================================
// PACKAGES AND CLASSES
// ============================================================================

/// A package: namespace URI plus owned classifiers and subpackages.
#[derive(Debug, Clone, PartialEq)]
pub struct EPackage {
    pub name: SmolStr,
    pub ns_uri: Option<String>,
    pub ns_prefix: Option<SmolStr>,
    pub parent: Option<PackageId>,
    pub classes: Vec<ClassId>,
    pub data_types: Vec<EDataType>,
    pub subpackages: Vec<PackageId>,
}

/// A class: declared features plus direct supertypes.
#[derive(Debug, Clone, PartialEq)]
pub struct EClass {
    pub name: SmolStr,
    pub package: PackageId,
    pub is_abstract: bool,
    pub is_interface: bool,
    pub super_types: Vec<ClassId>,
    pub attributes: Vec<EAttribute>,
    pub references: Vec<EReference>,
}

/// Inherited views of a class, precomputed at build time.
#[derive(Debug, Clone, Default)]
struct ClassLayout {
    all_super_types: Vec<ClassId>,
    attributes: Vec<(ClassId, usize)>,
    references: Vec<(ClassId, usize)>,
}

// ============================================================================
// METAMODEL
// ============================================================================

/// A loaded metamodel with its namespace registry.
#[derive(Debug, Clone, Default)]
pub struct Metamodel {
    packages: Vec<EPackage>,
    roots: Vec<PackageId>,
    classes: Vec<EClass>,
    layouts: Vec<ClassLayout>,
    by_ns_uri: IndexMap<String, PackageId>,
    by_name: FxHashMap<SmolStr, Vec<ClassId>>,
}

impl Metamodel {
    pub fn builder() -> MetamodelBuilder {
        MetamodelBuilder::default()
    }

    /// Top-level packages in document order.
    pub fn root_packages(&self) -> impl Iterator<Item = &EPackage> + '_ {
        self.roots.iter().map(|id| &self.packages[id.index()])
    }

    /// All packages, subpackages included, in document order.
    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &EPackage)> + '_ {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i as u32), p))
    }

    pub fn package(&self, id: PackageId) -> &EPackage {
        &self.packages[id.index()]
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &EClass)> + '_ {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (ClassId(i as u32), c))
    }

    pub fn class(&self, id: ClassId) -> &EClass {
        &self.classes[id.index()]
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Package registered under a namespace URI.
    pub fn package_by_ns_uri(&self, ns_uri: &str) -> Option<&EPackage> {
        self.by_ns_uri.get(ns_uri).map(|id| self.package(*id))
    }

    /// Registered namespace URIs.
    pub fn ns_uris(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_ns_uri.keys().map(String::as_str)
    }

    /// Namespace URI of the package owning a class.
    pub fn class_ns_uri(&self, id: ClassId) -> Option<&str> {
        self.package(self.class(id).package).ns_uri.as_deref()
    }

    /// Find a class by namespace URI and name.
    pub fn find_class(&self, ns_uri: &str, name: &str) -> Option<ClassId> {
        let pkg_id = *self.by_ns_uri.get(ns_uri)?;
        self.packages[pkg_id.index()]
            .classes
            .iter()
            .copied()
            .find(|id| self.classes[id.index()].name == name)
    }

    /// Find a class by bare name (first declared wins).
    pub fn find_class_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).and_then(|ids| ids.first().copied())
    }

    /// Find a data type or enumeration by name.
    pub fn find_data_type(&self, name: &str) -> Option<&EDataType> {
        self.packages
            .iter()
            .flat_map(|p| p.data_types.iter())
            .find(|dt| dt.name == name)
    }

    /// Transitive supertypes, ancestors before descendants (EMF `eAllSuperTypes` order).
    pub fn all_super_types(&self, id: ClassId) -> &[ClassId] {
        &self.layouts[id.index()].all_super_types
    }

    /// Inherited then declared attributes (EMF `eAllAttributes`).
    pub fn all_attributes(&self, id: ClassId) -> impl Iterator<Item = &EAttribute> + '_ {
        self.layouts[id.index()]
            .attributes
            .iter()
            .map(|(owner, i)| &self.classes[owner.index()].attributes[*i])
    }

    /// Inherited then declared references (EMF `eAllReferences`).
    pub fn all_references(&self, id: ClassId) -> impl Iterator<Item = &EReference> + '_ {
        self.layouts[id.index()]
            .references
            .iter()
            .map(|(owner, i)| &self.classes[owner.index()].references[*i])
    }

    /// Containment subset of [`all_references`](Self::all_references).
    pub fn all_containments(&self, id: ClassId) -> impl Iterator<Item = &EReference> + '_ {
        self.all_references(id).filter(|r| r.containment)
    }

    /// Look up a structural feature by name, attributes first.
    pub fn feature(&self, id: ClassId, name: &str) -> Option<Feature<'_>> {
        if let Some(attr) = self.all_attributes(id).find(|a| a.name == name) {
            return Some(Feature::Attribute(attr));
        }
        self.all_references(id)
            .find(|r| r.name == name)
            .map(Feature::Reference)
    }

    /// True if `id` is `ancestor` or inherits from it.
    pub fn conforms_to(&self, id: ClassId, ancestor: ClassId) -> bool {
        id == ancestor || self.all_super_types(id).contains(&ancestor)
    }

    /// Namespace prefix for a package, falling back to its name.
    pub fn prefix_for(&self, id: PackageId) -> &str {
        let pkg = self.package(id);
        pkg.ns_prefix.as_deref().unwrap_or(pkg.name.as_str())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Incremental construction of a [`Metamodel`].
#[derive(Debug, Default)]
pub struct MetamodelBuilder {
    packages: Vec<EPackage>,
    roots: Vec<PackageId>,
    classes: Vec<EClass>,
}

impl MetamodelBuilder {
    /// Add a package; `parent` of `None` makes it a top-level package.
    pub fn package(
        &mut self,
        name: &str,
        ns_uri: Option<&str>,
        ns_prefix: Option<&str>,
        parent: Option<PackageId>,
    ) -> PackageId {
        let id = PackageId(self.packages.len() as u32);
        self.packages.push(EPackage {
            name: SmolStr::new(name),
            ns_uri: ns_uri.map(str::to_string),
            ns_prefix: ns_prefix.map(SmolStr::new),
            parent,
            classes: Vec::new(),
            data_types: Vec::new(),
            subpackages: Vec::new(),
        });
        match parent {
            Some(p) => self.packages[p.index()].subpackages.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Add an empty class to a package.
    pub fn class(&mut self, package: PackageId, name: &str) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(EClass {
            name: SmolStr::new(name),
            package,
            is_abstract: false,
            is_interface: false,
            super_types: Vec::new(),
            attributes: Vec::new(),
            references: Vec::new(),
        });
        self.packages[package.index()].classes.push(id);
        id
    }

    pub fn class_mut(&mut self, id: ClassId) -> &mut EClass {
        &mut self.classes[id.index()]
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        &self.classes[id.index()].name
    }

    pub fn data_type(&mut self, package: PackageId, data_type: EDataType) {
        self.packages[package.index()].data_types.push(data_type);
    }

    pub fn super_type(&mut self, class: ClassId, super_type: ClassId) {
        let supers = &mut self.classes[class.index()].super_types;
        if !supers.contains(&super_type) {
            supers.push(super_type);
        }
    }

    /// Add an attribute typed by a built-in Ecore data type name.
    pub fn attribute(&mut self, class: ClassId, name: &str, type_name: &str, many: bool) {
        self.classes[class.index()].attributes.push(EAttribute {
            name: SmolStr::new(name),
            type_name: SmolStr::new(type_name),
            kind: DataKind::from_type_name(type_name),
            many,
            default_literal: None,
        });
    }

    /// Add a reference to a class of this metamodel.
    pub fn reference(
        &mut self,
        class: ClassId,
        name: &str,
        target: ClassId,
        many: bool,
        containment: bool,
    ) {
        let type_name = self.classes[target.index()].name.clone();
        self.classes[class.index()].references.push(EReference {
            name: SmolStr::new(name),
            type_name,
            target: Some(target),
            many,
            containment,
        });
    }

    /// Finish: compute inherited layouts and the namespace registry.
    pub fn build(self) -> Metamodel {
        let mut layouts = vec![ClassLayout::default(); self.classes.len()];
        for index in 0..self.classes.len() {
            let mut all = Vec::new();
            let mut seen = FxHashSet::default();
            seen.insert(ClassId(index as u32));
            collect_super_types(&self.classes, ClassId(index as u32), &mut seen, &mut all);

            let layout = &mut layouts[index];
            for owner in all.iter().copied().chain(std::iter::once(ClassId(index as u32))) {
                let class = &self.classes[owner.index()];
                layout
                    .attributes
                    .extend((0..class.attributes.len()).map(|i| (owner, i)));
                layout
                    .references
                    .extend((0..class.references.len()).map(|i| (owner, i)));
            }
            layout.all_super_types = all;
        }

        let mut by_ns_uri = IndexMap::new();
        for (i, pkg) in self.packages.iter().enumerate() {
            if let Some(uri) = pkg.ns_uri.as_ref().filter(|u| !u.is_empty()) {
                by_ns_uri
                    .entry(uri.clone())
                    .or_insert(PackageId(i as u32));
            }
        }

        let mut by_name: FxHashMap<SmolStr, Vec<ClassId>> = FxHashMap::default();
        for (i, class) in self.classes.iter().enumerate() {
            by_name
                .entry(class.name.clone())
                .or_default()
                .push(ClassId(i as u32));
        }

        Metamodel {
            packages: self.packages,
            roots: self.roots,
            classes: self.classes,
            layouts,
            by_ns_uri,
            by_name,
        }
    }
}

/// Depth-first: each direct supertype's ancestors, then the supertype itself.
fn collect_super_types(
    classes: &[EClass],
    id: ClassId,
    seen: &mut FxHashSet<ClassId>,
    out: &mut Vec<ClassId>,
) {
    for sup in &classes[id.index()].super_types {
        if seen.insert(*sup) {
            collect_super_types(classes, *sup, seen, out);
            out.push(*sup);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> (Metamodel, ClassId) {
        let mut b = Metamodel::builder();
        let pkg = b.package("shapes", Some("http://shapes"), Some("sh"), None);
        let named = b.class(pkg, "Named");
        b.attribute(named, "name", "EString", false);
        let left = b.class(pkg, "Left");
        b.super_type(left, named);
        b.attribute(left, "width", "EInt", false);
        let right = b.class(pkg, "Right");
        b.super_type(right, named);
        let leaf = b.class(pkg, "Leaf");
        b.super_type(leaf, left);
        b.super_type(leaf, right);
        b.reference(leaf, "next", leaf, false, false);
        (b.build(), leaf)
    }

    #[test]
    fn test_all_super_types_ancestors_first() {
        let (mm, leaf) = diamond();
        let names: Vec<_> = mm
            .all_super_types(leaf)
            .iter()
            .map(|id| mm.class(*id).name.as_str())
            .collect();
        assert_eq!(names, vec!["Named", "Left", "Right"]);
    }

    #[test]
    fn test_all_attributes_inherited_once() {
        let (mm, leaf) = diamond();
        let names: Vec<_> = mm.all_attributes(leaf).map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["name", "width"]);
        assert_eq!(mm.all_attributes(leaf).next().map(|a| a.kind), Some(DataKind::String));
    }

    #[test]
    fn test_registry_and_lookup() {
        let (mm, leaf) = diamond();
        assert_eq!(mm.find_class("http://shapes", "Leaf"), Some(leaf));
        assert_eq!(mm.find_class("http://other", "Leaf"), None);
        assert_eq!(mm.find_class_by_name("Leaf"), Some(leaf));
        assert!(mm.package_by_ns_uri("http://shapes").is_some());
        assert!(matches!(mm.feature(leaf, "next"), Some(Feature::Reference(_))));
    }

    #[test]
    fn test_cyclic_super_types_terminate() {
        let mut b = Metamodel::builder();
        let pkg = b.package("p", None, None, None);
        let a = b.class(pkg, "A");
        let c = b.class(pkg, "C");
        b.super_type(a, c);
        b.super_type(c, a);
        let mm = b.build();
        assert_eq!(mm.all_super_types(a), &[c]);
        assert_eq!(mm.all_super_types(c), &[a]);
    }
}
