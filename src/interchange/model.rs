//! Instance representation: an arena of typed objects conforming to a [`Metamodel`].
//!
//! ## Design
//!
//! Objects are stored by [`ObjectHandle`] in document order. Containment and
//! cross references are both handle lists keyed by feature name; the
//! metamodel decides which is which.
//!
//! ```text
//! Instance
//! ├── metamodel: Arc<Metamodel>
//! ├── objects: Vec<EObject>                  (creation order)
//! ├── roots: Vec<ObjectHandle>               (resource contents)
//! └── ids: FxHashMap<xmi:id, ObjectHandle>
//! ```

use super::metamodel::{ClassId, Metamodel};
use super::{LoadError, Value};
use crate::base::ObjectHandle;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::sync::Arc;

/// One object of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EObject {
    pub class: ClassId,
    /// Persisted identifier (`xmi:id`), if the document carries one.
    pub document_id: Option<String>,
    /// Containing object and the containment feature holding this object.
    pub container: Option<(ObjectHandle, SmolStr)>,
    /// Set attribute values; unset attributes are absent.
    pub attributes: IndexMap<SmolStr, Value>,
    /// Set reference slots. `None` members are unresolved proxies.
    pub references: IndexMap<SmolStr, Vec<Option<ObjectHandle>>>,
    /// XML attributes that matched no feature, kept for re-serialization.
    pub extra: Vec<(String, String)>,
}

impl EObject {
    fn new(class: ClassId) -> Self {
        Self {
            class,
            document_id: None,
            container: None,
            attributes: IndexMap::new(),
            references: IndexMap::new(),
            extra: Vec::new(),
        }
    }
}

/// A loaded instance document.
#[derive(Debug, Clone)]
pub struct Instance {
    metamodel: Arc<Metamodel>,
    objects: Vec<EObject>,
    roots: Vec<ObjectHandle>,
    ids: FxHashMap<String, ObjectHandle>,
}

impl Instance {
    pub fn new(metamodel: Arc<Metamodel>) -> Self {
        Self {
            metamodel,
            objects: Vec::new(),
            roots: Vec::new(),
            ids: FxHashMap::default(),
        }
    }

    /// Parse an XMI document against `metamodel`.
    pub fn from_xmi_bytes(input: &[u8], metamodel: Arc<Metamodel>) -> Result<Self, LoadError> {
        super::xmi::read_xmi(input, metamodel)
    }

    pub fn metamodel(&self) -> &Metamodel {
        &self.metamodel
    }

    pub fn metamodel_arc(&self) -> &Arc<Metamodel> {
        &self.metamodel
    }

    /// Root objects (resource contents) in document order.
    pub fn roots(&self) -> &[ObjectHandle] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, handle: ObjectHandle) -> &EObject {
        &self.objects[handle.index()]
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> &mut EObject {
        &mut self.objects[handle.index()]
    }

    /// All objects in creation order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectHandle, &EObject)> + '_ {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectHandle::new(i), o))
    }

    /// Object carrying a persisted identifier.
    pub fn by_document_id(&self, id: &str) -> Option<ObjectHandle> {
        self.ids.get(id).copied()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached object of `class`, failing once the arena is full.
    pub fn create(&mut self, class: ClassId) -> Result<ObjectHandle, LoadError> {
        let handle = ObjectHandle::try_new(self.objects.len()).ok_or_else(|| {
            LoadError::invalid_element(format!("more than {} objects", u32::MAX))
        })?;
        self.objects.push(EObject::new(class));
        Ok(handle)
    }

    /// Create a detached object by class name.
    pub fn create_named(&mut self, class_name: &str) -> Result<ObjectHandle, LoadError> {
        let class = self
            .metamodel
            .find_class_by_name(class_name)
            .ok_or_else(|| LoadError::UnknownClass {
                ns_uri: String::new(),
                name: class_name.to_string(),
            })?;
        self.create(class)
    }

    pub fn add_root(&mut self, handle: ObjectHandle) {
        self.roots.push(handle);
    }

    /// Record a persisted identifier. The first object to claim an id keeps it.
    pub fn set_document_id(&mut self, handle: ObjectHandle, id: impl Into<String>) {
        let id = id.into();
        self.ids.entry(id.clone()).or_insert(handle);
        self.objects[handle.index()].document_id = Some(id);
    }

    pub fn set_attribute(&mut self, handle: ObjectHandle, name: &str, value: impl Into<Value>) {
        self.objects[handle.index()]
            .attributes
            .insert(SmolStr::new(name), value.into());
    }

    /// Append a target (or unresolved `None`) to a reference slot.
    pub fn add_reference(&mut self, handle: ObjectHandle, name: &str, target: Option<ObjectHandle>) {
        self.objects[handle.index()]
            .references
            .entry(SmolStr::new(name))
            .or_default()
            .push(target);
    }

    /// Replace a reference slot wholesale.
    pub fn set_references(
        &mut self,
        handle: ObjectHandle,
        name: &str,
        targets: Vec<Option<ObjectHandle>>,
    ) {
        self.objects[handle.index()]
            .references
            .insert(SmolStr::new(name), targets);
    }

    /// Append `child` to a containment slot of `parent`.
    ///
    /// The child's container is only set on its first containment.
    pub fn add_child(&mut self, parent: ObjectHandle, feature: &str, child: ObjectHandle) {
        self.add_reference(parent, feature, Some(child));
        let slot = &mut self.objects[child.index()].container;
        if slot.is_none() {
            *slot = Some((parent, SmolStr::new(feature)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metamodel() -> Arc<Metamodel> {
        let mut b = Metamodel::builder();
        let pkg = b.package("tree", Some("http://tree"), Some("t"), None);
        let node = b.class(pkg, "Node");
        b.attribute(node, "name", "EString", false);
        b.reference(node, "children", node, true, true);
        Arc::new(b.build())
    }

    #[test]
    fn test_add_child_sets_container_once() {
        let mut inst = Instance::new(metamodel());
        let a = inst.create_named("Node").unwrap();
        let b = inst.create_named("Node").unwrap();
        let c = inst.create_named("Node").unwrap();
        inst.add_child(a, "children", c);
        inst.add_child(b, "children", c);
        assert_eq!(inst.object(c).container, Some((a, SmolStr::new("children"))));
        assert_eq!(inst.object(b).references["children"], vec![Some(c)]);
    }

    #[test]
    fn test_document_id_first_wins() {
        let mut inst = Instance::new(metamodel());
        let a = inst.create_named("Node").unwrap();
        let b = inst.create_named("Node").unwrap();
        inst.set_document_id(a, "x");
        inst.set_document_id(b, "x");
        assert_eq!(inst.by_document_id("x"), Some(a));
        assert_eq!(inst.object(b).document_id.as_deref(), Some("x"));
    }

    #[test]
    fn test_unknown_class_name() {
        let mut inst = Instance::new(metamodel());
        assert!(matches!(
            inst.create_named("Missing"),
            Err(LoadError::UnknownClass { .. })
        ));
    }
}
