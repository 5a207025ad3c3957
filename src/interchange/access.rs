//! Capability interface over model objects.
//!
//! Graph construction, predicate contexts, expansion and the exporters only
//! see objects through [`ModelAccess`], never through a concrete object type.

use super::Value;
use super::model::Instance;
use crate::base::ObjectHandle;
use std::borrow::Cow;

/// One reference feature of an object together with its current targets.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceSlot<'a> {
    pub feature: &'a str,
    pub containment: bool,
    pub many: bool,
    /// Targets in slot order; `None` members are unresolved.
    pub targets: &'a [Option<ObjectHandle>],
}

/// Reflective, read-only access to a set of model objects.
pub trait ModelAccess {
    /// Name of the object's class.
    fn class_name(&self, obj: ObjectHandle) -> &str;

    /// Namespace URI of the package owning the object's class.
    fn ns_uri(&self, obj: ObjectHandle) -> Option<&str>;

    /// Persisted document identifier, if any.
    fn document_id(&self, obj: ObjectHandle) -> Option<&str>;

    /// Names of every transitive supertype of the object's class.
    fn super_type_names(&self, obj: ObjectHandle) -> Vec<&str>;

    /// All attributes in metamodel order with their current values.
    ///
    /// Unset single-valued attributes report their default, unset many-valued
    /// attributes an empty list.
    fn attribute_values(&self, obj: ObjectHandle) -> Vec<(&str, Cow<'_, Value>)>;

    /// Value of a single attribute; `None` if the class has no such attribute.
    fn attribute(&self, obj: ObjectHandle, name: &str) -> Option<Cow<'_, Value>>;

    /// All reference features in metamodel order, containments included.
    fn reference_slots(&self, obj: ObjectHandle) -> Vec<ReferenceSlot<'_>>;

    /// The containing object, for non-root objects.
    fn container(&self, obj: ObjectHandle) -> Option<ObjectHandle>;

    /// True if the object's class is `class_name` or inherits from it.
    fn is_kind_of(&self, obj: ObjectHandle, class_name: &str) -> bool {
        self.class_name(obj) == class_name || self.super_type_names(obj).contains(&class_name)
    }

    /// The `name` attribute as text, or an empty string.
    fn display_name(&self, obj: ObjectHandle) -> String {
        match self.attribute(obj, "name") {
            Some(value) if !value.is_null() => value.to_plain_string(),
            _ => String::new(),
        }
    }

    fn reference(&self, obj: ObjectHandle, name: &str) -> Option<ReferenceSlot<'_>> {
        self.reference_slots(obj)
            .into_iter()
            .find(|slot| slot.feature == name)
    }
}

impl ModelAccess for Instance {
    fn class_name(&self, obj: ObjectHandle) -> &str {
        &self.metamodel().class(self.object(obj).class).name
    }

    fn ns_uri(&self, obj: ObjectHandle) -> Option<&str> {
        self.metamodel().class_ns_uri(self.object(obj).class)
    }

    fn document_id(&self, obj: ObjectHandle) -> Option<&str> {
        self.object(obj).document_id.as_deref()
    }

    fn super_type_names(&self, obj: ObjectHandle) -> Vec<&str> {
        let mm = self.metamodel();
        mm.all_super_types(self.object(obj).class)
            .iter()
            .map(|id| mm.class(*id).name.as_str())
            .collect()
    }

    fn attribute_values(&self, obj: ObjectHandle) -> Vec<(&str, Cow<'_, Value>)> {
        let object = self.object(obj);
        self.metamodel()
            .all_attributes(object.class)
            .map(|attr| {
                let value = match object.attributes.get(attr.name.as_str()) {
                    Some(value) => Cow::Borrowed(value),
                    None => Cow::Owned(default_value(attr)),
                };
                (attr.name.as_str(), value)
            })
            .collect()
    }

    fn attribute(&self, obj: ObjectHandle, name: &str) -> Option<Cow<'_, Value>> {
        let object = self.object(obj);
        let attr = self
            .metamodel()
            .all_attributes(object.class)
            .find(|a| a.name == name)?;
        Some(match object.attributes.get(name) {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(default_value(attr)),
        })
    }

    fn reference_slots(&self, obj: ObjectHandle) -> Vec<ReferenceSlot<'_>> {
        let object = self.object(obj);
        self.metamodel()
            .all_references(object.class)
            .map(|r| ReferenceSlot {
                feature: r.name.as_str(),
                containment: r.containment,
                many: r.many,
                targets: object
                    .references
                    .get(r.name.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
            })
            .collect()
    }

    fn container(&self, obj: ObjectHandle) -> Option<ObjectHandle> {
        self.object(obj).container.as_ref().map(|(parent, _)| *parent)
    }
}

fn default_value(attr: &super::metamodel::EAttribute) -> Value {
    if attr.many {
        return Value::List(Vec::new());
    }
    attr.default_literal
        .as_deref()
        .map(|literal| Value::parse_scalar(literal, attr.kind))
        .unwrap_or(Value::Null)
}
