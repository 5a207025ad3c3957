//! Per-object evaluation context.

use crate::graph::ObjectInfo;
use crate::interchange::{ModelAccess, Value};
use std::borrow::Cow;

/// Read-only view of one graph node for predicate evaluation.
///
/// Name resolution order: the object's attributes, then the reserved keys
/// `eclass`, `nsuri`, `id`, `ID`, `local_id`, `path` and `attrs`. Anything
/// else resolves to null.
pub struct PredicateContext<'a, M: ModelAccess + ?Sized> {
    model: &'a M,
    info: &'a ObjectInfo,
    attributes: Vec<(&'a str, Cow<'a, Value>)>,
}

impl<'a, M: ModelAccess + ?Sized> PredicateContext<'a, M> {
    pub fn new(model: &'a M, info: &'a ObjectInfo) -> Self {
        Self {
            attributes: model.attribute_values(info.handle),
            model,
            info,
        }
    }

    pub fn info(&self) -> &ObjectInfo {
        self.info
    }

    pub fn class_name(&self) -> &str {
        self.model.class_name(self.info.handle)
    }

    /// Resolve a bare name.
    pub fn lookup(&self, name: &str) -> Value {
        if let Some((_, value)) = self.attributes.iter().find(|(k, _)| *k == name) {
            return value.as_ref().clone();
        }
        match name {
            "eclass" => Value::from(self.class_name()),
            "nsuri" => self
                .model
                .ns_uri(self.info.handle)
                .map(Value::from)
                .unwrap_or(Value::Null),
            "id" | "ID" => Value::from(self.info.preferred_id.as_str()),
            "local_id" => Value::String(self.info.local_id.to_string()),
            "path" => Value::from(self.info.path.as_str()),
            "attrs" => Value::Map(
                self.attributes
                    .iter()
                    .map(|(k, v)| (Value::from(*k), v.as_ref().clone()))
                    .collect(),
            ),
            _ => Value::Null,
        }
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.class_name() == name
    }

    pub fn is_kind_of(&self, name: &str) -> bool {
        self.model.is_kind_of(self.info.handle, name)
    }
}
