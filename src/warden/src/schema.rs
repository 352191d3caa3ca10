//! Host schema surface
//!
//! The engine does not own a type system; the host supplies an enumerable
//! map of object types and their field names. The engine uses it only to
//! decide which fields exist (for eager validation of the rule tree and
//! for applying wildcard/fallback rules) and to skip introspection-only
//! types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An object type exposed by the host schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectType {
    name: String,
    fields: BTreeSet<String>,
}

impl ObjectType {
    /// Create an object type with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeSet::new(),
        }
    }

    /// Add a field
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into());
        self
    }

    /// Add several fields
    pub fn with_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(names.into_iter().map(Into::into));
        self
    }

    /// The type's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field names, in lexical order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Whether the type declares `field`
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Introspection-only types live in the reserved `__` namespace and are
    /// never guarded.
    pub fn is_introspection(&self) -> bool {
        self.name.starts_with("__")
    }
}

/// The host's type/field map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    types: BTreeMap<String, ObjectType>,
}

impl SchemaInfo {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object type
    pub fn with_object(mut self, object: ObjectType) -> Self {
        self.types.insert(object.name.clone(), object);
        self
    }

    /// Look up a type by name
    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    /// Whether the schema declares `name`
    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All object types, in lexical order
    pub fn objects(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }
}
