//! Infrastructure-as-Code output primitives
//!
//! Declarative records are built during planning with symbolic references
//! ([`Literal`]) in place of concrete values. A target resolves them only when
//! it emits its output, through an explicit [`LinkTable`].

use crate::document::DocumentHolder;
use crate::error::{Error, Result};
use crate::handle::ResourceKey;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// An unresolved reference to something a target will emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// A property of another declared resource
    Link {
        /// Resource being referenced
        key: ResourceKey,
        /// Property of that resource (e.g. "id", "name")
        property: String,
    },
    /// An auxiliary file written next to the main output
    File {
        /// Path relative to the output directory
        path: String,
    },
}

impl Literal {
    /// Reference a property of another resource.
    pub fn link(key: ResourceKey, property: impl Into<String>) -> Self {
        Self::Link {
            key,
            property: property.into(),
        }
    }

    /// Reference the identity of another resource.
    pub fn self_link(key: ResourceKey) -> Self {
        Self::link(key, "id")
    }
}

/// A field of a declarative record.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Concrete value, emitted as-is
    Value(Value),
    /// Symbolic reference, resolved at emission
    Literal(Literal),
}

/// A declarative resource description with ordered fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Field>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a concrete field.
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), Field::Value(value.into()));
        self
    }

    /// Add a symbolic field.
    pub fn with_literal(mut self, name: &str, literal: Literal) -> Self {
        self.fields.insert(name.to_string(), Field::Literal(literal));
        self
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Iterate fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    /// Resolve every literal with `resolve` and produce a JSON object.
    pub fn resolve<F>(&self, mut resolve: F) -> Result<Map<String, Value>>
    where
        F: FnMut(&Literal) -> Result<String>,
    {
        let mut out = Map::new();
        for (name, field) in &self.fields {
            let value = match field {
                Field::Value(v) => v.clone(),
                Field::Literal(l) => Value::String(resolve(l)?),
            };
            out.insert(name.clone(), value);
        }
        Ok(out)
    }
}

/// Explicit resolution table from resource keys to output addresses.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    addresses: BTreeMap<ResourceKey, String>,
}

impl LinkTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the address of a resource. Re-registering keeps the first address.
    pub fn register(&mut self, key: ResourceKey, address: impl Into<String>) -> &str {
        self.addresses.entry(key).or_insert_with(|| address.into())
    }

    /// Address registered for a key.
    pub fn address(&self, key: &ResourceKey) -> Result<&str> {
        self.addresses
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::UnresolvedLink(key.clone()))
    }

    /// Check if a key has been registered.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.addresses.contains_key(key)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Backend that turns tasks into declarative IaC output.
pub trait IacTarget {
    /// Render `document` into an auxiliary file owned by `kind.name` and
    /// return a reference to it.
    fn add_file(
        &mut self,
        kind: &str,
        name: &str,
        field: &'static str,
        document: &DocumentHolder,
    ) -> Result<Literal>;

    /// Reference `property` of another resource.
    ///
    /// Fails when `key` cannot be given an address distinct from the
    /// resources the target already knows.
    fn link(&mut self, key: &ResourceKey, property: &str) -> Result<Literal>;

    /// Emit a resource record.
    fn render_resource(&mut self, kind: &str, name: &str, record: Record) -> Result<()>;
}
