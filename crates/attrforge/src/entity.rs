//! # Domain Objects
//!
//! An [`Entity`] is what hydration produces and extraction consumes: the name of
//! its data type plus a store of attribute values.
//!
//! ## Modified Tracking
//!
//! Writes through [`Entity::set`] mark the attribute as modified. Values written
//! by the engine itself (hydration, cached resolver results) do not: an entity
//! fresh out of `hydrate()` has no modified attributes, and reading a resolved
//! attribute never makes it dirty.

use crate::value::{AttrValue, RawMap};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entity {
    data_type: String,
    attributes: BTreeMap<String, AttrValue>,
    modified: BTreeSet<String>,
}

impl Entity {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            attributes: BTreeMap::new(),
            modified: BTreeSet::new(),
        }
    }

    /// Build an entity from already-typed values, with nothing marked modified.
    pub fn from_values<K, I>(data_type: impl Into<String>, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttrValue)>,
    {
        let mut entity = Self::new(data_type);
        for (name, value) in values {
            entity.store(name, value);
        }
        entity
    }

    /// Build an entity from raw data without any type information.
    pub fn from_raw(data_type: impl Into<String>, raw: RawMap) -> Self {
        Self::from_values(
            data_type,
            raw.into_iter()
                .map(|(name, value)| (name, AttrValue::from_json(value))),
        )
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Whether a value is stored for `name`.
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// The stored value for `name`, without running any resolver.
    pub fn value(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Set a value and mark the attribute as modified.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        self.modified.insert(name.clone());
        self.attributes.insert(name, value.into());
    }

    /// Store a value without marking it modified.
    pub(crate) fn store(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        self.modified.remove(name);
        self.attributes.remove(name)
    }

    /// Stored attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn is_modified(&self, name: &str) -> bool {
        self.modified.contains(name)
    }

    pub fn modified(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(String::as_str)
    }

    pub fn is_dirty(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }

    /// Copy of the stored attributes.
    pub fn values(&self) -> BTreeMap<String, AttrValue> {
        self.attributes.clone()
    }

    /// Merge values that came back from the engine (e.g. a store round trip).
    ///
    /// Merged attributes are no longer considered modified.
    pub(crate) fn absorb(&mut self, other: Entity) {
        for (name, value) in other.attributes {
            self.modified.remove(&name);
            self.attributes.insert(name, value);
        }
    }

    /// Flatten the stored values into raw data without type information.
    pub fn to_json(&self) -> RawMap {
        self.attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}
