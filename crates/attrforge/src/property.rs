//! Properties: the normalized facets of an attribute.
//!
//! Every property type contributes at most one [`Property`] per attribute. A
//! property is a single datum, a nested [`PropertySet`], or a resolver binding.

use crate::resolver::{Association, AttributeResolver};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Value(Value),
    Set(PropertySet),
    Resolver(ResolverProperty),
}

impl Property {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_set(&self) -> Option<&PropertySet> {
        match self {
            Property::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_resolver(&self) -> Option<&ResolverProperty> {
        match self {
            Property::Resolver(r) => Some(r),
            _ => None,
        }
    }

    /// Shortcut for `as_set()?.get(key)`.
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.as_set().and_then(|set| set.get(key))
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl From<PropertySet> for Property {
    fn from(set: PropertySet) -> Self {
        Property::Set(set)
    }
}

/// Named collection of properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    entries: BTreeMap<String, Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Property::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Property::as_bool)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain values of the set as a JSON map; resolvers are skipped.
    pub fn to_json(&self) -> serde_json::Map<String, Value> {
        self.entries
            .iter()
            .filter_map(|(k, v)| {
                let value = match v {
                    Property::Value(v) => v.clone(),
                    Property::Set(s) => Value::Object(s.to_json()),
                    Property::Resolver(_) => return None,
                };
                Some((k.clone(), value))
            })
            .collect()
    }
}

/// A resolver attached to an attribute, with its flags.
#[derive(Clone)]
pub struct ResolverProperty {
    resolver: Arc<dyn AttributeResolver>,
    cacheable: bool,
    auto_resolve: bool,
}

impl ResolverProperty {
    pub fn new(resolver: Arc<dyn AttributeResolver>) -> Self {
        let cacheable = resolver.is_cacheable();
        Self {
            resolver,
            cacheable,
            auto_resolve: false,
        }
    }

    /// Resolve while hydrating instead of on first read.
    pub fn auto_resolve(mut self, auto: bool) -> Self {
        self.auto_resolve = auto;
        self
    }

    /// Turn caching off even for a cacheable resolver.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cacheable = self.cacheable && cache;
        self
    }

    pub fn resolver(&self) -> &Arc<dyn AttributeResolver> {
        &self.resolver
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn is_auto_resolved(&self) -> bool {
        self.auto_resolve
    }

    pub fn association(&self) -> Option<Association> {
        self.resolver.association()
    }
}

impl PartialEq for ResolverProperty {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resolver, &other.resolver)
            && self.cacheable == other.cacheable
            && self.auto_resolve == other.auto_resolve
    }
}

impl fmt::Debug for ResolverProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverProperty")
            .field("resolver", &self.resolver)
            .field("cacheable", &self.cacheable)
            .field("auto_resolve", &self.auto_resolve)
            .finish()
    }
}

/// Replacement properties requested by a descriptor modifier, keyed by
/// property type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    entries: Vec<(String, Property)>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, property_type: impl Into<String>, property: Property) -> Self {
        self.entries.push((property_type.into(), property));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, Property)> {
        self.entries
    }
}
