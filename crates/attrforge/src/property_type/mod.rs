//! # Property Types
//!
//! A property type is a plugin that owns one facet of every attribute. While
//! attributes compile it turns the definition keys it claims into a
//! [`Property`]; afterwards it may contribute a capability to the data type's
//! descriptor and a stage to its pipeline.
//!
//! ## Default Set
//!
//! | Name | Claimed keys | Stage | Capability |
//! |------|--------------|-------|------------|
//! | `type` | `type`, `varType` | – | – |
//! | `access` | `readable`, `writable`, `visible` | – | access |
//! | `map` | `map`, `mapTo`, `mapFrom` | key renaming | map |
//! | `default` | `default` | fill absent attributes | defaults |
//! | `resolver` | `resolver`, `autoResolve`, `cache` | drop input of cached resolvers | resolver |
//! | `transform` | `transform` | build / smash | transform |
//! | `rules` | `rules`, `createRules`, `updateRules`, `deleteRules`, `label`, `errMsg` | – | rules |
//!
//! ## Ordering
//!
//! Property types declare what they depend on with
//! [`PropertyType::depends_on`]. [`PropertyTypeSet`] sorts them topologically,
//! keeping registration order between independent types; that order is both
//! the compile order and the pipeline order. `type` runs first so every other
//! property type sees the declared type.

mod access;
mod default;
mod kind;
mod map;
mod resolver;
mod rules;
mod set;
mod transform;

pub use access::AccessProperty;
pub use default::{DefaultProperty, DefaultStage};
pub use kind::TypeProperty;
pub use map::{MapProperty, MapStage};
pub use resolver::{ResolveProperty, ResolverStage};
pub use rules::RulesProperty;
pub use set::PropertyTypeSet;
pub use transform::{TransformProperty, TransformStage};

use crate::capability::{Capability, CapabilityScope};
use crate::error::{Error, Result};
use crate::pipeline::Middleware;
use crate::property::{Overrides, Property};
use crate::resolver::AttributeResolver;
use crate::value::RawMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// What a property type sees of one attribute definition.
#[derive(Clone, Copy)]
pub struct PropertyInput<'a> {
    pub object_type: &'a str,
    pub attribute: &'a str,
    /// Declared type, as settled by the `type` property type.
    pub declared_type: &'a str,
    /// Only the definition keys this property type claims.
    pub values: &'a RawMap,
    /// Resolver attached to the definition, if any.
    pub resolver: Option<&'a Arc<dyn AttributeResolver>>,
}

impl<'a> PropertyInput<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.resolver.is_none()
    }

    /// A key that must hold a boolean when present.
    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(Error::config(format!(
                "'{key}' must be a boolean, got {other}"
            ))),
        }
    }

    /// A key that must hold a string when present.
    pub fn string(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::config(format!(
                "'{key}' must be a string, got {other}"
            ))),
        }
    }
}

impl fmt::Debug for PropertyInput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInput")
            .field("object_type", &self.object_type)
            .field("attribute", &self.attribute)
            .field("declared_type", &self.declared_type)
            .field("values", &self.values)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// A property type plugin.
pub trait PropertyType: Send + Sync + fmt::Debug {
    /// Unique name; also the key of its property on every attribute.
    fn name(&self) -> &str;

    /// Definition keys this type claims. `None` claims the key equal to
    /// [`PropertyType::name`].
    fn definition_keys(&self) -> Option<&[&str]> {
        None
    }

    /// Property types that must run before this one.
    fn depends_on(&self) -> &[&str] {
        &[]
    }

    /// Compile the claimed keys into a property. `None` means the attribute
    /// has no property of this type.
    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>>;

    /// Replace properties of other types once all properties of an attribute
    /// are known.
    fn modify_descriptor(
        &self,
        _own: &Property,
        _all: &BTreeMap<String, Property>,
    ) -> Option<Overrides> {
        None
    }

    /// Hydration/extraction stage.
    fn middleware(&self) -> Option<Arc<dyn Middleware>> {
        None
    }

    /// Capability contributed to the data type descriptor.
    fn capability(&self, _scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        Ok(None)
    }
}

/// The definition keys a property type claims.
pub fn claimed_keys(property_type: &dyn PropertyType) -> Vec<String> {
    match property_type.definition_keys() {
        Some(keys) => keys.iter().map(|k| k.to_string()).collect(),
        None => vec![property_type.name().to_string()],
    }
}

/// The default property types, in dependency order.
pub fn default_property_types() -> Vec<Arc<dyn PropertyType>> {
    vec![
        Arc::new(TypeProperty),
        Arc::new(AccessProperty),
        Arc::new(MapProperty),
        Arc::new(DefaultProperty),
        Arc::new(ResolveProperty),
        Arc::new(TransformProperty),
        Arc::new(RulesProperty),
    ]
}
