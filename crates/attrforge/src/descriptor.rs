//! The compiled, immutable description of one data type.

use crate::attribute::{Attribute, AttributeMap};
use crate::capability::{Capability, CapabilityKind, CapabilityScope};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::property_type::PropertyTypeSet;
use crate::transform::TransformerRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Attributes plus the capabilities property types derived from them.
#[derive(Debug, Clone)]
pub struct DataTypeDescriptor {
    name: String,
    attribute_names: Vec<String>,
    attributes: AttributeMap,
    capabilities: BTreeMap<String, Capability>,
}

impl DataTypeDescriptor {
    /// A descriptor with no attributes and no capabilities.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute_names: Vec::new(),
            attributes: AttributeMap::new(),
            capabilities: BTreeMap::new(),
        }
    }

    /// Ask every property type for its capability.
    pub fn build(
        name: impl Into<String>,
        attributes: AttributeMap,
        property_types: &PropertyTypeSet,
        transformers: &Arc<TransformerRegistry>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let name = name.into();
        let mut capabilities = BTreeMap::new();
        {
            let scope = CapabilityScope {
                data_type: &name,
                attributes: &attributes,
                transformers,
                config,
            };
            for property_type in property_types.iter() {
                if let Some(capability) = property_type.capability(&scope)? {
                    capabilities.insert(property_type.name().to_string(), capability);
                }
            }
        }
        debug!(
            data_type = %name,
            capabilities = ?capabilities.keys().collect::<Vec<_>>(),
            "built descriptor"
        );
        Ok(Self {
            attribute_names: attributes.names(),
            name,
            attributes,
            capabilities,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    /// A built-in capability, or its no-op value when no property type
    /// contributed one.
    pub fn capability<T: CapabilityKind>(&self) -> &T {
        self.capabilities
            .get(T::NAME)
            .and_then(T::from_capability)
            .unwrap_or_else(|| T::empty())
    }

    /// A capability by the name of the property type that contributed it.
    pub fn capability_named(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    /// A built-in capability that must be present.
    pub fn require<T: CapabilityKind>(&self) -> Result<&T> {
        self.capabilities
            .get(T::NAME)
            .and_then(T::from_capability)
            .ok_or_else(|| {
                Error::config(format!(
                    "data type '{}' has no '{}' capability",
                    self.name,
                    T::NAME
                ))
            })
    }

    pub fn capability_names(&self) -> Vec<&str> {
        self.capabilities.keys().map(String::as_str).collect()
    }
}
