use super::{PropertyInput, PropertyType};
use crate::capability::{AccessCapability, Capability, CapabilityScope};
use crate::error::Result;
use crate::property::{Property, PropertySet};
use serde_json::Value;

const FLAGS: [&str; 3] = ["readable", "writable", "visible"];

/// `access`: readable / writable / visible flags, all defaulting to true.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessProperty;

impl AccessProperty {
    pub const NAME: &'static str = "access";
}

impl PropertyType for AccessProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition_keys(&self) -> Option<&[&str]> {
        Some(&FLAGS)
    }

    fn depends_on(&self) -> &[&str] {
        &["type"]
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        let mut set = PropertySet::new();
        for flag in FLAGS {
            set.insert(flag, Value::Bool(input.bool(flag)?.unwrap_or(true)));
        }
        Ok(Some(Property::Set(set)))
    }

    fn capability(&self, scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        Ok(Some(
            AccessCapability::from_attributes(scope.attributes, Self::NAME).into(),
        ))
    }
}
