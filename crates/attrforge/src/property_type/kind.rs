use super::{PropertyInput, PropertyType};
use crate::error::Result;
use crate::property::{Property, PropertySet};
use serde_json::Value;

/// `type`: settles the declared type. Attributes without one are `mixed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeProperty;

impl TypeProperty {
    pub const NAME: &'static str = "type";
    pub const FALLBACK: &'static str = "mixed";
}

impl PropertyType for TypeProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition_keys(&self) -> Option<&[&str]> {
        Some(&["type", "varType"])
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        let type_name = input
            .string("type")?
            .unwrap_or(input.declared_type)
            .trim();
        let type_name = if type_name.is_empty() {
            Self::FALLBACK
        } else {
            type_name
        };
        let var_type = input.string("varType")?.unwrap_or(type_name);

        Ok(Some(Property::Set(
            PropertySet::new()
                .with("type", Value::from(type_name))
                .with("varType", Value::from(var_type)),
        )))
    }
}
