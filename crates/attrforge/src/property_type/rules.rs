use super::{PropertyInput, PropertyType};
use crate::capability::{Capability, CapabilityScope, RulesCapability};
use crate::error::{Error, Result};
use crate::property::{Property, PropertySet};
use serde_json::Value;

const KEYS: [&str; 6] = ["rules", "createRules", "updateRules", "deleteRules", "label", "errMsg"];

/// `rules`: validation metadata, kept as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesProperty;

impl RulesProperty {
    pub const NAME: &'static str = "rules";
}

impl PropertyType for RulesProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition_keys(&self) -> Option<&[&str]> {
        Some(&KEYS)
    }

    fn depends_on(&self) -> &[&str] {
        &["type"]
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        let mut set = PropertySet::new();
        for key in KEYS {
            let Some(value) = input.get(key) else {
                continue;
            };
            let valid = match key {
                "label" | "errMsg" => value.is_string(),
                _ => matches!(value, Value::String(_) | Value::Array(_) | Value::Object(_)),
            };
            if !valid {
                return Err(Error::config(format!("invalid '{key}': {value}")));
            }
            set.insert(key, value.clone());
        }
        Ok((!set.is_empty()).then_some(Property::Set(set)))
    }

    fn capability(&self, scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        Ok(Some(
            RulesCapability::from_attributes(scope.attributes, Self::NAME).into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RawMap;
    use serde_json::json;

    fn run(values: Value) -> Result<Option<Property>> {
        let values: RawMap = values.as_object().unwrap().clone();
        RulesProperty.property_value(&PropertyInput {
            object_type: "Article",
            attribute: "title",
            declared_type: "string",
            values: &values,
            resolver: None,
        })
    }

    #[test]
    fn collects_present_keys() {
        let property = run(json!({"rules": "required", "label": "Headline"}))
            .unwrap()
            .unwrap();
        let set = property.as_set().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("label"), Some("Headline"));
        assert_eq!(run(json!({})).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(run(json!({"label": 1})).is_err());
        assert!(run(json!({"rules": true})).is_err());
        assert!(run(json!({"createRules": ["required", "max:3"]})).is_ok());
    }
}
