use crate::attribute::AttributeMap;
use serde::Serialize;
use serde_json::Value;

/// Raw default values, filled in when hydration input lacks the attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefaultsCapability {
    defaults: Vec<(String, Value)>,
}

impl DefaultsCapability {
    pub fn from_attributes(attributes: &AttributeMap, property_type: &str) -> Self {
        let defaults = attributes
            .with_property(property_type)
            .filter_map(|(attribute, property)| {
                property
                    .as_value()
                    .map(|value| (attribute.name().to_string(), value.clone()))
            })
            .collect();
        Self { defaults }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.defaults
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, value)| value)
    }

    pub fn has_default(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.defaults.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}
