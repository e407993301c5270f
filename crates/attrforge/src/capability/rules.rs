use crate::attribute::AttributeMap;
use crate::property::{Property, PropertySet};
use crate::validation::Operation;
use serde::Serialize;
use serde_json::Value;

/// Validation metadata of one attribute. Rules are opaque to the engine and
/// handed to a [`Validator`](crate::validation::Validator) as declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AttributeRules {
    fn from_set(set: &PropertySet) -> Self {
        let value = |key: &str| set.get(key).and_then(Property::as_value).cloned();
        Self {
            rules: value("rules"),
            create: value("createRules"),
            update: value("updateRules"),
            delete: value("deleteRules"),
            label: set.get_str("label").map(String::from),
            message: set.get_str("errMsg").map(String::from),
        }
    }

    /// Rules for an operation. Create and update fall back to the general
    /// rules; delete only uses its own.
    pub fn for_operation(&self, operation: Operation) -> Option<&Value> {
        match operation {
            Operation::Create => self.create.as_ref().or(self.rules.as_ref()),
            Operation::Update => self.update.as_ref().or(self.rules.as_ref()),
            Operation::Delete => self.delete.as_ref(),
        }
    }
}

/// Validation metadata of a data type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RulesCapability {
    entries: Vec<(String, AttributeRules)>,
}

impl RulesCapability {
    pub fn from_attributes(attributes: &AttributeMap, property_type: &str) -> Self {
        let entries = attributes
            .with_property(property_type)
            .filter_map(|(attribute, property)| {
                property
                    .as_set()
                    .map(|set| (attribute.name().to_string(), AttributeRules::from_set(set)))
            })
            .collect();
        Self { entries }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeRules> {
        self.entries
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, rules)| rules)
    }

    /// Every attribute with rules for `operation`, in declaration order.
    pub fn rules(&self, operation: Operation) -> Vec<(&str, &Value)> {
        self.entries
            .iter()
            .filter_map(|(name, rules)| rules.for_operation(operation).map(|r| (name.as_str(), r)))
            .collect()
    }

    /// Display label, falling back to the attribute name.
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.attribute(name)
            .and_then(|r| r.label.as_deref())
            .unwrap_or(name)
    }

    /// Custom error message of an attribute.
    pub fn message(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(|r| r.message.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn attribute(name: &str, set: PropertySet) -> Attribute {
        let mut properties = BTreeMap::new();
        properties.insert("rules".to_string(), Property::Set(set));
        Attribute::new(name, "string", properties)
    }

    fn capability() -> RulesCapability {
        let attributes: AttributeMap = [
            attribute(
                "title",
                PropertySet::new()
                    .with("rules", json!("required|max:120"))
                    .with("updateRules", json!("max:120"))
                    .with("label", json!("Headline")),
            ),
            attribute(
                "id",
                PropertySet::new()
                    .with("deleteRules", json!("required"))
                    .with("errMsg", json!("an id is needed")),
            ),
        ]
        .into_iter()
        .collect();
        RulesCapability::from_attributes(&attributes, "rules")
    }

    #[test]
    fn operation_rules_fall_back_to_general_rules() {
        let rules = capability();
        assert_eq!(rules.rules(Operation::Create), vec![("title", &json!("required|max:120"))]);
        assert_eq!(rules.rules(Operation::Update), vec![("title", &json!("max:120"))]);
        assert_eq!(rules.rules(Operation::Delete), vec![("id", &json!("required"))]);
    }

    #[test]
    fn labels_and_messages() {
        let rules = capability();
        assert_eq!(rules.label("title"), "Headline");
        assert_eq!(rules.label("id"), "id");
        assert_eq!(rules.message("id"), Some("an id is needed"));
        assert_eq!(rules.message("title"), None);
        assert!(RulesCapability::default().is_empty());
    }
}
