//! Compiled attribute descriptors.

use crate::property::Property;
use std::collections::{BTreeMap, HashMap};

/// One compiled attribute: a name, its declared type, and the properties
/// contributed by each property type.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    declared_type: String,
    properties: BTreeMap<String, Property>,
}

impl Attribute {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        properties: BTreeMap<String, Property>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    /// The property contributed by the property type called `property_type`.
    pub fn property(&self, property_type: &str) -> Option<&Property> {
        self.properties.get(property_type)
    }

    pub fn has_property(&self, property_type: &str) -> bool {
        self.properties.contains_key(property_type)
    }

    pub fn properties(&self) -> &BTreeMap<String, Property> {
        &self.properties
    }
}

/// Attributes of one object type in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeMap {
    attributes: Vec<Attribute>,
    index: HashMap<String, usize>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute. A later attribute with the same name replaces the
    /// earlier one in place.
    pub fn push(&mut self, attribute: Attribute) {
        match self.index.get(attribute.name()) {
            Some(&position) => self.attributes[position] = attribute,
            None => {
                self.index
                    .insert(attribute.name().to_string(), self.attributes.len());
                self.attributes.push(attribute);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.index.get(name).map(|&i| &self.attributes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Every attribute carrying a property of the given type, with it.
    pub fn with_property<'a>(
        &'a self,
        property_type: &'a str,
    ) -> impl Iterator<Item = (&'a Attribute, &'a Property)> + 'a {
        self.attributes
            .iter()
            .filter_map(move |a| a.property(property_type).map(|p| (a, p)))
    }
}

impl FromIterator<Attribute> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for attribute in iter {
            map.push(attribute);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attribute(name: &str, type_name: &str) -> Attribute {
        let mut properties = BTreeMap::new();
        properties.insert("type".to_string(), Property::Value(json!(type_name)));
        Attribute::new(name, type_name, properties)
    }

    #[test]
    fn keeps_declaration_order() {
        let map: AttributeMap = [attribute("title", "string"), attribute("id", "int")]
            .into_iter()
            .collect();
        assert_eq!(map.names(), vec!["title", "id"]);
        assert_eq!(map.get("id").unwrap().declared_type(), "int");
        assert!(!map.contains("body"));
    }

    #[test]
    fn push_replaces_in_place() {
        let mut map = AttributeMap::new();
        map.push(attribute("title", "string"));
        map.push(attribute("id", "int"));
        map.push(attribute("title", "text"));

        assert_eq!(map.len(), 2);
        assert_eq!(map.names(), vec!["title", "id"]);
        assert_eq!(map.get("title").unwrap().declared_type(), "text");
    }

    #[test]
    fn with_property_filters() {
        let mut bare = attribute("body", "string");
        bare.properties.clear();
        let map: AttributeMap = [attribute("title", "string"), bare].into_iter().collect();

        let names: Vec<_> = map.with_property("type").map(|(a, _)| a.name()).collect();
        assert_eq!(names, vec!["title"]);
        assert!(map.get("body").unwrap().property("type").is_none());
    }
}
