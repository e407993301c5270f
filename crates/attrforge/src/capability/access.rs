use crate::attribute::AttributeMap;
use crate::property::Property;
use serde::Serialize;
use std::collections::BTreeSet;

/// Readable / writable / visible flags per attribute.
///
/// Stores the denials, so an attribute nobody restricted is allowed
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessCapability {
    attributes: Vec<String>,
    not_readable: BTreeSet<String>,
    not_writable: BTreeSet<String>,
    hidden: BTreeSet<String>,
}

impl AccessCapability {
    /// Collect the flags of every attribute carrying a property named
    /// `property_type`.
    pub fn from_attributes(attributes: &AttributeMap, property_type: &str) -> Self {
        let mut capability = Self {
            attributes: attributes.names(),
            ..Default::default()
        };
        for (attribute, property) in attributes.with_property(property_type) {
            let flag = |key: &str| property.get(key).and_then(Property::as_bool).unwrap_or(true);
            let name = attribute.name().to_string();
            if !flag("readable") {
                capability.not_readable.insert(name.clone());
            }
            if !flag("writable") {
                capability.not_writable.insert(name.clone());
            }
            if !flag("visible") {
                capability.hidden.insert(name);
            }
        }
        capability
    }

    pub fn is_readable(&self, name: &str) -> bool {
        !self.not_readable.contains(name)
    }

    pub fn is_writable(&self, name: &str) -> bool {
        !self.not_writable.contains(name)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        !self.hidden.contains(name)
    }

    /// Readable attributes in declaration order.
    pub fn readable(&self) -> Vec<&str> {
        self.filtered(|name| self.is_readable(name))
    }

    pub fn writable(&self) -> Vec<&str> {
        self.filtered(|name| self.is_writable(name))
    }

    pub fn visible(&self) -> Vec<&str> {
        self.filtered(|name| self.is_visible(name))
    }

    fn filtered(&self, keep: impl Fn(&str) -> bool) -> Vec<&str> {
        self.attributes
            .iter()
            .map(String::as_str)
            .filter(|name| keep(name))
            .collect()
    }
}
