use crate::attribute::AttributeMap;
use crate::property::Property;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// External ↔ internal key translation.
///
/// `map: "ext"` renames both ways, `mapFrom` only on the way in, `mapTo`
/// only on the way out. `map: false` hides the attribute from external data
/// entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapCapability {
    attributes: Vec<String>,
    inbound: BTreeMap<String, String>,
    outbound: BTreeMap<String, String>,
    unmapped: BTreeSet<String>,
}

impl MapCapability {
    pub fn from_attributes(attributes: &AttributeMap, property_type: &str) -> Self {
        let mut capability = Self {
            attributes: attributes.names(),
            ..Default::default()
        };
        for (attribute, property) in attributes.with_property(property_type) {
            let name = attribute.name().to_string();
            if property.get("map").and_then(Property::as_value) == Some(&Value::Bool(false)) {
                capability.unmapped.insert(name);
                continue;
            }
            let both = property.get("map").and_then(Property::as_str);
            let from = property.get("mapFrom").and_then(Property::as_str).or(both);
            let to = property.get("mapTo").and_then(Property::as_str).or(both);
            if let Some(external) = from {
                capability.inbound.insert(external.to_string(), name.clone());
            }
            if let Some(external) = to {
                capability.outbound.insert(name, external.to_string());
            }
        }
        capability
    }

    /// False for attributes declared with `map: false`.
    pub fn is_mappable(&self, name: &str) -> bool {
        !self.unmapped.contains(name)
    }

    /// Mappable attributes in declaration order.
    pub fn mappable(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_mappable(name))
            .collect()
    }

    /// External name an attribute is written under, `None` when unmapped.
    pub fn external_name<'a>(&'a self, internal: &'a str) -> Option<&'a str> {
        if !self.is_mappable(internal) {
            return None;
        }
        Some(self.outbound.get(internal).map_or(internal, String::as_str))
    }

    /// Attribute an external key is read into, `None` when the key belongs to
    /// an unmapped attribute.
    pub fn internal_name<'a>(&'a self, external: &'a str) -> Option<&'a str> {
        if let Some(internal) = self.inbound.get(external) {
            return Some(internal.as_str());
        }
        self.is_mappable(external).then_some(external)
    }

    /// Rename external keys to attribute names. Keys of unmapped attributes
    /// are dropped; a renamed key wins over a same-named direct key.
    pub fn map_inbound<V>(&self, data: impl IntoIterator<Item = (String, V)>) -> Vec<(String, V)> {
        let mut direct = Vec::new();
        let mut renamed = Vec::new();
        for (key, value) in data {
            if let Some(internal) = self.inbound.get(&key) {
                renamed.push((internal.clone(), value));
            } else if self.is_mappable(&key) {
                direct.push((key, value));
            }
        }
        direct.extend(renamed);
        direct
    }

    /// Rename attribute names to external keys, dropping unmapped attributes.
    pub fn map_outbound<V>(&self, data: impl IntoIterator<Item = (String, V)>) -> Vec<(String, V)> {
        data.into_iter()
            .filter(|(key, _)| self.is_mappable(key))
            .map(|(key, value)| match self.outbound.get(&key) {
                Some(external) => (external.clone(), value),
                None => (key, value),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::property::PropertySet;
    use crate::value::RawMap;
    use serde_json::json;

    fn attribute(name: &str, map: PropertySet) -> Attribute {
        let mut properties = BTreeMap::new();
        properties.insert("map".to_string(), Property::Set(map));
        Attribute::new(name, "string", properties)
    }

    fn capability() -> MapCapability {
        let attributes: AttributeMap = [
            attribute("publishDate", PropertySet::new().with("map", json!("publish_date"))),
            attribute("candy", PropertySet::new().with("map", json!(false))),
            attribute(
                "body",
                PropertySet::new()
                    .with("mapFrom", json!("content"))
                    .with("mapTo", json!("text")),
            ),
            attribute("title", PropertySet::new()),
        ]
        .into_iter()
        .collect();
        MapCapability::from_attributes(&attributes, "map")
    }

    fn raw(value: Value) -> RawMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn names_translate_both_ways() {
        let map = capability();
        assert_eq!(map.external_name("publishDate"), Some("publish_date"));
        assert_eq!(map.internal_name("publish_date"), Some("publishDate"));
        assert_eq!(map.external_name("body"), Some("text"));
        assert_eq!(map.internal_name("content"), Some("body"));
        assert_eq!(map.external_name("title"), Some("title"));
        assert_eq!(map.external_name("candy"), None);
        assert_eq!(map.internal_name("candy"), None);
        assert_eq!(map.mappable(), vec!["publishDate", "body", "title"]);
    }

    #[test]
    fn inbound_renames_and_drops_unmapped() {
        let map = capability();
        let data = raw(json!({
            "publish_date": "2014-03-01",
            "candy": "stolen",
            "content": "c",
            "extra": 1
        }));
        let mapped: RawMap = map.map_inbound(data).into_iter().collect();
        assert_eq!(
            mapped,
            raw(json!({"publishDate": "2014-03-01", "body": "c", "extra": 1}))
        );
    }

    #[test]
    fn renamed_keys_win_over_direct_keys() {
        let map = capability();
        let data = raw(json!({"publishDate": "direct", "publish_date": "mapped"}));
        let mapped: RawMap = map.map_inbound(data).into_iter().collect();
        assert_eq!(mapped, raw(json!({"publishDate": "mapped"})));
    }

    #[test]
    fn outbound_renames_and_drops_unmapped() {
        let map = capability();
        let data = raw(json!({"publishDate": "d", "candy": "x", "body": "b", "title": "t"}));
        let mapped: RawMap = map.map_outbound(data).into_iter().collect();
        assert_eq!(
            mapped,
            raw(json!({"publish_date": "d", "text": "b", "title": "t"}))
        );
    }
}
