//! # Attribute Compilation
//!
//! [`AttributeFactory`] turns one object type's [`DefinitionTable`] into its
//! [`AttributeMap`]. Compilation is lazy and happens once per factory; later
//! calls return the same map.
//!
//! For each normalized definition:
//!
//! 1. Keys no property type claims are rejected (in strict mode).
//! 2. Every property type, in dependency order, compiles the keys it claims.
//!    The `type` property settles the declared type seen by the rest.
//! 3. Descriptor modifiers run against a snapshot of all properties and may
//!    replace properties of other types.
//!
//! Every failure is reported as [`Error::AttributeCompilation`] naming the
//! object type and the attribute.

use crate::attribute::{Attribute, AttributeMap};
use crate::definition::{attach_resolvers, DefinitionTable, NormalizedDefinition};
use crate::error::{Error, Result};
use crate::property::Property;
use crate::property_type::{claimed_keys, PropertyInput, PropertyTypeSet, TypeProperty};
use crate::resolver::ResolverRegistry;
use crate::value::RawMap;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Compiles and caches the attributes of one object type.
#[derive(Debug)]
pub struct AttributeFactory {
    object_type: String,
    property_types: Arc<PropertyTypeSet>,
    definitions: DefinitionTable,
    resolvers: ResolverRegistry,
    strict: bool,
    compiled: OnceCell<AttributeMap>,
}

impl AttributeFactory {
    pub fn new(
        object_type: impl Into<String>,
        property_types: Arc<PropertyTypeSet>,
        definitions: DefinitionTable,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            property_types,
            definitions,
            resolvers: ResolverRegistry::new(),
            strict: true,
            compiled: OnceCell::new(),
        }
    }

    /// Resolvers registered outside the definition table.
    pub fn with_resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Whether unclaimed definition keys are errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn property_types(&self) -> &Arc<PropertyTypeSet> {
        &self.property_types
    }

    /// The compiled attributes, compiling them on first use.
    pub fn attributes(&self) -> Result<&AttributeMap> {
        self.compiled.get_or_try_init(|| self.compile())
    }

    fn compile(&self) -> Result<AttributeMap> {
        let mut definitions = self.definitions.normalize(&self.object_type)?;
        attach_resolvers(&mut definitions, &self.resolvers, &self.object_type)?;

        let mut attributes = AttributeMap::new();
        for definition in &definitions {
            let attribute = self
                .compile_attribute(definition)
                .map_err(|source| self.wrap(&definition.name, source))?;
            attributes.push(attribute);
        }

        debug!(
            object_type = %self.object_type,
            attributes = attributes.len(),
            "compiled attributes"
        );
        Ok(attributes)
    }

    fn compile_attribute(&self, definition: &NormalizedDefinition) -> Result<Attribute> {
        let config = &definition.config;
        if self.strict {
            let claimed = self.property_types.claimed_keys();
            if let Some(key) = config.keys().find(|key| !claimed.contains(*key)) {
                return Err(Error::config(format!("unsupported definition key '{key}'")));
            }
        }

        let mut declared_type = definition.declared_type.clone().unwrap_or_default();
        let mut properties: BTreeMap<String, Property> = BTreeMap::new();

        for property_type in self.property_types.iter() {
            let values: RawMap = claimed_keys(property_type.as_ref())
                .into_iter()
                .filter_map(|key| config.get(&key).map(|value| (key, value.clone())))
                .collect();
            let input = PropertyInput {
                object_type: &self.object_type,
                attribute: &definition.name,
                declared_type: &declared_type,
                values: &values,
                resolver: config.resolver(),
            };
            let Some(property) = property_type.property_value(&input)? else {
                continue;
            };

            if property_type.name() == TypeProperty::NAME {
                if let Some(settled) = property.get("type").and_then(Property::as_str) {
                    declared_type = settled.to_string();
                }
            }
            properties.insert(property_type.name().to_string(), property);
        }

        let snapshot = properties.clone();
        for property_type in self.property_types.iter() {
            let Some(own) = snapshot.get(property_type.name()) else {
                continue;
            };
            let Some(overrides) = property_type.modify_descriptor(own, &snapshot) else {
                continue;
            };
            for (target, property) in overrides.into_entries() {
                debug!(
                    object_type = %self.object_type,
                    attribute = %definition.name,
                    modifier = property_type.name(),
                    target = %target,
                    "descriptor override"
                );
                properties.insert(target, property);
            }
        }

        if declared_type.is_empty() {
            declared_type = TypeProperty::FALLBACK.to_string();
        }
        Ok(Attribute::new(definition.name.clone(), declared_type, properties))
    }

    fn wrap(&self, attribute: &str, source: Error) -> Error {
        match source {
            already @ Error::AttributeCompilation { .. } => already,
            source => Error::AttributeCompilation {
                object_type: self.object_type.clone(),
                attribute: attribute.to_string(),
                source: Box::new(source),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::ResolverProperty;
    use crate::resolver::{AssociationResolver, CallableResolver};
    use crate::store::MemoryStore;
    use crate::value::AttrValue;
    use serde_json::{json, Value};

    fn factory(definitions: DefinitionTable) -> AttributeFactory {
        AttributeFactory::new("Article", Arc::new(PropertyTypeSet::defaults()), definitions)
    }

    fn transform_type(attribute: &Attribute) -> Option<&str> {
        attribute
            .property("transform")
            .and_then(|p| p.get("type"))
            .and_then(Property::as_str)
    }

    #[test]
    fn compiles_shorthand_and_maps() {
        let factory = factory(
            DefinitionTable::new()
                .shorthand("id:int")
                .config("publishDate:datetime", json!({"map": "publish_date"}))
                .shorthand("notes"),
        );
        let attributes = factory.attributes().unwrap();

        assert_eq!(attributes.names(), vec!["id", "publishDate", "notes"]);
        let publish = attributes.get("publishDate").unwrap();
        assert_eq!(publish.declared_type(), "datetime");
        assert_eq!(transform_type(publish), Some("datetime"));
        assert_eq!(
            publish.property("map").and_then(|p| p.get("map")).and_then(Property::as_str),
            Some("publish_date")
        );
        assert_eq!(attributes.get("notes").unwrap().declared_type(), "mixed");

        let map = crate::capability::MapCapability::from_attributes(attributes, "map");
        assert_eq!(map.internal_name("publish_date"), Some("publishDate"));
        assert_eq!(map.external_name("publishDate"), Some("publish_date"));
    }

    #[test]
    fn compiles_once() {
        let factory = factory(DefinitionTable::new().shorthand("id:int"));
        let first = factory.attributes().unwrap() as *const AttributeMap;
        let second = factory.attributes().unwrap() as *const AttributeMap;
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn unclaimed_keys_fail_in_strict_mode_only() {
        let table = DefinitionTable::new().config("title", json!({"colour": "red"}));

        let err = factory(table.clone()).attributes().unwrap_err();
        match err {
            Error::AttributeCompilation {
                object_type,
                attribute,
                source,
            } => {
                assert_eq!(object_type, "Article");
                assert_eq!(attribute, "title");
                assert!(source.to_string().contains("colour"));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(factory(table).strict(false).attributes().is_ok());
    }

    #[test]
    fn property_errors_name_the_attribute() {
        let err = factory(DefinitionTable::new().config("title", json!({"readable": "yes"})))
            .attributes()
            .unwrap_err();
        assert_eq!(err.attribute(), Some("title"));
    }

    #[test]
    fn registry_resolvers_are_attached() {
        let resolvers = ResolverRegistry::new()
            .callable("candy", |_| Ok(AttrValue::from("sweet")))
            .unwrap();
        let factory = factory(DefinitionTable::new().shorthand("title:string")).with_resolvers(resolvers);
        let attributes = factory.attributes().unwrap();

        let candy = attributes.get("candy").unwrap();
        assert!(candy
            .property("resolver")
            .and_then(Property::as_resolver)
            .is_some_and(ResolverProperty::is_cacheable));
    }

    #[test]
    fn associations_override_the_transform() {
        let store = Arc::new(MemoryStore::new());
        let author = AssociationResolver::has_one("Author", "id", "authorId", store.lookup("Author"));
        let comments = AssociationResolver::has_many("Comment", "articleId", "id", store.lookup("Comment"));
        let factory = factory(
            DefinitionTable::new()
                .config("author", json!({"transform": {"nullable": false}}))
                .define(
                    "author",
                    crate::definition::Definition::ResolverRef(Arc::new(author)),
                )
                .resolver("comments", Arc::new(comments)),
        );
        let attributes = factory.attributes().unwrap();

        let author = attributes.get("author").unwrap();
        let transform = author.property("transform").and_then(Property::as_set).unwrap();
        assert_eq!(transform.get_str("type"), Some("object"));
        assert_eq!(transform.get_str("class"), Some("Author"));
        assert_eq!(
            transform.get("nullable").and_then(Property::as_value),
            Some(&Value::Bool(false))
        );

        let comments = attributes.get("comments").unwrap();
        assert_eq!(transform_type(comments), Some("objectCollection"));
    }

    #[test]
    fn resolvers_bind_to_their_attribute() {
        let resolver = Arc::new(CallableResolver::new(|_| Ok(AttrValue::Null)));
        let factory = factory(DefinitionTable::new().resolver("total", resolver.clone()));
        factory.attributes().unwrap();

        let binding = crate::resolver::AttributeResolver::binding(resolver.as_ref());
        assert_eq!(binding.object_type(), Some("Article"));
        assert_eq!(binding.attribute(), Some("total"));
    }
}
