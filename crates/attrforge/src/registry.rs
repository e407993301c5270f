//! # Registry
//!
//! The explicit root of an engine instance. A [`Registry`] owns the engine
//! configuration, the ordered property types, the transformer registry, and
//! the [`Catalog`] of data types built through it. There are no global
//! caches: build one registry and pass it by reference.
//!
//! ```ignore
//! let registry = Registry::new();
//! let article = registry
//!     .define("Article")
//!     .definitions(DefinitionTable::new().shorthand("title:string"))
//!     .build()?;
//! ```
//!
//! Data types built through a registry resolve `object`/`objectCollection`
//! attributes whose `class` names another registered data type through that
//! type's own pipeline.

use crate::config::EngineConfig;
use crate::data_type::{DataType, DataTypeBuilder};
use crate::definition::DefinitionTable;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::factory::AttributeFactory;
use crate::property_type::{default_property_types, PropertyType, PropertyTypeSet};
use crate::schema::ObjectSchema;
use crate::transform::{Constructor, NestedTypes, Options, TransformerRegistry, ValueTransformer};
use crate::value::RawMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Data types registered with one [`Registry`], by name.
#[derive(Default)]
pub struct Catalog {
    types: RwLock<HashMap<String, Arc<DataType>>>,
}

impl Catalog {
    pub fn get(&self, name: &str) -> Option<Arc<DataType>> {
        self.types.read().ok()?.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .types
            .read()
            .map(|types| types.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub(crate) fn insert(&self, data_type: Arc<DataType>) -> Result<()> {
        let mut types = self
            .types
            .write()
            .map_err(|_| Error::config("data type catalog lock poisoned"))?;
        if types.contains_key(data_type.name()) {
            return Err(Error::config(format!(
                "data type '{}' is already registered",
                data_type.name()
            )));
        }
        types.insert(data_type.name().to_string(), data_type);
        Ok(())
    }
}

impl NestedTypes for Catalog {
    fn hydrate_nested(&self, class: &str, raw: RawMap) -> Result<Entity> {
        match self.get(class) {
            Some(data_type) => data_type.hydrate(raw),
            None => {
                trace!(class, "nested class is not registered, keeping raw values");
                Ok(Entity::from_raw(class, raw))
            }
        }
    }

    fn extract_nested(&self, class: &str, entity: &Entity) -> Result<RawMap> {
        match self.get(class) {
            Some(data_type) => data_type.extract(entity),
            None => Ok(entity.to_json()),
        }
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog").field("types", &self.names()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Registry {
    config: EngineConfig,
    property_types: Arc<PropertyTypeSet>,
    transformers: Arc<TransformerRegistry>,
    catalog: Arc<Catalog>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Default property types and transformers, default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            property_types: Arc::new(PropertyTypeSet::defaults()),
            transformers: Arc::new(TransformerRegistry::with_defaults(config.clone())),
            catalog: Arc::new(Catalog::default()),
            config,
        }
    }

    /// Load configuration from the environment and an optional TOML file.
    pub fn load(file: Option<&std::path::Path>) -> Result<Self> {
        Ok(Self::with_config(EngineConfig::load(file)?))
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn property_types(&self) -> &Arc<PropertyTypeSet> {
        &self.property_types
    }

    pub fn transformers(&self) -> &Arc<TransformerRegistry> {
        &self.transformers
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// A registered data type.
    pub fn data_type(&self, name: &str) -> Option<Arc<DataType>> {
        self.catalog.get(name)
    }

    /// Start defining a data type; [`DataTypeBuilder::build`] registers it.
    pub fn define(&self, name: impl Into<String>) -> DataTypeBuilder {
        DataTypeBuilder::new(
            name,
            Arc::clone(&self.property_types),
            Arc::clone(&self.transformers),
            self.config.clone(),
            Some(Arc::clone(&self.catalog)),
        )
    }

    /// A builder pre-filled from a schema, for adding collaborators.
    pub fn schema(&self, schema: &dyn ObjectSchema) -> Result<DataTypeBuilder> {
        Ok(self
            .define(schema.name())
            .definitions(schema.definitions())
            .resolvers(schema.resolvers()?))
    }

    /// Build and register the data type a schema describes.
    pub fn register(&self, schema: &dyn ObjectSchema) -> Result<Arc<DataType>> {
        self.schema(schema)?.build()
    }

    /// A standalone attribute factory using this registry's property types.
    pub fn factory(&self, object_type: impl Into<String>, definitions: DefinitionTable) -> AttributeFactory {
        AttributeFactory::new(object_type, Arc::clone(&self.property_types), definitions)
            .strict(self.config.strict_definitions)
    }
}

/// Assembles a [`Registry`] with custom property types and transformers.
#[derive(Default)]
pub struct RegistryBuilder {
    config: EngineConfig,
    property_types: Vec<Arc<dyn PropertyType>>,
    transformers: Vec<(String, Constructor)>,
    aliases: Vec<(String, String)>,
}

impl RegistryBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a property type next to the defaults.
    pub fn property_type(mut self, property_type: Arc<dyn PropertyType>) -> Self {
        self.property_types.push(property_type);
        self
    }

    /// Add a transformer type next to the built-in ones.
    pub fn transformer<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Options, &EngineConfig) -> Result<Arc<dyn ValueTransformer>> + Send + Sync + 'static,
    {
        self.transformers.push((name.into(), Arc::new(constructor)));
        self
    }

    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), target.into()));
        self
    }

    /// Order the property types and register the transformers.
    ///
    /// Name clashes, unknown dependencies, and dependency cycles fail here.
    pub fn build(self) -> Result<Registry> {
        let mut types = default_property_types();
        types.extend(self.property_types);
        let property_types = PropertyTypeSet::new(types)?;

        let mut transformers = TransformerRegistry::with_defaults(self.config.clone());
        for (name, constructor) in self.transformers {
            transformers.register(&name, move |options, config| constructor(options, config))?;
        }
        for (alias, target) in &self.aliases {
            transformers.alias(alias, target)?;
        }

        debug!(
            property_types = ?property_types.names(),
            "built registry"
        );
        Ok(Registry {
            config: self.config,
            property_types: Arc::new(property_types),
            transformers: Arc::new(transformers),
            catalog: Arc::new(Catalog::default()),
        })
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("config", &self.config)
            .field("property_types", &self.property_types)
            .field(
                "transformers",
                &self.transformers.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("aliases", &self.aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;
    use crate::property_type::PropertyInput;
    use crate::transform::{TransformCx, ValueError};
    use crate::value::AttrValue;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawMap {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn defined_types_are_registered() {
        let registry = Registry::new();
        let article = registry
            .define("Article")
            .definitions(DefinitionTable::new().shorthand("title:string"))
            .build()
            .unwrap();

        assert_eq!(article.name(), "Article");
        assert!(registry.data_type("Article").is_some());
        assert!(registry.data_type("Author").is_none());
        assert_eq!(registry.catalog().names(), vec!["Article"]);

        let again = registry.define("Article").build();
        assert!(matches!(again, Err(Error::Configuration(_))));
    }

    #[test]
    fn nested_objects_use_registered_types() {
        let registry = Registry::new();
        registry
            .define("Author")
            .definitions(
                DefinitionTable::new()
                    .shorthand("id:int")
                    .config("name:string", json!({"map": "full_name"})),
            )
            .build()
            .unwrap();
        let article = registry
            .define("Article")
            .definitions(
                DefinitionTable::new()
                    .config("author", json!({"transform": {"type": "object", "class": "Author"}})),
            )
            .build()
            .unwrap();

        let input = raw(json!({"author": {"id": "7", "full_name": "Ada"}}));
        let entity = article.hydrate(input).unwrap();
        let author = entity.value("author").and_then(AttrValue::as_entity).unwrap();
        assert_eq!(author.data_type(), "Author");
        assert_eq!(author.value("id"), Some(&AttrValue::Int(7)));
        assert_eq!(author.value("name"), Some(&AttrValue::from("Ada")));

        assert_eq!(
            article.extract(&entity).unwrap(),
            raw(json!({"author": {"id": 7, "full_name": "Ada"}}))
        );
    }

    #[test]
    fn skip_object_smashing_extracts_stored_nested_values() {
        let registry = Registry::with_config(EngineConfig {
            skip_object_smashing: true,
            ..Default::default()
        });
        registry
            .define("Author")
            .definitions(
                DefinitionTable::new()
                    .shorthand("id:int")
                    .config("name:string", json!({"map": "full_name"})),
            )
            .build()
            .unwrap();
        let article = registry
            .define("Article")
            .definitions(
                DefinitionTable::new()
                    .config("author", json!({"transform": {"type": "object", "class": "Author"}})),
            )
            .build()
            .unwrap();

        let entity = article
            .hydrate(raw(json!({"author": {"id": "7", "full_name": "Ada"}})))
            .unwrap();
        assert_eq!(
            article.extract(&entity).unwrap(),
            raw(json!({"author": {"id": 7, "name": "Ada"}}))
        );
    }

    #[test]
    fn nested_failures_keep_their_cause() {
        let registry = Registry::new();
        registry
            .define("Author")
            .definitions(DefinitionTable::new().shorthand("id:int"))
            .build()
            .unwrap();
        let article = registry
            .define("Article")
            .definitions(
                DefinitionTable::new()
                    .config("author", json!({"transform": {"type": "object", "class": "Author"}})),
            )
            .build()
            .unwrap();

        let err = article
            .hydrate(raw(json!({"author": {"id": "seven"}})))
            .unwrap_err();

        let mut causes = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(cause) = current {
            if let Some(Error::Transformation { attribute, .. }) = cause.downcast_ref::<Error>() {
                causes.push(attribute.clone());
            }
            current = cause.source();
        }
        assert_eq!(causes, vec!["author", "id"]);
    }

    #[derive(Debug)]
    struct Upper;

    impl ValueTransformer for Upper {
        fn build(&self, raw: &Value, _: &TransformCx<'_>) -> std::result::Result<AttrValue, ValueError> {
            raw.as_str()
                .map(|s| AttrValue::from(s.to_uppercase()))
                .ok_or_else(|| ValueError::NotAllowed(raw.to_string()))
        }

        fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> std::result::Result<Value, ValueError> {
            Ok(Value::from(value.as_str().unwrap_or_default().to_lowercase()))
        }

        fn scalar_type(&self) -> &'static str {
            "string"
        }
    }

    #[derive(Debug)]
    struct Audit;

    impl PropertyType for Audit {
        fn name(&self) -> &str {
            "audit"
        }

        fn depends_on(&self) -> &[&str] {
            &["type"]
        }

        fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
            Ok(input.get("audit").cloned().map(Property::Value))
        }
    }

    #[test]
    fn builder_adds_custom_types_and_transformers() {
        let registry = Registry::builder()
            .property_type(Arc::new(Audit))
            .transformer("upper", |_, _| Ok(Arc::new(Upper)))
            .alias("shout", "upper")
            .build()
            .unwrap();

        assert!(registry.property_types().get("audit").is_some());
        let article = registry
            .define("Article")
            .definitions(DefinitionTable::new().config("title:shout", json!({"audit": true})))
            .build()
            .unwrap();

        let entity = article.hydrate(raw(json!({"title": "hi"}))).unwrap();
        assert_eq!(entity.value("title"), Some(&AttrValue::from("HI")));
        assert_eq!(article.extract(&entity).unwrap(), raw(json!({"title": "hi"})));

        let attribute = article.descriptor().attribute("title").unwrap();
        assert_eq!(
            attribute.property("audit").and_then(Property::as_bool),
            Some(true)
        );
    }

    #[test]
    fn builder_rejects_clashes() {
        let duplicate = Registry::builder()
            .transformer("string", |_, _| Ok(Arc::new(Upper)))
            .build();
        assert!(matches!(duplicate, Err(Error::Configuration(_))));

        let clash = Registry::builder()
            .property_type(Arc::new(Audit))
            .property_type(Arc::new(Audit))
            .build();
        assert!(clash.is_err());
    }

    #[test]
    fn config_reaches_data_types() {
        let registry = Registry::with_config(EngineConfig {
            strict_definitions: false,
            ..Default::default()
        });
        let loose = registry
            .define("Loose")
            .definitions(DefinitionTable::new().config("title", json!({"colour": "red"})))
            .build();
        assert!(loose.is_ok());
        assert!(registry
            .factory("Other", DefinitionTable::new())
            .attributes()
            .unwrap()
            .is_empty());
    }
}
