use super::object::{CollectionTransformer, ObjectTransformer};
use super::scalar::{
    BoolTransformer, DatabaseKeyTransformer, EnumTransformer, FloatTransformer, IntTransformer,
    JsonTransformer, MixedTransformer, StringTransformer, UuidTransformer,
};
use super::temporal::{DateTimeTransformer, DateTransformer, TimestampTransformer};
use super::{Options, ValueTransformer};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Creates a configured transformer from an attribute's options.
pub type Constructor =
    Arc<dyn Fn(&Options, &EngineConfig) -> Result<Arc<dyn ValueTransformer>> + Send + Sync>;

const DEFAULT_ALIASES: &[(&str, &str)] = &[
    ("fk", "databaseKey"),
    ("pk", "databaseKey"),
    ("foreignKey", "databaseKey"),
    ("primaryKey", "databaseKey"),
    ("integer", "int"),
    ("boolean", "bool"),
    ("double", "float"),
    ("decimal", "float"),
    ("array", "json"),
    ("map", "json"),
    ("collection", "objectCollection"),
    ("text", "string"),
    ("any", "mixed"),
];

/// Type name → transformer constructor.
pub struct TransformerRegistry {
    constructors: BTreeMap<String, Constructor>,
    aliases: BTreeMap<String, String>,
    config: EngineConfig,
}

impl TransformerRegistry {
    /// A registry with no transformers at all.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            constructors: BTreeMap::new(),
            aliases: BTreeMap::new(),
            config,
        }
    }

    /// A registry with the built-in transformers and their aliases.
    pub fn with_defaults(config: EngineConfig) -> Self {
        let mut registry = Self::new(config);
        registry.insert("string", |_, _| Ok(Arc::new(StringTransformer)));
        registry.insert("int", |_, _| Ok(Arc::new(IntTransformer)));
        registry.insert("float", |_, _| Ok(Arc::new(FloatTransformer)));
        registry.insert("bool", |_, _| Ok(Arc::new(BoolTransformer)));
        registry.insert("mixed", |_, _| Ok(Arc::new(MixedTransformer)));
        registry.insert("json", |_, _| Ok(Arc::new(JsonTransformer)));
        registry.insert("uuid", |_, _| Ok(Arc::new(UuidTransformer)));
        registry.insert("databaseKey", |_, _| Ok(Arc::new(DatabaseKeyTransformer)));
        registry.insert("enum", |options, _| {
            Ok(Arc::new(EnumTransformer::new(options)?))
        });
        registry.insert("datetime", |options, config| {
            Ok(Arc::new(DateTimeTransformer::new(options, config)?))
        });
        registry.insert("date", |options, config| {
            Ok(Arc::new(DateTransformer::new(options, config)?))
        });
        registry.insert("timestamp", |_, _| Ok(Arc::new(TimestampTransformer)));
        registry.insert("object", |options, _| {
            Ok(Arc::new(ObjectTransformer::new(options.class.clone())))
        });
        registry.insert("objectCollection", |options, _| {
            Ok(Arc::new(CollectionTransformer::new(options.class.clone())))
        });
        for (alias, target) in DEFAULT_ALIASES {
            registry
                .aliases
                .insert((*alias).to_string(), (*target).to_string());
        }
        registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a transformer type. Names already used by a transformer or an
    /// alias are rejected.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn(&Options, &EngineConfig) -> Result<Arc<dyn ValueTransformer>> + Send + Sync + 'static,
    {
        self.ensure_free(name)?;
        self.insert(name, constructor);
        Ok(())
    }

    /// Register `alias` as another name for `target`.
    pub fn alias(&mut self, alias: &str, target: &str) -> Result<()> {
        self.ensure_free(alias)?;
        self.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    /// Follow aliases to the registered name.
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        // Bounded so an alias cycle cannot loop forever.
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(target) => current = target,
                None => break,
            }
        }
        current
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(self.canonical(name))
    }

    /// Registered transformer names, aliases excluded.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Create a configured transformer.
    pub fn create(&self, name: &str, options: &Options) -> Result<Arc<dyn ValueTransformer>> {
        let canonical = self.canonical(name);
        let constructor = self.constructors.get(canonical).ok_or_else(|| {
            Error::config(format!("unknown transformer type '{name}'"))
        })?;
        constructor(options, &self.config)
    }

    fn insert<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&Options, &EngineConfig) -> Result<Arc<dyn ValueTransformer>> + Send + Sync + 'static,
    {
        self.constructors.insert(name.to_string(), Arc::new(constructor));
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.constructors.contains_key(name) || self.aliases.contains_key(name) {
            return Err(Error::config(format!(
                "transformer type '{name}' is already registered"
            )));
        }
        Ok(())
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::with_defaults(EngineConfig::default())
    }
}

impl fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerRegistry")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}
