//! # Attribute Definitions
//!
//! The raw input of the compiler: one entry per attribute, keyed either by a
//! bare name or by `name:type` shorthand.
//!
//! ## Entry Forms
//!
//! | Form | Example | Meaning |
//! |------|---------|---------|
//! | Shorthand | `"title:string"` | name and type, nothing else |
//! | [`Definition::Scalar`] | `("id", "int")` | type name only |
//! | [`Definition::Config`] | `("publishDate:datetime", {"map": "publish_date"})` | full definition map |
//! | [`Definition::ResolverRef`] | `("candy", resolver)` | computed attribute |
//!
//! ## Normalization
//!
//! [`DefinitionTable::normalize`] turns entries into [`NormalizedDefinition`]s:
//!
//! 1. `name:type` keys are split; the type is merged into a definition that
//!    lacks a `type` key. Conflicting types are an error.
//! 2. Entries naming the same attribute are merged, later keys winning.
//! 3. Dotted keys are folded: `transform.format` becomes
//!    `{"transform": {"format": ...}}`.
//! 4. Resolver references become a definition carrying that resolver.

use crate::error::{Error, Result};
use crate::resolver::{AttributeResolver, ResolverRegistry};
use crate::value::{json_kind, RawMap};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One attribute definition, before normalization.
#[derive(Clone)]
pub enum Definition {
    /// Just a type name.
    Scalar(String),
    /// A definition map, optionally with a resolver attached.
    Config(AttributeConfig),
    /// A resolver and nothing else.
    ResolverRef(Arc<dyn AttributeResolver>),
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Scalar(t) => f.debug_tuple("Scalar").field(t).finish(),
            Definition::Config(c) => f.debug_tuple("Config").field(c).finish(),
            Definition::ResolverRef(r) => f.debug_tuple("ResolverRef").field(r).finish(),
        }
    }
}

impl Definition {
    /// Interpret a raw JSON definition: a string is a type name, a map is a
    /// full definition, null is an empty definition.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::String(type_name) => Ok(Definition::Scalar(type_name)),
            Value::Object(values) => Ok(Definition::Config(AttributeConfig::from_map(values))),
            Value::Null => Ok(Definition::Config(AttributeConfig::new())),
            other => Err(Error::config(format!(
                "definition must be a type name or a map, found {}",
                json_kind(&other)
            ))),
        }
    }
}

/// A definition map plus an optional resolver object.
#[derive(Debug, Clone, Default)]
pub struct AttributeConfig {
    values: RawMap,
    resolver: Option<Arc<dyn AttributeResolver>>,
}

impl AttributeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(values: RawMap) -> Self {
        Self {
            values,
            resolver: None,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn AttributeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn values(&self) -> &RawMap {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn resolver(&self) -> Option<&Arc<dyn AttributeResolver>> {
        self.resolver.as_ref()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn merge(&mut self, other: AttributeConfig) -> Result<()> {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
        match (&self.resolver, other.resolver) {
            (Some(_), Some(_)) => Err(Error::config("attribute declares two resolvers")),
            (None, Some(resolver)) => {
                self.resolver = Some(resolver);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Shorthand(String),
    Defined(String, Definition),
    Json(String, Value),
}

/// An attribute after normalization: one per name, in declaration order.
#[derive(Debug, Clone)]
pub struct NormalizedDefinition {
    pub name: String,
    /// Type from `name:type` shorthand or a scalar definition; the `type`
    /// key, when present, is still in `config`.
    pub declared_type: Option<String>,
    pub config: AttributeConfig,
}

/// Ordered table of raw attribute definitions for one object type.
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    entries: Vec<Entry>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from JSON.
    ///
    /// Accepts a map of `key → definition`, or an array whose items are
    /// shorthand strings or single-entry maps. Arrays keep declaration order;
    /// maps are ordered by key.
    pub fn from_json(value: Value) -> Result<Self> {
        let mut table = Self::new();
        match value {
            Value::Object(entries) => {
                for (key, definition) in entries {
                    table = table.config(key, definition);
                }
            }
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(shorthand) => table = table.shorthand(shorthand),
                        Value::Object(entries) => {
                            for (key, definition) in entries {
                                table = table.config(key, definition);
                            }
                        }
                        other => {
                            return Err(Error::config(format!(
                                "definition list items must be strings or maps, found {}",
                                json_kind(&other)
                            )))
                        }
                    }
                }
            }
            other => {
                return Err(Error::config(format!(
                    "definition table must be a map or a list, found {}",
                    json_kind(&other)
                )))
            }
        }
        Ok(table)
    }

    /// A positional `name:type` entry.
    pub fn shorthand(mut self, spec: impl Into<String>) -> Self {
        self.entries.push(Entry::Shorthand(spec.into()));
        self
    }

    /// A name (or `name:type`) with just a type.
    pub fn typed(self, key: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.define(key, Definition::Scalar(type_name.into()))
    }

    /// A definition given as JSON (type name, map, or null).
    pub fn config(mut self, key: impl Into<String>, definition: Value) -> Self {
        self.entries.push(Entry::Json(key.into(), definition));
        self
    }

    /// A computed attribute.
    pub fn resolver(self, key: impl Into<String>, resolver: Arc<dyn AttributeResolver>) -> Self {
        self.define(key, Definition::ResolverRef(resolver))
    }

    pub fn define(mut self, key: impl Into<String>, definition: Definition) -> Self {
        self.entries.push(Entry::Defined(key.into(), definition));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalize every entry. Errors name the object type and attribute.
    pub fn normalize(&self, object_type: &str) -> Result<Vec<NormalizedDefinition>> {
        let mut normalized: Vec<NormalizedDefinition> = Vec::new();

        for entry in &self.entries {
            let (key, definition) = match entry {
                Entry::Shorthand(spec) => (spec.as_str(), Ok(Definition::Scalar(String::new()))),
                Entry::Defined(key, definition) => (key.as_str(), Ok(definition.clone())),
                Entry::Json(key, value) => (key.as_str(), Definition::from_json(value.clone())),
            };

            let wrap = |name: &str, source: Error| Error::AttributeCompilation {
                object_type: object_type.to_string(),
                attribute: name.to_string(),
                source: Box::new(source),
            };

            let (name, key_type) = split_key(key).map_err(|e| wrap(key, e))?;
            let (definition_type, config) = definition
                .and_then(into_config)
                .map_err(|e| wrap(&name, e))?;
            let declared_type = merge_types(key_type, definition_type).map_err(|e| wrap(&name, e))?;

            match normalized.iter_mut().find(|d| d.name == name) {
                Some(existing) => {
                    existing.declared_type =
                        merge_types(existing.declared_type.take(), declared_type)
                            .map_err(|e| wrap(&name, e))?;
                    existing.config.merge(config).map_err(|e| wrap(&name, e))?;
                }
                None => normalized.push(NormalizedDefinition {
                    name,
                    declared_type,
                    config,
                }),
            }
        }

        for definition in &mut normalized {
            let explicit = definition
                .config
                .get("type")
                .and_then(Value::as_str)
                .map(String::from);
            if explicit.is_some() {
                definition.declared_type =
                    merge_types(definition.declared_type.take(), explicit).map_err(|e| {
                        Error::AttributeCompilation {
                            object_type: object_type.to_string(),
                            attribute: definition.name.clone(),
                            source: Box::new(e),
                        }
                    })?;
            }
        }

        Ok(normalized)
    }
}

/// Attach resolvers registered outside the definition table.
///
/// Resolvers for undeclared attributes add a new definition at the end.
pub fn attach_resolvers(
    definitions: &mut Vec<NormalizedDefinition>,
    resolvers: &ResolverRegistry,
    object_type: &str,
) -> Result<()> {
    for (name, resolver) in resolvers.iter() {
        match definitions.iter_mut().find(|d| d.name == name) {
            Some(definition) => {
                if definition.config.resolver.is_some() || definition.config.get("resolver").is_some()
                {
                    return Err(Error::AttributeCompilation {
                        object_type: object_type.to_string(),
                        attribute: name.to_string(),
                        source: Box::new(Error::config(
                            "resolver declared both in the definition and the resolver registry",
                        )),
                    });
                }
                definition.config.resolver = Some(Arc::clone(resolver));
            }
            None => definitions.push(NormalizedDefinition {
                name: name.to_string(),
                declared_type: None,
                config: AttributeConfig::new().with_resolver(Arc::clone(resolver)),
            }),
        }
    }
    Ok(())
}

fn split_key(key: &str) -> Result<(String, Option<String>)> {
    let (name, type_name) = match key.split_once(':') {
        Some((name, type_name)) => {
            let type_name = type_name.trim();
            if type_name.is_empty() {
                return Err(Error::config(format!("missing type in '{key}'")));
            }
            (name.trim(), Some(type_name.to_string()))
        }
        None => (key.trim(), None),
    };
    if name.is_empty() {
        return Err(Error::config(format!("missing attribute name in '{key}'")));
    }
    Ok((name.to_string(), type_name))
}

fn into_config(definition: Definition) -> Result<(Option<String>, AttributeConfig)> {
    match definition {
        Definition::Scalar(type_name) if type_name.trim().is_empty() => {
            Ok((None, AttributeConfig::new()))
        }
        Definition::Scalar(type_name) => Ok((Some(type_name.trim().to_string()), AttributeConfig::new())),
        Definition::Config(mut config) => {
            config.values = fold_dotted(std::mem::take(&mut config.values))?;
            Ok((None, config))
        }
        Definition::ResolverRef(resolver) => Ok((None, AttributeConfig::new().with_resolver(resolver))),
    }
}

fn merge_types(current: Option<String>, incoming: Option<String>) -> Result<Option<String>> {
    match (current, incoming) {
        (Some(a), Some(b)) if a != b => Err(Error::config(format!(
            "conflicting types '{a}' and '{b}'"
        ))),
        (Some(a), _) => Ok(Some(a)),
        (None, b) => Ok(b),
    }
}

/// Fold `a.b.c` keys into nested maps.
fn fold_dotted(values: RawMap) -> Result<RawMap> {
    let mut folded = RawMap::new();
    let mut dotted = Vec::new();

    for (key, value) in values {
        if key.contains('.') {
            dotted.push((key, value));
        } else {
            folded.insert(key, value);
        }
    }

    for (key, value) in dotted {
        let mut path = key.split('.').peekable();
        let mut target = &mut folded;
        while let Some(segment) = path.next() {
            if segment.is_empty() {
                return Err(Error::config(format!("invalid definition key '{key}'")));
            }
            if path.peek().is_none() {
                target.insert(segment.to_string(), value);
                break;
            }
            let slot = target
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(RawMap::new()));
            if let Value::String(type_name) = slot {
                // `transform: "datetime"` next to `transform.format`
                let mut promoted = RawMap::new();
                promoted.insert("type".to_string(), Value::String(std::mem::take(type_name)));
                *slot = Value::Object(promoted);
            }
            target = match slot {
                Value::Object(map) => map,
                other => {
                    return Err(Error::config(format!(
                        "cannot nest '{key}' under a {} value",
                        json_kind(other)
                    )))
                }
            };
        }
    }

    Ok(folded)
}
