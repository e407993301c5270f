//! # Value Transformation
//!
//! Transformers convert between raw values and domain values, one attribute at
//! a time:
//!
//! - **build**: raw → [`AttrValue`] (hydration direction)
//! - **smash**: [`AttrValue`] → raw (extraction direction)
//!
//! ## Layers
//!
//! ```text
//! TransformerRegistry   type name → constructor, plus aliases ("pk" → "databaseKey")
//!         │ create(type, options)
//!         ▼
//! ValueTransformer      one configured converter (e.g. datetime with format "Y-m-d")
//!         ▲ resolved lazily, cached per attribute
//!         │
//! Transformer           per data type: attribute name → spec → converter
//! ```
//!
//! An unknown type name is only reported when an attribute using it is first
//! built or smashed, not when the registry is assembled.
//!
//! ## Nulls
//!
//! Null handling is shared: a null raw value builds to [`AttrValue::Null`]
//! unless the attribute's options say `nullable: false`, and a null domain
//! value always smashes to JSON null. Individual transformers never see nulls.

mod object;
mod options;
mod registry;
mod scalar;
mod temporal;

pub use object::{CollectionTransformer, ObjectTransformer};
pub use options::Options;
pub use registry::{Constructor, TransformerRegistry};
pub use scalar::{
    BoolTransformer, DatabaseKeyTransformer, EnumTransformer, FloatTransformer, IntTransformer,
    JsonTransformer, MixedTransformer, StringTransformer, UuidTransformer,
};
pub use temporal::{
    to_strftime, DateTimeTransformer, DateTransformer, TimestampTransformer,
};

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::{AttrValue, RawMap};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why a single value could not be converted.
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: String,
    },

    #[error("cannot parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("null is not allowed")]
    NullNotAllowed,

    #[error("'{0}' is not one of the allowed values")]
    NotAllowed(String),

    #[error("nested object: {0}")]
    Nested(#[source] Box<Error>),
}

impl ValueError {
    pub(crate) fn mismatch(expected: &'static str, found: impl Into<String>) -> Self {
        ValueError::Mismatch {
            expected,
            found: found.into(),
        }
    }

    pub(crate) fn parse(input: impl Into<String>, reason: impl fmt::Display) -> Self {
        ValueError::Parse {
            input: input.into(),
            reason: reason.to_string(),
        }
    }
}

/// Hydrates and extracts nested objects by data type name.
///
/// Implemented by the registry's type catalog so `object` attributes can run
/// the nested type's own pipeline.
pub trait NestedTypes {
    fn hydrate_nested(&self, class: &str, raw: RawMap) -> Result<Entity>;
    fn extract_nested(&self, class: &str, entity: &Entity) -> Result<RawMap>;
}

/// Per-call context handed to value transformers.
#[derive(Clone, Copy, Default)]
pub struct TransformCx<'a> {
    nested: Option<&'a dyn NestedTypes>,
}

impl<'a> TransformCx<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nested(nested: &'a dyn NestedTypes) -> Self {
        Self {
            nested: Some(nested),
        }
    }

    pub fn nested(&self) -> Option<&'a dyn NestedTypes> {
        self.nested
    }
}

impl fmt::Debug for TransformCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformCx")
            .field("nested", &self.nested.is_some())
            .finish()
    }
}

/// A configured converter for one type.
pub trait ValueTransformer: Send + Sync + fmt::Debug {
    /// Raw → domain. Never called with null.
    fn build(&self, raw: &Value, cx: &TransformCx<'_>) -> std::result::Result<AttrValue, ValueError>;

    /// Domain → raw. Never called with [`AttrValue::Null`].
    fn smash(&self, value: &AttrValue, cx: &TransformCx<'_>) -> std::result::Result<Value, ValueError>;

    /// Primitive hint for the raw side (`"int"`, `"string"`, ...).
    fn scalar_type(&self) -> &'static str;
}

/// Transformer type and options for one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    pub type_name: String,
    pub options: Options,
}

impl TransformSpec {
    pub fn new(type_name: impl Into<String>, options: Options) -> Self {
        Self {
            type_name: type_name.into(),
            options,
        }
    }
}

/// Per-call behaviour switches of a [`Transformer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformFlags {
    /// Keep keys that are not declared attributes, untouched.
    pub skip_non_attributes: bool,
    /// Leave nested objects as they are instead of running their extraction.
    pub skip_object_smashing: bool,
}

struct Slot {
    spec: TransformSpec,
    resolved: OnceCell<Arc<dyn ValueTransformer>>,
}

struct Inner {
    data_type: String,
    registry: Arc<TransformerRegistry>,
    slots: BTreeMap<String, Slot>,
}

/// The transformers of one data type.
///
/// Cloning is cheap and clones share the cache of resolved converters.
#[derive(Clone)]
pub struct Transformer {
    inner: Arc<Inner>,
    flags: TransformFlags,
}

impl Transformer {
    pub fn new<I>(data_type: impl Into<String>, registry: Arc<TransformerRegistry>, specs: I) -> Self
    where
        I: IntoIterator<Item = (String, TransformSpec)>,
    {
        let flags = TransformFlags {
            skip_non_attributes: registry.config().skip_non_attributes,
            skip_object_smashing: registry.config().skip_object_smashing,
        };
        let slots = specs
            .into_iter()
            .map(|(name, spec)| {
                (
                    name,
                    Slot {
                        spec,
                        resolved: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self {
            inner: Arc::new(Inner {
                data_type: data_type.into(),
                registry,
                slots,
            }),
            flags,
        }
    }

    /// A transformer with no attributes; everything passes through untyped.
    pub fn empty() -> Self {
        Self::new(
            "",
            Arc::new(TransformerRegistry::new(Default::default())),
            std::iter::empty(),
        )
    }

    /// Same converters and cache, different flags.
    pub fn with_flags(&self, flags: TransformFlags) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            flags,
        }
    }

    pub fn flags(&self) -> TransformFlags {
        self.flags
    }

    pub fn data_type(&self) -> &str {
        &self.inner.data_type
    }

    pub fn spec(&self, attribute: &str) -> Option<&TransformSpec> {
        self.inner.slots.get(attribute).map(|s| &s.spec)
    }

    pub fn has(&self, attribute: &str) -> bool {
        self.inner.slots.contains_key(attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.inner.slots.keys().map(String::as_str)
    }

    /// The converter for `attribute`, created on first use.
    ///
    /// `Ok(None)` for attributes without a transform spec; an error when the
    /// spec names an unregistered type.
    pub fn value_transformer(&self, attribute: &str) -> Result<Option<&Arc<dyn ValueTransformer>>> {
        let Some(slot) = self.inner.slots.get(attribute) else {
            return Ok(None);
        };
        slot.resolved
            .get_or_try_init(|| {
                debug!(
                    data_type = %self.inner.data_type,
                    attribute,
                    type_name = %slot.spec.type_name,
                    "resolving value transformer"
                );
                self.inner
                    .registry
                    .create(&slot.spec.type_name, &slot.spec.options)
            })
            .map(Some)
    }

    pub fn scalar_type(&self, attribute: &str) -> Result<Option<&'static str>> {
        Ok(self.value_transformer(attribute)?.map(|t| t.scalar_type()))
    }

    /// Whether `attribute` holds nested objects.
    pub fn is_object(&self, attribute: &str) -> bool {
        self.spec(attribute).is_some_and(|spec| {
            matches!(
                self.inner.registry.canonical(&spec.type_name),
                "object" | "objectCollection"
            )
        })
    }

    /// Build one raw value. Unknown attributes are converted without type
    /// information.
    pub fn build(&self, attribute: &str, raw: &Value, cx: &TransformCx<'_>) -> Result<AttrValue> {
        let Some(transformer) = self.value_transformer(attribute)? else {
            return Ok(AttrValue::from_json(raw.clone()));
        };
        let spec = &self.inner.slots[attribute].spec;
        if raw.is_null() {
            return if spec.options.is_nullable() {
                Ok(AttrValue::Null)
            } else {
                Err(self.error(attribute, ValueError::NullNotAllowed))
            };
        }
        transformer
            .build(raw, cx)
            .map_err(|source| self.error(attribute, source))
    }

    /// Smash one domain value. Unknown attributes are converted without type
    /// information.
    pub fn smash(&self, attribute: &str, value: &AttrValue, cx: &TransformCx<'_>) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        if self.flags.skip_object_smashing && value.is_rich() {
            return Ok(value.to_json());
        }
        let Some(transformer) = self.value_transformer(attribute)? else {
            return Ok(value.to_json());
        };
        transformer
            .smash(value, cx)
            .map_err(|source| self.error(attribute, source))
    }

    /// Build every key. Keys that are not attributes are kept untyped when
    /// `skip_non_attributes` is set and dropped otherwise.
    pub fn build_all(&self, data: RawMap, cx: &TransformCx<'_>) -> Result<BTreeMap<String, AttrValue>> {
        let mut built = BTreeMap::new();
        for (name, raw) in data {
            if self.has(&name) {
                let value = self.build(&name, &raw, cx)?;
                built.insert(name, value);
            } else if self.flags.skip_non_attributes {
                built.insert(name, AttrValue::from_json(raw));
            }
        }
        Ok(built)
    }

    /// Build only the keys that are attributes.
    pub fn build_only(&self, data: RawMap, cx: &TransformCx<'_>) -> Result<BTreeMap<String, AttrValue>> {
        let mut built = BTreeMap::new();
        for (name, raw) in data {
            if self.has(&name) {
                let value = self.build(&name, &raw, cx)?;
                built.insert(name, value);
            }
        }
        Ok(built)
    }

    /// Smash every key, with the same non-attribute rule as [`Self::build_all`].
    pub fn smash_all(&self, data: &BTreeMap<String, AttrValue>, cx: &TransformCx<'_>) -> Result<RawMap> {
        let mut smashed = RawMap::new();
        for (name, value) in data {
            if self.has(name) {
                smashed.insert(name.clone(), self.smash(name, value, cx)?);
            } else if self.flags.skip_non_attributes {
                smashed.insert(name.clone(), value.to_json());
            }
        }
        Ok(smashed)
    }

    /// Smash only the keys that are attributes.
    pub fn smash_only(&self, data: &BTreeMap<String, AttrValue>, cx: &TransformCx<'_>) -> Result<RawMap> {
        let mut smashed = RawMap::new();
        for (name, value) in data {
            if self.has(name) {
                smashed.insert(name.clone(), self.smash(name, value, cx)?);
            }
        }
        Ok(smashed)
    }

    fn error(&self, attribute: &str, source: ValueError) -> Error {
        let type_name = self
            .spec(attribute)
            .map(|s| s.type_name.clone())
            .unwrap_or_default();
        Error::Transformation {
            attribute: attribute.to_string(),
            type_name,
            source,
        }
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let specs: BTreeMap<&str, &str> = self
            .inner
            .slots
            .iter()
            .map(|(k, s)| (k.as_str(), s.spec.type_name.as_str()))
            .collect();
        f.debug_struct("Transformer")
            .field("data_type", &self.inner.data_type)
            .field("specs", &specs)
            .field("flags", &self.flags)
            .finish()
    }
}
