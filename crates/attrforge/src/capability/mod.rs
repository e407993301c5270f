//! # Capabilities
//!
//! Typed, read-only views over a data type's compiled attributes. Each
//! property type may contribute one capability when the descriptor is built;
//! stages, the data type facade, and external layers (validators, transport)
//! query them instead of walking raw properties.
//!
//! | Capability | Contributed by | Answers |
//! |------------|----------------|---------|
//! | [`AccessCapability`] | `access` | readable / writable / visible |
//! | [`MapCapability`] | `map` | external ↔ internal key names |
//! | [`DefaultsCapability`] | `default` | default raw values |
//! | [`ResolverCapability`] | `resolver` | resolver lookup, auto-resolve, batching |
//! | [`TransformCapability`] | `transform` | the data type's [`Transformer`](crate::transform::Transformer) |
//! | [`RulesCapability`] | `rules` | validation rules, labels, messages |
//!
//! A missing capability is never an error for readers: [`CapabilityKind::empty`]
//! supplies a no-op value (nothing mapped, nothing resolved, everything
//! writable).

mod access;
mod defaults;
mod map;
mod resolver;
mod rules;
mod transform;

pub use access::AccessCapability;
pub use defaults::DefaultsCapability;
pub use map::MapCapability;
pub use resolver::ResolverCapability;
pub use rules::{AttributeRules, RulesCapability};
pub use transform::TransformCapability;

use crate::attribute::AttributeMap;
use crate::config::EngineConfig;
use crate::transform::TransformerRegistry;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// What a property type sees when it builds its capability.
#[derive(Clone, Copy)]
pub struct CapabilityScope<'a> {
    pub data_type: &'a str,
    pub attributes: &'a AttributeMap,
    pub transformers: &'a Arc<TransformerRegistry>,
    pub config: &'a EngineConfig,
}

impl fmt::Debug for CapabilityScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityScope")
            .field("data_type", &self.data_type)
            .field("attributes", &self.attributes.names())
            .finish()
    }
}

/// A capability contributed by one property type.
#[derive(Clone)]
pub enum Capability {
    Access(AccessCapability),
    Map(MapCapability),
    Defaults(DefaultsCapability),
    Resolver(ResolverCapability),
    Transform(TransformCapability),
    Rules(RulesCapability),
    /// Capability of a custom property type.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Capability {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Capability::Custom(Arc::new(value))
    }

    /// Downcast a custom capability.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Capability::Custom(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Access(c) => c.fmt(f),
            Capability::Map(c) => c.fmt(f),
            Capability::Defaults(c) => c.fmt(f),
            Capability::Resolver(c) => c.fmt(f),
            Capability::Transform(c) => c.fmt(f),
            Capability::Rules(c) => c.fmt(f),
            Capability::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A built-in capability type, addressable by type.
pub trait CapabilityKind: Sized + 'static {
    /// Name of the property type that contributes it.
    const NAME: &'static str;

    fn from_capability(capability: &Capability) -> Option<&Self>;

    /// The no-op value used when the capability is absent.
    fn empty() -> &'static Self;
}

macro_rules! capability_kind {
    ($ty:ident, $variant:ident, $name:literal) => {
        impl CapabilityKind for $ty {
            const NAME: &'static str = $name;

            fn from_capability(capability: &Capability) -> Option<&Self> {
                match capability {
                    Capability::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn empty() -> &'static Self {
                static EMPTY: once_cell::sync::Lazy<$ty> = once_cell::sync::Lazy::new($ty::default);
                &EMPTY
            }
        }

        impl From<$ty> for Capability {
            fn from(capability: $ty) -> Self {
                Capability::$variant(capability)
            }
        }
    };
}

capability_kind!(AccessCapability, Access, "access");
capability_kind!(MapCapability, Map, "map");
capability_kind!(DefaultsCapability, Defaults, "default");
capability_kind!(ResolverCapability, Resolver, "resolver");
capability_kind!(TransformCapability, Transform, "transform");
capability_kind!(RulesCapability, Rules, "rules");
