//! # Attribute Resolvers
//!
//! A resolver computes an attribute's value on demand instead of reading it from
//! raw input. Resolvers are bound to exactly one `(object type, attribute)` pair
//! while the attribute table is compiled.
//!
//! ## Variants
//!
//! | Resolver | Single | Batch |
//! |----------|--------|-------|
//! | [`AliasResolver`] | reads a dotted path on the owner | per-object fallback |
//! | [`CallableResolver`] | calls a bound closure | per-object fallback |
//! | [`AssociationResolver`] | `find_by` / `get_where` on a lookup | one `get_where_in` for the whole batch |
//! | [`DelegateResolver`] | single closure | batch closure |
//!
//! ## Batching
//!
//! [`AttributeResolver::resolve_many`] takes a slice of owners and returns one
//! value per owner, in the same order. Resolvers without a real batch strategy
//! inherit the default, which calls [`AttributeResolver::resolve`] once per
//! owner, so batch and single resolution always agree. [`resolve_keyed`] carries
//! caller keys through a batch.
//!
//! ## Caching
//!
//! Resolved values are written back into the entity's store by the data type
//! unless the resolver reports itself as non-cacheable, in which case every read
//! recomputes.

mod alias;
mod association;
mod callable;
mod delegate;
mod registry;

pub use alias::AliasResolver;
pub use association::AssociationResolver;
pub use callable::CallableResolver;
pub use delegate::DelegateResolver;
pub use registry::ResolverRegistry;

use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::AttrValue;
use once_cell::sync::OnceCell;
use std::fmt;

/// Cardinality of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationKind {
    /// Has one: resolves to a single nested object.
    One,
    /// Has many: resolves to a collection of objects.
    Many,
}

/// Describes what an association resolver produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub kind: AssociationKind,
    /// Data type of the associated objects.
    pub class: String,
}

impl Association {
    /// The transformer type values of this association are handled with.
    pub fn transform_type(&self) -> &'static str {
        match self.kind {
            AssociationKind::One => "object",
            AssociationKind::Many => "objectCollection",
        }
    }
}

/// The `(object type, attribute)` pair a resolver serves.
///
/// Set once. Binding again to the same pair is a no-op; binding to a
/// different pair is a configuration error.
#[derive(Default)]
pub struct Binding {
    cell: OnceCell<(String, String)>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, object_type: &str, attribute: &str) -> Result<()> {
        let bound = self
            .cell
            .get_or_init(|| (object_type.to_string(), attribute.to_string()));
        if bound.0 == object_type && bound.1 == attribute {
            Ok(())
        } else {
            Err(Error::config(format!(
                "resolver already bound to '{}.{}', cannot rebind to '{}.{}'",
                bound.0, bound.1, object_type, attribute
            )))
        }
    }

    pub fn object_type(&self) -> Option<&str> {
        self.cell.get().map(|(t, _)| t.as_str())
    }

    pub fn attribute(&self) -> Option<&str> {
        self.cell.get().map(|(_, a)| a.as_str())
    }

    pub fn is_bound(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some((t, a)) => write!(f, "Binding({t}.{a})"),
            None => f.write_str("Binding(unbound)"),
        }
    }
}

/// Deferred computation of one attribute's value.
pub trait AttributeResolver: Send + Sync + fmt::Debug {
    /// Compute the value for a single owner.
    fn resolve(&self, owner: &Entity) -> Result<AttrValue>;

    /// Compute values for many owners, one per owner, in input order.
    fn resolve_many(&self, owners: &[&Entity]) -> Result<Vec<AttrValue>> {
        owners.iter().map(|owner| self.resolve(owner)).collect()
    }

    /// Whether resolved values may be written back into the owner.
    fn is_cacheable(&self) -> bool {
        true
    }

    /// Set when the resolver produces associated objects.
    fn association(&self) -> Option<Association> {
        None
    }

    fn binding(&self) -> &Binding;

    fn bind(&self, object_type: &str, attribute: &str) -> Result<()> {
        self.binding().bind(object_type, attribute)
    }
}

/// Resolve a keyed batch, pairing every value with the caller's key.
///
/// Fails if the resolver does not return exactly one value per owner.
pub fn resolve_keyed<K: Clone>(
    resolver: &dyn AttributeResolver,
    owners: &[(K, &Entity)],
) -> Result<Vec<(K, AttrValue)>> {
    let entities: Vec<&Entity> = owners.iter().map(|(_, e)| *e).collect();
    let values = resolver.resolve_many(&entities)?;
    if values.len() != owners.len() {
        return Err(Error::Lookup(format!(
            "resolver returned {} values for {} objects",
            values.len(),
            owners.len()
        )));
    }
    Ok(owners
        .iter()
        .map(|(key, _)| key.clone())
        .zip(values)
        .collect())
}
