use super::{AliasResolver, AttributeResolver, CallableResolver};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::AttrValue;
use std::sync::Arc;

/// Resolvers declared by an object type, keyed by attribute name.
///
/// Returned from [`crate::ObjectSchema::resolvers`]. Registration order is
/// kept; a resolver-only attribute (one with no definition) is compiled in that
/// order after the declared attributes.
#[derive(Debug, Default, Clone)]
pub struct ResolverRegistry {
    entries: Vec<(String, Arc<dyn AttributeResolver>)>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for `attribute`.
    ///
    /// Registering the same attribute twice is a configuration error.
    pub fn add(
        mut self,
        attribute: impl Into<String>,
        resolver: Arc<dyn AttributeResolver>,
    ) -> Result<Self> {
        let attribute = attribute.into();
        if self.get(&attribute).is_some() {
            return Err(Error::config(format!(
                "resolver for '{attribute}' registered twice"
            )));
        }
        self.entries.push((attribute, resolver));
        Ok(self)
    }

    /// Register a closure resolver.
    pub fn callable<F>(self, attribute: impl Into<String>, func: F) -> Result<Self>
    where
        F: Fn(&Entity) -> Result<AttrValue> + Send + Sync + 'static,
    {
        self.add(attribute, Arc::new(CallableResolver::new(func)))
    }

    /// Register an alias of another (dotted) attribute path.
    pub fn alias(self, attribute: impl Into<String>, expression: &str) -> Result<Self> {
        let resolver = AliasResolver::new(expression)?;
        self.add(attribute, Arc::new(resolver))
    }

    pub fn get(&self, attribute: &str) -> Option<&Arc<dyn AttributeResolver>> {
        self.entries
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn AttributeResolver>)> {
        self.entries.iter().map(|(name, r)| (name.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
