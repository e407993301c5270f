use super::{AttributeResolver, Binding};
use crate::entity::Entity;
use crate::error::Result;
use crate::value::AttrValue;
use std::fmt;

type ResolveFn = dyn Fn(&Entity) -> Result<AttrValue> + Send + Sync;

/// Resolves through a bound closure.
pub struct CallableResolver {
    func: Box<ResolveFn>,
    cacheable: bool,
    binding: Binding,
}

impl CallableResolver {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Entity) -> Result<AttrValue> + Send + Sync + 'static,
    {
        Self {
            func: Box::new(func),
            cacheable: true,
            binding: Binding::new(),
        }
    }

    /// Recompute on every read instead of caching the first result.
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

impl AttributeResolver for CallableResolver {
    fn resolve(&self, owner: &Entity) -> Result<AttrValue> {
        (self.func)(owner)
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl fmt::Debug for CallableResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableResolver")
            .field("cacheable", &self.cacheable)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
