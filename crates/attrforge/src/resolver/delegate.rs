use super::{AttributeResolver, Binding};
use crate::entity::Entity;
use crate::error::Result;
use crate::value::AttrValue;
use std::fmt;

type SingleFn = dyn Fn(&Entity) -> Result<AttrValue> + Send + Sync;
type BatchFn = dyn Fn(&[&Entity]) -> Result<Vec<AttrValue>> + Send + Sync;

/// Composes an independent single-value and batch implementation.
///
/// `resolve` goes to the single closure, `resolve_many` to the batch closure.
/// The two are expected to agree; nothing here can check that.
pub struct DelegateResolver {
    single: Box<SingleFn>,
    batch: Box<BatchFn>,
    cacheable: bool,
    binding: Binding,
}

impl DelegateResolver {
    pub fn new<S, B>(single: S, batch: B) -> Self
    where
        S: Fn(&Entity) -> Result<AttrValue> + Send + Sync + 'static,
        B: Fn(&[&Entity]) -> Result<Vec<AttrValue>> + Send + Sync + 'static,
    {
        Self {
            single: Box::new(single),
            batch: Box::new(batch),
            cacheable: true,
            binding: Binding::new(),
        }
    }

    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }
}

impl AttributeResolver for DelegateResolver {
    fn resolve(&self, owner: &Entity) -> Result<AttrValue> {
        (self.single)(owner)
    }

    fn resolve_many(&self, owners: &[&Entity]) -> Result<Vec<AttrValue>> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        (self.batch)(owners)
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl fmt::Debug for DelegateResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateResolver")
            .field("cacheable", &self.cacheable)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn doubled(owner: &Entity) -> AttrValue {
        owner
            .value("n")
            .and_then(AttrValue::as_i64)
            .map(|n| AttrValue::Int(n * 2))
            .unwrap_or_default()
    }

    #[test]
    fn dispatches_to_matching_implementation() {
        let batches = Arc::new(AtomicUsize::new(0));
        let seen = batches.clone();
        let resolver = DelegateResolver::new(
            |owner: &Entity| Ok(doubled(owner)),
            move |owners: &[&Entity]| {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(owners.iter().map(|o| doubled(o)).collect())
            },
        );

        let a = Entity::from_values("T", [("n", AttrValue::Int(2))]);
        let b = Entity::from_values("T", [("n", AttrValue::Int(5))]);

        assert_eq!(resolver.resolve(&a).unwrap(), AttrValue::Int(4));
        assert_eq!(batches.load(Ordering::SeqCst), 0);

        let values = resolver.resolve_many(&[&a, &b]).unwrap();
        assert_eq!(values, vec![AttrValue::Int(4), AttrValue::Int(10)]);
        assert_eq!(batches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_batch_skips_the_closure() {
        let resolver = DelegateResolver::new(
            |_: &Entity| Ok(AttrValue::Null),
            |_: &[&Entity]| panic!("batch closure must not run"),
        );
        assert!(resolver.resolve_many(&[]).unwrap().is_empty());
    }
}
