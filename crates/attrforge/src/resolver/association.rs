use super::{Association, AssociationKind, AttributeResolver, Binding};
use crate::entity::Entity;
use crate::error::Result;
use crate::store::ObjectLookup;
use crate::value::AttrValue;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Resolves associated objects through an [`ObjectLookup`].
///
/// An owner is associated with every target object whose `foreign` attribute
/// equals the owner's `local` attribute. Has-one returns the first match (or
/// null), has-many returns all matches. A batch issues a single
/// [`ObjectLookup::get_where_in`] for all owners and distributes the results.
pub struct AssociationResolver {
    association: Association,
    foreign: String,
    local: String,
    lookup: Arc<dyn ObjectLookup>,
    binding: Binding,
}

impl AssociationResolver {
    /// `owner.local == target.foreign`, at most one target.
    pub fn has_one(
        class: impl Into<String>,
        foreign: impl Into<String>,
        local: impl Into<String>,
        lookup: Arc<dyn ObjectLookup>,
    ) -> Self {
        Self::new(AssociationKind::One, class, foreign, local, lookup)
    }

    /// `owner.local == target.foreign`, any number of targets.
    pub fn has_many(
        class: impl Into<String>,
        foreign: impl Into<String>,
        local: impl Into<String>,
        lookup: Arc<dyn ObjectLookup>,
    ) -> Self {
        Self::new(AssociationKind::Many, class, foreign, local, lookup)
    }

    fn new(
        kind: AssociationKind,
        class: impl Into<String>,
        foreign: impl Into<String>,
        local: impl Into<String>,
        lookup: Arc<dyn ObjectLookup>,
    ) -> Self {
        Self {
            association: Association {
                kind,
                class: class.into(),
            },
            foreign: foreign.into(),
            local: local.into(),
            lookup,
            binding: Binding::new(),
        }
    }

    fn local_value(&self, owner: &Entity) -> Option<AttrValue> {
        owner.value(&self.local).filter(|v| !v.is_null()).cloned()
    }

    fn empty(&self) -> AttrValue {
        match self.association.kind {
            AssociationKind::One => AttrValue::Null,
            AssociationKind::Many => AttrValue::Collection(Vec::new()),
        }
    }

    fn collect(&self, key: &AttrValue, candidates: &[Entity]) -> AttrValue {
        let mut matching = candidates.iter().filter(|candidate| {
            candidate
                .value(&self.foreign)
                .is_some_and(|v| v.matches_key(key))
        });
        match self.association.kind {
            AssociationKind::One => matching
                .next()
                .cloned()
                .map_or(AttrValue::Null, AttrValue::from),
            AssociationKind::Many => AttrValue::Collection(matching.cloned().collect()),
        }
    }
}

impl AttributeResolver for AssociationResolver {
    fn resolve(&self, owner: &Entity) -> Result<AttrValue> {
        let Some(key) = self.local_value(owner) else {
            return Ok(self.empty());
        };
        match self.association.kind {
            AssociationKind::One => Ok(self
                .lookup
                .find_by(&self.foreign, &key)?
                .map_or(AttrValue::Null, AttrValue::from)),
            AssociationKind::Many => Ok(AttrValue::Collection(
                self.lookup.get_where(&self.foreign, &key)?,
            )),
        }
    }

    fn resolve_many(&self, owners: &[&Entity]) -> Result<Vec<AttrValue>> {
        let keys: Vec<Option<AttrValue>> = owners.iter().map(|o| self.local_value(o)).collect();

        let mut distinct: Vec<AttrValue> = Vec::new();
        for key in keys.iter().flatten() {
            if !distinct.iter().any(|k| k.matches_key(key)) {
                distinct.push(key.clone());
            }
        }
        if distinct.is_empty() {
            return Ok(keys.iter().map(|_| self.empty()).collect());
        }

        trace!(
            class = %self.association.class,
            foreign = %self.foreign,
            keys = distinct.len(),
            "batch association lookup"
        );
        let candidates = self.lookup.get_where_in(&self.foreign, &distinct)?;

        Ok(keys
            .iter()
            .map(|key| match key {
                Some(key) => self.collect(key, &candidates),
                None => self.empty(),
            })
            .collect())
    }

    fn association(&self) -> Option<Association> {
        Some(self.association.clone())
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }
}

impl fmt::Debug for AssociationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationResolver")
            .field("association", &self.association)
            .field("foreign", &self.foreign)
            .field("local", &self.local)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use serde_json::json;

    fn store_with_comments() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (article, body) in [(1, "first"), (2, "second"), (1, "third")] {
            let row = json!({"articleId": article, "body": body});
            store.create("Comment", row.as_object().unwrap()).unwrap();
        }
        store
            .create("Author", json!({"id": 7, "name": "Ada"}).as_object().unwrap())
            .unwrap();
        store
    }

    fn article(id: i64, author: Option<i64>) -> Entity {
        let mut values = vec![("id", AttrValue::Int(id))];
        if let Some(author) = author {
            values.push(("authorId", AttrValue::Int(author)));
        }
        Entity::from_values("Article", values)
    }

    fn bodies(value: &AttrValue) -> Vec<String> {
        value
            .as_collection()
            .unwrap()
            .iter()
            .map(|c| c.value("body").unwrap().as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn has_one_finds_by_foreign_key() {
        let store = store_with_comments();
        let resolver = AssociationResolver::has_one("Author", "id", "authorId", store.lookup("Author"));

        let value = resolver.resolve(&article(1, Some(7))).unwrap();
        assert_eq!(value.get("name"), Some(AttrValue::from("Ada")));

        assert_eq!(resolver.resolve(&article(1, None)).unwrap(), AttrValue::Null);
        assert_eq!(resolver.resolve(&article(1, Some(99))).unwrap(), AttrValue::Null);
        assert_eq!(resolver.association().unwrap().kind, AssociationKind::One);
    }

    #[test]
    fn has_many_collects_matches() {
        let store = store_with_comments();
        let resolver =
            AssociationResolver::has_many("Comment", "articleId", "id", store.lookup("Comment"));

        let value = resolver.resolve(&article(1, None)).unwrap();
        assert_eq!(bodies(&value), vec!["first", "third"]);
    }

    #[test]
    fn batch_equals_single_resolution() {
        let store = store_with_comments();
        let resolver =
            AssociationResolver::has_many("Comment", "articleId", "id", store.lookup("Comment"));

        let owners = [article(2, None), article(1, None), article(3, None)];
        let refs: Vec<&Entity> = owners.iter().collect();

        let batch = resolver.resolve_many(&refs).unwrap();
        let single: Vec<AttrValue> = refs.iter().map(|o| resolver.resolve(o).unwrap()).collect();

        assert_eq!(batch, single);
        assert_eq!(bodies(&batch[0]), vec!["second"]);
        assert!(bodies(&batch[2]).is_empty());
    }

    #[test]
    fn batch_without_keys_skips_lookup() {
        let store = store_with_comments();
        let resolver = AssociationResolver::has_one("Author", "id", "authorId", store.lookup("Author"));

        let owners = [article(1, None), article(2, None)];
        let refs: Vec<&Entity> = owners.iter().collect();
        assert_eq!(
            resolver.resolve_many(&refs).unwrap(),
            vec![AttrValue::Null, AttrValue::Null]
        );
    }
}
