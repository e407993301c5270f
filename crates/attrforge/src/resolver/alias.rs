use super::{AttributeResolver, Binding};
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::value::AttrValue;

/// Resolves to another value reachable from the owner.
///
/// The expression is a dotted path: `"title"` copies a sibling attribute,
/// `"author.name"` reads `name` from the nested `author` object. A missing
/// segment resolves to null. Only stored values are visible; the path does
/// not trigger other resolvers.
#[derive(Debug)]
pub struct AliasResolver {
    path: Vec<String>,
    cacheable: bool,
    binding: Binding,
}

impl AliasResolver {
    pub fn new(expression: &str) -> Result<Self> {
        let path: Vec<String> = expression.split('.').map(str::trim).map(String::from).collect();
        if path.iter().any(String::is_empty) {
            return Err(Error::config(format!(
                "invalid alias expression '{expression}'"
            )));
        }
        Ok(Self {
            path,
            cacheable: true,
            binding: Binding::new(),
        })
    }

    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    pub fn expression(&self) -> String {
        self.path.join(".")
    }
}

impl AttributeResolver for AliasResolver {
    fn resolve(&self, owner: &Entity) -> Result<AttrValue> {
        let Some((head, rest)) = self.path.split_first() else {
            return Ok(AttrValue::Null);
        };
        let mut current = owner.value(head).cloned().unwrap_or_default();
        for segment in rest {
            current = current.get(segment).unwrap_or_default();
        }
        Ok(current)
    }

    fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn copies_a_sibling() {
        let resolver = AliasResolver::new("title").unwrap();
        let owner = Entity::from_values("Article", [("title", AttrValue::from("X"))]);
        assert_eq!(resolver.resolve(&owner).unwrap(), AttrValue::from("X"));
    }

    #[test]
    fn walks_nested_objects() {
        let author = Entity::from_values("Author", [("name", AttrValue::from("Ada"))]);
        let owner = Entity::from_values("Article", [("author", AttrValue::from(author))]);

        let resolver = AliasResolver::new("author.name").unwrap();
        assert_eq!(resolver.resolve(&owner).unwrap(), AttrValue::from("Ada"));
    }

    #[test]
    fn walks_json_values() {
        let owner = Entity::from_values(
            "Article",
            [("meta", AttrValue::Json(json!({"seo": {"slug": "hello"}})))],
        );
        let resolver = AliasResolver::new("meta.seo.slug").unwrap();
        assert_eq!(resolver.resolve(&owner).unwrap(), AttrValue::from("hello"));
    }

    #[test]
    fn missing_segments_are_null() {
        let owner = Entity::new("Article");
        let resolver = AliasResolver::new("author.name").unwrap();
        assert_eq!(resolver.resolve(&owner).unwrap(), AttrValue::Null);
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(AliasResolver::new("author..name").is_err());
        assert!(AliasResolver::new("").is_err());
    }
}
