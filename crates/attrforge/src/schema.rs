//! Declarative object type descriptions.

use crate::definition::DefinitionTable;
use crate::error::Result;
use crate::resolver::ResolverRegistry;

/// Describes one object type: its attribute definitions and the resolvers it
/// provides. Register it with [`Registry::register`](crate::Registry::register).
///
/// Resolvers are listed explicitly; nothing is discovered by naming
/// convention.
pub trait ObjectSchema {
    fn name(&self) -> &str;

    fn definitions(&self) -> DefinitionTable;

    fn resolvers(&self) -> Result<ResolverRegistry> {
        Ok(ResolverRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::value::AttrValue;
    use serde_json::json;

    struct Person;

    impl ObjectSchema for Person {
        fn name(&self) -> &str {
            "Person"
        }

        fn definitions(&self) -> DefinitionTable {
            DefinitionTable::new()
                .shorthand("first:string")
                .shorthand("last:string")
        }

        fn resolvers(&self) -> Result<ResolverRegistry> {
            ResolverRegistry::new().callable("full", |owner| {
                let part = |name| owner.value(name).and_then(AttrValue::as_str).unwrap_or("");
                Ok(AttrValue::from(format!("{} {}", part("first"), part("last"))))
            })
        }
    }

    #[test]
    fn schemas_register_definitions_and_resolvers() {
        let registry = Registry::new();
        let person = registry.register(&Person).unwrap();
        assert_eq!(person.attribute_names(), ["first", "last", "full"]);

        let mut entity = person
            .hydrate(json!({"first": "Ada", "last": "Lovelace"}).as_object().unwrap().clone())
            .unwrap();
        assert_eq!(
            person.get(&mut entity, "full").unwrap(),
            AttrValue::from("Ada Lovelace")
        );
    }

    struct Empty;

    impl ObjectSchema for Empty {
        fn name(&self) -> &str {
            "Empty"
        }

        fn definitions(&self) -> DefinitionTable {
            DefinitionTable::new()
        }
    }

    #[test]
    fn resolvers_default_to_none() {
        assert!(Empty.resolvers().unwrap().is_empty());
    }
}
