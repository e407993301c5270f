use super::{PropertyInput, PropertyType};
use crate::capability::{Capability, CapabilityScope, ResolverCapability};
use crate::context::AttributesContext;
use crate::error::{Error, Result};
use crate::pipeline::{Middleware, Next};
use crate::property::{Overrides, Property, PropertySet, ResolverProperty};
use crate::resolver::{AliasResolver, AttributeResolver};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// `resolver`: binds a resolver to the attribute.
///
/// The resolver comes from the definition (a resolver object, or a string
/// naming a dotted alias path such as `"author.name"`) or from the data
/// type's resolver registry. `autoResolve` resolves while hydrating; `cache:
/// false` recomputes on every read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveProperty;

impl ResolveProperty {
    pub const NAME: &'static str = "resolver";
}

impl PropertyType for ResolveProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition_keys(&self) -> Option<&[&str]> {
        Some(&["resolver", "autoResolve", "cache"])
    }

    fn depends_on(&self) -> &[&str] {
        &["type"]
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        let declared: Option<Arc<dyn AttributeResolver>> = match input.get("resolver") {
            None | Some(Value::Null) => None,
            Some(Value::String(expression)) => Some(Arc::new(AliasResolver::new(expression)?)),
            Some(other) => {
                return Err(Error::config(format!(
                    "'resolver' must be an alias path, got {other}"
                )))
            }
        };
        let resolver = match (declared, input.resolver) {
            (Some(_), Some(_)) => {
                return Err(Error::config("attribute has two resolvers"));
            }
            (Some(resolver), None) => resolver,
            (None, Some(resolver)) => Arc::clone(resolver),
            (None, None) => {
                if input.get("autoResolve").is_some() || input.get("cache").is_some() {
                    return Err(Error::config("'autoResolve' and 'cache' require a resolver"));
                }
                return Ok(None);
            }
        };

        resolver.bind(input.object_type, input.attribute)?;
        debug!(
            object_type = input.object_type,
            attribute = input.attribute,
            "bound resolver"
        );

        let property = ResolverProperty::new(resolver)
            .auto_resolve(input.bool("autoResolve")?.unwrap_or(false))
            .cache(input.bool("cache")?.unwrap_or(true));
        Ok(Some(Property::Resolver(property)))
    }

    /// Associations decide how their values are transformed: has-one values
    /// are `object`, has-many values `objectCollection`, of the associated
    /// class. Other transform options are kept.
    fn modify_descriptor(
        &self,
        own: &Property,
        all: &BTreeMap<String, Property>,
    ) -> Option<Overrides> {
        let association = own.as_resolver()?.association()?;
        let mut transform = all
            .get("transform")
            .and_then(Property::as_set)
            .cloned()
            .unwrap_or_else(PropertySet::new);
        transform.insert("type", Value::from(association.transform_type()));
        transform.insert("class", Value::from(association.class.as_str()));
        Some(Overrides::new().set("transform", Property::Set(transform)))
    }

    fn middleware(&self) -> Option<Arc<dyn Middleware>> {
        Some(Arc::new(ResolverStage))
    }

    fn capability(&self, scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        Ok(Some(
            ResolverCapability::from_attributes(scope.data_type, scope.attributes, Self::NAME).into(),
        ))
    }
}

/// Drops raw input for attributes whose resolver caches: the resolver is the
/// source of truth. Input for non-caching resolvers is kept as a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverStage;

impl Middleware for ResolverStage {
    fn name(&self) -> &str {
        ResolveProperty::NAME
    }

    fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        let resolvers = cx.descriptor().capability::<ResolverCapability>();
        for name in resolvers.names() {
            if resolvers.is_cacheable(name) {
                cx.remove(name);
            }
        }
        next.run(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::resolver::{AssociationResolver, CallableResolver};
    use crate::store::MemoryStore;
    use crate::value::{AttrValue, RawMap};
    use serde_json::json;

    fn input<'a>(
        values: &'a RawMap,
        resolver: Option<&'a Arc<dyn AttributeResolver>>,
    ) -> PropertyInput<'a> {
        PropertyInput {
            object_type: "Article",
            attribute: "candy",
            declared_type: "string",
            values,
            resolver,
        }
    }

    fn callable() -> Arc<dyn AttributeResolver> {
        Arc::new(CallableResolver::new(|_: &Entity| Ok(AttrValue::from("sweet"))))
    }

    #[test]
    fn no_resolver_no_property() {
        let values = RawMap::new();
        assert_eq!(ResolveProperty.property_value(&input(&values, None)).unwrap(), None);
    }

    #[test]
    fn flags_without_resolver_are_rejected() {
        let values = json!({"autoResolve": true}).as_object().unwrap().clone();
        assert!(ResolveProperty.property_value(&input(&values, None)).is_err());
    }

    #[test]
    fn binds_attached_resolver_with_flags() {
        let resolver = callable();
        let values = json!({"autoResolve": true, "cache": false})
            .as_object()
            .unwrap()
            .clone();
        let property = ResolveProperty
            .property_value(&input(&values, Some(&resolver)))
            .unwrap()
            .unwrap();

        let bound = property.as_resolver().unwrap();
        assert!(bound.is_auto_resolved());
        assert!(!bound.is_cacheable());
        assert_eq!(resolver.binding().attribute(), Some("candy"));
    }

    #[test]
    fn string_resolvers_are_aliases() {
        let values = json!({"resolver": "author.name"}).as_object().unwrap().clone();
        let property = ResolveProperty
            .property_value(&input(&values, None))
            .unwrap()
            .unwrap();
        let owner = Entity::from_values(
            "Article",
            [(
                "author",
                AttrValue::from(Entity::from_values("Author", [("name", AttrValue::from("Ada"))])),
            )],
        );
        assert_eq!(
            property.as_resolver().unwrap().resolver().resolve(&owner).unwrap(),
            AttrValue::from("Ada")
        );
    }

    #[test]
    fn two_resolvers_conflict() {
        let resolver = callable();
        let values = json!({"resolver": "author.name"}).as_object().unwrap().clone();
        assert!(ResolveProperty
            .property_value(&input(&values, Some(&resolver)))
            .is_err());
    }

    #[test]
    fn associations_force_object_transforms() {
        let store = Arc::new(MemoryStore::new());
        let association: Arc<dyn AttributeResolver> = Arc::new(AssociationResolver::has_many(
            "Comment",
            "articleId",
            "id",
            store.lookup("Comment"),
        ));
        let own = Property::Resolver(ResolverProperty::new(association));
        let mut all = BTreeMap::new();
        all.insert(
            "transform".to_string(),
            Property::Set(
                PropertySet::new()
                    .with("type", json!("string"))
                    .with("nullable", json!(false)),
            ),
        );

        let overrides = ResolveProperty.modify_descriptor(&own, &all).unwrap();
        let entries = overrides.into_entries();
        assert_eq!(entries.len(), 1);
        let (name, transform) = &entries[0];
        assert_eq!(name, "transform");
        assert_eq!(transform.get("type").and_then(Property::as_str), Some("objectCollection"));
        assert_eq!(transform.get("class").and_then(Property::as_str), Some("Comment"));
        assert_eq!(transform.get("nullable").and_then(Property::as_bool), Some(false));

        let plain = Property::Resolver(ResolverProperty::new(callable()));
        assert!(ResolveProperty.modify_descriptor(&plain, &all).is_none());
    }
}
