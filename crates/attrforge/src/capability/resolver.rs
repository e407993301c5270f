use crate::attribute::AttributeMap;
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::property::ResolverProperty;
use crate::resolver::resolve_keyed;
use crate::value::AttrValue;
use tracing::trace;

/// Resolvers of a data type, keyed by attribute.
#[derive(Debug, Clone, Default)]
pub struct ResolverCapability {
    data_type: String,
    resolvers: Vec<(String, ResolverProperty)>,
}

impl ResolverCapability {
    pub fn from_attributes(data_type: &str, attributes: &AttributeMap, property_type: &str) -> Self {
        let resolvers = attributes
            .with_property(property_type)
            .filter_map(|(attribute, property)| {
                property
                    .as_resolver()
                    .map(|r| (attribute.name().to_string(), r.clone()))
            })
            .collect();
        Self {
            data_type: data_type.to_string(),
            resolvers,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResolverProperty> {
        self.resolvers
            .iter()
            .find(|(attribute, _)| attribute == name)
            .map(|(_, resolver)| resolver)
    }

    pub fn has_resolver(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Like [`Self::get`], but a missing resolver is an error.
    pub fn require(&self, name: &str) -> Result<&ResolverProperty> {
        self.get(name).ok_or_else(|| Error::ResolverNotFound {
            class: self.data_type.clone(),
            attribute: name.to_string(),
        })
    }

    /// Attributes with a resolver, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Attributes resolved during hydration.
    pub fn auto_resolved(&self) -> Vec<&str> {
        self.resolvers
            .iter()
            .filter(|(_, r)| r.is_auto_resolved())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn is_cacheable(&self, name: &str) -> bool {
        self.get(name).is_some_and(ResolverProperty::is_cacheable)
    }

    /// Run the resolver of `name` for one owner.
    pub fn resolve(&self, name: &str, owner: &Entity) -> Result<AttrValue> {
        let resolver = self.require(name)?;
        trace!(data_type = %self.data_type, attribute = name, "resolving attribute");
        resolver
            .resolver()
            .resolve(owner)
            .map_err(|source| self.failure(name, source))
    }

    /// Run the resolver of `name` for a batch, one value per owner in order.
    pub fn resolve_many(&self, name: &str, owners: &[&Entity]) -> Result<Vec<AttrValue>> {
        let resolver = self.require(name)?;
        trace!(
            data_type = %self.data_type,
            attribute = name,
            batch = owners.len(),
            "resolving attribute batch"
        );
        let keyed: Vec<(usize, &Entity)> = owners.iter().copied().enumerate().collect();
        let values = resolve_keyed(resolver.resolver().as_ref(), &keyed)
            .map_err(|source| self.failure(name, source))?;
        Ok(values.into_iter().map(|(_, value)| value).collect())
    }

    fn failure(&self, name: &str, source: Error) -> Error {
        Error::Resolution {
            class: self.data_type.clone(),
            attribute: name.to_string(),
            source: Box::new(source),
        }
    }
}
