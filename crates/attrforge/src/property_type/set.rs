use super::{claimed_keys, default_property_types, PropertyType};
use crate::error::{Error, Result};
use crate::pipeline::{Middleware, Pipeline};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Property types in dependency order.
#[derive(Debug, Clone)]
pub struct PropertyTypeSet {
    ordered: Vec<Arc<dyn PropertyType>>,
}

impl PropertyTypeSet {
    /// Order `types` by their dependencies.
    ///
    /// Duplicate names, unknown dependencies, duplicate key claims, and
    /// dependency cycles are configuration errors.
    pub fn new(types: Vec<Arc<dyn PropertyType>>) -> Result<Self> {
        let mut names = BTreeSet::new();
        for property_type in &types {
            if !names.insert(property_type.name().to_string()) {
                return Err(Error::config(format!(
                    "property type '{}' is registered twice",
                    property_type.name()
                )));
            }
        }

        let mut claims: BTreeMap<String, String> = BTreeMap::new();
        for property_type in &types {
            for key in claimed_keys(property_type.as_ref()) {
                if let Some(owner) = claims.insert(key.clone(), property_type.name().to_string()) {
                    return Err(Error::config(format!(
                        "definition key '{key}' is claimed by both '{owner}' and '{}'",
                        property_type.name()
                    )));
                }
            }
        }

        for property_type in &types {
            for dependency in property_type.depends_on() {
                if !names.contains(*dependency) {
                    return Err(Error::config(format!(
                        "property type '{}' depends on unknown property type '{dependency}'",
                        property_type.name()
                    )));
                }
            }
        }

        let ordered = topological_order(types)?;
        debug!(
            order = ?ordered.iter().map(|t| t.name()).collect::<Vec<_>>(),
            "ordered property types"
        );
        Ok(Self { ordered })
    }

    /// The default property types.
    pub fn defaults() -> Self {
        // Already in dependency order.
        Self {
            ordered: default_property_types(),
        }
    }

    /// A new set with `property_type` added.
    pub fn with(&self, property_type: Arc<dyn PropertyType>) -> Result<Self> {
        let mut types = self.ordered.clone();
        types.push(property_type);
        Self::new(types)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PropertyType>> {
        self.ordered.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PropertyType>> {
        self.ordered.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|t| t.name()).collect()
    }

    /// Every definition key some property type claims.
    pub fn claimed_keys(&self) -> BTreeSet<String> {
        self.ordered
            .iter()
            .flat_map(|t| claimed_keys(t.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// The pipeline made of every stage, in order.
    pub fn pipeline(&self) -> Pipeline {
        let stages: Vec<Arc<dyn Middleware>> =
            self.ordered.iter().filter_map(|t| t.middleware()).collect();
        Pipeline::new(stages)
    }
}

impl Default for PropertyTypeSet {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Kahn's algorithm, always taking the earliest registered ready type.
fn topological_order(types: Vec<Arc<dyn PropertyType>>) -> Result<Vec<Arc<dyn PropertyType>>> {
    let mut pending: Vec<Option<Arc<dyn PropertyType>>> = types.into_iter().map(Some).collect();
    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while ordered.len() < pending.len() {
        let ready = pending.iter().position(|slot| {
            slot.as_ref().is_some_and(|t| {
                t.depends_on()
                    .iter()
                    .all(|dependency| placed.contains(*dependency))
            })
        });
        let Some(index) = ready else {
            let stuck: Vec<&str> = pending.iter().flatten().map(|t| t.name()).collect();
            return Err(Error::config(format!(
                "property type dependency cycle among: {}",
                stuck.join(", ")
            )));
        };
        if let Some(property_type) = pending[index].take() {
            placed.insert(property_type.name().to_string());
            ordered.push(property_type);
        }
    }
    Ok(ordered)
}
