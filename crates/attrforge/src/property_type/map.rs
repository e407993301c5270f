use super::{PropertyInput, PropertyType};
use crate::capability::{Capability, CapabilityScope, MapCapability};
use crate::context::AttributesContext;
use crate::error::{Error, Result};
use crate::pipeline::{Middleware, Next};
use crate::property::{Property, PropertySet};
use serde_json::Value;
use std::sync::Arc;

/// `map`: external key names.
///
/// `map` is a string (both directions) or `false` (never read or written);
/// `mapFrom` / `mapTo` override one direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapProperty;

impl MapProperty {
    pub const NAME: &'static str = "map";
}

impl PropertyType for MapProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition_keys(&self) -> Option<&[&str]> {
        Some(&["map", "mapTo", "mapFrom"])
    }

    fn depends_on(&self) -> &[&str] {
        &["type"]
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        let mut set = PropertySet::new();
        match input.get("map") {
            None | Some(Value::Bool(true)) => {}
            Some(Value::Bool(false)) => {
                if input.get("mapTo").is_some() || input.get("mapFrom").is_some() {
                    return Err(Error::config(
                        "'map: false' cannot be combined with 'mapTo' or 'mapFrom'",
                    ));
                }
                set.insert("map", Value::Bool(false));
            }
            Some(Value::String(external)) => set.insert("map", Value::from(external.as_str())),
            Some(other) => {
                return Err(Error::config(format!(
                    "'map' must be a key name or false, got {other}"
                )))
            }
        }
        for key in ["mapTo", "mapFrom"] {
            if let Some(external) = input.string(key)? {
                set.insert(key, Value::from(external));
            }
        }
        Ok((!set.is_empty()).then_some(Property::Set(set)))
    }

    fn middleware(&self) -> Option<Arc<dyn Middleware>> {
        Some(Arc::new(MapStage))
    }

    fn capability(&self, scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        Ok(Some(
            MapCapability::from_attributes(scope.attributes, Self::NAME).into(),
        ))
    }
}

/// Renames external keys to attribute names before the rest of hydration,
/// and back after the rest of extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapStage;

impl Middleware for MapStage {
    fn name(&self) -> &str {
        MapProperty::NAME
    }

    fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        let map = cx.descriptor().capability::<MapCapability>();
        let slots = cx.take_slots();
        cx.replace_slots(map.map_inbound(slots).into_iter().collect());
        next.run(cx)
    }

    fn extract(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        next.run(cx)?;
        let map = cx.descriptor().capability::<MapCapability>();
        let slots = cx.take_slots();
        cx.replace_slots(map.map_outbound(slots).into_iter().collect());
        Ok(())
    }
}
