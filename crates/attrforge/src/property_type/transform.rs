use super::{PropertyInput, PropertyType};
use crate::capability::{Capability, CapabilityScope, ResolverCapability, TransformCapability};
use crate::context::{AttributesContext, Slot};
use crate::error::{Error, Result};
use crate::pipeline::{Middleware, Next};
use crate::property::{Property, PropertySet};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// `transform`: transformer type and options.
///
/// Without a `transform` key the declared type is used. A string names the
/// type, a map holds `type` plus options (`format`, `class`, `nullable`,
/// `values`, `timezone`, or anything a custom transformer reads), and `false`
/// leaves the attribute untransformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformProperty;

impl TransformProperty {
    pub const NAME: &'static str = "transform";
}

impl PropertyType for TransformProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn depends_on(&self) -> &[&str] {
        &["type", "resolver", "map", "default"]
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        let mut set = PropertySet::new();
        match input.get(Self::NAME) {
            Some(Value::Bool(false)) => return Ok(None),
            None | Some(Value::Null) | Some(Value::Bool(true)) => {}
            Some(Value::String(type_name)) => set.insert("type", Value::from(type_name.as_str())),
            Some(Value::Object(options)) => {
                for (key, value) in options {
                    set.insert(key.as_str(), value.clone());
                }
            }
            Some(other) => {
                return Err(Error::config(format!(
                    "'transform' must be a type name or an options map, got {other}"
                )))
            }
        }
        match set.get("type") {
            None => set.insert("type", Value::from(input.declared_type)),
            Some(Property::Value(Value::String(_))) => {}
            Some(_) => return Err(Error::config("'transform.type' must be a string")),
        }
        Ok(Some(Property::Set(set)))
    }

    fn middleware(&self) -> Option<Arc<dyn Middleware>> {
        Some(Arc::new(TransformStage))
    }

    fn capability(&self, scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        let capability = TransformCapability::from_attributes(
            scope.data_type,
            scope.attributes,
            Self::NAME,
            scope.transformers,
        )?;
        Ok(Some(capability.into()))
    }
}

/// Builds raw slots on the way in and smashes built slots on the way out.
///
/// Resolver attributes are never built from input. Keys that are not
/// attributes follow the transformer's `skip_non_attributes` flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformStage;

impl Middleware for TransformStage {
    fn name(&self) -> &str {
        TransformProperty::NAME
    }

    fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        let descriptor = cx.descriptor();
        let transformer = descriptor.capability::<TransformCapability>().transformer();
        let resolvers = descriptor.capability::<ResolverCapability>();
        let tcx = cx.transform_cx();

        let mut built = BTreeMap::new();
        for (name, slot) in cx.take_slots() {
            let keep = descriptor.has_attribute(&name) || transformer.flags().skip_non_attributes;
            let slot = match slot {
                Slot::Raw(raw) if transformer.has(&name) && !resolvers.has_resolver(&name) => {
                    Slot::Built(transformer.build(&name, &raw, &tcx)?)
                }
                other if keep => other,
                _ => continue,
            };
            built.insert(name, slot);
        }
        cx.replace_slots(built);
        next.run(cx)
    }

    fn extract(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        let descriptor = cx.descriptor();
        let transformer = descriptor.capability::<TransformCapability>().transformer();
        let tcx = cx.transform_cx();

        let mut smashed = BTreeMap::new();
        for (name, slot) in cx.take_slots() {
            let keep = descriptor.has_attribute(&name) || transformer.flags().skip_non_attributes;
            let slot = match slot {
                Slot::Built(value) if transformer.has(&name) => {
                    Slot::Raw(transformer.smash(&name, &value, &tcx)?)
                }
                other if keep => other,
                _ => continue,
            };
            smashed.insert(name, slot);
        }
        cx.replace_slots(smashed);
        next.run(cx)
    }
}
