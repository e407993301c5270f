use super::{PropertyInput, PropertyType};
use crate::capability::{Capability, CapabilityScope, DefaultsCapability};
use crate::context::AttributesContext;
use crate::error::Result;
use crate::pipeline::{Middleware, Next};
use crate::property::Property;
use std::sync::Arc;

/// `default`: raw value used when hydration input lacks the attribute.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProperty;

impl DefaultProperty {
    pub const NAME: &'static str = "default";
}

impl PropertyType for DefaultProperty {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn depends_on(&self) -> &[&str] {
        &["type"]
    }

    fn property_value(&self, input: &PropertyInput<'_>) -> Result<Option<Property>> {
        Ok(input.get(Self::NAME).cloned().map(Property::Value))
    }

    fn middleware(&self) -> Option<Arc<dyn Middleware>> {
        Some(Arc::new(DefaultStage))
    }

    fn capability(&self, scope: &CapabilityScope<'_>) -> Result<Option<Capability>> {
        Ok(Some(
            DefaultsCapability::from_attributes(scope.attributes, Self::NAME).into(),
        ))
    }
}

/// Fills absent attributes with their raw default before they are built.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStage;

impl Middleware for DefaultStage {
    fn name(&self) -> &str {
        DefaultProperty::NAME
    }

    fn hydrate(&self, cx: &mut AttributesContext<'_>, next: Next<'_>) -> Result<()> {
        let defaults = cx.descriptor().capability::<DefaultsCapability>();
        for (name, value) in defaults.iter() {
            if !cx.contains(name) {
                cx.insert_raw(name, value.clone());
            }
        }
        next.run(cx)
    }
}
