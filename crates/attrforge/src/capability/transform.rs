use crate::attribute::AttributeMap;
use crate::error::{Error, Result};
use crate::property::Property;
use crate::transform::{Options, TransformSpec, Transformer, TransformerRegistry};
use std::sync::Arc;

/// The data type's [`Transformer`].
#[derive(Debug, Clone)]
pub struct TransformCapability {
    transformer: Transformer,
}

impl Default for TransformCapability {
    fn default() -> Self {
        Self {
            transformer: Transformer::empty(),
        }
    }
}

impl TransformCapability {
    /// Build the transformer from every attribute's transform property: a set
    /// holding `type` plus the options.
    pub fn from_attributes(
        data_type: &str,
        attributes: &AttributeMap,
        property_type: &str,
        registry: &Arc<TransformerRegistry>,
    ) -> Result<Self> {
        let mut specs = Vec::new();
        for (attribute, property) in attributes.with_property(property_type) {
            let spec = spec_from_property(property).map_err(|source| Error::AttributeCompilation {
                object_type: data_type.to_string(),
                attribute: attribute.name().to_string(),
                source: Box::new(source),
            })?;
            specs.push((attribute.name().to_string(), spec));
        }
        Ok(Self {
            transformer: Transformer::new(data_type, Arc::clone(registry), specs),
        })
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }
}

fn spec_from_property(property: &Property) -> Result<TransformSpec> {
    let set = property
        .as_set()
        .ok_or_else(|| Error::config("transform property must be a set"))?;
    let type_name = set
        .get_str("type")
        .ok_or_else(|| Error::config("transform property has no 'type'"))?
        .to_string();
    let mut options = set.to_json();
    options.remove("type");
    Ok(TransformSpec::new(type_name, Options::from_map(options)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::property::PropertySet;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn attribute(name: &str, transform: Property) -> Attribute {
        let mut properties = BTreeMap::new();
        properties.insert("transform".to_string(), transform);
        Attribute::new(name, "mixed", properties)
    }

    #[test]
    fn specs_carry_type_and_options() {
        let attributes: AttributeMap = [attribute(
            "publishDate",
            Property::Set(
                PropertySet::new()
                    .with("type", json!("datetime"))
                    .with("format", json!("Y-m-d")),
            ),
        )]
        .into_iter()
        .collect();

        let capability = TransformCapability::from_attributes(
            "Article",
            &attributes,
            "transform",
            &Arc::new(TransformerRegistry::default()),
        )
        .unwrap();
        let spec = capability.transformer().spec("publishDate").unwrap();
        assert_eq!(spec.type_name, "datetime");
        assert_eq!(spec.options.format.as_deref(), Some("Y-m-d"));
        assert_eq!(capability.transformer().data_type(), "Article");
    }

    #[test]
    fn malformed_properties_name_the_attribute() {
        let attributes: AttributeMap = [attribute("title", Property::Value(json!("string")))]
            .into_iter()
            .collect();
        let err = TransformCapability::from_attributes(
            "Article",
            &attributes,
            "transform",
            &Arc::new(TransformerRegistry::default()),
        )
        .unwrap_err();
        assert_eq!(err.attribute(), Some("title"));
    }
}
