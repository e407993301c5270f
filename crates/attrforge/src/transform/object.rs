//! Nested object transformers.
//!
//! With a `class` option and a [`NestedTypes`](super::NestedTypes) in the
//! call context, nested data runs through the nested type's own hydration and
//! extraction. Otherwise nested objects are untyped entities.

use super::{TransformCx, ValueError, ValueTransformer};
use crate::entity::Entity;
use crate::value::{json_kind, AttrValue, RawMap};
use serde_json::Value;

type Outcome<T> = std::result::Result<T, ValueError>;

fn nested_error(err: crate::error::Error) -> ValueError {
    ValueError::Nested(Box::new(err))
}

fn build_one(class: Option<&str>, raw: &Value, cx: &TransformCx<'_>) -> Outcome<Entity> {
    let Value::Object(map) = raw else {
        return Err(ValueError::mismatch("object", json_kind(raw)));
    };
    match (class, cx.nested()) {
        (Some(class), Some(nested)) => nested.hydrate_nested(class, map.clone()).map_err(nested_error),
        (class, _) => Ok(Entity::from_raw(class.unwrap_or_default(), map.clone())),
    }
}

fn smash_one(class: Option<&str>, entity: &Entity, cx: &TransformCx<'_>) -> Outcome<RawMap> {
    match (class, cx.nested()) {
        (Some(class), Some(nested)) => nested.extract_nested(class, entity).map_err(nested_error),
        _ => Ok(entity.to_json()),
    }
}

/// `object`: one nested object.
#[derive(Debug, Clone, Default)]
pub struct ObjectTransformer {
    class: Option<String>,
}

impl ObjectTransformer {
    pub fn new(class: Option<String>) -> Self {
        Self { class }
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

impl ValueTransformer for ObjectTransformer {
    fn build(&self, raw: &Value, cx: &TransformCx<'_>) -> Outcome<AttrValue> {
        build_one(self.class(), raw, cx).map(|e| AttrValue::Object(Box::new(e)))
    }

    fn smash(&self, value: &AttrValue, cx: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Object(entity) => smash_one(self.class(), entity, cx).map(Value::Object),
            AttrValue::Json(object @ Value::Object(_)) => Ok(object.clone()),
            other => Err(ValueError::mismatch("object", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "object"
    }
}

/// `objectCollection`: a list of nested objects.
#[derive(Debug, Clone, Default)]
pub struct CollectionTransformer {
    class: Option<String>,
}

impl CollectionTransformer {
    pub fn new(class: Option<String>) -> Self {
        Self { class }
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }
}

impl ValueTransformer for CollectionTransformer {
    fn build(&self, raw: &Value, cx: &TransformCx<'_>) -> Outcome<AttrValue> {
        let Value::Array(items) = raw else {
            return Err(ValueError::mismatch("objectCollection", json_kind(raw)));
        };
        items
            .iter()
            .map(|item| build_one(self.class(), item, cx))
            .collect::<Outcome<Vec<_>>>()
            .map(AttrValue::Collection)
    }

    fn smash(&self, value: &AttrValue, cx: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Collection(entities) => entities
                .iter()
                .map(|e| smash_one(self.class(), e, cx).map(Value::Object))
                .collect::<Outcome<Vec<_>>>()
                .map(Value::Array),
            AttrValue::Object(entity) => {
                smash_one(self.class(), entity, cx).map(|map| Value::Array(vec![Value::Object(map)]))
            }
            AttrValue::Json(array @ Value::Array(_)) => Ok(array.clone()),
            other => Err(ValueError::mismatch("objectCollection", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "array"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::transform::NestedTypes;
    use serde_json::json;

    /// Upper-cases names on the way in, lower-cases on the way out.
    struct Shouting;

    impl NestedTypes for Shouting {
        fn hydrate_nested(&self, class: &str, raw: RawMap) -> Result<Entity> {
            if class != "Author" {
                return Err(Error::config(format!("unknown data type '{class}'")));
            }
            let mut entity = Entity::from_raw(class, raw);
            if let Some(name) = entity.value("name").and_then(AttrValue::as_str) {
                let loud = name.to_uppercase();
                entity.set("name", loud);
                entity.clear_modified();
            }
            Ok(entity)
        }

        fn extract_nested(&self, _class: &str, entity: &Entity) -> Result<RawMap> {
            let mut raw = entity.to_json();
            if let Some(Value::String(name)) = raw.get_mut("name") {
                *name = name.to_lowercase();
            }
            Ok(raw)
        }
    }

    #[test]
    fn untyped_objects_without_context() {
        let transformer = ObjectTransformer::new(Some("Author".into()));
        let cx = TransformCx::new();
        let built = transformer.build(&json!({"name": "Ada"}), &cx).unwrap();
        let entity = built.as_entity().unwrap();
        assert_eq!(entity.data_type(), "Author");
        assert_eq!(entity.value("name"), Some(&AttrValue::from("Ada")));
        assert_eq!(transformer.smash(&built, &cx).unwrap(), json!({"name": "Ada"}));
    }

    #[test]
    fn nested_types_run_their_own_pipeline() {
        let nested = Shouting;
        let cx = TransformCx::with_nested(&nested);
        let transformer = ObjectTransformer::new(Some("Author".into()));

        let built = transformer.build(&json!({"name": "Ada"}), &cx).unwrap();
        assert_eq!(built.get("name"), Some(AttrValue::from("ADA")));
        assert_eq!(transformer.smash(&built, &cx).unwrap(), json!({"name": "ada"}));
    }

    #[test]
    fn nested_failures_are_reported() {
        let nested = Shouting;
        let cx = TransformCx::with_nested(&nested);
        let transformer = ObjectTransformer::new(Some("Publisher".into()));
        let err = transformer.build(&json!({}), &cx).unwrap_err();
        assert!(err.to_string().contains("Publisher"));

        let cause = std::error::Error::source(&err).unwrap();
        assert!(matches!(
            cause.downcast_ref::<Error>(),
            Some(Error::Configuration(message)) if message.contains("Publisher")
        ));
    }

    #[test]
    fn collections() {
        let transformer = CollectionTransformer::new(Some("Comment".into()));
        let cx = TransformCx::new();
        let raw = json!([{"body": "a"}, {"body": "b"}]);

        let built = transformer.build(&raw, &cx).unwrap();
        assert_eq!(built.as_collection().map(<[Entity]>::len), Some(2));
        assert_eq!(transformer.smash(&built, &cx).unwrap(), raw);

        assert!(transformer.build(&json!({"body": "a"}), &cx).is_err());
        assert!(transformer.build(&json!([1]), &cx).is_err());
    }
}
