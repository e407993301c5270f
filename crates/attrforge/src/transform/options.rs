use crate::error::Result;
use crate::value::RawMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options of a `transform` definition.
///
/// The known keys are typed; anything else lands in `extra` so custom
/// transformers can read their own settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Date format, strftime (`%Y-%m-%d`) or letter style (`Y-m-d`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Data type of nested objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Allowed values of an `enum`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Value>>,

    /// Offset applied to datetimes parsed without one, e.g. `+02:00`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(flatten)]
    pub extra: RawMap,
}

impl Options {
    pub fn from_json(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_map(map: RawMap) -> Result<Self> {
        Self::from_json(Value::Object(map))
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(true)
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_keys_are_typed_and_the_rest_is_kept() {
        let options = Options::from_json(json!({
            "format": "Y-m-d",
            "nullable": false,
            "precision": 2
        }))
        .unwrap();

        assert_eq!(options.format.as_deref(), Some("Y-m-d"));
        assert!(!options.is_nullable());
        assert_eq!(options.extra("precision"), Some(&json!(2)));
        assert!(options.class.is_none());
    }

    #[test]
    fn null_and_empty_are_defaults() {
        assert_eq!(Options::from_json(Value::Null).unwrap(), Options::default());
        assert!(Options::from_json(json!({})).unwrap().is_nullable());
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        assert!(Options::from_json(json!({"nullable": "yes"})).is_err());
        assert!(Options::from_json(json!("Y-m-d")).is_err());
    }
}
