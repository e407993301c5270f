//! Domain value types.
//!
//! Raw data travels as [`serde_json::Value`]. Once an attribute has been built
//! by its transformer it is held as an [`AttrValue`], the runtime representation
//! of a hydrated attribute.

use crate::entity::Entity;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

/// Runtime representation of a hydrated attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttrValue {
    #[default]
    Null,

    Bool(bool),

    Int(i64),

    Float(f64),

    String(String),

    /// Point in time with the offset it was read with.
    DateTime(DateTime<FixedOffset>),

    /// Calendar date without a time component.
    Date(NaiveDate),

    Uuid(Uuid),

    /// Structured data kept as-is (`json` attributes, untyped objects).
    Json(Value),

    /// Ordered list of untyped values.
    List(Vec<AttrValue>),

    /// A nested domain object (`object` attributes, has-one associations).
    Object(Box<Entity>),

    /// Nested domain objects (`objectCollection` attributes, has-many associations).
    Collection(Vec<Entity>),
}

impl AttrValue {
    /// Convert a raw value without any type information.
    ///
    /// Used for attributes that no transformer claims: numbers stay numbers,
    /// strings stay strings, arrays become lists and objects are kept as JSON.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => AttrValue::String(s),
            Value::Array(items) => {
                AttrValue::List(items.into_iter().map(AttrValue::from_json).collect())
            }
            object @ Value::Object(_) => AttrValue::Json(object),
        }
    }

    /// Convert back to a raw value without any type information.
    ///
    /// Dates use RFC 3339 / ISO 8601, nested objects are flattened with
    /// [`Entity::to_json`].
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Int(i) => Value::Number((*i).into()),
            AttrValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            AttrValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            AttrValue::Uuid(id) => Value::String(id.to_string()),
            AttrValue::Json(v) => v.clone(),
            AttrValue::List(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Object(entity) => Value::Object(entity.to_json()),
            AttrValue::Collection(entities) => Value::Array(
                entities
                    .iter()
                    .map(|e| Value::Object(e.to_json()))
                    .collect(),
            ),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "int",
            AttrValue::Float(_) => "float",
            AttrValue::String(_) => "string",
            AttrValue::DateTime(_) => "datetime",
            AttrValue::Date(_) => "date",
            AttrValue::Uuid(_) => "uuid",
            AttrValue::Json(_) => "json",
            AttrValue::List(_) => "list",
            AttrValue::Object(_) => "object",
            AttrValue::Collection(_) => "objectCollection",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Whether this value holds nested domain objects.
    pub fn is_rich(&self) -> bool {
        matches!(self, AttrValue::Object(_) | AttrValue::Collection(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as a float; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            AttrValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Calendar date of a `Date` or `DateTime` value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            AttrValue::Date(d) => Some(*d),
            AttrValue::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            AttrValue::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            AttrValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            AttrValue::Object(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Entity]> {
        match self {
            AttrValue::Collection(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a key inside structured values.
    ///
    /// Works on nested objects and JSON objects; anything else has no keys.
    pub fn get(&self, key: &str) -> Option<AttrValue> {
        match self {
            AttrValue::Object(entity) => entity.value(key).cloned(),
            AttrValue::Json(Value::Object(map)) => map.get(key).cloned().map(AttrValue::from_json),
            _ => None,
        }
    }

    /// Equality used for key matching (associations, lookups).
    ///
    /// Integers match their string form so a `"7"` foreign key finds `7`.
    pub fn matches_key(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Int(a), AttrValue::String(b)) | (AttrValue::String(b), AttrValue::Int(a)) => {
                b.trim().parse::<i64>().map(|b| b == *a).unwrap_or(false)
            }
            (a, b) => a == b,
        }
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<Uuid> for AttrValue {
    fn from(v: Uuid) -> Self {
        AttrValue::Uuid(v)
    }
}

impl From<NaiveDate> for AttrValue {
    fn from(v: NaiveDate) -> Self {
        AttrValue::Date(v)
    }
}

impl From<Entity> for AttrValue {
    fn from(v: Entity) -> Self {
        AttrValue::Object(Box::new(v))
    }
}

/// Short name of a raw value's JSON kind, used in error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Raw map of external data, as read from or written to a store.
pub type RawMap = Map<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_keeps_scalars() {
        assert_eq!(AttrValue::from_json(json!(null)), AttrValue::Null);
        assert_eq!(AttrValue::from_json(json!(true)), AttrValue::Bool(true));
        assert_eq!(AttrValue::from_json(json!(42)), AttrValue::Int(42));
        assert_eq!(AttrValue::from_json(json!(1.5)), AttrValue::Float(1.5));
        assert_eq!(AttrValue::from_json(json!("x")), AttrValue::from("x"));
    }

    #[test]
    fn from_json_arrays_become_lists() {
        let value = AttrValue::from_json(json!([1, "a"]));
        assert_eq!(
            value,
            AttrValue::List(vec![AttrValue::Int(1), AttrValue::from("a")])
        );
    }

    #[test]
    fn from_json_objects_stay_json() {
        let value = AttrValue::from_json(json!({"a": 1}));
        assert_eq!(value.as_json(), Some(&json!({"a": 1})));
        assert_eq!(value.get("a"), Some(AttrValue::Int(1)));
    }

    #[test]
    fn to_json_formats_dates() {
        let date = NaiveDate::from_ymd_opt(2014, 3, 1).unwrap();
        assert_eq!(AttrValue::Date(date).to_json(), json!("2014-03-01"));
    }

    #[test]
    fn to_json_flattens_entities() {
        let mut author = Entity::new("Author");
        author.set("name", "Ada");
        let value = AttrValue::from(author);
        assert!(value.is_rich());
        assert_eq!(value.to_json(), json!({"name": "Ada"}));
        assert_eq!(value.get("name"), Some(AttrValue::from("Ada")));
    }

    #[test]
    fn nan_float_becomes_null() {
        assert_eq!(AttrValue::Float(f64::NAN).to_json(), Value::Null);
    }

    #[test]
    fn as_f64_widens_ints() {
        assert_eq!(AttrValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttrValue::from("3").as_f64(), None);
    }

    #[test]
    fn matches_key_crosses_int_and_string() {
        assert!(AttrValue::Int(7).matches_key(&AttrValue::from("7")));
        assert!(AttrValue::from(" 7").matches_key(&AttrValue::Int(7)));
        assert!(!AttrValue::Int(7).matches_key(&AttrValue::from("seven")));
        assert!(AttrValue::from("a").matches_key(&AttrValue::from("a")));
    }

    #[test]
    fn json_kind_names() {
        assert_eq!(json_kind(&json!(1)), "int");
        assert_eq!(json_kind(&json!(1.5)), "float");
        assert_eq!(json_kind(&json!([])), "array");
    }
}
