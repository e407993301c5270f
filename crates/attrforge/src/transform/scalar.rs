//! Scalar transformers.
//!
//! Builders are lenient in what they accept (numeric strings for numbers,
//! `"yes"`/`"no"` for booleans), smashers are strict about the domain value
//! they get.

use super::{Options, TransformCx, ValueError, ValueTransformer};
use crate::error::{Error, Result};
use crate::value::{json_kind, AttrValue};
use serde_json::{Number, Value};
use uuid::Uuid;

type Outcome<T> = std::result::Result<T, ValueError>;

fn float_json(f: f64) -> Outcome<Value> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| ValueError::parse(f.to_string(), "not a finite number"))
}

fn parse_int(s: &str) -> Outcome<i64> {
    s.trim().parse::<i64>().map_err(|e| ValueError::parse(s, e))
}

fn number_to_int(n: &Number) -> Outcome<i64> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(ValueError::parse(n.to_string(), "not an integer")),
    }
}

/// `string`
#[derive(Debug, Clone, Copy, Default)]
pub struct StringTransformer;

impl ValueTransformer for StringTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::String(s) => Ok(AttrValue::String(s.clone())),
            Value::Number(n) => Ok(AttrValue::String(n.to_string())),
            Value::Bool(b) => Ok(AttrValue::String(b.to_string())),
            other => Err(ValueError::mismatch("string", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::String(s) => Ok(Value::String(s.clone())),
            AttrValue::Int(i) => Ok(Value::String(i.to_string())),
            AttrValue::Float(f) => Ok(Value::String(f.to_string())),
            AttrValue::Bool(b) => Ok(Value::String(b.to_string())),
            AttrValue::Uuid(id) => Ok(Value::String(id.to_string())),
            other => Err(ValueError::mismatch("string", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "string"
    }
}

/// `int`
#[derive(Debug, Clone, Copy, Default)]
pub struct IntTransformer;

impl ValueTransformer for IntTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::Number(n) => number_to_int(n).map(AttrValue::Int),
            Value::String(s) => parse_int(s).map(AttrValue::Int),
            Value::Bool(b) => Ok(AttrValue::Int(i64::from(*b))),
            other => Err(ValueError::mismatch("int", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Int(i) => Ok(Value::from(*i)),
            AttrValue::String(s) => parse_int(s).map(Value::from),
            other => Err(ValueError::mismatch("int", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "int"
    }
}

/// `float`
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatTransformer;

impl ValueTransformer for FloatTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::Number(n) => n
                .as_f64()
                .map(AttrValue::Float)
                .ok_or_else(|| ValueError::parse(n.to_string(), "not a float")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(AttrValue::Float)
                .map_err(|e| ValueError::parse(s.as_str(), e)),
            other => Err(ValueError::mismatch("float", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Float(f) => float_json(*f),
            AttrValue::Int(i) => Ok(Value::from(*i)),
            other => Err(ValueError::mismatch("float", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "float"
    }
}

/// `bool`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolTransformer;

impl ValueTransformer for BoolTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::Bool(b) => Ok(AttrValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(AttrValue::Bool(false)),
                Some(1) => Ok(AttrValue::Bool(true)),
                _ => Err(ValueError::parse(n.to_string(), "expected 0 or 1")),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(AttrValue::Bool(true)),
                "false" | "0" | "no" | "off" | "" => Ok(AttrValue::Bool(false)),
                _ => Err(ValueError::parse(s.as_str(), "not a boolean")),
            },
            other => Err(ValueError::mismatch("bool", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(ValueError::mismatch("bool", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "bool"
    }
}

/// `mixed`: no conversion beyond the untyped mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct MixedTransformer;

impl ValueTransformer for MixedTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        Ok(AttrValue::from_json(raw.clone()))
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        Ok(value.to_json())
    }

    fn scalar_type(&self) -> &'static str {
        "mixed"
    }
}

/// `json`: structured data kept whole. Strings are decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTransformer;

impl ValueTransformer for JsonTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::String(s) => serde_json::from_str(s)
                .map(AttrValue::Json)
                .map_err(|e| ValueError::parse(s.as_str(), e)),
            other => Ok(AttrValue::Json(other.clone())),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Json(v) => Ok(v.clone()),
            AttrValue::List(_) => Ok(value.to_json()),
            other => Err(ValueError::mismatch("json", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "array"
    }
}

/// `uuid`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTransformer;

impl ValueTransformer for UuidTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::String(s) => Uuid::parse_str(s.trim())
                .map(AttrValue::Uuid)
                .map_err(|e| ValueError::parse(s.as_str(), e)),
            other => Err(ValueError::mismatch("uuid", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Uuid(id) => Ok(Value::String(id.hyphenated().to_string())),
            AttrValue::String(s) => Uuid::parse_str(s)
                .map(|id| Value::String(id.hyphenated().to_string()))
                .map_err(|e| ValueError::parse(s.as_str(), e)),
            other => Err(ValueError::mismatch("uuid", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "string"
    }
}

/// `databaseKey`: integer keys, or opaque string keys that are not numeric.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseKeyTransformer;

impl ValueTransformer for DatabaseKeyTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        match raw {
            Value::Number(n) => number_to_int(n).map(AttrValue::Int),
            Value::String(s) => Ok(s
                .trim()
                .parse::<i64>()
                .map(AttrValue::Int)
                .unwrap_or_else(|_| AttrValue::String(s.clone()))),
            other => Err(ValueError::mismatch("databaseKey", json_kind(other))),
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        match value {
            AttrValue::Int(i) => Ok(Value::from(*i)),
            AttrValue::String(s) => Ok(Value::String(s.clone())),
            AttrValue::Uuid(id) => Ok(Value::String(id.to_string())),
            other => Err(ValueError::mismatch("databaseKey", other.kind())),
        }
    }

    fn scalar_type(&self) -> &'static str {
        "int"
    }
}

/// `enum`: one of `options.values`.
#[derive(Debug, Clone)]
pub struct EnumTransformer {
    values: Vec<Value>,
}

impl EnumTransformer {
    pub fn new(options: &Options) -> Result<Self> {
        match &options.values {
            Some(values) if !values.is_empty() => Ok(Self {
                values: values.clone(),
            }),
            _ => Err(Error::config("enum transformer requires a non-empty 'values' list")),
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn allowed(&self, raw: &Value) -> bool {
        self.values.iter().any(|v| v == raw)
    }
}

impl ValueTransformer for EnumTransformer {
    fn build(&self, raw: &Value, _: &TransformCx<'_>) -> Outcome<AttrValue> {
        if self.allowed(raw) {
            Ok(AttrValue::from_json(raw.clone()))
        } else {
            Err(ValueError::NotAllowed(raw.to_string()))
        }
    }

    fn smash(&self, value: &AttrValue, _: &TransformCx<'_>) -> Outcome<Value> {
        let raw = value.to_json();
        if self.allowed(&raw) {
            Ok(raw)
        } else {
            Err(ValueError::NotAllowed(raw.to_string()))
        }
    }

    fn scalar_type(&self) -> &'static str {
        if self.values.iter().all(|v| v.is_i64()) {
            "int"
        } else {
            "string"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cx() -> TransformCx<'static> {
        TransformCx::new()
    }

    fn roundtrip(transformer: &dyn ValueTransformer, raw: Value) -> Value {
        let built = transformer.build(&raw, &cx()).unwrap();
        transformer.smash(&built, &cx()).unwrap()
    }

    #[test]
    fn scalars_roundtrip() {
        assert_eq!(roundtrip(&StringTransformer, json!("abc")), json!("abc"));
        assert_eq!(roundtrip(&IntTransformer, json!(-4)), json!(-4));
        assert_eq!(roundtrip(&FloatTransformer, json!(1.25)), json!(1.25));
        assert_eq!(roundtrip(&BoolTransformer, json!(false)), json!(false));
        assert_eq!(roundtrip(&JsonTransformer, json!({"a": [1, 2]})), json!({"a": [1, 2]}));
        assert_eq!(roundtrip(&MixedTransformer, json!([1, "x"])), json!([1, "x"]));
        assert_eq!(roundtrip(&DatabaseKeyTransformer, json!(9)), json!(9));
        assert_eq!(
            roundtrip(&UuidTransformer, json!("67e55044-10b1-426f-9247-bb680e5fe0c8")),
            json!("67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(IntTransformer.build(&json!(" 12 "), &cx()).unwrap(), AttrValue::Int(12));
        assert_eq!(IntTransformer.build(&json!(3.0), &cx()).unwrap(), AttrValue::Int(3));
        assert!(IntTransformer.build(&json!(3.5), &cx()).is_err());
        assert_eq!(FloatTransformer.build(&json!("2.5"), &cx()).unwrap(), AttrValue::Float(2.5));
        assert_eq!(StringTransformer.build(&json!(7), &cx()).unwrap(), AttrValue::from("7"));
    }

    #[test]
    fn bool_accepts_common_spellings() {
        for raw in [json!("yes"), json!("ON"), json!(1), json!("true")] {
            assert_eq!(BoolTransformer.build(&raw, &cx()).unwrap(), AttrValue::Bool(true));
        }
        for raw in [json!("no"), json!(""), json!(0)] {
            assert_eq!(BoolTransformer.build(&raw, &cx()).unwrap(), AttrValue::Bool(false));
        }
        assert!(BoolTransformer.build(&json!("maybe"), &cx()).is_err());
    }

    #[test]
    fn mismatches_name_the_expected_type() {
        let err = StringTransformer.build(&json!([1]), &cx()).unwrap_err();
        assert!(matches!(
            err,
            ValueError::Mismatch { expected: "string", ref found } if found == "array"
        ));
        assert!(BoolTransformer.smash(&AttrValue::Int(1), &cx()).is_err());
    }

    #[test]
    fn json_decodes_strings() {
        assert_eq!(
            JsonTransformer.build(&json!("{\"a\":1}"), &cx()).unwrap(),
            AttrValue::Json(json!({"a": 1}))
        );
        assert!(JsonTransformer.build(&json!("{nope"), &cx()).is_err());
    }

    #[test]
    fn database_keys_keep_opaque_strings() {
        assert_eq!(
            DatabaseKeyTransformer.build(&json!("42"), &cx()).unwrap(),
            AttrValue::Int(42)
        );
        assert_eq!(
            DatabaseKeyTransformer.build(&json!("ab-12"), &cx()).unwrap(),
            AttrValue::from("ab-12")
        );
    }

    #[test]
    fn enum_checks_membership() {
        let options = Options::from_json(json!({"values": ["draft", "published"]})).unwrap();
        let transformer = EnumTransformer::new(&options).unwrap();

        assert_eq!(roundtrip(&transformer, json!("draft")), json!("draft"));
        assert!(matches!(
            transformer.build(&json!("archived"), &cx()).unwrap_err(),
            ValueError::NotAllowed(value) if value == "\"archived\""
        ));
        assert!(transformer.smash(&AttrValue::from("archived"), &cx()).is_err());
        assert_eq!(transformer.scalar_type(), "string");

        assert!(EnumTransformer::new(&Options::default()).is_err());
    }

    #[test]
    fn uuid_rejects_garbage() {
        assert!(UuidTransformer.build(&json!("not-a-uuid"), &cx()).is_err());
        assert!(UuidTransformer.build(&json!(5), &cx()).is_err());
    }
}
