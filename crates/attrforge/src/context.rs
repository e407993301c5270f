//! Per-call state of one hydrate or extract run.

use crate::descriptor::DataTypeDescriptor;
use crate::transform::{NestedTypes, TransformCx};
use crate::value::{AttrValue, RawMap};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// One attribute's value while it moves through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// External form, not (or no longer) built.
    Raw(Value),
    /// Domain form, produced by a transformer or taken from an entity.
    Built(AttrValue),
}

impl Slot {
    pub fn is_raw(&self) -> bool {
        matches!(self, Slot::Raw(_))
    }

    pub fn into_value(self) -> AttrValue {
        match self {
            Slot::Raw(raw) => AttrValue::from_json(raw),
            Slot::Built(value) => value,
        }
    }

    pub fn into_raw(self) -> Value {
        match self {
            Slot::Raw(raw) => raw,
            Slot::Built(value) => value.to_json(),
        }
    }
}

/// Mutable carrier for one pipeline run.
///
/// Owned exclusively by the call; stages read the descriptor and rewrite
/// slots in place.
pub struct AttributesContext<'a> {
    descriptor: &'a DataTypeDescriptor,
    nested: Option<&'a dyn NestedTypes>,
    slots: BTreeMap<String, Slot>,
}

impl<'a> AttributesContext<'a> {
    pub fn new(descriptor: &'a DataTypeDescriptor) -> Self {
        Self {
            descriptor,
            nested: None,
            slots: BTreeMap::new(),
        }
    }

    /// Context holding raw input, for hydration.
    pub fn from_raw(descriptor: &'a DataTypeDescriptor, raw: RawMap) -> Self {
        let mut cx = Self::new(descriptor);
        cx.slots = raw.into_iter().map(|(k, v)| (k, Slot::Raw(v))).collect();
        cx
    }

    /// Context holding domain values, for extraction.
    pub fn from_values(descriptor: &'a DataTypeDescriptor, values: BTreeMap<String, AttrValue>) -> Self {
        let mut cx = Self::new(descriptor);
        cx.slots = values.into_iter().map(|(k, v)| (k, Slot::Built(v))).collect();
        cx
    }

    pub fn with_nested(mut self, nested: Option<&'a dyn NestedTypes>) -> Self {
        self.nested = nested;
        self
    }

    pub fn descriptor(&self) -> &'a DataTypeDescriptor {
        self.descriptor
    }

    /// Transformer context carrying the nested type lookup.
    pub fn transform_cx(&self) -> TransformCx<'a> {
        match self.nested {
            Some(nested) => TransformCx::with_nested(nested),
            None => TransformCx::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.slots.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, slot: Slot) {
        self.slots.insert(name.into(), slot);
    }

    pub fn insert_raw(&mut self, name: impl Into<String>, raw: Value) {
        self.insert(name, Slot::Raw(raw));
    }

    pub fn insert_built(&mut self, name: impl Into<String>, value: AttrValue) {
        self.insert(name, Slot::Built(value));
    }

    pub fn remove(&mut self, name: &str) -> Option<Slot> {
        self.slots.remove(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Take all slots out, leaving the context empty.
    pub fn take_slots(&mut self) -> BTreeMap<String, Slot> {
        std::mem::take(&mut self.slots)
    }

    pub fn replace_slots(&mut self, slots: BTreeMap<String, Slot>) {
        self.slots = slots;
    }

    /// Final domain values of a hydration run.
    pub fn into_values(self) -> BTreeMap<String, AttrValue> {
        self.slots
            .into_iter()
            .map(|(k, slot)| (k, slot.into_value()))
            .collect()
    }

    /// Final raw data of an extraction run.
    pub fn into_raw(self) -> RawMap {
        self.slots
            .into_iter()
            .map(|(k, slot)| (k, slot.into_raw()))
            .collect()
    }
}

impl fmt::Debug for AttributesContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributesContext")
            .field("data_type", &self.descriptor.name())
            .field("slots", &self.slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slots_convert_both_ways() {
        assert_eq!(Slot::Raw(json!(3)).into_value(), AttrValue::Int(3));
        assert_eq!(Slot::Built(AttrValue::from("x")).into_raw(), json!("x"));
        assert!(Slot::Raw(Value::Null).is_raw());
    }

    #[test]
    fn raw_context_roundtrip() {
        let descriptor = DataTypeDescriptor::empty("T");
        let raw = json!({"a": 1, "b": "two"}).as_object().unwrap().clone();
        let mut cx = AttributesContext::from_raw(&descriptor, raw.clone());

        assert_eq!(cx.len(), 2);
        assert_eq!(cx.get("a"), Some(&Slot::Raw(json!(1))));

        cx.insert_built("c", AttrValue::Bool(true));
        cx.remove("b");
        assert_eq!(cx.names(), vec!["a", "c"]);

        let values = cx.into_values();
        assert_eq!(values.get("a"), Some(&AttrValue::Int(1)));
        assert_eq!(values.get("c"), Some(&AttrValue::Bool(true)));
    }

    #[test]
    fn take_and_replace() {
        let descriptor = DataTypeDescriptor::empty("T");
        let mut values = BTreeMap::new();
        values.insert("a".to_string(), AttrValue::Int(1));
        let mut cx = AttributesContext::from_values(&descriptor, values);

        let slots = cx.take_slots();
        assert!(cx.is_empty());
        cx.replace_slots(slots);
        assert_eq!(cx.into_raw(), json!({"a": 1}).as_object().unwrap().clone());
    }
}
