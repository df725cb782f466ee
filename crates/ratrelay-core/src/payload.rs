//! Loosely-typed event payloads.
//!
//! The tracker sends every field as whatever its client happened to
//! produce: strings, bools, numbers, occasionally `null`. [`Payload`] reads
//! them all as text and never assumes a field is present.

use serde_json::{Map, Value};

/// Keys that may carry the rescue identifier, in priority order.
pub const RESCUE_ID_KEYS: [&str; 5] = ["RescueID", "rescueID", "RescueId", "rescueId", "rescueid"];

/// Keys that may carry the rat identifier, in priority order.
pub const RAT_ID_KEYS: [&str; 5] = ["RatID", "ratID", "RatId", "ratId", "ratid"];

/// The `data` object of an inbound event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    /// Creates a payload from a JSON object.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Creates a payload from a JSON value, if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(fields)),
            _ => None,
        }
    }

    /// Adds a field (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value of a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns true if the payload has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads a scalar field as text.
    ///
    /// Strings are returned as-is, bools as `true`/`false` and numbers in
    /// their JSON form. `null`, arrays and objects read as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns the first non-empty text value among `keys`.
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.text(key))
            .find(|value| !value.trim().is_empty())
    }

    /// Compares a flag field against the literal that means "yes".
    ///
    /// Returns `None` when the field is absent. Any value other than
    /// `truthy`, compared case-sensitively, is `Some(false)`.
    pub fn flag(&self, key: &str, truthy: &str) -> Option<bool> {
        self.text(key).map(|value| value == truthy)
    }

    /// Resolves the rescue identifier through [`RESCUE_ID_KEYS`].
    pub fn rescue_id(&self) -> Option<String> {
        self.first_text(&RESCUE_ID_KEYS)
    }

    /// Resolves the rat identifier through [`RAT_ID_KEYS`].
    pub fn rat_id(&self) -> Option<String> {
        self.first_text(&RAT_ID_KEYS)
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}
