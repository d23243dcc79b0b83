//! Structured evaluation results
//!
//! `ResultValue` is a superset of JSON: besides the interchange types it can
//! hold `Undefined` and function-like values, which have no JSON encoding and
//! get special treatment from the serializer.

use serde_json::Value;

/// Marker keys a runtime uses to tag function values on the wire
const LAMBDA_MARKER: &str = "_jsonata_lambda";
const FUNCTION_MARKER: &str = "_jsonata_function";
/// Marker for a host function value; `arity` is a sibling member
pub const NATIVE_MARKER: &str = "_jsonata_native";

/// A value produced by an evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ResultValue>),
    /// Object members in insertion order
    Object(Vec<(String, ResultValue)>),
    /// A function defined in the expression language
    Lambda { signature: Option<String> },
    /// A host function
    NativeFunction { arity: usize },
}

impl ResultValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ResultValue::Undefined)
    }

    /// Function-like values are never serialized verbatim
    pub fn is_callable(&self) -> bool {
        matches!(self, ResultValue::Lambda { .. } | ResultValue::NativeFunction { .. })
    }

    /// Look up an object member by key
    pub fn get(&self, key: &str) -> Option<&ResultValue> {
        match self {
            ResultValue::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<Value> for ResultValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ResultValue::Null,
            Value::Bool(b) => ResultValue::Bool(b),
            Value::Number(n) => n.as_f64().map(ResultValue::Number).unwrap_or(ResultValue::Null),
            Value::String(s) => ResultValue::String(s),
            Value::Array(items) => ResultValue::Array(items.into_iter().map(ResultValue::from).collect()),
            Value::Object(map) => {
                if map.get(NATIVE_MARKER) == Some(&Value::Bool(true)) {
                    let arity = map.get("arity").and_then(Value::as_u64).unwrap_or(0) as usize;
                    return ResultValue::NativeFunction { arity };
                }
                let is_function = [LAMBDA_MARKER, FUNCTION_MARKER]
                    .iter()
                    .any(|marker| map.get(*marker) == Some(&Value::Bool(true)));
                if is_function {
                    let signature = map
                        .get("signature")
                        .and_then(|s| s.get("definition"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    return ResultValue::Lambda { signature };
                }
                ResultValue::Object(
                    map.into_iter()
                        .map(|(k, v)| (k, ResultValue::from(v)))
                        .collect(),
                )
            }
        }
    }
}

impl From<&Value> for ResultValue {
    fn from(value: &Value) -> Self {
        value.clone().into()
    }
}
