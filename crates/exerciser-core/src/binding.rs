//! Bindings: names injected into the evaluation environment
//!
//! A binding is either a plain JSON value, a loaded extension library, or a
//! host function. Library handles are the only way fetched code becomes
//! visible to an expression.

use crate::error::BindingCallError;
use crate::value::NATIVE_MARKER;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Named bindings, ordered by name
pub type Bindings = BTreeMap<String, Binding>;

/// Host function signature
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync;

/// Capability exposed by a loaded extension library
pub trait ModuleBinding: Send + Sync + fmt::Debug {
    /// Name the module is bound under
    fn module_name(&self) -> &str;

    /// Exported symbol names
    fn symbols(&self) -> Vec<String>;

    /// Call an exported function with numeric arguments
    fn call(&self, symbol: &str, args: &[f64]) -> Result<Vec<f64>, BindingCallError>;

    /// Read an exported constant
    fn constant(&self, symbol: &str) -> Option<f64>;
}

/// A host function made callable from expressions
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    arity: usize,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<String>, arity: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, BindingCallError> {
        (self.func)(args).map_err(|message| BindingCallError::Failed {
            name: self.name.clone(),
            message,
        })
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// A single named binding
#[derive(Debug, Clone)]
pub enum Binding {
    Value(Value),
    Library(Arc<dyn ModuleBinding>),
    Native(NativeFunction),
}

impl Binding {
    pub fn is_callable(&self) -> bool {
        !matches!(self, Binding::Value(_))
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Binding::Value(value)
    }
}

/// Collect the plain value bindings into a JSON object
///
/// Libraries contribute their numeric constants as `{module: {symbol: n}}`;
/// functions stay reachable only through `invoke_binding`.
pub fn value_bindings(bindings: &Bindings) -> Map<String, Value> {
    bindings
        .iter()
        .filter_map(|(name, binding)| match binding {
            Binding::Value(v) => Some((name.clone(), v.clone())),
            Binding::Library(library) => {
                let constants: Map<String, Value> = library
                    .symbols()
                    .into_iter()
                    .filter_map(|symbol| {
                        let value = library.constant(&symbol)?;
                        Some((symbol, number_value(value)))
                    })
                    .collect();
                (!constants.is_empty()).then(|| (name.clone(), Value::Object(constants)))
            }
            Binding::Native(_) => None,
        })
        .collect()
}

/// Key of a by-name reference a runtime returns in place of a callable binding
pub const BINDING_REF: &str = "_binding";

/// Replace `{"_binding": name}` references to host functions with the
/// native-function marker carrying the function's arity
pub fn resolve_binding_refs(value: Value, bindings: &Bindings) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(|v| resolve_binding_refs(v, bindings)).collect()),
        Value::Object(map) => {
            let native = match map.get(BINDING_REF).and_then(Value::as_str) {
                Some(name) if map.len() == 1 => match bindings.get(name) {
                    Some(Binding::Native(func)) => Some(func.arity()),
                    _ => None,
                },
                _ => None,
            };
            if let Some(arity) = native {
                let mut marker = Map::new();
                marker.insert(NATIVE_MARKER.to_string(), Value::Bool(true));
                marker.insert("arity".to_string(), Value::from(arity));
                return Value::Object(marker);
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, resolve_binding_refs(v, bindings)))
                    .collect(),
            )
        }
        other => other,
    }
}

/// Invoke a callable binding by name
///
/// `name` is either a native function name (`trace`) or `module.symbol` for
/// a library export. Library results are returned as `null` (no results),
/// a number (one result) or an array of numbers. A library constant read
/// with no arguments yields its value.
pub fn invoke_binding(bindings: &Bindings, name: &str, args: &[Value]) -> Result<Value, BindingCallError> {
    if let Some(Binding::Native(func)) = bindings.get(name) {
        return func.invoke(args);
    }

    let (module, symbol) = name
        .split_once('.')
        .ok_or_else(|| BindingCallError::UnknownBinding(name.to_string()))?;

    let library = match bindings.get(module) {
        Some(Binding::Library(library)) => library,
        _ => return Err(BindingCallError::UnknownBinding(name.to_string())),
    };

    if args.is_empty() {
        if let Some(value) = library.constant(symbol) {
            return Ok(number_value(value));
        }
    }

    let numeric = args
        .iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.as_f64().ok_or_else(|| BindingCallError::NonNumericArgument {
                name: name.to_string(),
                index,
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let results = library.call(symbol, &numeric)?;
    let mut values: Vec<Value> = results.into_iter().map(number_value).collect();
    Ok(match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Array(values),
    })
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
