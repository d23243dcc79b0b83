//! Instantiated library modules
//!
//! A library is instantiated once, when it loads, and its instance lives as
//! long as the handle. Calls go through a mutex because a wasmtime `Store`
//! needs exclusive access.

use crate::error::LibraryLoadError;
use exerciser_core::{BindingCallError, ModuleBinding};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use wasmtime::{Engine, ExternType, Instance, Module, Store, Val, ValType};

/// What an export is
#[derive(Debug, Clone, PartialEq)]
pub enum ExportKind {
    Function { params: usize, results: usize },
    /// Numeric global, read at load time
    Global { value: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryExport {
    pub name: String,
    pub kind: ExportKind,
}

struct Instantiated {
    store: Store<()>,
    instance: Instance,
}

/// A compiled and instantiated extension library
pub struct LibraryModule {
    name: String,
    exports: Vec<LibraryExport>,
    inner: Mutex<Instantiated>,
}

impl LibraryModule {
    /// Compile and instantiate `source` (WebAssembly binary or text) under `name`
    pub fn from_source(name: &str, source: &[u8]) -> Result<Self, LibraryLoadError> {
        let engine = Engine::default();
        let module = Module::new(&engine, source).map_err(|e| LibraryLoadError::Compile(format!("{:#}", e)))?;

        if let Some(import) = module.imports().next() {
            return Err(LibraryLoadError::RequiresImports {
                module: import.module().to_string(),
                name: import.name().to_string(),
            });
        }

        let mut store = Store::new(&engine, ());
        let instance =
            Instance::new(&mut store, &module, &[]).map_err(|e| LibraryLoadError::Instantiate(format!("{:#}", e)))?;

        let mut exports = Vec::new();
        for export in module.exports() {
            let kind = match export.ty() {
                ExternType::Func(func) => ExportKind::Function {
                    params: func.params().len(),
                    results: func.results().len(),
                },
                ExternType::Global(_) => {
                    let value = instance
                        .get_global(&mut store, export.name())
                        .and_then(|global| from_val(&global.get(&mut store)));
                    match value {
                        Some(value) => ExportKind::Global { value },
                        None => continue,
                    }
                }
                // memories and tables are not reachable from expressions
                _ => continue,
            };
            exports.push(LibraryExport {
                name: export.name().to_string(),
                kind,
            });
        }

        Ok(Self {
            name: name.to_string(),
            exports,
            inner: Mutex::new(Instantiated { store, instance }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exports(&self) -> &[LibraryExport] {
        &self.exports
    }

    fn qualified(&self, symbol: &str) -> String {
        format!("{}.{}", self.name, symbol)
    }
}

impl ModuleBinding for LibraryModule {
    fn module_name(&self) -> &str {
        &self.name
    }

    fn symbols(&self) -> Vec<String> {
        self.exports.iter().map(|e| e.name.clone()).collect()
    }

    fn call(&self, symbol: &str, args: &[f64]) -> Result<Vec<f64>, BindingCallError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Instantiated { store, instance } = &mut *guard;

        let func = instance
            .get_func(&mut *store, symbol)
            .ok_or_else(|| BindingCallError::UnknownSymbol {
                module: self.name.clone(),
                symbol: symbol.to_string(),
            })?;
        let ty = func.ty(&*store);

        let expected = ty.params().len();
        if expected != args.len() {
            return Err(BindingCallError::Arity {
                name: self.qualified(symbol),
                expected,
                got: args.len(),
            });
        }

        let params = ty
            .params()
            .zip(args)
            .map(|(ty, &arg)| to_val(&ty, arg))
            .collect::<Option<Vec<Val>>>()
            .ok_or_else(|| BindingCallError::Failed {
                name: self.qualified(symbol),
                message: "export takes non-numeric parameters".into(),
            })?;

        let mut results = vec![Val::I32(0); ty.results().len()];
        func.call(&mut *store, &params, &mut results)
            .map_err(|e| BindingCallError::Failed {
                name: self.qualified(symbol),
                message: format!("{:#}", e),
            })?;

        results
            .iter()
            .map(from_val)
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| BindingCallError::Failed {
                name: self.qualified(symbol),
                message: "export returned a non-numeric result".into(),
            })
    }

    fn constant(&self, symbol: &str) -> Option<f64> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Instantiated { store, instance } = &mut *guard;
        let global = instance.get_global(&mut *store, symbol)?;
        from_val(&global.get(&mut *store))
    }
}

impl fmt::Debug for LibraryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibraryModule")
            .field("name", &self.name)
            .field("exports", &self.exports)
            .finish()
    }
}

fn to_val(ty: &ValType, arg: f64) -> Option<Val> {
    match ty {
        ValType::I32 => Some(Val::I32(arg as i32)),
        ValType::I64 => Some(Val::I64(arg as i64)),
        ValType::F32 => Some(Val::F32((arg as f32).to_bits())),
        ValType::F64 => Some(Val::F64(arg.to_bits())),
        _ => None,
    }
}

fn from_val(val: &Val) -> Option<f64> {
    match val {
        Val::I32(v) => Some(*v as f64),
        Val::I64(v) => Some(*v as f64),
        Val::F32(bits) => Some(f32::from_bits(*bits) as f64),
        Val::F64(bits) => Some(f64::from_bits(*bits)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATH: &str = r#"
(module
  (global (export "answer") i32 (i32.const 42))
  (global (export "tau") f64 (f64.const 6.283185307179586))
  (memory (export "memory") 1)
  (func (export "add") (param i32 i32) (result i32)
    local.get 0
    local.get 1
    i32.add)
  (func (export "half") (param f64) (result f64)
    local.get 0
    f64.const 0.5
    f64.mul)
  (func (export "divmod") (param i64 i64) (result i64 i64)
    local.get 0
    local.get 1
    i64.div_s
    local.get 0
    local.get 1
    i64.rem_s)
  (func (export "noop")))
"#;

    fn math() -> LibraryModule {
        LibraryModule::from_source("math", MATH.as_bytes()).unwrap()
    }

    #[test]
    fn test_exports_listed_without_memory() {
        let module = math();
        let names: Vec<_> = module.exports().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["answer", "tau", "add", "half", "divmod", "noop"]);
        assert_eq!(
            module.exports()[2].kind,
            ExportKind::Function { params: 2, results: 1 }
        );
        assert_eq!(module.exports()[0].kind, ExportKind::Global { value: 42.0 });
    }

    #[test]
    fn test_call_converts_to_parameter_types() {
        let module = math();
        assert_eq!(module.call("add", &[2.0, 40.0]).unwrap(), vec![42.0]);
        assert_eq!(module.call("half", &[5.0]).unwrap(), vec![2.5]);
        assert_eq!(module.call("divmod", &[17.0, 5.0]).unwrap(), vec![3.0, 2.0]);
        assert_eq!(module.call("noop", &[]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_constants() {
        let module = math();
        assert_eq!(module.constant("answer"), Some(42.0));
        assert_eq!(module.constant("tau"), Some(std::f64::consts::TAU));
        assert_eq!(module.constant("missing"), None);
    }

    #[test]
    fn test_arity_mismatch() {
        let err = math().call("add", &[1.0]).unwrap_err();
        assert_eq!(
            err,
            BindingCallError::Arity {
                name: "math.add".into(),
                expected: 2,
                got: 1,
            }
        );
    }

    #[test]
    fn test_unknown_symbol() {
        let err = math().call("sub", &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, BindingCallError::UnknownSymbol { .. }));
    }

    #[test]
    fn test_trap_is_call_failure() {
        let err = math().call("divmod", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, BindingCallError::Failed { .. }));
    }

    #[test]
    fn test_imports_rejected() {
        let source = r#"(module (import "env" "log" (func (param i32))))"#;
        let err = LibraryModule::from_source("logger", source.as_bytes()).unwrap_err();
        assert!(matches!(err, LibraryLoadError::RequiresImports { .. }));
    }

    #[test]
    fn test_invalid_source_rejected() {
        let err = LibraryModule::from_source("junk", b"function add(a, b) { return a + b }").unwrap_err();
        assert!(matches!(err, LibraryLoadError::Compile(_)));
    }
}
