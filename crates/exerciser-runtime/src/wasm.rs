//! WebAssembly expression runtimes
//!
//! A runtime module is compiled once at install time and instantiated into a
//! fresh `Store` for every evaluation, so no guest state survives between
//! evaluations.
//!
//! # ABI
//!
//! ```text
//! exports:
//!   memory
//!   alloc(len: i32) -> i32
//!   evaluate(expr_ptr, expr_len, input_ptr, input_len,
//!            bindings_ptr, bindings_len: i32) -> i64      ;; fat pointer
//! optional imports:
//!   governor.enter()                                      ;; step entry hook
//!   governor.exit()                                       ;; step exit hook
//!   env.invoke(name_ptr, name_len, args_ptr, args_len: i32) -> i64
//! ```
//!
//! Fat pointers are `offset << 32 | len`. `evaluate` returns a JSON envelope:
//! `{"value": ..}`, `{"undefined": true}` or
//! `{"error": {"message": .., "position": ..?, "code": ..?}}`.
//! `input_len == 0` means the input document is absent. `bindings` carries
//! the value bindings as a JSON object (library constants appear as
//! `{module: {symbol: n}}`); callable bindings are reached through
//! `env.invoke`, which answers with a `{"value": ..}` or `{"error": ..}`
//! envelope allocated through the guest's `alloc`.
//!
//! Function values inside a `value`: `{"_jsonata_lambda": true, "signature":
//! {"definition": ..}}` for expression-language functions,
//! `{"_jsonata_native": true, "arity": n}` for host functions, or
//! `{"_binding": name}` naming a host function binding, which the host
//! resolves to its arity.

use crate::error::RuntimeLoadError;
use crate::registry::RuntimeLoader;
use crate::runtime::{Evaluation, EvaluationHooks, ExpressionRuntime, RuntimeCapabilities};
use exerciser_core::{
    invoke_binding, resolve_binding_refs, value_bindings, Bindings, EvalFailure, GovernorError, Origin, ResultValue,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use wasmtime::{AsContext, AsContextMut, Caller, Engine, Extern, Linker, Memory, Module, Store, Trap, TypedFunc};

const HOOK_MODULE: &str = "governor";
const HOST_MODULE: &str = "env";

type EvaluateParams = (i32, i32, i32, i32, i32, i32);

/// Data owned by the store of one evaluation
struct HostState {
    hooks: Option<Box<dyn EvaluationHooks>>,
    bindings: Bindings,
}

/// An expression runtime backed by a compiled WebAssembly module
pub struct WasmRuntime {
    engine: Engine,
    module: Module,
    linker: Linker<HostState>,
    capabilities: RuntimeCapabilities,
}

impl WasmRuntime {
    /// Compile a runtime from WebAssembly binary or text
    pub fn from_source(source: &[u8]) -> Result<Self, RuntimeLoadError> {
        let engine = Engine::default();
        let module = Module::new(&engine, source).map_err(|e| RuntimeLoadError::Compile(format!("{:#}", e)))?;

        for required in ["memory", "alloc", "evaluate"] {
            if module.get_export(required).is_none() {
                return Err(RuntimeLoadError::MissingExport(required));
            }
        }

        let mut capabilities = RuntimeCapabilities::default();
        let mut hook_imports = 0;
        for import in module.imports() {
            match (import.module(), import.name()) {
                (HOOK_MODULE, "enter") | (HOOK_MODULE, "exit") => hook_imports += 1,
                (HOST_MODULE, "invoke") => capabilities.bindings = true,
                (module, name) => {
                    return Err(RuntimeLoadError::UnsupportedImport {
                        module: module.to_string(),
                        name: name.to_string(),
                    })
                }
            }
        }
        capabilities.hooks = hook_imports == 2;

        let linker = host_linker(&engine).map_err(|e| RuntimeLoadError::Compile(format!("{:#}", e)))?;

        Ok(Self {
            engine,
            module,
            linker,
            capabilities,
        })
    }
}

impl ExpressionRuntime for WasmRuntime {
    fn capabilities(&self) -> RuntimeCapabilities {
        self.capabilities
    }

    fn evaluate(
        &self,
        evaluation: &Evaluation<'_>,
        hooks: Option<Box<dyn EvaluationHooks>>,
    ) -> Result<Option<ResultValue>, EvalFailure> {
        let mut store = Store::new(
            &self.engine,
            HostState {
                hooks,
                bindings: evaluation.bindings.clone(),
            },
        );

        let instance = self
            .linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| classify(e, "instantiate"))?;
        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| EvalFailure::Runtime("runtime does not export memory".into()))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "alloc")
            .map_err(|e| classify(e, "alloc"))?;
        let evaluate = instance
            .get_typed_func::<EvaluateParams, i64>(&mut store, "evaluate")
            .map_err(|e| classify(e, "evaluate"))?;

        let input = evaluation.input.map(Value::to_string).unwrap_or_default();
        let bindings = Value::Object(value_bindings(evaluation.bindings)).to_string();

        let (expr_ptr, expr_len) = write_guest(&mut store, &memory, &alloc, evaluation.expression.as_bytes())?;
        let (input_ptr, input_len) = write_guest(&mut store, &memory, &alloc, input.as_bytes())?;
        let (bindings_ptr, bindings_len) = write_guest(&mut store, &memory, &alloc, bindings.as_bytes())?;

        let result = evaluate
            .call(
                &mut store,
                (expr_ptr, expr_len, input_ptr, input_len, bindings_ptr, bindings_len),
            )
            .map_err(|e| classify(e, "evaluate"))?;

        let envelope = read_fat_ptr(&memory, &store, result).map_err(|e| EvalFailure::Runtime(format!("{:#}", e)))?;
        decode_envelope(&envelope, evaluation.bindings)
    }
}

/// Loads runtimes from WebAssembly modules
#[derive(Debug, Default, Clone, Copy)]
pub struct WasmRuntimeLoader;

impl RuntimeLoader for WasmRuntimeLoader {
    fn load(&self, origin: &Origin, source: &[u8]) -> Result<Arc<dyn ExpressionRuntime>, RuntimeLoadError> {
        let runtime = WasmRuntime::from_source(source)?;
        info!(
            %origin,
            hooks = runtime.capabilities.hooks,
            bindings = runtime.capabilities.bindings,
            "compiled runtime module"
        );
        Ok(Arc::new(runtime))
    }
}

/// Host functions every runtime instance is linked against
fn host_linker(engine: &Engine) -> wasmtime::Result<Linker<HostState>> {
    let mut linker = Linker::new(engine);

    linker.func_wrap(HOOK_MODULE, "enter", |mut caller: Caller<'_, HostState>| -> wasmtime::Result<()> {
        match caller.data_mut().hooks.as_mut() {
            Some(hooks) => hooks.enter().map_err(wasmtime::Error::new),
            None => Ok(()),
        }
    })?;

    linker.func_wrap(HOOK_MODULE, "exit", |mut caller: Caller<'_, HostState>| -> wasmtime::Result<()> {
        match caller.data_mut().hooks.as_mut() {
            Some(hooks) => hooks.exit().map_err(wasmtime::Error::new),
            None => Ok(()),
        }
    })?;

    linker.func_wrap(
        HOST_MODULE,
        "invoke",
        |mut caller: Caller<'_, HostState>,
         name_ptr: i32,
         name_len: i32,
         args_ptr: i32,
         args_len: i32|
         -> wasmtime::Result<i64> {
            let memory = caller_memory(&mut caller)?;
            let name = read_guest(&memory, &caller, name_ptr, name_len)?;
            let args_text = read_guest(&memory, &caller, args_ptr, args_len)?;
            let args: Vec<Value> = if args_text.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&args_text)?
            };

            debug!(binding = %name, "runtime invoked binding");
            let envelope = match invoke_binding(&caller.data().bindings, &name, &args) {
                Ok(value) => json!({ "value": value }),
                Err(err) => json!({ "error": { "message": err.to_string() } }),
            };

            let alloc = caller
                .get_export("alloc")
                .and_then(Extern::into_func)
                .ok_or_else(|| wasmtime::Error::msg("runtime does not export alloc"))?
                .typed::<i32, i32>(&caller)?;
            let bytes = envelope.to_string().into_bytes();
            let ptr = alloc.call(&mut caller, bytes.len() as i32)?;
            memory.write(&mut caller, ptr as usize, &bytes)?;
            Ok(fat_ptr(ptr, bytes.len() as i32))
        },
    )?;

    Ok(linker)
}

fn caller_memory(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<Memory> {
    caller
        .get_export("memory")
        .and_then(Extern::into_memory)
        .ok_or_else(|| wasmtime::Error::msg("runtime does not export memory"))
}

/// Copy `bytes` into guest memory; empty input is passed as a null pointer
fn write_guest(
    store: &mut Store<HostState>,
    memory: &Memory,
    alloc: &TypedFunc<i32, i32>,
    bytes: &[u8],
) -> Result<(i32, i32), EvalFailure> {
    if bytes.is_empty() {
        return Ok((0, 0));
    }
    let len = i32::try_from(bytes.len()).map_err(|_| EvalFailure::Runtime("argument too large".into()))?;
    let ptr = alloc.call(&mut *store, len).map_err(|e| classify(e, "alloc"))?;
    memory
        .write(store.as_context_mut(), ptr as usize, bytes)
        .map_err(|e| EvalFailure::Runtime(format!("alloc returned an invalid pointer: {}", e)))?;
    Ok((ptr, len))
}

fn read_guest(memory: &Memory, store: impl AsContext, ptr: i32, len: i32) -> wasmtime::Result<String> {
    if len == 0 {
        return Ok(String::new());
    }
    let start = ptr as u32 as usize;
    let end = start + len as u32 as usize;
    let bytes = memory
        .data(&store)
        .get(start..end)
        .ok_or_else(|| wasmtime::Error::msg(format!("guest range {}..{} out of bounds", start, end)))?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn read_fat_ptr(memory: &Memory, store: impl AsContext, fat: i64) -> wasmtime::Result<String> {
    let offset = ((fat as u64) >> 32) as i32;
    let len = ((fat as u64) & 0xFFFF_FFFF) as i32;
    read_guest(memory, store, offset, len)
}

fn fat_ptr(ptr: i32, len: i32) -> i64 {
    (((ptr as u32) as i64) << 32) | ((len as u32) as i64)
}

/// Map a wasmtime error to the failure it stands for
fn classify(err: wasmtime::Error, during: &str) -> EvalFailure {
    if let Some(governor) = err.downcast_ref::<GovernorError>() {
        return EvalFailure::Governor(*governor);
    }
    if let Some(Trap::StackOverflow) = err.downcast_ref::<Trap>() {
        return EvalFailure::StackExhausted;
    }
    EvalFailure::Runtime(format!("{}: {:#}", during, err))
}

fn decode_envelope(text: &str, bindings: &Bindings) -> Result<Option<ResultValue>, EvalFailure> {
    let envelope: Value = serde_json::from_str(text)
        .map_err(|e| EvalFailure::Runtime(format!("malformed result envelope: {}", e)))?;
    let map = envelope
        .as_object()
        .ok_or_else(|| EvalFailure::Runtime("result envelope is not an object".into()))?;

    if let Some(error) = map.get("error") {
        return Err(EvalFailure::Expression {
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            position: error.get("position").and_then(Value::as_u64).map(|p| p as usize),
            code: error.get("code").and_then(Value::as_str).map(str::to_string),
        });
    }
    if let Some(value) = map.get("value") {
        return Ok(Some(ResultValue::from(resolve_binding_refs(value.clone(), bindings))));
    }
    if map.get("undefined") == Some(&Value::Bool(true)) {
        return Ok(None);
    }
    Err(EvalFailure::Runtime(
        "result envelope has no value, undefined or error member".into(),
    ))
}
