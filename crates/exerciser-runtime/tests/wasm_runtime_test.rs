//! Integration tests for WebAssembly runtimes under the governor

mod common;

use exerciser_core::{
    Binding, Bindings, EvalFailure, GovernorError, GovernorLimits, NativeFunction, Origin, ResultValue,
};
use exerciser_runtime::{Evaluation, ExpressionRuntime, Governor, RuntimeLoadError, WasmRuntime};
use serde_json::json;
use std::time::{Duration, Instant};

fn compile(source: &str) -> WasmRuntime {
    WasmRuntime::from_source(source.as_bytes()).expect("fixture should compile")
}

fn evaluate(
    runtime: &WasmRuntime,
    origin: &Origin,
    limits: GovernorLimits,
    input: Option<serde_json::Value>,
    bindings: &Bindings,
) -> Result<Option<ResultValue>, EvalFailure> {
    let evaluation = Evaluation {
        expression: "a + 1",
        input: input.as_ref(),
        bindings,
    };
    Governor::wrap(runtime, origin, limits).evaluate(&evaluation)
}

#[test]
fn test_capabilities_follow_imports() {
    assert!(compile(&common::constant_runtime()).capabilities().hooks);
    assert!(!compile(&common::echo_runtime()).capabilities().hooks);
    assert!(compile(&common::invoking_runtime()).capabilities().bindings);
    assert!(!compile(&common::constant_runtime()).capabilities().bindings);
}

#[test]
fn test_constant_runtime_succeeds_under_governor() {
    let runtime = compile(&common::constant_runtime());
    let result = evaluate(&runtime, &Origin::latest(), GovernorLimits::default(), None, &Bindings::new());
    assert_eq!(result.unwrap(), Some(ResultValue::Number(2.0)));
}

#[test]
fn test_unbounded_recursion_trips_governor() {
    let runtime = compile(&common::recursive_runtime());
    let started = Instant::now();
    let err = evaluate(&runtime, &Origin::latest(), GovernorLimits::default(), None, &Bindings::new()).unwrap_err();
    assert_eq!(
        err,
        EvalFailure::Governor(GovernorError::StackOverflow { depth: 501, max_depth: 500 })
    );
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_unbounded_recursion_on_local_build_hits_stack_guard() {
    let runtime = compile(&common::recursive_runtime());
    let err = evaluate(&runtime, &Origin::Local, GovernorLimits::default(), None, &Bindings::new()).unwrap_err();
    assert_eq!(err, EvalFailure::StackExhausted);
}

#[test]
fn test_infinite_loop_times_out() {
    let runtime = compile(&common::spinning_runtime());
    let limits = GovernorLimits {
        max_depth: 500,
        timeout_ms: 50,
    };
    let err = evaluate(&runtime, &Origin::latest(), limits, None, &Bindings::new()).unwrap_err();
    assert!(matches!(err, EvalFailure::Governor(GovernorError::Timeout { timeout_ms: 50, .. })));
}

#[test]
fn test_echo_passes_input_document() {
    let runtime = compile(&common::echo_runtime());
    let result = evaluate(
        &runtime,
        &Origin::latest(),
        GovernorLimits::default(),
        Some(json!({"a": 1, "b": [true, null]})),
        &Bindings::new(),
    )
    .unwrap();
    assert_eq!(result, Some(ResultValue::from(json!({"a": 1, "b": [true, null]}))));
}

#[test]
fn test_absent_input_is_undefined() {
    let runtime = compile(&common::echo_runtime());
    let result = evaluate(&runtime, &Origin::latest(), GovernorLimits::default(), None, &Bindings::new()).unwrap();
    assert_eq!(result, None);
}

#[test]
fn test_runtime_invokes_native_binding() {
    let runtime = compile(&common::invoking_runtime());
    let mut bindings = Bindings::new();
    bindings.insert(
        "add".into(),
        Binding::Native(NativeFunction::new("add", 2, |args| {
            let sum: f64 = args.iter().filter_map(|a| a.as_f64()).sum();
            Ok(json!(sum))
        })),
    );
    let result = evaluate(&runtime, &Origin::latest(), GovernorLimits::default(), None, &bindings).unwrap();
    assert_eq!(result, Some(ResultValue::Number(42.0)));
}

#[test]
fn test_missing_binding_surfaces_as_expression_error() {
    let runtime = compile(&common::invoking_runtime());
    let err = evaluate(&runtime, &Origin::latest(), GovernorLimits::default(), None, &Bindings::new()).unwrap_err();
    match err {
        EvalFailure::Expression { message, .. } => assert!(message.contains("unknown binding 'add'")),
        other => panic!("expected expression error, got {:?}", other),
    }
}

#[test]
fn test_runtime_error_envelope() {
    let runtime = compile(&common::failing_runtime());
    let err = evaluate(&runtime, &Origin::latest(), GovernorLimits::default(), None, &Bindings::new()).unwrap_err();
    assert_eq!(
        err,
        EvalFailure::Expression {
            message: "boom".into(),
            position: Some(3),
            code: None,
        }
    );
}

#[test]
fn test_module_without_evaluate_rejected() {
    let source = r#"(module (memory (export "memory") 1) (func (export "alloc") (param i32) (result i32) i32.const 0))"#;
    let err = WasmRuntime::from_source(source.as_bytes()).err().unwrap();
    assert!(matches!(err, RuntimeLoadError::MissingExport("evaluate")));
}

#[test]
fn test_unknown_import_rejected() {
    let source = r#"(module
      (import "wasi" "fd_write" (func))
      (memory (export "memory") 1)
      (func (export "alloc") (param i32) (result i32) i32.const 0)
      (func (export "evaluate") (param i32 i32 i32 i32 i32 i32) (result i64) i64.const 0))"#;
    let err = WasmRuntime::from_source(source.as_bytes()).err().unwrap();
    match err {
        RuntimeLoadError::UnsupportedImport { module, name } => {
            assert_eq!(module, "wasi");
            assert_eq!(name, "fd_write");
        }
        other => panic!("expected unsupported import, got {:?}", other),
    }
}

#[test]
fn test_garbage_source_rejected() {
    let err = WasmRuntime::from_source(b"definitely not wasm").err().unwrap();
    assert!(matches!(err, RuntimeLoadError::Compile(_)));
}
