//! WebAssembly runtime fixtures shared by the integration tests

#![allow(dead_code)]

use axum::Router;

/// Bump allocator shared by every fixture
const ALLOC: &str = r#"
  (global $heap (mut i32) (i32.const 4096))
  (func $alloc (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    global.get $heap
    local.set $ptr
    global.get $heap
    local.get $len
    i32.add
    global.set $heap
    local.get $ptr)
"#;

const HOOKS: &str = r#"
  (import "governor" "enter" (func $enter))
  (import "governor" "exit" (func $exit))
"#;

fn module(imports: &str, body: &str) -> String {
    format!(
        "(module {imports} (memory (export \"memory\") 1) {ALLOC} {body})",
        imports = imports,
        ALLOC = ALLOC,
        body = body
    )
}

/// Always answers `2`, passing through the hooks once
pub fn constant_runtime() -> String {
    module(
        HOOKS,
        r#"
  (data (i32.const 1024) "{\"value\":2}")
  (func (export "evaluate") (param i32 i32 i32 i32 i32 i32) (result i64)
    call $enter
    call $exit
    i64.const 4398046511115)
"#,
    )
}

/// Recurses through the entry hook without bound
pub fn recursive_runtime() -> String {
    module(
        HOOKS,
        r#"
  (func $recurse
    call $enter
    call $recurse
    call $exit)
  (func (export "evaluate") (param i32 i32 i32 i32 i32 i32) (result i64)
    call $recurse
    i64.const 0)
"#,
    )
}

/// Loops through entry and exit forever at constant depth
pub fn spinning_runtime() -> String {
    module(
        HOOKS,
        r#"
  (func (export "evaluate") (param i32 i32 i32 i32 i32 i32) (result i64)
    (loop $forever
      call $enter
      call $exit
      br $forever)
    i64.const 0)
"#,
    )
}

/// Returns the input document as the value; absent input is undefined.
/// Imports no hooks.
pub fn echo_runtime() -> String {
    module(
        "",
        r#"
  (data (i32.const 1024) "{\"value\":")
  (data (i32.const 1100) "{\"undefined\":true}")
  (func (export "evaluate")
    (param $ep i32) (param $el i32) (param $ip i32) (param $il i32) (param $bp i32) (param $bl i32)
    (result i64)
    (local $out i32) (local $len i32)
    local.get $il
    i32.eqz
    if
      i64.const 4724464025618
      return
    end
    local.get $il
    i32.const 10
    i32.add
    local.set $len
    local.get $len
    call $alloc
    local.set $out
    local.get $out
    i32.const 1024
    i32.const 9
    memory.copy
    local.get $out
    i32.const 9
    i32.add
    local.get $ip
    local.get $il
    memory.copy
    local.get $out
    local.get $len
    i32.add
    i32.const 1
    i32.sub
    i32.const 125
    i32.store8
    local.get $out
    i64.extend_i32_u
    i64.const 32
    i64.shl
    local.get $len
    i64.extend_i32_u
    i64.or)
"#,
    )
}

/// Calls the `add` binding with `[20,22]` and returns its envelope
pub fn invoking_runtime() -> String {
    module(
        r#"(import "env" "invoke" (func $invoke (param i32 i32 i32 i32) (result i64)))"#,
        r#"
  (data (i32.const 1024) "add")
  (data (i32.const 1040) "[20,22]")
  (func (export "evaluate") (param i32 i32 i32 i32 i32 i32) (result i64)
    i32.const 1024
    i32.const 3
    i32.const 1040
    i32.const 7
    call $invoke)
"#,
    )
}

/// Reports an expression error at position 3
pub fn failing_runtime() -> String {
    module(
        "",
        r#"
  (data (i32.const 1024) "{\"error\":{\"message\":\"boom\",\"position\":3}}")
  (func (export "evaluate") (param i32 i32 i32 i32 i32 i32) (result i64)
    i64.const 4398046511145)
"#,
    )
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
