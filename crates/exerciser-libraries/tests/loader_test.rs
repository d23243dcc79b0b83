//! Library loading against a local HTTP server

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use exerciser_core::{invoke_binding, value_bindings, Binding, FetchError};
use exerciser_libraries::{library_bindings, ExportKind, ExternalLibrarySpec, LibraryLoadError, LibraryLoader};
use serde_json::json;
use std::time::Duration;

const ALPHA: &str = r#"(module (func (export "double") (param f64) (result f64) local.get 0 f64.const 2 f64.mul))"#;
const GAMMA: &str = r#"(module (global (export "c") f64 (f64.const 299792458)))"#;

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn library_server() -> Router {
    Router::new()
        .route(
            "/alpha.wat",
            get(|| async {
                // finishes last, so completion order differs from spec order
                tokio::time::sleep(Duration::from_millis(100)).await;
                ALPHA
            }),
        )
        .route("/beta.wat", get(|| async { (StatusCode::NOT_FOUND, "no such library") }))
        .route("/gamma.wat", get(|| async { GAMMA }))
        .route("/empty.wat", get(|| async { "" }))
        .route("/script.js", get(|| async { "function f() { return 1 }" }))
}

#[tokio::test]
async fn test_failing_library_is_isolated() {
    let base = serve(library_server()).await;
    let loader = LibraryLoader::new(reqwest::Client::new());
    let specs = vec![
        ExternalLibrarySpec::new(format!("{}/alpha.wat", base), "A"),
        ExternalLibrarySpec::new(format!("{}/beta.wat", base), "B"),
        ExternalLibrarySpec::new(format!("{}/gamma.wat", base), "C"),
    ];

    let handles = loader.load_libraries(&specs).await;
    assert_eq!(handles.len(), 3);
    let names: Vec<_> = handles.iter().map(|h| h.module_name()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);

    assert!(handles[0].is_loaded());
    assert!(handles[0].load_error().is_none());
    assert_eq!(handles[0].exports()[0].name, "double");

    assert!(!handles[1].is_loaded());
    assert!(handles[1].exports().is_empty());
    assert!(matches!(
        handles[1].load_error(),
        Some(LibraryLoadError::Fetch(FetchError::Status { status: 404, .. }))
    ));

    assert!(handles[2].is_loaded());
    assert_eq!(handles[2].exports()[0].kind, ExportKind::Global { value: 299792458.0 });

    let bindings = library_bindings(&handles);
    assert_eq!(bindings.keys().collect::<Vec<_>>(), vec!["A", "C"]);
    assert!(matches!(bindings["A"], Binding::Library(_)));
    assert_eq!(invoke_binding(&bindings, "A.double", &[json!(21)]).unwrap(), json!(42));
}

#[tokio::test]
async fn test_library_constant_is_readable() {
    let base = serve(library_server()).await;
    let loader = LibraryLoader::new(reqwest::Client::new());
    let handles = loader
        .load_libraries(&[ExternalLibrarySpec::new(format!("{}/gamma.wat", base), "C")])
        .await;

    let bindings = library_bindings(&handles);
    assert_eq!(invoke_binding(&bindings, "C.c", &[]).unwrap(), json!(299792458));
    assert_eq!(value_bindings(&bindings)["C"], json!({"c": 299792458}));
}

#[tokio::test]
async fn test_empty_and_non_module_sources_fail() {
    let base = serve(library_server()).await;
    let loader = LibraryLoader::new(reqwest::Client::new());

    let empty = loader
        .load_library(&ExternalLibrarySpec::new(format!("{}/empty.wat", base), "empty"))
        .await;
    assert!(matches!(
        empty.load_error(),
        Some(LibraryLoadError::Fetch(FetchError::Empty { .. }))
    ));

    let script = loader
        .load_library(&ExternalLibrarySpec::new(format!("{}/script.js", base), "script"))
        .await;
    assert!(matches!(script.load_error(), Some(LibraryLoadError::Compile(_))));
}

#[tokio::test]
async fn test_unreachable_host_fails_without_panicking() {
    let loader = LibraryLoader::new(reqwest::Client::new());
    let handles = loader
        .load_libraries(&[ExternalLibrarySpec::new("http://127.0.0.1:9/lib.wat", "gone")])
        .await;
    assert!(matches!(
        handles[0].load_error(),
        Some(LibraryLoadError::Fetch(FetchError::Transport { .. }))
    ));
}

#[tokio::test]
async fn test_no_specs_no_handles() {
    let loader = LibraryLoader::new(reqwest::Client::new());
    assert!(loader.load_libraries(&[]).await.is_empty());
}
