//! Runtime Registry installs against a local HTTP distribution point

mod common;

use axum::routing::get;
use axum::{Json, Router};
use exerciser_core::{Bindings, Endpoints, Origin, ResultValue};
use exerciser_runtime::{fetch_versions, Evaluation, RuntimeRegistry};
use serde_json::json;
use std::time::Duration;

fn endpoints(base: &str) -> Endpoints {
    Endpoints {
        release_url: format!("{}/release/{{version}}/runtime.wat", base),
        branch_url: format!("{}/branch/{{branch}}/runtime.wat", base),
        local_runtime_url: format!("{}/local/runtime.wat", base),
        manifest_url: format!("{}/versions.json", base),
        ..Endpoints::default()
    }
}

fn distribution() -> Router {
    Router::new()
        .route("/release/1.8.6/runtime.wat", get(|| async { common::constant_runtime() }))
        .route("/local/runtime.wat", get(|| async { common::echo_runtime() }))
        .route(
            "/branch/slow/runtime.wat",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                common::failing_runtime()
            }),
        )
        .route("/branch/broken/runtime.wat", get(|| async { "(module" }))
        .route(
            "/versions.json",
            get(|| async { Json(json!({ "versions": ["1.8.6", "1.8.5"] })) }),
        )
}

#[tokio::test]
async fn test_load_runtime_from_release() {
    let base = common::serve(distribution()).await;
    let registry = RuntimeRegistry::new(reqwest::Client::new(), endpoints(&base));

    let handle = registry.load_runtime(Origin::TaggedRelease("1.8.6".into())).await;
    assert!(handle.loaded, "load error: {:?}", handle.load_error);
    assert!(!handle.bindings_available);

    let live = registry.live().unwrap();
    let bindings = Bindings::new();
    let evaluation = Evaluation {
        expression: "1 + 1",
        input: None,
        bindings: &bindings,
    };
    assert_eq!(
        live.runtime.evaluate(&evaluation, None).unwrap(),
        Some(ResultValue::Number(2.0))
    );
}

#[tokio::test]
async fn test_install_in_background_then_wait_ready() {
    let base = common::serve(distribution()).await;
    let registry = RuntimeRegistry::new(reqwest::Client::new(), endpoints(&base));

    let pending = registry.install_runtime(Origin::Local);
    assert!(!pending.loaded);
    assert_eq!(pending.origin, Origin::Local);

    let live = tokio::time::timeout(Duration::from_secs(5), registry.wait_ready(Duration::from_millis(10)))
        .await
        .expect("runtime should become ready");
    assert_eq!(live.origin, Origin::Local);
    assert_eq!(live.generation, pending.generation);
}

#[tokio::test]
async fn test_superseded_install_is_discarded() {
    let base = common::serve(distribution()).await;
    let registry = RuntimeRegistry::new(reqwest::Client::new(), endpoints(&base));

    let slow = registry.install_runtime(Origin::Branch("slow".into()));
    let fast = registry.load_runtime(Origin::TaggedRelease("1.8.6".into())).await;
    assert!(fast.loaded);
    assert!(fast.generation > slow.generation);

    // Let the slow fetch land; it must not replace the newer runtime
    tokio::time::sleep(Duration::from_millis(500)).await;
    let handle = registry.handle();
    assert_eq!(handle.origin, Origin::TaggedRelease("1.8.6".into()));
    assert_eq!(handle.generation, fast.generation);
    assert!(handle.loaded);
}

#[tokio::test]
async fn test_broken_runtime_leaves_registry_unready() {
    let base = common::serve(distribution()).await;
    let registry = RuntimeRegistry::new(reqwest::Client::new(), endpoints(&base));

    let handle = registry.load_runtime(Origin::Branch("broken".into())).await;
    assert!(!handle.loaded);
    assert!(handle.load_error.unwrap().contains("compile"));
    assert!(!registry.is_ready());
}

#[tokio::test]
async fn test_missing_release_reports_status() {
    let base = common::serve(distribution()).await;
    let registry = RuntimeRegistry::new(reqwest::Client::new(), endpoints(&base));

    let handle = registry.load_runtime(Origin::TaggedRelease("0.0.1".into())).await;
    assert!(!handle.loaded);
    assert!(handle.load_error.unwrap().contains("404"));
}

#[tokio::test]
async fn test_fetch_versions_offers_local_first() {
    let base = common::serve(distribution()).await;
    let client = reqwest::Client::new();
    let url = format!("{}/versions.json", base);

    assert_eq!(fetch_versions(&client, &url, false).await.unwrap(), vec!["1.8.6", "1.8.5"]);
    assert_eq!(
        fetch_versions(&client, &url, true).await.unwrap(),
        vec!["local", "1.8.6", "1.8.5"]
    );
}
