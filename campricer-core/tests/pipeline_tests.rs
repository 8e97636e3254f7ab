//! Upload pipeline integration tests
//!
//! Runs the real pipeline against a local mock recognition service so both
//! upload policies, the search path, and failure isolation are exercised
//! end-to-end: prepare -> call -> parse -> sink.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use campricer_core::services::image_preparer::{ImageAsset, PrepareOptions};
use campricer_core::services::search::{run_search, SearchError};
use campricer_core::services::upload_pipeline::{run_upload, UploadPolicy};
use campricer_core::AppState;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Shared state of the mock recognition service
#[derive(Clone, Default)]
struct MockService {
    calls: Arc<AtomicUsize>,
    fail_on_call: Option<usize>,
    malformed: bool,
    last_body: Arc<Mutex<Option<Value>>>,
}

impl MockService {
    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }
}

fn fenced(document: &Value) -> Value {
    json!({ "result": format!("```json\n{document}\n```") })
}

async fn identify(State(service): State<MockService>, Json(body): Json<Value>) -> axum::response::Response {
    let call = service.calls.fetch_add(1, Ordering::SeqCst) + 1;
    *service.last_body.lock().unwrap() = Some(body.clone());

    if service.fail_on_call == Some(call) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "synthetic failure").into_response();
    }
    if service.malformed {
        return Json(json!({ "result": "the model rambled instead of answering" })).into_response();
    }

    let document = if body.get("batchMode").and_then(Value::as_bool) == Some(true) {
        let angles = body["images"].as_array().map(|a| a.len()).unwrap_or(0);
        json!({
            "camera": format!("Batch Subject ({angles} angles)"),
            "estimated_resale_value": { "eBay": "$300", "Amazon": "$350" },
            "camera_information": { "information": "Combined multi-angle identification." }
        })
    } else {
        json!({
            "camera": format!("Camera {call}"),
            "estimated_resale_value": { "eBay": "$100" },
            "camera_information": { "information": "Single-image identification." }
        })
    };
    Json(fenced(&document)).into_response()
}

async fn search_endpoint(
    State(service): State<MockService>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    service.calls.fetch_add(1, Ordering::SeqCst);
    *service.last_body.lock().unwrap() = Some(body.clone());

    let name = body["cameraName"].as_str().unwrap_or("Unknown").to_string();
    let document = json!({
        "camera": name,
        "estimated_resale_value": { "eBay": "$75 - $125" },
        "camera_information": { "description": "Found by text lookup." }
    });
    Json(fenced(&document)).into_response()
}

async fn spawn_service(service: MockService) -> String {
    let app = Router::new()
        .route("/identifyCamera", post(identify))
        .route("/textCameraLookUpOpenAIAPI", post(search_endpoint))
        .with_state(service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn write_images(dir: &TempDir, count: usize) -> Vec<ImageAsset> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("shot_{i}.jpg"));
            std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, i as u8]).unwrap();
            ImageAsset::from_path(path)
        })
        .collect()
}

async fn test_state(base_url: &str, dir: &TempDir) -> AppState {
    AppState::init(base_url, "TestOS", &dir.path().join("data"))
        .await
        .unwrap()
}

#[tokio::test]
async fn per_item_upload_sinks_one_group_per_image() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 3);

    let outcome = run_upload(
        &state,
        &assets,
        UploadPolicy::PerItem,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    assert_eq!(outcome.accepted, 3);
    assert!(outcome.failures.is_empty());
    assert_eq!(service.call_count(), 3);

    let results = state.results.lock().await;
    assert_eq!(results.groups().len(), 3);
    // Newest first: the last image uploaded leads the list
    assert_eq!(results.groups()[0].records[0].title, "Camera 3");
    assert_eq!(
        results.groups()[2].image_key.as_deref(),
        Some(assets[0].key().as_str())
    );

    let recents = state.recents.lock().await;
    assert_eq!(recents.len(), 3);
}

#[tokio::test]
async fn per_item_failure_is_isolated_to_one_image() {
    let service = MockService {
        fail_on_call: Some(2),
        ..MockService::default()
    };
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 3);

    let outcome = run_upload(
        &state,
        &assets,
        UploadPolicy::PerItem,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    // Images 1 and 3 still land; only image 2 is reported
    assert_eq!(outcome.accepted, 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert_eq!(
        outcome.failures[0].image.as_deref(),
        Some(assets[1].key().as_str())
    );
    assert!(outcome.failure_summary(assets.len()).is_some());
    assert_eq!(service.call_count(), 3);

    let results = state.results.lock().await;
    assert_eq!(results.groups().len(), 2);
    assert!(!state.is_loading());
}

#[tokio::test]
async fn batch_upload_yields_one_group_keyed_by_first_image() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 3);

    let outcome = run_upload(
        &state,
        &assets,
        UploadPolicy::SingleBatch,
        "JPY",
        &PrepareOptions::default(),
    )
    .await;

    assert_eq!(outcome.accepted, 1);
    assert!(outcome.failures.is_empty());
    assert_eq!(service.call_count(), 1);

    let results = state.results.lock().await;
    assert_eq!(results.groups().len(), 1);
    let group = &results.groups()[0];
    assert_eq!(group.image_key.as_deref(), Some(assets[0].key().as_str()));
    assert_eq!(group.records.len(), 1);
    assert_eq!(group.records[0].title, "Batch Subject (3 angles)");

    // The single combined request carried the batch flag and the region
    let body = service.last_body().unwrap();
    assert_eq!(body["batchMode"], true);
    assert_eq!(body["region"], "Japan");
    assert_eq!(body["source"], "TestOS");
    assert_eq!(body["images"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn single_image_always_runs_per_item() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 1);

    let outcome = run_upload(
        &state,
        &assets,
        UploadPolicy::SingleBatch,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    assert_eq!(outcome.accepted, 1);
    let body = service.last_body().unwrap();
    assert!(body.get("batchMode").is_none());
    assert!(body.get("image").is_some());
    assert_eq!(body["name"], "shot_0.jpg");
    assert_eq!(body["type"], "image/jpeg");
}

#[tokio::test]
async fn batch_with_missing_file_aborts_before_network() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;

    let mut assets = write_images(&dir, 2);
    assets.insert(1, ImageAsset::from_path(dir.path().join("missing.jpg")));

    let outcome = run_upload(
        &state,
        &assets,
        UploadPolicy::SingleBatch,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    assert_eq!(outcome.accepted, 0);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].index, 1);
    assert_eq!(service.call_count(), 0);
    assert!(state.results.lock().await.groups().is_empty());
    assert!(!state.is_loading());
}

#[tokio::test]
async fn malformed_response_creates_no_record() {
    let service = MockService {
        malformed: true,
        ..MockService::default()
    };
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 1);

    let outcome = run_upload(
        &state,
        &assets,
        UploadPolicy::PerItem,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    assert_eq!(outcome.accepted, 0);
    assert_eq!(outcome.failures.len(), 1);
    assert!(state.results.lock().await.groups().is_empty());
    assert!(state.recents.lock().await.is_empty());
    assert!(!state.is_loading());
}

#[tokio::test]
async fn search_sinks_record_without_image() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;

    let record = run_search(&state, "Leica M6", "GBP").await.unwrap();

    assert_eq!(record.title, "Leica M6");
    assert_eq!(record.image_uri, None);
    assert_eq!(record.loose_price, "$75 - $125");
    assert_eq!(record.information, "Found by text lookup.");

    let body = service.last_body().unwrap();
    assert_eq!(body["cameraName"], "Leica M6");
    assert_eq!(body["region"], "United Kingdom");

    let results = state.results.lock().await;
    assert_eq!(results.groups().len(), 1);
    assert_eq!(results.groups()[0].image_key, None);
    assert_eq!(state.recents.lock().await.len(), 1);
}

#[tokio::test]
async fn empty_search_is_rejected_before_any_network_call() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;

    let err = run_search(&state, "   ", "USD").await.unwrap_err();

    assert!(matches!(err, SearchError::EmptyQuery));
    assert_eq!(service.call_count(), 0);
    assert!(!state.is_loading());
}

#[tokio::test]
async fn third_upload_run_suggests_a_review() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let mut events = state.event_bus.subscribe();

    for _ in 0..3 {
        let assets = write_images(&dir, 1);
        run_upload(
            &state,
            &assets,
            UploadPolicy::PerItem,
            "USD",
            &PrepareOptions::default(),
        )
        .await;
    }

    let mut suggested = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(
            event,
            campricer_common::events::PricerEvent::ReviewPromptSuggested { .. }
        ) {
            suggested += 1;
        }
    }
    assert_eq!(suggested, 1);
}

#[tokio::test]
async fn removing_last_record_cascades_through_app_state() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 1);

    run_upload(
        &state,
        &assets,
        UploadPolicy::PerItem,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    let removed = state.remove_result(0, 0).await;
    assert_eq!(removed.unwrap().title, "Camera 1");
    assert!(state.results.lock().await.groups().is_empty());
    assert!(!assets[0].path.exists());

    // Stale indices are a no-op
    assert!(state.remove_result(0, 0).await.is_none());
}

#[tokio::test]
async fn clear_results_releases_assets_and_announces() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();
    let state = test_state(&base_url, &dir).await;
    let assets = write_images(&dir, 2);

    run_upload(
        &state,
        &assets,
        UploadPolicy::PerItem,
        "USD",
        &PrepareOptions::default(),
    )
    .await;

    let mut events = state.event_bus.subscribe();
    state.clear_results().await;

    assert!(state.results.lock().await.groups().is_empty());
    for asset in &assets {
        assert!(!asset.path.exists());
    }
    assert!(matches!(
        events.try_recv().unwrap(),
        campricer_common::events::PricerEvent::ResultsCleared { .. }
    ));
}

#[tokio::test]
async fn history_survives_a_restart() {
    let service = MockService::default();
    let base_url = spawn_service(service.clone()).await;
    let dir = TempDir::new().unwrap();

    {
        let state = test_state(&base_url, &dir).await;
        let assets = write_images(&dir, 2);
        run_upload(
            &state,
            &assets,
            UploadPolicy::PerItem,
            "USD",
            &PrepareOptions::default(),
        )
        .await;
        assert_eq!(state.recents.lock().await.len(), 2);
    }

    // Fresh AppState over the same data directory simulates a restart
    let state = test_state(&base_url, &dir).await;
    let recents = state.recents.lock().await;
    assert_eq!(recents.len(), 2);
    assert_eq!(recents.entries()[0].camera, "Camera 2");
    assert_eq!(recents.entries()[1].camera, "Camera 1");
}
