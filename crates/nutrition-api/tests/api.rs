//! End-to-end tests of the HTTP façade against an in-memory store and index

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use nutrition_api::router;
use nutrition_search::{EsSearchIndex, MemoryIndex};
use nutrition_store::SqlRecordStore;
use nutrition_sync::SyncOrchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BASE: &str = "/api/v1/food-nutritions";

async fn app() -> (Router, Arc<MemoryIndex>) {
    let store = Arc::new(SqlRecordStore::in_memory().await.unwrap());
    let index = Arc::new(MemoryIndex::new());
    let orchestrator = Arc::new(SyncOrchestrator::new(store, index.clone()));
    (router(orchestrator), index)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn sample(code: &str) -> Value {
    json!({
        "food_cd": code,
        "food_name": "Test Food",
        "group_name": "Test Group",
        "research_year": "2024",
        "maker_name": "Test Maker",
        "ref_name": "Test Ref",
        "serving_size": 100.0,
        "calorie": 200.0,
        "carbohydrate": 30.0,
        "protein": 10.0,
        "province": 5.0,
        "sugars": 2.0,
        "salt": 1.0,
        "cholesterol": 0.0,
        "saturated_fatty_acids": 1.5,
        "trans_fat": 0.1
    })
}

#[tokio::test]
async fn test_root_and_health() {
    let (app, index) = app().await;

    let (status, body) = send(&app, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Welcome to"));

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["search_index"], true);

    index.set_reachable(false);
    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["store"], true);
    assert_eq!(body["search_index"], false);
}

#[tokio::test]
async fn test_create_and_read() {
    let (app, index) = app().await;

    let (status, created) = send(&app, "POST", BASE, Some(sample("API_TEST001"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["food_cd"], "API_TEST001");
    assert_eq!(created["fat"], 5.0);
    assert!(index.get(1).await.is_some());

    let (status, fetched) = send(&app, "GET", &format!("{}/1", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_duplicate_is_bad_request() {
    let (app, _) = app().await;
    send(&app, "POST", BASE, Some(sample("API_DUP001"))).await;

    let (status, body) = send(&app, "POST", BASE, Some(sample("API_DUP001"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "FoodNutrition with food_cd 'API_DUP001' already exists."
    );
}

#[tokio::test]
async fn test_invalid_payloads_are_unprocessable() {
    let (app, _) = app().await;

    let (status, body) = send(&app, "POST", BASE, Some(json!({"food_name": "No code"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, _) = send(&app, "POST", BASE, Some(json!({"food_cd": "X", "food_name": "Y", "calorie": "lots"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "GET", &format!("{}/abc", BASE), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "GET", &format!("{}/99999", BASE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "FoodNutrition with id 99999 not found");
}

#[tokio::test]
async fn test_list_pagination() {
    let (app, _) = app().await;
    send(&app, "POST", BASE, Some(sample("API_LIST001"))).await;
    send(&app, "POST", BASE, Some(sample("API_LIST002"))).await;

    let (status, all) = send(&app, "GET", &format!("{}/?skip=0&limit=10", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, page) = send(&app, "GET", &format!("{}?skip=1&limit=1", BASE), None).await;
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["food_cd"], "API_LIST002");

    let (status, _) = send(&app, "GET", &format!("{}?skip=-1", BASE), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_partial_update() {
    let (app, index) = app().await;
    send(&app, "POST", BASE, Some(sample("API_UPDATE001"))).await;

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("{}/1", BASE),
        Some(json!({"food_name": "Updated Food", "calorie": 250.0, "maker_name": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["food_name"], "Updated Food");
    assert_eq!(updated["calorie"], 250.0);
    assert_eq!(updated["maker_name"], Value::Null);
    assert_eq!(updated["protein"], 10.0);
    assert_eq!(updated["food_cd"], "API_UPDATE001");
    assert_eq!(index.get(1).await.unwrap().food_name, "Updated Food");

    let (status, _) = send(&app, "PUT", &format!("{}/99999", BASE), Some(json!({"food_name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_into_taken_code_is_bad_request() {
    let (app, _) = app().await;
    send(&app, "POST", BASE, Some(sample("A"))).await;
    send(&app, "POST", BASE, Some(sample("B"))).await;

    let (status, _) = send(&app, "PUT", &format!("{}/2", BASE), Some(json!({"food_cd": "A"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete() {
    let (app, index) = app().await;
    send(&app, "POST", BASE, Some(sample("API_DELETE001"))).await;

    let (status, deleted) = send(&app, "DELETE", &format!("{}/1", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["food_cd"], "API_DELETE001");
    assert!(index.get(1).await.is_none());

    let (status, _) = send(&app, "GET", &format!("{}/1", BASE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for _ in 0..2 {
        let (status, _) = send(&app, "DELETE", &format!("{}/1", BASE), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_search() {
    let (app, _) = app().await;
    send(&app, "POST", BASE, Some(json!({"food_cd": "S1", "food_name": "Brown Rice", "research_year": "2024"}))).await;
    send(&app, "POST", BASE, Some(json!({"food_cd": "S2", "food_name": "Rice Cake", "research_year": "2023"}))).await;
    send(&app, "POST", BASE, Some(json!({"food_cd": "S3", "food_name": "Bread"}))).await;

    let (status, hits) = send(&app, "GET", &format!("{}/search?food_name=rice", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits.as_array().unwrap().len(), 2);

    let (_, hits) = send(
        &app,
        "GET",
        &format!("{}/search?food_name=rice&research_year=2024", BASE),
        None,
    )
    .await;
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["food_cd"], "S1");
    assert!(hits[0].get("calorie").is_none());

    let (_, hits) = send(&app, "GET", &format!("{}/search?food_code=S3", BASE), None).await;
    assert_eq!(hits[0]["food_name"], "Bread");

    let (_, hits) = send(&app, "GET", &format!("{}/search?skip=1&limit=1", BASE), None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);

    let (status, hits) = send(&app, "GET", &format!("{}/search?food_name=pizza", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits, json!([]));
}

#[tokio::test]
async fn test_mutations_succeed_without_search_cluster() {
    let store = Arc::new(SqlRecordStore::in_memory().await.unwrap());
    let index = EsSearchIndex::new(nutrition_core::ElasticsearchConfig {
        hosts: vec!["http://127.0.0.1:1".to_string()],
        connect_timeout: Duration::from_millis(200),
        request_timeout: Duration::from_millis(500),
        ..Default::default()
    })
    .unwrap();
    let app = router(Arc::new(SyncOrchestrator::new(store, Arc::new(index))));

    let (status, created) = send(&app, "POST", BASE, Some(json!({"food_cd": "T1", "food_name": "Rice"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);

    let (status, _) = send(&app, "POST", BASE, Some(json!({"food_cd": "T1", "food_name": "Rice"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(&app, "PUT", &format!("{}/1", BASE), Some(json!({"calorie": 120.5}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["food_name"], "Rice");
    assert_eq!(updated["calorie"], 120.5);

    let (status, _) = send(&app, "DELETE", &format!("{}/1", BASE), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("{}/1", BASE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, hits) = send(&app, "GET", &format!("{}/search", BASE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits, json!([]));
}
