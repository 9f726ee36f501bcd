//! End-to-end tests for the catalog HTTP API over the in-memory store.
#![cfg(feature = "http-server")]

mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use skistore::db::repositories::LocalStore;
use skistore::http::{create_router, AppState};
use skistore::models::Product;

use support::catalog;

fn seeded() -> LocalStore<Product> {
    LocalStore::with_rows(catalog())
}

fn app(store: &LocalStore<Product>) -> Router {
    create_router(AppState::new(Arc::new(store.clone())))
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Reply {
    fn names(&self) -> Vec<String> {
        self.body
            .as_array()
            .expect("array body")
            .iter()
            .map(|p| p["name"].as_str().unwrap().to_string())
            .collect()
    }

    fn total(&self) -> usize {
        self.headers["x-total-count"]
            .to_str()
            .unwrap()
            .parse()
            .unwrap()
    }
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        headers,
        body,
    }
}

async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn send_json(app: &Router, method: Method, uri: &str, body: &Value) -> Reply {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn delete(app: &Router, uri: &str) -> Reply {
    send(
        app,
        Request::delete(uri).body(Body::empty()).unwrap(),
    )
    .await
}

fn new_product_body() -> Value {
    json!({
        "name": "Skis A",
        "description": "d",
        "pictureUrl": "p",
        "type": "Ski",
        "brand": "X",
        "price": 100.0,
        "quantityInStock": 1
    })
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_defaults_to_name_order_first_page() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.names(),
        vec![
            "Carbon Poles",
            "Junior Skis",
            "Park Skis",
            "Race Boots",
            "Race Skis",
            "Touring Boots"
        ]
    );
    assert_eq!(reply.total(), 6);
}

#[tokio::test]
async fn test_list_filters_by_brand_and_sorts_by_price() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?brands=Atomic&sort=priceAsc").await;

    assert_eq!(
        reply.names(),
        vec!["Junior Skis", "Touring Boots", "Race Skis"]
    );
    assert_eq!(reply.total(), 3);
}

#[tokio::test]
async fn test_list_filters_by_several_types_descending() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?types=Boots,Poles&sort=priceDesc").await;

    assert_eq!(
        reply.names(),
        vec!["Race Boots", "Touring Boots", "Carbon Poles"]
    );
}

#[tokio::test]
async fn test_list_search_ignores_case() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?search=SKIS").await;

    assert_eq!(reply.names(), vec!["Junior Skis", "Park Skis", "Race Skis"]);
    assert_eq!(reply.total(), 3);
}

#[tokio::test]
async fn test_list_pages_after_filtering() {
    let app = app(&seeded());

    let reply = get(&app, "/api/products?pageSize=2&pageIndex=2").await;
    assert_eq!(reply.names(), vec!["Park Skis", "Race Boots"]);
    assert_eq!(reply.total(), 6);

    let reply = get(&app, "/api/products?brands=Salomon&pageSize=1&pageIndex=2").await;
    assert_eq!(reply.names(), vec!["Race Boots"]);
    assert_eq!(reply.total(), 2);
}

#[tokio::test]
async fn test_list_page_past_the_end_is_empty() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?pageIndex=9").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.names().is_empty());
    assert_eq!(reply.total(), 6);
}

#[tokio::test]
async fn test_list_huge_page_index_is_empty() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?pageIndex=9223372036854775807").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.names().is_empty());
    assert_eq!(reply.total(), 6);
}

#[tokio::test]
async fn test_list_clamps_page_size() {
    let app = app(&seeded());

    let reply = get(&app, "/api/products?pageSize=0").await;
    assert_eq!(reply.names().len(), 1);

    let reply = get(&app, "/api/products?pageSize=1000").await;
    assert_eq!(reply.names().len(), 6);
}

#[tokio::test]
async fn test_list_rejects_non_numeric_paging() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?pageIndex=abc").await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_list_unknown_brand_matches_nothing() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products?brands=Rossignol").await;

    assert!(reply.names().is_empty());
    assert_eq!(reply.total(), 0);
}

// =============================================================================
// Single product
// =============================================================================

#[tokio::test]
async fn test_get_existing_product() {
    let app = app(&seeded());
    let reply = get(&app, "/api/products/3").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["id"], 3);
    assert_eq!(reply.body["name"], "Touring Boots");
    assert_eq!(reply.body["type"], "Boots");
    assert_eq!(reply.body["quantityInStock"], 2);
}

#[tokio::test]
async fn test_get_missing_product_is_404() {
    let app = app(&seeded());

    let reply = get(&app, "/api/products/99").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["code"], "NOT_FOUND");

    let reply = get(&app, "/api/products/abc").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_create_assigns_id_and_location() {
    let store = LocalStore::new();
    let app = app(&store);

    let reply = send_json(&app, Method::POST, "/api/products", &new_product_body()).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.headers[header::LOCATION], "/api/products/1");
    assert_eq!(reply.body["id"], 1);
    assert_eq!(reply.body["name"], "Skis A");

    let fetched = get(&app, "/api/products/1").await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, reply.body);
}

#[tokio::test]
async fn test_create_ignores_client_id() {
    let store = seeded();
    let app = app(&store);

    let mut body = new_product_body();
    body["id"] = json!(3);
    let reply = send_json(&app, Method::POST, "/api/products", &body).await;

    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["id"], 7);
    assert_eq!(get(&app, "/api/products/3").await.body["name"], "Touring Boots");
    assert_eq!(store.len(), 7);
}

#[tokio::test]
async fn test_create_rejects_invalid_products() {
    let store = seeded();
    let app = app(&store);

    let mut no_price = new_product_body();
    no_price["price"] = json!(0);
    let mut blank_name = new_product_body();
    blank_name["name"] = json!("");
    let mut no_brand = new_product_body();
    no_brand.as_object_mut().unwrap().remove("brand");

    for body in [no_price, blank_name, no_brand] {
        let reply = send_json(&app, Method::POST, "/api/products", &body).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "accepted {}", body);
    }
    assert_eq!(store.len(), 6);
}

#[tokio::test]
async fn test_create_rejects_malformed_json() {
    let store = LocalStore::new();
    let app = app(&store);

    let request = Request::post("/api/products")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::BAD_REQUEST);

    let request = Request::post("/api/products")
        .body(Body::from(new_product_body().to_string()))
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::BAD_REQUEST);

    assert!(store.is_empty());
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_replaces_product() {
    let store = seeded();
    let app = app(&store);

    let mut body = new_product_body();
    body["id"] = json!(2);
    body["name"] = json!("Park Skis 2025");
    body["price"] = json!(445.5);

    let reply = send_json(&app, Method::PUT, "/api/products/2", &body).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(reply.body, Value::Null);

    let fetched = get(&app, "/api/products/2").await;
    assert_eq!(fetched.body["name"], "Park Skis 2025");
    assert_eq!(fetched.body["price"], 445.5);
    assert_eq!(fetched.body["brand"], "X");
}

#[tokio::test]
async fn test_update_with_mismatched_id_is_400() {
    let store = seeded();
    let app = app(&store);

    let mut body = new_product_body();
    body["id"] = json!(7);
    let reply = send_json(&app, Method::PUT, "/api/products/5", &body).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/api/products/5").await.body["name"], "Carbon Poles");
    assert_eq!(get(&app, "/api/products/7").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_missing_product_is_404() {
    let app = app(&seeded());

    let mut body = new_product_body();
    body["id"] = json!(99);
    let reply = send_json(&app, Method::PUT, "/api/products/99", &body).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_invalid_body_is_400() {
    let store = seeded();
    let app = app(&store);

    let mut body = new_product_body();
    body["id"] = json!(1);
    body["price"] = json!(-5);
    let reply = send_json(&app, Method::PUT, "/api/products/1", &body).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/api/products/1").await.body["price"], 650.0);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_then_get_is_404() {
    let store = seeded();
    let app = app(&store);

    assert_eq!(delete(&app, "/api/products/4").await.status, StatusCode::NO_CONTENT);
    assert_eq!(get(&app, "/api/products/4").await.status, StatusCode::NOT_FOUND);
    assert_eq!(delete(&app, "/api/products/4").await.status, StatusCode::NOT_FOUND);
    assert_eq!(store.len(), 5);
}

// =============================================================================
// Brands and types
// =============================================================================

#[tokio::test]
async fn test_brands_and_types_are_distinct_and_sorted() {
    let app = app(&seeded());

    let brands = get(&app, "/api/products/brands").await;
    assert_eq!(brands.status, StatusCode::OK);
    assert_eq!(brands.body, json!(["Atomic", "Leki", "Salomon"]));

    let types = get(&app, "/api/products/types").await;
    assert_eq!(types.body, json!(["Boots", "Poles", "Skis"]));
}

#[tokio::test]
async fn test_brands_of_empty_catalog() {
    let app = app(&LocalStore::new());
    let reply = get(&app, "/api/products/brands").await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn test_brands_follow_deletions() {
    let store = seeded();
    let app = app(&store);

    delete(&app, "/api/products/5").await;
    let brands = get(&app, "/api/products/brands").await;
    assert_eq!(brands.body, json!(["Atomic", "Salomon"]));
}

// =============================================================================
// Store failures and service endpoints
// =============================================================================

#[tokio::test]
async fn test_rejected_payloads_never_reach_an_unhealthy_store() {
    let store = seeded();
    store.set_healthy(false);
    let app = app(&store);

    let mut mismatched = new_product_body();
    mismatched["id"] = json!(7);
    let reply = send_json(&app, Method::PUT, "/api/products/5", &mismatched).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let mut blank_name = new_product_body();
    blank_name["id"] = json!(99);
    blank_name["name"] = json!("");
    let reply = send_json(&app, Method::PUT, "/api/products/99", &blank_name).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let mut free = new_product_body();
    free["price"] = json!(0);
    let reply = send_json(&app, Method::POST, "/api/products", &free).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unhealthy_store_is_500() {
    let store = seeded();
    store.set_healthy(false);
    let app = app(&store);

    let reply = get(&app, "/api/products").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body["code"], "REPOSITORY_ERROR");
    assert!(!reply.body["message"]
        .as_str()
        .unwrap()
        .contains("not healthy"));

    let reply = send_json(&app, Method::POST, "/api/products", &new_product_body()).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_reports_store() {
    let store = seeded();
    let app = app(&store);

    let reply = get(&app, "/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
    assert_eq!(reply.body["database"], "connected");
    assert_eq!(reply.body["backend"], "local");

    store.set_healthy(false);
    let reply = get(&app, "/health").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["database"], "disconnected");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = app(&seeded());
    let request = Request::get("/api/products/1")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let reply = send(&app, request).await;
    assert_eq!(reply.headers["x-request-id"], "abc-123");
}
