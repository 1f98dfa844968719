//! API integration tests (require DATABASE_URL)

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    middleware, Router,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use orderflow::api::{self, AppState};
use orderflow::event_store::AggregateStore;
use orderflow::projection::{OrderDocumentRepository, OrderSearchRepository};

mod common;

async fn test_app() -> Router {
    let pool = common::setup_test_db().await;

    let state = AppState {
        store: AggregateStore::new(pool.clone()),
        doc_repo: OrderDocumentRepository::new(pool.clone(), "order_projections"),
        search_repo: OrderSearchRepository::new(pool, "order_search"),
    };

    Router::new()
        .nest("/api/orders", api::create_router())
        .layer(middleware::from_fn(
            api::middleware::request_context_middleware,
        ))
        .with_state(state)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn put(uri: &str, body: Option<Value>) -> Request<Body> {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_order_body() -> Value {
    json!({
        "shopItems": [
            {"id": "i1", "title": "t", "description": "d", "quantity": 2, "price": "5.0"}
        ],
        "accountEmail": "a@b.c",
        "deliveryAddress": "1 X St"
    })
}

/// POST an order and return its id
async fn create_order(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post("/api/orders", create_order_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED, "order creation failed");
    serde_json::from_value(body_json(response).await).unwrap()
}

#[tokio::test]
async fn test_create_then_read_projection() {
    let app = test_app().await;
    let order_id = create_order(&app).await;

    // no projector runs in this test; the GET read-through rehydrates
    let response = app
        .clone()
        .oneshot(get(&format!("/api/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["orderId"], order_id);
    assert_eq!(json["paid"], false);

    let total: Decimal = json["totalPrice"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(10.0));
}

#[tokio::test]
async fn test_pay_flow_and_double_pay_rejected() {
    let app = test_app().await;
    let order_id = create_order(&app).await;

    let pay_body = json!({"paymentId": "p1", "timestamp": "2024-01-01T00:00:00Z"});

    let response = app
        .clone()
        .oneshot(put(&format!("/api/orders/pay/{order_id}"), Some(pay_body.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/orders/{order_id}")))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["paid"], true);
    assert_eq!(json["payment"]["paymentId"], "p1");

    // paying twice violates the pre-condition
    let response = app
        .clone()
        .oneshot(put(&format!("/api/orders/pay/{order_id}"), Some(pay_body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["status"], 400);
    assert_eq!(json["error"], "order already paid");
}

#[tokio::test]
async fn test_complete_requires_payment() {
    let app = test_app().await;
    let order_id = create_order(&app).await;

    let response = app
        .clone()
        .oneshot(post(&format!("/api/orders/complete/{order_id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "order must be paid before delivery");
}

#[tokio::test]
async fn test_cancel_after_complete_rejected() {
    let app = test_app().await;
    let order_id = create_order(&app).await;

    let pay_body = json!({"paymentId": "p1", "timestamp": "2024-01-01T00:00:00Z"});
    let response = app
        .clone()
        .oneshot(put(&format!("/api/orders/pay/{order_id}"), Some(pay_body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(&format!("/api/orders/complete/{order_id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(
            &format!("/api/orders/cancel/{order_id}"),
            json!({"cancelReason": "x"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["error"], "order already completed");
}

#[tokio::test]
async fn test_create_order_validation() {
    let app = test_app().await;

    // empty cart
    let response = app
        .clone()
        .oneshot(post(
            "/api/orders",
            json!({"shopItems": [], "accountEmail": "a@b.c", "deliveryAddress": "1 X St"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // malformed email
    let mut body = create_order_body();
    body["accountEmail"] = json!("not-an-email");
    let response = app.clone().oneshot(post("/api/orders", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_order_is_not_found() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(get("/api/orders/00000000-0000-0000-0000-00000000dead"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
