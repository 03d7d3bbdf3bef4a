use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use tourbook::config::AppConfig;
use tourbook::db;
use tourbook::handlers;
use tourbook::services::payment::{self, GatewayOrder, OrderRequest, PaymentGateway};
use tourbook::state::AppState;

const SECRET: &str = "test-secret";

// ── Mock Gateway ──

struct MockGateway {
    orders: AtomicUsize,
    requests: Arc<Mutex<Vec<OrderRequest>>>,
    reject: bool,
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, request: &OrderRequest) -> anyhow::Result<GatewayOrder> {
        if self.reject {
            anyhow::bail!("Razorpay API error (400 Bad Request): The amount must be atleast INR 1.00");
        }
        self.requests.lock().unwrap().push(request.clone());
        let n = self.orders.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_mock{n}"),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
        })
    }

    fn key_id(&self) -> &str {
        "rzp_test_key"
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 5000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        razorpay_key_id: "rzp_test_key".to_string(),
        razorpay_key_secret: SECRET.to_string(),
        razorpay_api_url: "http://localhost:9".to_string(),
        default_currency: "INR".to_string(),
    }
}

fn build_state(reject: bool) -> (Arc<AppState>, Arc<Mutex<Vec<OrderRequest>>>) {
    let conn = db::init_db(":memory:").unwrap();
    let requests = Arc::new(Mutex::new(vec![]));
    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        gateway: Box::new(MockGateway {
            orders: AtomicUsize::new(0),
            requests: Arc::clone(&requests),
            reject,
        }),
    });
    (state, requests)
}

fn test_state() -> Arc<AppState> {
    build_state(false).0
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn example_draft() -> serde_json::Value {
    serde_json::json!({
        "name": "A",
        "email": "a@x.com",
        "phone": "999",
        "startDate": "2025-01-01",
        "bookingType": "fixed",
        "totalPrice": 25000
    })
}

async fn create_example_booking(state: &Arc<AppState>) -> String {
    let (status, json) = send(state, json_request("POST", "/api/bookings", example_draft())).await;
    assert_eq!(status, StatusCode::CREATED);
    json["bookingId"].as_str().unwrap().to_string()
}

async fn create_order(state: &Arc<AppState>, booking_id: &str) -> String {
    let (status, json) = send(
        state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 25000, "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["orderId"].as_str().unwrap().to_string()
}

// ── Booking API Tests ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_booking() {
    let state = test_state();
    let (status, json) = send(&state, json_request("POST", "/api/bookings", example_draft())).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    let booking_id = json["bookingId"].as_str().unwrap();
    assert!(tourbook::services::booking_id::is_well_formed(booking_id));
    assert_eq!(json["booking"]["bookingId"], booking_id);
    assert_eq!(json["booking"]["status"], "pending");
    assert_eq!(json["booking"]["paymentStatus"], "pending");
    assert_eq!(json["booking"]["totalPrice"], 25000.0);
}

#[tokio::test]
async fn test_create_booking_missing_fields() {
    let state = test_state();

    for field in ["name", "email", "phone", "startDate"] {
        let mut draft = example_draft();
        draft.as_object_mut().unwrap().remove(field);
        let (status, json) = send(&state, json_request("POST", "/api/bookings", draft)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "missing {field}");
        assert!(json["error"].as_str().unwrap().contains("Missing required fields"));
    }

    let (_, json) = send(&state, admin_request("GET", "/api/bookings", None)).await;
    assert_eq!(json["bookings"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_create_customized_without_cities() {
    let state = test_state();
    let mut draft = example_draft();
    draft["bookingType"] = "customized".into();
    draft["selectedCities"] = serde_json::json!([]);

    let (status, json) = send(&state, json_request("POST", "/api/bookings", draft)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "At least one city must be selected for customized packages"
    );
}

#[tokio::test]
async fn test_create_booking_malformed_json() {
    let state = test_state();
    let req = Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_server_recomputes_package_price() {
    let state = test_state();
    let mut draft = example_draft();
    draft["packageId"] = "p2".into();
    draft["numberOfPeople"] = "2".into();
    draft["selectedVehicle"] = "v1".into();
    draft["totalPrice"] = 1.into();

    let (status, json) = send(&state, json_request("POST", "/api/bookings", draft)).await;
    assert_eq!(status, StatusCode::CREATED);
    // 18000 × 2 people + 4000 × 5 days
    assert_eq!(json["booking"]["totalPrice"], 56000.0);
}

#[tokio::test]
async fn test_get_booking() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(&state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["name"], "A");
    assert_eq!(json["booking"]["email"], "a@x.com");

    let (status, json) = send(&state, get("/api/bookings/BK000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Booking not found");
}

#[tokio::test]
async fn test_admin_routes_require_auth() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;

    let (status, _) = send(&state, get("/api/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/bookings/{booking_id}"))
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &state,
        json_request(
            "PUT",
            &format!("/api/bookings/{booking_id}"),
            serde_json::json!({ "status": "confirmed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_bookings_newest_first() {
    let state = test_state();
    let first = create_example_booking(&state).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = create_example_booking(&state).await;

    let (status, json) = send(&state, admin_request("GET", "/api/bookings", None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["bookings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["bookingId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
}

#[tokio::test]
async fn test_admin_status_override() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(
        &state,
        admin_request(
            "PUT",
            &format!("/api/bookings/{booking_id}"),
            Some(serde_json::json!({ "status": "completed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "completed");
    assert_eq!(json["booking"]["paymentStatus"], "pending");

    let (status, _) = send(
        &state,
        admin_request(
            "PUT",
            &format!("/api/bookings/{booking_id}"),
            Some(serde_json::json!({ "status": "archived" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        admin_request(
            "PUT",
            "/api/bookings/BK000",
            Some(serde_json::json!({ "status": "confirmed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_is_soft() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(
        &state,
        admin_request("DELETE", &format!("/api/bookings/{booking_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "cancelled");
    assert_eq!(json["booking"]["paymentStatus"], "pending");

    let (status, json) = send(&state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "cancelled");

    let (status, _) = send(&state, admin_request("DELETE", "/api/bookings/BK000", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Payment API Tests ──

#[tokio::test]
async fn test_order_then_verify_confirms_booking() {
    let (state, requests) = build_state(false);
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 25000, "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = json["orderId"].as_str().unwrap().to_string();
    assert!(!order_id.is_empty());
    assert_eq!(json["amount"], 2_500_000);
    assert_eq!(json["currency"], "INR");
    assert_eq!(json["key"], "rzp_test_key");
    assert_eq!(requests.lock().unwrap()[0].receipt, format!("receipt_{booking_id}"));

    let signature = payment::sign(&order_id, "pay_123", SECRET);
    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/verify-payment",
            serde_json::json!({
                "orderId": order_id,
                "paymentId": "pay_123",
                "signature": signature,
                "bookingId": booking_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paymentId"], "pay_123");

    let (status, json) = send(&state, get(&format!("/api/payment/status/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["paymentStatus"], "paid");
    assert_eq!(json["paymentId"], "pay_123");
    assert_eq!(json["razorpayOrderId"], order_id.as_str());

    let (_, json) = send(&state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(json["booking"]["status"], "confirmed");
}

#[tokio::test]
async fn test_verify_accepts_checkout_field_names() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;
    let order_id = create_order(&state, &booking_id).await;

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/verify-payment",
            serde_json::json!({
                "razorpay_order_id": order_id,
                "razorpay_payment_id": "pay_9",
                "razorpay_signature": payment::sign(&order_id, "pay_9", SECRET),
                "bookingId": booking_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_bad_signature_marks_failed() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;
    let order_id = create_order(&state, &booking_id).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/verify-payment",
            serde_json::json!({
                "orderId": order_id,
                "paymentId": "pay_123",
                "signature": "deadbeef",
                "bookingId": booking_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) = send(&state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["booking"]["status"], "pending");
    assert_eq!(json["booking"]["paymentStatus"], "failed");
    assert!(json["booking"]["paymentId"].is_null());
}

#[tokio::test]
async fn test_verify_accepts_payment_for_replaced_order() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;
    let first_order = create_order(&state, &booking_id).await;
    let second_order = create_order(&state, &booking_id).await;
    assert_ne!(first_order, second_order);

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/verify-payment",
            serde_json::json!({
                "orderId": first_order,
                "paymentId": "pay_123",
                "signature": payment::sign(&first_order, "pay_123", SECRET),
                "bookingId": booking_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (_, json) = send(&state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(json["booking"]["status"], "confirmed");
    assert_eq!(json["booking"]["paymentStatus"], "paid");
    assert_eq!(json["booking"]["paymentId"], "pay_123");
    assert_eq!(json["booking"]["razorpayOrderId"], first_order.as_str());
}

#[tokio::test]
async fn test_verify_rejects_order_of_another_booking() {
    let state = test_state();
    let owner = create_example_booking(&state).await;
    let other = create_example_booking(&state).await;
    let order_id = create_order(&state, &owner).await;

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/verify-payment",
            serde_json::json!({
                "orderId": order_id,
                "paymentId": "pay_123",
                "signature": payment::sign(&order_id, "pay_123", SECRET),
                "bookingId": other,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, json) = send(&state, get(&format!("/api/bookings/{other}"))).await;
    assert_eq!(json["booking"]["paymentStatus"], "pending");
    assert!(json["booking"]["paymentId"].is_null());
}

#[tokio::test]
async fn test_verify_on_cancelled_booking_records_payment() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;
    let order_id = create_order(&state, &booking_id).await;
    send(
        &state,
        admin_request("DELETE", &format!("/api/bookings/{booking_id}"), None),
    )
    .await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/verify-payment",
            serde_json::json!({
                "orderId": order_id,
                "paymentId": "pay_123",
                "signature": payment::sign(&order_id, "pay_123", SECRET),
                "bookingId": booking_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
    assert_eq!(json["paymentId"], "pay_123");

    let (_, json) = send(&state, get(&format!("/api/bookings/{booking_id}"))).await;
    assert_eq!(json["booking"]["status"], "cancelled");
    assert_eq!(json["booking"]["paymentStatus"], "paid");
    assert_eq!(json["booking"]["paymentId"], "pay_123");
}

#[tokio::test]
async fn test_create_order_validation() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Amount and bookingId are required");

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 100 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 100, "bookingId": "BK000" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_order_charges_stored_total() {
    let (state, requests) = build_state(false);
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 1, "currency": "INR", "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["amount"], 2_500_000);
    assert_eq!(requests.lock().unwrap()[0].amount, 2_500_000);
}

#[tokio::test]
async fn test_gateway_rejection_is_reported() {
    let (state, _) = build_state(true);
    let booking_id = create_example_booking(&state).await;

    let (status, json) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 25000, "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Failed to create payment order");
    assert!(json["details"].as_str().unwrap().contains("atleast INR 1.00"));

    let (_, json) = send(&state, get(&format!("/api/payment/status/{booking_id}"))).await;
    assert_eq!(json["paymentStatus"], "pending");
    assert!(json["razorpayOrderId"].is_null());
}

#[tokio::test]
async fn test_cancelled_booking_cannot_be_ordered() {
    let state = test_state();
    let booking_id = create_example_booking(&state).await;
    send(
        &state,
        admin_request("DELETE", &format!("/api/bookings/{booking_id}"), None),
    )
    .await;

    let (status, _) = send(
        &state,
        json_request(
            "POST",
            "/api/payment/create-order",
            serde_json::json!({ "amount": 25000, "bookingId": booking_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_payment_status_not_found() {
    let state = test_state();
    let (status, _) = send(&state, get("/api/payment/status/BK000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Catalog API Tests ──

#[tokio::test]
async fn test_catalog_endpoints() {
    let state = test_state();

    let (status, json) = send(&state, get("/api/packages")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["packages"].as_array().unwrap().len(), 6);

    let (status, json) = send(&state, get("/api/packages/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["package"]["price"], 25000.0);
    assert_eq!(json["package"]["type"], "fixed");

    let (status, _) = send(&state, get("/api/packages/zzz")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&state, get("/api/guides")).await;
    assert_eq!(json["guides"][0]["pricePerDay"], 1500.0);

    let (_, json) = send(&state, get("/api/vehicles")).await;
    assert_eq!(json["vehicles"].as_array().unwrap().len(), 2);
}
