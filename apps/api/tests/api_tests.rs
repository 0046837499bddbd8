//! End-to-end tests through the router, backed by an in-memory database.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use pharmos_api::config::ServerConfig;
use pharmos_api::{create_router, AppState};
use pharmos_core::Batch;
use pharmos_db::{Database, DbConfig, NewBatch};

struct TestApp {
    router: Router,
    db: Database,
}

async fn app() -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let state = AppState::new(db.clone(), ServerConfig::default());
    TestApp {
        router: create_router(state),
        db,
    }
}

impl TestApp {
    async fn batch(&self, lot: &str, quantity: i64, price_cents: i64) -> Batch {
        let product = self
            .db
            .products()
            .insert(&format!("Product {}", lot), Some("Cipla"))
            .await
            .unwrap();
        self.db
            .ledger()
            .insert_batch(NewBatch {
                product_id: product.id,
                lot_number: lot.to_string(),
                quantity,
                unit_cost_cents: price_cents / 2,
                unit_price_cents: price_cents,
                expiry_date: None,
            })
            .await
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        role: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder
                .header("X-User-Id", format!("{}-user", role))
                .header("X-User-Role", role);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        role: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, role, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

fn bill_body(batch_id: &str, quantity: i64) -> Value {
    json!({
        "customerName": "Asha Rao",
        "customerPhone": "+91 98450 12345",
        "paymentMethod": "cash",
        "items": [{ "batchId": batch_id, "quantity": quantity }]
    })
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = app.json(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_identity_is_required() {
    let app = app().await;
    let x = app.batch("LOT-X", 5, 1000).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/bills", None, Some(bill_body(&x.id, 1)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .json(Method::POST, "/api/v1/bills", Some("janitor"), Some(bill_body(&x.id, 1)))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_capabilities_are_enforced() {
    let app = app().await;
    let x = app.batch("LOT-X", 5, 1000).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/bills", Some("audit"), Some(bill_body(&x.id, 1)))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app
        .json(Method::GET, "/api/v1/events", Some("pharmacist"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/v1/batches/{}", x.id);
    let (_, batch) = app.json(Method::GET, &uri, Some("audit"), None).await;
    assert_eq!(batch["quantity"], 5);
}

#[tokio::test]
async fn test_create_bill_then_oversell() {
    let app = app().await;
    let x = app.batch("LOT-X", 5, 1000).await;

    let (status, body) = app
        .json(Method::POST, "/api/v1/bills", Some("pharmacist"), Some(bill_body(&x.id, 3)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total"], 3000);
    assert_eq!(body["subtotal"], 3000);
    assert_eq!(body["discountAmount"], 0);
    assert!(body["billNumber"].as_str().unwrap().starts_with("BILL-"));

    let (status, body) = app
        .json(Method::POST, "/api/v1/bills", Some("pharmacist"), Some(bill_body(&x.id, 5)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let uri = format!("/api/v1/batches/{}", x.id);
    let (_, batch) = app.json(Method::GET, &uri, Some("pharmacist"), None).await;
    assert_eq!(batch["quantity"], 2);
}

#[tokio::test]
async fn test_validation_details() {
    let app = app().await;
    let x = app.batch("LOT-X", 5, 1000).await;

    let mut body = bill_body(&x.id, 0);
    body["customerName"] = json!("");
    body["discountPercent"] = json!(150.0);

    let (status, body) = app
        .json(Method::POST, "/api/v1/bills", Some("pharmacist"), Some(body))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"customerName"));
    assert!(fields.contains(&"discountPercent"));
    assert!(fields.contains(&"items[0].quantity"));
}

#[tokio::test]
async fn test_malformed_body() {
    let app = app().await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/v1/bills",
            Some("pharmacist"),
            Some(json!({ "customerName": "No items" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let app = app().await;
    let (status, body) = app
        .json(Method::POST, "/api/v1/bills", Some("pharmacist"), Some(bill_body("ghost", 1)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = app
        .json(Method::GET, "/api/v1/bills/nope", Some("admin"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_flow() {
    let app = app().await;
    let x = app.batch("LOT-X", 5, 1000).await;

    let (_, created) = app
        .json(Method::POST, "/api/v1/bills", Some("pharmacist"), Some(bill_body(&x.id, 4)))
        .await;
    let bill_id = created["billId"].as_str().unwrap().to_string();
    let cancel = format!("/api/v1/bills/{}/cancel", bill_id);

    let (status, _) = app.json(Method::POST, &cancel, Some("pharmacist"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, bill) = app.json(Method::POST, &cancel, Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bill["status"], "cancelled");
    assert_eq!(bill["cancelledBy"], "admin-user");

    let (status, body) = app.json(Method::POST, &cancel, Some("admin"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_CANCELLED");

    let uri = format!("/api/v1/batches/{}", x.id);
    let (_, batch) = app.json(Method::GET, &uri, Some("admin"), None).await;
    assert_eq!(batch["quantity"], 5);

    let (_, events) = app
        .json(Method::GET, "/api/v1/events?type=STOCK_RESTORED", Some("audit"), None)
        .await;
    assert_eq!(events.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_receipt_and_listing() {
    let app = app().await;
    let x = app.batch("LOT-X", 50, 2500).await;

    let mut body = bill_body(&x.id, 4);
    body["discountPercent"] = json!(10.0);
    let (_, created) = app
        .json(Method::POST, "/api/v1/bills", Some("pharmacist"), Some(body))
        .await;
    assert_eq!(created["total"], 9000);
    let bill_id = created["billId"].as_str().unwrap();
    let bill_number = created["billNumber"].as_str().unwrap();

    let uri = format!("/api/v1/bills/{}/receipt", bill_id);
    let (status, text) = app.send(Method::GET, &uri, Some("audit"), None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(text).unwrap();
    assert!(text.contains(bill_number));
    assert!(text.contains("PHARMOS PHARMACY"));

    let uri = format!("/api/v1/bills/{}/receipt?format=json", bill_id);
    let (_, receipt) = app.json(Method::GET, &uri, Some("audit"), None).await;
    assert_eq!(receipt["billNumber"], bill_number);

    let (status, bills) = app
        .json(Method::GET, "/api/v1/bills?status=active&limit=10", Some("audit"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bills.as_array().unwrap().len(), 1);

    let (status, _) = app
        .json(Method::GET, "/api/v1/bills?status=bogus", Some("audit"), None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_product_batches() {
    let app = app().await;
    let x = app.batch("LOT-X", 5, 1000).await;

    let uri = format!("/api/v1/products/{}/batches", x.product_id);
    let (status, batches) = app.json(Method::GET, &uri, Some("pharmacist"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batches[0]["lotNumber"], "LOT-X");

    let (status, _) = app
        .json(Method::GET, "/api/v1/products/missing/batches", Some("pharmacist"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
