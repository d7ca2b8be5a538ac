use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_orders::{
    api::{self, AppState},
    domain::aggregates::{CartLine, CatalogProduct, ProductStatus},
    notify::LogNotifier,
    services::{PageLimits, Pricing},
    store::{MemoryCartStore, MemoryCatalog, MemoryCustomerDirectory, MemoryOrderRepository},
    Config, OrderQueryService, OrderService,
};

struct TestApp {
    router: Router,
    carts: Arc<MemoryCartStore>,
    catalog: Arc<MemoryCatalog>,
}

fn app() -> TestApp {
    let orders = Arc::new(MemoryOrderRepository::new());
    let carts = Arc::new(MemoryCartStore::new());
    let catalog = Arc::new(MemoryCatalog::new());
    let customers = Arc::new(MemoryCustomerDirectory::new());
    let config = Config::default();
    let service = OrderService::new(
        orders.clone(),
        carts.clone(),
        catalog.clone(),
        Arc::new(LogNotifier),
        Pricing::from_config(&config),
    );
    let queries = OrderQueryService::new(orders, customers, PageLimits::from_config(&config));
    let router = api::router(AppState { orders: service, queries });
    TestApp { router, carts, catalog }
}

impl TestApp {
    async fn stock(&self, merchant_id: Uuid, name: &str, price: Decimal) -> Uuid {
        let product = CatalogProduct {
            id: Uuid::new_v4(),
            merchant_id,
            name: name.into(),
            price,
            images: vec![],
            status: ProductStatus::Active,
        };
        let id = product.id;
        self.catalog.upsert(product).await;
        id
    }

    async fn send(&self, method: &str, uri: &str, who: Option<(Uuid, &str)>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = who {
            req = req.header("x-user-id", id.to_string()).header("x-user-role", role);
        }
        let req = match body {
            Some(b) => req.header("content-type", "application/json").body(Body::from(b.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }
}

fn checkout_body() -> Value {
    json!({
        "shipping_address": {
            "full_name": "Ada Lovelace",
            "phone": "5550101234",
            "address_line1": "12 Analytical Way",
            "address_line2": null,
            "city": "London",
            "state": "LDN",
            "postal_code": "N1 9GU",
            "country": "GB"
        },
        "payment_method": "stripe",
        "customer_notes": "leave at door"
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_requests_without_identity_are_rejected() {
    let app = app();
    let (status, body) = app.send("GET", "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let app = app();
    let customer = Uuid::new_v4();
    let (status, body) = app
        .send("POST", "/api/v1/orders", Some((customer, "customer")), Some(checkout_body()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "empty_cart");
}

#[tokio::test]
async fn test_merchant_fulfilment_flow() {
    let app = app();
    let (customer, x, y) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let kettle = app.stock(x, "Kettle", Decimal::new(3000, 2)).await;
    let rug = app.stock(y, "Rug", Decimal::new(12000, 2)).await;
    app.carts.add_item(customer, CartLine::new(kettle, 1)).await;
    app.carts.add_item(customer, CartLine::new(rug, 1)).await;

    let (status, order) = app
        .send("POST", "/api/v1/orders", Some((customer, "customer")), Some(checkout_body()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["merchant_count"], 2);
    assert_eq!(order["is_multi_merchant"], true);
    assert_eq!(order["overall_status"], "pending");
    let order_id = order["id"].as_str().unwrap().to_string();
    let sub_x = order["sub_orders"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["merchant_id"] == x.to_string())
        .unwrap()["sub_order_id"]
        .as_str()
        .unwrap()
        .to_string();
    let status_uri = format!("/api/v1/orders/{}/sub-orders/{}/status", order_id, sub_x);

    let (status, updated) = app
        .send("PUT", &status_uri, Some((x, "merchant")), Some(json!({"status": "confirmed"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["overall_status"], "partially_confirmed");

    // another merchant cannot touch X's sub-order
    let (status, _) = app
        .send("PUT", &status_uri, Some((y, "merchant")), Some(json!({"status": "processing"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("PUT", &status_uri, Some((x, "merchant")), Some(json!({"status": "delivered"})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_transition");

    let (status, queue) = app.send("GET", "/api/v1/merchant/orders?status=confirmed", Some((x, "merchant")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue["total"], 1);
    assert_eq!(queue["data"][0]["sub_order_id"], sub_x);

    let order_uri = format!("/api/v1/orders/{}", order_id);
    let (status, _) = app.send("GET", &order_uri, Some((Uuid::new_v4(), "customer")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // merchants in the order only see their own share through the queue
    let (status, _) = app.send("GET", &order_uri, Some((x, "merchant")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let number = order["order_number"].as_str().unwrap();
    let (status, tracking) = app
        .send("GET", &format!("/api/v1/orders/track/{}", number), Some((customer, "customer")), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracking["shipments"].as_array().unwrap().len(), 2);
    let shipment = tracking["shipments"].as_array().unwrap().iter().find(|s| s["sub_order_id"] == sub_x).unwrap();
    let confirmed = &shipment["status_history"][1];
    assert_eq!(confirmed["status"], "confirmed");
    assert_eq!(confirmed["updated_by_type"], "merchant");
    assert!(confirmed.get("updated_by").is_none());
}

#[tokio::test]
async fn test_customer_cancel_and_history() {
    let app = app();
    let (customer, merchant) = (Uuid::new_v4(), Uuid::new_v4());
    let shirt = app.stock(merchant, "Shirt", Decimal::new(20, 0)).await;
    app.carts.add_item(customer, CartLine::new(shirt, 3)).await;
    let (_, order) = app
        .send("POST", "/api/v1/orders", Some((customer, "customer")), Some(checkout_body()))
        .await;
    assert_eq!(order["grand_total"], "71.09");
    let order_id = order["id"].as_str().unwrap();

    let (status, cancelled) = app
        .send(
            "POST",
            &format!("/api/v1/orders/{}/cancel", order_id),
            Some((customer, "customer")),
            Some(json!({"reason": "changed my mind"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["overall_status"], "cancelled");

    let (status, page) = app.send("GET", "/api/v1/orders?status=cancelled", Some((customer, "customer")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, _) = app.send("GET", "/api/v1/admin/orders", Some((customer, "customer")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, all) = app.send("GET", "/api/v1/admin/orders?limit=500", Some((Uuid::new_v4(), "admin")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["limit"], 100);
}
