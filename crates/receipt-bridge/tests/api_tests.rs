use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use infrastructure::MockPrinterDriver;
use infrastructure::config::BridgeConfig;
use receipt_bridge::{api, print_service_with_driver, state::AppState};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.printer.kind = "mock".to_string();
    config.receipt.store_name = "CORNER CAFE".to_string();
    config
}

fn app_with(config: &BridgeConfig, driver: &MockPrinterDriver) -> Router {
    let service = print_service_with_driver(config, Arc::new(driver.clone())).unwrap();
    let state = AppState::new(Arc::new(service), &config.server, &config.printer.kind);
    api::create_router(Arc::new(state))
}

fn app(driver: &MockPrinterDriver) -> Router {
    app_with(&config(), driver)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn order() -> Value {
    json!({
        "order_id": "1042",
        "customer_name": "Ada",
        "items": [
            { "name": "Flat white", "quantity": 2, "price": 4.5 },
            { "name": "Croissant", "price": 3.25, "notes": "warm" }
        ],
        "payment_method": "card"
    })
}

#[tokio::test] // health_reports_idle_printer
async fn health_reports_idle_printer() {
    let driver = MockPrinterDriver::new();
    let (status, body) = send(app(&driver), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["printer"]["kind"], "mock");
    assert_eq!(body["printer"]["state"], "uninitialized");
    assert!(body["printer"]["handle_id"].is_null());
    // Health never touches the device
    assert_eq!(driver.discover_calls(), 0);
}

#[tokio::test(start_paused = true)] // print_receipt_succeeds
async fn print_receipt_succeeds() {
    let driver = MockPrinterDriver::new();
    let (status, body) = send(app(&driver), post_json("/api/print", order())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Receipt printed successfully");
    assert_eq!(driver.printed().await.len(), 1);
}

#[tokio::test] // malformed_json_is_bad_request
async fn malformed_json_is_bad_request() {
    let driver = MockPrinterDriver::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/print")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app(&driver), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(driver.discover_calls(), 0);
}

#[tokio::test] // invalid_order_is_rejected_before_printing
async fn invalid_order_is_rejected_before_printing() {
    let driver = MockPrinterDriver::new();
    let body = json!({ "items": [{ "name": "Tea", "quantity": 0, "price": 2.0 }] });

    let (status, body) = send(app(&driver), post_json("/api/print", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("quantity"));
    assert_eq!(driver.discover_calls(), 0);
}

#[tokio::test] // missing_printer_is_service_unavailable
async fn missing_printer_is_service_unavailable() {
    let driver = MockPrinterDriver::without_devices();
    let (status, body) = send(app(&driver), post_json("/api/print", order())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No printer device found");
}

#[tokio::test(start_paused = true)] // stuck_printer_is_gateway_timeout
async fn stuck_printer_is_gateway_timeout() {
    let driver = MockPrinterDriver::new();
    driver.set_open_delay(Duration::from_secs(60));

    let (status, body) = send(app(&driver), post_json("/api/print", order())).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("failed after 3 retries"), "{message}");
    assert!(message.contains("timed out"), "{message}");
}

#[tokio::test(start_paused = true)] // test_print_and_status_endpoints
async fn test_print_and_status_endpoints() {
    let driver = MockPrinterDriver::new();

    let (status, body) = send(app(&driver), post_json("/api/print/test", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Test page printed successfully");

    let (status, body) = send(app(&driver), get("/api/printer/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);
    assert_eq!(driver.printed().await.len(), 1);
}

#[tokio::test(start_paused = true)] // api_key_guards_api_routes_only
async fn api_key_guards_api_routes_only() {
    let driver = MockPrinterDriver::new();
    let mut config = config();
    config.server.api_key = Some("s3cret".to_string());
    let app = app_with(&config, &driver);

    let (status, body) = send(app.clone(), post_json("/api/print", order())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let mut wrong = post_json("/api/print", order());
    wrong.headers_mut().insert("x-api-key", "nope".parse().unwrap());
    let (status, _) = send(app.clone(), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut authorized = post_json("/api/print", order());
    authorized.headers_mut().insert("x-api-key", "s3cret".parse().unwrap());
    let (status, _) = send(app.clone(), authorized).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(driver.printed().await.len(), 1);
}

/// Status request from `peer` carrying an X-Forwarded-For header
fn status_request(peer: &str, forwarded_for: &str) -> Request<Body> {
    let mut request = get("/api/printer/status");
    request
        .headers_mut()
        .insert("x-forwarded-for", forwarded_for.parse().unwrap());
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

#[tokio::test(start_paused = true)] // rate_limit_applies_per_client
async fn rate_limit_applies_per_client() {
    let driver = MockPrinterDriver::new();
    let mut config = config();
    config.server.rate_limit_requests = 2;
    let app = app_with(&config, &driver);

    assert_eq!(send(app.clone(), status_request("10.0.0.1:4000", "1.1.1.1")).await.0, StatusCode::OK);
    assert_eq!(send(app.clone(), status_request("10.0.0.1:4001", "2.2.2.2")).await.0, StatusCode::OK);
    // A fresh X-Forwarded-For value does not buy a new window
    let (status, body) = send(app.clone(), status_request("10.0.0.1:4002", "3.3.3.3")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);

    assert_eq!(send(app, status_request("10.0.0.2:4000", "1.1.1.1")).await.0, StatusCode::OK);
}

#[tokio::test(start_paused = true)] // trusted_proxy_limits_by_forwarded_client
async fn trusted_proxy_limits_by_forwarded_client() {
    let driver = MockPrinterDriver::new();
    let mut config = config();
    config.server.rate_limit_requests = 1;
    config.server.trust_forwarded_for = true;
    let app = app_with(&config, &driver);

    let proxy = "172.16.0.1:8080";
    assert_eq!(send(app.clone(), status_request(proxy, "203.0.113.9")).await.0, StatusCode::OK);
    assert_eq!(
        send(app.clone(), status_request(proxy, "203.0.113.9")).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send(app, status_request(proxy, "198.51.100.4")).await.0, StatusCode::OK);
}
