use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::Utc;
use domain::{OrderData, PrintOutcome};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::require_api_key;
use crate::error::ApiError;
use crate::rate_limit::rate_limit;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Layers run bottom-up: rate limit first, then the key check
    let api = Router::new()
        .route("/print", post(print_receipt))
        .route("/print/test", post(print_test))
        .route("/printer/status", get(printer_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = &state.print_service;
    let handle = service.current_handle().await;
    let connection = service.connection_state().await;

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
        "printer": {
            "kind": state.printer_kind,
            "state": connection.as_str(),
            "ready": connection.is_ready(),
            "handle_id": handle.as_ref().map(|h| h.id()),
            "device": handle.as_ref().map(|h| h.label().to_string()),
        }
    }))
}

async fn print_receipt(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OrderData>, JsonRejection>,
) -> Result<Json<PrintOutcome>, ApiError> {
    let Json(order) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    order.validate()?;

    let outcome = state.print_service.print_receipt(&order).await?;
    info!(order_id = ?order.order_id, "Receipt printed");
    Ok(Json(outcome))
}

async fn print_test(State(state): State<Arc<AppState>>) -> Result<Json<PrintOutcome>, ApiError> {
    Ok(Json(state.print_service.print_test().await?))
}

async fn printer_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let connected = state.print_service.test_connectivity().await?;
    Ok(Json(json!({
        "success": true,
        "connected": connected,
        "message": "Printer is reachable",
    })))
}
