use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::models::tenant::Tenant;
use crate::store::Page;
use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.list(Tenant::COLLECTION, &[], None, Page::new(1, 0)).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "store": "connected" })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "store": e.to_string() })),
        ),
    }
}
