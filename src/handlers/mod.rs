//! HTTP handlers and route table

pub mod items;

use axum::{
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use crate::state::AppState;

/// Routes gated by the rate limiter
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(items::list_items).post(items::create_item))
        .route(
            "/inventory/{id}",
            get(items::get_item)
                .put(items::update_item)
                .delete(items::delete_item),
        )
}

/// Liveness probe, deliberately outside the rate limiter
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
