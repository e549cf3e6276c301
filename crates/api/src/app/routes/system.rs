use axum::{Json, http::StatusCode};
use serde_json::json;

use crate::app::errors;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found(uri: axum::http::Uri) -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("no route for {uri}"))
}
