use axum::response::Json;
use serde_json::{Value, json};

/// Liveness probe of the redirect receiver.
pub async fn health() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "role": "oauth-redirect-receiver",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
