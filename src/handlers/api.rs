use axum::{http::StatusCode, response::Json};
use serde_json::{Value, json};

/// Liveness probe: reports the service identity and that it is serving.
pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "OK",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
