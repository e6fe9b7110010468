use axum::response::Json;
use chrono::Utc;
use serde_json::{Value, json};

/// Liveness check for the callback server.
///
/// Reports the daemon version and its current wall-clock time, which doubles
/// as a sanity check for the staleness timestamps the updater computes.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "time": Utc::now().to_rfc3339(),
    }))
}
