use axum::Json;

/// GET /healthz: liveness check, served without a session.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
