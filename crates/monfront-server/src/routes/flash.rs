use axum::extract::State;
use axum::{Extension, Json};

use crate::state::{AppState, PendingPage, Session};

/// GET /api/flash: hand the session's pending flash and form echo to the
/// page being rendered. Both are consumed by this call.
pub async fn take_flash(
    State(app): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<PendingPage> {
    Json(app.take(&session.token).await)
}
