use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use monfront_core::api::NO_PERMISSIONS;
use monfront_core::input::RawInput;
use monfront_core::pipeline;
use monfront_core::response::Outcome;
use monfront_core::FrontendError;

use crate::error::AppError;
use crate::state::{AppState, PendingPage, Session};

const FATAL_MESSAGE: &str = "Fatal error, request aborted.";

/// GET|POST /zabbix.php?action=<name>: run one action.
///
/// The query string is overlaid by the form or JSON body; body keys win.
pub async fn dispatch(
    State(app): State<AppState>,
    Extension(session): Extension<Session>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let raw = request_input(query.as_deref(), &headers, &body)?;
    let action = raw
        .get("action")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| FrontendError::InvalidParameter("action".to_string()))?;

    let registry = app.registry.clone();
    let api = app.api.clone();
    let caller = session.caller.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let entry = registry.get(&action)?;
        Ok::<_, FrontendError>(pipeline::run(entry, &caller, api.as_ref(), &raw))
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    match outcome {
        Outcome::Redirect {
            url,
            flash,
            form_data,
        } => {
            app.stash(&session.token, PendingPage { flash, form_data })
                .await;
            Ok((StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response())
        }
        Outcome::Data { main_block } => {
            let body = serde_json::json!({ "main_block": main_block.to_string() });
            Ok(Json(body).into_response())
        }
        Outcome::Fatal => Err(AppError::bad_request(FATAL_MESSAGE)),
        Outcome::Denied => Err(AppError::forbidden(NO_PERMISSIONS)),
    }
}

/// Query parameters overlaid by the request body.
fn request_input(
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<RawInput, FrontendError> {
    let mut raw = RawInput::from_form(query.unwrap_or_default().as_bytes());
    if body.is_empty() {
        return Ok(raw);
    }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    let overlay = if is_json {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        RawInput::from_json(&value)?
    } else {
        RawInput::from_form(body)
    };
    raw = raw.merge(overlay);
    Ok(raw)
}
