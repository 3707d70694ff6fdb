use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::state::{AppState, Session};

/// Paths served without a session.
const PUBLIC_PATHS: &[&str] = &["/healthz"];

/// Resolve the session cookie to a configured user.
///
/// Evaluated in order:
/// 1. Public path → passthrough
/// 2. Cookie matches a configured session → attach [`Session`] and continue
/// 3. Otherwise → 401 JSON for `/api/*`, 302 to the login page for everything else
pub async fn session_middleware(
    State(app): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if PUBLIC_PATHS.contains(&path.as_str()) {
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| cookie_value(cookies, app.cookie_name()))
        .map(str::to_string);

    if let Some(entry) = token.as_deref().and_then(|t| app.config.session(t)) {
        let session = Session {
            token: entry.token.clone(),
            caller: entry.caller(),
        };
        req.extensions_mut().insert(session);
        return next.run(req).await;
    }

    tracing::debug!(path = %path, "request without a valid session");
    if path.starts_with("/api/") {
        json_response(StatusCode::UNAUTHORIZED, r#"{"error":"unauthorized"}"#)
    } else {
        let mut resp = Response::new(Body::empty());
        *resp.status_mut() = StatusCode::FOUND;
        resp.headers_mut()
            .insert(header::LOCATION, header::HeaderValue::from_static("index.php"));
        resp
    }
}

fn json_response(status: StatusCode, body: &'static str) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    resp
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
