pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use monfront_core::config::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Front controller
        .route(
            "/zabbix.php",
            get(routes::dispatch::dispatch).post(routes::dispatch::dispatch),
        )
        // Page support
        .route("/api/flash", get(routes::flash::take_flash))
        .route("/api/actions", get(routes::actions::list_actions))
        .route("/healthz", get(routes::health::healthz))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            auth::session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Router over the in-memory entity API seeded from `config`.
pub fn build_router_from_config(config: Config) -> anyhow::Result<Router> {
    let app_state = state::AppState::from_config(config)?;
    Ok(build_router(app_state))
}

/// Start the frontend server on `bind:port`.
pub async fn serve(config: Config, bind: &str, port: u16) -> anyhow::Result<()> {
    let addr = format!("{bind}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(config, listener).await
}

/// Start the frontend server on a pre-bound listener.
///
/// Lets the caller read the actual port first (useful when `port = 0` and
/// the OS picks a free one).
pub async fn serve_on(config: Config, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual = listener.local_addr()?;
    let sessions = config.sessions.len();
    let app = build_router_from_config(config)?;

    tracing::info!(addr = %actual, sessions, "monfront listening");

    axum::serve(listener, app).await?;
    Ok(())
}
