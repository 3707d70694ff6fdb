use std::sync::Arc;

use axum::http::StatusCode;
use http_body_util::BodyExt;
use monfront_core::api::{MemoryApi, Verb};
use monfront_core::config::Config;
use monfront_core::types::EntityKind;
use monfront_server::state::AppState;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const CONFIG: &str = r#"
sessions:
  - token: root-token
    userid: 1
    username: Admin
    user_type: super_admin
  - token: ops-token
    userid: 2
    username: ops
    user_type: admin
  - token: guest-token
    userid: 3
    username: guest
    user_type: user
actions:
  disabled: [trigger.disable]
seed:
  drules:
    - { druleid: "5", name: "Local network", iprange: "192.168.0.1-254", status: "0" }
    - { druleid: "7", name: "DMZ", iprange: "10.0.0.1-254", status: "0" }
  hosts:
    - { hostid: "10", host: "web-1", status: "0" }
    - { hostid: "11", host: "web-2", status: "0" }
"#;

fn config() -> Config {
    serde_yaml::from_str(CONFIG).unwrap()
}

/// Router plus a handle on the API behind it.
fn app_with(api: MemoryApi) -> (axum::Router, Arc<MemoryApi>) {
    let config = config();
    api.seed(&config.seed).unwrap();
    let api = Arc::new(api);
    let state = AppState::new(config, api.clone());
    (monfront_server::build_router(state), api)
}

fn app() -> (axum::Router, Arc<MemoryApi>) {
    app_with(MemoryApi::new())
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    json: serde_json::Value,
}

async fn send(app: axum::Router, req: axum::http::Request<axum::body::Body>) -> Reply {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get("location")
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    Reply {
        status,
        location,
        json,
    }
}

/// GET with the given session token.
async fn get(app: axum::Router, uri: &str, token: &str) -> Reply {
    let req = axum::http::Request::builder()
        .uri(uri)
        .header("cookie", format!("zbx_session={token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    send(app, req).await
}

/// POST a urlencoded form with the given session token.
async fn post_form(app: axum::Router, uri: &str, token: &str, form: &str) -> Reply {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("cookie", format!("zbx_session={token}"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from(form.to_string()))
        .unwrap();
    send(app, req).await
}

/// Decode the string-encoded `main_block` member.
fn main_block(reply: &Reply) -> serde_json::Value {
    let raw = reply.json["main_block"].as_str().expect("main_block string");
    serde_json::from_str(raw).unwrap()
}

// ---------------------------------------------------------------------------
// Redirect actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovery_disable_redirects_and_leaves_flash() {
    let (app, api) = app();
    let reply = post_form(
        app.clone(),
        "/zabbix.php?action=discovery.disable",
        "root-token",
        "druleids[]=5&druleids[]=7",
    )
    .await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("zabbix.php?action=discovery.list"));
    assert_eq!(
        api.record(EntityKind::DiscoveryRule, 7).unwrap()["status"],
        serde_json::json!("1")
    );

    let page = get(app.clone(), "/api/flash", "root-token").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.json["flash"]["kind"], "success");
    assert_eq!(page.json["flash"]["title"], "Discovery rules disabled");
    assert_eq!(page.json["form_data"]["uncheck"], "1");

    // Consumed by the first read.
    let again = get(app, "/api/flash", "root-token").await;
    assert!(again.json["flash"].is_null());
}

#[tokio::test]
async fn discovery_disable_failure_reports_api_messages() {
    let api = MemoryApi::new();
    api.fail_on(
        EntityKind::DiscoveryRule,
        Verb::Update,
        Some(7),
        "Discovery rule \"DMZ\" is locked.",
    );
    let (app, api) = app_with(api);
    let reply = post_form(
        app.clone(),
        "/zabbix.php?action=discovery.disable",
        "root-token",
        "druleids[]=5&druleids[]=7",
    )
    .await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.location.as_deref(), Some("zabbix.php?action=discovery.list"));
    assert_eq!(
        api.record(EntityKind::DiscoveryRule, 5).unwrap()["status"],
        serde_json::json!("0")
    );

    let page = get(app, "/api/flash", "root-token").await;
    assert_eq!(page.json["flash"]["kind"], "error");
    assert_eq!(page.json["flash"]["title"], "Cannot disable discovery rules");
    assert_eq!(
        page.json["flash"]["messages"],
        serde_json::json!(["Discovery rule \"DMZ\" is locked."])
    );
}

#[tokio::test]
async fn flash_is_per_session() {
    let (app, _) = app();
    post_form(
        app.clone(),
        "/zabbix.php?action=discovery.enable",
        "root-token",
        "druleids[]=5",
    )
    .await;
    let other = get(app, "/api/flash", "ops-token").await;
    assert!(other.json["flash"].is_null());
}

// ---------------------------------------------------------------------------
// JSON actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn host_delete_returns_main_block() {
    let (app, api) = app();
    let reply = post_form(
        app,
        "/zabbix.php?action=host.delete",
        "ops-token",
        "hostids[]=10",
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(main_block(&reply)["success"]["title"], "Host deleted");
    assert!(api.record(EntityKind::Host, 10).is_none());
}

#[tokio::test]
async fn failed_bulk_update_carries_keepids() {
    let api = MemoryApi::new();
    api.fail_on(EntityKind::Host, Verb::Update, Some(11), "Host \"web-2\" is locked.");
    let (app, _) = app_with(api);
    let reply = get(
        app,
        "/zabbix.php?action=host.disable&hostids%5B%5D=11&hostids%5B%5D=10",
        "ops-token",
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let block = main_block(&reply);
    assert_eq!(block["error"]["title"], "Cannot disable hosts");
    assert_eq!(block["error"]["keepids"], serde_json::json!(["11", "10"]));
}

// ---------------------------------------------------------------------------
// Refusals
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unauthorized_caller_gets_403() {
    let (app, api) = app();
    let reply = get(
        app,
        "/zabbix.php?action=discovery.delete&druleids%5B%5D=5",
        "guest-token",
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(
        reply.json["error"],
        "No permissions to referred object or it does not exist!"
    );
    assert_eq!(api.count(EntityKind::DiscoveryRule), 2);
}

#[tokio::test]
async fn missing_fatal_field_gets_400() {
    let (app, _) = app();
    let reply = get(app, "/zabbix.php?action=discovery.delete", "root-token").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.json["error"].is_string());
}

#[tokio::test]
async fn unknown_and_disabled_actions_get_404() {
    let (app, _) = app();
    let unknown = get(app.clone(), "/zabbix.php?action=queue.overview", "root-token").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let disabled = get(
        app,
        "/zabbix.php?action=trigger.disable&triggerids%5B%5D=1",
        "root-token",
    )
    .await;
    assert_eq!(disabled.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_action_parameter_gets_400() {
    let (app, _) = app();
    let reply = get(app, "/zabbix.php", "root-token").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Sessions and support routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_session_redirects_pages_and_rejects_api() {
    let (app, _) = app();
    let page = get(app.clone(), "/zabbix.php?action=host.delete", "nope").await;
    assert_eq!(page.status, StatusCode::FOUND);
    assert_eq!(page.location.as_deref(), Some("index.php"));

    let api = get(app, "/api/actions", "nope").await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn healthz_needs_no_session() {
    let (app, _) = app();
    let req = axum::http::Request::builder()
        .uri("/healthz")
        .body(axum::body::Body::empty())
        .unwrap();
    let reply = send(app, req).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json["status"], "ok");
}

#[tokio::test]
async fn actions_listing_marks_disabled_entries() {
    let (app, _) = app();
    let reply = get(app, "/api/actions", "guest-token").await;
    assert_eq!(reply.status, StatusCode::OK);
    let list = reply.json.as_array().unwrap();
    let find = |name: &str| list.iter().find(|a| a["name"] == name).unwrap().clone();

    let disabled = find("trigger.disable");
    assert_eq!(disabled["enabled"], false);
    let enable = find("discovery.enable");
    assert_eq!(enable["enabled"], true);
    assert_eq!(enable["style"], "redirect");
    assert_eq!(enable["entity"], "drules");
}
