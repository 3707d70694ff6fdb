use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ActionSummary {
    pub name: &'static str,
    pub entity: &'static str,
    pub style: &'static str,
    pub enabled: bool,
    pub rules: Vec<String>,
}

/// GET /api/actions: every registered action with its input rules.
pub async fn list_actions(State(app): State<AppState>) -> Json<Vec<ActionSummary>> {
    let summaries = app
        .registry
        .entries()
        .map(|entry| ActionSummary {
            name: entry.name(),
            entity: entry.def.entity.table(),
            style: entry.def.style.as_str(),
            enabled: app.registry.is_enabled(entry.name()),
            rules: entry
                .rules
                .iter()
                .map(|r| format!("{}: {}", r.field, r.describe()))
                .collect(),
        })
        .collect();
    Json(summaries)
}
