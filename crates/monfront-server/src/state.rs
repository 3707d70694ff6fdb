use monfront_core::api::EntityApi;
use monfront_core::caller::Caller;
use monfront_core::config::Config;
use monfront_core::input::RawInput;
use monfront_core::registry::ActionRegistry;
use monfront_core::response::Flash;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What a redirect leaves behind for the page it lands on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PendingPage {
    pub flash: Option<Flash>,
    pub form_data: Option<RawInput>,
}

/// The authenticated session attached to a request by the session middleware.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub caller: Caller,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ActionRegistry>,
    pub api: Arc<dyn EntityApi>,
    /// Session token to the flash and form echo of its last redirect.
    pub pending: Arc<RwLock<HashMap<String, PendingPage>>>,
}

impl AppState {
    pub fn new(config: Config, api: Arc<dyn EntityApi>) -> Self {
        let registry = config.registry();
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            api,
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// State backed by the in-memory API seeded from the config.
    pub fn from_config(config: Config) -> monfront_core::Result<Self> {
        let api = config.memory_api()?;
        Ok(Self::new(config, Arc::new(api)))
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.session.cookie_name
    }

    /// Replace whatever the session had pending with the given page state.
    pub async fn stash(&self, token: &str, page: PendingPage) {
        self.pending.write().await.insert(token.to_string(), page);
    }

    /// Take the pending page state; a second call returns the empty default.
    pub async fn take(&self, token: &str) -> PendingPage {
        self.pending.write().await.remove(token).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monfront_core::response::Flash;

    #[tokio::test]
    async fn pending_page_is_taken_once() {
        let state = AppState::from_config(Config::new()).unwrap();
        let page = PendingPage {
            flash: Some(Flash::success("Host enabled", vec![])),
            form_data: None,
        };
        state.stash("abc", page).await;

        let first = state.take("abc").await;
        assert_eq!(first.flash.unwrap().title, "Host enabled");
        assert!(state.take("abc").await.flash.is_none());
    }

    #[test]
    fn registry_follows_config() {
        let mut config = Config::new();
        config.actions.disabled.push("host.delete".to_string());
        let state = AppState::from_config(config).unwrap();
        assert!(!state.registry.is_enabled("host.delete"));
        assert_eq!(state.cookie_name(), "zbx_session");
    }
}
