use crate::api::MemoryApi;
use crate::caller::{Caller, Role};
use crate::error::{FrontendError, Result};
use crate::registry::ActionRegistry;
use crate::types::{EntityKind, Id, UserType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::Path;

pub const CONFIG_FILE: &str = "monfront.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_cookie_name() -> String {
    "zbx_session".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
        }
    }
}

/// A pre-provisioned session: cookie value to authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEntry {
    pub token: String,
    pub userid: Id,
    pub username: String,
    pub user_type: UserType,
    #[serde(default)]
    pub role: Role,
}

impl SessionEntry {
    pub fn caller(&self) -> Caller {
        Caller::new(self.userid, self.username.clone(), self.user_type).with_role(self.role.clone())
    }
}

// ---------------------------------------------------------------------------
// ActionsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
    #[serde(default)]
    pub actions: ActionsConfig,
    /// Records loaded into the in-memory entity API, keyed by table name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seed: BTreeMap<String, Vec<serde_json::Value>>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            sessions: Vec::new(),
            actions: ActionsConfig::default(),
            seed: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FrontendError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => {
                std::fs::create_dir_all(p)?;
                p
            }
            _ => Path::new("."),
        };
        // Readers never see a half-written config.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn session(&self, token: &str) -> Option<&SessionEntry> {
        self.sessions.iter().find(|s| !s.token.is_empty() && s.token == token)
    }

    /// Built-in actions minus the ones disabled here. Unknown names are
    /// skipped; [`validate`](Self::validate) reports them.
    pub fn registry(&self) -> ActionRegistry {
        let mut registry = ActionRegistry::with_defaults();
        for name in &self.actions.disabled {
            if let Err(e) = registry.disable(name) {
                tracing::warn!(error = %e, "ignoring disabled action");
            }
        }
        registry
    }

    /// In-memory entity API loaded with the seed records.
    pub fn memory_api(&self) -> Result<MemoryApi> {
        let api = MemoryApi::new();
        api.seed(&self.seed)?;
        Ok(api)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let registry = ActionRegistry::with_defaults();

        for name in &self.actions.disabled {
            if !registry.contains(name) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("unknown action '{name}' in actions.disabled"),
                });
            }
        }

        if self.session.cookie_name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "session.cookie_name is empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (i, session) in self.sessions.iter().enumerate() {
            if session.token.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("sessions[{i}] ('{}') has an empty token", session.username),
                });
            } else if !seen.insert(session.token.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("sessions[{i}] ('{}') reuses another session's token", session.username),
                });
            }
        }

        for table in self.seed.keys() {
            if table.parse::<EntityKind>().is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("unknown table '{table}' in seed"),
                });
            }
        }

        if self.sessions.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no sessions configured; every request will be rejected".to_string(),
            });
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
version: 1
server:
  port: 9090
sessions:
  - token: abc
    userid: 1
    username: Admin
    user_type: super_admin
  - token: def
    userid: 2
    username: ops
    user_type: admin
    role:
      name: ops
      denied_actions: [actions.manage_sla]
actions:
  disabled: [host.delete]
seed:
  drules:
    - { druleid: "5", name: "Local network", status: "0" }
"#;

    #[test]
    fn parses_with_defaults() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.bind, "127.0.0.1");
        assert_eq!(cfg.session.cookie_name, "zbx_session");
        assert_eq!(cfg.sessions.len(), 2);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn session_lookup_builds_caller() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let caller = cfg.session("def").unwrap().caller();
        assert_eq!(caller.user_type, UserType::Admin);
        assert!(!caller.allows(crate::types::ActionCapability::ManageSla));
        assert!(cfg.session("nope").is_none());
    }

    #[test]
    fn registry_honours_disabled_actions() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let registry = cfg.registry();
        assert!(!registry.is_enabled("host.delete"));
        assert!(registry.is_enabled("host.enable"));
    }

    #[test]
    fn memory_api_is_seeded() {
        let cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        let api = cfg.memory_api().unwrap();
        assert_eq!(api.count(EntityKind::DiscoveryRule), 1);
    }

    #[test]
    fn validate_flags_problems() {
        let mut cfg: Config = serde_yaml::from_str(SAMPLE).unwrap();
        cfg.actions.disabled.push("queue.overview".to_string());
        cfg.sessions[1].token = "abc".to_string();
        cfg.session.cookie_name = String::new();
        cfg.seed.insert("bogus".to_string(), Vec::new());

        let warnings = cfg.validate();
        let errors = warnings.iter().filter(|w| w.level == WarnLevel::Error).count();
        assert_eq!(errors, 3);
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("queue.overview")));
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("etc/monfront").join(CONFIG_FILE);
        Config::new().save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap().version, 1);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        assert!(matches!(Config::load(&path), Err(FrontendError::ConfigNotFound(_))));

        let mut cfg = Config::new();
        cfg.server.port = 7000;
        cfg.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.server.port, 7000);
        assert!(loaded.sessions.is_empty());
    }
}
