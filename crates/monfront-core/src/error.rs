use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("config not found: {0} (run 'monfront init')")]
    ConfigNotFound(PathBuf),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action is disabled: {0}")]
    ActionDisabled(String),

    #[error("invalid user type: {0}")]
    InvalidUserType(String),

    #[error("invalid entity kind: {0}")]
    InvalidEntityKind(String),

    #[error("invalid ui element: {0}")]
    InvalidUiElement(String),

    #[error("invalid action capability: {0}")]
    InvalidCapability(String),

    #[error("invalid seed record for {kind}: {reason}")]
    InvalidSeed { kind: String, reason: String },

    #[error("invalid request parameter '{0}'")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FrontendError>;
