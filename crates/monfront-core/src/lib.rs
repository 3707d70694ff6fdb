//! Controller layer of the monitoring frontend: request validation,
//! permission checks, entity API calls and response shaping.

pub mod actions;
pub mod api;
pub mod caller;
pub mod config;
pub mod error;
pub mod input;
pub mod messages;
pub mod permission;
pub mod pipeline;
pub mod registry;
pub mod response;
pub mod rules;
pub mod timeparse;
pub mod types;
pub mod validator;

pub use error::{FrontendError, Result};
