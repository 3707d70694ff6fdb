//! Per-request control flow: validate, authorize, execute.
//!
//! Each action is a table of plain functions ([`ActionDef`]); there is no
//! controller hierarchy. [`run`] drives one request through the stages
//! exactly once, synchronously, with a fresh [`MessageCollector`].

use crate::api::{ApiResult, EntityApi};
use crate::caller::Caller;
use crate::input::RawInput;
use crate::messages::MessageCollector;
use crate::response::Outcome;
use crate::rules::RuleSet;
use crate::types::EntityKind;
use crate::validator::{CrossCheck, Input, Invalid, Validator};
use serde::Serialize;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Redirect,
    Json,
}

impl ResponseStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseStyle::Redirect => "redirect",
            ResponseStyle::Json => "json",
        }
    }
}

/// Everything a stage function may look at besides the validated input.
pub struct Context<'a> {
    pub action: &'static str,
    pub caller: &'a Caller,
    pub api: &'a dyn EntityApi,
    pub raw: &'a RawInput,
}

pub type RulesFn = fn() -> RuleSet;
pub type InvalidFn = fn(&Context<'_>, &mut MessageCollector) -> Outcome;
pub type AuthorizeFn = fn(&Context<'_>, &Input) -> ApiResult<bool>;
pub type ExecuteFn = fn(&Context<'_>, &Input, &mut MessageCollector) -> Outcome;

#[derive(Clone, Copy)]
pub struct ActionDef {
    pub name: &'static str,
    pub entity: EntityKind,
    pub style: ResponseStyle,
    pub rules: RulesFn,
    pub check: Option<CrossCheck>,
    /// Builds the response when validation fails recoverably.
    pub invalid: InvalidFn,
    pub authorize: AuthorizeFn,
    pub execute: ExecuteFn,
}

impl std::fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDef")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

/// A registered action with its rule set built once.
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub def: ActionDef,
    pub rules: RuleSet,
}

impl ActionEntry {
    pub fn new(def: ActionDef) -> Self {
        let rules = (def.rules)();
        Self { def, rules }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }
}

/// Run one request through `entry`.
pub fn run(entry: &ActionEntry, caller: &Caller, api: &dyn EntityApi, raw: &RawInput) -> Outcome {
    let def = &entry.def;
    let span = tracing::info_span!(
        "action",
        name = def.name,
        userid = caller.userid,
        outcome = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );
    let _guard = span.enter();
    let started = Instant::now();

    let ctx = Context {
        action: def.name,
        caller,
        api,
        raw,
    };
    let mut messages = MessageCollector::new();

    let outcome = match Validator::new(caller, api).validate_with(
        &entry.rules,
        raw,
        def.check,
        &mut messages,
    ) {
        Err(Invalid::Fatal) => {
            tracing::debug!("fatal input");
            Outcome::Fatal
        }
        Err(Invalid::Recoverable) => {
            tracing::debug!(errors = messages.len(), "invalid input");
            (def.invalid)(&ctx, &mut messages)
        }
        Ok(input) => match (def.authorize)(&ctx, &input) {
            Ok(true) => (def.execute)(&ctx, &input, &mut messages),
            Ok(false) => Outcome::Denied,
            Err(e) => {
                tracing::warn!(error = %e, "permission lookup failed");
                Outcome::Denied
            }
        },
    };

    span.record("outcome", outcome.kind());
    span.record("latency_ms", started.elapsed().as_millis() as u64);
    tracing::info!("action finished");
    outcome
}
