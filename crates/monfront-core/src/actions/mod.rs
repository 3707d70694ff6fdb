//! The concrete controllers.
//!
//! Bulk enable/disable/delete controllers share one contract and are
//! declared as a [`Bulk`] table plus the `bulk_action!` macro. Form
//! controllers (create/update, popups) spell out their stage functions.

use crate::api::{id_records, ApiResult, Query};
use crate::input::{RawInput, RawValue};
use crate::messages::MessageCollector;
use crate::permission::{editable_ids, ids_accessible};
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::{plural, Flash, Outcome, PageUrl};
use crate::rules::{array_db, RuleSet};
use crate::types::{ActionCapability, EntityKind, UiElement};
use crate::validator::Input;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Bulk action table
// ---------------------------------------------------------------------------

/// What a bulk action does to each selected record.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Change {
    /// Set `field` to `value` on every record.
    Set(&'static str, &'static str),
    Delete,
}

/// Where a bulk action answers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Landing {
    Json,
    /// Redirect to this list action.
    List(&'static str),
}

impl Landing {
    pub(crate) fn style(self) -> ResponseStyle {
        match self {
            Landing::Json => ResponseStyle::Json,
            Landing::List(_) => ResponseStyle::Redirect,
        }
    }
}

/// Singular/plural titles for success and failure.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Titles {
    pub ok: (&'static str, &'static str),
    pub failed: (&'static str, &'static str),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Bulk {
    pub kind: EntityKind,
    /// Request field holding the selected ids.
    pub field: &'static str,
    pub change: Change,
    pub titles: Titles,
    pub landing: Landing,
    pub ui: UiElement,
    pub capability: Option<ActionCapability>,
    /// Request field whose value the selected records must also match.
    pub scope: Option<&'static str>,
}

macro_rules! bulk_action {
    ($name:expr, $bulk:ident) => {
        bulk_action!($name, $bulk, rules: || $crate::actions::bulk_rules(&$bulk))
    };
    ($name:expr, $bulk:ident, rules: $rules:expr) => {
        $crate::pipeline::ActionDef {
            name: $name,
            entity: $bulk.kind,
            style: $bulk.landing.style(),
            rules: $rules,
            check: None,
            invalid: |ctx, messages| $crate::actions::invalid_bulk(ctx, &$bulk, messages),
            authorize: |ctx, input| $crate::actions::authorize_bulk(ctx, input, &$bulk),
            execute: |ctx, input, messages| $crate::actions::run_bulk(ctx, input, &$bulk, messages),
        }
    };
}

mod action;
mod dashboard;
mod discovery;
mod host;
mod maintenance;
mod popup_generic;
mod popup_media;
mod popup_trigger_expr;
mod proxy;
mod sla;
mod token;
mod trigger;
mod user;

/// Every built-in action definition.
pub fn all() -> Vec<ActionDef> {
    let mut defs = Vec::new();
    defs.extend(discovery::defs());
    defs.extend(host::defs());
    defs.extend(trigger::defs());
    defs.extend(user::defs());
    defs.extend(token::defs());
    defs.extend(sla::defs());
    defs.extend(proxy::defs());
    defs.extend(dashboard::defs());
    defs.extend(action::defs());
    defs.extend(maintenance::defs());
    defs.extend(popup_media::defs());
    defs.extend(popup_generic::defs());
    defs.extend(popup_trigger_expr::defs());
    defs
}

/// `required|fatal|array_db <table>.<id>` on the ids field.
pub(crate) fn bulk_rules(bulk: &Bulk) -> RuleSet {
    RuleSet::new(vec![array_db(bulk.field, bulk.kind).required().fatal()])
}

/// UI access, role capability, then one exact-count lookup of the selected
/// ids among records the caller may edit.
pub(crate) fn authorize_bulk(ctx: &Context<'_>, input: &Input, bulk: &Bulk) -> ApiResult<bool> {
    if !ctx.caller.check_access(bulk.ui) {
        return Ok(false);
    }
    if bulk.capability.is_some_and(|c| !ctx.caller.allows(c)) {
        return Ok(false);
    }
    let ids = input.ids(bulk.field);
    match bulk.scope {
        None => ids_accessible(ctx.api, ctx.caller, bulk.kind, &ids, true),
        Some(field) => {
            let Some(value) = input.get(field) else {
                return Ok(false);
            };
            if ids.is_empty() {
                return Ok(false);
            }
            let query = Query::ids(&ids).editable().filter(field, value.clone());
            let found = ctx.api.get(ctx.caller, bulk.kind, &query)?;
            Ok(found.len() == ids.len())
        }
    }
}

pub(crate) fn run_bulk(
    ctx: &Context<'_>,
    input: &Input,
    bulk: &Bulk,
    messages: &mut MessageCollector,
) -> Outcome {
    let ids = input.ids(bulk.field);
    let result = match bulk.change {
        Change::Set(field, value) => ctx.api.update(
            ctx.caller,
            bulk.kind,
            id_records(bulk.kind, &ids, field, value),
        ),
        Change::Delete => ctx.api.delete(ctx.caller, bulk.kind, &ids),
    };

    match result {
        Ok(mutation) => {
            tracing::info!(kind = %bulk.kind, count = ids.len(), "bulk change applied");
            for notice in mutation.notices {
                messages.info(notice);
            }
            let (one, many) = bulk.titles.ok;
            let title = plural(ids.len(), one, many);
            match bulk.landing {
                Landing::Json => Outcome::json_success(title, messages.take_texts()),
                Landing::List(list) => Outcome::redirect(PageUrl::action(list))
                    .with_flash(Flash::success(title, messages.take_texts()))
                    .with_form_data(RawInput::new().with("uncheck", "1")),
            }
        }
        Err(e) => {
            tracing::warn!(kind = %bulk.kind, error = %e, "bulk change failed");
            messages.extend_errors(e.messages);
            let (one, many) = bulk.titles.failed;
            let title = plural(ids.len(), one, many);
            match bulk.landing {
                Landing::Json => {
                    let keepids = editable_ids(ctx.api, ctx.caller, bulk.kind, &ids);
                    Outcome::json_error(title, messages.take_texts(), Some(&keepids))
                }
                Landing::List(list) => Outcome::redirect(PageUrl::action(list))
                    .with_flash(Flash::error(title, messages.take_texts())),
            }
        }
    }
}

/// Recoverable validation failure of a bulk action (a non-fatal scope field).
pub(crate) fn invalid_bulk(ctx: &Context<'_>, bulk: &Bulk, messages: &mut MessageCollector) -> Outcome {
    // Ids arrive as `ids[]=..` lists or `ids[3]=3` maps.
    let count = match ctx.raw.get(bulk.field) {
        Some(RawValue::List(items)) => items.len(),
        Some(RawValue::Map(map)) => map.len(),
        _ => 0,
    };
    let (one, many) = bulk.titles.failed;
    let title = plural(count, one, many);
    match bulk.landing {
        Landing::Json => Outcome::json_error(title, messages.take_texts(), None),
        Landing::List(list) => Outcome::redirect(PageUrl::action(list))
            .with_flash(Flash::error(title, messages.take_texts())),
    }
}

// ---------------------------------------------------------------------------
// Form helpers
// ---------------------------------------------------------------------------

/// `{"error": {"messages": [...]}}` for popups that have no title.
pub(crate) fn invalid_json(_: &Context<'_>, messages: &mut MessageCollector) -> Outcome {
    Outcome::data(json!({ "error": { "messages": messages.take_texts() } }))
}

/// Copy the listed validated fields into an API record. Ids and numbers are
/// sent as strings, the way stored records keep them.
pub(crate) fn record_from(input: &Input, fields: &[&str]) -> crate::api::Record {
    let mut record = crate::api::Record::new();
    for field in fields {
        if let Some(value) = input.get(field) {
            let value = match value {
                Value::Number(n) => Value::String(n.to_string()),
                other => other.clone(),
            };
            record.insert((*field).to_string(), value);
        }
    }
    record
}
