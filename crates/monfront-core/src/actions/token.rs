use super::{record_from, Bulk, Change, Landing, Titles};
use crate::api::{ApiResult, Query};
use crate::messages::MessageCollector;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::Outcome;
use crate::rules::{db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::types::{ActionCapability, EntityKind, UiElement};
use crate::validator::Input;
use serde_json::json;

const DELETE: Bulk = Bulk {
    kind: EntityKind::Token,
    field: "tokenids",
    change: Change::Delete,
    titles: Titles {
        ok: ("API token deleted", "API tokens deleted"),
        failed: ("Cannot delete API token", "Cannot delete API tokens"),
    },
    landing: Landing::Json,
    ui: UiElement::UserSettingsProfile,
    capability: Some(ActionCapability::ManageApiTokens),
    scope: None,
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef {
            name: "token.create",
            entity: EntityKind::Token,
            style: ResponseStyle::Json,
            rules,
            check: Some(check_expiry),
            invalid,
            authorize,
            execute: create,
        },
        bulk_action!("token.delete", DELETE),
    ]
}

fn rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::new("name", RuleKind::string_max(64)).required().not_empty(),
        db("userid", EntityKind::User).required(),
        string("description"),
        one_of("expires_state", [0, 1]).default_value(0),
        FieldRule::new("expires_at", RuleKind::AbsTime),
        one_of("status", [0, 1]).default_value(0),
    ])
}

/// An expiring token needs its expiry date.
fn check_expiry(input: &Input, messages: &mut MessageCollector) -> bool {
    if input.i64("expires_state") == Some(1) && !input.has("expires_at") {
        messages.error("Field \"expires_at\" is mandatory.");
        return false;
    }
    true
}

/// Own tokens need the profile screen, tokens of other users the API
/// tokens administration screen. Both need the role capability.
fn authorize(ctx: &Context<'_>, input: &Input) -> ApiResult<bool> {
    if !ctx.caller.allows(ActionCapability::ManageApiTokens) {
        return Ok(false);
    }
    let own = input.id("userid") == Some(ctx.caller.userid);
    if own {
        return Ok(ctx.caller.check_access(UiElement::UserSettingsProfile));
    }
    Ok(ctx.caller.check_access(UiElement::AdministrationApiTokens))
}

fn create(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let mut record = record_from(input, &["name", "userid", "description", "status"]);
    let expires_at = match input.i64("expires_state") {
        Some(1) => input.i64("expires_at").unwrap_or_default(),
        _ => 0,
    };
    record.insert("expires_at".to_string(), json!(expires_at.to_string()));
    record.insert("creator_userid".to_string(), json!(ctx.caller.userid.to_string()));

    match ctx.api.create(ctx.caller, EntityKind::Token, vec![record]) {
        Ok(done) => {
            for notice in done.notices {
                messages.info(notice);
            }
            let tokenid = done.ids.first().copied().unwrap_or_default();
            let name = ctx
                .api
                .get(ctx.caller, EntityKind::Token, &Query::ids(&[tokenid]))
                .ok()
                .and_then(|found| found.into_iter().next())
                .and_then(|r| r.get("name").cloned());
            tracing::info!(tokenid, "API token added");
            Outcome::data(json!({
                "success": {
                    "title": "API token added",
                    "messages": messages.take_texts(),
                },
                "data": {
                    "tokenid": tokenid.to_string(),
                    "name": name,
                }
            }))
        }
        Err(e) => {
            messages.extend_errors(e.messages);
            invalid(ctx, messages)
        }
    }
}

fn invalid(_: &Context<'_>, messages: &mut MessageCollector) -> Outcome {
    Outcome::json_error("Cannot add API token", messages.take_texts(), None)
}
