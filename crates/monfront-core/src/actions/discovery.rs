use super::{record_from, Bulk, Change, Landing, Titles};
use crate::api::{ApiResult, Record};
use crate::messages::MessageCollector;
use crate::permission::ids_accessible;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::{Flash, Outcome, PageUrl};
use crate::rules::{db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::timeparse::SEC_PER_WEEK;
use crate::types::{EntityKind, UiElement};
use crate::validator::Input;

const LIST: &str = "discovery.list";
const EDIT: &str = "discovery.edit";

const ENABLE: Bulk = Bulk {
    kind: EntityKind::DiscoveryRule,
    field: "druleids",
    change: Change::Set("status", "0"),
    titles: Titles {
        ok: ("Discovery rule enabled", "Discovery rules enabled"),
        failed: ("Cannot enable discovery rule", "Cannot enable discovery rules"),
    },
    landing: Landing::List(LIST),
    ui: UiElement::ConfigurationDiscovery,
    capability: None,
    scope: None,
};

const DISABLE: Bulk = Bulk {
    change: Change::Set("status", "1"),
    titles: Titles {
        ok: ("Discovery rule disabled", "Discovery rules disabled"),
        failed: ("Cannot disable discovery rule", "Cannot disable discovery rules"),
    },
    ..ENABLE
};

const DELETE: Bulk = Bulk {
    change: Change::Delete,
    titles: Titles {
        ok: ("Discovery rule deleted", "Discovery rules deleted"),
        failed: ("Cannot delete discovery rule", "Cannot delete discovery rules"),
    },
    ..ENABLE
};

const FIELDS: &[&str] = &["name", "proxyid", "iprange", "delay", "status", "dchecks"];

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef {
            name: "discovery.create",
            entity: EntityKind::DiscoveryRule,
            style: ResponseStyle::Redirect,
            rules: create_rules,
            check: None,
            invalid: |ctx, messages| form_failure(ctx, "Cannot create discovery rule", messages),
            authorize: authorize_create,
            execute: create,
        },
        ActionDef {
            name: "discovery.update",
            entity: EntityKind::DiscoveryRule,
            style: ResponseStyle::Redirect,
            rules: update_rules,
            check: None,
            invalid: |ctx, messages| form_failure(ctx, "Cannot update discovery rule", messages),
            authorize: authorize_update,
            execute: update,
        },
        bulk_action!("discovery.enable", ENABLE),
        bulk_action!("discovery.disable", DISABLE),
        bulk_action!("discovery.delete", DELETE),
    ]
}

fn create_rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::new("name", RuleKind::string_max(255)).required().not_empty(),
        db("proxyid", EntityKind::Proxy),
        string("iprange").required().not_empty(),
        FieldRule::new("delay", RuleKind::time_unit(1, SEC_PER_WEEK)).default_value("1h"),
        one_of("status", [0, 1]).default_value(0),
        FieldRule::new("dchecks", RuleKind::Array),
    ])
}

fn update_rules() -> RuleSet {
    create_rules()
        .without_defaults()
        .with_first(db("druleid", EntityKind::DiscoveryRule).required().fatal())
}

fn authorize_create(ctx: &Context<'_>, _: &Input) -> ApiResult<bool> {
    Ok(ctx.caller.check_access(UiElement::ConfigurationDiscovery))
}

fn authorize_update(ctx: &Context<'_>, input: &Input) -> ApiResult<bool> {
    if !ctx.caller.check_access(UiElement::ConfigurationDiscovery) {
        return Ok(false);
    }
    let id = input.id("druleid").into_iter().collect::<Vec<_>>();
    ids_accessible(ctx.api, ctx.caller, EntityKind::DiscoveryRule, &id, true)
}

/// Back to the edit form with the submitted values and an error box.
fn form_failure(ctx: &Context<'_>, title: &str, messages: &mut MessageCollector) -> Outcome {
    let mut url = PageUrl::action(EDIT);
    if let Some(id) = ctx.raw.get("druleid").and_then(|v| v.as_str()) {
        url = url.arg("druleid", id);
    }
    Outcome::redirect(url)
        .with_flash(Flash::error(title, messages.take_texts()))
        .with_form_data(ctx.raw.clone())
}

fn saved(ctx: &Context<'_>, title: &str, notices: Vec<String>, messages: &mut MessageCollector) -> Outcome {
    for notice in notices {
        messages.info(notice);
    }
    tracing::info!(action = ctx.action, "discovery rule saved");
    Outcome::redirect(PageUrl::action(LIST)).with_flash(Flash::success(title, messages.take_texts()))
}

fn create(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let record: Record = record_from(input, FIELDS);
    match ctx.api.create(ctx.caller, EntityKind::DiscoveryRule, vec![record]) {
        Ok(done) => saved(ctx, "Discovery rule created", done.notices, messages),
        Err(e) => {
            messages.extend_errors(e.messages);
            form_failure(ctx, "Cannot create discovery rule", messages)
        }
    }
}

fn update(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let mut fields = vec!["druleid"];
    fields.extend_from_slice(FIELDS);
    let record = record_from(input, &fields);
    match ctx.api.update(ctx.caller, EntityKind::DiscoveryRule, vec![record]) {
        Ok(done) => saved(ctx, "Discovery rule updated", done.notices, messages),
        Err(e) => {
            messages.extend_errors(e.messages);
            form_failure(ctx, "Cannot update discovery rule", messages)
        }
    }
}
