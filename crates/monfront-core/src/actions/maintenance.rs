use super::{record_from, Bulk, Change, Landing, Titles};
use crate::api::{ApiResult, Mutation, Record};
use crate::messages::MessageCollector;
use crate::permission::ids_accessible;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::Outcome;
use crate::rules::{array_db, db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::types::{ActionCapability, EntityKind, UiElement};
use crate::validator::Input;
use serde_json::Value;

const DELETE: Bulk = Bulk {
    kind: EntityKind::Maintenance,
    field: "maintenanceids",
    change: Change::Delete,
    titles: Titles {
        ok: ("Maintenance period deleted", "Maintenance periods deleted"),
        failed: ("Cannot delete maintenance period", "Cannot delete maintenance periods"),
    },
    landing: Landing::Json,
    ui: UiElement::ConfigurationMaintenance,
    capability: Some(ActionCapability::EditMaintenance),
    scope: None,
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef {
            name: "maintenance.create",
            entity: EntityKind::Maintenance,
            style: ResponseStyle::Json,
            rules: create_rules,
            check: Some(check),
            invalid: |_, messages| {
                Outcome::json_error("Cannot create maintenance period", messages.take_texts(), None)
            },
            authorize: authorize_create,
            execute: create,
        },
        ActionDef {
            name: "maintenance.update",
            entity: EntityKind::Maintenance,
            style: ResponseStyle::Json,
            rules: update_rules,
            check: Some(check),
            invalid: |_, messages| {
                Outcome::json_error("Cannot update maintenance period", messages.take_texts(), None)
            },
            authorize: authorize_update,
            execute: update,
        },
        bulk_action!("maintenance.delete", DELETE),
    ]
}

fn create_rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::new("name", RuleKind::string_max(128)).required().not_empty(),
        one_of("maintenance_type", [0, 1]).default_value(0),
        string("description").default_value(""),
        FieldRule::new("active_since", RuleKind::AbsTime).required(),
        FieldRule::new("active_till", RuleKind::AbsTime).required(),
        array_db("groupids", EntityKind::HostGroup),
        array_db("hostids", EntityKind::Host),
        FieldRule::new("timeperiods", RuleKind::Array),
        FieldRule::new("tags", RuleKind::Array),
    ])
}

fn update_rules() -> RuleSet {
    create_rules()
        .without_defaults()
        .with_first(db("maintenanceid", EntityKind::Maintenance).required().fatal())
}

fn check(input: &Input, messages: &mut MessageCollector) -> bool {
    let mut ok = true;
    if let (Some(since), Some(till)) = (input.i64("active_since"), input.i64("active_till")) {
        if since >= till {
            messages.error("Incorrect value for field \"active_till\": must be greater than \"active_since\".");
            ok = false;
        }
    }
    if input.ids("groupids").is_empty() && input.ids("hostids").is_empty() {
        messages.error("At least one host group or host must be selected.");
        ok = false;
    }
    ok
}

fn authorize_create(ctx: &Context<'_>, _: &Input) -> ApiResult<bool> {
    Ok(ctx.caller.check_access(UiElement::ConfigurationMaintenance)
        && ctx.caller.allows(ActionCapability::EditMaintenance))
}

fn authorize_update(ctx: &Context<'_>, input: &Input) -> ApiResult<bool> {
    if !authorize_create(ctx, input)? {
        return Ok(false);
    }
    let id: Vec<_> = input.id("maintenanceid").into_iter().collect();
    ids_accessible(ctx.api, ctx.caller, EntityKind::Maintenance, &id, true)
}

/// API record for create (`update == false`) or update. Targets left out
/// of an update keep their stored value.
fn maintenance_record(input: &Input, update: bool) -> Record {
    let mut fields = vec!["name", "maintenance_type", "description", "active_since", "active_till"];
    if update {
        fields.insert(0, "maintenanceid");
    }
    let mut record = record_from(input, &fields);
    for (field, key) in [("groupids", "groups"), ("hostids", "hosts")] {
        if update && !input.has(field) {
            continue;
        }
        let ids: Vec<Value> = input
            .ids(field)
            .into_iter()
            .map(|id| Value::String(id.to_string()))
            .collect();
        record.insert(key.to_string(), Value::Array(ids));
    }
    for field in ["timeperiods", "tags"] {
        if let Some(v) = input.get(field) {
            record.insert(field.to_string(), v.clone());
        }
    }
    record
}

fn respond(result: ApiResult<Mutation>, ok: &str, failed: &str, messages: &mut MessageCollector) -> Outcome {
    match result {
        Ok(done) => {
            for notice in done.notices {
                messages.info(notice);
            }
            Outcome::json_success(ok, messages.take_texts())
        }
        Err(e) => {
            messages.extend_errors(e.messages);
            Outcome::json_error(failed, messages.take_texts(), None)
        }
    }
}

fn create(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let record = maintenance_record(input, false);
    let result = ctx.api.create(ctx.caller, EntityKind::Maintenance, vec![record]);
    respond(result, "Maintenance period created", "Cannot create maintenance period", messages)
}

fn update(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let record = maintenance_record(input, true);
    let result = ctx.api.update(ctx.caller, EntityKind::Maintenance, vec![record]);
    respond(result, "Maintenance period updated", "Cannot update maintenance period", messages)
}
