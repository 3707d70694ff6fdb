use super::{record_from, Bulk, Change, Landing, Titles};
use crate::api::{ApiResult, Mutation, Record};
use crate::messages::MessageCollector;
use crate::permission::ids_accessible;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::Outcome;
use crate::rules::{db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::timeparse::{parse_time_periods, SEC_PER_DAY, SEC_PER_HOUR, SEC_PER_MIN};
use crate::types::{ActionCapability, EntityKind, UiElement};
use crate::validator::Input;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Bulk
// ---------------------------------------------------------------------------

const ENABLE: Bulk = Bulk {
    kind: EntityKind::Sla,
    field: "slaids",
    change: Change::Set("status", "1"),
    titles: Titles {
        ok: ("SLA enabled", "SLAs enabled"),
        failed: ("Cannot enable SLA", "Cannot enable SLAs"),
    },
    landing: Landing::Json,
    ui: UiElement::ServicesSla,
    capability: Some(ActionCapability::ManageSla),
    scope: None,
};

const DISABLE: Bulk = Bulk {
    change: Change::Set("status", "0"),
    titles: Titles {
        ok: ("SLA disabled", "SLAs disabled"),
        failed: ("Cannot disable SLA", "Cannot disable SLAs"),
    },
    ..ENABLE
};

const DELETE: Bulk = Bulk {
    change: Change::Delete,
    titles: Titles {
        ok: ("SLA deleted", "SLAs deleted"),
        failed: ("Cannot delete SLA", "Cannot delete SLAs"),
    },
    ..ENABLE
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        ActionDef {
            name: "sla.create",
            entity: EntityKind::Sla,
            style: ResponseStyle::Json,
            rules: create_rules,
            check: Some(check),
            invalid: |_, messages| Outcome::json_error("Cannot create SLA", messages.take_texts(), None),
            authorize: authorize_create,
            execute: create,
        },
        ActionDef {
            name: "sla.update",
            entity: EntityKind::Sla,
            style: ResponseStyle::Json,
            rules: update_rules,
            check: Some(check),
            invalid: |_, messages| Outcome::json_error("Cannot update SLA", messages.take_texts(), None),
            authorize: authorize_update,
            execute: update,
        },
        bulk_action!("sla.enable", ENABLE),
        bulk_action!("sla.disable", DISABLE),
        bulk_action!("sla.delete", DELETE),
    ]
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

const PERIOD_DAILY: i64 = 0;
const PERIOD_ANNUALLY: i64 = 4;
const SCHEDULE_CUSTOM: i64 = 1;

fn downtime_rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::new("name", RuleKind::string_max(255)).required().not_empty(),
        FieldRule::new("period_from", RuleKind::AbsTime).required(),
        FieldRule::new("duration_days", RuleKind::int_range(0, 3650)).default_value(0),
        FieldRule::new("duration_hours", RuleKind::int_range(0, 23)).default_value(0),
        FieldRule::new("duration_minutes", RuleKind::int_range(0, 59)).default_value(0),
    ])
}

fn create_rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::new("name", RuleKind::string_max(255)).required().not_empty(),
        FieldRule::new("slo", RuleKind::float_range(0.0, 100.0)).required(),
        FieldRule::new("period", RuleKind::int_range(PERIOD_DAILY, PERIOD_ANNUALLY)).required(),
        FieldRule::new("timezone", RuleKind::string_max(50)).default_value("system"),
        one_of("schedule_mode", [0, 1]).default_value(0),
        FieldRule::new("schedule", RuleKind::TimePeriods),
        FieldRule::new("effective_date", RuleKind::AbsTime),
        one_of("status", [0, 1]).default_value(1),
        string("description").default_value(""),
        FieldRule::new("service_tags", RuleKind::Array),
        FieldRule::new("excluded_downtimes", RuleKind::Objects(downtime_rules())),
    ])
}

fn update_rules() -> RuleSet {
    create_rules()
        .without_defaults()
        .with_first(db("slaid", EntityKind::Sla).required().fatal())
}

fn downtime_seconds(row: &Value) -> i64 {
    let part = |f: &str| row.get(f).and_then(Value::as_i64).unwrap_or_default();
    part("duration_days") * SEC_PER_DAY
        + part("duration_hours") * SEC_PER_HOUR
        + part("duration_minutes") * SEC_PER_MIN
}

/// Custom schedules need periods; every excluded downtime needs a length.
fn check(input: &Input, messages: &mut MessageCollector) -> bool {
    let mut ok = true;
    if input.i64("schedule_mode") == Some(SCHEDULE_CUSTOM) && !input.has("schedule") {
        messages.error("Field \"schedule\" is mandatory.");
        ok = false;
    }
    let rows = input
        .get("excluded_downtimes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, row) in rows.iter().enumerate() {
        if downtime_seconds(row) <= 0 {
            messages.error(format!(
                "Incorrect value for field \"excluded_downtimes/{}/duration\": must be greater than zero.",
                i + 1
            ));
            ok = false;
        }
    }
    ok
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

fn authorize_create(ctx: &Context<'_>, _: &Input) -> ApiResult<bool> {
    Ok(ctx.caller.check_access(UiElement::ServicesSla) && ctx.caller.allows(ActionCapability::ManageSla))
}

fn authorize_update(ctx: &Context<'_>, input: &Input) -> ApiResult<bool> {
    if !authorize_create(ctx, input)? {
        return Ok(false);
    }
    let id: Vec<_> = input.id("slaid").into_iter().collect();
    ids_accessible(ctx.api, ctx.caller, EntityKind::Sla, &id, true)
}

/// `d-d,hh:mm-hh:mm` periods as `{period_from, period_to}` seconds since
/// the start of the week, one entry per day.
fn schedule_rows(schedule: &str) -> Vec<Value> {
    let Ok(periods) = parse_time_periods(schedule) else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for p in periods {
        for day in p.day_from..=p.day_to {
            let base = i64::from(day - 1) * SEC_PER_DAY;
            rows.push(json!({
                "period_from": base + i64::from(p.start) * SEC_PER_MIN,
                "period_to": base + i64::from(p.end) * SEC_PER_MIN,
            }));
        }
    }
    rows
}

fn downtime_rows(rows: &[Value]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let from = row.get("period_from").and_then(Value::as_i64).unwrap_or_default();
            json!({
                "name": row.get("name").cloned().unwrap_or(Value::Null),
                "period_from": from,
                "period_to": from + downtime_seconds(row),
            })
        })
        .collect()
}

/// API record for create (`update == false`) or update. An update carries
/// only what the request names, so stored schedules and downtimes survive
/// a rename.
fn sla_record(input: &Input, update: bool) -> Record {
    let mut fields = vec!["name", "slo", "period", "timezone", "effective_date", "status", "description"];
    if update {
        fields.insert(0, "slaid");
    }
    let mut record = record_from(input, &fields);

    if let Some(mode) = input.i64("schedule_mode") {
        let schedule = match (mode, input.str("schedule")) {
            (SCHEDULE_CUSTOM, Some(s)) => schedule_rows(s),
            _ => Vec::new(),
        };
        record.insert("schedule".to_string(), Value::Array(schedule));
    }

    if let Some(tags) = input.get("service_tags") {
        record.insert("service_tags".to_string(), tags.clone());
    }

    match input.get("excluded_downtimes").and_then(Value::as_array) {
        Some(rows) => {
            record.insert("excluded_downtimes".to_string(), Value::Array(downtime_rows(rows)));
        }
        None if !update => {
            record.insert("excluded_downtimes".to_string(), Value::Array(Vec::new()));
        }
        None => {}
    }
    record
}

fn respond(
    result: ApiResult<Mutation>,
    ok: &str,
    failed: &str,
    messages: &mut MessageCollector,
) -> Outcome {
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
    let result = ctx.api.create(ctx.caller, EntityKind::Sla, vec![sla_record(input, false)]);
    respond(result, "SLA created", "Cannot create SLA", messages)
}

fn update(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let result = ctx.api.update(ctx.caller, EntityKind::Sla, vec![sla_record(input, true)]);
    respond(result, "SLA updated", "Cannot update SLA", messages)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::schedule_rows;
    use crate::api::MemoryApi;
    use crate::caller::Role;
    use crate::input::{RawInput, RawValue};
    use crate::response::Outcome;
    use crate::types::{ActionCapability, EntityKind};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn downtime(name: &str, days: &str, hours: &str) -> RawValue {
        let mut row = BTreeMap::new();
        row.insert("name".to_string(), RawValue::from(name));
        row.insert("period_from".to_string(), RawValue::from("2024-05-01 00:00"));
        row.insert("duration_days".to_string(), RawValue::from(days));
        row.insert("duration_hours".to_string(), RawValue::from(hours));
        RawValue::Map(row)
    }

    fn base() -> RawInput {
        RawInput::new()
            .with("name", "Gold")
            .with("slo", "99.9")
            .with("period", "2")
    }

    #[test]
    fn create_with_schedule_and_downtimes() {
        let api = MemoryApi::new();
        let raw = base()
            .with("schedule_mode", "1")
            .with("schedule", "1-5,09:00-18:00")
            .with("excluded_downtimes", RawValue::List(vec![downtime("Upgrade", "0", "4")]));
        let body = block(&run("sla.create", &user(), &api, raw));
        assert_eq!(body["success"]["title"], "SLA created");

        let sla = api.record(EntityKind::Sla, 1).unwrap();
        assert_eq!(sla["slo"], json!("99.9"));
        assert_eq!(sla["status"], json!("1"));
        assert_eq!(sla["schedule"].as_array().unwrap().len(), 5);
        assert_eq!(sla["excluded_downtimes"][0]["period_to"], json!(1_714_521_600 + 4 * 3600));
    }

    #[test]
    fn slo_out_of_range() {
        let api = MemoryApi::new();
        let raw = base().with("slo", "120");
        let body = block(&run("sla.create", &user(), &api, raw));
        assert_eq!(body["error"]["title"], "Cannot create SLA");
        assert_eq!(body["error"]["messages"], json!(["Incorrect value \"120\" for \"slo\" field."]));
    }

    #[test]
    fn zero_length_downtime_is_rejected() {
        let api = MemoryApi::new();
        let raw = base().with(
            "excluded_downtimes",
            RawValue::List(vec![downtime("ok", "1", "0"), downtime("empty", "0", "0")]),
        );
        let body = block(&run("sla.create", &user(), &api, raw));
        assert_eq!(
            body["error"]["messages"],
            json!(["Incorrect value for field \"excluded_downtimes/2/duration\": must be greater than zero."])
        );
        assert_eq!(api.count(EntityKind::Sla), 0);
    }

    #[test]
    fn custom_schedule_requires_periods() {
        let api = MemoryApi::new();
        let raw = base().with("schedule_mode", "1");
        let body = block(&run("sla.create", &user(), &api, raw));
        assert_eq!(body["error"]["messages"], json!(["Field \"schedule\" is mandatory."]));
    }

    #[test]
    fn manage_sla_capability_is_required() {
        let api = MemoryApi::new();
        let caller = user().with_role(Role::named("ro").deny_action(ActionCapability::ManageSla));
        assert_eq!(run("sla.create", &caller, &api, base()), Outcome::Denied);
    }

    #[test]
    fn update_and_bulk_disable() {
        let api = MemoryApi::new();
        seed(&api, EntityKind::Sla, &[json!({"slaid": "4", "name": "Gold", "status": "1"})]);
        let raw = base().with("slaid", "4").with("name", "Platinum");
        let body = block(&run("sla.update", &user(), &api, raw));
        assert_eq!(body["success"]["title"], "SLA updated");
        assert_eq!(api.record(EntityKind::Sla, 4).unwrap()["name"], json!("Platinum"));

        let raw = RawInput::new().with("slaids", ids(&["4"]));
        let body = block(&run("sla.disable", &user(), &api, raw));
        assert_eq!(body["success"]["title"], "SLA disabled");
        assert_eq!(api.record(EntityKind::Sla, 4).unwrap()["status"], json!("0"));
    }

    #[test]
    fn rename_keeps_stored_fields() {
        let api = MemoryApi::new();
        seed(
            &api,
            EntityKind::Sla,
            &[json!({
                "slaid": "4",
                "name": "Gold",
                "status": "0",
                "description": "Tier one",
                "schedule": [{"period_from": 0, "period_to": 3600}],
                "excluded_downtimes": [{"name": "Upgrade", "period_from": 10, "period_to": 20}],
            })],
        );
        let raw = base().with("slaid", "4").with("name", "Platinum");
        let body = block(&run("sla.update", &user(), &api, raw));
        assert_eq!(body["success"]["title"], "SLA updated");

        let sla = api.record(EntityKind::Sla, 4).unwrap();
        assert_eq!(sla["name"], json!("Platinum"));
        assert_eq!(sla["status"], json!("0"));
        assert_eq!(sla["description"], json!("Tier one"));
        assert_eq!(sla["schedule"], json!([{"period_from": 0, "period_to": 3600}]));
        assert_eq!(sla["excluded_downtimes"][0]["name"], json!("Upgrade"));
    }

    #[test]
    fn update_switches_back_to_full_schedule() {
        let api = MemoryApi::new();
        seed(
            &api,
            EntityKind::Sla,
            &[json!({"slaid": "4", "name": "Gold", "schedule": [{"period_from": 0, "period_to": 3600}]})],
        );
        let raw = base().with("slaid", "4").with("schedule_mode", "0");
        run("sla.update", &user(), &api, raw);
        assert_eq!(api.record(EntityKind::Sla, 4).unwrap()["schedule"], json!([]));
    }

    #[test]
    fn schedule_rows_expand_day_ranges() {
        let rows = schedule_rows("6-7,10:00-12:00");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["period_from"], json!(5 * 86_400 + 36_000));
        assert_eq!(rows[1]["period_to"], json!(6 * 86_400 + 43_200));
    }
}
