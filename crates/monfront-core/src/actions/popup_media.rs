//! Media edit popup: validates one user media row and returns it normalized
//! for the user form. Nothing is stored.

use super::invalid_json;
use crate::api::{ApiResult, Query};
use crate::messages::MessageCollector;
use crate::pipeline::{ActionDef, Context, ResponseStyle};
use crate::response::Outcome;
use crate::rules::{db, one_of, string, FieldRule, RuleKind, RuleSet};
use crate::types::{EntityKind, UiElement};
use crate::validator::Input;
use serde_json::{json, Value};

const SEVERITY_COUNT: u32 = 6;

pub(super) fn defs() -> Vec<ActionDef> {
    vec![ActionDef {
        name: "popup.media",
        entity: EntityKind::MediaType,
        style: ResponseStyle::Json,
        rules,
        check: Some(check_severity),
        invalid: invalid_json,
        authorize,
        execute,
    }]
}

fn rules() -> RuleSet {
    RuleSet::new(vec![
        FieldRule::new("edit", RuleKind::one_of([0, 1])).default_value(0),
        FieldRule::new("row_index", RuleKind::int32()),
        db("mediatypeid", EntityKind::MediaType).required(),
        string("sendto").required().not_empty(),
        FieldRule::new("period", RuleKind::TimePeriods)
            .not_empty()
            .default_value("1-7,00:00-24:00"),
        FieldRule::new("severity", RuleKind::Array),
        one_of("active", [0, 1]).default_value(0),
    ])
}

fn severities(input: &Input) -> Vec<String> {
    match input.get("severity") {
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        Some(Value::Object(map)) => map.values().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    }
}

/// Each selected severity is one of 0..5.
fn check_severity(input: &Input, messages: &mut MessageCollector) -> bool {
    for s in severities(input) {
        if !s.parse::<u32>().is_ok_and(|n| n < SEVERITY_COUNT) {
            messages.error(format!("Incorrect value \"{s}\" for \"severity\" field."));
            return false;
        }
    }
    true
}

fn authorize(ctx: &Context<'_>, _: &Input) -> ApiResult<bool> {
    Ok(ctx.caller.check_access(UiElement::UserSettingsProfile))
}

fn execute(ctx: &Context<'_>, input: &Input, messages: &mut MessageCollector) -> Outcome {
    let mediatypeid = input.id("mediatypeid").unwrap_or_default();
    let typename = match ctx.api.get(ctx.caller, EntityKind::MediaType, &Query::ids(&[mediatypeid])) {
        Ok(found) => found
            .first()
            .and_then(|r| r.get("name"))
            .cloned()
            .unwrap_or(Value::Null),
        Err(e) => {
            messages.extend_errors(e.messages);
            return invalid_json(ctx, messages);
        }
    };

    let mask = severities(input)
        .iter()
        .filter_map(|s| s.parse::<u32>().ok())
        .fold(0u32, |mask, sev| mask | (1 << sev));

    Outcome::data(json!({
        "edit": input.i64("edit").unwrap_or_default(),
        "row_index": input.i64("row_index"),
        "mediatypeid": mediatypeid.to_string(),
        "typename": typename,
        "sendto": input.str("sendto"),
        "period": input.str("period"),
        "severity": mask,
        "active": input.i64("active").unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::api::MemoryApi;
    use crate::input::RawInput;
    use crate::types::EntityKind;
    use serde_json::json;

    fn api() -> MemoryApi {
        let api = MemoryApi::new();
        seed(&api, EntityKind::MediaType, &[json!({"mediatypeid": "1", "name": "Email"})]);
        api
    }

    #[test]
    fn returns_normalized_row() {
        let api = api();
        let raw = RawInput::new()
            .with("mediatypeid", "1")
            .with("sendto", "ops@example.com")
            .with("severity", ids(&["3", "4", "5"]));
        let body = block(&run("popup.media", &user(), &api, raw));
        assert_eq!(body["typename"], "Email");
        assert_eq!(body["period"], "1-7,00:00-24:00");
        assert_eq!(body["severity"], json!(0b111000));
        assert_eq!(body["active"], json!(0));
    }

    #[test]
    fn errors_have_no_title() {
        let api = api();
        let raw = RawInput::new()
            .with("mediatypeid", "9")
            .with("sendto", "")
            .with("period", "1-8,00:00-24:00");
        let body = block(&run("popup.media", &user(), &api, raw));
        assert!(body["error"].get("title").is_none());
        assert_eq!(
            body["error"]["messages"],
            json!([
                "Incorrect value for field \"mediatypeid\": object does not exist.",
                "Incorrect value for field \"sendto\": cannot be empty.",
                "Incorrect value for field \"period\": a time period is expected.",
            ])
        );
    }

    #[test]
    fn severity_out_of_range() {
        let api = api();
        let raw = RawInput::new()
            .with("mediatypeid", "1")
            .with("sendto", "x")
            .with("severity", ids(&["6"]));
        let body = block(&run("popup.media", &user(), &api, raw));
        assert_eq!(body["error"]["messages"], json!(["Incorrect value \"6\" for \"severity\" field."]));
    }
}
