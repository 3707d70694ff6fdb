use super::{Bulk, Change, Landing, Titles};
use crate::pipeline::ActionDef;
use crate::rules::{array_db, one_of, RuleSet};
use crate::types::{EntityKind, UiElement};

/// Trigger, discovery, autoregistration, internal and service events.
const EVENT_SOURCES: [i64; 5] = [0, 1, 2, 3, 4];

const ENABLE: Bulk = Bulk {
    kind: EntityKind::Action,
    field: "actionids",
    change: Change::Set("status", "0"),
    titles: Titles {
        ok: ("Action enabled", "Actions enabled"),
        failed: ("Cannot enable action", "Cannot enable actions"),
    },
    landing: Landing::Json,
    ui: UiElement::ConfigurationActions,
    capability: None,
    scope: Some("eventsource"),
};

const DISABLE: Bulk = Bulk {
    change: Change::Set("status", "1"),
    titles: Titles {
        ok: ("Action disabled", "Actions disabled"),
        failed: ("Cannot disable action", "Cannot disable actions"),
    },
    ..ENABLE
};

const DELETE: Bulk = Bulk {
    change: Change::Delete,
    titles: Titles {
        ok: ("Action deleted", "Actions deleted"),
        failed: ("Cannot delete action", "Cannot delete actions"),
    },
    ..ENABLE
};

fn rules() -> RuleSet {
    RuleSet::new(vec![
        array_db("actionids", EntityKind::Action).required().fatal(),
        one_of("eventsource", EVENT_SOURCES).required(),
    ])
}

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        bulk_action!("action.enable", ENABLE, rules: rules),
        bulk_action!("action.disable", DISABLE, rules: rules),
        bulk_action!("action.delete", DELETE, rules: rules),
    ]
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::api::MemoryApi;
    use crate::input::{RawInput, RawValue};
    use crate::response::Outcome;
    use crate::types::EntityKind;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn api() -> MemoryApi {
        let api = MemoryApi::new();
        seed(
            &api,
            EntityKind::Action,
            &[
                json!({"actionid": "3", "name": "Report problems", "eventsource": "0", "status": "0"}),
                json!({"actionid": "4", "name": "Auto discovery", "eventsource": "1", "status": "0"}),
            ],
        );
        api
    }

    #[test]
    fn ids_must_belong_to_event_source() {
        let api = api();
        let raw = RawInput::new()
            .with("actionids", ids(&["3", "4"]))
            .with("eventsource", "0");
        assert_eq!(run("action.disable", &admin(), &api, raw), Outcome::Denied);

        let raw = RawInput::new().with("actionids", ids(&["3"])).with("eventsource", "0");
        let body = block(&run("action.disable", &admin(), &api, raw));
        assert_eq!(body["success"]["title"], "Action disabled");
        assert_eq!(api.record(EntityKind::Action, 3).unwrap()["status"], json!("1"));
    }

    #[test]
    fn bad_event_source_is_reported() {
        let api = api();
        let raw = RawInput::new().with("actionids", ids(&["3", "4"])).with("eventsource", "7");
        let body = block(&run("action.delete", &admin(), &api, raw));
        assert_eq!(body["error"]["title"], "Cannot delete actions");
        assert_eq!(
            body["error"]["messages"],
            json!(["Incorrect value \"7\" for \"eventsource\" field."])
        );
        assert!(body["error"].get("keepids").is_none());
        assert_eq!(api.count(EntityKind::Action), 2);
    }

    #[test]
    fn keyed_ids_count_for_the_title() {
        let api = api();
        let mut keyed = BTreeMap::new();
        keyed.insert("3".to_string(), RawValue::from("3"));
        let raw = RawInput::new()
            .with("actionids", RawValue::Map(keyed))
            .with("eventsource", "7");
        let body = block(&run("action.enable", &admin(), &api, raw));
        assert_eq!(body["error"]["title"], "Cannot enable action");
    }
}
