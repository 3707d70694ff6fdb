use super::{Bulk, Change, Landing, Titles};
use crate::pipeline::ActionDef;
use crate::types::{EntityKind, UiElement};

const ENABLE: Bulk = Bulk {
    kind: EntityKind::Host,
    field: "hostids",
    change: Change::Set("status", "0"),
    titles: Titles {
        ok: ("Host enabled", "Hosts enabled"),
        failed: ("Cannot enable host", "Cannot enable hosts"),
    },
    landing: Landing::Json,
    ui: UiElement::ConfigurationHosts,
    capability: None,
    scope: None,
};

const DISABLE: Bulk = Bulk {
    change: Change::Set("status", "1"),
    titles: Titles {
        ok: ("Host disabled", "Hosts disabled"),
        failed: ("Cannot disable host", "Cannot disable hosts"),
    },
    ..ENABLE
};

const DELETE: Bulk = Bulk {
    change: Change::Delete,
    titles: Titles {
        ok: ("Host deleted", "Hosts deleted"),
        failed: ("Cannot delete host", "Cannot delete hosts"),
    },
    ..ENABLE
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        bulk_action!("host.enable", ENABLE),
        bulk_action!("host.disable", DISABLE),
        bulk_action!("host.delete", DELETE),
    ]
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::api::{MemoryApi, Verb};
    use crate::input::RawInput;
    use crate::response::Outcome;
    use crate::types::EntityKind;
    use serde_json::json;

    fn api() -> MemoryApi {
        let api = MemoryApi::new();
        seed(
            &api,
            EntityKind::Host,
            &[
                json!({"hostid": "10", "host": "web-1", "status": "0"}),
                json!({"hostid": "11", "host": "web-2", "status": "0"}),
                json!({"hostid": "12", "host": "db-1", "status": "1"}),
            ],
        );
        api
    }

    #[test]
    fn delete_returns_success_block() {
        let api = api();
        let raw = RawInput::new().with("hostids", ids(&["10", "11"]));
        let body = block(&run("host.delete", &admin(), &api, raw));
        assert_eq!(body["success"]["title"], "Hosts deleted");
        assert_eq!(api.count(EntityKind::Host), 1);
    }

    #[test]
    fn single_host_title_is_singular() {
        let api = api();
        let raw = RawInput::new().with("hostids", ids(&["12"]));
        let body = block(&run("host.enable", &admin(), &api, raw));
        assert_eq!(body["success"]["title"], "Host enabled");
        assert_eq!(api.record(EntityKind::Host, 12).unwrap()["status"], json!("0"));
    }

    #[test]
    fn failed_delete_keeps_surviving_ids() {
        let api = api();
        api.fail_on(EntityKind::Host, Verb::Delete, Some(11), "Host \"web-2\" is used by a template.");
        let raw = RawInput::new().with("hostids", ids(&["10", "11"]));
        let body = block(&run("host.delete", &admin(), &api, raw));
        assert_eq!(body["error"]["title"], "Cannot delete hosts");
        assert_eq!(body["error"]["messages"], json!(["Host \"web-2\" is used by a template."]));
        assert_eq!(body["error"]["keepids"], json!(["10", "11"]));
    }

    #[test]
    fn keepids_follow_request_order() {
        let api = api();
        api.restrict(2, EntityKind::Host, [10, 11, 12], [10, 11, 12]);
        api.fail_on(EntityKind::Host, Verb::Update, Some(10), "boom");
        let raw = RawInput::new().with("hostids", ids(&["12", "10"]));
        let body = block(&run("host.disable", &admin(), &api, raw));
        assert_eq!(body["error"]["title"], "Cannot disable hosts");
        assert_eq!(body["error"]["keepids"], json!(["12", "10"]));
        assert_eq!(api.record(EntityKind::Host, 12).unwrap()["status"], json!("1"));
        assert_eq!(api.record(EntityKind::Host, 10).unwrap()["status"], json!("0"));
    }

    #[test]
    fn plain_user_is_denied() {
        let api = api();
        let raw = RawInput::new().with("hostids", ids(&["10"]));
        assert_eq!(run("host.delete", &user(), &api, raw), Outcome::Denied);
    }
}
