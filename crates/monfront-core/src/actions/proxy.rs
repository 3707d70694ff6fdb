use super::{Bulk, Change, Landing, Titles};
use crate::pipeline::ActionDef;
use crate::types::{EntityKind, UiElement};

const DELETE: Bulk = Bulk {
    kind: EntityKind::Proxy,
    field: "proxyids",
    change: Change::Delete,
    titles: Titles {
        ok: ("Proxy deleted", "Proxies deleted"),
        failed: ("Cannot delete proxy", "Cannot delete proxies"),
    },
    landing: Landing::Json,
    ui: UiElement::AdministrationProxies,
    capability: None,
    scope: None,
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![bulk_action!("proxy.delete", DELETE)]
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use crate::api::{MemoryApi, Verb};
    use crate::input::RawInput;
    use crate::types::EntityKind;
    use serde_json::json;

    #[test]
    fn delete_and_notice() {
        let api = MemoryApi::new();
        seed(&api, EntityKind::Proxy, &[json!({"proxyid": "20", "name": "edge"})]);
        api.notice_on(EntityKind::Proxy, Verb::Delete, "Proxy configuration cache reloaded.");
        let raw = RawInput::new().with("proxyids", ids(&["20"]));
        let body = block(&run("proxy.delete", &super_admin(), &api, raw));
        assert_eq!(body["success"]["title"], "Proxy deleted");
        assert_eq!(
            body["success"]["messages"],
            json!(["Proxy configuration cache reloaded."])
        );
        assert_eq!(api.count(EntityKind::Proxy), 0);
    }
}
