use super::{Bulk, Change, Landing, Titles};
use crate::pipeline::ActionDef;
use crate::types::{EntityKind, UiElement};

const ENABLE: Bulk = Bulk {
    kind: EntityKind::Trigger,
    field: "triggerids",
    change: Change::Set("status", "0"),
    titles: Titles {
        ok: ("Trigger enabled", "Triggers enabled"),
        failed: ("Cannot enable trigger", "Cannot enable triggers"),
    },
    landing: Landing::Json,
    ui: UiElement::ConfigurationHosts,
    capability: None,
    scope: None,
};

const DISABLE: Bulk = Bulk {
    change: Change::Set("status", "1"),
    titles: Titles {
        ok: ("Trigger disabled", "Triggers disabled"),
        failed: ("Cannot disable trigger", "Cannot disable triggers"),
    },
    ..ENABLE
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        bulk_action!("trigger.enable", ENABLE),
        bulk_action!("trigger.disable", DISABLE),
    ]
}
