use super::{Bulk, Change, Landing, Titles};
use crate::pipeline::ActionDef;
use crate::types::{EntityKind, UiElement};

const UNBLOCK: Bulk = Bulk {
    kind: EntityKind::User,
    field: "userids",
    change: Change::Set("attempt_failed", "0"),
    titles: Titles {
        ok: ("User unblocked", "Users unblocked"),
        failed: ("Cannot unblock user", "Cannot unblock users"),
    },
    landing: Landing::Json,
    ui: UiElement::AdministrationUsers,
    capability: None,
    scope: None,
};

const DELETE: Bulk = Bulk {
    change: Change::Delete,
    titles: Titles {
        ok: ("User deleted", "Users deleted"),
        failed: ("Cannot delete user", "Cannot delete users"),
    },
    ..UNBLOCK
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![
        bulk_action!("user.unblock", UNBLOCK),
        bulk_action!("user.delete", DELETE),
    ]
}
