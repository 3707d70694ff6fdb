use super::{Bulk, Change, Landing, Titles};
use crate::pipeline::ActionDef;
use crate::types::{ActionCapability, EntityKind, UiElement};

const DELETE: Bulk = Bulk {
    kind: EntityKind::Dashboard,
    field: "dashboardids",
    change: Change::Delete,
    titles: Titles {
        ok: ("Dashboard deleted", "Dashboards deleted"),
        failed: ("Cannot delete dashboard", "Cannot delete dashboards"),
    },
    landing: Landing::List("dashboard.list"),
    ui: UiElement::MonitoringDashboards,
    capability: Some(ActionCapability::EditDashboards),
    scope: None,
};

pub(super) fn defs() -> Vec<ActionDef> {
    vec![bulk_action!("dashboard.delete", DELETE)]
}
