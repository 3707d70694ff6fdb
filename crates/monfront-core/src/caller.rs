use crate::types::{ActionCapability, Id, UiElement, UserType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Capability flags attached to a user through their role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub denied_ui: BTreeSet<UiElement>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub denied_actions: BTreeSet<ActionCapability>,
}

impl Role {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn deny_ui(mut self, element: UiElement) -> Self {
        self.denied_ui.insert(element);
        self
    }

    pub fn deny_action(mut self, capability: ActionCapability) -> Self {
        self.denied_actions.insert(capability);
        self
    }
}

/// The authenticated user on whose behalf a request runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub userid: Id,
    pub username: String,
    pub user_type: UserType,
    #[serde(default)]
    pub role: Role,
}

impl Caller {
    pub fn new(userid: Id, username: impl Into<String>, user_type: UserType) -> Self {
        Self {
            userid,
            username: username.into(),
            user_type,
            role: Role::default(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn is_super_admin(&self) -> bool {
        self.user_type == UserType::SuperAdmin
    }

    /// True when the user type is high enough for `element` and the role
    /// does not deny it.
    pub fn check_access(&self, element: UiElement) -> bool {
        self.user_type >= element.min_user_type() && !self.role.denied_ui.contains(&element)
    }

    pub fn allows(&self, capability: ActionCapability) -> bool {
        !self.role.denied_actions.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_reaches_configuration_but_not_administration() {
        let admin = Caller::new(2, "admin", UserType::Admin);
        assert!(admin.check_access(UiElement::ConfigurationDiscovery));
        assert!(!admin.check_access(UiElement::AdministrationUsers));
    }

    #[test]
    fn plain_user_is_limited_to_monitoring() {
        let user = Caller::new(3, "guest", UserType::User);
        assert!(user.check_access(UiElement::MonitoringDashboards));
        assert!(!user.check_access(UiElement::ConfigurationHosts));
    }

    #[test]
    fn role_can_deny_an_element_the_type_allows() {
        let caller = Caller::new(1, "Admin", UserType::SuperAdmin)
            .with_role(Role::named("restricted").deny_ui(UiElement::AdministrationProxies));
        assert!(!caller.check_access(UiElement::AdministrationProxies));
        assert!(caller.check_access(UiElement::AdministrationUsers));
    }

    #[test]
    fn role_can_deny_action_capabilities() {
        let caller = Caller::new(1, "Admin", UserType::SuperAdmin)
            .with_role(Role::named("no-sla").deny_action(ActionCapability::ManageSla));
        assert!(!caller.allows(ActionCapability::ManageSla));
        assert!(caller.allows(ActionCapability::EditDashboards));
    }

    #[test]
    fn role_deserializes_from_yaml() {
        let yaml = "name: ops\ndenied_ui:\n  - ui.configuration.discovery\ndenied_actions:\n  - actions.manage_sla\n";
        let role: Role = serde_yaml::from_str(yaml).unwrap();
        assert!(role.denied_ui.contains(&UiElement::ConfigurationDiscovery));
        assert!(role.denied_actions.contains(&ActionCapability::ManageSla));
    }
}
