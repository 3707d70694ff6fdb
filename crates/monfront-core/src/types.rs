use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity identifier as issued by the entity API.
pub type Id = u64;

/// Largest id the frontend accepts (signed 64-bit database key).
pub const MAX_ID: Id = i64::MAX as Id;

// ---------------------------------------------------------------------------
// UserType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    User,
    Admin,
    SuperAdmin,
}

impl UserType {
    pub fn all() -> &'static [UserType] {
        &[UserType::User, UserType::Admin, UserType::SuperAdmin]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserType::User => "user",
            UserType::Admin => "admin",
            UserType::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = crate::error::FrontendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "1" => Ok(UserType::User),
            "admin" | "2" => Ok(UserType::Admin),
            "super_admin" | "super-admin" | "3" => Ok(UserType::SuperAdmin),
            _ => Err(crate::error::FrontendError::InvalidUserType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    DiscoveryRule,
    Host,
    HostGroup,
    Trigger,
    User,
    Token,
    Sla,
    Proxy,
    Dashboard,
    Action,
    Maintenance,
    MediaType,
    Item,
}

impl EntityKind {
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::DiscoveryRule,
            EntityKind::Host,
            EntityKind::HostGroup,
            EntityKind::Trigger,
            EntityKind::User,
            EntityKind::Token,
            EntityKind::Sla,
            EntityKind::Proxy,
            EntityKind::Dashboard,
            EntityKind::Action,
            EntityKind::Maintenance,
            EntityKind::MediaType,
            EntityKind::Item,
        ]
    }

    /// Backing table name, as used in `table.field` references.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::DiscoveryRule => "drules",
            EntityKind::Host => "hosts",
            EntityKind::HostGroup => "hstgrp",
            EntityKind::Trigger => "triggers",
            EntityKind::User => "users",
            EntityKind::Token => "token",
            EntityKind::Sla => "sla",
            EntityKind::Proxy => "proxy",
            EntityKind::Dashboard => "dashboard",
            EntityKind::Action => "actions",
            EntityKind::Maintenance => "maintenances",
            EntityKind::MediaType => "media_type",
            EntityKind::Item => "items",
        }
    }

    pub fn id_field(self) -> &'static str {
        match self {
            EntityKind::DiscoveryRule => "druleid",
            EntityKind::Host => "hostid",
            EntityKind::HostGroup => "groupid",
            EntityKind::Trigger => "triggerid",
            EntityKind::User => "userid",
            EntityKind::Token => "tokenid",
            EntityKind::Sla => "slaid",
            EntityKind::Proxy => "proxyid",
            EntityKind::Dashboard => "dashboardid",
            EntityKind::Action => "actionid",
            EntityKind::Maintenance => "maintenanceid",
            EntityKind::MediaType => "mediatypeid",
            EntityKind::Item => "itemid",
        }
    }

    /// Field that must be unique among records of this kind.
    pub fn name_field(self) -> &'static str {
        match self {
            EntityKind::Host => "host",
            EntityKind::User => "username",
            EntityKind::Trigger => "description",
            _ => "name",
        }
    }

    /// Human-readable entity label used in API messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::DiscoveryRule => "Discovery rule",
            EntityKind::Host => "Host",
            EntityKind::HostGroup => "Host group",
            EntityKind::Trigger => "Trigger",
            EntityKind::User => "User",
            EntityKind::Token => "API token",
            EntityKind::Sla => "SLA",
            EntityKind::Proxy => "Proxy",
            EntityKind::Dashboard => "Dashboard",
            EntityKind::Action => "Action",
            EntityKind::Maintenance => "Maintenance",
            EntityKind::MediaType => "Media type",
            EntityKind::Item => "Item",
        }
    }

    pub fn as_str(self) -> &'static str {
        self.table()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::error::FrontendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::all()
            .iter()
            .copied()
            .find(|k| k.table() == s)
            .ok_or_else(|| crate::error::FrontendError::InvalidEntityKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// UiElement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UiElement {
    #[serde(rename = "ui.monitoring.dashboards")]
    MonitoringDashboards,
    #[serde(rename = "ui.services.sla")]
    ServicesSla,
    #[serde(rename = "ui.configuration.hosts")]
    ConfigurationHosts,
    #[serde(rename = "ui.configuration.discovery")]
    ConfigurationDiscovery,
    #[serde(rename = "ui.configuration.maintenance")]
    ConfigurationMaintenance,
    #[serde(rename = "ui.configuration.actions")]
    ConfigurationActions,
    #[serde(rename = "ui.administration.users")]
    AdministrationUsers,
    #[serde(rename = "ui.administration.api_tokens")]
    AdministrationApiTokens,
    #[serde(rename = "ui.administration.proxies")]
    AdministrationProxies,
    #[serde(rename = "ui.user_settings.profile")]
    UserSettingsProfile,
}

impl UiElement {
    pub fn all() -> &'static [UiElement] {
        &[
            UiElement::MonitoringDashboards,
            UiElement::ServicesSla,
            UiElement::ConfigurationHosts,
            UiElement::ConfigurationDiscovery,
            UiElement::ConfigurationMaintenance,
            UiElement::ConfigurationActions,
            UiElement::AdministrationUsers,
            UiElement::AdministrationApiTokens,
            UiElement::AdministrationProxies,
            UiElement::UserSettingsProfile,
        ]
    }

    /// Lowest user type that may ever be granted this element.
    pub fn min_user_type(self) -> UserType {
        match self {
            UiElement::MonitoringDashboards
            | UiElement::ServicesSla
            | UiElement::UserSettingsProfile => UserType::User,
            UiElement::ConfigurationHosts
            | UiElement::ConfigurationDiscovery
            | UiElement::ConfigurationMaintenance
            | UiElement::ConfigurationActions => UserType::Admin,
            UiElement::AdministrationUsers
            | UiElement::AdministrationApiTokens
            | UiElement::AdministrationProxies => UserType::SuperAdmin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UiElement::MonitoringDashboards => "ui.monitoring.dashboards",
            UiElement::ServicesSla => "ui.services.sla",
            UiElement::ConfigurationHosts => "ui.configuration.hosts",
            UiElement::ConfigurationDiscovery => "ui.configuration.discovery",
            UiElement::ConfigurationMaintenance => "ui.configuration.maintenance",
            UiElement::ConfigurationActions => "ui.configuration.actions",
            UiElement::AdministrationUsers => "ui.administration.users",
            UiElement::AdministrationApiTokens => "ui.administration.api_tokens",
            UiElement::AdministrationProxies => "ui.administration.proxies",
            UiElement::UserSettingsProfile => "ui.user_settings.profile",
        }
    }
}

impl fmt::Display for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UiElement {
    type Err = crate::error::FrontendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UiElement::all()
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| crate::error::FrontendError::InvalidUiElement(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ActionCapability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionCapability {
    #[serde(rename = "actions.edit_dashboards")]
    EditDashboards,
    #[serde(rename = "actions.edit_maintenance")]
    EditMaintenance,
    #[serde(rename = "actions.manage_api_tokens")]
    ManageApiTokens,
    #[serde(rename = "actions.manage_sla")]
    ManageSla,
}

impl ActionCapability {
    pub fn all() -> &'static [ActionCapability] {
        &[
            ActionCapability::EditDashboards,
            ActionCapability::EditMaintenance,
            ActionCapability::ManageApiTokens,
            ActionCapability::ManageSla,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionCapability::EditDashboards => "actions.edit_dashboards",
            ActionCapability::EditMaintenance => "actions.edit_maintenance",
            ActionCapability::ManageApiTokens => "actions.manage_api_tokens",
            ActionCapability::ManageSla => "actions.manage_sla",
        }
    }
}

impl fmt::Display for ActionCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionCapability {
    type Err = crate::error::FrontendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionCapability::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| crate::error::FrontendError::InvalidCapability(s.to_string()))
    }
}
