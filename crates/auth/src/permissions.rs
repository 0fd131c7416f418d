use core::str::FromStr;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use opsgate_core::CoreError;

/// Capability identifier checked against a route's or action's requirements.
///
/// A permission absent from an actor's set is implicitly denied.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    ViewDashboard,
    ViewShipments,
    CreateShipments,
    ApproveShipments,
    UpdateDeliveryStatus,
    AssignRiders,
    ViewRiders,
    ManageRiders,
    ViewFinance,
    ManageFinance,
    ViewReports,
    ManageTickets,
    ManageUsers,
    ManageSettings,
}

/// Unique, order-irrelevant permission collection.
///
/// Ordered so that iteration (and therefore logging and serialization) is
/// deterministic.
pub type PermissionSet = BTreeSet<Permission>;

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::ViewDashboard,
        Permission::ViewShipments,
        Permission::CreateShipments,
        Permission::ApproveShipments,
        Permission::UpdateDeliveryStatus,
        Permission::AssignRiders,
        Permission::ViewRiders,
        Permission::ManageRiders,
        Permission::ViewFinance,
        Permission::ManageFinance,
        Permission::ViewReports,
        Permission::ManageTickets,
        Permission::ManageUsers,
        Permission::ManageSettings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "VIEW_DASHBOARD",
            Permission::ViewShipments => "VIEW_SHIPMENTS",
            Permission::CreateShipments => "CREATE_SHIPMENTS",
            Permission::ApproveShipments => "APPROVE_SHIPMENTS",
            Permission::UpdateDeliveryStatus => "UPDATE_DELIVERY_STATUS",
            Permission::AssignRiders => "ASSIGN_RIDERS",
            Permission::ViewRiders => "VIEW_RIDERS",
            Permission::ManageRiders => "MANAGE_RIDERS",
            Permission::ViewFinance => "VIEW_FINANCE",
            Permission::ManageFinance => "MANAGE_FINANCE",
            Permission::ViewReports => "VIEW_REPORTS",
            Permission::ManageTickets => "MANAGE_TICKETS",
            Permission::ManageUsers => "MANAGE_USERS",
            Permission::ManageSettings => "MANAGE_SETTINGS",
        }
    }
}

impl FromStr for Permission {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|perm| perm.as_str() == s)
            .ok_or_else(|| CoreError::validation(format!("unknown permission code '{s}'")))
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a set of required permissions is matched against held permissions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Every required permission must be held.
    #[default]
    All,
    /// At least one required permission must be held.
    Any,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_round_trip_through_from_str() {
        for perm in Permission::ALL {
            assert_eq!(perm.as_str().parse::<Permission>().unwrap(), perm);
            assert_eq!(
                serde_json::to_value(perm).unwrap(),
                serde_json::Value::String(perm.as_str().to_string())
            );
        }
    }

    #[test]
    fn unknown_code_is_a_validation_error() {
        let err = "MANAGE_EVERYTHING".parse::<Permission>().unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn mode_defaults_to_all() {
        assert_eq!(Mode::default(), Mode::All);
    }
}
