//! Static role → permission table.
//!
//! Built once at process start and read-only afterwards, so a shared
//! reference can be read from any number of threads without locking.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{Permission, PermissionSet, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("malformed catalog document: {0}")]
    Malformed(String),

    #[error("catalog references unknown role '{0}'")]
    UnknownRole(String),

    #[error("catalog entry for role '{role}' references unknown permission '{code}'")]
    UnknownPermission { role: Role, code: String },
}

/// Default permission set for each role.
///
/// Total: a role without a configured entry resolves to the empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionCatalog {
    entries: BTreeMap<Role, PermissionSet>,
}

impl PermissionCatalog {
    /// The platform's built-in table.
    ///
    /// `APP_OWNER` carries only its administrative permissions here; its
    /// route access comes from the super-role bypass in the access guard.
    pub fn standard() -> Self {
        use Permission::*;

        Self::from_entries([
            (Role::AppOwner, vec![ManageUsers, ManageSettings]),
            (
                Role::Admin,
                vec![
                    ViewDashboard,
                    ViewShipments,
                    CreateShipments,
                    ApproveShipments,
                    AssignRiders,
                    ViewRiders,
                    ManageRiders,
                    ViewFinance,
                    ViewReports,
                    ManageTickets,
                    ManageUsers,
                ],
            ),
            (Role::Supervisor, vec![ViewShipments, ApproveShipments]),
            (
                Role::Dispatcher,
                vec![
                    ViewDashboard,
                    ViewShipments,
                    CreateShipments,
                    AssignRiders,
                    ViewRiders,
                ],
            ),
            (
                Role::FinanceStaff,
                vec![ViewDashboard, ViewFinance, ManageFinance, ViewReports],
            ),
            (Role::SupportAgent, vec![ViewShipments, ManageTickets]),
            (Role::Rider, vec![ViewShipments, UpdateDeliveryStatus]),
            (Role::Customer, vec![ViewShipments]),
        ])
    }

    /// Build a catalog from `(role, permissions)` pairs.
    ///
    /// Repeated roles are merged (union of their permissions).
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Role, P)>,
        P: IntoIterator<Item = Permission>,
    {
        let mut map: BTreeMap<Role, PermissionSet> = BTreeMap::new();
        for (role, perms) in entries {
            map.entry(role).or_default().extend(perms);
        }
        Self { entries: map }
    }

    /// Load a catalog from a JSON document of the form
    /// `{ "SUPERVISOR": ["VIEW_SHIPMENTS", ...], ... }`.
    ///
    /// Unknown role or permission codes are rejected: a typo in the policy
    /// table must stop startup rather than silently drop a grant.
    pub fn from_json(doc: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(doc).map_err(|e| CatalogError::Malformed(e.to_string()))?;

        let mut entries = Vec::with_capacity(raw.len());
        for (role_code, perm_codes) in raw {
            let role: Role = role_code
                .parse()
                .map_err(|_| CatalogError::UnknownRole(role_code.clone()))?;

            let mut perms = PermissionSet::new();
            for code in perm_codes {
                let perm: Permission = code
                    .parse()
                    .map_err(|_| CatalogError::UnknownPermission { role, code: code.clone() })?;
                perms.insert(perm);
            }
            entries.push((role, perms));
        }

        Ok(Self::from_entries(entries))
    }

    /// Default permissions for `role`. Never fails; unconfigured roles get `{}`.
    pub fn permissions_for(&self, role: Role) -> PermissionSet {
        self.entries.get(&role).cloned().unwrap_or_default()
    }

    /// Roles whose entry contains `permission` (audit/explanation helper).
    pub fn roles_granting(&self, permission: Permission) -> Vec<Role> {
        self.entries
            .iter()
            .filter(|(_, perms)| perms.contains(&permission))
            .map(|(role, _)| *role)
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Role, &PermissionSet)> {
        self.entries.iter().map(|(role, perms)| (*role, perms))
    }
}
