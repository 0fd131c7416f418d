//! Static route requirements and the route table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Mode, Permission, PermissionSet};

/// What a route demands of the session. Declared statically per route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequirement {
    pub require_auth: bool,
    pub require_password_ok: bool,
    pub required_permissions: PermissionSet,
    pub mode: Mode,
}

impl RouteRequirement {
    /// Reachable without signing in.
    pub fn public() -> Self {
        Self {
            require_auth: false,
            require_password_ok: false,
            required_permissions: PermissionSet::new(),
            mode: Mode::All,
        }
    }

    /// Signed-in actor with no pending password change.
    pub fn authenticated() -> Self {
        Self {
            require_auth: true,
            require_password_ok: true,
            ..Self::public()
        }
    }

    /// The password-reset route itself.
    ///
    /// Requires sign-in but not a settled password, otherwise an actor with
    /// a forced reset would be redirected to this route forever.
    pub fn password_reset() -> Self {
        Self {
            require_auth: true,
            require_password_ok: false,
            ..Self::public()
        }
    }

    /// Replace the requirement with "every one of `perms`".
    pub fn require_all(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions = perms.into_iter().collect();
        self.mode = Mode::All;
        self
    }

    /// Replace the requirement with "at least one of `perms`".
    pub fn require_any(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions = perms.into_iter().collect();
        self.mode = Mode::Any;
        self
    }
}

/// Path → requirement registry.
///
/// Lookup is exact first, then the longest registered prefix on a `/`
/// boundary (so `/shipments/42` inherits `/shipments`), then the fallback.
/// The root path only matches exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, RouteRequirement>,
    fallback: RouteRequirement,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    /// Empty table; unknown paths require an authenticated actor.
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
            fallback: RouteRequirement::authenticated(),
        }
    }

    pub fn with_fallback(mut self, fallback: RouteRequirement) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn route(mut self, path: &str, requirement: RouteRequirement) -> Self {
        self.insert(path, requirement);
        self
    }

    pub fn insert(&mut self, path: &str, requirement: RouteRequirement) {
        self.routes.insert(canonical_path(path), requirement);
    }

    /// The platform's declared routes.
    pub fn standard() -> Self {
        use Permission::*;

        Self::new()
            .route("/", RouteRequirement::public())
            .route("/login", RouteRequirement::public())
            .route("/forgot-password", RouteRequirement::public())
            .route("/change-password", RouteRequirement::password_reset())
            .route("/unauthorized", RouteRequirement::authenticated())
            .route("/dashboard", RouteRequirement::authenticated().require_all([ViewDashboard]))
            .route("/shipments", RouteRequirement::authenticated().require_all([ViewShipments]))
            .route(
                "/shipments/new",
                RouteRequirement::authenticated().require_all([CreateShipments]),
            )
            .route(
                "/shipments/approvals",
                RouteRequirement::authenticated().require_all([ApproveShipments]),
            )
            .route("/dispatch", RouteRequirement::authenticated().require_all([AssignRiders]))
            .route(
                "/riders",
                RouteRequirement::authenticated().require_any([ViewRiders, ManageRiders]),
            )
            .route(
                "/deliveries",
                RouteRequirement::authenticated().require_all([UpdateDeliveryStatus]),
            )
            .route(
                "/finance",
                RouteRequirement::authenticated().require_any([ViewFinance, ManageFinance]),
            )
            .route(
                "/finance/payouts",
                RouteRequirement::authenticated().require_all([ManageFinance]),
            )
            .route("/reports", RouteRequirement::authenticated().require_all([ViewReports]))
            .route("/support", RouteRequirement::authenticated().require_all([ManageTickets]))
            .route("/admin/users", RouteRequirement::authenticated().require_all([ManageUsers]))
            .route(
                "/admin/settings",
                RouteRequirement::authenticated().require_all([ManageSettings]),
            )
    }

    /// Requirement for `path`, looked up on its canonical form (see
    /// [`canonical_path`]) so that `/login/../admin` is judged as `/admin`.
    pub fn resolve(&self, path: &str) -> &RouteRequirement {
        let path = canonical_path(path);
        if let Some(requirement) = self.routes.get(&path) {
            return requirement;
        }

        let mut candidate = path.as_str();
        while let Some(idx) = candidate.rfind('/') {
            candidate = &candidate[..idx];
            if candidate.is_empty() {
                break;
            }
            if let Some(requirement) = self.routes.get(candidate) {
                return requirement;
            }
        }

        &self.fallback
    }
}

/// The path a router would actually serve.
///
/// Query and fragment are dropped, `%2e`/`%2f`/`%5c` are decoded, `\` counts
/// as a separator, empty and `.` segments vanish and `..` pops a segment
/// (never above the root). Always starts with `/` and never ends with one
/// unless it is the root.
fn canonical_path(path: &str) -> String {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let decoded = decode_delimiters(&path[..end]);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    format!("/{}", segments.join("/"))
}

fn decode_delimiters(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(idx) = rest.find('%') {
        out.push_str(&rest[..idx]);
        let escape = rest.get(idx..idx + 3).unwrap_or(&rest[idx..]);
        let decoded = match escape.to_ascii_lowercase().as_str() {
            "%2e" => Some('.'),
            "%2f" => Some('/'),
            "%5c" => Some('\\'),
            _ => None,
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[idx + 3..];
            }
            None => {
                out.push('%');
                rest = &rest[idx + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
