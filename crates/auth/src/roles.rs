use core::str::FromStr;

use serde::{Deserialize, Serialize};

use opsgate_core::CoreError;

/// Role identifier used for RBAC.
///
/// The set is closed: anything the identity service hands us that is not one
/// of these codes is treated as "no role" by the evaluator, never as a
/// default role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform owner. Designated super role by default.
    AppOwner,
    Admin,
    Supervisor,
    Dispatcher,
    FinanceStaff,
    SupportAgent,
    Rider,
    Customer,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::AppOwner,
        Role::Admin,
        Role::Supervisor,
        Role::Dispatcher,
        Role::FinanceStaff,
        Role::SupportAgent,
        Role::Rider,
        Role::Customer,
    ];

    /// Wire code, e.g. `"FINANCE_STAFF"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AppOwner => "APP_OWNER",
            Role::Admin => "ADMIN",
            Role::Supervisor => "SUPERVISOR",
            Role::Dispatcher => "DISPATCHER",
            Role::FinanceStaff => "FINANCE_STAFF",
            Role::SupportAgent => "SUPPORT_AGENT",
            Role::Rider => "RIDER",
            Role::Customer => "CUSTOMER",
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    /// Exact, case-sensitive match against the wire codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| CoreError::validation(format!("unknown role code '{s}'")))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
