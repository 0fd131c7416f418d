//! Role normalization, effective permissions and permission satisfaction.
//!
//! - No IO
//! - No panics
//! - Unknown input always narrows to the least-privileged value

use std::sync::Arc;

use serde_json::Value;

use crate::{Mode, Permission, PermissionCatalog, PermissionSet, Role};

/// Longest raw role value echoed into logs.
const LOGGED_ROLE_MAX_CHARS: usize = 32;

/// Validate an untrusted role value against the closed role set.
///
/// Returns `None` for anything that is not an exact role code. There is no
/// fallback role: missing or forged values fail closed.
pub fn normalize_role(raw: Option<&str>) -> Option<Role> {
    let raw = raw?;
    match raw.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            let shown: String = raw.chars().take(LOGGED_ROLE_MAX_CHARS).collect();
            tracing::warn!(raw_role = %shown, "unrecognized role value; treating as no role");
            None
        }
    }
}

/// Like [`normalize_role`] for a claims field of arbitrary JSON type.
/// Non-string values normalize to `None`.
pub fn normalize_role_value(raw: &Value) -> Option<Role> {
    match raw {
        Value::String(s) => normalize_role(Some(s.as_str())),
        Value::Null => None,
        other => {
            tracing::warn!(kind = json_kind(other), "non-string role value; treating as no role");
            None
        }
    }
}

/// Parse permission codes, dropping (never widening on) unknown ones.
pub fn normalize_permissions<'a, I>(raw: I) -> PermissionSet
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .filter_map(|code| code.parse::<Permission>().ok())
        .collect()
}

/// `true` iff every element of `required` is in `have`. Vacuously `true`
/// when nothing is required.
pub fn has_all(have: &PermissionSet, required: &PermissionSet) -> bool {
    required.is_subset(have)
}

/// `true` iff at least one element of `required` is in `have`. Vacuously
/// `true` when nothing is required: an empty requirement means no
/// restriction, in both modes.
pub fn has_any(have: &PermissionSet, required: &PermissionSet) -> bool {
    required.is_empty() || !required.is_disjoint(have)
}

pub fn satisfies(have: &PermissionSet, required: &PermissionSet, mode: Mode) -> bool {
    match mode {
        Mode::All => has_all(have, required),
        Mode::Any => has_any(have, required),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves effective permissions against a shared catalog.
///
/// Cheap to clone; clones share the same immutable catalog.
#[derive(Debug, Clone)]
pub struct RbacEvaluator {
    catalog: Arc<PermissionCatalog>,
}

impl Default for RbacEvaluator {
    fn default() -> Self {
        Self::new(PermissionCatalog::standard())
    }
}

impl RbacEvaluator {
    pub fn new(catalog: PermissionCatalog) -> Self {
        Self { catalog: Arc::new(catalog) }
    }

    pub fn from_shared(catalog: Arc<PermissionCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &PermissionCatalog {
        &self.catalog
    }

    /// `None` role ⇒ `{}`; otherwise the role's catalog entry.
    pub fn effective_permissions(&self, role: Option<Role>) -> PermissionSet {
        match role {
            Some(role) => self.catalog.permissions_for(role),
            None => PermissionSet::new(),
        }
    }

    /// Normalize an untrusted role value and resolve its permissions.
    pub fn resolve(&self, raw_role: Option<&str>) -> (Option<Role>, PermissionSet) {
        let role = normalize_role(raw_role);
        (role, self.effective_permissions(role))
    }
}
