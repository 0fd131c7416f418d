//! Session snapshot consumed by the access guard.
//!
//! A session is a plain value: created loading, populated once by the
//! identity collaborator, replaced on refresh and dropped on sign-out. The
//! guard and the evaluator only ever read it.

use serde::{Deserialize, Serialize};

use opsgate_core::ActorId;

use crate::claims::SessionClaims;
use crate::{PermissionSet, RbacEvaluator, Role};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub actor_id: Option<ActorId>,
    pub role: Option<Role>,
    pub permissions: PermissionSet,
    pub must_change_password: bool,
    pub loading: bool,
}

impl Session {
    /// Identity resolution has not completed yet.
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// No actor (never signed in, or signed out).
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Populate a session from the identity service's answer.
    ///
    /// `raw_role` is untrusted and is normalized against the closed role set.
    pub fn resolve(
        actor_id: ActorId,
        raw_role: Option<&str>,
        must_change_password: bool,
        evaluator: &RbacEvaluator,
    ) -> Self {
        let (role, permissions) = evaluator.resolve(raw_role);
        Self {
            actor_id: Some(actor_id),
            role,
            permissions,
            must_change_password,
            loading: false,
        }
    }

    /// Rebuild a session from verified artifact claims.
    pub fn from_claims(claims: &SessionClaims, evaluator: &RbacEvaluator) -> Self {
        Self::resolve(
            claims.sub,
            claims.role.as_deref(),
            claims.must_change_password,
            evaluator,
        )
    }

    pub fn actor_id(&self) -> Option<ActorId> {
        self.actor_id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn must_change_password(&self) -> bool {
        self.must_change_password
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.actor_id.is_some()
    }
}
