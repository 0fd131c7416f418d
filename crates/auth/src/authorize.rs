//! Access guard: turns a session snapshot and a route requirement into a
//! navigation decision.
//!
//! There is no guard state between calls. Every decision is computed fresh
//! from immutable inputs, so the policy can be shared across threads and
//! invoked once per pending navigation.

use serde::Serialize;

use opsgate_core::ActorId;

use crate::rbac::satisfies;
use crate::{
    Mode, Permission, PermissionCatalog, PermissionSet, Role, RouteRequirement, RouteTable, Session,
};

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Session not resolved yet; suspend rendering and re-evaluate later.
    Pending,
    Allow,
    RedirectLogin,
    RedirectPasswordReset,
    RedirectUnauthorized,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Where the navigation layer should send the actor, if anywhere.
    pub fn redirect_target<'a>(&self, targets: &'a RedirectTargets) -> Option<&'a str> {
        match self {
            Decision::Pending | Decision::Allow => None,
            Decision::RedirectLogin => Some(targets.login.as_str()),
            Decision::RedirectPasswordReset => Some(targets.password_reset.as_str()),
            Decision::RedirectUnauthorized => Some(targets.unauthorized.as_str()),
        }
    }
}

/// Redirect destinations used by the navigation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectTargets {
    pub login: String,
    pub password_reset: String,
    pub unauthorized: String,
}

impl Default for RedirectTargets {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            password_reset: "/change-password".to_string(),
            unauthorized: "/unauthorized".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Which rule produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    SessionLoading,
    NotAuthenticated,
    PasswordChangeRequired,
    SuperRole,
    NoPermissionsRequired,
    PermissionsSatisfied,
    MissingPermissions,
}

/// Detailed, serializable explanation of a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionExplanation {
    pub decision: Decision,
    pub reason: DecisionReason,
    pub actor_id: Option<ActorId>,
    pub role: Option<Role>,
    pub mode: Mode,
    pub required_permissions: Vec<Permission>,
    /// For `ALL`: required minus held. For a denied `ANY`: every required
    /// permission. Empty unless the decision is `RedirectUnauthorized`.
    pub missing_permissions: Vec<Permission>,
}

impl DecisionExplanation {
    /// Roles whose catalog entry alone would satisfy the requirement.
    pub fn granting_roles(&self, catalog: &PermissionCatalog) -> Vec<Role> {
        let required: PermissionSet = self.required_permissions.iter().copied().collect();
        catalog
            .entries()
            .filter(|(_, perms)| satisfies(perms, &required, self.mode))
            .map(|(role, _)| role)
            .collect()
    }
}

/// Routing/action policy.
///
/// The super role, when set, bypasses fine-grained permission checks
/// entirely (after the authentication and password-reset rules). This is
/// an intentional owner override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub super_role: Option<Role>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            super_role: Some(Role::AppOwner),
        }
    }
}

impl AccessPolicy {
    pub fn with_super_role(role: Role) -> Self {
        Self { super_role: Some(role) }
    }

    pub fn without_super_role() -> Self {
        Self { super_role: None }
    }

    fn is_super(&self, session: &Session) -> bool {
        session.role.is_some() && session.role == self.super_role
    }

    /// Decide a navigation. Rules are evaluated strictly in order:
    ///
    /// 1. loading ⇒ `Pending`
    /// 2. auth required, no actor ⇒ `RedirectLogin`
    /// 3. auth and settled password required, reset pending ⇒ `RedirectPasswordReset`
    /// 4. super role ⇒ `Allow`
    /// 5. nothing required ⇒ `Allow`
    /// 6. permissions satisfied under the route's mode ⇒ `Allow`, else `RedirectUnauthorized`
    pub fn decide(&self, session: &Session, requirement: &RouteRequirement) -> Decision {
        self.explain(session, requirement).decision
    }

    pub fn decide_path(&self, session: &Session, routes: &RouteTable, path: &str) -> Decision {
        self.decide(session, routes.resolve(path))
    }

    pub fn explain(
        &self,
        session: &Session,
        requirement: &RouteRequirement,
    ) -> DecisionExplanation {
        let (decision, reason, missing) = self.evaluate(session, requirement);

        if !decision.is_allowed() {
            tracing::debug!(
                decision = ?decision,
                reason = ?reason,
                actor_id = ?session.actor_id,
                role = ?session.role,
                "access not granted"
            );
        }

        DecisionExplanation {
            decision,
            reason,
            actor_id: session.actor_id,
            role: session.role,
            mode: requirement.mode,
            required_permissions: requirement.required_permissions.iter().copied().collect(),
            missing_permissions: missing,
        }
    }

    fn evaluate(
        &self,
        session: &Session,
        requirement: &RouteRequirement,
    ) -> (Decision, DecisionReason, Vec<Permission>) {
        if session.loading {
            return (Decision::Pending, DecisionReason::SessionLoading, Vec::new());
        }
        if requirement.require_auth && session.actor_id.is_none() {
            return (Decision::RedirectLogin, DecisionReason::NotAuthenticated, Vec::new());
        }
        if requirement.require_auth
            && requirement.require_password_ok
            && session.must_change_password
        {
            return (
                Decision::RedirectPasswordReset,
                DecisionReason::PasswordChangeRequired,
                Vec::new(),
            );
        }
        if self.is_super(session) {
            return (Decision::Allow, DecisionReason::SuperRole, Vec::new());
        }

        let required = &requirement.required_permissions;
        if required.is_empty() {
            return (Decision::Allow, DecisionReason::NoPermissionsRequired, Vec::new());
        }
        if satisfies(&session.permissions, required, requirement.mode) {
            return (Decision::Allow, DecisionReason::PermissionsSatisfied, Vec::new());
        }

        let missing = required.difference(&session.permissions).copied().collect();
        (Decision::RedirectUnauthorized, DecisionReason::MissingPermissions, missing)
    }

    /// Action-level check: `required` under `mode` as if it guarded a route
    /// that also demands a signed-in actor with a settled password. Loading
    /// and signed-out sessions are never permitted, and neither is an actor
    /// with a pending password reset, super role included.
    pub fn permits(&self, session: &Session, required: &PermissionSet, mode: Mode) -> bool {
        let requirement = RouteRequirement {
            require_auth: true,
            require_password_ok: true,
            required_permissions: required.clone(),
            mode,
        };
        self.evaluate(session, &requirement).0.is_allowed()
    }
}

/// Decide with the default policy (`APP_OWNER` as super role).
pub fn decide(session: &Session, requirement: &RouteRequirement) -> Decision {
    AccessPolicy::default().decide(session, requirement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RbacEvaluator;
    use proptest::prelude::*;

    fn session_for(role: &str) -> Session {
        Session::resolve(ActorId::new(), Some(role), false, &RbacEvaluator::default())
    }

    fn route(perms: &[Permission], mode: Mode) -> RouteRequirement {
        let req = RouteRequirement::authenticated();
        match mode {
            Mode::All => req.require_all(perms.iter().copied()),
            Mode::Any => req.require_any(perms.iter().copied()),
        }
    }

    #[test]
    fn loading_session_is_pending_regardless_of_route() {
        let session = Session::loading();
        assert_eq!(decide(&session, &RouteRequirement::public()), Decision::Pending);
        assert_eq!(decide(&session, &RouteRequirement::authenticated()), Decision::Pending);
    }

    #[test]
    fn anonymous_actor_is_sent_to_login() {
        let session = Session::signed_out();
        assert_eq!(decide(&session, &RouteRequirement::authenticated()), Decision::RedirectLogin);
        assert_eq!(decide(&session, &RouteRequirement::public()), Decision::Allow);
    }

    #[test]
    fn anonymous_actor_on_public_route_with_permissions_is_unauthorized() {
        let req = RouteRequirement::public().require_all([Permission::ViewReports]);
        assert_eq!(decide(&Session::signed_out(), &req), Decision::RedirectUnauthorized);
    }

    #[test]
    fn supervisor_scenario() {
        let session = session_for("SUPERVISOR");
        assert_eq!(
            decide(&session, &route(&[Permission::ApproveShipments], Mode::All)),
            Decision::Allow
        );
        assert_eq!(
            decide(&session, &route(&[Permission::ManageFinance], Mode::All)),
            Decision::RedirectUnauthorized
        );
    }

    #[test]
    fn password_reset_takes_precedence_over_permissions() {
        let mut session = session_for("SUPERVISOR");
        session.must_change_password = true;
        let req = route(&[Permission::ManageFinance], Mode::All);
        assert_eq!(decide(&session, &req), Decision::RedirectPasswordReset);
    }

    #[test]
    fn password_reset_route_is_reachable_during_forced_reset() {
        let mut session = session_for("RIDER");
        session.must_change_password = true;
        assert_eq!(decide(&session, &RouteRequirement::password_reset()), Decision::Allow);
        assert_eq!(
            decide(&Session::signed_out(), &RouteRequirement::password_reset()),
            Decision::RedirectLogin
        );
    }

    #[test]
    fn password_rule_only_applies_to_routes_requiring_auth() {
        let mut session = session_for("RIDER");
        session.must_change_password = true;
        let req = RouteRequirement {
            require_auth: false,
            require_password_ok: true,
            ..RouteRequirement::public()
        };
        assert_eq!(decide(&session, &req), Decision::Allow);
    }

    #[test]
    fn super_role_bypasses_missing_catalog_permissions() {
        let session = session_for("APP_OWNER");
        assert!(!session.permissions.contains(&Permission::ManageFinance));
        let req = route(&[Permission::ManageFinance, Permission::UpdateDeliveryStatus], Mode::All);
        let explanation = AccessPolicy::default().explain(&session, &req);
        assert_eq!(explanation.decision, Decision::Allow);
        assert_eq!(explanation.reason, DecisionReason::SuperRole);
    }

    #[test]
    fn super_role_does_not_skip_password_reset() {
        let mut session = session_for("APP_OWNER");
        session.must_change_password = true;
        assert_eq!(
            decide(&session, &route(&[Permission::ManageUsers], Mode::All)),
            Decision::RedirectPasswordReset
        );
    }

    #[test]
    fn bypass_can_be_disabled_or_moved() {
        let owner = session_for("APP_OWNER");
        let req = route(&[Permission::ManageFinance], Mode::All);
        assert_eq!(
            AccessPolicy::without_super_role().decide(&owner, &req),
            Decision::RedirectUnauthorized
        );

        let admin = session_for("ADMIN");
        assert_eq!(
            AccessPolicy::with_super_role(Role::Admin).decide(&admin, &req),
            Decision::Allow
        );
    }

    #[test]
    fn role_less_session_never_matches_super_role() {
        let session =
            Session::resolve(ActorId::new(), Some("root"), false, &RbacEvaluator::default());
        let policy = AccessPolicy { super_role: None };
        assert!(!policy.is_super(&session));
        assert!(!AccessPolicy::default().is_super(&session));
    }

    #[test]
    fn empty_requirement_allows_any_authenticated_actor() {
        let session = Session::resolve(ActorId::new(), None, false, &RbacEvaluator::default());
        let explanation =
            AccessPolicy::default().explain(&session, &RouteRequirement::authenticated());
        assert_eq!(explanation.decision, Decision::Allow);
        assert_eq!(explanation.reason, DecisionReason::NoPermissionsRequired);
    }

    #[test]
    fn any_mode_allows_partial_overlap() {
        let session = session_for("DISPATCHER");
        let req = route(&[Permission::ViewRiders, Permission::ManageRiders], Mode::Any);
        assert_eq!(decide(&session, &req), Decision::Allow);
        let req = route(&[Permission::ViewRiders, Permission::ManageRiders], Mode::All);
        assert_eq!(decide(&session, &req), Decision::RedirectUnauthorized);
    }

    #[test]
    fn explanation_lists_missing_permissions_and_granting_roles() {
        let session = session_for("DISPATCHER");
        let req = route(&[Permission::ViewRiders, Permission::ManageRiders], Mode::All);
        let explanation = AccessPolicy::default().explain(&session, &req);

        assert_eq!(explanation.reason, DecisionReason::MissingPermissions);
        assert_eq!(explanation.missing_permissions, vec![Permission::ManageRiders]);
        assert_eq!(
            explanation.granting_roles(&PermissionCatalog::standard()),
            vec![Role::Admin]
        );

        let json = serde_json::to_value(&explanation).unwrap();
        assert_eq!(json["decision"], "REDIRECT_UNAUTHORIZED");
        assert_eq!(json["reason"], "missing_permissions");
    }

    #[test]
    fn redirect_targets() {
        let targets = RedirectTargets::default();
        assert_eq!(Decision::Allow.redirect_target(&targets), None);
        assert_eq!(Decision::Pending.redirect_target(&targets), None);
        assert_eq!(Decision::RedirectLogin.redirect_target(&targets), Some("/login"));
        assert_eq!(
            Decision::RedirectPasswordReset.redirect_target(&targets),
            Some("/change-password")
        );
        assert_eq!(
            Decision::RedirectUnauthorized.redirect_target(&targets),
            Some("/unauthorized")
        );
    }

    #[test]
    fn decide_path_uses_route_table() {
        let routes = RouteTable::standard();
        let policy = AccessPolicy::default();
        let rider = session_for("RIDER");
        assert_eq!(policy.decide_path(&rider, &routes, "/deliveries/17"), Decision::Allow);
        assert_eq!(
            policy.decide_path(&rider, &routes, "/finance"),
            Decision::RedirectUnauthorized
        );
        assert_eq!(
            policy.decide_path(&Session::signed_out(), &routes, "/dashboard"),
            Decision::RedirectLogin
        );
    }

    #[test]
    fn permits_matches_route_semantics_for_actions() {
        let policy = AccessPolicy::default();
        let finance = session_for("FINANCE_STAFF");
        let payout: PermissionSet = [Permission::ManageFinance].into_iter().collect();
        assert!(policy.permits(&finance, &payout, Mode::All));
        assert!(!policy.permits(&session_for("RIDER"), &payout, Mode::All));
        assert!(policy.permits(&session_for("APP_OWNER"), &payout, Mode::All));
        assert!(policy.permits(&session_for("RIDER"), &PermissionSet::new(), Mode::Any));
        assert!(!policy.permits(&Session::loading(), &PermissionSet::new(), Mode::All));
    }

    #[test]
    fn permits_requires_a_settled_signed_in_actor() {
        let policy = AccessPolicy::default();
        let evaluator = RbacEvaluator::default();
        let payout = PermissionSet::from([Permission::ManageFinance]);

        let resetting = Session::resolve(ActorId::new(), Some("FINANCE_STAFF"), true, &evaluator);
        assert!(resetting.permissions().contains(&Permission::ManageFinance));
        assert!(!policy.permits(&resetting, &payout, Mode::All));
        assert!(!policy.permits(&resetting, &PermissionSet::new(), Mode::Any));

        let owner_resetting = Session::resolve(ActorId::new(), Some("APP_OWNER"), true, &evaluator);
        assert!(!policy.permits(&owner_resetting, &payout, Mode::All));

        let signed_out = Session::signed_out();
        assert!(!policy.permits(&signed_out, &PermissionSet::new(), Mode::All));
        assert!(!policy.permits(&signed_out, &PermissionSet::new(), Mode::Any));

        // A super role claimed without an actor grants nothing.
        let anonymous_owner = Session { actor_id: None, ..session_for("APP_OWNER") };
        assert!(!policy.permits(&anonymous_owner, &payout, Mode::All));
    }

    fn arb_session() -> impl Strategy<Value = Session> {
        (
            any::<bool>(),
            any::<bool>(),
            prop::option::of(prop::sample::select(Role::ALL.to_vec())),
            prop::collection::btree_set(prop::sample::select(Permission::ALL.to_vec()), 0..5),
            any::<bool>(),
        )
            .prop_map(|(has_actor, loading, role, permissions, must_change_password)| Session {
                actor_id: has_actor.then(ActorId::new),
                role,
                permissions,
                must_change_password,
                loading,
            })
    }

    fn arb_requirement() -> impl Strategy<Value = RouteRequirement> {
        (
            any::<bool>(),
            any::<bool>(),
            prop::collection::btree_set(prop::sample::select(Permission::ALL.to_vec()), 0..4),
            prop::sample::select(vec![Mode::All, Mode::Any]),
        )
            .prop_map(|(require_auth, require_password_ok, required_permissions, mode)| {
                RouteRequirement { require_auth, require_password_ok, required_permissions, mode }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            max_global_rejects: 8192,
            ..ProptestConfig::default()
        })]

        /// Property: a pending password change always wins over a permission denial.
        #[test]
        fn password_reset_precedes_unauthorized(
            mut session in arb_session(),
            req in arb_requirement(),
        ) {
            session.loading = false;
            session.must_change_password = true;
            prop_assume!(session.actor_id.is_some());
            prop_assume!(req.require_auth && req.require_password_ok);
            prop_assert_eq!(decide(&session, &req), Decision::RedirectPasswordReset);
        }

        /// Property: the super role reaches `Allow` whenever earlier rules pass.
        #[test]
        fn super_role_always_allowed_once_authenticated(
            mut session in arb_session(),
            req in arb_requirement(),
        ) {
            session.loading = false;
            session.must_change_password = false;
            session.actor_id = Some(ActorId::new());
            session.role = Some(Role::AppOwner);
            prop_assert_eq!(decide(&session, &req), Decision::Allow);
        }

        /// Property: without the bypass, `Allow` implies the requirement holds.
        #[test]
        fn allow_implies_satisfied(session in arb_session(), req in arb_requirement()) {
            let decision = AccessPolicy::without_super_role().decide(&session, &req);
            if decision == Decision::Allow {
                prop_assert!(satisfies(&session.permissions, &req.required_permissions, req.mode));
            }
        }
    }
}
