//! `opsgate-auth` — authorization core (fail-closed).
//!
//! Role → permission resolution, signed session artifacts and the
//! navigation access guard. This crate is intentionally decoupled from
//! HTTP, storage and UI.

pub mod artifact;
pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod config;
pub mod permissions;
pub mod rbac;
pub mod roles;
pub mod route;
pub mod session;

pub use artifact::{ArtifactCodec, ArtifactSecret, InvalidArtifact, SignError};
pub use authorize::{
    AccessPolicy, Decision, DecisionExplanation, DecisionReason, RedirectTargets, decide,
};
pub use catalog::{CatalogError, PermissionCatalog};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use config::{AuthConfig, ConfigError};
pub use permissions::{Mode, Permission, PermissionSet};
pub use rbac::{RbacEvaluator, has_all, has_any, normalize_role};
pub use roles::Role;
pub use route::{RouteRequirement, RouteTable};
pub use session::Session;
