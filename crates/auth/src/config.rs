//! Environment-driven configuration for the authorization core.

use chrono::Duration;
use thiserror::Error;

use crate::{AccessPolicy, ArtifactCodec, ArtifactSecret, Role};

pub const ENV_ARTIFACT_SECRET: &str = "OPSGATE_ARTIFACT_SECRET";
pub const ENV_ARTIFACT_TTL_SECS: &str = "OPSGATE_ARTIFACT_TTL_SECS";
pub const ENV_SUPER_ROLE: &str = "OPSGATE_SUPER_ROLE";

pub const DEFAULT_ARTIFACT_TTL_SECS: i64 = 3600;

/// Value of `OPSGATE_SUPER_ROLE` that disables the super-role bypass.
pub const SUPER_ROLE_DISABLED: &str = "NONE";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("OPSGATE_ARTIFACT_SECRET is not set")]
    MissingSecret,

    #[error("OPSGATE_ARTIFACT_SECRET must not be empty")]
    EmptySecret,

    #[error("OPSGATE_ARTIFACT_TTL_SECS must be a positive integer, got '{0}'")]
    InvalidTtl(String),

    #[error("OPSGATE_SUPER_ROLE names an unknown role '{0}'")]
    UnknownSuperRole(String),
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub artifact_secret: ArtifactSecret,
    pub artifact_ttl: Duration,
    pub super_role: Option<Role>,
}

impl AuthConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (key → value).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(ENV_ARTIFACT_SECRET).ok_or(ConfigError::MissingSecret)?;
        let artifact_secret = ArtifactSecret::new(secret).ok_or(ConfigError::EmptySecret)?;

        let artifact_ttl = match lookup(ENV_ARTIFACT_TTL_SECS) {
            Some(raw) => {
                let secs: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTtl(raw.clone()))?;
                if secs <= 0 {
                    return Err(ConfigError::InvalidTtl(raw));
                }
                Duration::try_seconds(secs).ok_or(ConfigError::InvalidTtl(raw))?
            }
            None => {
                tracing::warn!(
                    ttl_secs = DEFAULT_ARTIFACT_TTL_SECS,
                    "OPSGATE_ARTIFACT_TTL_SECS not set, using default artifact TTL"
                );
                Duration::seconds(DEFAULT_ARTIFACT_TTL_SECS)
            }
        };

        let super_role = match lookup(ENV_SUPER_ROLE) {
            None => {
                tracing::warn!(
                    super_role = Role::AppOwner.as_str(),
                    "OPSGATE_SUPER_ROLE not set, using default super role"
                );
                Some(Role::AppOwner)
            }
            Some(raw) if raw.trim() == SUPER_ROLE_DISABLED => {
                tracing::warn!("super-role bypass disabled by configuration");
                None
            }
            Some(raw) => Some(
                raw.trim()
                    .parse::<Role>()
                    .map_err(|_| ConfigError::UnknownSuperRole(raw.clone()))?,
            ),
        };

        Ok(Self {
            artifact_secret,
            artifact_ttl,
            super_role,
        })
    }

    pub fn codec(&self) -> ArtifactCodec {
        ArtifactCodec::new(self.artifact_secret.clone())
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy {
            super_role: self.super_role,
        }
    }
}
