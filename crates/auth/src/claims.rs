use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use opsgate_core::ActorId;

use crate::Role;

/// Claims carried by a session artifact.
///
/// `role` stays a raw string: it is re-normalized against the closed role
/// set whenever a session is rebuilt from these claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject / actor identifier.
    pub sub: ActorId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub must_change_password: bool,

    /// Issued-at, epoch milliseconds.
    pub iat: i64,

    /// Expiry, epoch milliseconds. Enforced by the codec.
    pub exp: i64,
}

impl SessionClaims {
    pub fn issue(
        sub: ActorId,
        role: Option<Role>,
        must_change_password: bool,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let iat = now.timestamp_millis();
        Self {
            sub,
            role: role.map(|r| r.as_str().to_string()),
            must_change_password,
            iat,
            exp: iat.saturating_add(ttl.num_milliseconds()),
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.iat)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exp)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate session claims against `now`.
///
/// This validates the *claims* only; signature checks live in the codec.
pub fn validate_claims(
    claims: &SessionClaims,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    let now = now.timestamp_millis();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
