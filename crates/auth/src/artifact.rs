//! Signed artifact codec: `v1.<payload>.<signature>`.
//!
//! `payload` is the base64url (no padding) encoding of the JSON claims and
//! `signature` is the base64url HMAC-SHA256 of the *encoded* payload string.
//! Verification failures collapse into a single [`InvalidArtifact`]; the
//! concrete reason is only visible in debug logs.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::claims::{SessionClaims, validate_claims};

type HmacSha256 = Hmac<Sha256>;

/// Version tag prefixed to every artifact.
pub const ARTIFACT_VERSION: &str = "v1";

/// Claims field holding the expiry, in epoch milliseconds.
pub const EXPIRY_FIELD: &str = "exp";

#[derive(Debug, Error)]
pub enum SignError {
    #[error("failed to serialize artifact payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Mirrors the fallible `KeyInit::new_from_slice`. HMAC accepts keys of
    /// any length, so no secret currently produces it.
    #[error("invalid signing key")]
    InvalidKey,
}

/// Uniform verification failure. Deliberately carries no detail.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid artifact")]
pub struct InvalidArtifact;

/// Internal rejection reason (diagnostics only, never returned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Shape,
    Version,
    Signature,
    Encoding,
    Payload,
    MalformedExpiry,
    Expired,
    Claims,
}

/// Shared HMAC secret. Redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ArtifactSecret(Vec<u8>);

impl ArtifactSecret {
    /// `None` for an empty key.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() { None } else { Some(Self(bytes)) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Debug for ArtifactSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ArtifactSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Sign `payload` with `secret`.
///
/// The payload goes through `serde_json::Value` first so object keys are
/// emitted in sorted order and equal claims always produce equal artifacts.
pub fn sign<T>(payload: &T, secret: &[u8]) -> Result<String, SignError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(payload)?;
    let bytes = serde_json::to_vec(&value)?;
    let encoded_payload = URL_SAFE_NO_PAD.encode(bytes);
    let signature = compute_signature(secret, &encoded_payload).ok_or(SignError::InvalidKey)?;
    Ok(format!("{ARTIFACT_VERSION}.{encoded_payload}.{signature}"))
}

/// Verify `artifact` against `secret` at the current time.
pub fn verify<T: DeserializeOwned>(artifact: &str, secret: &[u8]) -> Result<T, InvalidArtifact> {
    verify_at(artifact, secret, Utc::now())
}

/// Verify `artifact` against `secret` as of `now`.
///
/// Key rotation can be layered on by calling this once per candidate secret.
pub fn verify_at<T: DeserializeOwned>(
    artifact: &str,
    secret: &[u8],
    now: DateTime<Utc>,
) -> Result<T, InvalidArtifact> {
    let value = inspect(artifact, secret, now).map_err(reject)?;
    serde_json::from_value(value).map_err(|_| reject(Rejection::Claims))
}

fn reject(reason: Rejection) -> InvalidArtifact {
    tracing::debug!(?reason, "artifact rejected");
    InvalidArtifact
}

fn inspect(artifact: &str, secret: &[u8], now: DateTime<Utc>) -> Result<Value, Rejection> {
    let mut parts = artifact.split('.');
    let (Some(version), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Rejection::Shape);
    };

    if version != ARTIFACT_VERSION {
        return Err(Rejection::Version);
    }

    let expected = compute_signature(secret, payload).ok_or(Rejection::Signature)?;
    // Slice ct_eq is false for differing lengths without comparing contents.
    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        return Err(Rejection::Signature);
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| Rejection::Encoding)?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|_| Rejection::Payload)?;
    check_expiry(&value, now)?;
    Ok(value)
}

fn check_expiry(value: &Value, now: DateTime<Utc>) -> Result<(), Rejection> {
    let Some(exp) = value.as_object().and_then(|claims| claims.get(EXPIRY_FIELD)) else {
        return Ok(());
    };
    let exp = exp.as_i64().ok_or(Rejection::MalformedExpiry)?;
    if now.timestamp_millis() < exp {
        Ok(())
    } else {
        Err(Rejection::Expired)
    }
}

/// `None` only if the MAC rejects the key length, which HMAC never does.
fn compute_signature(secret: &[u8], encoded_payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(encoded_payload.as_bytes());
    Some(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Codec bound to a configured secret.
#[derive(Debug, Clone)]
pub struct ArtifactCodec {
    secret: ArtifactSecret,
}

impl ArtifactCodec {
    pub fn new(secret: ArtifactSecret) -> Self {
        Self { secret }
    }

    pub fn sign<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, SignError> {
        sign(payload, self.secret.as_bytes())
    }

    pub fn verify<T: DeserializeOwned>(&self, artifact: &str) -> Result<T, InvalidArtifact> {
        verify(artifact, self.secret.as_bytes())
    }

    pub fn verify_at<T: DeserializeOwned>(
        &self,
        artifact: &str,
        now: DateTime<Utc>,
    ) -> Result<T, InvalidArtifact> {
        verify_at(artifact, self.secret.as_bytes(), now)
    }

    /// Verify a session artifact, including its issued-at window.
    pub fn verify_session(
        &self,
        artifact: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, InvalidArtifact> {
        let claims: SessionClaims = self.verify_at(artifact, now)?;
        validate_claims(&claims, now).map_err(|err| {
            tracing::debug!(error = %err, "session artifact rejected");
            InvalidArtifact
        })?;
        Ok(claims)
    }
}
