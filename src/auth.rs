use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::AppConfig,
    models::{Credential, Role},
};

/// Claims
///
/// The payload the session issuer signs into every token. Only `exp` is
/// mandatory; a token without a `role` belongs to the default role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account id. Issuers write it as `_id`; `sub` is accepted too.
    #[serde(rename = "_id", alias = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
    /// Issued At (iat), seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// VerifyError
///
/// Why a token was rejected. Kept for logging and tests; the gate itself
/// treats every variant as "unauthenticated".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("no credential presented")]
    Missing,
    #[error("credential has expired")]
    Expired,
    #[error("credential is not valid yet")]
    NotYetValid,
    #[error("credential signature is invalid")]
    InvalidSignature,
    #[error("credential is malformed: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => VerifyError::Expired,
            ErrorKind::ImmatureSignature => VerifyError::NotYetValid,
            ErrorKind::InvalidSignature => VerifyError::InvalidSignature,
            _ => VerifyError::Malformed(e.to_string()),
        }
    }
}

/// CredentialVerifier
///
/// Checks the HMAC signature (HS256, HS384 or HS512), expiry and not-before
/// of session tokens against the process-wide secret. It never mints tokens.
#[derive(Clone)]
pub struct CredentialVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl CredentialVerifier {
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = leeway_secs;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_leeway_secs)
    }

    /// try_verify
    ///
    /// Decodes `raw` and builds the request's `Credential`, reporting the
    /// reason on failure.
    pub fn try_verify(&self, raw: Option<&str>) -> Result<Credential, VerifyError> {
        let token = raw
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(VerifyError::Missing)?;

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
            .ok_or_else(|| VerifyError::Malformed(format!("exp out of range: {}", claims.exp)))?;

        Ok(Credential {
            subject_id: claims.subject_id,
            email: claims.email,
            role: claims.role.as_deref().map(Role::from_claim).unwrap_or_default(),
            expires_at,
        })
    }

    /// verify
    ///
    /// Same as `try_verify`, collapsed to "credential or nothing". Failures are
    /// logged by kind only; the token itself is never written out.
    pub fn verify(&self, raw: Option<&str>) -> Option<Credential> {
        match self.try_verify(raw) {
            Ok(credential) => Some(credential),
            Err(VerifyError::Missing) => None,
            Err(e) => {
                tracing::debug!(reason = %e, "credential rejected");
                None
            }
        }
    }
}
