use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::database::models::UserId;

/// Token payload. Only `id` is required; `exp` is enforced when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    /// Claims for `id` expiring `expiry_hours` from now.
    pub fn new(id: UserId, expiry_hours: u64) -> Result<Self, JwtError> {
        let out_of_range =
            || JwtError::TokenGeneration(format!("token lifetime of {} hours is out of range", expiry_hours));

        let now = Utc::now();
        let lifetime = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(out_of_range)?;
        let exp = now.checked_add_signed(lifetime).ok_or_else(out_of_range)?.timestamp();

        Ok(Self {
            id,
            exp: Some(exp),
            iat: Some(now.timestamp()),
        })
    }

    /// Claims for `id` with the configured lifetime unless `hours` overrides it.
    pub fn issue(security: &SecurityConfig, id: UserId, hours: Option<u64>) -> Result<Self, JwtError> {
        Self::new(id, hours.unwrap_or(security.jwt_expiry_hours))
    }

    /// Claims for `id` with no `exp`; such tokens never expire.
    pub fn without_expiry(id: UserId) -> Self {
        Self {
            id,
            exp: None,
            iat: Some(Utc::now().timestamp()),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("{0}")]
    Verification(String),
}

/// Verifies HS256 bearer tokens against a shared secret supplied at construction.
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::InvalidSecret);
        }

        let mut validation = Validation::default();
        // Tokens minted without an expiry are accepted; `exp` is still checked when present.
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Check the signature and expiry and decode the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::Verification(e.to_string()))
    }
}

/// Sign `claims` with `secret` using HS256.
pub fn generate_jwt(secret: &str, claims: &Claims) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}
