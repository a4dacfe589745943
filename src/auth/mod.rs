use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// Access level carried by administrator tokens
pub const ROOT_ACCESS: &str = "root";

/// Answers permission questions about the caller of an operation
pub trait AuthorizationContext: Send + Sync {
    /// Login of the actor, for logs and audit entries
    fn login(&self) -> &str;

    fn is_system_administrator(&self) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: String,
    pub access: String,
    pub user_id: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: String, access: String, user_id: Uuid) -> Self {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self::with_expiry(user, access, user_id, Duration::hours(expiry_hours as i64))
    }

    pub fn with_expiry(user: String, access: String, user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            user,
            access,
            user_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, returning the embedded claims
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}
