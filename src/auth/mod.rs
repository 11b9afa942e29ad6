use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config;

/// Claims carried by the session cookie. The caller's email identifies the
/// session; whatever else was posted to /jwt rides along in `extra`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn new(email: String, extra: Map<String, Value>) -> Self {
        let now = Utc::now();
        let ttl_days = config::config().security.token_ttl_days;

        Self {
            email,
            exp: (now + Duration::days(ttl_days)).timestamp(),
            iat: now.timestamp(),
            extra,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signing error: {0}")]
    Signing(String),
    #[error("invalid or expired token: {0}")]
    Verification(String),
    #[error("signing secret is not configured")]
    MissingSecret,
}

pub fn generate_token(claims: &Claims) -> Result<String, TokenError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }
    sign_with_secret(claims, secret)
}

pub fn verify_token(token: &str) -> Result<Claims, TokenError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }
    verify_with_secret(token, secret)
}

fn sign_with_secret(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| TokenError::Signing(e.to_string()))
}

fn verify_with_secret(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| TokenError::Verification(e.to_string()))
}
