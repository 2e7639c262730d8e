use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use eventease_types::api::Claims;

/// Sessions last 30 days.
const TOKEN_TTL_DAYS: i64 = 30;

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> anyhow::Result<(String, DateTime<Utc>)> {
    let expires_at = Utc::now() + Duration::days(TOKEN_TTL_DAYS);
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, expires_at))
}

/// Validate signature and expiry, returning the claims.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
