//! HS256 access tokens

use chrono::{DateTime, Duration, Utc};
use drumnote_core::AppError;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: Uuid, // user_id
    pub email: String,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

impl Claims {
    pub fn new(user_id: Uuid, email: &str, expiry_hours: i64, now: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            email: email.to_string(),
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to encode token: {}", e)))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        let reason = match e.kind() {
            ErrorKind::ExpiredSignature => "Token expired",
            ErrorKind::InvalidSignature => "Invalid token signature",
            ErrorKind::InvalidAlgorithm => "Invalid token algorithm",
            _ => "Invalid token",
        };
        tracing::debug!(error = %e, reason, "JWT validation failed");
        AppError::Unauthorized(reason.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters";

    #[test]
    fn test_round_trip_claims() {
        let claims = Claims::new(Uuid::new_v4(), "drummer@example.com", 24, Utc::now());
        let token = encode_token(&claims, SECRET).unwrap();

        assert_eq!(decode_token(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn test_expiry_window() {
        let now = Utc::now();
        let claims = Claims::new(Uuid::new_v4(), "a@example.com", 24, now);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = Claims::new(Uuid::new_v4(), "a@example.com", 1, Utc::now());
        let token = encode_token(&claims, SECRET).unwrap();

        let err = decode_token(&token, "another-secret-that-is-also-32-characters").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == "Invalid token signature"));
    }

    #[test]
    fn test_expired_token_rejected() {
        let issued = Utc::now() - Duration::hours(3);
        let claims = Claims::new(Uuid::new_v4(), "a@example.com", 1, issued);
        let token = encode_token(&claims, SECRET).unwrap();

        let err = decode_token(&token, SECRET).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(msg) if msg == "Token expired"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            decode_token("not.a.token", SECRET),
            Err(AppError::Unauthorized(_))
        ));
    }
}
