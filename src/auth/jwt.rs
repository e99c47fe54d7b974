//! JWT bearer credential validation
//!
//! Tokens are created by the OAuth onboarding service; this server only
//! decodes and validates them.

use crate::error::AppError;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a Pulzifi access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// User email
    pub email: String,
    /// Organization the user belongs to
    pub org: Uuid,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Decode and validate a bearer token
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidToken => {
            AppError::Unauthorized("Invalid token".to_string())
        }
        _ => AppError::Unauthorized(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
pub fn test_token(user_id: Uuid, org_id: Uuid, secret: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        email: "user@example.com".to_string(),
        org: org_id,
        exp: (now + chrono::Duration::minutes(15)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode test token")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_token() {
        let user = Uuid::new_v4();
        let org = Uuid::new_v4();
        let token = test_token(user, org, "secret");

        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.org, org);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = test_token(Uuid::new_v4(), Uuid::new_v4(), "secret");
        let err = decode_token(&token, "other-secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_token("not.a.token", "secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
