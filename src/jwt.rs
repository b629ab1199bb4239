//! Session-token validation for the hosted auth provider.
//!
//! The provider issues HS256 tokens; this service only verifies them and
//! never manages credentials itself.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Auth subject identifier; equals the profile id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
}

pub fn validate_session_token(token: &str, secret: &str) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // The provider sets aud per project; we key trust on the signature.
    validation.validate_aud = false;

    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(claims: &SessionClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn accepts_valid_token_and_reads_subject() {
        let claims = SessionClaims {
            sub: "5f2d7c1e-0000-4000-8000-000000000001".to_string(),
            email: Some("ana@example.com".to_string()),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = token_for(&claims, "secret");

        let parsed = validate_session_token(&token, "secret").unwrap();
        assert_eq!(parsed.sub, claims.sub);
        assert_eq!(parsed.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let claims = SessionClaims {
            sub: "abc".to_string(),
            email: None,
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = token_for(&claims, "secret");
        assert!(validate_session_token(&token, "other").is_err());

        let expired = SessionClaims {
            exp: chrono::Utc::now().timestamp() - 3600,
            ..claims
        };
        let token = token_for(&expired, "secret");
        assert!(validate_session_token(&token, "secret").is_err());
    }
}
