//! Authentication and authorization utilities
//!
//! Provides:
//! - Sign-in credential decoding and domain gating
//! - Student session JWT generation and validation
//! - Admin password hashing and opaque session tokens
//! - Request extractors for student and admin context

pub mod admin;
pub mod identity;

pub use admin::{AdminContext, AdminCredentials};
pub use identity::{decode_identity, email_in_domain, Identity};

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Signed-in student available to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

impl AuthContext {
    /// Fail unless `owner_email` is the caller
    pub fn require_owner(&self, owner_email: &str, resource: &str) -> Result<()> {
        if self.email.eq_ignore_ascii_case(owner_email) {
            Ok(())
        } else {
            Err(AppError::NotOwner {
                resource: resource.to_string(),
            })
        }
    }
}

/// Student session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (student email)
    pub sub: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Issue a session token for a signed-in student
    pub fn issue(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = SessionClaims {
            sub: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a session token
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }

    /// Session lifetime in seconds
    pub fn expiration_secs(&self) -> i64 {
        self.expiration_secs
    }
}

/// SHA-256 hex digest of an opaque token, as stored in the database
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new opaque admin session token
pub fn generate_session_token() -> String {
    let random_bytes: [u8; 32] = rand::random();
    format!("adm_{}", hex::encode(random_bytes))
}

/// Extract the token from an `Authorization: Bearer` header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn context_from_parts(parts: &Parts, jwt: &JwtManager) -> Result<Option<AuthContext>> {
    let Some(header) = parts.headers.get("authorization") else {
        return Ok(None);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(extract_bearer)
        .ok_or_else(|| AppError::Unauthorized {
            message: "Malformed Authorization header".to_string(),
        })?;

    let claims = jwt.validate_token(token)?;
    Ok(Some(AuthContext {
        email: claims.sub,
        name: claims.name,
        picture: claims.picture,
    }))
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let jwt = Arc::<JwtManager>::from_ref(state);
        context_from_parts(parts, &jwt)?.ok_or_else(|| AppError::Unauthorized {
            message: "Please sign in to continue".to_string(),
        })
    }
}

/// Signed-in student if a valid session is presented, otherwise anonymous
impl<S> OptionalFromRequestParts<S> for AuthContext
where
    S: Send + Sync,
    Arc<JwtManager>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Option<Self>> {
        let jwt = Arc::<JwtManager>::from_ref(state);
        Ok(context_from_parts(parts, &jwt).unwrap_or(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn identity() -> Identity {
        Identity {
            email: "student@g.bracu.ac.bd".into(),
            name: "Student".into(),
            picture: None,
        }
    }

    #[test]
    fn test_hash_token() {
        let token = generate_session_token();
        assert!(token.starts_with("adm_"));
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), hash_token("other"));
        assert_eq!(hash_token("x").len(), 64);
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc"), None);
        assert_eq!(extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test_secret", 3600);
        let token = manager.issue(&identity()).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, "student@g.bracu.ac.bd");
        assert_eq!(claims.name, "Student");
    }

    #[test]
    fn test_jwt_wrong_secret_rejected() {
        let token = JwtManager::new("a", 3600).issue(&identity()).unwrap();
        let err = JwtManager::new("b", 3600).validate_token(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_require_owner() {
        let ctx = AuthContext {
            email: "student@g.bracu.ac.bd".into(),
            name: "Student".into(),
            picture: None,
        };
        assert!(ctx.require_owner("Student@g.bracu.ac.bd", "review").is_ok());
        assert!(matches!(
            ctx.require_owner("other@g.bracu.ac.bd", "review"),
            Err(AppError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_context_from_parts() {
        let jwt = JwtManager::new("secret", 3600);
        let token = jwt.issue(&identity()).unwrap();

        let (parts, _) = Request::builder()
            .header("authorization", format!("Bearer {}", token))
            .body(())
            .unwrap()
            .into_parts();
        let ctx = context_from_parts(&parts, &jwt).unwrap().unwrap();
        assert_eq!(ctx.email, "student@g.bracu.ac.bd");

        let (anonymous, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(context_from_parts(&anonymous, &jwt).unwrap(), None);
    }
}
