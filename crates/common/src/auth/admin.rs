//! Admin credentials and sessions
//!
//! Admins log in with username and password (argon2 hashed at rest) and get
//! back an opaque token. Only the SHA-256 of the token is stored; each
//! request presents the token in `X-Admin-Session`.

use super::hash_token;
use crate::db::{DbPool, Repository};
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

/// Header carrying the admin session token
pub const ADMIN_SESSION_HEADER: &str = "x-admin-session";

const MAX_USERNAME_CHARS: usize = 50;
const MAX_PASSWORD_CHARS: usize = 100;

/// Message for every login failure
pub const AUTH_FAILED: &str = "Authentication failed";

/// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored argon2 hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Login input after sanitizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    /// Trim both fields, strip `<` and `>` from the username and enforce
    /// length caps. Any problem yields the generic failure.
    pub fn sanitize(username: &str, password: &str) -> Result<Self> {
        let username: String = username
            .trim()
            .chars()
            .filter(|c| *c != '<' && *c != '>')
            .collect();
        let password = password.trim().to_string();

        if username.is_empty()
            || password.is_empty()
            || username.chars().count() > MAX_USERNAME_CHARS
            || password.chars().count() > MAX_PASSWORD_CHARS
        {
            return Err(auth_failed());
        }

        Ok(Self { username, password })
    }
}

pub fn auth_failed() -> AppError {
    AppError::Unauthorized {
        message: AUTH_FAILED.to_string(),
    }
}

/// Authenticated admin for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    pub admin_id: Uuid,
    pub username: String,
    pub session_id: Uuid,
}

impl<S> FromRequestParts<S> for AdminContext
where
    S: Send + Sync,
    DbPool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let token = parts
            .headers
            .get(ADMIN_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Admin session required".to_string(),
            })?;

        let repo = Repository::new(DbPool::from_ref(state));
        let (session, admin) = repo
            .find_admin_session(&hash_token(token))
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(AdminContext {
            admin_id: admin.id,
            username: admin.username,
            session_id: session.id,
        })
    }
}
