//! Student sign-in handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::handlers::ensure_not_banned;
use crate::AppState;
use bracu_loop_common::{
    auth::{decode_identity, AuthContext, Identity},
    errors::{AppError, Result},
    metrics,
    moderation::BanStatus,
};

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Identity-provider token
    pub credential: String,
}

#[derive(Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: Identity,
}

/// Exchange an identity-provider credential for a session token
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SignInResponse>> {
    let domain = &state.config.auth.allowed_domain;

    let Some(identity) = decode_identity(&request.credential, domain) else {
        metrics::record_sign_in("rejected_domain");
        return Err(AppError::Unauthorized {
            message: format!("Please sign in with your @{} account", domain),
        });
    };

    let repo = state.repo();
    if let Err(e) = ensure_not_banned(&repo, &identity.email).await {
        metrics::record_sign_in("banned");
        info!(email = %identity.email, "Sign-in refused for banned account");
        return Err(e);
    }

    if let Err(e) = repo.upsert_user_session(&identity).await {
        warn!(email = %identity.email, error = %e, "Failed to record user profile");
    }

    let token = state.jwt.issue(&identity)?;
    metrics::record_sign_in("accepted");
    info!(email = %identity.email, "Student signed in");

    Ok(Json(SignInResponse {
        token,
        expires_in: state.jwt.expiration_secs(),
        user: identity,
    }))
}

/// The signed-in student
pub async fn me(auth: AuthContext) -> Json<Identity> {
    Json(Identity {
        email: auth.email,
        name: auth.name,
        picture: auth.picture,
    })
}

/// Whether the signed-in student is banned; a failed lookup reads as not banned
pub async fn ban_status(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Json<BanStatus> {
    match state.repo().check_ban(&auth.email).await {
        Ok(status) => Json(status),
        Err(e) => {
            warn!(email = %auth.email, error = %e, "Ban check failed, reporting not banned");
            Json(BanStatus::not_banned())
        }
    }
}
