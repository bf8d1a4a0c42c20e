//! Suggestions feed handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::handlers::{ensure_not_banned, page_window, reviews::DeletedResponse};
use crate::AppState;
use bracu_loop_common::{
    auth::AuthContext,
    db::{
        models::{SuggestionComment, SuggestionPost},
        Page, Repository, SuggestionPage,
    },
    errors::{AppError, Result},
    reviews::normalize_course_code,
    suggestions::{reply_parent, sanitize_comment, LikeToggle, PostDraft},
};

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub course_code: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub course_code: Option<String>,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    /// Comment being answered, top-level or reply
    #[serde(default)]
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub result: LikeToggle,
    pub likes_count: i32,
}

fn comment_not_found(id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: "suggestion_comment".to_string(),
        id: id.to_string(),
    }
}

async fn post_or_not_found(repo: &Repository, id: Uuid) -> Result<SuggestionPost> {
    repo.find_post(id).await?.ok_or_else(|| AppError::NotFound {
        resource_type: "suggestion_post".to_string(),
        id: id.to_string(),
    })
}

/// Posts, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Page<SuggestionPost>>> {
    let (offset, limit) = page_window(query.offset, query.limit);
    let course = normalize_course_code(query.course_code.as_deref());

    let page = state
        .repo()
        .list_posts(course.as_deref(), offset, limit)
        .await?;
    Ok(Json(page))
}

pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<SuggestionPost>)> {
    let draft = PostDraft::sanitize(
        request.course_code.as_deref(),
        &request.title,
        &request.content,
    )?;

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let post = repo.create_post(draft, &auth.name, &auth.email).await?;
    info!(post_id = %post.id, "Suggestion posted");

    Ok((StatusCode::CREATED, Json(post)))
}

/// A post with its comment threads
pub async fn get_post(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuggestionPage>> {
    let viewer = auth.as_ref().map(|a| a.email.as_str());
    Ok(Json(state.repo().post_page(id, viewer).await?))
}

/// Delete one's own post
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let repo = state.repo();
    let post = post_or_not_found(&repo, id).await?;
    auth.require_owner(&post.author_email, "suggestion post")?;

    let deleted = repo.delete_post(id).await?;
    info!(post_id = %id, "Suggestion deleted");
    Ok(Json(DeletedResponse { deleted }))
}

/// Comment on a post, or answer a comment
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(post_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<SuggestionComment>)> {
    let content = sanitize_comment(&request.content)?;

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;
    post_or_not_found(&repo, post_id).await?;

    let parent = match request.parent_comment_id {
        Some(target_id) => {
            let target = repo
                .find_comment(target_id)
                .await?
                .filter(|c| c.post_id == post_id)
                .ok_or_else(|| comment_not_found(target_id))?;
            Some(reply_parent(&target))
        }
        None => None,
    };

    let comment = repo
        .add_comment(post_id, parent, content, &auth.name, &auth.email)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Delete one's own comment; a top-level comment takes its replies
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let repo = state.repo();
    let comment = repo
        .find_comment(id)
        .await?
        .ok_or_else(|| comment_not_found(id))?;
    auth.require_owner(&comment.author_email, "comment")?;

    let removed = repo.delete_comment(&comment).await?;
    Ok(Json(DeletedResponse { deleted: removed > 0 }))
}

/// Like or unlike a post
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(post_id): Path<Uuid>,
) -> Result<Json<LikeResponse>> {
    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let (result, likes_count) = repo.toggle_like(post_id, &auth.email).await?;
    Ok(Json(LikeResponse {
        result,
        likes_count,
    }))
}
