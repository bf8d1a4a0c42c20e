//! Suggestion feed data access

use super::{Page, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::suggestions::{build_comment_threads, CommentThread, LikeToggle, PostDraft};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// A post with its comment threads
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionPage {
    pub post: SuggestionPost,
    pub comments: Vec<CommentThread>,
    /// Whether the viewer has liked the post
    pub liked: bool,
}

fn post_not_found(id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: "suggestion_post".to_string(),
        id: id.to_string(),
    }
}

impl Repository {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Posts, newest first, optionally for one course
    pub async fn list_posts(
        &self,
        course_code: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<SuggestionPost>> {
        let mut query = SuggestionPostEntity::find();
        if let Some(code) = course_code {
            query = query.filter(SuggestionPostColumn::CourseCode.eq(code));
        }

        let query = query.order_by_desc(SuggestionPostColumn::CreatedAt);
        self.fetch_window(query, offset, limit).await
    }

    /// Find post by ID
    pub async fn find_post(&self, id: Uuid) -> Result<Option<SuggestionPost>> {
        SuggestionPostEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create a new post
    pub async fn create_post(
        &self,
        draft: PostDraft,
        author_name: &str,
        author_email: &str,
    ) -> Result<SuggestionPost> {
        let now = Utc::now();

        let post = SuggestionPostActiveModel {
            id: Set(Uuid::new_v4()),
            course_code: Set(draft.course_code),
            title: Set(draft.title),
            content: Set(draft.content),
            author_name: Set(author_name.to_string()),
            author_email: Set(author_email.to_string()),
            likes_count: Set(0),
            comments_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        post.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a post together with its comments and likes
    pub async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        SuggestionCommentEntity::delete_many()
            .filter(SuggestionCommentColumn::PostId.eq(id))
            .exec(&txn)
            .await?;
        SuggestionLikeEntity::delete_many()
            .filter(SuggestionLikeColumn::PostId.eq(id))
            .exec(&txn)
            .await?;
        let result = SuggestionPostEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// A post with threaded comments and the viewer's like
    pub async fn post_page(&self, id: Uuid, viewer: Option<&str>) -> Result<SuggestionPage> {
        let liked = async {
            match viewer {
                Some(email) => SuggestionLikeEntity::find_by_id((id, email.to_string()))
                    .one(self.read_conn())
                    .await
                    .map(|like| like.is_some())
                    .map_err(AppError::from),
                None => Ok(false),
            }
        };

        let (post, comments, liked) =
            futures::try_join!(self.find_post(id), self.post_comments(id), liked)?;

        let post = post.ok_or_else(|| post_not_found(id))?;
        Ok(SuggestionPage {
            post,
            comments: build_comment_threads(comments),
            liked,
        })
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    async fn post_comments(&self, post_id: Uuid) -> Result<Vec<SuggestionComment>> {
        SuggestionCommentEntity::find()
            .filter(SuggestionCommentColumn::PostId.eq(post_id))
            .order_by_asc(SuggestionCommentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find comment by ID
    pub async fn find_comment(&self, id: Uuid) -> Result<Option<SuggestionComment>> {
        SuggestionCommentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Add a comment and bump the post's comment counter
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        parent_comment_id: Option<Uuid>,
        content: String,
        author_name: &str,
        author_email: &str,
    ) -> Result<SuggestionComment> {
        let txn = self.write_conn().begin().await?;

        let comment = SuggestionCommentActiveModel {
            id: Set(Uuid::new_v4()),
            post_id: Set(post_id),
            parent_comment_id: Set(parent_comment_id),
            content: Set(content),
            author_name: Set(author_name.to_string()),
            author_email: Set(author_email.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        SuggestionPostEntity::update_many()
            .col_expr(
                SuggestionPostColumn::CommentsCount,
                Expr::col(SuggestionPostColumn::CommentsCount).add(1),
            )
            .filter(SuggestionPostColumn::Id.eq(post_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(comment)
    }

    /// Delete a comment; a top-level comment takes its replies with it
    pub async fn delete_comment(&self, comment: &SuggestionComment) -> Result<u64> {
        let txn = self.write_conn().begin().await?;

        let removed = SuggestionCommentEntity::delete_many()
            .filter(
                Condition::any()
                    .add(SuggestionCommentColumn::Id.eq(comment.id))
                    .add(SuggestionCommentColumn::ParentCommentId.eq(comment.id)),
            )
            .exec(&txn)
            .await?
            .rows_affected;

        SuggestionPostEntity::update_many()
            .col_expr(
                SuggestionPostColumn::CommentsCount,
                Expr::cust(format!("GREATEST(comments_count - {}, 0)", removed)),
            )
            .filter(SuggestionPostColumn::Id.eq(comment.post_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(comment_id = %comment.id, removed, "Comment deleted");
        Ok(removed)
    }

    // ========================================================================
    // Like Operations
    // ========================================================================

    /// Like or unlike a post; returns the toggle and the new like count
    pub async fn toggle_like(&self, post_id: Uuid, user_email: &str) -> Result<(LikeToggle, i32)> {
        let txn = self.write_conn().begin().await?;

        let post = SuggestionPostEntity::find_by_id(post_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        let existing = SuggestionLikeEntity::find_by_id((post_id, user_email.to_string()))
            .one(&txn)
            .await?;

        let toggle = LikeToggle::plan(existing.is_some());
        match toggle {
            LikeToggle::Unliked => {
                SuggestionLikeEntity::delete_by_id((post_id, user_email.to_string()))
                    .exec(&txn)
                    .await?;
            }
            LikeToggle::Liked => {
                SuggestionLikeActiveModel {
                    post_id: Set(post_id),
                    user_email: Set(user_email.to_string()),
                    created_at: Set(Utc::now().into()),
                }
                .insert(&txn)
                .await?;
            }
        }

        let likes = toggle.apply(post.likes_count);
        let mut model: SuggestionPostActiveModel = post.into();
        model.likes_count = Set(likes);
        model.update(&txn).await?;

        txn.commit().await?;
        Ok((toggle, likes))
    }
}
