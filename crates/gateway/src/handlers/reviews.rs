//! Review, reply and vote handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::handlers::ensure_not_banned;
use crate::AppState;
use bracu_loop_common::{
    auth::AuthContext,
    db::{models::Review, NewReview, Repository, ReviewEdit, VoteOutcome},
    errors::{AppError, Result},
    reviews::{
        course_for_review, edited_rating, encode_reply, mentions, parse_reply, place_reply,
        resolve_target, validate_comment, validate_rating, ReplyTarget, ReviewThread, VoteType,
        REPLIES_TO_SHOW,
    },
};

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: String,
    #[serde(default)]
    pub course_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReplyRequest {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub comment: String,
    #[serde(default)]
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub vote_type: VoteType,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// A review as rendered for clients: annotation stripped, target and mentions resolved
#[derive(Debug, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: Review,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTarget>,
    pub mentions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<VoteType>,
}

#[derive(Debug, Serialize)]
pub struct ThreadView {
    pub review: ReviewView,
    pub replies: Vec<ReviewView>,
    /// Replies beyond the ones shown by default
    pub more_replies: usize,
}

fn view(review: Review, reply_to: Option<ReplyTarget>, my_vote: Option<VoteType>) -> ReviewView {
    let parsed = parse_reply(&review.comment);
    let body = parsed.body.to_string();
    let mentions = mentions(parsed.body).into_iter().map(String::from).collect();

    ReviewView {
        review,
        body,
        reply_to,
        mentions,
        my_vote,
    }
}

/// Render threads with reply targets and the viewer's votes
pub fn thread_views(threads: Vec<ReviewThread>, my_votes: &HashMap<Uuid, VoteType>) -> Vec<ThreadView> {
    threads
        .into_iter()
        .map(|thread| {
            let targets: Vec<Option<ReplyTarget>> = thread
                .replies
                .iter()
                .map(|reply| resolve_target(reply, &thread.review, &thread.replies))
                .collect();

            let more_replies = thread.replies.len().saturating_sub(REPLIES_TO_SHOW);
            let replies = thread
                .replies
                .into_iter()
                .zip(targets)
                .map(|(reply, target)| {
                    let vote = my_votes.get(&reply.id).copied();
                    view(reply, target, vote)
                })
                .collect();

            let vote = my_votes.get(&thread.review.id).copied();
            ThreadView {
                review: view(thread.review, None, vote),
                replies,
                more_replies,
            }
        })
        .collect()
}

async fn review_or_not_found(repo: &Repository, id: Uuid) -> Result<Review> {
    repo.find_review(id)
        .await?
        .ok_or_else(|| AppError::ReviewNotFound { id: id.to_string() })
}

/// Post a root review for a faculty
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(initial): Path<String>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    validate_rating(request.rating)?;
    let comment = validate_comment(&request.comment)?;

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let initial = initial.trim().to_uppercase();
    let faculty = repo
        .find_faculty(&initial)
        .await?
        .ok_or_else(|| AppError::FacultyNotFound {
            initial: initial.clone(),
        })?;
    let courses = repo.faculty_courses(&faculty.initial).await?;

    let course_code = course_for_review(request.course_code.as_deref(), courses.len());
    if let Some(code) = &course_code {
        if !courses.iter().any(|c| &c.code == code) {
            return Err(AppError::validation(
                "course_code",
                format!("{} does not teach {}", faculty.initial, code),
            ));
        }
    }

    let review = repo
        .create_review(NewReview {
            faculty_initial: faculty.initial,
            course_code,
            rating: request.rating,
            comment,
            user_name: auth.name,
            user_email: auth.email,
            parent: None,
        })
        .await?;

    info!(review_id = %review.id, faculty = %review.faculty_initial, "Review posted");
    Ok((StatusCode::CREATED, Json(view(review, None, None))))
}

/// Reply to a review or to another reply.
///
/// Replies always hang off the root review; answering a reply records who
/// was answered in the comment annotation.
pub async fn create_reply(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<ReviewView>)> {
    let text = validate_comment(&request.comment)?;

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let target = review_or_not_found(&repo, id).await?;
    let reply = repo
        .create_review(new_reply(&target, &text, auth.name, auth.email))
        .await?;

    info!(
        review_id = %reply.id,
        target_id = %target.id,
        faculty = %reply.faculty_initial,
        "Reply posted"
    );

    let reply_to = resolve_target(&reply, &target, std::slice::from_ref(&reply));
    Ok((StatusCode::CREATED, Json(view(reply, reply_to, None))))
}

/// Row for a reply answering `target`, filed under the thread root
fn new_reply(target: &Review, text: &str, user_name: String, user_email: String) -> NewReview {
    let placement = place_reply(target, text);
    NewReview {
        faculty_initial: placement.parent.faculty_initial.clone(),
        course_code: None,
        rating: 0,
        comment: placement.comment,
        user_name,
        user_email,
        parent: Some(placement.parent),
    }
}

/// Edit one's own review or reply
pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewView>> {
    let repo = state.repo();
    let review = review_or_not_found(&repo, id).await?;
    auth.require_owner(&review.user_email, "review")?;

    let text = validate_comment(&request.comment)?;
    let rating = edited_rating(review.is_reply(), review.rating, request.rating)?;
    ensure_not_banned(&repo, &auth.email).await?;

    // Keep the reply annotation so the answered name survives the edit
    let parsed = parse_reply(&review.comment);
    let comment = match parsed.target {
        Some(target) if review.is_reply() => encode_reply(target, &text),
        None if review.is_reply() && parsed.untargeted => encode_reply("null", &text),
        _ => text,
    };

    let updated = repo
        .update_review(review, ReviewEdit { comment, rating })
        .await?;

    info!(review_id = %updated.id, "Review edited");
    Ok(Json(view(updated, None, None)))
}

/// Delete one's own review or reply
pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let repo = state.repo();
    let review = review_or_not_found(&repo, id).await?;
    auth.require_owner(&review.user_email, "review")?;

    let deleted = repo.delete_review(&review).await? > 0;
    Ok(Json(DeletedResponse { deleted }))
}

/// Toggle an upvote or downvote
pub async fn vote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>> {
    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let outcome = repo.apply_vote(id, &auth.email, request.vote_type).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};

    fn review(user: &str, minutes: i64, parent: Option<&Review>, comment: &str) -> Review {
        let base = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 9, 0, 0)
            .unwrap();
        let created_at = base + Duration::minutes(minutes);

        Review {
            id: Uuid::new_v4(),
            faculty_initial: "ABC".into(),
            course_code: if parent.is_some() { None } else { Some("CSE110".into()) },
            rating: if parent.is_some() { 0 } else { 4 },
            comment: comment.into(),
            upvotes: 0,
            downvotes: 0,
            user_name: user.into(),
            user_email: format!("{}@g.bracu.ac.bd", user.to_lowercase()),
            parent_faculty_initial: parent.map(|p| p.faculty_initial.clone()),
            parent_created_at: parent.map(|p| p.created_at),
            parent_course_code: parent.and_then(|p| p.course_code.clone()),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_thread_views_strip_annotation_and_resolve_targets() {
        let root = review("Alice", 0, None, "Great teacher");
        let first = review("Bob", 1, Some(&root), "Agree @Alice");
        let second = review("Carol", 2, Some(&root), "replied_to:Bob|Not really");
        let thread = ReviewThread {
            review: root.clone(),
            replies: vec![first.clone(), second.clone()],
        };

        let mut votes = HashMap::new();
        votes.insert(first.id, VoteType::Upvote);

        let views = thread_views(vec![thread], &votes);
        assert_eq!(views.len(), 1);

        let replies = &views[0].replies;
        assert_eq!(replies[0].body, "Agree @Alice");
        assert_eq!(replies[0].mentions, vec!["Alice".to_string()]);
        assert_eq!(replies[0].reply_to.as_ref().unwrap().name, "Alice");
        assert_eq!(replies[0].my_vote, Some(VoteType::Upvote));

        assert_eq!(replies[1].body, "Not really");
        assert_eq!(replies[1].reply_to.as_ref().unwrap().name, "Bob");
        assert_eq!(views[0].more_replies, 0);
        assert!(views[0].review.my_vote.is_none());
    }

    #[test]
    fn test_direct_reply_is_annotated_with_root_author() {
        let root = review("Alice", 0, None, "Great teacher");
        let row = new_reply(&root, "Agreed", "Bob".into(), "bob@g.bracu.ac.bd".into());

        assert_eq!(row.comment, "replied_to:Alice|Agreed");
        assert_eq!(row.rating, 0);
        assert_eq!(row.course_code, None);
        let parent = row.parent.unwrap();
        assert_eq!(parent.created_at, root.created_at);
        assert_eq!(parent.course_code.as_deref(), Some("CSE110"));
    }

    #[test]
    fn test_nested_reply_targets_root_with_same_timestamp_other_course() {
        let root = review("Alice", 0, None, "Great teacher");
        // another root of the same faculty and instant, filed under a different course
        let mut sibling = root.clone();
        sibling.course_code = Some("CSE220".into());
        let bob = review("Bob", 1, Some(&root), "replied_to:Alice|Agreed");

        let row = new_reply(&bob, "Not really", "Carol".into(), "carol@g.bracu.ac.bd".into());

        assert_eq!(row.comment, "replied_to:Bob|Not really");
        assert_eq!(row.faculty_initial, "ABC");
        let parent = row.parent.unwrap();
        assert_eq!(parent.created_at, root.created_at);
        assert_eq!(parent.course_code, root.course_code);
        assert_ne!(parent.course_code, sibling.course_code);
    }

    #[test]
    fn test_more_replies_counts_hidden() {
        let root = review("Alice", 0, None, "Root");
        let replies = (1..=5)
            .map(|i| review(&format!("User{}", i), i, Some(&root), "hi"))
            .collect();
        let thread = ReviewThread {
            review: root,
            replies,
        };

        let views = thread_views(vec![thread], &HashMap::new());
        assert_eq!(views[0].replies.len(), 5);
        assert_eq!(views[0].more_replies, 5 - REPLIES_TO_SHOW);
    }
}
