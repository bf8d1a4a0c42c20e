//! Senior-advice feed: posts, one-level comment threads and likes

use crate::contact::truncate_chars;
use crate::db::models::SuggestionComment;
use crate::errors::{AppError, Result};
use crate::reviews::normalize_course_code;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_CONTENT_CHARS: usize = 5000;
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Sanitized post ready to store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub course_code: Option<String>,
    pub title: String,
    pub content: String,
}

impl PostDraft {
    pub fn sanitize(course_code: Option<&str>, title: &str, content: &str) -> Result<Self> {
        let title = truncate_chars(title, MAX_TITLE_CHARS);
        if title.is_empty() {
            return Err(AppError::validation("title", "Title is required"));
        }
        let content = truncate_chars(content, MAX_CONTENT_CHARS);
        if content.is_empty() {
            return Err(AppError::validation("content", "Content is required"));
        }
        Ok(Self {
            course_code: normalize_course_code(course_code),
            title,
            content,
        })
    }
}

/// Trim and cap a comment; empty comments are rejected
pub fn sanitize_comment(content: &str) -> Result<String> {
    let content = truncate_chars(content, MAX_COMMENT_CHARS);
    if content.is_empty() {
        return Err(AppError::validation("content", "Comment cannot be empty"));
    }
    Ok(content)
}

/// Parent a new reply is stored against.
///
/// Threads are one level deep, so answering a reply attaches to its top-level comment.
pub fn reply_parent(target: &SuggestionComment) -> Uuid {
    target.parent_comment_id.unwrap_or(target.id)
}

/// A top-level comment with its replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: SuggestionComment,
    pub replies: Vec<SuggestionComment>,
}

/// Group a post's comments into one-level threads, oldest first.
///
/// Replies whose parent is not among the top-level comments are dropped.
pub fn build_comment_threads(comments: Vec<SuggestionComment>) -> Vec<CommentThread> {
    let mut roots = Vec::new();
    let mut replies: HashMap<Uuid, Vec<SuggestionComment>> = HashMap::new();

    for comment in comments {
        match comment.parent_comment_id {
            Some(parent) => replies.entry(parent).or_default().push(comment),
            None => roots.push(comment),
        }
    }

    roots.sort_by_key(|c| c.created_at);
    roots
        .into_iter()
        .map(|comment| {
            let mut group = replies.remove(&comment.id).unwrap_or_default();
            group.sort_by_key(|c| c.created_at);
            CommentThread {
                comment,
                replies: group,
            }
        })
        .collect()
}

/// Result of toggling a like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl LikeToggle {
    pub fn plan(already_liked: bool) -> Self {
        if already_liked {
            LikeToggle::Unliked
        } else {
            LikeToggle::Liked
        }
    }

    /// New like counter, never below zero
    pub fn apply(self, likes_count: i32) -> i32 {
        match self {
            LikeToggle::Liked => likes_count + 1,
            LikeToggle::Unliked => (likes_count - 1).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn comment(id: u128, parent: Option<u128>, minutes: i64) -> SuggestionComment {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        SuggestionComment {
            id: Uuid::from_u128(id),
            post_id: Uuid::from_u128(99),
            parent_comment_id: parent.map(Uuid::from_u128),
            content: format!("comment {}", id),
            author_name: "Nabila".into(),
            author_email: "nabila@g.bracu.ac.bd".into(),
            created_at: (base + Duration::minutes(minutes)).into(),
        }
    }

    #[test]
    fn test_build_comment_threads() {
        let comments = vec![
            comment(2, None, 5),
            comment(3, Some(1), 9),
            comment(1, None, 1),
            comment(4, Some(1), 3),
            comment(5, Some(77), 4),
        ];

        let threads = build_comment_threads(comments);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, Uuid::from_u128(1));
        let reply_ids: Vec<_> = threads[0].replies.iter().map(|c| c.id).collect();
        assert_eq!(reply_ids, vec![Uuid::from_u128(4), Uuid::from_u128(3)]);
        assert!(threads[1].replies.is_empty());
    }

    #[test]
    fn test_reply_to_reply_attaches_to_top_level() {
        let top = comment(1, None, 0);
        let reply = comment(2, Some(1), 1);
        assert_eq!(reply_parent(&top), Uuid::from_u128(1));
        assert_eq!(reply_parent(&reply), Uuid::from_u128(1));
    }

    #[test]
    fn test_like_toggle_floors_at_zero() {
        assert_eq!(LikeToggle::plan(false), LikeToggle::Liked);
        assert_eq!(LikeToggle::plan(true), LikeToggle::Unliked);
        assert_eq!(LikeToggle::Liked.apply(0), 1);
        assert_eq!(LikeToggle::Unliked.apply(0), 0);
        assert_eq!(LikeToggle::Unliked.apply(3), 2);
    }

    #[test]
    fn test_post_draft() {
        let draft = PostDraft::sanitize(Some(" CSE220 "), "  Take Akib sir ", " Great for DS ").unwrap();
        assert_eq!(draft.course_code.as_deref(), Some("CSE220"));
        assert_eq!(draft.title, "Take Akib sir");
        assert!(PostDraft::sanitize(None, " ", "x").is_err());
        assert!(PostDraft::sanitize(Some(""), "t", "x").unwrap().course_code.is_none());
        assert!(sanitize_comment("   ").is_err());
    }
}
