//! Faculty reviews
//!
//! Root reviews and their replies live in one table. This module holds the
//! pure logic on top of those rows:
//! - [`thread`] rebuilds root/reply threads and sorts them
//! - [`vote`] plans vote toggles and computes the resulting counters
//! - [`reply`] parses reply annotations and infers who a reply answers

pub mod reply;
pub mod thread;
pub mod vote;

pub use reply::{
    encode_reply, mentions, parse_reply, place_reply, resolve_target, ParsedReply, ReplyPlacement,
    ReplyTarget, TargetSource,
};
pub use thread::{build_threads, rating_summary, sort_threads, RatingSummary, ReviewThread, SortOrder};
pub use vote::{plan_vote, VoteCounts, VoteKey, VoteTransition, VoteType};

use crate::errors::{AppError, Result};
use chrono::{DateTime, SubsecRound, Utc};

/// Longest accepted review or reply body, in characters
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Replies shown under a review before "show more"
pub const REPLIES_TO_SHOW: usize = 3;

/// Creation timestamp with sub-microsecond precision dropped.
///
/// Postgres stores microseconds; truncating first keeps the in-memory value
/// equal to the stored one so it can be used as part of a vote key.
pub fn review_timestamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now.trunc_subsecs(6)
}

/// Treat blank course codes as "no course" and trim the rest
pub fn normalize_course_code(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
}

/// Course code a new root review is filed under.
///
/// A course is recorded only when the faculty teaches more than one course
/// and the reviewer picked one.
pub fn course_for_review(selected: Option<&str>, faculty_course_count: usize) -> Option<String> {
    if faculty_course_count > 1 {
        normalize_course_code(selected)
    } else {
        None
    }
}

/// Validate the rating of a root review
pub fn validate_rating(rating: i32) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(AppError::validation("rating", "Rating must be between 1 and 5"))
    }
}

/// Trim and validate a review or reply body
pub fn validate_comment(comment: &str) -> Result<String> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("comment", "Comment cannot be empty"));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::validation(
            "comment",
            format!("Comment must be at most {} characters", MAX_COMMENT_CHARS),
        ));
    }
    Ok(trimmed.to_string())
}

/// Rating to store after an edit: replies keep 0, roots change only on a positive value
pub fn edited_rating(is_reply: bool, current: i32, requested: Option<i32>) -> Result<i32> {
    if is_reply {
        return Ok(current);
    }
    match requested {
        Some(rating) if rating > 0 => {
            validate_rating(rating)?;
            Ok(rating)
        }
        _ => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_review_timestamp_truncates_to_micros() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let ts = review_timestamp(now);
        assert_eq!(ts.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_normalize_course_code() {
        assert_eq!(normalize_course_code(Some(" CSE110 ")), Some("CSE110".to_string()));
        assert_eq!(normalize_course_code(Some("")), None);
        assert_eq!(normalize_course_code(Some("   ")), None);
        assert_eq!(normalize_course_code(None), None);
    }

    #[test]
    fn test_course_only_recorded_for_multi_course_faculty() {
        assert_eq!(course_for_review(Some("CSE110"), 1), None);
        assert_eq!(course_for_review(Some("CSE110"), 2), Some("CSE110".to_string()));
        assert_eq!(course_for_review(None, 3), None);
    }

    #[test]
    fn test_validate_rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn test_validate_comment() {
        assert_eq!(validate_comment("  great  ").unwrap(), "great");
        assert!(validate_comment("   ").is_err());
        assert!(validate_comment(&"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }

    #[test]
    fn test_edited_rating() {
        assert_eq!(edited_rating(false, 3, Some(5)).unwrap(), 5);
        assert_eq!(edited_rating(false, 3, Some(0)).unwrap(), 3);
        assert_eq!(edited_rating(false, 3, None).unwrap(), 3);
        assert_eq!(edited_rating(true, 0, Some(4)).unwrap(), 0);
        assert!(edited_rating(false, 3, Some(9)).is_err());
    }
}
