//! Thread reconstruction
//!
//! Reviews are loaded flat, newest first. Replies point at their root through
//! (parent faculty, parent timestamp, parent course code); this module groups
//! them back under the root in a single pass.

use crate::db::models::Review;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Identity of a root review as seen by its replies
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThreadKey {
    faculty_initial: String,
    created_at: DateTimeWithTimeZone,
    course_code: Option<String>,
}

impl ThreadKey {
    fn of_root(review: &Review) -> Self {
        Self {
            faculty_initial: review.faculty_initial.clone(),
            created_at: review.created_at,
            course_code: review.course_code.clone(),
        }
    }

    fn of_parent(reply: &Review) -> Option<Self> {
        match (&reply.parent_faculty_initial, reply.parent_created_at) {
            (Some(faculty), Some(created_at)) => Some(Self {
                faculty_initial: faculty.clone(),
                created_at,
                course_code: reply.parent_course_code.clone(),
            }),
            _ => None,
        }
    }
}

/// A root review with its replies
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewThread {
    pub review: Review,
    pub replies: Vec<Review>,
}

/// Ordering for threads and replies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Recent,
    Upvoted,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(SortOrder::Recent),
            "upvoted" => Ok(SortOrder::Upvoted),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Group flat rows into threads.
///
/// Root order follows input order. Replies whose root is not among `rows` are dropped.
pub fn build_threads(rows: Vec<Review>) -> Vec<ReviewThread> {
    let mut roots = Vec::new();
    let mut replies: HashMap<ThreadKey, Vec<Review>> = HashMap::new();

    for row in rows {
        match ThreadKey::of_parent(&row) {
            Some(parent) => replies.entry(parent).or_default().push(row),
            None => roots.push(row),
        }
    }

    roots
        .into_iter()
        .map(|review| {
            let replies = replies.remove(&ThreadKey::of_root(&review)).unwrap_or_default();
            ReviewThread { review, replies }
        })
        .collect()
}

/// Sort roots and each reply list in place. Sorting is stable.
pub fn sort_threads(threads: &mut [ReviewThread], order: SortOrder) {
    let compare = |a: &Review, b: &Review| match order {
        SortOrder::Recent => b.created_at.cmp(&a.created_at),
        SortOrder::Upvoted => b.net_votes().cmp(&a.net_votes()),
    };

    threads.sort_by(|a, b| compare(&a.review, &b.review));
    for thread in threads.iter_mut() {
        thread.replies.sort_by(compare);
    }
}

/// Aggregate rating over root reviews
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub count: usize,
    /// Number of reviews per star, index 0 = one star
    pub distribution: [usize; 5],
}

pub fn rating_summary(threads: &[ReviewThread]) -> RatingSummary {
    let mut distribution = [0usize; 5];
    let mut total = 0i64;
    let mut count = 0usize;

    for thread in threads {
        let rating = thread.review.rating;
        if (1..=5).contains(&rating) {
            distribution[(rating - 1) as usize] += 1;
            total += rating as i64;
            count += 1;
        }
    }

    let average = if count == 0 {
        0.0
    } else {
        ((total as f64 / count as f64) * 10.0).round() / 10.0
    };

    RatingSummary {
        average,
        count,
        distribution,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    pub(crate) fn at(minutes: i64) -> DateTimeWithTimeZone {
        (Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)).into()
    }

    pub(crate) fn root(name: &str, minutes: i64, course: Option<&str>) -> Review {
        Review {
            id: Uuid::new_v4(),
            faculty_initial: "ABC".into(),
            course_code: course.map(String::from),
            rating: 4,
            comment: format!("review by {}", name),
            upvotes: 0,
            downvotes: 0,
            user_name: name.into(),
            user_email: format!("{}@g.bracu.ac.bd", name.to_lowercase()),
            parent_faculty_initial: None,
            parent_created_at: None,
            parent_course_code: None,
            created_at: at(minutes),
            updated_at: at(minutes),
        }
    }

    pub(crate) fn reply_to(parent: &Review, name: &str, minutes: i64) -> Review {
        Review {
            id: Uuid::new_v4(),
            faculty_initial: parent.faculty_initial.clone(),
            course_code: None,
            rating: 0,
            comment: format!("reply by {}", name),
            upvotes: 0,
            downvotes: 0,
            user_name: name.into(),
            user_email: format!("{}@g.bracu.ac.bd", name.to_lowercase()),
            parent_faculty_initial: Some(parent.faculty_initial.clone()),
            parent_created_at: Some(parent.created_at),
            parent_course_code: parent.course_code.clone(),
            created_at: at(minutes),
            updated_at: at(minutes),
        }
    }

    #[test]
    fn test_build_threads_groups_replies() {
        let a = root("Alice", 10, Some("CSE110"));
        let b = root("Bob", 5, None);
        let r1 = reply_to(&a, "Carol", 11);
        let r2 = reply_to(&b, "Dave", 6);
        let r3 = reply_to(&a, "Erin", 12);

        let threads = build_threads(vec![r3.clone(), a.clone(), r1.clone(), b.clone(), r2.clone()]);

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].review.id, a.id);
        assert_eq!(threads[0].replies.len(), 2);
        assert_eq!(threads[1].review.id, b.id);
        assert_eq!(threads[1].replies, vec![r2]);
    }

    #[test]
    fn test_same_timestamp_different_course_are_distinct_roots() {
        let a = root("Alice", 10, Some("CSE110"));
        let b = root("Bob", 10, Some("CSE220"));
        let r = reply_to(&b, "Carol", 11);

        let threads = build_threads(vec![a, b.clone(), r]);
        assert!(threads[0].replies.is_empty());
        assert_eq!(threads[1].review.id, b.id);
        assert_eq!(threads[1].replies.len(), 1);
    }

    #[test]
    fn test_orphan_replies_are_dropped() {
        let a = root("Alice", 10, None);
        let ghost = root("Ghost", 1, None);
        let orphan = reply_to(&ghost, "Carol", 2);

        let threads = build_threads(vec![a, orphan]);
        assert_eq!(threads.len(), 1);
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn test_half_parent_pointer_is_a_root() {
        let mut odd = root("Alice", 10, None);
        odd.parent_faculty_initial = Some("ABC".into());

        let threads = build_threads(vec![odd]);
        assert_eq!(threads.len(), 1);
    }

    #[test]
    fn test_build_threads_is_idempotent() {
        let a = root("Alice", 10, None);
        let r = reply_to(&a, "Bob", 11);
        let rows = vec![a, r];
        assert_eq!(build_threads(rows.clone()), build_threads(rows));
    }

    #[test]
    fn test_sort_upvoted_is_stable() {
        let mut a = root("Alice", 10, None);
        let mut b = root("Bob", 20, None);
        let mut c = root("Carol", 30, None);
        a.upvotes = 3;
        b.upvotes = 5;
        b.downvotes = 2;
        c.upvotes = 9;

        let mut threads = build_threads(vec![a.clone(), b.clone(), c.clone()]);
        sort_threads(&mut threads, SortOrder::Upvoted);

        let order: Vec<_> = threads.iter().map(|t| t.review.id).collect();
        assert_eq!(order, vec![c.id, a.id, b.id]);
    }

    #[test]
    fn test_sort_recent_applies_to_replies() {
        let a = root("Alice", 10, None);
        let r1 = reply_to(&a, "Bob", 11);
        let r2 = reply_to(&a, "Carol", 12);

        let mut threads = build_threads(vec![a, r1.clone(), r2.clone()]);
        sort_threads(&mut threads, SortOrder::Recent);
        assert_eq!(threads[0].replies[0].id, r2.id);
        assert_eq!(threads[0].replies[1].id, r1.id);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("upvoted".parse::<SortOrder>().unwrap(), SortOrder::Upvoted);
        assert_eq!("recent".parse::<SortOrder>().unwrap(), SortOrder::Recent);
        assert!("oldest".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_rating_summary() {
        let mut a = root("Alice", 10, None);
        let mut b = root("Bob", 20, None);
        a.rating = 5;
        b.rating = 2;
        let threads = build_threads(vec![a, b]);

        let summary = rating_summary(&threads);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, 3.5);
        assert_eq!(summary.distribution, [0, 1, 0, 0, 1]);
    }

    #[test]
    fn test_rating_summary_empty() {
        let summary = rating_summary(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, 0.0);
    }
}
