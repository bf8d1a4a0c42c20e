//! Content reports and admin moderation
//!
//! Reports name a piece of content by type tag and id. Resolving a report
//! updates the report first, then applies the chosen action (remove the
//! content, suspend or ban its author) as separate best-effort steps.

pub mod bans;

pub use bans::{is_lapsed, BanDuration, BanStatus, MAX_BAN_DAYS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Days a suspension lasts
pub const SUSPENSION_DAYS: i64 = 30;

/// Kind of content a report points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    FacultyReview,
    QuestionPaper,
    SuggestionPost,
    SuggestionComment,
    StudentNote,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::FacultyReview => "faculty_review",
            ContentType::QuestionPaper => "question_paper",
            ContentType::SuggestionPost => "suggestion_post",
            ContentType::SuggestionComment => "suggestion_comment",
            ContentType::StudentNote => "student_note",
        }
    }

    /// Table holding this kind of content
    pub fn table(&self) -> &'static str {
        match self {
            ContentType::FacultyReview => "reviews",
            ContentType::QuestionPaper => "question_papers",
            ContentType::SuggestionPost => "suggestion_posts",
            ContentType::SuggestionComment => "suggestion_comments",
            ContentType::StudentNote => "student_notes",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "faculty_review" => Ok(ContentType::FacultyReview),
            "question_paper" => Ok(ContentType::QuestionPaper),
            "suggestion_post" => Ok(ContentType::SuggestionPost),
            "suggestion_comment" => Ok(ContentType::SuggestionComment),
            "student_note" => Ok(ContentType::StudentNote),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// Table name recorded on a report; unrecognised tags map to "unknown"
pub fn content_table(content_type: &str) -> &'static str {
    content_type
        .parse::<ContentType>()
        .map(|t| t.table())
        .unwrap_or("unknown")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportPriority {
    Critical,
    High,
    Medium,
}

impl ReportPriority {
    /// Priority derived from the report reason
    pub fn for_reason(reason: &str) -> Self {
        match reason {
            "copyright" | "malicious" => ReportPriority::Critical,
            "inappropriate" | "spam" => ReportPriority::High,
            _ => ReportPriority::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPriority::Critical => "critical",
            ReportPriority::High => "high",
            ReportPriority::Medium => "medium",
        }
    }
}

/// Action an admin takes when resolving a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    ContentRemoved,
    UserSuspended,
    UserBanned,
    /// Recorded on the report with no side effect (e.g. "no_action", "warning")
    Other(String),
}

impl ModerationAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "content_removed" => ModerationAction::ContentRemoved,
            "user_suspended" => ModerationAction::UserSuspended,
            "user_banned" => ModerationAction::UserBanned,
            other => ModerationAction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModerationAction::ContentRemoved => "content_removed",
            ModerationAction::UserSuspended => "user_suspended",
            ModerationAction::UserBanned => "user_banned",
            ModerationAction::Other(other) => other,
        }
    }

    /// Ban imposed on the content author, if the action calls for one
    pub fn ban_duration(&self) -> Option<BanDuration> {
        match self {
            ModerationAction::UserSuspended => Some(BanDuration::Days(SUSPENSION_DAYS)),
            ModerationAction::UserBanned => Some(BanDuration::Permanent),
            _ => None,
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of reported content as recovered from the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAuthor {
    pub email: String,
    pub name: String,
}

const AUTHOR_KEYS: [(&str, &str); 4] = [
    ("author_email", "author_name"),
    ("user_email", "user_name"),
    ("uploaded_by_email", "uploaded_by_name"),
    ("uploader_email", "uploader_name"),
];

fn non_empty<'a>(snapshot: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    snapshot
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Mine the author's email and name from a report snapshot.
///
/// Author fields are tried in order before falling back to the reporter.
/// Returns `None` when no email can be found anywhere.
pub fn snapshot_author(
    snapshot: &serde_json::Value,
    reporter_email: Option<&str>,
    reporter_name: Option<&str>,
) -> Option<SnapshotAuthor> {
    let email = AUTHOR_KEYS
        .iter()
        .find_map(|(email_key, _)| non_empty(snapshot, email_key))
        .or_else(|| reporter_email.map(str::trim).filter(|s| !s.is_empty()))?;

    let name = AUTHOR_KEYS
        .iter()
        .find_map(|(_, name_key)| non_empty(snapshot, name_key))
        .or_else(|| reporter_name.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or("Unknown User");

    Some(SnapshotAuthor {
        email: email.to_string(),
        name: name.to_string(),
    })
}

/// Reason stored on a ban created from a report
pub fn ban_reason(report_reason: &str, notes: Option<&str>) -> String {
    let notes = notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Admin action from report");
    format!("{}: {}", report_reason, notes)
}

/// Result of one best-effort moderation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    NotFound,
    Failed { message: String },
}

impl StepOutcome {
    pub fn failed(err: impl fmt::Display) -> Self {
        StepOutcome::Failed {
            message: err.to_string(),
        }
    }
}

/// What happened while resolving a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub report_id: uuid::Uuid,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_removal: Option<StepOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_ban: Option<StepOutcome>,
}

impl ResolutionOutcome {
    /// Every step that ran succeeded
    pub fn is_complete(&self) -> bool {
        [&self.content_removal, &self.author_ban]
            .into_iter()
            .flatten()
            .all(|step| *step == StepOutcome::Ok)
    }
}
