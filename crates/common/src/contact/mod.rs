//! Student contact form
//!
//! Submissions are trimmed and capped before validation so over-long input is
//! shortened rather than rejected.

use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use validator::Validate;

const MAX_NAME_CHARS: usize = 100;
const MAX_EMAIL_CHARS: usize = 100;
const MAX_SUBJECT_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 2000;
const MAX_STUDENT_ID_CHARS: usize = 20;

/// Longest admin reply, in characters
pub const MAX_REPLY_CHARS: usize = 2000;

/// Message categories offered on the contact page
pub const MESSAGE_TYPES: [&str; 10] = [
    "general",
    "technical",
    "account",
    "content",
    "faculty",
    "course",
    "bug_report",
    "feature_request",
    "feedback",
    "other",
];

/// Contact submission status values
pub mod status {
    pub const PENDING: &str = "pending";
    pub const READ: &str = "read";
    pub const REPLIED: &str = "replied";
    pub const RESOLVED: &str = "resolved";
}

/// Status after an admin opens a message: only pending messages become read
pub fn status_after_read(current: &str) -> Option<&'static str> {
    (current == status::PENDING).then_some(status::READ)
}

/// First `max` characters of `s`, trimmed
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.trim().chars().take(max).collect()
}

/// Raw contact form as posted by a student
#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub student_name: String,
    pub student_email: String,
    #[serde(default)]
    pub student_id: Option<String>,
    pub subject: String,
    #[serde(default)]
    pub message_type: Option<String>,
    pub message: String,
    #[serde(default)]
    pub priority: Option<String>,
}

/// Sanitized contact form ready to store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct ContactForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub student_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub student_email: String,

    pub student_id: Option<String>,

    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,

    pub message_type: String,

    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,

    pub priority: String,
}

impl ContactForm {
    /// Trim, cap and lowercase fields, then validate
    pub fn sanitize(request: ContactRequest) -> Result<Self> {
        let message_type = request
            .message_type
            .as_deref()
            .map(str::trim)
            .filter(|t| MESSAGE_TYPES.contains(t))
            .unwrap_or("general")
            .to_string();

        let priority = match request.priority.as_deref().map(str::trim) {
            Some(p @ ("low" | "medium" | "high")) => p.to_string(),
            _ => "medium".to_string(),
        };

        let form = Self {
            student_name: truncate_chars(&request.student_name, MAX_NAME_CHARS),
            student_email: truncate_chars(&request.student_email, MAX_EMAIL_CHARS).to_lowercase(),
            student_id: request
                .student_id
                .map(|id| truncate_chars(&id, MAX_STUDENT_ID_CHARS))
                .filter(|id| !id.is_empty()),
            subject: truncate_chars(&request.subject, MAX_SUBJECT_CHARS),
            message_type,
            message: truncate_chars(&request.message, MAX_MESSAGE_CHARS),
            priority,
        };

        form.validate()?;
        Ok(form)
    }
}

/// Trim and cap an admin reply; empty replies are rejected
pub fn sanitize_reply(reply: &str) -> Result<String> {
    let reply = truncate_chars(reply, MAX_REPLY_CHARS);
    if reply.is_empty() {
        return Err(AppError::validation("reply", "Reply cannot be empty"));
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_messages_become_read() {
        assert_eq!(status_after_read(status::PENDING), Some(status::READ));
        assert_eq!(status_after_read(status::READ), None);
        assert_eq!(status_after_read(status::REPLIED), None);
        assert_eq!(status_after_read(status::RESOLVED), None);
    }

    fn request() -> ContactRequest {
        ContactRequest {
            student_name: "  Rafi  ".into(),
            student_email: " Rafi@G.BRACU.AC.BD ".into(),
            student_id: Some(" 20101001 ".into()),
            subject: " Help ".into(),
            message_type: Some("technical".into()),
            message: " The notes page is broken ".into(),
            priority: None,
        }
    }

    #[test]
    fn test_sanitize_trims_and_lowercases() {
        let form = ContactForm::sanitize(request()).unwrap();
        assert_eq!(form.student_name, "Rafi");
        assert_eq!(form.student_email, "rafi@g.bracu.ac.bd");
        assert_eq!(form.student_id.as_deref(), Some("20101001"));
        assert_eq!(form.subject, "Help");
        assert_eq!(form.message_type, "technical");
        assert_eq!(form.priority, "medium");
    }

    #[test]
    fn test_sanitize_truncates_long_fields() {
        let mut req = request();
        req.subject = "s".repeat(500);
        req.message = "m".repeat(5000);

        let form = ContactForm::sanitize(req).unwrap();
        assert_eq!(form.subject.chars().count(), 200);
        assert_eq!(form.message.chars().count(), 2000);
    }

    #[test]
    fn test_truncation_is_char_based() {
        assert_eq!(truncate_chars("ঢাকা শহর", 4), "ঢাকা");
    }

    #[test]
    fn test_sanitize_rejects_bad_email() {
        let mut req = request();
        req.student_email = "not an email".into();
        let err = ContactForm::sanitize(req).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_sanitize_rejects_blank_message() {
        let mut req = request();
        req.message = "   ".into();
        assert!(ContactForm::sanitize(req).is_err());
    }

    #[test]
    fn test_unknown_message_type_defaults_to_general() {
        let mut req = request();
        req.message_type = Some("gossip".into());
        assert_eq!(ContactForm::sanitize(req).unwrap().message_type, "general");
    }

    #[test]
    fn test_sanitize_reply() {
        assert_eq!(sanitize_reply("  thanks  ").unwrap(), "thanks");
        assert!(sanitize_reply("   ").is_err());
        assert_eq!(sanitize_reply(&"r".repeat(3000)).unwrap().len(), 2000);
    }
}
