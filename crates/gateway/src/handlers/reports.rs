//! Content report handler

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::AppState;
use bracu_loop_common::{
    auth::AuthContext,
    contact::truncate_chars,
    db::{models::ReportedContent, NewReport},
    errors::Result,
};

const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[validate(length(min = 1, max = 50, message = "Content type is required"))]
    pub content_type: String,

    #[validate(length(min = 1, max = 200, message = "Content id is required"))]
    pub content_id: String,

    #[validate(length(min = 1, max = 50, message = "Reason is required"))]
    pub reason: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Used when the reporter is not signed in
    #[serde(default)]
    pub reporter_name: Option<String>,

    #[serde(default)]
    pub content_snapshot: Option<serde_json::Value>,
}

impl CreateReportRequest {
    fn into_report(self, reporter: Option<AuthContext>) -> NewReport {
        let (reporter_email, reporter_name) = match reporter {
            Some(auth) => (Some(auth.email), Some(auth.name)),
            None => (None, self.reporter_name),
        };

        NewReport {
            content_type: self.content_type.trim().to_string(),
            content_id: self.content_id.trim().to_string(),
            reason: self.reason.trim().to_string(),
            description: self
                .description
                .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS))
                .filter(|d| !d.is_empty()),
            reporter_email,
            reporter_name,
            content_snapshot: self.content_snapshot,
        }
    }
}

/// File a report; anonymous reports are accepted
pub async fn create_report(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Json(request): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportedContent>)> {
    request.validate()?;

    let report = state
        .repo()
        .create_report(request.into_report(auth))
        .await?;

    info!(
        report_id = %report.id,
        content_type = %report.content_type,
        priority = %report.priority,
        "Content reported"
    );
    Ok((StatusCode::CREATED, Json(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateReportRequest {
        CreateReportRequest {
            content_type: "suggestion_post".into(),
            content_id: " 6d1f ".into(),
            reason: "spam".into(),
            description: Some("   ".into()),
            reporter_name: Some("Visitor".into()),
            content_snapshot: None,
        }
    }

    #[test]
    fn test_signed_in_reporter_overrides_name() {
        let auth = AuthContext {
            email: "student@g.bracu.ac.bd".into(),
            name: "Student".into(),
            picture: None,
        };
        let report = request().into_report(Some(auth));
        assert_eq!(report.reporter_email.as_deref(), Some("student@g.bracu.ac.bd"));
        assert_eq!(report.reporter_name.as_deref(), Some("Student"));
        assert_eq!(report.content_id, "6d1f");
        assert!(report.description.is_none());
    }

    #[test]
    fn test_anonymous_reporter_keeps_given_name() {
        let report = request().into_report(None);
        assert!(report.reporter_email.is_none());
        assert_eq!(report.reporter_name.as_deref(), Some("Visitor"));
    }

    #[test]
    fn test_blank_reason_rejected() {
        let mut req = request();
        req.reason = String::new();
        assert!(req.validate().is_err());
    }
}
