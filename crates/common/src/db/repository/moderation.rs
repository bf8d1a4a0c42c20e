//! Bans, content reports and report resolution

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::moderation::{
    ban_reason, content_table, is_lapsed, snapshot_author, BanDuration, BanStatus, ContentType,
    ModerationAction, ReportPriority, ResolutionOutcome, StepOutcome,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// A ban to record
#[derive(Debug, Clone)]
pub struct NewBan {
    pub email: String,
    pub name: Option<String>,
    pub reason: String,
    pub banned_by: String,
    pub duration: BanDuration,
}

/// Ban row as listed for admins
#[derive(Debug, Clone, Serialize)]
pub struct BanRecord {
    #[serde(flatten)]
    pub ban: BannedUser,
    /// Temporary ban past its duration that has not been flipped inactive yet
    pub lapsed: bool,
}

/// A student's report about a piece of content
#[derive(Debug, Clone)]
pub struct NewReport {
    pub content_type: String,
    pub content_id: String,
    pub reason: String,
    pub description: Option<String>,
    pub reporter_email: Option<String>,
    pub reporter_name: Option<String>,
    pub content_snapshot: Option<serde_json::Value>,
}

pub mod report_status {
    pub const PENDING: &str = "pending";
    pub const RESOLVED: &str = "resolved";
}

fn report_not_found(id: Uuid) -> AppError {
    AppError::ReportNotFound { id: id.to_string() }
}

impl Repository {
    // ========================================================================
    // Ban Operations
    // ========================================================================

    /// Whether `email` is currently banned.
    ///
    /// Lapsed temporary bans are flipped inactive on the way and do not count.
    pub async fn check_ban(&self, email: &str) -> Result<BanStatus> {
        let bans = BannedUserEntity::find()
            .filter(BannedUserColumn::Email.eq(email.trim().to_lowercase()))
            .filter(BannedUserColumn::IsActive.eq(true))
            .order_by_desc(BannedUserColumn::CreatedAt)
            .all(self.read_conn())
            .await?;

        let now = Utc::now();
        for ban in bans {
            let created_at = ban.created_at.with_timezone(&Utc);
            if is_lapsed(ban.ban_duration.as_deref(), created_at, now) {
                if let Err(e) = self.set_ban_active(ban.id, false).await {
                    warn!(ban_id = %ban.id, error = %e, "Failed to deactivate lapsed ban");
                }
                continue;
            }

            return Ok(BanStatus {
                is_banned: true,
                reason: Some(ban.reason),
                banned_by: Some(ban.banned_by),
                ban_duration: ban.ban_duration,
            });
        }

        Ok(BanStatus::not_banned())
    }

    /// Bans, newest first
    pub async fn list_bans(&self, active_only: bool) -> Result<Vec<BanRecord>> {
        let mut query = BannedUserEntity::find();
        if active_only {
            query = query.filter(BannedUserColumn::IsActive.eq(true));
        }

        let now = Utc::now();
        let bans = query
            .order_by_desc(BannedUserColumn::CreatedAt)
            .all(self.read_conn())
            .await?;

        Ok(bans
            .into_iter()
            .map(|ban| {
                let lapsed = ban.is_active
                    && is_lapsed(
                        ban.ban_duration.as_deref(),
                        ban.created_at.with_timezone(&Utc),
                        now,
                    );
                BanRecord { ban, lapsed }
            })
            .collect())
    }

    /// Record a ban
    pub async fn create_ban(&self, ban: NewBan) -> Result<BannedUser> {
        let now = Utc::now();

        let model = BannedUserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(ban.email.trim().to_lowercase()),
            name: Set(ban.name),
            reason: Set(ban.reason),
            banned_by: Set(ban.banned_by),
            ban_duration: Set(Some(ban.duration.to_string())),
            is_permanent: Set(ban.duration.is_permanent()),
            is_active: Set(true),
            expires_at: Set(ban.duration.expires_at(now).map(Into::into)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = model.insert(self.write_conn()).await?;
        metrics::record_ban(ban.duration.is_permanent());
        Ok(created)
    }

    async fn set_ban_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let Some(ban) = BannedUserEntity::find_by_id(id).one(self.write_conn()).await? else {
            return Ok(false);
        };

        let mut model: BannedUserActiveModel = ban.into();
        model.is_active = Set(active);
        model.updated_at = Set(Utc::now().into());
        model.update(self.write_conn()).await?;
        Ok(true)
    }

    /// Lift a ban; the row is kept as history
    pub async fn unban(&self, id: Uuid) -> Result<bool> {
        self.set_ban_active(id, false).await
    }

    // ========================================================================
    // Report Operations
    // ========================================================================

    /// File a report about a piece of content
    pub async fn create_report(&self, report: NewReport) -> Result<ReportedContent> {
        let now = Utc::now();
        let priority = ReportPriority::for_reason(&report.reason);

        let reporter_name = report
            .reporter_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Anonymous".to_string());

        let model = ReportedContentActiveModel {
            id: Set(Uuid::new_v4()),
            content_table: Set(content_table(&report.content_type).to_string()),
            content_type: Set(report.content_type),
            content_id: Set(report.content_id),
            reason: Set(report.reason),
            description: Set(report.description),
            reporter_email: Set(report.reporter_email),
            reporter_name: Set(reporter_name),
            content_snapshot: Set(report
                .content_snapshot
                .unwrap_or_else(|| serde_json::json!({}))),
            status: Set(report_status::PENDING.to_string()),
            priority: Set(priority.as_str().to_string()),
            admin_action: Set(None),
            admin_notes: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = model.insert(self.write_conn()).await?;
        metrics::record_report(&created.content_type);
        Ok(created)
    }

    /// Reports, newest first, optionally by status
    pub async fn list_reports(&self, status: Option<&str>) -> Result<Vec<ReportedContent>> {
        let mut query = ReportedContentEntity::find();
        if let Some(status) = status {
            query = query.filter(ReportedContentColumn::Status.eq(status));
        }

        query
            .order_by_desc(ReportedContentColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find report by ID
    pub async fn find_report(&self, id: Uuid) -> Result<Option<ReportedContent>> {
        ReportedContentEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Delete report by ID
    pub async fn delete_report(&self, id: Uuid) -> Result<bool> {
        let result = ReportedContentEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Resolve a report and carry out its action.
    ///
    /// Marking the report resolved must succeed. Content removal and the author
    /// ban are attempted afterwards and their outcomes reported, not raised.
    pub async fn resolve_report(
        &self,
        id: Uuid,
        action: &ModerationAction,
        notes: Option<&str>,
        admin: &str,
    ) -> Result<ResolutionOutcome> {
        let report = ReportedContentEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| report_not_found(id))?;

        let mut model: ReportedContentActiveModel = report.clone().into();
        model.status = Set(report_status::RESOLVED.to_string());
        model.admin_action = Set(Some(action.as_str().to_string()));
        model.admin_notes = Set(notes.map(String::from));
        model.updated_at = Set(Utc::now().into());
        model.update(self.write_conn()).await?;

        info!(
            report_id = %id,
            action = %action,
            admin,
            "Report resolved"
        );

        let content_removal = match action {
            ModerationAction::ContentRemoved => {
                let outcome = self
                    .remove_content(&report.content_type, &report.content_id)
                    .await;
                info!(report_id = %id, outcome = ?outcome, "Reported content removal");
                Some(outcome)
            }
            _ => None,
        };

        let author_ban = match action.ban_duration() {
            Some(duration) => {
                let outcome = self.ban_report_author(&report, duration, notes, admin).await;
                info!(report_id = %id, outcome = ?outcome, "Reported author ban");
                Some(outcome)
            }
            None => None,
        };

        Ok(ResolutionOutcome {
            report_id: id,
            action: action.as_str().to_string(),
            content_removal,
            author_ban,
        })
    }

    /// Delete reported content by type and id
    pub async fn remove_content(&self, content_type: &str, content_id: &str) -> StepOutcome {
        let content_type = match content_type.parse::<ContentType>() {
            Ok(content_type) => content_type,
            Err(e) => return StepOutcome::failed(e),
        };

        let result = match content_type {
            ContentType::FacultyReview => self.remove_reported_review(content_id).await,
            ContentType::SuggestionPost => match Uuid::parse_str(content_id) {
                Ok(id) => self.delete_post(id).await,
                Err(_) => Ok(false),
            },
            ContentType::SuggestionComment => match Uuid::parse_str(content_id) {
                Ok(id) => match self.find_comment(id).await {
                    Ok(Some(comment)) => self.delete_comment(&comment).await.map(|n| n > 0),
                    Ok(None) => Ok(false),
                    Err(e) => Err(e),
                },
                Err(_) => Ok(false),
            },
            ContentType::QuestionPaper => match Uuid::parse_str(content_id) {
                Ok(id) => self.delete_question(id).await,
                Err(_) => Ok(false),
            },
            ContentType::StudentNote => match Uuid::parse_str(content_id) {
                Ok(id) => self.delete_note(id).await,
                Err(_) => Ok(false),
            },
        };

        match result {
            Ok(true) => StepOutcome::Ok,
            Ok(false) => StepOutcome::NotFound,
            Err(e) => {
                warn!(content_type = content_type.as_str(), content_id, error = %e, "Content removal failed");
                StepOutcome::failed(e)
            }
        }
    }

    /// Look up a reported review by id, or by `<initial>_<RFC 3339 timestamp>`
    pub async fn find_reported_review(&self, content_id: &str) -> Result<Option<Review>> {
        if let Ok(id) = Uuid::parse_str(content_id) {
            return self.find_review(id).await;
        }

        let key = content_id.split_once('_').and_then(|(initial, at)| {
            DateTime::parse_from_rfc3339(at)
                .ok()
                .map(|at| (initial, at.with_timezone(&Utc)))
        });
        match key {
            Some((initial, at)) => self.find_review_by_key(initial, at).await,
            None => Ok(None),
        }
    }

    async fn remove_reported_review(&self, content_id: &str) -> Result<bool> {
        match self.find_reported_review(content_id).await? {
            Some(review) => Ok(self.delete_review(&review).await? > 0),
            None => Ok(false),
        }
    }

    async fn ban_report_author(
        &self,
        report: &ReportedContent,
        duration: BanDuration,
        notes: Option<&str>,
        admin: &str,
    ) -> StepOutcome {
        let Some(author) = snapshot_author(
            &report.content_snapshot,
            report.reporter_email.as_deref(),
            Some(&report.reporter_name),
        ) else {
            return StepOutcome::NotFound;
        };

        let ban = NewBan {
            email: author.email,
            name: Some(author.name),
            reason: ban_reason(&report.reason, notes),
            banned_by: admin.to_string(),
            duration,
        };

        match self.create_ban(ban).await {
            Ok(_) => StepOutcome::Ok,
            Err(e) => {
                warn!(report_id = %report.id, error = %e, "Author ban failed");
                StepOutcome::failed(e)
            }
        }
    }
}
