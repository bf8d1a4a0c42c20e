//! Admin console handlers
//!
//! Everything except `login` requires an `X-Admin-Session` token. Mutations are
//! logged with the acting admin's username.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::{notes::note_url, reviews::DeletedResponse};
use crate::AppState;
use bracu_loop_common::{
    auth::{
        admin::{auth_failed, verify_password, AdminContext, AdminCredentials},
        generate_session_token, hash_token,
    },
    contact::sanitize_reply,
    db::{
        models::{BannedUser, ContactSubmission, Course, Faculty, ReportedContent},
        BanRecord, CourseInput, DashboardStats, FacultyInput, NewBan, Repository,
    },
    errors::{AppError, Result},
    moderation::{
        BanDuration, ContentType, ModerationAction, ResolutionOutcome, StepOutcome, MAX_BAN_DAYS,
    },
    notify::{deliver, student_reply_email, Delivery, ReplyNotification, TemplateKind},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
    pub username: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub admin_id: Uuid,
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BanListQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// A reported item as stored, with where its file or link opens
#[derive(Debug, Serialize)]
pub struct ContentView {
    pub content_type: ContentType,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveReportRequest {
    pub action: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBanRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 500, message = "Reason is required"))]
    pub reason: String,

    /// `"N days"` or `"permanent"`
    pub duration: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub reply: String,
}

#[derive(Serialize)]
pub struct ReplyResponse {
    pub contact: ContactSubmission,
    pub delivery: Delivery,
}

#[derive(Debug, Deserialize)]
pub struct AssignCoursesRequest {
    pub course_codes: Vec<String>,
}

fn report_not_found(id: Uuid) -> AppError {
    AppError::NotFound {
        resource_type: "report".to_string(),
        id: id.to_string(),
    }
}

fn parse_content_type(raw: &str) -> Result<ContentType> {
    raw.parse()
        .map_err(|e: String| AppError::validation("content_type", e))
}

fn content_not_found(content_type: ContentType, id: &str) -> AppError {
    AppError::NotFound {
        resource_type: content_type.as_str().to_string(),
        id: id.to_string(),
    }
}

fn ban_duration(raw: &str) -> Result<BanDuration> {
    BanDuration::parse(raw).ok_or_else(|| {
        AppError::validation(
            "duration",
            format!(
                "Duration must be \"N days\" with N at most {} or \"permanent\"",
                MAX_BAN_DAYS
            ),
        )
    })
}

fn status_filter(query: &StatusFilter) -> Option<&str> {
    query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "all")
}

// ============================================================================
// Session
// ============================================================================

/// Exchange username and password for a session token.
///
/// Every failure, including an unknown or disabled account, reads the same.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let credentials = AdminCredentials::sanitize(&request.username, &request.password)?;

    let repo = state.repo();
    let admin = match repo.find_admin_by_username(&credentials.username).await? {
        Some(admin) if admin.is_active => admin,
        _ => {
            warn!(username = %credentials.username, "Admin login rejected");
            return Err(auth_failed());
        }
    };

    if !verify_password(&credentials.password, &admin.password_hash) {
        warn!(username = %credentials.username, "Admin login rejected");
        return Err(auth_failed());
    }

    let token = generate_session_token();
    let session = repo
        .create_admin_session(&admin, hash_token(&token), state.config.admin_session_ttl())
        .await?;

    info!(username = %admin.username, session_id = %session.id, "Admin logged in");
    Ok(Json(LoginResponse {
        session_token: token,
        expires_at: session.expires_at.with_timezone(&Utc),
        username: admin.username,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    admin: AdminContext,
) -> Result<Json<DeletedResponse>> {
    let deleted = state.repo().delete_admin_session(admin.session_id).await?;
    info!(username = %admin.username, "Admin logged out");
    Ok(Json(DeletedResponse { deleted }))
}

pub async fn session(admin: AdminContext) -> Json<SessionResponse> {
    Json(SessionResponse {
        admin_id: admin.admin_id,
        username: admin.username,
    })
}

pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminContext,
) -> Result<Json<DashboardStats>> {
    Ok(Json(state.repo().dashboard_stats().await?))
}

// ============================================================================
// Reports
// ============================================================================

pub async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminContext,
    Query(query): Query<StatusFilter>,
) -> Result<Json<Vec<ReportedContent>>> {
    let reports = state.repo().list_reports(status_filter(&query)).await?;
    Ok(Json(reports))
}

pub async fn delete_report(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let deleted = state.repo().delete_report(id).await?;
    info!(report_id = %id, admin = %admin.username, deleted, "Report deleted");
    Ok(Json(DeletedResponse { deleted }))
}

/// Bucket and path of the file behind a reported note or question paper
async fn stored_file(
    state: &AppState,
    repo: &Repository,
    report: &ReportedContent,
) -> Option<(String, String)> {
    let id = Uuid::parse_str(&report.content_id).ok()?;
    let storage = &state.config.storage;

    match report.content_type.parse::<ContentType>().ok()? {
        ContentType::StudentNote => {
            let note = repo.find_note(id).await.ok().flatten()?;
            note.file_path
                .map(|path| (storage.notes_bucket.clone(), path))
        }
        ContentType::QuestionPaper => {
            let paper = repo.find_question(id).await.ok().flatten()?;
            Some((storage.questions_bucket.clone(), paper.file_path))
        }
        _ => None,
    }
}

/// Resolve a report and apply its action.
///
/// When content is removed, any stored file behind it is removed afterwards.
pub async fn resolve_report(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolveReportRequest>,
) -> Result<Json<ResolutionOutcome>> {
    let action = ModerationAction::parse(request.action.trim());
    if action.as_str().is_empty() {
        return Err(AppError::validation("action", "Action is required"));
    }

    let repo = state.repo();
    let report = repo
        .find_report(id)
        .await?
        .ok_or_else(|| report_not_found(id))?;

    let file = match action {
        ModerationAction::ContentRemoved => stored_file(&state, &repo, &report).await,
        _ => None,
    };

    let notes = request
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let outcome = repo
        .resolve_report(id, &action, notes, &admin.username)
        .await?;

    if let (Some((bucket, path)), Some(StepOutcome::Ok)) = (file, &outcome.content_removal) {
        if let Err(e) = state.store.remove(&bucket, &path).await {
            warn!(report_id = %id, bucket = %bucket, path = %path, error = %e, "Failed to remove reported file");
        }
    }

    if !outcome.is_complete() {
        warn!(report_id = %id, outcome = ?outcome, "Report resolved with failed steps");
    }
    info!(report_id = %id, action = %action, admin = %admin.username, "Report handled");
    Ok(Json(outcome))
}

// ============================================================================
// Bans
// ============================================================================

pub async fn list_bans(
    State(state): State<AppState>,
    _admin: AdminContext,
    Query(query): Query<BanListQuery>,
) -> Result<Json<Vec<BanRecord>>> {
    Ok(Json(state.repo().list_bans(query.active_only).await?))
}

pub async fn create_ban(
    State(state): State<AppState>,
    admin: AdminContext,
    Json(request): Json<CreateBanRequest>,
) -> Result<(StatusCode, Json<BannedUser>)> {
    request.validate()?;
    let duration = ban_duration(&request.duration)?;

    let ban = state
        .repo()
        .create_ban(NewBan {
            email: request.email.trim().to_lowercase(),
            name: request.name.filter(|n| !n.trim().is_empty()),
            reason: request.reason.trim().to_string(),
            banned_by: admin.username.clone(),
            duration,
        })
        .await?;

    info!(ban_id = %ban.id, email = %ban.email, admin = %admin.username, "User banned");
    Ok((StatusCode::CREATED, Json(ban)))
}

pub async fn unban(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let lifted = state.repo().unban(id).await?;
    info!(ban_id = %id, admin = %admin.username, lifted, "Ban lifted");
    Ok(Json(DeletedResponse { deleted: lifted }))
}

/// Open a reported item for review.
///
/// Unlike the student endpoints this never counts a download.
pub async fn view_content(
    State(state): State<AppState>,
    admin: AdminContext,
    Path((content_type, content_id)): Path<(String, String)>,
) -> Result<Json<ContentView>> {
    let kind = parse_content_type(&content_type)?;
    let missing = || content_not_found(kind, &content_id);
    let row_id = || Uuid::parse_str(&content_id).map_err(|_| missing());
    let repo = state.repo();

    let (content, url) = match kind {
        ContentType::FacultyReview => {
            let review = repo.find_reported_review(&content_id).await?.ok_or_else(missing)?;
            (serde_json::to_value(review)?, None)
        }
        ContentType::SuggestionPost => {
            let post = repo.find_post(row_id()?).await?.ok_or_else(missing)?;
            (serde_json::to_value(post)?, None)
        }
        ContentType::SuggestionComment => {
            let comment = repo.find_comment(row_id()?).await?.ok_or_else(missing)?;
            (serde_json::to_value(comment)?, None)
        }
        ContentType::StudentNote => {
            let note = repo.find_note(row_id()?).await?.ok_or_else(missing)?;
            let url = note_url(&state, &note);
            (serde_json::to_value(note)?, url)
        }
        ContentType::QuestionPaper => {
            let paper = repo.find_question(row_id()?).await?.ok_or_else(missing)?;
            let url = state
                .store
                .public_url(&state.config.storage.questions_bucket, &paper.file_path);
            (serde_json::to_value(paper)?, Some(url))
        }
    };

    info!(
        content_type = kind.as_str(),
        content_id = %content_id,
        admin = %admin.username,
        "Reported content opened"
    );
    Ok(Json(ContentView {
        content_type: kind,
        content,
        url,
    }))
}

// ============================================================================
// Contact messages
// ============================================================================

pub async fn list_contacts(
    State(state): State<AppState>,
    _admin: AdminContext,
    Query(query): Query<StatusFilter>,
) -> Result<Json<Vec<ContactSubmission>>> {
    Ok(Json(state.repo().list_contacts(status_filter(&query)).await?))
}

/// Record a reply and email it to the student
pub async fn reply_contact(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<ReplyResponse>> {
    let reply = sanitize_reply(&request.reply)?;
    let contact = state
        .repo()
        .reply_contact(id, reply, &admin.username)
        .await?;

    let notification = ReplyNotification {
        student_name: &contact.student_name,
        student_email: &contact.student_email,
        original_subject: &contact.subject,
        original_message: &contact.message,
        admin_reply: contact.admin_reply.as_deref().unwrap_or_default(),
        replied_by: &admin.username,
        replied_at: contact
            .replied_at
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
    };
    let email = student_reply_email(&notification, &state.config.mail);
    let delivery = deliver(state.mailer.as_ref(), &email, TemplateKind::StudentReply).await;

    info!(contact_id = %id, admin = %admin.username, "Contact message answered");
    Ok(Json(ReplyResponse { contact, delivery }))
}

pub async fn mark_contact_read(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactSubmission>> {
    let contact = state.repo().mark_contact_read(id).await?;
    info!(contact_id = %id, admin = %admin.username, status = %contact.status, "Contact message opened");
    Ok(Json(contact))
}

pub async fn resolve_contact(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactSubmission>> {
    let contact = state.repo().resolve_contact(id).await?;
    info!(contact_id = %id, admin = %admin.username, "Contact message resolved");
    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let deleted = state.repo().delete_contact(id).await?;
    info!(contact_id = %id, admin = %admin.username, deleted, "Contact message deleted");
    Ok(Json(DeletedResponse { deleted }))
}

// ============================================================================
// Faculty and course catalog
// ============================================================================

pub async fn create_faculty(
    State(state): State<AppState>,
    admin: AdminContext,
    Json(input): Json<FacultyInput>,
) -> Result<(StatusCode, Json<Faculty>)> {
    let faculty = state.repo().create_faculty(input).await?;
    info!(initial = %faculty.initial, admin = %admin.username, "Faculty added");
    Ok((StatusCode::CREATED, Json(faculty)))
}

pub async fn update_faculty(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(initial): Path<String>,
    Json(input): Json<FacultyInput>,
) -> Result<Json<Faculty>> {
    let initial = initial.trim().to_uppercase();
    let faculty = state.repo().update_faculty(&initial, input).await?;
    info!(initial = %initial, admin = %admin.username, "Faculty updated");
    Ok(Json(faculty))
}

pub async fn delete_faculty(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(initial): Path<String>,
) -> Result<Json<DeletedResponse>> {
    let initial = initial.trim().to_uppercase();
    let deleted = state.repo().delete_faculty(&initial).await?;
    info!(initial = %initial, admin = %admin.username, deleted, "Faculty deleted");
    Ok(Json(DeletedResponse { deleted }))
}

/// Replace the courses a faculty member teaches
pub async fn assign_courses(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(initial): Path<String>,
    Json(request): Json<AssignCoursesRequest>,
) -> Result<Json<Vec<Course>>> {
    let initial = initial.trim().to_uppercase();
    let courses = state
        .repo()
        .assign_courses(&initial, request.course_codes)
        .await?;
    info!(
        initial = %initial,
        courses = courses.len(),
        admin = %admin.username,
        "Faculty courses assigned"
    );
    Ok(Json(courses))
}

pub async fn create_course(
    State(state): State<AppState>,
    admin: AdminContext,
    Json(input): Json<CourseInput>,
) -> Result<(StatusCode, Json<Course>)> {
    let course = state.repo().create_course(input).await?;
    info!(code = %course.code, admin = %admin.username, "Course added");
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn update_course(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(code): Path<String>,
    Json(input): Json<CourseInput>,
) -> Result<Json<Course>> {
    let code = code.trim().to_uppercase();
    let course = state.repo().update_course(&code, input).await?;
    info!(code = %code, admin = %admin.username, "Course updated");
    Ok(Json(course))
}

pub async fn delete_course(
    State(state): State<AppState>,
    admin: AdminContext,
    Path(code): Path<String>,
) -> Result<Json<DeletedResponse>> {
    let code = code.trim().to_uppercase();
    let deleted = state.repo().delete_course(&code).await?;
    info!(code = %code, admin = %admin.username, deleted, "Course deleted");
    Ok(Json(DeletedResponse { deleted }))
}
