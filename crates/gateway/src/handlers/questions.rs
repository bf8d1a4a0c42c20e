//! Question paper handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers::{ensure_not_banned, page_window, reviews::DeletedResponse, UploadForm};
use crate::AppState;
use bracu_loop_common::{
    auth::AuthContext,
    contact::truncate_chars,
    db::{models::QuestionPaper, NewQuestionPaper, Page, QuestionFilter, Repository, StoredFile},
    errors::{AppError, Result},
    metrics,
    storage::content_type_for,
    uploads::{question_object_path, validate_question_file, ExamType, QuestionMeta},
};

const MAX_COURSE_TITLE_CHARS: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct QuestionListQuery {
    pub course_code: Option<String>,
    pub exam_type: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Serialize)]
pub struct QuestionDownload {
    pub url: String,
    pub file_name: String,
}

async fn question_or_not_found(repo: &Repository, id: Uuid) -> Result<QuestionPaper> {
    repo.find_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            resource_type: "question_paper".to_string(),
            id: id.to_string(),
        })
}

fn parse_year(raw: &str) -> Result<i32> {
    raw.parse()
        .map_err(|_| AppError::validation("year", "Year must be a number"))
}

/// Question papers, newest exam first
pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionListQuery>,
) -> Result<Json<Page<QuestionPaper>>> {
    let (offset, limit) = page_window(query.offset, query.limit);
    let filter = QuestionFilter {
        course_code: query.course_code,
        exam_type: query.exam_type,
        semester: query.semester,
        year: query.year,
        search: query.search,
    };

    Ok(Json(state.repo().list_questions(&filter, offset, limit).await?))
}

/// Question papers the caller uploaded
pub async fn my_questions(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<QuestionPaper>>> {
    Ok(Json(state.repo().questions_by_uploader(&auth.email).await?))
}

/// Upload a question paper with its exam metadata
pub async fn upload_question(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<QuestionPaper>)> {
    let mut form = UploadForm::read(multipart).await?;

    let exam_type: ExamType = form.require("exam_type")?.parse()?;
    let meta = QuestionMeta::new(
        form.require("course_code")?,
        form.require("semester")?,
        parse_year(form.require("year")?)?,
        exam_type,
    )?;
    let course_title = form
        .text("course_title")
        .map(|t| truncate_chars(t, MAX_COURSE_TITLE_CHARS));
    let file = form.take_file()?;

    let size = file.data.len() as u64;
    let limit = state.config.storage.max_question_bytes as u64;
    validate_question_file(&file.file_name, size, limit)?;

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let bucket = state.config.storage.questions_bucket.as_str();
    let path = question_object_path(&meta, &file.file_name, Utc::now().timestamp_millis());
    state.store.put(bucket, &path, file.data).await?;

    let paper = NewQuestionPaper {
        course_code: meta.course_code.clone(),
        course_title,
        semester: meta.semester.clone(),
        year: meta.year,
        exam_type: meta.exam_type.as_str().to_string(),
        file: StoredFile {
            file_name: file.file_name,
            content_type: content_type_for(&path).to_string(),
            path: path.clone(),
            size: size as i64,
        },
        uploader_email: auth.email,
        uploader_name: auth.name,
    };

    let paper = match repo.create_question(paper).await {
        Ok(paper) => paper,
        Err(e) => {
            if let Err(cleanup) = state.store.remove(bucket, &path).await {
                warn!(path = %path, error = %cleanup, "Failed to remove orphaned question object");
            }
            return Err(e);
        }
    };

    metrics::record_upload("question_paper", size);
    info!(
        question_id = %paper.id,
        course = %paper.course_code,
        exam = %meta.exam_type,
        "Question paper uploaded"
    );
    Ok((StatusCode::CREATED, Json(paper)))
}

/// Record a download and return the file URL
pub async fn download_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionDownload>> {
    let repo = state.repo();
    let paper = question_or_not_found(&repo, id).await?;

    if let Err(e) = repo.record_question_download(id, &auth.email).await {
        warn!(question_id = %id, error = %e, "Failed to record question download");
    }

    Ok(Json(QuestionDownload {
        url: state
            .store
            .public_url(&state.config.storage.questions_bucket, &paper.file_path),
        file_name: paper.file_name,
    }))
}

/// Delete one's own question paper; a storage failure only warns
pub async fn delete_question(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let repo = state.repo();
    let paper = question_or_not_found(&repo, id).await?;
    auth.require_owner(&paper.uploader_email, "question paper")?;

    if let Err(e) = state
        .store
        .remove(&state.config.storage.questions_bucket, &paper.file_path)
        .await
    {
        warn!(question_id = %id, error = %e, "Failed to remove question file");
    }

    let deleted = repo.delete_question(id).await?;
    info!(question_id = %id, "Question paper deleted");
    Ok(Json(DeletedResponse { deleted }))
}
