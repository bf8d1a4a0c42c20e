//! Student note handlers

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
    db::{models::StudentNote, NewStudentNote, NoteFilter, Page, Repository, StoredFile},
    errors::{AppError, Result},
    metrics,
    uploads::{
        note_object_path, validate_course_code, validate_link_url, validate_note_file, LinkType,
    },
};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct NoteListQuery {
    pub course_code: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkNoteRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub course_code: String,
    #[serde(default)]
    pub category: Option<String>,
    pub link_url: String,
    #[serde(default)]
    pub link_type: Option<String>,
}

#[derive(Serialize)]
pub struct NoteAccess {
    pub url: String,
    pub is_link: bool,
}

fn note_title(title: &str) -> Result<String> {
    let title = truncate_chars(title, MAX_TITLE_CHARS);
    if title.is_empty() {
        return Err(AppError::MissingField {
            field: "title".to_string(),
        });
    }
    Ok(title)
}

fn optional_text(value: Option<&str>, max: usize) -> Option<String> {
    value
        .map(|v| truncate_chars(v, max))
        .filter(|v| !v.is_empty())
}

/// Where a note's content lives
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum NoteLocation<'a> {
    Link(&'a str),
    Object(&'a str),
}

pub(crate) fn note_location(note: &StudentNote) -> Option<NoteLocation<'_>> {
    match (&note.link_url, &note.file_path) {
        (Some(link), _) if note.is_link => Some(NoteLocation::Link(link)),
        (_, Some(path)) => Some(NoteLocation::Object(path)),
        _ => None,
    }
}

/// URL a note opens at: the link itself or the stored object
pub(crate) fn note_url(state: &AppState, note: &StudentNote) -> Option<String> {
    note_location(note).map(|location| match location {
        NoteLocation::Link(link) => link.to_string(),
        NoteLocation::Object(path) => state
            .store
            .public_url(&state.config.storage.notes_bucket, path),
    })
}

async fn note_or_not_found(repo: &Repository, id: Uuid) -> Result<StudentNote> {
    repo.find_note(id).await?.ok_or_else(|| AppError::NotFound {
        resource_type: "student_note".to_string(),
        id: id.to_string(),
    })
}

/// Approved notes, newest first
pub async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<NoteListQuery>,
) -> Result<Json<Page<StudentNote>>> {
    let (offset, limit) = page_window(query.offset, query.limit);
    let filter = NoteFilter {
        course_code: query.course_code,
        category: query.category,
        search: query.search,
    };

    Ok(Json(state.repo().list_notes(&filter, offset, limit).await?))
}

/// The caller's own notes, including ones not yet approved
pub async fn my_notes(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<StudentNote>>> {
    Ok(Json(state.repo().notes_by_uploader(&auth.email).await?))
}

/// Upload a note archive.
///
/// The object is stored first; if recording the note fails it is removed again.
pub async fn upload_note(
    State(state): State<AppState>,
    auth: AuthContext,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StudentNote>)> {
    let mut form = UploadForm::read(multipart).await?;

    let title = note_title(form.require("title")?)?;
    let course_code = validate_course_code(form.require("course_code")?)?;
    let description = optional_text(form.text("description"), MAX_DESCRIPTION_CHARS);
    let category = optional_text(form.text("category"), MAX_TITLE_CHARS);
    let file = form.take_file()?;

    let size = file.data.len() as u64;
    let limit = state.config.storage.max_note_bytes as u64;
    validate_note_file(&file.file_name, &file.content_type, size, limit)?;

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let bucket = state.config.storage.notes_bucket.as_str();
    let path = note_object_path(&course_code, &file.file_name, Utc::now().timestamp_millis());
    state.store.put(bucket, &path, file.data).await?;

    let note = NewStudentNote {
        title,
        description,
        course_code,
        category,
        file: Some(StoredFile {
            file_name: file.file_name,
            path: path.clone(),
            size: size as i64,
            content_type: file.content_type,
        }),
        link: None,
        uploader_email: auth.email,
        uploader_name: auth.name,
    };

    let note = match repo.create_note(note).await {
        Ok(note) => note,
        Err(e) => {
            if let Err(cleanup) = state.store.remove(bucket, &path).await {
                warn!(path = %path, error = %cleanup, "Failed to remove orphaned note object");
            }
            return Err(e);
        }
    };

    metrics::record_upload("note_file", size);
    info!(note_id = %note.id, course = %note.course_code, size, "Note uploaded");
    Ok((StatusCode::CREATED, Json(note)))
}

/// Share a note hosted elsewhere
pub async fn create_link_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateLinkNoteRequest>,
) -> Result<(StatusCode, Json<StudentNote>)> {
    let title = note_title(&request.title)?;
    let course_code = validate_course_code(&request.course_code)?;
    let link_url = validate_link_url(&request.link_url)?;
    let link_type = match request.link_type.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse::<LinkType>()?,
        _ => LinkType::Other,
    };

    let repo = state.repo();
    ensure_not_banned(&repo, &auth.email).await?;

    let note = repo
        .create_note(NewStudentNote {
            title,
            description: optional_text(request.description.as_deref(), MAX_DESCRIPTION_CHARS),
            course_code,
            category: optional_text(request.category.as_deref(), MAX_TITLE_CHARS),
            file: None,
            link: Some((link_url, link_type.as_str().to_string())),
            uploader_email: auth.email,
            uploader_name: auth.name,
        })
        .await?;

    metrics::record_upload("note_link", 0);
    info!(note_id = %note.id, link_type = link_type.as_str(), "Link note shared");
    Ok((StatusCode::CREATED, Json(note)))
}

/// Count a download and hand back where the note lives
pub async fn access_note(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<NoteAccess>> {
    let repo = state.repo();
    let note = note_or_not_found(&repo, id).await?;

    let url = note_url(&state, &note).ok_or_else(|| AppError::NotFound {
        resource_type: "note_file".to_string(),
        id: id.to_string(),
    })?;

    if let Err(e) = repo.record_note_access(id).await {
        warn!(note_id = %id, error = %e, "Failed to count note access");
    }

    Ok(Json(NoteAccess {
        url,
        is_link: note.is_link,
    }))
}

/// Delete one's own note and its stored file
pub async fn delete_note(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>> {
    let repo = state.repo();
    let note = note_or_not_found(&repo, id).await?;
    auth.require_owner(&note.uploader_email, "note")?;

    let deleted = repo.delete_note(id).await?;

    if let Some(path) = note.file_path.as_deref() {
        if let Err(e) = state
            .store
            .remove(&state.config.storage.notes_bucket, path)
            .await
        {
            warn!(note_id = %id, path, error = %e, "Failed to remove note file");
        }
    }

    info!(note_id = %id, "Note deleted");
    Ok(Json(DeletedResponse { deleted }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn note(is_link: bool, link_url: Option<&str>, file_path: Option<&str>) -> StudentNote {
        let at = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 10, 0, 0)
            .unwrap();
        StudentNote {
            id: Uuid::new_v4(),
            title: "Week 3".into(),
            description: None,
            course_code: "CSE110".into(),
            category: None,
            is_link,
            file_name: file_path.map(|_| "week3.zip".to_string()),
            file_path: file_path.map(String::from),
            file_size: None,
            file_type: None,
            link_url: link_url.map(String::from),
            link_type: None,
            uploader_email: "rafi@g.bracu.ac.bd".into(),
            uploader_name: "Rafi".into(),
            download_count: 0,
            is_approved: true,
            is_reported: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_note_location() {
        let link = note(true, Some("https://drive.google.com/x"), None);
        assert_eq!(
            note_location(&link),
            Some(NoteLocation::Link("https://drive.google.com/x"))
        );

        let file = note(false, None, Some("CSE110/1717236000000_week3.zip"));
        assert_eq!(
            note_location(&file),
            Some(NoteLocation::Object("CSE110/1717236000000_week3.zip"))
        );

        assert_eq!(note_location(&note(true, None, None)), None);
        // a stale link on a file note is ignored
        let mixed = note(false, Some("https://example.com"), Some("a/b.zip"));
        assert_eq!(note_location(&mixed), Some(NoteLocation::Object("a/b.zip")));
    }

    #[test]
    fn test_note_title_trimmed_and_capped() {
        assert_eq!(note_title("  Week 3  ").unwrap(), "Week 3");
        assert_eq!(note_title(&"x".repeat(300)).unwrap().len(), MAX_TITLE_CHARS);
        assert!(matches!(note_title("   "), Err(AppError::MissingField { .. })));
    }

    #[test]
    fn test_optional_text_drops_blank() {
        assert_eq!(optional_text(Some("  "), 10), None);
        assert_eq!(optional_text(Some(" lab "), 10), Some("lab".to_string()));
        assert_eq!(optional_text(None, 10), None);
    }
}
