//! API handlers module

pub mod admin;
pub mod auth;
pub mod contact;
pub mod faculties;
pub mod health;
pub mod notes;
pub mod objects;
pub mod questions;
pub mod reports;
pub mod reviews;
pub mod rooms;
pub mod suggestions;

use axum::extract::{multipart::MultipartError, Multipart};
use bracu_loop_common::{
    db::{page_limit, Repository},
    errors::{AppError, Result},
};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::warn;

/// Offset and clamped page size from `offset` / `limit` query parameters
pub fn page_window(offset: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (offset.unwrap_or(0), page_limit(limit))
}

/// Reject writes from banned students.
///
/// A failing ban lookup lets the request through.
pub async fn ensure_not_banned(repo: &Repository, email: &str) -> Result<()> {
    match repo.check_ban(email).await {
        Ok(status) if status.is_banned => Err(AppError::Banned {
            reason: status
                .reason
                .unwrap_or_else(|| "Your account has been suspended".to_string()),
        }),
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(email, error = %e, "Ban check failed, allowing request");
            Ok(())
        }
    }
}

/// File part of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// A multipart form: text fields plus at most one file
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::InvalidFormat {
        message: e.body_text(),
    }
}

impl UploadForm {
    /// Drain the multipart stream
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(String::from) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(multipart_error)?;
                    form.file = Some(UploadedFile {
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when missing or blank
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.text(name).ok_or_else(|| AppError::MissingField {
            field: name.to_string(),
        })
    }

    pub fn take_file(&mut self) -> Result<UploadedFile> {
        self.file.take().ok_or_else(|| AppError::MissingField {
            field: "file".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_defaults_and_clamps() {
        assert_eq!(page_window(None, None), (0, 20));
        assert_eq!(page_window(Some(40), Some(500)), (40, 100));
    }

    #[test]
    fn test_upload_form_fields() {
        let mut form = UploadForm::default();
        form.fields.insert("title".into(), "  Notes  ".into());
        form.fields.insert("blank".into(), "   ".into());

        assert_eq!(form.text("title"), Some("Notes"));
        assert_eq!(form.text("blank"), None);
        assert!(matches!(
            form.require("course_code"),
            Err(AppError::MissingField { .. })
        ));
        assert!(form.take_file().is_err());
    }
}
