//! Serves stored note and question files

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::AppState;
use bracu_loop_common::{
    errors::{AppError, Result},
    storage::content_type_for,
};

fn object_not_found(bucket: &str, path: &str) -> AppError {
    AppError::NotFound {
        resource_type: "object".to_string(),
        id: format!("{}/{}", bucket, path),
    }
}

/// Only the configured buckets are reachable
pub async fn get_object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let storage = &state.config.storage;
    if bucket != storage.notes_bucket && bucket != storage.questions_bucket {
        return Err(object_not_found(&bucket, &path));
    }

    let data = state
        .store
        .get(&bucket, &path)
        .await?
        .ok_or_else(|| object_not_found(&bucket, &path))?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], data))
}
