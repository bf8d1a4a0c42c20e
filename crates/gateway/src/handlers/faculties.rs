//! Faculty directory handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::handlers::reviews::{thread_views, ThreadView};
use crate::AppState;
use bracu_loop_common::{
    auth::AuthContext,
    db::models::{Course, Faculty},
    errors::{AppError, Result},
    reviews::{RatingSummary, SortOrder},
};

#[derive(Debug, Default, Deserialize)]
pub struct FacultySearch {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FacultyPageQuery {
    /// `recent` (default) or `upvoted`
    pub sort: Option<String>,
}

#[derive(Serialize)]
pub struct FacultyPageResponse {
    pub faculty: Faculty,
    pub courses: Vec<Course>,
    pub summary: RatingSummary,
    pub threads: Vec<ThreadView>,
}

/// Active faculty, optionally searched by initial or name
pub async fn list_faculties(
    State(state): State<AppState>,
    Query(query): Query<FacultySearch>,
) -> Result<Json<Vec<Faculty>>> {
    let faculties = state.repo().list_faculties(query.search.as_deref()).await?;
    Ok(Json(faculties))
}

/// Course catalog
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>> {
    Ok(Json(state.repo().list_courses().await?))
}

/// Faculty page with threaded reviews; signed-in viewers see their votes
pub async fn get_faculty(
    State(state): State<AppState>,
    auth: Option<AuthContext>,
    Path(initial): Path<String>,
    Query(query): Query<FacultyPageQuery>,
) -> Result<Json<FacultyPageResponse>> {
    let order = match query.sort.as_deref() {
        None => SortOrder::default(),
        Some(sort) => sort
            .parse::<SortOrder>()
            .map_err(|e| AppError::validation("sort", e))?,
    };

    let initial = initial.trim().to_uppercase();
    let viewer = auth.as_ref().map(|a| a.email.as_str());
    let page = state.repo().faculty_page(&initial, viewer, order).await?;

    Ok(Json(FacultyPageResponse {
        faculty: page.faculty,
        courses: page.courses,
        summary: page.summary,
        threads: thread_views(page.threads, &page.my_votes),
    }))
}
