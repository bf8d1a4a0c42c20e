//! Repository pattern for database operations
//!
//! One `Repository` type; its operations are split by feature across the
//! submodules. Reads go to the replica when configured, writes to the primary.

mod admin;
mod library;
mod moderation;
mod reviews;
mod rooms;
mod suggestions;

pub use admin::{CourseInput, DashboardStats, FacultyInput};
pub use library::{NewQuestionPaper, NewStudentNote, NoteFilter, QuestionFilter, StoredFile};
pub use moderation::{report_status, BanRecord, NewBan, NewReport};
pub use reviews::{FacultyPage, NewReview, ReviewEdit, VoteOutcome};
pub use suggestions::SuggestionPage;

use crate::db::DbPool;
use crate::errors::Result;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QuerySelect, Select};
use serde::Serialize;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Largest page a client may ask for
pub const MAX_PAGE_SIZE: u64 = 100;

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Page size clamped to `1..=MAX_PAGE_SIZE`
pub fn page_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// `%term%` for ILIKE, with the LIKE wildcards in `term` escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Repository for data access operations
// sea-orm's `mock` feature (dev-only) removes `Clone` from `DatabaseConnection`.
#[cfg_attr(not(test), derive(Clone))]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// One page of `query` starting at row `offset`; the limit is clamped
    /// to `1..=MAX_PAGE_SIZE`
    async fn fetch_window<E>(
        &self,
        query: Select<E>,
        offset: u64,
        limit: u64,
    ) -> Result<Page<E::Model>>
    where
        E: EntityTrait,
        E::Model: Send + Sync + 'static,
    {
        let limit = page_limit(Some(limit));
        let total = query.clone().count(self.read_conn()).await?;
        let items = query
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::SuggestionPost;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    pub(crate) fn mock_repo(db: MockDatabase) -> Repository {
        Repository::new(DbPool::from_connection(db.into_connection()))
    }

    pub(crate) fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn post() -> SuggestionPost {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap().into();
        SuggestionPost {
            id: Uuid::new_v4(),
            course_code: Some("CSE110".into()),
            title: "Lab sections".into(),
            content: "More lab sections please".into(),
            author_name: "Alice".into(),
            author_email: "alice@g.bracu.ac.bd".into(),
            likes_count: 0,
            comments_count: 0,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn test_zero_limit_listing_is_clamped() {
        let repo = mock_repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![count_row(3)]])
                .append_query_results([vec![post()]]),
        );

        let page = repo.list_posts(None, 2, 0).await.unwrap();
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset, 2);
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_offset_not_aligned_to_limit_is_kept() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(30)]])
            .append_query_results([vec![post()]])
            .into_connection();
        let repo = Repository::new(DbPool::from_connection(db));

        let page = repo.list_posts(Some("CSE110"), 15, 10).await.unwrap();
        assert_eq!((page.offset, page.limit), (15, 10));

        let log = repo.pool.primary.into_transaction_log();
        let listing = log.last().unwrap().statements()[0].sql.clone();
        assert!(listing.contains("OFFSET"), "{}", listing);
        assert!(listing.contains("LIMIT"), "{}", listing);
    }

    #[test]
    fn test_page_limit_clamped() {
        assert_eq!(page_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(page_limit(Some(0)), 1);
        assert_eq!(page_limit(Some(1000)), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" data "), "%data%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
