//! Notes and question paper data access

use super::{like_pattern, Page, Repository};
use crate::db::models::*;
use crate::errors::Result;
use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

/// Note listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    pub course_code: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// A file or link note to record
#[derive(Debug, Clone)]
pub struct NewStudentNote {
    pub title: String,
    pub description: Option<String>,
    pub course_code: String,
    pub category: Option<String>,
    pub file: Option<StoredFile>,
    pub link: Option<(String, String)>,
    pub uploader_email: String,
    pub uploader_name: String,
}

/// Object already written to storage
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub path: String,
    pub size: i64,
    pub content_type: String,
}

/// Question paper listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionFilter {
    pub course_code: Option<String>,
    pub exam_type: Option<String>,
    pub semester: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

/// Question paper metadata to record
#[derive(Debug, Clone)]
pub struct NewQuestionPaper {
    pub course_code: String,
    pub course_title: Option<String>,
    pub semester: String,
    pub year: i32,
    pub exam_type: String,
    pub file: StoredFile,
    pub uploader_email: String,
    pub uploader_name: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Repository {
    // ========================================================================
    // Note Operations
    // ========================================================================

    /// Approved notes, newest first
    pub async fn list_notes(
        &self,
        filter: &NoteFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Page<StudentNote>> {
        let mut query = StudentNoteEntity::find().filter(StudentNoteColumn::IsApproved.eq(true));

        if let Some(code) = present(&filter.course_code) {
            query = query.filter(StudentNoteColumn::CourseCode.eq(code));
        }
        if let Some(category) = present(&filter.category) {
            query = query.filter(StudentNoteColumn::Category.eq(category));
        }
        if let Some(term) = present(&filter.search) {
            let pattern = like_pattern(term);
            query = query.filter(
                Condition::any()
                    .add(Expr::col(StudentNoteColumn::Title).ilike(pattern.clone()))
                    .add(Expr::col(StudentNoteColumn::Description).ilike(pattern)),
            );
        }

        let query = query.order_by_desc(StudentNoteColumn::CreatedAt);
        self.fetch_window(query, offset, limit).await
    }

    /// Find note by ID
    pub async fn find_note(&self, id: Uuid) -> Result<Option<StudentNote>> {
        StudentNoteEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Record a note; file notes reference an already stored object
    pub async fn create_note(&self, note: NewStudentNote) -> Result<StudentNote> {
        let now = Utc::now();
        let is_link = note.link.is_some();
        let (link_url, link_type) = note.link.unzip();
        let file = note.file;

        let model = StudentNoteActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(note.title),
            description: Set(note.description),
            course_code: Set(note.course_code),
            category: Set(note.category),
            is_link: Set(is_link),
            file_name: Set(file.as_ref().map(|f| f.file_name.clone())),
            file_path: Set(file.as_ref().map(|f| f.path.clone())),
            file_size: Set(file.as_ref().map(|f| f.size)),
            file_type: Set(file.map(|f| f.content_type)),
            link_url: Set(link_url),
            link_type: Set(link_type),
            uploader_email: Set(note.uploader_email),
            uploader_name: Set(note.uploader_name),
            download_count: Set(0),
            is_approved: Set(true),
            is_reported: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Every note uploaded by `email`, approved or not, newest first
    pub async fn notes_by_uploader(&self, email: &str) -> Result<Vec<StudentNote>> {
        StudentNoteEntity::find()
            .filter(StudentNoteColumn::UploaderEmail.eq(email))
            .order_by_desc(StudentNoteColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Bump a note's download counter
    pub async fn record_note_access(&self, id: Uuid) -> Result<()> {
        StudentNoteEntity::update_many()
            .col_expr(
                StudentNoteColumn::DownloadCount,
                Expr::col(StudentNoteColumn::DownloadCount).add(1),
            )
            .filter(StudentNoteColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;
        Ok(())
    }

    /// Delete note by ID
    pub async fn delete_note(&self, id: Uuid) -> Result<bool> {
        let result = StudentNoteEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Question Paper Operations
    // ========================================================================

    /// Question papers, newest exam first
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Page<QuestionPaper>> {
        let mut query = QuestionPaperEntity::find();

        if let Some(code) = present(&filter.course_code) {
            query = query.filter(QuestionPaperColumn::CourseCode.eq(code));
        }
        if let Some(exam) = present(&filter.exam_type) {
            query = query.filter(QuestionPaperColumn::ExamType.eq(exam));
        }
        if let Some(semester) = present(&filter.semester) {
            query = query.filter(QuestionPaperColumn::Semester.eq(semester));
        }
        if let Some(year) = filter.year {
            query = query.filter(QuestionPaperColumn::Year.eq(year));
        }
        if let Some(term) = present(&filter.search) {
            let pattern = like_pattern(term);
            query = query.filter(
                Condition::any()
                    .add(Expr::col(QuestionPaperColumn::CourseCode).ilike(pattern.clone()))
                    .add(Expr::col(QuestionPaperColumn::CourseTitle).ilike(pattern.clone()))
                    .add(Expr::col(QuestionPaperColumn::FileName).ilike(pattern)),
            );
        }

        let query = query
            .order_by_desc(QuestionPaperColumn::Year)
            .order_by_desc(QuestionPaperColumn::CreatedAt);
        self.fetch_window(query, offset, limit).await
    }

    /// Question papers uploaded by `email`, newest upload first
    pub async fn questions_by_uploader(&self, email: &str) -> Result<Vec<QuestionPaper>> {
        QuestionPaperEntity::find()
            .filter(QuestionPaperColumn::UploaderEmail.eq(email))
            .order_by_desc(QuestionPaperColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find question paper by ID
    pub async fn find_question(&self, id: Uuid) -> Result<Option<QuestionPaper>> {
        QuestionPaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Record an uploaded question paper
    pub async fn create_question(&self, paper: NewQuestionPaper) -> Result<QuestionPaper> {
        let model = QuestionPaperActiveModel {
            id: Set(Uuid::new_v4()),
            course_code: Set(paper.course_code),
            course_title: Set(paper.course_title),
            semester: Set(paper.semester),
            year: Set(paper.year),
            exam_type: Set(paper.exam_type),
            file_name: Set(paper.file.file_name),
            file_path: Set(paper.file.path),
            file_size: Set(paper.file.size),
            file_type: Set(paper.file.content_type),
            uploader_email: Set(paper.uploader_email),
            uploader_name: Set(paper.uploader_name),
            download_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Add a download ledger row and bump the counter
    pub async fn record_question_download(&self, id: Uuid, user_email: &str) -> Result<()> {
        let txn = self.write_conn().begin().await?;

        QuestionDownloadActiveModel {
            id: Set(Uuid::new_v4()),
            question_id: Set(id),
            user_email: Set(user_email.to_string()),
            downloaded_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        QuestionPaperEntity::update_many()
            .col_expr(
                QuestionPaperColumn::DownloadCount,
                Expr::col(QuestionPaperColumn::DownloadCount).add(1),
            )
            .filter(QuestionPaperColumn::Id.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Delete question paper by ID; ledger rows cascade
    pub async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let result = QuestionPaperEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::tests::mock_repo;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn statements(repo: Repository) -> Vec<String> {
        repo.pool
            .primary
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().iter().map(|s| s.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_own_notes_include_unapproved() {
        let repo = mock_repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<StudentNote>::new()]),
        );

        let notes = repo.notes_by_uploader("rafi@g.bracu.ac.bd").await.unwrap();
        assert!(notes.is_empty());

        let sql = &statements(repo)[0];
        assert!(sql.contains(r#""uploader_email" = 'rafi@g.bracu.ac.bd'"#), "{}", sql);
        assert!(!sql.contains(r#""is_approved" ="#), "{}", sql);
    }

    #[tokio::test]
    async fn test_own_questions_filter_by_uploader() {
        let repo = mock_repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<QuestionPaper>::new()]),
        );

        repo.questions_by_uploader("rafi@g.bracu.ac.bd").await.unwrap();

        let sql = &statements(repo)[0];
        assert!(sql.contains(r#""uploader_email" = 'rafi@g.bracu.ac.bd'"#), "{}", sql);
        assert!(sql.contains("ORDER BY"), "{}", sql);
    }
}
