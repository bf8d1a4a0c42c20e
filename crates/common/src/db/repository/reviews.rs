//! Faculty, course and review data access

use super::{like_pattern, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::reviews::{
    build_threads, plan_vote, rating_summary, review_timestamp, sort_threads, RatingSummary,
    ReviewThread, SortOrder, VoteCounts, VoteKey, VoteType,
};
use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// A review or reply to insert
#[derive(Debug, Clone)]
pub struct NewReview {
    pub faculty_initial: String,
    pub course_code: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub user_name: String,
    pub user_email: String,
    /// Key of the root review a reply belongs to
    pub parent: Option<VoteKey>,
}

/// Validated edit of an existing review
#[derive(Debug, Clone)]
pub struct ReviewEdit {
    pub comment: String,
    pub rating: i32,
}

/// Everything the faculty page shows
#[derive(Debug, Clone, Serialize)]
pub struct FacultyPage {
    pub faculty: Faculty,
    pub courses: Vec<Course>,
    pub summary: RatingSummary,
    pub threads: Vec<ReviewThread>,
    /// The viewer's votes by review id
    pub my_votes: HashMap<Uuid, VoteType>,
}

/// Review after a vote toggle, with the voter's resulting vote
#[derive(Debug, Clone, Serialize)]
pub struct VoteOutcome {
    pub review: Review,
    pub my_vote: Option<VoteType>,
}

/// Rows of `review_votes` belonging to exactly this key
fn vote_key_condition(key: &VoteKey) -> Condition {
    let course = match &key.course_code {
        Some(code) => ReviewVoteColumn::CourseCode.eq(code.clone()),
        None => ReviewVoteColumn::CourseCode.is_null(),
    };
    Condition::all()
        .add(ReviewVoteColumn::FacultyInitial.eq(key.faculty_initial.clone()))
        .add(ReviewVoteColumn::ReviewCreatedAt.eq(key.created_at))
        .add(course)
}

fn review_not_found(id: Uuid) -> AppError {
    AppError::ReviewNotFound { id: id.to_string() }
}

impl Repository {
    // ========================================================================
    // Faculty and Course Operations
    // ========================================================================

    /// Active faculty, optionally filtered by initial or name
    pub async fn list_faculties(&self, search: Option<&str>) -> Result<Vec<Faculty>> {
        let mut query = FacultyEntity::find().filter(FacultyColumn::IsActive.eq(true));

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            query = query.filter(
                Condition::any()
                    .add(Expr::col(FacultyColumn::Initial).ilike(pattern.clone()))
                    .add(Expr::col(FacultyColumn::FullName).ilike(pattern)),
            );
        }

        query
            .order_by_asc(FacultyColumn::Initial)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find faculty by initial
    pub async fn find_faculty(&self, initial: &str) -> Result<Option<Faculty>> {
        FacultyEntity::find_by_id(initial.to_string())
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Courses a faculty teaches
    pub async fn faculty_courses(&self, initial: &str) -> Result<Vec<Course>> {
        let codes: Vec<String> = FacultyCourseEntity::find()
            .filter(FacultyCourseColumn::FacultyInitial.eq(initial))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|link| link.course_code)
            .collect();

        if codes.is_empty() {
            return Ok(Vec::new());
        }

        CourseEntity::find()
            .filter(CourseColumn::Code.is_in(codes))
            .order_by_asc(CourseColumn::Code)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Course catalog
    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        CourseEntity::find()
            .order_by_asc(CourseColumn::Code)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    /// All reviews and replies of a faculty, newest first
    pub async fn faculty_reviews(&self, initial: &str) -> Result<Vec<Review>> {
        ReviewEntity::find()
            .filter(ReviewColumn::FacultyInitial.eq(initial))
            .order_by_desc(ReviewColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Votes cast by `viewer` on a faculty's reviews
    async fn viewer_votes(&self, initial: &str, viewer: Option<&str>) -> Result<Vec<ReviewVote>> {
        let Some(email) = viewer else {
            return Ok(Vec::new());
        };

        ReviewVoteEntity::find()
            .filter(ReviewVoteColumn::FacultyInitial.eq(initial))
            .filter(ReviewVoteColumn::UserEmail.eq(email))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Load a faculty with courses, threaded reviews and the viewer's votes
    pub async fn faculty_page(
        &self,
        initial: &str,
        viewer: Option<&str>,
        order: SortOrder,
    ) -> Result<FacultyPage> {
        let (faculty, courses, reviews, votes) = futures::try_join!(
            self.find_faculty(initial),
            self.faculty_courses(initial),
            self.faculty_reviews(initial),
            self.viewer_votes(initial, viewer),
        )?;

        let faculty = faculty.ok_or_else(|| AppError::FacultyNotFound {
            initial: initial.to_string(),
        })?;

        let by_key: HashMap<VoteKey, VoteType> = votes
            .into_iter()
            .filter_map(|vote| {
                let vote_type = vote.vote_type.parse().ok()?;
                let key = VoteKey {
                    faculty_initial: vote.faculty_initial,
                    created_at: vote.review_created_at,
                    course_code: vote.course_code,
                };
                Some((key, vote_type))
            })
            .collect();

        let my_votes = reviews
            .iter()
            .filter_map(|review| {
                by_key
                    .get(&VoteKey::for_review(review))
                    .map(|vote| (review.id, *vote))
            })
            .collect();

        let mut threads = build_threads(reviews);
        sort_threads(&mut threads, order);
        let summary = rating_summary(&threads);

        Ok(FacultyPage {
            faculty,
            courses,
            summary,
            threads,
            my_votes,
        })
    }

    /// Find review by ID
    pub async fn find_review(&self, id: Uuid) -> Result<Option<Review>> {
        ReviewEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a review by its faculty and creation time
    pub async fn find_review_by_key(
        &self,
        faculty_initial: &str,
        created_at: chrono::DateTime<Utc>,
    ) -> Result<Option<Review>> {
        ReviewEntity::find()
            .filter(ReviewColumn::FacultyInitial.eq(faculty_initial))
            .filter(ReviewColumn::CreatedAt.eq(created_at))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Insert a root review or a reply
    pub async fn create_review(&self, review: NewReview) -> Result<Review> {
        let now = review_timestamp(Utc::now());
        let is_reply = review.parent.is_some();

        let (parent_faculty, parent_created_at, parent_course) = match review.parent {
            Some(parent) => (
                Some(parent.faculty_initial),
                Some(parent.created_at),
                parent.course_code,
            ),
            None => (None, None, None),
        };

        let model = ReviewActiveModel {
            id: Set(Uuid::new_v4()),
            faculty_initial: Set(review.faculty_initial),
            course_code: Set(if is_reply { None } else { review.course_code }),
            rating: Set(if is_reply { 0 } else { review.rating }),
            comment: Set(review.comment),
            upvotes: Set(0),
            downvotes: Set(0),
            user_name: Set(review.user_name),
            user_email: Set(review.user_email),
            parent_faculty_initial: Set(parent_faculty),
            parent_created_at: Set(parent_created_at),
            parent_course_code: Set(parent_course),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = model.insert(self.write_conn()).await?;
        metrics::record_review(is_reply);
        debug!(review_id = %created.id, is_reply, "Review created");
        Ok(created)
    }

    /// Update comment and rating in place
    pub async fn update_review(&self, review: Review, edit: ReviewEdit) -> Result<Review> {
        let mut model: ReviewActiveModel = review.into();
        model.comment = Set(edit.comment);
        model.rating = Set(edit.rating);
        model.updated_at = Set(Utc::now().into());

        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a review and the votes on its exact vote key
    pub async fn delete_review(&self, review: &Review) -> Result<u64> {
        let key = VoteKey::for_review(review);
        let txn = self.write_conn().begin().await?;

        let votes = ReviewVoteEntity::delete_many()
            .filter(vote_key_condition(&key))
            .exec(&txn)
            .await?;

        let deleted = ReviewEntity::delete_by_id(review.id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            review_id = %review.id,
            votes_removed = votes.rows_affected,
            "Review deleted"
        );
        Ok(deleted.rows_affected)
    }

    // ========================================================================
    // Vote Operations
    // ========================================================================

    /// Cast, retract or switch `voter`'s vote on a review.
    ///
    /// The review row is locked for the duration so concurrent toggles
    /// serialize and counters stay consistent with the vote rows.
    pub async fn apply_vote(
        &self,
        review_id: Uuid,
        voter: &str,
        requested: VoteType,
    ) -> Result<VoteOutcome> {
        let txn = self.write_conn().begin().await?;

        let review = ReviewEntity::find_by_id(review_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| review_not_found(review_id))?;

        let key = VoteKey::for_review(&review);
        let existing = ReviewVoteEntity::find()
            .filter(vote_key_condition(&key))
            .filter(ReviewVoteColumn::UserEmail.eq(voter))
            .one(&txn)
            .await?;

        let transition = plan_vote(
            existing.as_ref().and_then(|v| v.vote_type.parse().ok()),
            requested,
        );

        if let Some(row) = existing {
            ReviewVoteEntity::delete_by_id(row.id).exec(&txn).await?;
        }

        if let Some(vote) = transition.resulting_vote() {
            ReviewVoteActiveModel {
                id: Set(Uuid::new_v4()),
                faculty_initial: Set(key.faculty_initial.clone()),
                review_created_at: Set(key.created_at),
                course_code: Set(key.course_code.clone()),
                user_email: Set(voter.to_string()),
                vote_type: Set(vote.as_str().to_string()),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
        }

        let counts = VoteCounts::of(&review).apply(transition);
        let mut model: ReviewActiveModel = review.into();
        model.upvotes = Set(counts.upvotes);
        model.downvotes = Set(counts.downvotes);
        let updated = model.update(&txn).await?;

        txn.commit().await?;

        metrics::record_vote(transition.kind(), requested.as_str());
        debug!(
            review_id = %review_id,
            transition = transition.kind(),
            upvotes = counts.upvotes,
            downvotes = counts.downvotes,
            "Vote applied"
        );

        Ok(VoteOutcome {
            review: updated,
            my_vote: transition.resulting_vote(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::tests::mock_repo;
    use crate::reviews::thread::tests::{reply_to, root};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};

    fn vote_row(key: &VoteKey, voter: &str, vote: VoteType) -> ReviewVote {
        ReviewVote {
            id: Uuid::new_v4(),
            faculty_initial: key.faculty_initial.clone(),
            review_created_at: key.created_at,
            course_code: key.course_code.clone(),
            user_email: voter.to_string(),
            vote_type: vote.as_str().to_string(),
            created_at: key.created_at,
        }
    }

    fn executed(repo: Repository) -> Vec<String> {
        repo.pool
            .primary
            .into_transaction_log()
            .iter()
            .flat_map(|txn| txn.statements().iter().map(|s| s.to_string()))
            .collect()
    }

    fn key_sql(key: &VoteKey) -> String {
        ReviewVoteEntity::find()
            .filter(vote_key_condition(key))
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_reply_key_matches_null_course() {
        let reply = reply_to(&root("Alice", 0, Some("CSE110")), "Bob", 1);
        let sql = key_sql(&VoteKey::for_review(&reply));

        assert!(sql.contains(r#""course_code" IS NULL"#), "{}", sql);
        assert!(!sql.contains("CSE110"), "{}", sql);
        assert!(sql.contains(r#""faculty_initial" = 'ABC'"#), "{}", sql);
    }

    #[test]
    fn test_root_key_matches_its_course() {
        let sql = key_sql(&VoteKey::for_review(&root("Alice", 0, Some("CSE110"))));
        assert!(sql.contains(r#""course_code" = 'CSE110'"#), "{}", sql);
        assert!(!sql.contains("IS NULL"), "{}", sql);

        let sql = key_sql(&VoteKey::for_review(&root("Alice", 0, None)));
        assert!(sql.contains(r#""course_code" IS NULL"#), "{}", sql);
    }

    #[tokio::test]
    async fn test_delete_reply_removes_votes_under_null_course() {
        let reply = reply_to(&root("Alice", 0, Some("CSE110")), "Bob", 1);
        let repo = mock_repo(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ]));

        assert_eq!(repo.delete_review(&reply).await.unwrap(), 1);

        let statements = executed(repo);
        let votes = statements
            .iter()
            .find(|s| s.starts_with(r#"DELETE FROM "review_votes""#))
            .unwrap();
        assert!(votes.contains(r#""course_code" IS NULL"#), "{}", votes);
        assert!(!votes.contains("CSE110"), "{}", votes);
        assert!(statements
            .iter()
            .any(|s| s.starts_with(r#"DELETE FROM "reviews""#) && s.contains(&reply.id.to_string())));
    }

    #[tokio::test]
    async fn test_switching_vote_moves_one_count() {
        let mut review = root("Alice", 0, Some("CSE110"));
        review.upvotes = 3;
        review.downvotes = 1;
        let key = VoteKey::for_review(&review);
        let mut updated = review.clone();
        updated.upvotes = 2;
        updated.downvotes = 2;

        let repo = mock_repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![review.clone()]])
                .append_query_results([vec![vote_row(&key, "bob@g.bracu.ac.bd", VoteType::Upvote)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([vec![vote_row(&key, "bob@g.bracu.ac.bd", VoteType::Downvote)]])
                .append_query_results([vec![updated]]),
        );

        let outcome = repo
            .apply_vote(review.id, "bob@g.bracu.ac.bd", VoteType::Downvote)
            .await
            .unwrap();
        assert_eq!(outcome.my_vote, Some(VoteType::Downvote));

        let statements = executed(repo);
        assert!(statements
            .iter()
            .any(|s| s.starts_with(r#"SELECT"#) && s.contains("FOR UPDATE")));
        let lookup = statements
            .iter()
            .find(|s| s.contains(r#"FROM "review_votes""#) && s.starts_with("SELECT"))
            .unwrap();
        assert!(lookup.contains(r#""course_code" = 'CSE110'"#), "{}", lookup);

        let insert = statements
            .iter()
            .find(|s| s.starts_with(r#"INSERT INTO "review_votes""#))
            .unwrap();
        assert!(insert.contains("'downvote'"), "{}", insert);

        let update = statements
            .iter()
            .find(|s| s.starts_with(r#"UPDATE "reviews""#))
            .unwrap();
        assert!(update.contains(r#""upvotes" = 2"#), "{}", update);
        assert!(update.contains(r#""downvotes" = 2"#), "{}", update);
    }

    #[tokio::test]
    async fn test_repeating_vote_retracts_it() {
        let parent = root("Alice", 0, None);
        let mut reply = reply_to(&parent, "Bob", 1);
        reply.upvotes = 1;
        let key = VoteKey::for_review(&reply);
        let mut updated = reply.clone();
        updated.upvotes = 0;

        let repo = mock_repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![reply.clone()]])
                .append_query_results([vec![vote_row(&key, "carol@g.bracu.ac.bd", VoteType::Upvote)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([vec![updated]]),
        );

        let outcome = repo
            .apply_vote(reply.id, "carol@g.bracu.ac.bd", VoteType::Upvote)
            .await
            .unwrap();
        assert_eq!(outcome.my_vote, None);
        assert_eq!(outcome.review.upvotes, 0);

        let statements = executed(repo);
        assert!(statements.iter().any(|s| s.starts_with(r#"DELETE FROM "review_votes""#)));
        assert!(!statements.iter().any(|s| s.starts_with("INSERT")));
        let update = statements
            .iter()
            .find(|s| s.starts_with(r#"UPDATE "reviews""#))
            .unwrap();
        assert!(update.contains(r#""upvotes" = 0"#), "{}", update);
        assert!(update.contains(r#""downvotes" = 0"#), "{}", update);
    }
}
