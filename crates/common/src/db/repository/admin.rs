//! Admin accounts and sessions, student sessions, contact messages,
//! dashboard statistics and catalog management

use super::moderation::report_status;
use super::Repository;
use crate::auth::Identity;
use crate::contact::{status as contact_status, status_after_read, ContactForm};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Counts shown on the admin dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub pending_reports: u64,
    pub pending_contacts: u64,
    pub courses: u64,
    pub faculties: u64,
    pub active_bans: u64,
}

/// Faculty fields an admin can set
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FacultyInput {
    #[validate(length(min = 1, max = 10, message = "Initial must be 1-10 characters"))]
    pub initial: String,

    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub full_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub desk: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,

    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Course fields an admin can set
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CourseInput {
    #[validate(length(min = 1, max = 20, message = "Course code must be 1-20 characters"))]
    pub code: String,

    #[validate(length(min = 1, max = 200, message = "Course name is required"))]
    pub name: String,

    #[validate(range(min = 0, max = 12))]
    pub credits: Option<i32>,

    pub department: Option<String>,
}

fn default_true() -> bool {
    true
}

fn not_found(resource_type: &str, id: &str) -> AppError {
    AppError::NotFound {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    }
}

impl Repository {
    // ========================================================================
    // Admin Account Operations
    // ========================================================================

    /// Active admin by username
    pub async fn find_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        AdminUserEntity::find()
            .filter(AdminUserColumn::Username.eq(username))
            .filter(AdminUserColumn::IsActive.eq(true))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Create the admin account if no account with that username exists
    pub async fn ensure_admin_user(&self, username: &str, password_hash: String) -> Result<bool> {
        let exists = AdminUserEntity::find()
            .filter(AdminUserColumn::Username.eq(username))
            .count(self.write_conn())
            .await?
            > 0;
        if exists {
            return Ok(false);
        }

        AdminUserActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            is_active: Set(true),
            last_login: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.write_conn())
        .await?;

        info!(username, "Admin account created");
        Ok(true)
    }

    /// Store a new admin session and stamp the login time
    pub async fn create_admin_session(
        &self,
        admin: &AdminUser,
        token_hash: String,
        ttl: Duration,
    ) -> Result<AdminSession> {
        let now = Utc::now();
        let txn = self.write_conn().begin().await?;

        let session = AdminSessionActiveModel {
            id: Set(Uuid::new_v4()),
            admin_id: Set(admin.id),
            token_hash: Set(token_hash),
            expires_at: Set((now + ttl).into()),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let mut model: AdminUserActiveModel = admin.clone().into();
        model.last_login = Set(Some(now.into()));
        model.update(&txn).await?;

        txn.commit().await?;
        Ok(session)
    }

    /// Unexpired session for an active admin
    pub async fn find_admin_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<(AdminSession, AdminUser)>> {
        let found = AdminSessionEntity::find()
            .filter(AdminSessionColumn::TokenHash.eq(token_hash))
            .filter(AdminSessionColumn::ExpiresAt.gt(Utc::now()))
            .find_also_related(AdminUserEntity)
            .one(self.read_conn())
            .await?;

        Ok(match found {
            Some((session, Some(admin))) if admin.is_active => Some((session, admin)),
            _ => None,
        })
    }

    /// Delete an admin session (logout)
    pub async fn delete_admin_session(&self, session_id: Uuid) -> Result<bool> {
        let result = AdminSessionEntity::delete_by_id(session_id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Drop expired admin sessions
    pub async fn purge_expired_admin_sessions(&self) -> Result<u64> {
        let result = AdminSessionEntity::delete_many()
            .filter(AdminSessionColumn::ExpiresAt.lte(Utc::now()))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected)
    }

    // ========================================================================
    // Student Session Operations
    // ========================================================================

    /// Insert or refresh a student's profile on sign-in
    pub async fn upsert_user_session(&self, identity: &Identity) -> Result<()> {
        let now = Utc::now();

        let model = UserSessionActiveModel {
            email: Set(identity.email.clone()),
            name: Set(identity.name.clone()),
            picture: Set(identity.picture.clone()),
            last_sign_in_at: Set(now.into()),
            created_at: Set(now.into()),
        };

        UserSessionEntity::insert(model)
            .on_conflict(
                OnConflict::column(UserSessionColumn::Email)
                    .update_columns([
                        UserSessionColumn::Name,
                        UserSessionColumn::Picture,
                        UserSessionColumn::LastSignInAt,
                    ])
                    .to_owned(),
            )
            .exec(self.write_conn())
            .await?;

        Ok(())
    }

    // ========================================================================
    // Contact Operations
    // ========================================================================

    /// Store a sanitized contact message
    pub async fn create_contact(&self, form: &ContactForm) -> Result<ContactSubmission> {
        let now = Utc::now();

        let model = ContactSubmissionActiveModel {
            id: Set(Uuid::new_v4()),
            student_name: Set(form.student_name.clone()),
            student_email: Set(form.student_email.clone()),
            student_id: Set(form.student_id.clone()),
            subject: Set(form.subject.clone()),
            message_type: Set(form.message_type.clone()),
            message: Set(form.message.clone()),
            status: Set(contact_status::PENDING.to_string()),
            priority: Set(form.priority.clone()),
            admin_reply: Set(None),
            replied_at: Set(None),
            replied_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Contact messages, newest first, optionally by status
    pub async fn list_contacts(&self, status: Option<&str>) -> Result<Vec<ContactSubmission>> {
        let mut query = ContactSubmissionEntity::find();
        if let Some(status) = status {
            query = query.filter(ContactSubmissionColumn::Status.eq(status));
        }

        query
            .order_by_desc(ContactSubmissionColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn contact_or_not_found(&self, id: Uuid) -> Result<ContactSubmission> {
        ContactSubmissionEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| not_found("contact_submission", &id.to_string()))
    }

    /// Record an admin reply
    pub async fn reply_contact(
        &self,
        id: Uuid,
        reply: String,
        replied_by: &str,
    ) -> Result<ContactSubmission> {
        let now = Utc::now();
        let contact = self.contact_or_not_found(id).await?;

        let mut model: ContactSubmissionActiveModel = contact.into();
        model.admin_reply = Set(Some(reply));
        model.replied_at = Set(Some(now.into()));
        model.replied_by = Set(Some(replied_by.to_string()));
        model.status = Set(contact_status::REPLIED.to_string());
        model.updated_at = Set(now.into());

        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Mark a pending contact message read; any other status is kept
    pub async fn mark_contact_read(&self, id: Uuid) -> Result<ContactSubmission> {
        let contact = self.contact_or_not_found(id).await?;
        let Some(next) = status_after_read(&contact.status) else {
            return Ok(contact);
        };

        let mut model: ContactSubmissionActiveModel = contact.into();
        model.status = Set(next.to_string());
        model.updated_at = Set(Utc::now().into());

        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Mark a contact message resolved
    pub async fn resolve_contact(&self, id: Uuid) -> Result<ContactSubmission> {
        let contact = self.contact_or_not_found(id).await?;

        let mut model: ContactSubmissionActiveModel = contact.into();
        model.status = Set(contact_status::RESOLVED.to_string());
        model.updated_at = Set(Utc::now().into());

        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete contact message by ID
    pub async fn delete_contact(&self, id: Uuid) -> Result<bool> {
        let result = ContactSubmissionEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Dashboard
    // ========================================================================

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let conn = self.read_conn();

        let (pending_reports, pending_contacts, courses, faculties, active_bans) = futures::try_join!(
            ReportedContentEntity::find()
                .filter(ReportedContentColumn::Status.eq(report_status::PENDING))
                .count(conn),
            ContactSubmissionEntity::find()
                .filter(ContactSubmissionColumn::Status.eq(contact_status::PENDING))
                .count(conn),
            CourseEntity::find().count(conn),
            FacultyEntity::find().count(conn),
            BannedUserEntity::find()
                .filter(BannedUserColumn::IsActive.eq(true))
                .count(conn),
        )?;

        Ok(DashboardStats {
            pending_reports,
            pending_contacts,
            courses,
            faculties,
            active_bans,
        })
    }

    // ========================================================================
    // Catalog Management
    // ========================================================================

    /// Add a faculty member
    pub async fn create_faculty(&self, input: FacultyInput) -> Result<Faculty> {
        input.validate()?;
        let initial = input.initial.trim().to_uppercase();
        if self.find_faculty(&initial).await?.is_some() {
            return Err(AppError::Duplicate {
                message: format!("Faculty {} already exists", initial),
            });
        }

        let now = Utc::now();
        FacultyActiveModel {
            initial: Set(initial),
            full_name: Set(input.full_name.trim().to_string()),
            email: Set(input.email),
            desk: Set(input.desk),
            department: Set(input.department),
            designation: Set(input.designation),
            is_active: Set(input.is_active),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Update a faculty member; the initial is the key and does not change
    pub async fn update_faculty(&self, initial: &str, input: FacultyInput) -> Result<Faculty> {
        input.validate()?;
        let faculty = self
            .find_faculty(initial)
            .await?
            .ok_or_else(|| AppError::FacultyNotFound {
                initial: initial.to_string(),
            })?;

        let mut model: FacultyActiveModel = faculty.into();
        model.full_name = Set(input.full_name.trim().to_string());
        model.email = Set(input.email);
        model.desk = Set(input.desk);
        model.department = Set(input.department);
        model.designation = Set(input.designation);
        model.is_active = Set(input.is_active);
        model.updated_at = Set(Utc::now().into());

        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a faculty member; course links cascade
    pub async fn delete_faculty(&self, initial: &str) -> Result<bool> {
        let result = FacultyEntity::delete_by_id(initial.to_string())
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Add a course
    pub async fn create_course(&self, input: CourseInput) -> Result<Course> {
        input.validate()?;
        let code = input.code.trim().to_uppercase();
        let exists = CourseEntity::find_by_id(code.clone())
            .one(self.read_conn())
            .await?
            .is_some();
        if exists {
            return Err(AppError::Duplicate {
                message: format!("Course {} already exists", code),
            });
        }

        CourseActiveModel {
            code: Set(code),
            name: Set(input.name.trim().to_string()),
            credits: Set(input.credits),
            department: Set(input.department),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.write_conn())
        .await
        .map_err(Into::into)
    }

    /// Update a course; the code is the key and does not change
    pub async fn update_course(&self, code: &str, input: CourseInput) -> Result<Course> {
        input.validate()?;
        let course = CourseEntity::find_by_id(code.to_string())
            .one(self.write_conn())
            .await?
            .ok_or_else(|| not_found("course", code))?;

        let mut model: CourseActiveModel = course.into();
        model.name = Set(input.name.trim().to_string());
        model.credits = Set(input.credits);
        model.department = Set(input.department);

        model.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a course; faculty links cascade
    pub async fn delete_course(&self, code: &str) -> Result<bool> {
        let result = CourseEntity::delete_by_id(code.to_string())
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Replace the set of courses a faculty teaches
    pub async fn assign_courses(&self, initial: &str, course_codes: Vec<String>) -> Result<Vec<Course>> {
        if self.find_faculty(initial).await?.is_none() {
            return Err(AppError::FacultyNotFound {
                initial: initial.to_string(),
            });
        }

        let mut codes: Vec<String> = course_codes
            .into_iter()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        codes.sort();
        codes.dedup();

        let txn = self.write_conn().begin().await?;

        FacultyCourseEntity::delete_many()
            .filter(FacultyCourseColumn::FacultyInitial.eq(initial))
            .exec(&txn)
            .await?;

        if !codes.is_empty() {
            let now = Utc::now();
            let links = codes.iter().map(|code| FacultyCourseActiveModel {
                faculty_initial: Set(initial.to_string()),
                course_code: Set(code.clone()),
                created_at: Set(now.into()),
            });
            FacultyCourseEntity::insert_many(links).exec(&txn).await?;
        }

        txn.commit().await?;
        info!(faculty = initial, courses = codes.len(), "Faculty courses assigned");

        self.faculty_courses(initial).await
    }
}
