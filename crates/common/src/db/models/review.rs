//! Review entity
//!
//! Root reviews and replies share one table. A row with a parent pointer
//! (`parent_faculty_initial` + `parent_created_at`) is a reply to the root
//! review with that faculty, timestamp and course code.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub faculty_initial: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub course_code: Option<String>,

    /// 1-5 for root reviews, 0 for replies
    pub rating: i32,

    #[sea_orm(column_type = "Text")]
    pub comment: String,

    pub upvotes: i32,

    pub downvotes: i32,

    #[sea_orm(column_type = "Text")]
    pub user_name: String,

    #[sea_orm(column_type = "Text")]
    pub user_email: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub parent_faculty_initial: Option<String>,

    pub parent_created_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub parent_course_code: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Replies carry both parent faculty and parent timestamp
    pub fn is_reply(&self) -> bool {
        self.parent_faculty_initial.is_some() && self.parent_created_at.is_some()
    }

    /// Upvotes minus downvotes
    pub fn net_votes(&self) -> i32 {
        self.upvotes - self.downvotes
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
