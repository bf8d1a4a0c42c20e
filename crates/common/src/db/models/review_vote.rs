//! Review vote entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review_votes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub faculty_initial: String,

    pub review_created_at: DateTimeWithTimeZone,

    /// Always NULL for votes on replies
    #[sea_orm(column_type = "Text", nullable)]
    pub course_code: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub user_email: String,

    /// "upvote" or "downvote"
    #[sea_orm(column_type = "Text")]
    pub vote_type: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
