//! Suggestion feed comment

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suggestion_comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub post_id: Uuid,

    /// Top-level comment this one answers
    pub parent_comment_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text")]
    pub author_name: String,

    #[sea_orm(column_type = "Text")]
    pub author_email: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suggestion_post::Entity",
        from = "Column::PostId",
        to = "super::suggestion_post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::suggestion_post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
