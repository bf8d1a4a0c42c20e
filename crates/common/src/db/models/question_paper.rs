//! Question paper entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question_papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub course_code: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub course_title: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub semester: String,

    pub year: i32,

    /// midterm | final | quiz | assignment
    #[sea_orm(column_type = "Text")]
    pub exam_type: String,

    #[sea_orm(column_type = "Text")]
    pub file_name: String,

    #[sea_orm(column_type = "Text")]
    pub file_path: String,

    pub file_size: i64,

    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    #[sea_orm(column_type = "Text")]
    pub uploader_email: String,

    #[sea_orm(column_type = "Text")]
    pub uploader_name: String,

    pub download_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question_download::Entity", on_delete = "Cascade")]
    Downloads,
}

impl Related<super::question_download::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Downloads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
