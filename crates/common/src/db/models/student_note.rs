//! Student note entity (uploaded archive or shared link)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub course_code: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    pub is_link: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub file_name: Option<String>,

    /// Object path inside the notes bucket
    #[sea_orm(column_type = "Text", nullable)]
    pub file_path: Option<String>,

    pub file_size: Option<i64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub file_type: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub link_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub link_type: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub uploader_email: String,

    #[sea_orm(column_type = "Text")]
    pub uploader_name: String,

    pub download_count: i32,

    pub is_approved: bool,

    pub is_reported: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
