//! Content report entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reported_content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub content_type: String,

    #[sea_orm(column_type = "Text")]
    pub content_id: String,

    #[sea_orm(column_type = "Text")]
    pub content_table: String,

    #[sea_orm(column_type = "Text")]
    pub reason: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub reporter_email: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub reporter_name: String,

    /// Copy of the reported content taken when the report was filed
    #[sea_orm(column_type = "JsonBinary")]
    pub content_snapshot: Json,

    /// pending | resolved
    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// critical | high | medium
    #[sea_orm(column_type = "Text")]
    pub priority: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub admin_action: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
