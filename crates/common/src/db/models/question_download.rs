//! Question paper download ledger

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question_downloads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub question_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub user_email: String,

    pub downloaded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::question_paper::Entity",
        from = "Column::QuestionId",
        to = "super::question_paper::Column::Id",
        on_delete = "Cascade"
    )]
    QuestionPaper,
}

impl Related<super::question_paper::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestionPaper.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
