//! Course entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub code: String,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    pub credits: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub department: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::faculty_course::Entity")]
    FacultyCourses,
}

impl Related<super::faculty_course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FacultyCourses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
