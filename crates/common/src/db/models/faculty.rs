//! Faculty entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "faculties")]
pub struct Model {
    /// Short faculty initial, e.g. "ABC"
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub initial: String,

    #[sea_orm(column_type = "Text")]
    pub full_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub desk: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub department: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub designation: Option<String>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
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
