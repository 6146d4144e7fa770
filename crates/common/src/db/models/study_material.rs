//! Study material entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "study_materials")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub user_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// text | url | file | outline
    #[sea_orm(column_type = "Text")]
    pub source_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub source_url: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub extracted_text: String,

    pub upload_date: DateTimeWithTimeZone,

    /// Latest generated guide as JSONB
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub study_guide: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test::Entity")]
    Tests,

    #[sea_orm(has_many = "super::test_result::Entity")]
    Results,
}

impl Related<super::test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tests.def()
    }
}

impl Related<super::test_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Results.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
