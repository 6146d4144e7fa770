//! Test result entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "test_results")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub test_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub user_id: String,

    pub study_material_id: Uuid,

    pub score: i32,

    pub completion_date: DateTimeWithTimeZone,

    #[sea_orm(column_type = "Text")]
    pub performance_summary: String,

    #[sea_orm(column_type = "Text")]
    pub recommendations: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub evaluation: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::test::Entity",
        from = "Column::TestId",
        to = "super::test::Column::Id"
    )]
    Test,

    #[sea_orm(
        belongs_to = "super::study_material::Entity",
        from = "Column::StudyMaterialId",
        to = "super::study_material::Column::Id"
    )]
    StudyMaterial,
}

impl Related<super::test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Test.def()
    }
}

impl Related<super::study_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StudyMaterial.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
