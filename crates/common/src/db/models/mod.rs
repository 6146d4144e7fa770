//! SeaORM entity models
//!
//! Nested documents (guides, assessments, answers, evaluations) live in
//! JSONB columns.

mod study_material;
mod test_result;

pub use study_material::{
    ActiveModel as StudyMaterialActiveModel, Column as StudyMaterialColumn,
    Entity as StudyMaterialEntity, Model as StudyMaterialRow,
};

pub use test::{
    ActiveModel as TestActiveModel, Column as TestColumn, Entity as TestEntity,
    Model as TestRow,
};

pub use test_result::{
    ActiveModel as TestResultActiveModel, Column as TestResultColumn,
    Entity as TestResultEntity, Model as TestResultRow,
};
