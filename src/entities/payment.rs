//! Payment entity - append-only record of every payment attempt.
//!
//! Rows move pending → processing → success/failed and are never changed again once
//! terminal. `payment_kind` folds mode and installment into one column so the store can
//! enforce at most one live payment of each kind per student and year.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student who is paying
    pub student_id: String,
    /// Academic year the payment counts towards
    pub academic_year: String,
    /// `"TOTAL"` or `"INSTALLMENT"`
    pub payment_mode: String,
    /// `"FIRST_SEM"` / `"SECOND_SEM"` for installment payments
    pub installment_type: Option<String>,
    /// `"TOTAL"`, `"FIRST_SEM"` or `"SECOND_SEM"`
    pub payment_kind: String,
    /// Amount charged
    pub amount: f64,
    /// Pass status the payment leaves behind, fixed when the payment is created
    pub resulting_pass_status: String,
    /// Amount still owed once the payment succeeds, fixed when the payment is created
    pub due_amount: f64,
    /// `"pending"`, `"processing"`, `"success"` or `"failed"`
    pub status: String,
    /// `"online"` for self-service, `"manual"` for cash recorded by an admin
    pub channel: String,
    /// Administrator who recorded a manual payment
    pub recorded_by: Option<String>,
    /// When the payment was created
    pub created_at: DateTimeUtc,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
