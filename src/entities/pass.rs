//! Pass entity - one bus pass per student.
//!
//! `status` is the lifecycle axis (`active` / `expired`) and `pass_status` the
//! payment-completeness axis (`DUE` / `NO DUE`). Both are stored as text; the typed
//! views live in [`crate::core::types`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Pass database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "passes")]
pub struct Model {
    /// Student this pass belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: String,
    /// Opaque bearer credential embedded in the verification URL
    pub pass_token: String,
    /// Lifecycle state: `"active"` or `"expired"`
    pub status: String,
    /// Payment completeness: `"DUE"` or `"NO DUE"`
    pub pass_status: String,
    /// Remaining amount owed while `pass_status` is `DUE`
    pub due_amount: f64,
    /// Academic year the pass was issued for
    pub academic_year: String,
    /// Assigned bus, informational
    pub bus_number: String,
    /// Fare stage name
    pub stage: String,
    /// Amount of the most recent successful payment
    pub last_payment_amount: f64,
    /// When the most recent successful payment settled
    pub last_payment_date: DateTimeUtc,
    /// When the current token was issued
    pub issued_at: DateTimeUtc,
    /// Set by the rollover cascade
    pub expired_at: Option<DateTimeUtc>,
    /// `"yearChange"` when expired by the rollover cascade
    pub expired_reason: Option<String>,
    /// Academic year the cascade expired this pass from
    pub expired_from_academic_year: Option<String>,
}

/// Defines relationships between Pass and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each pass belongs to one student
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
