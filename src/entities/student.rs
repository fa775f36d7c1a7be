//! Student entity - the slice of the student profile this service reads and writes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Student identifier (roll number or auth uid)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Assigned bus
    pub bus_number: String,
    /// Fare stage name
    pub stage: String,
    /// Denormalised payment status for admin listings, e.g. `"2025-2026: NO DUE"`
    pub payment_summary: Option<String>,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One student has at most one pass
    #[sea_orm(has_one = "super::pass::Entity")]
    Pass,
    /// One student has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::pass::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pass.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
