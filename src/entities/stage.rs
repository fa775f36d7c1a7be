//! Stage entity - a fare zone with its full fee and two installment amounts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stage database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stages")]
pub struct Model {
    /// Unique identifier for the stage
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Stage name as shown on the pass
    #[sea_orm(unique)]
    pub name: String,
    /// Fee when paid in one go
    pub full_fee: f64,
    /// First semester installment
    pub installment1: f64,
    /// Second semester installment
    pub installment2: f64,
    /// When the stage was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
