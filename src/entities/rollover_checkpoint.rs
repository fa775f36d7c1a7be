//! Rollover checkpoint entity - durable progress of one expiration cascade.
//!
//! Keyed by the year being expired. `last_student_id` is the cursor of the last
//! committed page; a cascade resumes strictly after it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rollover checkpoint database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rollover_checkpoints")]
pub struct Model {
    /// Academic year whose passes are being expired
    #[sea_orm(primary_key, auto_increment = false)]
    pub from_year: String,
    /// Year the rollover moved to, if the cascade was started by a rollover
    pub to_year: Option<String>,
    /// Student id of the last record in the last committed page
    pub last_student_id: Option<String>,
    /// Passes expired so far
    pub expired_count: i64,
    /// Passes left untouched because of an unrecognised status
    pub flagged_count: i64,
    /// Whether the cascade reached the end of the matching records
    pub completed: bool,
    /// When the checkpoint last advanced
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
