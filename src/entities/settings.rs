//! Settings entity - the singleton row holding the current academic year.
//!
//! Exactly one row exists once the first rollover has run, always with id
//! [`SETTINGS_ID`]. Only the rollover service writes it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Primary key of the one settings row
pub const SETTINGS_ID: i32 = 1;

/// Settings database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Always [`SETTINGS_ID`]
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    /// Normalised `YYYY-YYYY` year currently in force
    pub current_academic_year: Option<String>,
    /// Year that was current before the last rollover
    pub previous_academic_year: Option<String>,
    /// Incremented on every write
    pub version: i64,
    /// When the row was last written
    pub updated_at: DateTimeUtc,
    /// Administrator id that performed the last write
    pub updated_by: String,
}

/// Settings has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
