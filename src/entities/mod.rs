//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod pass;
pub mod payment;
pub mod rollover_checkpoint;
pub mod settings;
pub mod stage;
pub mod student;

// Re-export specific types to avoid conflicts
pub use pass::{Column as PassColumn, Entity as Pass, Model as PassModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use rollover_checkpoint::{
    Column as RolloverCheckpointColumn, Entity as RolloverCheckpoint,
    Model as RolloverCheckpointModel,
};
pub use settings::{Column as SettingsColumn, Entity as Settings, Model as SettingsModel};
pub use stage::{Column as StageColumn, Entity as Stage, Model as StageModel};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
