//! Database configuration module for the bus pass service.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`;
//! the one constraint the entities cannot express, the partial unique index that keeps at
//! most one live payment of each kind per student and year, is added as raw SQL.

use crate::entities::{Pass, Payment, RolloverCheckpoint, Settings, Stage, Student};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/buspass.sqlite?mode=rwc";

/// Name of the index guarding against concurrent duplicate payments
pub const LIVE_PAYMENT_INDEX: &str = "idx_payments_live_kind";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!(url = %database_url, "Connecting to database");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Parents are created before the tables that reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, Settings).await?;
    create_table(db, Stage).await?;
    create_table(db, Student).await?;
    create_table(db, Pass).await?;
    create_table(db, Payment).await?;
    create_table(db, RolloverCheckpoint).await?;

    db.execute_unprepared(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {LIVE_PAYMENT_INDEX} \
         ON payments (student_id, academic_year, payment_kind) \
         WHERE status IN ('pending', 'processing', 'success')"
    ))
    .await?;

    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_passes_year_student \
         ON passes (academic_year, student_id)",
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        pass::Model as PassModel, payment::Model as PaymentModel,
        rollover_checkpoint::Model as CheckpointModel, settings::Model as SettingsModel,
        stage::Model as StageModel, student::Model as StudentModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<SettingsModel> = Settings::find().limit(1).all(&db).await?;
        let _: Vec<StageModel> = Stage::find().limit(1).all(&db).await?;
        let _: Vec<StudentModel> = Student::find().limit(1).all(&db).await?;
        let _: Vec<PassModel> = Pass::find().limit(1).all(&db).await?;
        let _: Vec<PaymentModel> = Payment::find().limit(1).all(&db).await?;
        let _: Vec<CheckpointModel> = RolloverCheckpoint::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_twice() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
