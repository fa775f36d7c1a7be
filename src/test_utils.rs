//! Shared test utilities for the bus pass service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        academic_year::AcademicYear,
        pass::generate_pass_token,
        settings,
        stage::{self, StageFees},
        student,
        types::{PaymentKind, PaymentStatus},
    },
    entities::{self, pass, payment},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, IntoActiveModel};

/// Stage every test student is registered on
pub const TEST_STAGE: &str = "Ameerpet";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Fees used for [`TEST_STAGE`]: 7600 in full, or 1600 + 6000 in installments.
#[must_use]
pub const fn test_fees() -> StageFees {
    StageFees {
        full_fee: 7600.0,
        installment1: 1600.0,
        installment2: 6000.0,
    }
}

/// Creates [`TEST_STAGE`] with [`test_fees`].
pub async fn create_test_stage(db: &DatabaseConnection) -> Result<entities::stage::Model> {
    stage::create_stage(db, TEST_STAGE.to_string(), test_fees()).await
}

/// Registers a student on [`TEST_STAGE`].
///
/// # Defaults
/// * name: "Test Student"
/// * `bus_number`: "12"
pub async fn create_test_student(
    db: &DatabaseConnection,
    student_id: &str,
) -> Result<entities::student::Model> {
    student::register_student(
        db,
        student_id.to_string(),
        "Test Student".to_string(),
        "12".to_string(),
        TEST_STAGE.to_string(),
    )
    .await
}

/// Fresh database with the test stage and one registered student.
pub async fn setup_with_student(
    student_id: &str,
) -> Result<(DatabaseConnection, entities::student::Model)> {
    let db = setup_test_db().await?;
    create_test_stage(&db).await?;
    let student = create_test_student(&db, student_id).await?;
    Ok((db, student))
}

/// Like [`setup_with_student`], with `year` already set as the current academic year.
pub async fn setup_with_current_year(
    student_id: &str,
    year: &str,
) -> Result<(DatabaseConnection, entities::student::Model)> {
    let (db, student) = setup_with_student(student_id).await?;
    set_test_current_year(&db, year).await?;
    Ok((db, student))
}

/// Writes the current academic year directly, without running any cascade.
pub async fn set_test_current_year(db: &DatabaseConnection, year: &str) -> Result<()> {
    let year = AcademicYear::parse(year)?;
    let previous = settings::get_current_academic_year(db).await?;
    settings::write_academic_year(db, &year, previous, "test-admin").await?;
    Ok(())
}

/// Builds an unsaved payment row, for feeding the guard directly.
#[must_use]
pub fn payment_record(year: &str, kind: PaymentKind, status: PaymentStatus) -> payment::Model {
    let now = Utc::now();
    payment::Model {
        id: 0,
        student_id: "21CS001".to_string(),
        academic_year: year.to_string(),
        payment_mode: kind.mode().as_str().to_string(),
        installment_type: kind.installment().map(|i| i.as_str().to_string()),
        payment_kind: kind.as_str().to_string(),
        amount: 0.0,
        resulting_pass_status: "NO DUE".to_string(),
        due_amount: 0.0,
        status: status.as_str().to_string(),
        channel: "online".to_string(),
        recorded_by: None,
        created_at: now,
        updated_at: now,
    }
}

/// Builds an unsaved, fully paid pass with a fresh token.
#[must_use]
pub fn pass_record(student_id: &str, year: &str, status: &str) -> pass::Model {
    let now = Utc::now();
    pass::Model {
        student_id: student_id.to_string(),
        pass_token: generate_pass_token(),
        status: status.to_string(),
        pass_status: "NO DUE".to_string(),
        due_amount: 0.0,
        academic_year: year.to_string(),
        bus_number: "12".to_string(),
        stage: TEST_STAGE.to_string(),
        last_payment_amount: test_fees().full_fee,
        last_payment_date: now,
        issued_at: now,
        expired_at: None,
        expired_reason: None,
        expired_from_academic_year: None,
    }
}

/// Stores a [`pass_record`]. The student must already exist.
pub async fn insert_test_pass(
    db: &DatabaseConnection,
    student_id: &str,
    year: &str,
    status: &str,
) -> Result<pass::Model> {
    pass_record(student_id, year, status)
        .into_active_model()
        .reset_all()
        .insert(db)
        .await
        .map_err(Into::into)
}

/// Registers `count` students named `{prefix}000`, `{prefix}001`, ... each holding a
/// pass for `year` in the given status. Creates the test stage on first use.
pub async fn seed_passes(
    db: &DatabaseConnection,
    prefix: &str,
    year: &str,
    status: &str,
    count: u64,
) -> Result<()> {
    if stage::get_stage_by_name(db, TEST_STAGE).await?.is_none() {
        create_test_stage(db).await?;
    }

    for i in 0..count {
        let student_id = format!("{prefix}{i:03}");
        create_test_student(db, &student_id).await?;
        insert_test_pass(db, &student_id, year, status).await?;
    }
    Ok(())
}
