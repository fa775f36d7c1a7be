//! Student profile access.
//!
//! Profiles are owned by the wider system; this module only registers the fields the
//! pass lifecycle needs and keeps the denormalised payment summary current.

use crate::{
    core::{stage, types::PassStatus},
    entities::{Student, student},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, SqlErr, prelude::*};
use tracing::warn;

/// Summary line stored on the student profile, e.g. `"2025-2026: DUE 6000.00"`.
#[must_use]
pub fn payment_summary(academic_year: &str, pass_status: PassStatus, due_amount: f64) -> String {
    match pass_status {
        PassStatus::Due => format!("{academic_year}: {pass_status} {due_amount:.2}"),
        PassStatus::NoDue => format!("{academic_year}: {pass_status}"),
    }
}

/// Finds a student profile by id.
pub async fn get_student<C>(db: &C, student_id: &str) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find_by_id(student_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a student profile, failing with [`Error::StudentNotFound`] if absent.
pub async fn require_student<C>(db: &C, student_id: &str) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    get_student(db, student_id)
        .await?
        .ok_or_else(|| Error::StudentNotFound {
            student_id: student_id.to_string(),
        })
}

/// Registers a student profile on a known stage.
pub async fn register_student(
    db: &DatabaseConnection,
    id: String,
    name: String,
    bus_number: String,
    stage_name: String,
) -> Result<student::Model> {
    if id.trim().is_empty() || name.trim().is_empty() {
        return Err(Error::InvalidInput {
            message: "Student id and name cannot be empty".to_string(),
        });
    }

    if stage::get_stage_by_name(db, stage_name.trim()).await?.is_none() {
        return Err(Error::StageNotFound { name: stage_name });
    }

    let student = student::ActiveModel {
        id: Set(id.trim().to_string()),
        name: Set(name.trim().to_string()),
        bus_number: Set(bus_number.trim().to_string()),
        stage: Set(stage_name.trim().to_string()),
        payment_summary: Set(None),
        updated_at: Set(Utc::now()),
    };

    match student.insert(db).await {
        Ok(model) => Ok(model),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            warn!(student_id = %id.trim(), "Student id already registered");
            Err(Error::StudentExists {
                student_id: id.trim().to_string(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Overwrites the denormalised payment summary shown in admin listings.
pub(crate) async fn set_payment_summary<C>(
    db: &C,
    student: student::Model,
    summary: String,
) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    let mut active_model: student::ActiveModel = student.into();
    active_model.payment_summary = Set(Some(summary));
    active_model.updated_at = Set(Utc::now());
    active_model.update(db).await.map_err(Into::into)
}
