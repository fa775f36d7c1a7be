//! Pass issuance.
//!
//! A pass is created by the first successful payment of an academic year and updated
//! in place by the second installment. Its token only changes on a full reissue, which
//! happens when a payment for a later year lands on an old or expired pass. A payment
//! for an earlier year than the pass never touches it.

use crate::{
    core::{
        academic_year::is_earlier,
        types::{PassState, PassStatus},
    },
    entities::{Pass, pass, payment, student},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{info, warn};

/// Random bytes per pass token (256 bits)
const PASS_TOKEN_BYTES: usize = 32;

/// Generates a fresh, unguessable pass token as lowercase hex.
#[must_use]
pub fn generate_pass_token() -> String {
    let bytes: [u8; PASS_TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}

/// Public verification URL printed on the pass (and encoded in its QR code).
#[must_use]
pub fn verification_url(base_url: &str, student_id: &str, token: &str) -> String {
    format!(
        "{}/verify/{student_id}?token={token}",
        base_url.trim_end_matches('/')
    )
}

/// Finds the pass of a student.
pub async fn get_pass<C>(db: &C, student_id: &str) -> Result<Option<pass::Model>>
where
    C: ConnectionTrait,
{
    Pass::find_by_id(student_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates, updates or reissues the student's pass after `payment` succeeded.
///
/// * no pass yet: create one with a new token
/// * active pass for the same academic year: update payment fields, keep the token
/// * pass for a later year than the payment: left as is
/// * anything else (older year, expired): reissue with a new token
pub(crate) async fn apply_successful_payment<C>(
    db: &C,
    student: &student::Model,
    payment: &payment::Model,
    pass_status: PassStatus,
    due_amount: f64,
) -> Result<pass::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let existing = get_pass(db, &student.id).await?;

    match existing {
        Some(current)
            if current.academic_year == payment.academic_year
                && PassState::from_stored(&current.status) == Some(PassState::Active) =>
        {
            let mut active_model: pass::ActiveModel = current.into();
            active_model.pass_status = Set(pass_status.as_str().to_string());
            active_model.due_amount = Set(due_amount);
            active_model.last_payment_amount = Set(payment.amount);
            active_model.last_payment_date = Set(now);
            let updated = active_model.update(db).await?;
            info!(
                student_id = %updated.student_id,
                pass_status = %updated.pass_status,
                "Pass updated in place"
            );
            Ok(updated)
        }
        Some(current) if is_earlier(&payment.academic_year, &current.academic_year) => {
            warn!(
                student_id = %current.student_id,
                payment_id = payment.id,
                payment_year = %payment.academic_year,
                pass_year = %current.academic_year,
                "Payment for an earlier year left the newer pass untouched"
            );
            Ok(current)
        }
        Some(current) => {
            let previous_year = current.academic_year.clone();
            let mut active_model: pass::ActiveModel = current.into();
            active_model.pass_token = Set(generate_pass_token());
            active_model.status = Set(PassState::Active.as_str().to_string());
            active_model.pass_status = Set(pass_status.as_str().to_string());
            active_model.due_amount = Set(due_amount);
            active_model.academic_year = Set(payment.academic_year.clone());
            active_model.bus_number = Set(student.bus_number.clone());
            active_model.stage = Set(student.stage.clone());
            active_model.last_payment_amount = Set(payment.amount);
            active_model.last_payment_date = Set(now);
            active_model.issued_at = Set(now);
            active_model.expired_at = Set(None);
            active_model.expired_reason = Set(None);
            active_model.expired_from_academic_year = Set(None);
            let reissued = active_model.update(db).await?;
            info!(
                student_id = %reissued.student_id,
                from_year = %previous_year,
                to_year = %reissued.academic_year,
                "Pass reissued"
            );
            Ok(reissued)
        }
        None => {
            let new_pass = pass::ActiveModel {
                student_id: Set(student.id.clone()),
                pass_token: Set(generate_pass_token()),
                status: Set(PassState::Active.as_str().to_string()),
                pass_status: Set(pass_status.as_str().to_string()),
                due_amount: Set(due_amount),
                academic_year: Set(payment.academic_year.clone()),
                bus_number: Set(student.bus_number.clone()),
                stage: Set(student.stage.clone()),
                last_payment_amount: Set(payment.amount),
                last_payment_date: Set(now),
                issued_at: Set(now),
                expired_at: Set(None),
                expired_reason: Set(None),
                expired_from_academic_year: Set(None),
            };
            let created = new_pass.insert(db).await?;
            info!(
                student_id = %created.student_id,
                academic_year = %created.academic_year,
                "Pass issued"
            );
            Ok(created)
        }
    }
}
