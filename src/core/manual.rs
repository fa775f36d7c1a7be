//! Manual (cash) payments recorded by an administrator.
//!
//! Same guard and pass upsert as self-service, but the payment is settled at the
//! counter so it is stored as `success` straight away. The student's denormalised
//! payment summary is refreshed in the same transaction.

use crate::{
    core::{
        pass, payment, student,
        types::{Caller, PaymentChannel, PaymentKind, PaymentStatus},
    },
    entities::{pass as pass_entity, payment as payment_entity, student as student_entity},
    errors::Result,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, instrument};

/// Everything a manual payment touched.
#[derive(Debug, Clone)]
pub struct ManualPaymentReceipt {
    /// The recorded payment
    pub payment: payment_entity::Model,
    /// Issued or updated pass
    pub pass: pass_entity::Model,
    /// Student profile with the refreshed summary
    pub student: student_entity::Model,
}

/// Records a cash payment for `student_id` on behalf of an administrator.
#[instrument(skip(db), fields(actor = %caller.id))]
pub async fn record_manual_payment(
    db: &DatabaseConnection,
    caller: &Caller,
    student_id: &str,
    kind: PaymentKind,
) -> Result<ManualPaymentReceipt> {
    caller.require_admin("record manual payment")?;

    let txn = db.begin().await?;

    let authorized = payment::authorize_payment(&txn, student_id, kind).await?;
    let recorded = payment::insert_payment(
        &txn,
        &authorized,
        PaymentStatus::Success,
        PaymentChannel::Manual,
        Some(caller.id.clone()),
    )
    .await?;

    let issued = pass::apply_successful_payment(
        &txn,
        &authorized.student,
        &recorded,
        authorized.allowance.resulting_pass_status,
        authorized.allowance.due_amount,
    )
    .await?;

    let summary = student::payment_summary(
        &authorized.academic_year,
        authorized.allowance.resulting_pass_status,
        authorized.allowance.due_amount,
    );
    let updated_student = student::set_payment_summary(&txn, authorized.student, summary).await?;

    txn.commit().await?;

    info!(
        payment_id = recorded.id,
        student_id = %updated_student.id,
        kind = %kind,
        amount = recorded.amount,
        "Manual payment recorded"
    );

    Ok(ManualPaymentReceipt {
        payment: recorded,
        pass: issued,
        student: updated_student,
    })
}
