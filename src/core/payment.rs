//! Payment business logic - creation under the guard, state transitions, settlement.
//!
//! Eligibility is checked and the pending row inserted inside one store transaction.
//! A partial unique index on `(student_id, academic_year, payment_kind)` over
//! non-failed rows backs that check, so two racing requests for the same kind cannot
//! both get a live row. While any payment for the student and year is pending or
//! processing, no other payment may start; an administrator resolves rows that were
//! left behind by a crash with [`resolve_stuck_payment`].
//!
//! The amount, resulting pass status and remaining due are fixed on the row when it is
//! created. Settlement applies those values, never the stage's fees at that moment.

use crate::{
    core::{
        academic_year::is_earlier,
        pass,
        payment_guard::{self, Allowance, DenyReason, PaymentDecision},
        settings, stage, student,
        types::{Caller, PassStatus, PaymentChannel, PaymentKind, PaymentStatus},
    },
    entities::{Payment, pass as pass_entity, payment, student as student_entity},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::{future::Future, str::FromStr, time::Duration};
use tracing::{info, instrument, warn};

/// Result reported by the payment gateway for a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOutcome {
    /// Money was captured
    Approved,
    /// The charge was refused
    Declined,
}

/// External payment gateway.
pub trait PaymentGateway: Send + Sync {
    /// Charges the amount of a processing payment.
    fn charge(
        &self,
        payment: &payment::Model,
    ) -> impl Future<Output = Result<GatewayOutcome>> + Send;
}

/// Stand-in gateway that approves or declines every charge after an optional delay.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    /// Whether charges succeed
    pub approve: bool,
    /// Artificial processing time
    pub delay: Duration,
}

impl SimulatedGateway {
    /// A gateway that approves immediately
    #[must_use]
    pub const fn approving() -> Self {
        Self {
            approve: true,
            delay: Duration::ZERO,
        }
    }

    /// A gateway that declines immediately
    #[must_use]
    pub const fn declining() -> Self {
        Self {
            approve: false,
            delay: Duration::ZERO,
        }
    }
}

impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, payment: &payment::Model) -> Result<GatewayOutcome> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let outcome = if self.approve {
            GatewayOutcome::Approved
        } else {
            GatewayOutcome::Declined
        };
        info!(payment_id = payment.id, ?outcome, "Simulated gateway charge");
        Ok(outcome)
    }
}

/// A settled payment and, if it succeeded, the pass it produced.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// The payment in its terminal state
    pub payment: payment::Model,
    /// Issued or updated pass. `None` when the payment failed or counted towards an
    /// academic year that is no longer current.
    pub pass: Option<pass_entity::Model>,
}

/// An eligibility check that passed, with everything needed to record the payment.
#[derive(Debug, Clone)]
pub(crate) struct AuthorizedPayment {
    pub student: student_entity::Model,
    pub academic_year: String,
    pub kind: PaymentKind,
    pub allowance: Allowance,
}

/// Finds a payment by id.
pub async fn get_payment<C>(db: &C, payment_id: i64) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find_by_id(payment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All payments of a student for one academic year, oldest first.
pub async fn get_payments_for_student_year<C>(
    db: &C,
    student_id: &str,
    academic_year: &str,
) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::StudentId.eq(student_id))
        .filter(payment::Column::AcademicYear.eq(academic_year))
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Runs the guard for `kind` against the current year and the student's history.
///
/// Call inside the transaction that will record the payment.
pub(crate) async fn authorize_payment<C>(
    db: &C,
    student_id: &str,
    kind: PaymentKind,
) -> Result<AuthorizedPayment>
where
    C: ConnectionTrait,
{
    let academic_year = settings::require_current_academic_year(db).await?;
    let student = student::require_student(db, student_id).await?;
    let fees = stage::get_stage_fees(db, &student.stage).await?;
    let history = get_payments_for_student_year(db, student_id, &academic_year).await?;

    let in_flight = history.iter().any(|p| {
        PaymentStatus::from_str(&p.status)
            .map(|status| !status.is_terminal())
            .unwrap_or(false)
    });
    if in_flight {
        return Err(Error::PaymentDenied {
            reason: DenyReason::PaymentInProgress,
        });
    }

    match payment_guard::evaluate_payment_request(&history, &academic_year, kind, &fees) {
        PaymentDecision::Allow(allowance) => Ok(AuthorizedPayment {
            student,
            academic_year,
            kind,
            allowance,
        }),
        PaymentDecision::Deny { reason } => Err(Error::PaymentDenied { reason }),
    }
}

/// Inserts a payment row, turning a uniqueness violation into a guard denial.
pub(crate) async fn insert_payment<C>(
    db: &C,
    authorized: &AuthorizedPayment,
    status: PaymentStatus,
    channel: PaymentChannel,
    recorded_by: Option<String>,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let new_payment = payment::ActiveModel {
        student_id: Set(authorized.student.id.clone()),
        academic_year: Set(authorized.academic_year.clone()),
        payment_mode: Set(authorized.kind.mode().as_str().to_string()),
        installment_type: Set(authorized
            .kind
            .installment()
            .map(|installment| installment.as_str().to_string())),
        payment_kind: Set(authorized.kind.as_str().to_string()),
        amount: Set(authorized.allowance.amount),
        resulting_pass_status: Set(authorized
            .allowance
            .resulting_pass_status
            .as_str()
            .to_string()),
        due_amount: Set(authorized.allowance.due_amount),
        status: Set(status.as_str().to_string()),
        channel: Set(channel.as_str().to_string()),
        recorded_by: Set(recorded_by),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    match new_payment.insert(db).await {
        Ok(model) => Ok(model),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            warn!(
                student_id = %authorized.student.id,
                kind = %authorized.kind,
                "Concurrent payment of the same kind rejected by the store"
            );
            Err(Error::PaymentDenied {
                reason: DenyReason::PaymentInProgress,
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Checks eligibility and records a `pending` payment in one transaction.
#[instrument(skip(db))]
pub async fn begin_payment(
    db: &DatabaseConnection,
    student_id: &str,
    kind: PaymentKind,
) -> Result<payment::Model> {
    let txn = db.begin().await?;

    let authorized = authorize_payment(&txn, student_id, kind).await?;
    let created = insert_payment(
        &txn,
        &authorized,
        PaymentStatus::Pending,
        PaymentChannel::Online,
        None,
    )
    .await?;

    txn.commit().await?;

    info!(
        payment_id = created.id,
        amount = created.amount,
        academic_year = %created.academic_year,
        "Payment created"
    );
    Ok(created)
}

async fn transition<C>(
    db: &C,
    current: payment::Model,
    next: PaymentStatus,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    let status = PaymentStatus::from_str(&current.status)?;
    if !status.can_transition_to(next) {
        return Err(Error::InvalidPaymentTransition {
            payment_id: current.id,
            from: status.to_string(),
            to: next.to_string(),
        });
    }

    let mut active_model: payment::ActiveModel = current.into();
    active_model.status = Set(next.as_str().to_string());
    active_model.updated_at = Set(Utc::now());
    active_model.update(db).await.map_err(Into::into)
}

/// Moves a pending payment to `processing`.
pub async fn mark_processing(db: &DatabaseConnection, payment_id: i64) -> Result<payment::Model> {
    let current = get_payment(db, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { payment_id })?;
    transition(db, current, PaymentStatus::Processing).await
}

/// Payments still pending or processing, oldest first.
pub async fn get_unsettled_payments<C>(db: &C) -> Result<Vec<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::Status.is_in([
            PaymentStatus::Pending.as_str(),
            PaymentStatus::Processing.as_str(),
        ]))
        .order_by_asc(payment::Column::CreatedAt)
        .order_by_asc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a payment that just succeeded to the pass and the student summary.
///
/// A payment for a year before the current one is kept as a success but leaves the
/// pass alone.
async fn apply_settled_payment<C>(
    db: &C,
    succeeded: &payment::Model,
) -> Result<Option<pass_entity::Model>>
where
    C: ConnectionTrait,
{
    let current_year = settings::get_current_academic_year(db).await?;
    if let Some(current_year) = current_year
        .as_deref()
        .filter(|current| is_earlier(&succeeded.academic_year, current))
    {
        warn!(
            payment_id = succeeded.id,
            student_id = %succeeded.student_id,
            payment_year = %succeeded.academic_year,
            current_year = %current_year,
            "Payment settled after its academic year ended, pass left unchanged"
        );
        return Ok(None);
    }

    let pass_status = PassStatus::from_stored(&succeeded.resulting_pass_status).ok_or_else(
        || Error::Config {
            message: format!(
                "payment {} has unknown resulting pass status '{}'",
                succeeded.id, succeeded.resulting_pass_status
            ),
        },
    )?;

    let owner = student::require_student(db, &succeeded.student_id).await?;
    let issued =
        pass::apply_successful_payment(db, &owner, succeeded, pass_status, succeeded.due_amount)
            .await?;

    if issued.academic_year == succeeded.academic_year {
        let summary =
            student::payment_summary(&succeeded.academic_year, pass_status, succeeded.due_amount);
        student::set_payment_summary(db, owner, summary).await?;
    }

    Ok(Some(issued))
}

/// Records the gateway outcome of a processing payment.
///
/// On approval the pass and the student's payment summary are updated in the same
/// transaction, so a settled payment and its pass are never observed apart.
#[instrument(skip(db))]
pub async fn settle_payment(
    db: &DatabaseConnection,
    payment_id: i64,
    outcome: GatewayOutcome,
) -> Result<Settlement> {
    let txn = db.begin().await?;

    let current = get_payment(&txn, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { payment_id })?;

    let settlement = match outcome {
        GatewayOutcome::Declined => {
            let failed = transition(&txn, current, PaymentStatus::Failed).await?;
            Settlement {
                payment: failed,
                pass: None,
            }
        }
        GatewayOutcome::Approved => {
            let succeeded = transition(&txn, current, PaymentStatus::Success).await?;
            let issued = apply_settled_payment(&txn, &succeeded).await?;
            Settlement {
                payment: succeeded,
                pass: issued,
            }
        }
    };

    txn.commit().await?;

    info!(
        payment_id,
        status = %settlement.payment.status,
        "Payment settled"
    );
    Ok(settlement)
}

/// Settles a payment left pending or processing, for example after a crash between
/// the steps of [`process_payment`].
///
/// A pending payment never reached the gateway: declining fails it directly, approving
/// moves it through `processing` first.
#[instrument(skip(db), fields(actor = %caller.id))]
pub async fn resolve_stuck_payment(
    db: &DatabaseConnection,
    caller: &Caller,
    payment_id: i64,
    outcome: GatewayOutcome,
) -> Result<Settlement> {
    caller.require_admin("resolve payment")?;

    let current = get_payment(db, payment_id)
        .await?
        .ok_or(Error::PaymentNotFound { payment_id })?;
    let status = PaymentStatus::from_str(&current.status)?;

    let settlement = match (status, outcome) {
        (PaymentStatus::Pending, GatewayOutcome::Declined) => {
            let failed = transition(db, current, PaymentStatus::Failed).await?;
            Settlement {
                payment: failed,
                pass: None,
            }
        }
        (PaymentStatus::Pending, GatewayOutcome::Approved) => {
            mark_processing(db, payment_id).await?;
            settle_payment(db, payment_id, outcome).await?
        }
        _ => settle_payment(db, payment_id, outcome).await?,
    };

    info!(
        payment_id,
        from = %status,
        to = %settlement.payment.status,
        "Stuck payment resolved"
    );
    Ok(settlement)
}

/// Runs a self-service payment end to end: create, process, charge, settle.
///
/// A gateway error settles the payment as failed and is then returned.
pub async fn process_payment<G>(
    db: &DatabaseConnection,
    gateway: &G,
    student_id: &str,
    kind: PaymentKind,
) -> Result<Settlement>
where
    G: PaymentGateway,
{
    let pending = begin_payment(db, student_id, kind).await?;
    let processing = mark_processing(db, pending.id).await?;

    match gateway.charge(&processing).await {
        Ok(outcome) => settle_payment(db, processing.id, outcome).await,
        Err(err) => {
            warn!(payment_id = processing.id, error = %err, "Gateway charge failed");
            settle_payment(db, processing.id, GatewayOutcome::Declined).await?;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::{
        core::{manual, rollover, verification},
        entities::{Stage, stage as stage_entity},
        test_utils::*,
    };
    use sea_orm::IntoActiveModel;

    struct FailingGateway;

    impl PaymentGateway for FailingGateway {
        async fn charge(&self, _payment: &payment::Model) -> Result<GatewayOutcome> {
            Err(Error::Config {
                message: "gateway unreachable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_installment_scenario_keeps_token() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;
        let gateway = SimulatedGateway::approving();

        let first = process_payment(&db, &gateway, "21CS001", PaymentKind::FirstSem).await?;
        assert_eq!(first.payment.amount, 1600.0);
        assert_eq!(first.payment.status, "success");
        let first_pass = first.pass.unwrap();
        assert_eq!(first_pass.pass_status, PassStatus::Due.as_str());
        assert_eq!(first_pass.due_amount, 6000.0);

        let second = process_payment(&db, &gateway, "21CS001", PaymentKind::SecondSem).await?;
        assert_eq!(second.payment.amount, 6000.0);
        let second_pass = second.pass.unwrap();
        assert_eq!(second_pass.pass_status, PassStatus::NoDue.as_str());
        assert_eq!(second_pass.due_amount, 0.0);
        assert_eq!(second_pass.pass_token, first_pass.pass_token);

        for kind in [
            PaymentKind::Total,
            PaymentKind::FirstSem,
            PaymentKind::SecondSem,
        ] {
            let result = begin_payment(&db, "21CS001", kind).await;
            assert!(
                matches!(result, Err(Error::PaymentDenied { .. })),
                "{kind} should be denied"
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_total_payment_issues_no_due_pass() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let settlement = process_payment(
            &db,
            &SimulatedGateway::approving(),
            "21CS001",
            PaymentKind::Total,
        )
        .await?;

        let issued = settlement.pass.unwrap();
        assert_eq!(settlement.payment.amount, 7600.0);
        assert_eq!(issued.pass_status, "NO DUE");
        assert_eq!(issued.academic_year, "2025-2026");

        let denied = begin_payment(&db, "21CS001", PaymentKind::Total).await;
        assert!(matches!(
            denied,
            Err(Error::PaymentDenied {
                reason: DenyReason::AlreadyPaidInFull
            })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_declined_payment_leaves_no_pass_and_allows_retry() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let declined = process_payment(
            &db,
            &SimulatedGateway::declining(),
            "21CS001",
            PaymentKind::FirstSem,
        )
        .await?;
        assert_eq!(declined.payment.status, "failed");
        assert!(declined.pass.is_none());
        assert!(pass::get_pass(&db, "21CS001").await?.is_none());

        let retried = process_payment(
            &db,
            &SimulatedGateway::approving(),
            "21CS001",
            PaymentKind::FirstSem,
        )
        .await?;
        assert_eq!(retried.payment.status, "success");

        Ok(())
    }

    #[tokio::test]
    async fn test_in_flight_payment_blocks_new_payments() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let pending = begin_payment(&db, "21CS001", PaymentKind::FirstSem).await?;
        assert_eq!(pending.status, "pending");

        for kind in [PaymentKind::FirstSem, PaymentKind::Total] {
            assert!(matches!(
                begin_payment(&db, "21CS001", kind).await,
                Err(Error::PaymentDenied {
                    reason: DenyReason::PaymentInProgress
                })
            ));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_store_rejects_duplicate_live_payment() -> Result<()> {
        let (db, student) = setup_with_current_year("21CS001", "2025-2026").await?;

        // Bypass the guard to hit the partial unique index directly
        let authorized = AuthorizedPayment {
            student,
            academic_year: "2025-2026".to_string(),
            kind: PaymentKind::FirstSem,
            allowance: payment_guard::allowance(PaymentKind::FirstSem, &test_fees()),
        };
        insert_payment(
            &db,
            &authorized,
            PaymentStatus::Pending,
            PaymentChannel::Online,
            None,
        )
        .await?;
        let duplicate = insert_payment(
            &db,
            &authorized,
            PaymentStatus::Pending,
            PaymentChannel::Online,
            None,
        )
        .await;

        assert!(matches!(
            duplicate,
            Err(Error::PaymentDenied {
                reason: DenyReason::PaymentInProgress
            })
        ));

        // Failed rows do not hold the slot
        insert_payment(
            &db,
            &authorized,
            PaymentStatus::Failed,
            PaymentChannel::Online,
            None,
        )
        .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_illegal_transitions_rejected() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let pending = begin_payment(&db, "21CS001", PaymentKind::Total).await?;

        // pending cannot settle without processing first
        let early = settle_payment(&db, pending.id, GatewayOutcome::Approved).await;
        assert!(matches!(early, Err(Error::InvalidPaymentTransition { .. })));

        mark_processing(&db, pending.id).await?;
        settle_payment(&db, pending.id, GatewayOutcome::Approved).await?;

        // terminal rows never change again
        let again = settle_payment(&db, pending.id, GatewayOutcome::Declined).await;
        assert!(matches!(again, Err(Error::InvalidPaymentTransition { .. })));
        let reprocess = mark_processing(&db, pending.id).await;
        assert!(matches!(
            reprocess,
            Err(Error::InvalidPaymentTransition { .. })
        ));

        assert!(matches!(
            mark_processing(&db, 9999).await,
            Err(Error::PaymentNotFound { payment_id: 9999 })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_gateway_error_fails_payment() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let result = process_payment(&db, &FailingGateway, "21CS001", PaymentKind::Total).await;
        assert!(matches!(result, Err(Error::Config { .. })));

        let history = get_payments_for_student_year(&db, "21CS001", "2025-2026").await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, "failed");

        Ok(())
    }

    #[tokio::test]
    async fn test_payment_requires_current_year_and_student() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_stage(&db).await?;
        create_test_student(&db, "21CS001").await?;

        assert!(matches!(
            begin_payment(&db, "21CS001", PaymentKind::Total).await,
            Err(Error::AcademicYearNotSet)
        ));

        set_test_current_year(&db, "2025-2026").await?;
        assert!(matches!(
            begin_payment(&db, "ghost", PaymentKind::Total).await,
            Err(Error::StudentNotFound { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_late_settlement_of_old_year_keeps_current_pass() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2024-2025").await?;
        let admin = Caller::admin("admin1");

        let old = begin_payment(&db, "21CS001", PaymentKind::Total).await?;
        mark_processing(&db, old.id).await?;

        rollover::set_academic_year(
            &db,
            "2025-2026",
            &admin,
            &rollover::CascadeOptions::default(),
        )
        .await?;
        let current = process_payment(
            &db,
            &SimulatedGateway::approving(),
            "21CS001",
            PaymentKind::Total,
        )
        .await?
        .pass
        .unwrap();

        let late = settle_payment(&db, old.id, GatewayOutcome::Approved).await?;
        assert_eq!(late.payment.status, "success");
        assert!(late.pass.is_none());

        let stored = pass::get_pass(&db, "21CS001").await?.unwrap();
        assert_eq!(stored.academic_year, "2025-2026");
        assert_eq!(stored.pass_token, current.pass_token);

        let verified = verification::verify(&db, "21CS001", &current.pass_token).await?;
        assert!(matches!(verified, verification::Verification::Valid { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_resolves_stuck_payment() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;
        let admin = Caller::admin("admin1");

        // Left processing, as if the service died before the gateway answered
        let stuck = begin_payment(&db, "21CS001", PaymentKind::FirstSem).await?;
        mark_processing(&db, stuck.id).await?;
        assert!(matches!(
            process_payment(
                &db,
                &SimulatedGateway::approving(),
                "21CS001",
                PaymentKind::FirstSem
            )
            .await,
            Err(Error::PaymentDenied {
                reason: DenyReason::PaymentInProgress
            })
        ));

        let unsettled = get_unsettled_payments(&db).await?;
        assert_eq!(unsettled.len(), 1);
        assert_eq!(unsettled[0].id, stuck.id);

        let denied = resolve_stuck_payment(
            &db,
            &Caller::user("21CS001"),
            stuck.id,
            GatewayOutcome::Declined,
        )
        .await;
        assert!(matches!(denied, Err(Error::PermissionDenied { .. })));

        let resolved =
            resolve_stuck_payment(&db, &admin, stuck.id, GatewayOutcome::Declined).await?;
        assert_eq!(resolved.payment.status, "failed");
        assert!(get_unsettled_payments(&db).await?.is_empty());

        let retried = process_payment(
            &db,
            &SimulatedGateway::approving(),
            "21CS001",
            PaymentKind::FirstSem,
        )
        .await?;
        assert_eq!(retried.payment.status, "success");

        let again = resolve_stuck_payment(&db, &admin, stuck.id, GatewayOutcome::Approved).await;
        assert!(matches!(again, Err(Error::InvalidPaymentTransition { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_approves_pending_payment() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let pending = begin_payment(&db, "21CS001", PaymentKind::Total).await?;
        let resolved = resolve_stuck_payment(
            &db,
            &Caller::admin("admin1"),
            pending.id,
            GatewayOutcome::Approved,
        )
        .await?;

        assert_eq!(resolved.payment.status, "success");
        assert_eq!(resolved.pass.unwrap().pass_status, "NO DUE");

        Ok(())
    }

    #[tokio::test]
    async fn test_online_settlement_refreshes_summary() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        manual::record_manual_payment(
            &db,
            &Caller::admin("admin1"),
            "21CS001",
            PaymentKind::FirstSem,
        )
        .await?;
        process_payment(
            &db,
            &SimulatedGateway::approving(),
            "21CS001",
            PaymentKind::SecondSem,
        )
        .await?;

        let profile = student::require_student(&db, "21CS001").await?;
        assert_eq!(profile.payment_summary.as_deref(), Some("2025-2026: NO DUE"));

        Ok(())
    }

    #[tokio::test]
    async fn test_settlement_uses_terms_fixed_at_creation() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;

        let pending = begin_payment(&db, "21CS001", PaymentKind::FirstSem).await?;
        assert_eq!(pending.amount, 1600.0);
        assert_eq!(pending.due_amount, 6000.0);
        assert_eq!(pending.resulting_pass_status, "DUE");
        mark_processing(&db, pending.id).await?;

        // Fees change while the charge is in flight
        let fare = Stage::find()
            .filter(stage_entity::Column::Name.eq(TEST_STAGE))
            .one(&db)
            .await?
            .unwrap();
        let mut repriced = fare.into_active_model();
        repriced.installment1 = Set(2000.0);
        repriced.installment2 = Set(7000.0);
        repriced.full_fee = Set(9000.0);
        repriced.update(&db).await?;

        let settled = settle_payment(&db, pending.id, GatewayOutcome::Approved).await?;
        let issued = settled.pass.unwrap();
        assert_eq!(issued.last_payment_amount, 1600.0);
        assert_eq!(issued.due_amount, 6000.0);
        assert_eq!(issued.pass_status, "DUE");

        let profile = student::require_student(&db, "21CS001").await?;
        assert_eq!(
            profile.payment_summary.as_deref(),
            Some("2025-2026: DUE 6000.00")
        );

        Ok(())
    }
}
