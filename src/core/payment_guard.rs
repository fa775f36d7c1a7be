//! Payment-progression guard.
//!
//! Decides whether a student may make a given payment this academic year and what the
//! pass will look like afterwards. The guard is a pure function of the student's
//! payment history; persisting anything is the caller's job.
//!
//! Per (student, year) at most one successful payment of each kind exists, a second
//! installment needs a first, and a full payment closes the year.

use crate::{
    core::{
        stage::StageFees,
        types::{PassStatus, PaymentKind, PaymentStatus},
    },
    entities::payment,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Why a payment request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// A full payment already succeeded this year
    AlreadyPaidInFull,
    /// A first installment exists, so the installment path must be completed
    InstallmentPlanStarted,
    /// The first installment was already paid
    DuplicateFirstInstallment,
    /// The second installment was already paid
    DuplicateSecondInstallment,
    /// Second installment requested before the first
    FirstInstallmentRequired,
    /// Another payment for the student and year is pending or processing
    PaymentInProgress,
}

impl DenyReason {
    /// Stable reason code for API consumers
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::AlreadyPaidInFull => "already_paid_in_full",
            Self::InstallmentPlanStarted => "installment_plan_started",
            Self::DuplicateFirstInstallment => "duplicate_first_installment",
            Self::DuplicateSecondInstallment => "duplicate_second_installment",
            Self::FirstInstallmentRequired => "first_installment_required",
            Self::PaymentInProgress => "payment_in_progress",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::AlreadyPaidInFull => "the fee for this academic year is already paid in full",
            Self::InstallmentPlanStarted => {
                "the first installment is paid; complete the installment plan instead"
            }
            Self::DuplicateFirstInstallment => "the first installment is already paid",
            Self::DuplicateSecondInstallment => "the second installment is already paid",
            Self::FirstInstallmentRequired => {
                "the first installment must be paid before the second"
            }
            Self::PaymentInProgress => {
                "another payment for this academic year is still being processed"
            }
        };
        f.write_str(message)
    }
}

/// What an allowed payment charges and leaves on the pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allowance {
    /// Amount to charge
    pub amount: f64,
    /// Pass status once the payment succeeds
    pub resulting_pass_status: PassStatus,
    /// Amount still owed once the payment succeeds
    pub due_amount: f64,
}

/// Outcome of [`evaluate_payment_request`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaymentDecision {
    /// The payment may go ahead
    Allow(Allowance),
    /// The payment must not be taken
    Deny {
        /// Specific reason, shown to the student
        reason: DenyReason,
    },
}

/// Which kinds already succeeded for the year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaidKinds {
    /// A full payment succeeded
    pub total: bool,
    /// The first installment succeeded
    pub first: bool,
    /// The second installment succeeded
    pub second: bool,
}

impl PaidKinds {
    /// Collects successful payments for `current_year`; anything else is ignored.
    #[must_use]
    pub fn from_history(history: &[payment::Model], current_year: &str) -> Self {
        history
            .iter()
            .filter(|p| p.academic_year == current_year)
            .filter(|p| PaymentStatus::from_str(&p.status).ok() == Some(PaymentStatus::Success))
            .filter_map(|p| PaymentKind::from_stored(&p.payment_kind))
            .fold(Self::default(), |mut paid, kind| {
                match kind {
                    PaymentKind::Total => paid.total = true,
                    PaymentKind::FirstSem => paid.first = true,
                    PaymentKind::SecondSem => paid.second = true,
                }
                paid
            })
    }
}

/// Evaluates a payment request against the student's history for the current year.
#[must_use]
pub fn evaluate_payment_request(
    history: &[payment::Model],
    current_year: &str,
    kind: PaymentKind,
    fees: &StageFees,
) -> PaymentDecision {
    decide(PaidKinds::from_history(history, current_year), kind, fees)
}

/// Same as [`evaluate_payment_request`] once the history has been reduced.
#[must_use]
pub fn decide(paid: PaidKinds, kind: PaymentKind, fees: &StageFees) -> PaymentDecision {
    let denial = if paid.total {
        Some(DenyReason::AlreadyPaidInFull)
    } else {
        match kind {
            PaymentKind::Total if paid.first => Some(DenyReason::InstallmentPlanStarted),
            PaymentKind::FirstSem if paid.first => Some(DenyReason::DuplicateFirstInstallment),
            PaymentKind::SecondSem if paid.second => Some(DenyReason::DuplicateSecondInstallment),
            PaymentKind::SecondSem if !paid.first => Some(DenyReason::FirstInstallmentRequired),
            _ => None,
        }
    };

    denial.map_or_else(
        || PaymentDecision::Allow(allowance(kind, fees)),
        |reason| PaymentDecision::Deny { reason },
    )
}

/// Amount and resulting pass state for a payment of `kind`, ignoring history.
///
/// Settlement uses this to recompute the pass fields once the gateway approves.
#[must_use]
pub const fn allowance(kind: PaymentKind, fees: &StageFees) -> Allowance {
    match kind {
        PaymentKind::Total => Allowance {
            amount: fees.full_fee,
            resulting_pass_status: PassStatus::NoDue,
            due_amount: 0.0,
        },
        PaymentKind::FirstSem => Allowance {
            amount: fees.installment1,
            resulting_pass_status: PassStatus::Due,
            due_amount: fees.installment2,
        },
        PaymentKind::SecondSem => Allowance {
            amount: fees.installment2,
            resulting_pass_status: PassStatus::NoDue,
            due_amount: 0.0,
        },
    }
}
