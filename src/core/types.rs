//! Typed views over the text columns of the pass and payment tables.
//!
//! The store keeps these values as strings so that rows written by older clients
//! still load; everything above the entity layer works with the enums below.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// `expired_reason` written by the rollover cascade
pub const EXPIRED_REASON_YEAR_CHANGE: &str = "yearChange";

/// Lifecycle state of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassState {
    /// Usable, subject to the academic year check
    Active,
    /// Terminal until a reissue
    Expired,
}

impl PassState {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }

    /// Parses a stored value. Unknown values yield `None` so callers can flag them.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

/// Payment completeness of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassStatus {
    /// Second installment still owed
    #[serde(rename = "DUE")]
    Due,
    /// Fully paid for the year
    #[serde(rename = "NO DUE")]
    NoDue,
}

impl PassStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Due => "DUE",
            Self::NoDue => "NO DUE",
        }
    }

    /// Parses the stored form; unknown values yield `None`
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "DUE" => Some(Self::Due),
            "NO DUE" => Some(Self::NoDue),
            _ => None,
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the student chose to pay for the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Full fee in one payment
    Total,
    /// Two semester installments
    Installment,
}

impl PaymentMode {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Total => "TOTAL",
            Self::Installment => "INSTALLMENT",
        }
    }
}

impl FromStr for PaymentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TOTAL" => Ok(Self::Total),
            "INSTALLMENT" => Ok(Self::Installment),
            other => Err(Error::InvalidPaymentRequest {
                message: format!("unknown payment mode '{other}'"),
            }),
        }
    }
}

/// Which semester an installment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentType {
    /// First installment
    FirstSem,
    /// Second installment, only after the first
    SecondSem,
}

impl InstallmentType {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstSem => "FIRST_SEM",
            Self::SecondSem => "SECOND_SEM",
        }
    }
}

impl FromStr for InstallmentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FIRST_SEM" => Ok(Self::FirstSem),
            "SECOND_SEM" => Ok(Self::SecondSem),
            other => Err(Error::InvalidPaymentRequest {
                message: format!("unknown installment type '{other}'"),
            }),
        }
    }
}

/// Mode and installment folded into the three payments a student can make per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    /// Full fee
    Total,
    /// First semester installment
    FirstSem,
    /// Second semester installment
    SecondSem,
}

impl PaymentKind {
    /// Validates a mode/installment pair as submitted by a form.
    pub fn from_parts(mode: PaymentMode, installment: Option<InstallmentType>) -> Result<Self> {
        match (mode, installment) {
            (PaymentMode::Total, None) => Ok(Self::Total),
            (PaymentMode::Installment, Some(InstallmentType::FirstSem)) => Ok(Self::FirstSem),
            (PaymentMode::Installment, Some(InstallmentType::SecondSem)) => Ok(Self::SecondSem),
            (PaymentMode::Total, Some(installment)) => Err(Error::InvalidPaymentRequest {
                message: format!(
                    "a TOTAL payment cannot carry installment type {}",
                    installment.as_str()
                ),
            }),
            (PaymentMode::Installment, None) => Err(Error::InvalidPaymentRequest {
                message: "an INSTALLMENT payment needs an installment type".to_string(),
            }),
        }
    }

    /// Payment mode column value
    #[must_use]
    pub const fn mode(self) -> PaymentMode {
        match self {
            Self::Total => PaymentMode::Total,
            Self::FirstSem | Self::SecondSem => PaymentMode::Installment,
        }
    }

    /// Installment type column value
    #[must_use]
    pub const fn installment(self) -> Option<InstallmentType> {
        match self {
            Self::Total => None,
            Self::FirstSem => Some(InstallmentType::FirstSem),
            Self::SecondSem => Some(InstallmentType::SecondSem),
        }
    }

    /// Stored representation of the `payment_kind` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Total => "TOTAL",
            Self::FirstSem => "FIRST_SEM",
            Self::SecondSem => "SECOND_SEM",
        }
    }

    /// Parses the `payment_kind` column
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "TOTAL" => Some(Self::Total),
            "FIRST_SEM" => Some(Self::FirstSem),
            "SECOND_SEM" => Some(Self::SecondSem),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment record state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Created, not yet handed to the gateway
    Pending,
    /// Handed to the gateway
    Processing,
    /// Settled
    Success,
    /// Declined
    Failed,
}

impl PaymentStatus {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Terminal rows are never mutated again
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Legal edges: pending→processing|failed, processing→success|failed. Manual cash
    /// receipts are inserted as `success` directly and never transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Failed)
                | (Self::Processing, Self::Success | Self::Failed)
        )
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Config {
                message: format!("unknown payment status '{other}' in store"),
            }),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a payment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentChannel {
    /// Student self-service through the gateway
    Online,
    /// Cash recorded by an administrator
    Manual,
}

impl PaymentChannel {
    /// Stored representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Manual => "manual",
        }
    }
}

/// The authenticated party invoking an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Stable identifier recorded in audit fields
    pub id: String,
    /// Whether the credential carries the administrator claim
    pub is_admin: bool,
}

impl Caller {
    /// An administrator
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }

    /// Anyone without the administrator claim
    #[must_use]
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    /// Fails with [`Error::PermissionDenied`] unless the caller is an administrator.
    pub fn require_admin(&self, action: &str) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(Error::PermissionDenied {
                action: action.to_string(),
            })
        }
    }
}
