//! Pass verification.
//!
//! A scan supplies a student id and the token from the pass URL. Checks run in a fixed
//! order and stop at the first failure so the reason tells the scanner what to do next.
//! Nothing is cached: the current academic year is read on every call.

use crate::{
    core::{
        pass, settings, student,
        types::{EXPIRED_REASON_YEAR_CHANGE, PassState},
    },
    entities::pass as pass_entity,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;

/// Why a pass failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationFailure {
    /// No pass exists for the student
    NotFound,
    /// The token does not belong to this pass
    TokenMismatch,
    /// Expired by an academic year rollover
    ExpiredByRollover,
    /// Active, but issued for a year that is no longer current
    StaleYear,
    /// Not active for any other reason
    NotActive,
}

/// Student fields shown to the person scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDisplay {
    /// Student id
    pub student_id: String,
    /// Name, if a profile exists
    pub name: Option<String>,
    /// Assigned bus
    pub bus_number: String,
    /// Fare stage
    pub stage: String,
    /// `DUE` or `NO DUE`
    pub pass_status: String,
    /// Amount still owed, when `DUE`
    pub due_amount: Option<f64>,
}

/// Result of [`verify`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// The pass may be used
    Valid {
        /// The verified pass
        pass: Box<pass_entity::Model>,
        /// Display fields for the scanner
        student: StudentDisplay,
    },
    /// The pass must be refused
    Invalid {
        /// First check that failed
        reason: VerificationFailure,
    },
}

fn tokens_match(stored: &str, presented: &str) -> bool {
    bool::from(stored.as_bytes().ct_eq(presented.as_bytes()))
}

/// Runs the verification checks against already-loaded data.
///
/// `current_year` is `None` before the first rollover; no pass can be confirmed
/// current then, so such passes report [`VerificationFailure::StaleYear`].
pub fn check_pass(
    pass: Option<&pass_entity::Model>,
    token: &str,
    current_year: Option<&str>,
) -> std::result::Result<(), VerificationFailure> {
    let pass = pass.ok_or(VerificationFailure::NotFound)?;

    if !tokens_match(&pass.pass_token, token) {
        return Err(VerificationFailure::TokenMismatch);
    }

    let state = PassState::from_stored(&pass.status);
    if state == Some(PassState::Expired)
        && pass.expired_reason.as_deref() == Some(EXPIRED_REASON_YEAR_CHANGE)
    {
        return Err(VerificationFailure::ExpiredByRollover);
    }

    if current_year != Some(pass.academic_year.as_str()) {
        return Err(VerificationFailure::StaleYear);
    }

    if state != Some(PassState::Active) {
        return Err(VerificationFailure::NotActive);
    }

    Ok(())
}

/// Verifies a scanned pass.
pub async fn verify(
    db: &DatabaseConnection,
    student_id: &str,
    token: &str,
) -> Result<Verification> {
    let found = pass::get_pass(db, student_id).await?;
    let current_year = settings::get_current_academic_year(db).await?;

    if let Err(reason) = check_pass(found.as_ref(), token, current_year.as_deref()) {
        debug!(student_id, ?reason, "Pass verification failed");
        return Ok(Verification::Invalid { reason });
    }

    let Some(valid_pass) = found else {
        return Ok(Verification::Invalid {
            reason: VerificationFailure::NotFound,
        });
    };

    let profile = student::get_student(db, student_id).await?;
    let display = StudentDisplay {
        student_id: valid_pass.student_id.clone(),
        name: profile.as_ref().map(|s| s.name.clone()),
        bus_number: valid_pass.bus_number.clone(),
        stage: valid_pass.stage.clone(),
        pass_status: valid_pass.pass_status.clone(),
        due_amount: (valid_pass.due_amount > 0.0).then_some(valid_pass.due_amount),
    };

    Ok(Verification::Valid {
        pass: Box::new(valid_pass),
        student: display,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    #![allow(clippy::panic)]
    use super::*;
    use crate::{
        core::{
            rollover::{self, CascadeOptions},
            types::Caller,
        },
        test_utils::*,
    };
    use sea_orm::{ActiveModelTrait, Set};

    #[test]
    fn test_check_order() {
        let mut p = pass_record("21CS001", "2024-2025", "active");

        assert_eq!(
            check_pass(None, "anything", Some("2024-2025")),
            Err(VerificationFailure::NotFound)
        );
        assert_eq!(
            check_pass(Some(&p), "wrong", Some("2024-2025")),
            Err(VerificationFailure::TokenMismatch)
        );
        assert_eq!(check_pass(Some(&p), &p.pass_token, Some("2024-2025")), Ok(()));

        // active but stale is reported as stale, never as not-active or valid
        assert_eq!(
            check_pass(Some(&p), &p.pass_token, Some("2025-2026")),
            Err(VerificationFailure::StaleYear)
        );
        assert_eq!(
            check_pass(Some(&p), &p.pass_token, None),
            Err(VerificationFailure::StaleYear)
        );

        p.status = "expired".to_string();
        p.expired_reason = Some(EXPIRED_REASON_YEAR_CHANGE.to_string());
        assert_eq!(
            check_pass(Some(&p), &p.pass_token, Some("2025-2026")),
            Err(VerificationFailure::ExpiredByRollover)
        );

        // expired for another reason in the current year
        p.expired_reason = None;
        assert_eq!(
            check_pass(Some(&p), &p.pass_token, Some("2024-2025")),
            Err(VerificationFailure::NotActive)
        );

        // token is checked before anything else
        assert_eq!(
            check_pass(Some(&p), "wrong", Some("2024-2025")),
            Err(VerificationFailure::TokenMismatch)
        );
    }

    #[tokio::test]
    async fn test_verify_valid_pass() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;
        let issued = insert_test_pass(&db, "21CS001", "2025-2026", "active").await?;
        let mut due: pass_entity::ActiveModel = issued.clone().into();
        due.pass_status = Set("DUE".to_string());
        due.due_amount = Set(6000.0);
        due.update(&db).await?;

        let result = verify(&db, "21CS001", &issued.pass_token).await?;
        let Verification::Valid { pass, student } = result else {
            panic!("expected a valid pass, got {result:?}");
        };
        assert_eq!(pass.student_id, "21CS001");
        assert_eq!(student.name.as_deref(), Some("Test Student"));
        assert_eq!(student.stage, TEST_STAGE);
        assert_eq!(student.pass_status, "DUE");
        assert_eq!(student.due_amount, Some(6000.0));

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_reports_stale_year_then_rollover_expiry() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2024-2025").await?;
        let issued = insert_test_pass(&db, "21CS001", "2024-2025", "active").await?;

        // Settings move on without the cascade touching the pass
        set_test_current_year(&db, "2025-2026").await?;
        assert_eq!(
            verify(&db, "21CS001", &issued.pass_token).await?,
            Verification::Invalid {
                reason: VerificationFailure::StaleYear
            }
        );

        rollover::resume_cascade(
            &db,
            "2024-2025",
            &Caller::admin("admin1"),
            &CascadeOptions::default(),
        )
        .await?;
        assert_eq!(
            verify(&db, "21CS001", &issued.pass_token).await?,
            Verification::Invalid {
                reason: VerificationFailure::ExpiredByRollover
            }
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_unknown_student_and_bad_token() -> Result<()> {
        let (db, _student) = setup_with_current_year("21CS001", "2025-2026").await?;
        insert_test_pass(&db, "21CS001", "2025-2026", "active").await?;

        assert_eq!(
            verify(&db, "ghost", "token").await?,
            Verification::Invalid {
                reason: VerificationFailure::NotFound
            }
        );
        assert_eq!(
            verify(&db, "21CS001", "not-the-token").await?,
            Verification::Invalid {
                reason: VerificationFailure::TokenMismatch
            }
        );

        Ok(())
    }
}
