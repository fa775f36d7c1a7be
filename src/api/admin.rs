use super::{AppState, PassView, PaymentChoice, error::HttpError};
use crate::{
    core::{
        manual,
        payment::{self as payments, GatewayOutcome},
        rollover,
    },
    entities::payment,
};
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Body of `POST /admin/academic-year`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAcademicYearRequest {
    /// New academic year, `YYYY-YYYY`
    pub year: String,
}

/// Body of `POST /admin/rollover/resume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeCascadeRequest {
    /// Year whose passes should be expired
    pub from_year: String,
}

/// Result of a rollover or cascade resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverResponse {
    /// Whether the request succeeded
    pub ok: bool,
    /// Human-readable result
    pub message: String,
    /// Whether the settings row was written
    pub changed: bool,
    /// Year in force after the call
    pub academic_year: Option<String>,
    /// Year whose passes were expired
    pub previous_year: Option<String>,
    /// Passes expired by this call
    pub expired_count: u64,
    /// Student ids whose pass status was not recognised
    pub flagged: Vec<String>,
    /// Batches committed by this call
    pub batches: usize,
    /// False while the cascade has pages left
    pub completed: bool,
}

impl From<rollover::RolloverOutcome> for RolloverResponse {
    fn from(outcome: rollover::RolloverOutcome) -> Self {
        Self {
            ok: true,
            message: outcome.message,
            changed: outcome.changed,
            academic_year: Some(outcome.academic_year),
            previous_year: outcome.previous_year,
            expired_count: outcome.expired_count,
            flagged: outcome.flagged,
            batches: outcome.batches,
            completed: outcome.completed,
        }
    }
}

/// Body of `POST /admin/payments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPaymentRequest {
    /// Student paying at the counter
    pub student_id: String,
    /// What is being paid
    #[serde(flatten)]
    pub choice: PaymentChoice,
}

/// Result of a manual payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualPaymentResponse {
    /// Always true
    pub ok: bool,
    /// The recorded payment
    pub payment: payment::Model,
    /// Issued or updated pass
    pub pass: PassView,
    /// Link to hand to the student
    pub verification_url: String,
    /// Refreshed summary on the student profile
    pub payment_summary: Option<String>,
}

/// Body of `POST /admin/payments/{payment_id}/resolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvePaymentRequest {
    /// `approved` if the money arrived, `declined` otherwise
    pub outcome: GatewayOutcome,
}

/// Result of resolving a stuck payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvePaymentResponse {
    /// Always true
    pub ok: bool,
    /// The payment in its terminal state
    pub payment: payment::Model,
    /// The pass, when the payment succeeded for the current year
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<PassView>,
}

/// Handler for POST `/admin/academic-year`.
pub async fn handle_set_academic_year(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SetAcademicYearRequest>,
) -> Result<Json<RolloverResponse>, HttpError> {
    let caller = state.caller(&headers);
    info!(actor_id = %caller.id, year = %req.year, "Handling set_academic_year request");

    let outcome =
        rollover::set_academic_year(&state.db, &req.year, &caller, &state.cascade_options())
            .await?;
    info!("{}", rollover::format_rollover_summary(&outcome).trim_end());

    Ok(Json(outcome.into()))
}

/// Handler for POST `/admin/rollover/resume`.
pub async fn handle_resume_cascade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResumeCascadeRequest>,
) -> Result<Json<RolloverResponse>, HttpError> {
    let caller = state.caller(&headers);
    info!(
        actor_id = %caller.id,
        from_year = %req.from_year,
        "Handling resume_cascade request"
    );

    let report =
        rollover::resume_cascade(&state.db, &req.from_year, &caller, &state.cascade_options())
            .await?;

    Ok(Json(RolloverResponse {
        ok: true,
        message: format!(
            "Expired {} passes from {} ({} in total)",
            report.expired_count, report.from_year, report.total_expired
        ),
        changed: false,
        academic_year: None,
        previous_year: Some(report.from_year),
        expired_count: report.expired_count,
        flagged: report.flagged,
        batches: report.batches,
        completed: report.completed,
    }))
}

/// Handler for POST `/admin/payments`.
pub async fn handle_manual_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ManualPaymentRequest>,
) -> Result<Json<ManualPaymentResponse>, HttpError> {
    let caller = state.caller(&headers);
    info!(
        actor_id = %caller.id,
        student_id = %req.student_id,
        "Handling manual_payment request"
    );

    let kind = req.choice.kind()?;
    let receipt =
        manual::record_manual_payment(&state.db, &caller, &req.student_id, kind).await?;
    let verification_url =
        state.verification_url(&receipt.pass.student_id, &receipt.pass.pass_token);

    Ok(Json(ManualPaymentResponse {
        ok: true,
        verification_url,
        pass: PassView::from(&receipt.pass),
        payment: receipt.payment,
        payment_summary: receipt.student.payment_summary,
    }))
}

/// Handler for GET `/admin/payments/unsettled`.
pub async fn handle_unsettled_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<payment::Model>>, HttpError> {
    let caller = state.caller(&headers);
    caller.require_admin("list unsettled payments")?;

    let unsettled = payments::get_unsettled_payments(&state.db).await?;
    Ok(Json(unsettled))
}

/// Handler for POST `/admin/payments/{payment_id}/resolve`.
pub async fn handle_resolve_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<i64>,
    Json(req): Json<ResolvePaymentRequest>,
) -> Result<Json<ResolvePaymentResponse>, HttpError> {
    let caller = state.caller(&headers);
    info!(
        actor_id = %caller.id,
        payment_id,
        outcome = ?req.outcome,
        "Handling resolve_payment request"
    );

    let settlement =
        payments::resolve_stuck_payment(&state.db, &caller, payment_id, req.outcome).await?;

    Ok(Json(ResolvePaymentResponse {
        ok: true,
        pass: settlement.pass.as_ref().map(PassView::from),
        payment: settlement.payment,
    }))
}
