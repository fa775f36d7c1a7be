use super::{AppState, PassView, PaymentChoice, error::HttpError};
use crate::{
    core::{payment, student, types::PaymentStatus},
    entities::{payment as payment_entity, student as student_entity},
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Body of `POST /students`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterStudentRequest {
    /// Student identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Assigned bus
    pub bus_number: String,
    /// Fare stage, must already exist
    pub stage: String,
}

/// Result of a self-service payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Whether the payment succeeded
    pub ok: bool,
    /// The payment in its terminal state
    pub payment: payment_entity::Model,
    /// The pass, when the payment succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<PassView>,
    /// Link to the pass. It carries the pass token, so it is only returned to
    /// administrators; students get it through the pass itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_url: Option<String>,
}

/// Handler for POST `/students`.
pub async fn handle_register_student(
    State(state): State<AppState>,
    Json(req): Json<RegisterStudentRequest>,
) -> Result<(StatusCode, Json<student_entity::Model>), HttpError> {
    info!(student_id = %req.id, stage = %req.stage, "Handling register_student request");

    let created =
        student::register_student(&state.db, req.id, req.name, req.bus_number, req.stage).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Handler for POST `/students/{student_id}/payments`.
///
/// Runs the charge through the configured gateway and settles it before replying.
/// Anyone may pay for a student, so the response never carries the pass token unless
/// the caller is an administrator.
pub async fn handle_student_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(student_id): Path<String>,
    Json(choice): Json<PaymentChoice>,
) -> Result<Json<PaymentResponse>, HttpError> {
    let caller = state.caller(&headers);
    info!(student_id = %student_id, ?choice, "Handling student_payment request");

    let kind = choice.kind()?;
    let settlement =
        payment::process_payment(&state.db, state.gateway.as_ref(), &student_id, kind).await?;

    let verification_url = settlement
        .pass
        .as_ref()
        .filter(|_| caller.is_admin)
        .map(|p| state.verification_url(&p.student_id, &p.pass_token));

    Ok(Json(PaymentResponse {
        ok: settlement.payment.status == PaymentStatus::Success.as_str(),
        pass: settlement.pass.as_ref().map(PassView::from),
        verification_url,
        payment: settlement.payment,
    }))
}
