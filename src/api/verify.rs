use super::{AppState, PassView, error::HttpError};
use crate::core::verification::{self, StudentDisplay, Verification, VerificationFailure};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Query string of `GET /verify/{student_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyParams {
    /// Token from the pass URL
    pub token: String,
}

/// Verification result. Invalid passes only carry the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether the pass may be used
    pub valid: bool,
    /// First failed check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<VerificationFailure>,
    /// The pass, when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<PassView>,
    /// Display fields, when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentDisplay>,
}

/// Handler for GET `/verify/{student_id}?token=...`.
pub async fn handle_verify(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>, HttpError> {
    let response = match verification::verify(&state.db, &student_id, &params.token).await? {
        Verification::Valid { pass, student } => VerifyResponse {
            valid: true,
            reason: None,
            pass: Some(PassView::from(pass.as_ref())),
            student: Some(student),
        },
        Verification::Invalid { reason } => VerifyResponse {
            valid: false,
            reason: Some(reason),
            pass: None,
            student: None,
        },
    };
    Ok(Json(response))
}

/// Handler for GET `/health`.
pub async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
