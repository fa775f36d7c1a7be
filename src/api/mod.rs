//! HTTP surface of the bus pass service.
//!
//! Handlers translate requests into calls on [`crate::core`] and map the results back.
//! Administrative endpoints require `Authorization: Bearer <ADMIN_API_KEY>` plus an
//! `x-actor-id` header naming the operator; the core operations enforce the claim.

/// Administrative endpoints: rollover, cascade resume, manual and stuck payments
pub mod admin;
/// Error-to-response mapping
pub mod error;
/// Student self-service endpoints: registration and payments
pub mod students;
/// Public pass verification and health
pub mod verify;

use crate::{
    config::{admin::AdminKey, app::AppConfig},
    core::{
        payment::SimulatedGateway,
        pass::verification_url,
        rollover::CascadeOptions,
        types::{Caller, InstallmentType, PaymentKind, PaymentMode},
    },
    entities::pass,
    errors::Result,
};
use axum::{
    Router,
    http::{HeaderMap, header},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

/// Header naming the operator behind an administrative request
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub db: DatabaseConnection,
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Administrator credential
    pub admin_key: AdminKey,
    /// Gateway used for self-service payments
    pub gateway: Arc<SimulatedGateway>,
}

impl AppState {
    /// Builds state from configuration, taking the gateway behaviour from `[gateway]`.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig, admin_key: AdminKey) -> Self {
        let gateway = SimulatedGateway {
            approve: config.gateway.approve,
            delay: Duration::from_millis(config.gateway.delay_ms),
        };
        Self {
            db,
            config: Arc::new(config),
            admin_key,
            gateway: Arc::new(gateway),
        }
    }

    fn cascade_options(&self) -> CascadeOptions {
        CascadeOptions {
            page_size: self.config.rollover.page_size,
            max_pages: None,
        }
    }

    fn verification_url(&self, student_id: &str, token: &str) -> String {
        verification_url(&self.config.server.public_base_url, student_id, token)
    }

    /// Identifies the caller from the request headers.
    ///
    /// The administrator claim is granted only when the bearer token matches the
    /// configured key and an actor id is supplied.
    fn caller(&self, headers: &HeaderMap) -> Caller {
        let actor = headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|actor| !actor.is_empty());

        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        match (actor, bearer) {
            (Some(actor), Some(key)) if self.admin_key.matches(key) => Caller::admin(actor),
            (Some(actor), _) => Caller::user(actor),
            (None, _) => Caller::user("anonymous"),
        }
    }
}

/// Payment choice as sent by clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaymentChoice {
    /// `TOTAL` or `INSTALLMENT`
    pub mode: PaymentMode,
    /// `FIRST_SEM` or `SECOND_SEM`, required for installments
    #[serde(default)]
    pub installment: Option<InstallmentType>,
}

impl PaymentChoice {
    fn kind(self) -> Result<PaymentKind> {
        PaymentKind::from_parts(self.mode, self.installment)
    }
}

/// Pass fields safe to return to clients. The token is never included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassView {
    /// Student id
    pub student_id: String,
    /// `active` or `expired`
    pub status: String,
    /// `DUE` or `NO DUE`
    pub pass_status: String,
    /// Amount still owed
    pub due_amount: f64,
    /// Year the pass is valid for
    pub academic_year: String,
    /// Assigned bus
    pub bus_number: String,
    /// Fare stage
    pub stage: String,
    /// Token issue time
    pub issued_at: DateTime<Utc>,
}

impl From<&pass::Model> for PassView {
    fn from(model: &pass::Model) -> Self {
        Self {
            student_id: model.student_id.clone(),
            status: model.status.clone(),
            pass_status: model.pass_status.clone(),
            due_amount: model.due_amount,
            academic_year: model.academic_year.clone(),
            bus_number: model.bus_number.clone(),
            stage: model.stage.clone(),
            issued_at: model.issued_at,
        }
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(verify::handle_health))
        .route("/verify/{student_id}", get(verify::handle_verify))
        .route("/students", post(students::handle_register_student))
        .route(
            "/students/{student_id}/payments",
            post(students::handle_student_payment),
        )
        .route("/admin/academic-year", post(admin::handle_set_academic_year))
        .route("/admin/rollover/resume", post(admin::handle_resume_cascade))
        .route("/admin/payments", post(admin::handle_manual_payment))
        .route(
            "/admin/payments/unsettled",
            get(admin::handle_unsettled_payments),
        )
        .route(
            "/admin/payments/{payment_id}/resolve",
            post(admin::handle_resolve_payment),
        )
        .with_state(state)
}
