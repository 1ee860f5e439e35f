//! Notification intake routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use courier_common::error::AppError;
use courier_common::requests::{
    SendChatRequest, SendEmailRequest, SendSmsRequest, SubmitResponse, SubmitStatus,
};
use courier_common::types::Notification;
use courier_outbox::Admission;

use crate::middleware::idempotency::IdempotencyHeader;
use crate::middleware::json_body::JsonBody;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications/sms", post(send_sms))
        .route("/api/notifications/chat", post(send_chat))
        .route("/api/notifications/email", post(send_email))
        .route("/api/notifications/{id}", get(get_notification))
}

type SubmitResult = Result<(StatusCode, Json<SubmitResponse>), AppError>;

/// 202 for a fresh admission, 200 for a replayed key.
fn respond(admission: Admission) -> (StatusCode, Json<SubmitResponse>) {
    match admission {
        Admission::Admitted(notification) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                status: SubmitStatus::Accepted,
                id: Some(notification.id),
            }),
        ),
        Admission::Duplicate => (
            StatusCode::OK,
            Json(SubmitResponse {
                status: SubmitStatus::Duplicate,
                id: None,
            }),
        ),
    }
}

/// POST /api/notifications/sms: Queue an SMS.
async fn send_sms(
    State(state): State<AppState>,
    IdempotencyHeader(key): IdempotencyHeader,
    JsonBody(req): JsonBody<SendSmsRequest>,
) -> SubmitResult {
    let admission = state.intake.submit_sms(key, &req).await?;
    Ok(respond(admission))
}

/// POST /api/notifications/chat: Queue a chat message.
async fn send_chat(
    State(state): State<AppState>,
    IdempotencyHeader(key): IdempotencyHeader,
    JsonBody(req): JsonBody<SendChatRequest>,
) -> SubmitResult {
    let admission = state.intake.submit_chat(key, &req).await?;
    Ok(respond(admission))
}

/// POST /api/notifications/email: Queue an email.
async fn send_email(
    State(state): State<AppState>,
    IdempotencyHeader(key): IdempotencyHeader,
    JsonBody(req): JsonBody<SendEmailRequest>,
) -> SubmitResult {
    let admission = state.intake.submit_email(key, &req).await?;
    Ok(respond(admission))
}

/// GET /api/notifications/:id: Current delivery state of one notification.
async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = state.intake.find(id).await?;
    Ok(Json(notification))
}
