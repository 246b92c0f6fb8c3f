use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use armory_runtime::rules::RuleViolation;
use armory_runtime::ArmoryError;

/// A JSON body sent back as-is with the given status.
#[derive(Debug, Clone)]
pub struct AppSuccess {
    pub status: StatusCode,
    pub data: Value,
}

impl AppSuccess {
    pub fn new(status: StatusCode, data: Value) -> Self {
        Self { status, data }
    }
}

impl IntoResponse for AppSuccess {
    fn into_response(self) -> Response {
        (self.status, Json(self.data)).into_response()
    }
}

/// Rendered as `{"erro": ...}`. `detail` is logged, never sent.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub erro: Value,
    detail: Option<String>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Display) -> Self {
        Self { status, erro: json!(message.to_string()), detail: None }
    }

    /// Field-level shape errors.
    pub fn shape(fields: Value) -> Self {
        Self { status: StatusCode::BAD_REQUEST, erro: fields, detail: None }
    }

    pub fn internal(detail: impl Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            erro: json!("internal server error"),
            detail: Some(detail.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("CODE: {}, MESSAGE: {}", self.status.as_u16(), self.detail.as_deref().unwrap_or_default());
        } else {
            tracing::warn!("CODE: {}, MESSAGE: {}", self.status.as_u16(), self.erro);
        }
        (self.status, Json(json!({ "erro": self.erro }))).into_response()
    }
}

/// `TimeoutLayer` answers 408 with an empty body; this wraps it in the usual envelope.
pub async fn timeout_envelope(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::new(StatusCode::REQUEST_TIMEOUT, "request timed out").into_response();
    }
    response
}

impl From<RuleViolation> for AppError {
    fn from(violation: RuleViolation) -> Self {
        let status = if violation.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::BAD_REQUEST };
        Self::new(status, violation)
    }
}

impl From<ArmoryError> for AppError {
    fn from(err: ArmoryError) -> Self {
        match err {
            ArmoryError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err),
            ArmoryError::Rule(violation) => violation.into(),
            ArmoryError::Database(e) => Self::internal(e),
        }
    }
}
