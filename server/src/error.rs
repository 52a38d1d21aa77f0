use std::fmt;

use anyhow::{Error as AnyError, anyhow};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use tracing::error;

#[derive(Debug, Clone, Copy)]
struct ErrorDescriptor {
    status: StatusCode,
    name: &'static str,
    error_type: &'static str,
    default_message: &'static str,
}

const VALIDATION_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::BAD_REQUEST,
    name: "VALIDATION_ERROR",
    error_type: "VALIDATION_ERROR",
    default_message: "Input failed validation.",
};

const UNAUTHENTICATED_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::UNAUTHORIZED,
    name: "UNAUTHENTICATED",
    error_type: "UNAUTHENTICATED",
    default_message: "You must sign in first to access this resource.",
};

const NOT_FOUND_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::NOT_FOUND,
    name: "NOT_FOUND",
    error_type: "RESOURCE_NOT_FOUND",
    default_message: "Resource not found.",
};

const INTERNAL_SERVER_ERROR_DESCRIPTOR: ErrorDescriptor = ErrorDescriptor {
    status: StatusCode::INTERNAL_SERVER_ERROR,
    name: "INTERNAL_SERVER_ERROR",
    error_type: "INTERNAL_SERVER_ERROR",
    default_message: "An internal error occurred.",
};

#[derive(Debug)]
pub struct AppError {
    descriptor: &'static ErrorDescriptor,
    name: String,
    error_type: String,
    message: String,
    data: Option<JsonValue>,
    source: Option<AnyError>,
}

impl AppError {
    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let field = field.to_owned();
        let message = format!("{field}: {reason}");

        Self::from_descriptor(&VALIDATION_DESCRIPTOR, Some(message))
            .with_data(json!({ "field": field, "reason": reason }))
    }

    pub(crate) fn validation_message(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::from_descriptor(&VALIDATION_DESCRIPTOR, Some(reason.clone()))
            .with_data(json!({ "reason": reason }))
    }

    pub(crate) fn unauthenticated() -> Self {
        Self::from_descriptor(&UNAUTHENTICATED_DESCRIPTOR, None)
    }

    #[allow(dead_code)]
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message.into()))
    }

    pub(crate) fn procedure_not_found(procedure: &str) -> Self {
        let procedure = procedure.to_owned();
        let message = format!("Procedure {procedure} not found.");

        Self::from_descriptor(&NOT_FOUND_DESCRIPTOR, Some(message))
            .with_name("PROCEDURE_NOT_FOUND")
            .with_data(json!({ "procedure": procedure }))
    }

    pub(crate) fn internal(error: AnyError) -> Self {
        error!(?error, "internal server error");
        Self::from_descriptor(&INTERNAL_SERVER_ERROR_DESCRIPTOR, None).with_source(error)
    }

    pub(crate) fn from_anyhow(error: AnyError) -> Self {
        Self::internal(error)
    }

    /// A handler produced an output its own contract rejects. Surfaced as an
    /// internal error; the payload is never coerced or passed through.
    pub(crate) fn output_contract_violation(procedure: &str, detail: &str) -> Self {
        Self::internal(anyhow!(
            "procedure {procedure} violated its output contract: {detail}"
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> StatusCode {
        self.descriptor.status
    }

    pub(crate) fn into_payload(self) -> (StatusCode, UserFriendlyPayload) {
        let AppError {
            descriptor,
            name,
            error_type,
            message,
            data,
            source: _,
        } = self;

        let status = descriptor.status;
        let (code, reason) = code_and_reason(status);
        let payload = UserFriendlyPayload {
            status: status.as_u16(),
            code,
            reason,
            error_type,
            name,
            message,
            data,
        };

        (status, payload)
    }

    fn from_descriptor(descriptor: &'static ErrorDescriptor, message: Option<String>) -> Self {
        Self {
            descriptor,
            name: descriptor.name.to_owned(),
            error_type: descriptor.error_type.to_owned(),
            message: message.unwrap_or_else(|| descriptor.default_message.to_owned()),
            data: None,
            source: None,
        }
    }

    fn with_source(mut self, error: AnyError) -> Self {
        self.source = Some(error);
        self
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = self.into_payload();
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserFriendlyPayload {
    pub(crate) status: u16,
    pub(crate) code: String,
    pub(crate) reason: String,
    #[serde(rename = "type")]
    pub(crate) error_type: String,
    pub(crate) name: String,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) data: Option<JsonValue>,
}

fn code_and_reason(status: StatusCode) -> (String, String) {
    let reason = status
        .canonical_reason()
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Status {}", status.as_u16()));

    let code = reason
        .chars()
        .map(|ch| match ch {
            'a'..='z' => ch.to_ascii_uppercase(),
            'A'..='Z' | '0'..='9' => ch,
            _ => '_',
        })
        .collect::<String>();

    (code, reason)
}
