use std::any::Any;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Every fault a request can end in. Handlers, extractors and middleware
/// return this and the mapper below is the only place that turns it into a
/// client-visible response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("resource not found")]
    NotFound,

    #[error("not authenticated: {0}")]
    Unauthenticated(String),

    // no producer in this crate
    #[allow(dead_code)]
    #[error("not authorized: {0}")]
    Forbidden(String),

    #[allow(dead_code)]
    #[error("rate limit exceeded")]
    RateLimited,

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("http error {status}: {}", .message.as_deref().unwrap_or("HTTP error"))]
    Http {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("{0}")]
    Unexpected(String),
}

/// Field name to the reasons it was rejected, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, the collected errors otherwise.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "invalid fields [{}]", names.join(", "))
    }
}

/// Maps a fault to the status and client-facing message it is reported with.
pub fn classify(error: &AppError) -> (StatusCode, Cow<'static, str>) {
    match error {
        AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".into()),
        AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "Not authenticated".into()),
        AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "Not authorized".into()),
        AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "Validation error".into()),
        AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Database error".into()),
        AppError::MethodNotAllowed => (
            StatusCode::METHOD_NOT_ALLOWED,
            "HTTP method not allowed".into(),
        ),
        AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Too many requests".into()),
        AppError::Http { status, message } => {
            let message = match message.as_deref().map(str::trim) {
                Some(m) if !m.is_empty() => Cow::Owned(m.to_string()),
                _ => Cow::Borrowed("HTTP error"),
            };
            (*status, message)
        }
        AppError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Unexpected error".into()),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Attached to every error response so `render_faults` can re-render it
/// once it knows what the client accepts and whether debug output is on.
#[derive(Debug, Clone)]
pub struct FaultReport {
    pub status: StatusCode,
    pub body: ErrorBody,
    /// Raw fault text; `None` for validation failures, which never carry it.
    pub detail: Option<String>,
}

impl FaultReport {
    pub fn render_json(mut self, debug: bool) -> Response {
        if debug {
            self.body.error = self.detail;
        }
        (self.status, Json(self.body)).into_response()
    }

    pub fn render_text(self) -> Response {
        (self.status, self.body.message).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = classify(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let (errors, detail) = match self {
            AppError::Validation(invalid) => (Some(invalid.fields), None),
            other => (None, Some(other.to_string())),
        };

        let report = FaultReport {
            status,
            body: ErrorBody {
                success: false,
                message: message.into_owned(),
                errors,
                error: None,
            },
            detail,
        };

        let mut response = (status, Json(&report.body)).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

/// Panic handler for `CatchPanicLayer`: a panicking handler becomes an
/// `Unexpected` fault like any other.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    AppError::Unexpected(detail).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(AppError::NotFound, 404, "Resource not found")]
    #[case(AppError::Unauthenticated("no token".into()), 401, "Not authenticated")]
    #[case(AppError::Forbidden("nope".into()), 403, "Not authorized")]
    #[case(AppError::Validation(ValidationErrors::new()), 422, "Validation error")]
    #[case(AppError::Storage(sqlx::Error::PoolTimedOut), 500, "Database error")]
    #[case(AppError::MethodNotAllowed, 405, "HTTP method not allowed")]
    #[case(AppError::RateLimited, 429, "Too many requests")]
    #[case(AppError::Unexpected("boom".into()), 500, "Unexpected error")]
    fn classify_follows_the_table(
        #[case] error: AppError,
        #[case] status: u16,
        #[case] message: &str,
    ) {
        let (got_status, got_message) = classify(&error);
        assert_eq!(got_status.as_u16(), status);
        assert_eq!(got_message, message);
    }

    #[test]
    fn http_fault_keeps_its_status_and_message() {
        let error = AppError::Http {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: Some("Body too big".into()),
        };
        let (status, message) = classify(&error);
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(message, "Body too big");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(String::new()))]
    #[case(Some("   ".to_string()))]
    fn http_fault_without_message_falls_back(#[case] message: Option<String>) {
        let error = AppError::Http {
            status: StatusCode::BAD_REQUEST,
            message,
        };
        assert_eq!(classify(&error).1, "HTTP error");
    }

    #[tokio::test]
    async fn validation_response_carries_field_map() {
        let mut invalid = ValidationErrors::new();
        invalid.add("title", "The title field is required.");
        invalid.add("title", "second reason");

        let response = AppError::Validation(invalid).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let report = response.extensions().get::<FaultReport>().cloned().unwrap();
        assert!(report.detail.is_none());

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Validation error");
        assert_eq!(json["errors"]["title"].as_array().unwrap().len(), 2);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn storage_response_hides_detail_by_default() {
        let response =
            AppError::Storage(sqlx::Error::Protocol("connection reset".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Database error");
        assert!(json.get("error").is_none());
        assert!(json.get("errors").is_none());
    }

    #[tokio::test]
    async fn report_renders_detail_only_in_debug() {
        let response =
            AppError::Storage(sqlx::Error::Protocol("connection reset".into())).into_response();
        let report = response.extensions().get::<FaultReport>().cloned().unwrap();

        let quiet = body_json(report.clone().render_json(false)).await;
        assert!(quiet.get("error").is_none());

        let loud = body_json(report.render_json(true)).await;
        assert!(loud["error"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn report_renders_plain_text() {
        let response = AppError::NotFound.into_response();
        let report = response.extensions().get::<FaultReport>().cloned().unwrap();

        let text = report.render_text();
        assert_eq!(text.status(), StatusCode::NOT_FOUND);
        let bytes = text.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Resource not found");
    }

    #[tokio::test]
    async fn panic_payload_becomes_unexpected_fault() {
        let response = handle_panic(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = response.extensions().get::<FaultReport>().cloned().unwrap();
        assert_eq!(report.detail.as_deref(), Some("kaboom"));
        assert_eq!(body_json(response).await["message"], "Unexpected error");
    }
}
