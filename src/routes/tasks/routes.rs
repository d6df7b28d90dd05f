use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Form, FromRequest, FromRequestParts, Path, Request, State},
    http::{header::CONTENT_TYPE, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::model::Task;
use super::validation::{validate_new_task, validate_task_changes};
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// The task named by the `{id}` path segment, loaded before the handler
/// body runs. Unknown or malformed ids are `NotFound`.
pub struct BoundTask(pub Task);

impl FromRequestParts<AppState> for BoundTask {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound)?;
        let id = Uuid::parse_str(&raw_id).map_err(|_| AppError::NotFound)?;

        state
            .tasks
            .find_by_id(id)
            .await?
            .map(BoundTask)
            .ok_or(AppError::NotFound)
    }
}

/// Request body as a key/value map, the shape the validator works on.
///
/// An empty body decodes to an empty map whatever its content type, so a
/// create reports every required field and an update changes nothing.
/// JSON and urlencoded form bodies are accepted; a non-object JSON value
/// also becomes an empty map. Unparsable JSON is a 400, any other media
/// type a 415.
pub struct InputFields(pub Map<String, Value>);

impl<S> FromRequest<S> for InputFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let media_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if media_type == "application/x-www-form-urlencoded" {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Http {
                    status: rejection.status(),
                    message: Some(rejection.body_text()),
                })?;

            return Ok(InputFields(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            ));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Http {
                status: rejection.status(),
                message: Some(rejection.body_text()),
            })?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(InputFields(Map::new()));
        }

        if !is_json_media_type(&media_type) {
            return Err(AppError::Http {
                status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
                message: Some(
                    "Expected request with `Content-Type: application/json`".to_string(),
                ),
            });
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| AppError::Http {
            status: StatusCode::BAD_REQUEST,
            message: Some(format!("Failed to parse the request body as JSON: {e}")),
        })?;

        match value {
            Value::Object(map) => Ok(InputFields(map)),
            _ => Ok(InputFields(Map::new())),
        }
    }
}

fn is_json_media_type(media_type: &str) -> bool {
    media_type == "application/json"
        || (media_type.starts_with("application/") && media_type.ends_with("+json"))
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let tasks = state.tasks.find_all().await?;
    Ok(ApiResponse::ok(tasks, "Tasks retrieved successfully"))
}

pub async fn create(
    State(state): State<AppState>,
    InputFields(body): InputFields,
) -> Result<Response, AppError> {
    let input = validate_new_task(&body)?;
    let task = state.tasks.create(input).await?;

    tracing::info!(task_id = %task.id, "task created");

    Ok(ApiResponse::ok(task, "Task created successfully").with_status(StatusCode::CREATED))
}

pub async fn update(
    State(state): State<AppState>,
    BoundTask(task): BoundTask,
    InputFields(body): InputFields,
) -> Result<impl IntoResponse, AppError> {
    let changes = validate_task_changes(&body)?;
    let task = state.tasks.update(task, changes).await?;

    tracing::info!(task_id = %task.id, "task updated");

    Ok(ApiResponse::ok(task, "Task updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    BoundTask(task): BoundTask,
) -> Result<StatusCode, AppError> {
    let id = task.id;
    state.tasks.delete(task).await?;

    tracing::info!(task_id = %id, "task deleted");

    Ok(StatusCode::NO_CONTENT)
}
