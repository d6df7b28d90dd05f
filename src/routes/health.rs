use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthData {
    status: u16,
    storage: &'static str,
}

/// Liveness plus a storage round-trip; an unreachable store surfaces as a 500.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthData>, AppError> {
    state.tasks.ping().await?;

    let health_data = HealthData {
        status: StatusCode::OK.as_u16(),
        storage: "ok",
    };
    Ok(Json(health_data))
}
