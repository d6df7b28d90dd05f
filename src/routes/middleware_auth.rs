use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
#[allow(dead_code)]
struct Claims {
    sub: String,
    exp: usize,
    iat: usize,
}

/// Requires an HS256 bearer token when `JWT_SECRET` is configured; a no-op otherwise.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(secret) = state.config.jwt_secret.as_deref() else {
        return Ok(next.run(req).await);
    };

    let auth_header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(AppError::Unauthenticated("missing token".to_string())),
    };

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::Unauthenticated(format!("invalid token: {e}")))?;

    let subject = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::Unauthenticated("invalid subject".to_string()))?;

    let span = tracing::debug_span!("authenticated", %subject);
    Ok(next.run(req).instrument(span).await)
}
