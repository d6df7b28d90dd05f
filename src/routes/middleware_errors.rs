use axum::{
    extract::{Request, State},
    http::{header::ACCEPT, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::FaultReport;
use crate::state::AppState;

/// JSON is rendered for anything under `/api`, or when the client asks for a
/// JSON media type.
pub fn expects_json(headers: &HeaderMap, path: &str) -> bool {
    if path == "/api" || path.starts_with("/api/") {
        return true;
    }

    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|media| media.split(';').next().unwrap_or_default().trim())
        .any(|media| media.contains("/json") || media.ends_with("+json"))
}

/// Final say on error bodies: plain text for non-JSON clients, the raw fault
/// text added when debug is on.
pub async fn render_faults(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let wants_json = expects_json(req.headers(), req.uri().path());

    let mut response = next.run(req).await;

    let Some(report) = response.extensions_mut().remove::<FaultReport>() else {
        return response;
    };

    if !wants_json {
        return report.render_text();
    }

    if state.config.debug {
        return report.render_json(true);
    }

    response
}
