use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod health;
mod middleware_auth;
mod middleware_errors;
pub mod tasks;

use health::health;

use crate::error::{handle_panic, AppError};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/api/tasks", post(tasks::routes::create).get(tasks::routes::list))
        .route(
            "/api/tasks/{id}",
            put(tasks::routes::update)
                .patch(tasks::routes::update)
                .delete(tasks::routes::delete),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_auth::require_auth,
        ));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api_router);

    with_fault_handling(app, state)
}

// Fallbacks and the layer stack every route is served behind.
fn with_fault_handling(router: Router<AppState>, state: AppState) -> Router {
    router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_errors::render_faults,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn root() -> &'static str {
    "Welcome to the Task API written in Rust"
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
