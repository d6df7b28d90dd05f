mod config;
mod error;
mod response;
mod routes;
mod state;

use std::sync::Arc;

use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::routes::tasks::{InMemoryTaskRepository, PgTaskRepository, TaskRepository, TaskService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repository: Arc<dyn TaskRepository> = match config.database_url.as_deref() {
        Some(url) => {
            let db = PgPool::connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            tracing::info!("storage: postgres, migrations applied");
            Arc::new(PgTaskRepository::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, tasks are kept in memory");
            Arc::new(InMemoryTaskRepository::new())
        }
    };

    if config.debug {
        tracing::warn!("APP_DEBUG is on, error responses include fault details");
    }

    let addr = config.addr();
    let state = state::AppState {
        tasks: TaskService::new(repository),
        config: Arc::new(config),
    };

    let app = routes::routes(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("server is listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
