//! On-call server: Slack slash-command endpoint backed by SurrealDB.

mod config;
mod http;
mod slack;

use std::sync::Arc;

use clap::Parser;
use oncall_core::error::OncallError;
use oncall_db::repository::SurrealTeamStore;
use oncall_db::{DbError, DbManager};
use oncall_rotation::OncallService;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::http::AppState;
use crate::slack::{SlackClient, SlackError};

#[derive(Debug, Error)]
enum ServerError {
    #[error("database connection failed: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Slack(#[from] SlackError),

    #[error("failed to load state: {0}")]
    Bootstrap(#[from] OncallError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oncall=info")),
        )
        .json()
        .init();

    tracing::info!("Starting on-call server...");

    let config = args.oncall_config();

    let db = DbManager::connect(&args.db_config()).await?;
    db.ping().await?;
    oncall_db::run_migrations(db.client()).await?;

    let slack = SlackClient::new(
        &args.slack_api_url,
        &args.slack_api_token,
        config.operation_timeout,
    )?;

    let service = OncallService::new(SurrealTeamStore::new(db.client().clone()), slack, &config);
    service.bootstrap().await?;

    let app = http::router(
        Arc::new(AppState {
            service,
            token: args.slack_command_token.clone(),
            command: config.command.clone(),
        }),
        &args.command_endpoint,
    );

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    tracing::info!(listen = %args.listen, endpoint = %args.command_endpoint, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("On-call server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
