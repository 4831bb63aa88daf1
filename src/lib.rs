pub mod api;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod logging;
pub mod mail;
pub mod metrics;
pub mod model;
pub mod report;
pub mod state;
pub mod store;
pub mod validation;

pub use config::{CliArgs, MailConfig, MailTransportKind, ServerConfig, SmtpSecurity};
pub use directory::{Directory, ExtensionSavedHook};
pub use dispatcher::{DispatchSummary, NotificationDispatcher};
pub use error::{DirectoryError, DispatchError, ErrorCode, MailError, ReportError};
pub use logging::{LoggingConfig, init_logging};
pub use mail::{MailAttachment, MailTransport, OutgoingMessage};
pub use report::{ReportDocument, generate_report};
pub use store::{DirectoryStore, InMemoryDirectoryStore};

use anyhow::Result;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::from_config(config.clone())?);

    tracing::info!(
        bind = %config.http_bind_address,
        mail_transport = %config.mail.transport,
        from = %config.mail.from_address,
        "starting intercom directory",
    );

    let router = api::router(state);
    let listener = TcpListener::bind(config.http_bind_address).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(bind = %actual_addr, "listening");

    let grace = Duration::from_secs(config.graceful_shutdown_timeout_secs);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(grace))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, then arms a hard deadline for in-flight requests.
async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!(grace_secs = grace.as_secs(), "shutdown requested");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!("graceful shutdown timed out; exiting");
        std::process::exit(1);
    });
}
