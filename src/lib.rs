use std::sync::Arc;

use self::cli::Cli;
use self::handler::HandlerContext;
use self::router::AppState;
use self::server::Shutdown;
use self::store::KubeStore;
use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_error::ExtractSpanTrace;
use tracing_error::SpanTrace;

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod kubernetes_objects;
pub mod models;
pub mod router;
pub mod server;
pub mod spec_builder;
pub mod store;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load config.\n{0}")]
    ConfigError(#[from] config::ConfigLoadError),

    #[error("Failed to initialize kubernetes client.\n{0}")]
    KubeClientError(#[from] kube::Error),

    #[error("HTTP server stopped due to following error:\n{0}")]
    ServerError(#[from] std::io::Error),
}

impl ExtractSpanTrace for AppError {
    fn span_trace(&self) -> Option<&SpanTrace> {
        None
    }
}

pub async fn app() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut config = config::Config::new_from_file(&cli.config).await?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    info!(
        "Config Loaded. Scheduling for component '{}' of deployment '{}' in namespace '{}'.",
        config.component_name, config.deployment_name, config.namespace
    );

    let client = kube::Client::try_default().await?;

    info!("Kubernetes Client Initialized.");

    let shutdown = Shutdown::new();
    let port = config.port;
    let store = KubeStore::new(client, config.namespace.clone());
    let context = Arc::new(HandlerContext::new(store, config));
    let router = router::router(AppState::new(context));

    server::serve(router, port, shutdown).await?;

    info!("Server stopped.");
    Ok(())
}
