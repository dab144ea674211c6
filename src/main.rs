//! dbops-webhook - admission webhook for database ops and schema requests.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Creates the Kubernetes client backing the object store
//! - Starts the health server and the TLS webhook server

use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio::signal;
use tracing::{error, info, info_span};

use dbops_webhook::health::{HealthState, run_health_server};
use dbops_webhook::{KubeStore, WebhookConfig, WebhookState, run_webhook_server};

/// Grace period for in-flight admission calls to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dbops_webhook=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting dbops-webhook");

    let config = WebhookConfig::from_env()?;
    info!(
        port = config.port,
        health_port = config.health_port,
        cert_path = %config.cert_path.display(),
        "Loaded webhook configuration"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());

    // Probes should answer before the webhook listener is up
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    let state = Arc::new(WebhookState::new(
        Arc::new(KubeStore::new(client)),
        health_state.clone(),
        info_span!("admission"),
    ));

    let webhook_handle = {
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = run_webhook_server(state, &config).await {
                error!("Webhook server error: {}", e);
            }
        })
    };

    tokio::select! {
        result = webhook_handle => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Stop receiving new admission calls
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;
            info!("Grace period complete, shutting down");
        }
    }

    info!("Webhook stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Signal handler setup failures are fatal.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
