use futures::future;
use tokio::select;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Resolves once SIGINT or SIGTERM has been received
pub struct Shutdown {
    rx: watch::Receiver<Option<&'static str>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            rx: spawn_shutdown_listener(),
        }
    }

    /// Waits for a signal and returns its name.
    ///
    /// Never resolves if the signal listener could not be installed.
    pub async fn wait(mut self) -> &'static str {
        let received = self
            .rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|received| *received);
        match received {
            Some(name) => name,
            None => future::pending().await,
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_shutdown_listener() -> watch::Receiver<Option<&'static str>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(None);

    tokio::spawn(async move {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).ok();

        let int_future = async {
            match signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(e) => {
                    warn!("Failed to listen for SIGINT: {:?}", e);
                    future::pending::<&'static str>().await
                }
            }
        };

        let term_future = async {
            if let Some(ref mut sigterm) = sigterm {
                sigterm.recv().await;
                "SIGTERM"
            } else {
                future::pending::<&'static str>().await
            }
        };

        let received = select! {
            name = int_future => name,
            name = term_future => name,
        };
        info!("Received {}.", received);
        let _ = shutdown_tx.send(Some(received));
    });

    shutdown_rx
}
