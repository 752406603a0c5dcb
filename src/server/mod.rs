pub mod shutdown;

use std::net::{Ipv4Addr, SocketAddr};

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, instrument};

pub use self::shutdown::Shutdown;

/// Serves `router` on `port` until SIGINT or SIGTERM.
///
/// On a signal the listener stops accepting connections and in-flight
/// requests run to completion.
#[instrument("server/serve", skip(router, shutdown))]
pub async fn serve(router: Router, port: u16, shutdown: Shutdown) -> std::io::Result<()> {
    let address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = TcpListener::bind(address).await?;
    info!("Listening on {}.", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let signal = shutdown.wait().await;
            info!("{} received, finishing in-flight requests.", signal);
        })
        .await
}
