//! Shutdown signal handling.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `cancel` when the process receives Ctrl+C or SIGTERM.
///
/// The listener exits on its own once the token is cancelled elsewhere, e.g.
/// when a bounded run finishes.
pub fn cancel_on_signal(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                info!("Received shutdown signal, draining producers");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}

/// Stop the signal listener after the pool has returned.
pub async fn release(cancel: CancellationToken, listener: JoinHandle<()>) {
    cancel.cancel();
    if let Err(join_err) = listener.await {
        error!("Signal listener aborted: {join_err}");
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
