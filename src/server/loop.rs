// Server loop module
// Accepts connections until shutdown is signalled, then drains in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the accept loop on `listener`
///
/// Returns once `state.shutdown` is notified and active connections have
/// finished, or the drain deadline (`performance.write_timeout`) has passed.
/// Idle keep-alive connections are closed as soon as shutdown starts.
pub async fn start_server_loop(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (closing_tx, closing_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            closing_rx.clone(),
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = state.shutdown.notified() => {
                logger::log_shutdown("shutdown signal received");
                break;
            }
        }
    }

    // Stop accepting, then tell open connections to wind down
    drop(listener);
    closing_tx.send_replace(true);
    drain_connections(&active_connections, state.config.performance.write_timeout).await;
    Ok(())
}

async fn drain_connections(active: &AtomicUsize, timeout_secs: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        let remaining = active.load(Ordering::SeqCst);
        if remaining == 0 {
            tracing::info!("All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Drain deadline passed with {remaining} connection(s) still open"
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
