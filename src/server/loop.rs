// Server loop module
// Accepts connections until shutdown, then drains in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Accept loop.
///
/// Returns once shutdown is requested and open connections have finished or
/// `drain_timeout` has elapsed.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    signals: Arc<SignalHandler>,
    drain_timeout: Duration,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = signals.shutdown.notified() => break,
        }
    }

    // Stop accepting before waiting on open connections
    drop(listener);
    drain(&active_connections, drain_timeout).await;
}

async fn drain(active: &AtomicUsize, timeout: Duration) {
    let waited = tokio::time::timeout(timeout, async {
        while active.load(Ordering::SeqCst) > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;

    match waited {
        Ok(()) => logger::log_info("All connections closed"),
        Err(_) => logger::log_warning(&format!(
            "{} connection(s) still open after {}s, exiting",
            active.load(Ordering::SeqCst),
            timeout.as_secs()
        )),
    }
}
