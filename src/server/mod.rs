// Server module entry point
// Long-lived HTTP/1.1 adapter: listener, connection handling, shutdown signals

pub mod connection;
pub mod listener;
pub mod signal;

// Rust does not allow `loop` as a module name (keyword), so use server_loop
#[path = "loop.rs"]
pub mod server_loop;

use std::sync::Arc;

use crate::config::AppState;
use crate::logger;

// Re-export commonly used items
pub use listener::create_reusable_listener;
pub use server_loop::start_server_loop;

/// Bind the configured address and serve until SIGINT/SIGTERM
pub async fn run(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = state.config.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &state.config);
    signal::start_signal_handler(Arc::clone(&state.shutdown))?;

    start_server_loop(listener, state).await?;
    Ok(())
}
