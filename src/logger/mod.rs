//! Logger module
//!
//! Logging helpers for the site, backed by `tracing`:
//! - Server lifecycle logging
//! - Access logging with multiple formats (target `access`)
//! - Error and warning logging
//! - Optional file output
//!
//! Everything goes to stderr unless a log file is configured, so the CGI
//! adapter can keep stdout for the response.

mod format;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use std::fs::{File, OpenOptions};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber
///
/// `RUST_LOG` wins over `logging.level` when set. Should be called once at startup.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_file.as_deref() {
        Some(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()?;
        }
        None => builder.with_writer(std::io::stderr).try_init()?,
    }
    Ok(())
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> std::io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!("Debug site listening on http://{addr}");
    tracing::info!("Public base URL: {}", config.site.public_base_url);
    if let Some(workers) = config.server.workers {
        tracing::info!("Worker threads: {workers}");
    }
    if let Some(dir) = &config.site.pages_dir {
        tracing::info!("Page overrides: {}", dir.display());
    }
    if let Some(dir) = &config.site.public_dir {
        tracing::info!("Public assets: {}", dir.display());
    }
    tracing::info!(
        "Upload limit: {} bytes (body limit {} bytes)",
        config.upload.max_file_size,
        config.http.max_body_size
    );
}

pub fn log_shutdown(reason: &str) {
    tracing::info!("Shutting down: {reason}");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    tracing::error!("Failed to serve connection: {err:?}");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

pub fn log_upload(original_name: &str, size: u64, filename: &str) {
    tracing::debug!("Echoed upload '{original_name}' ({size} bytes) as {filename}");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: "access", "{}", entry.format(format));
}
