// Application state module
// Holds the loaded configuration and the shared handler set

use std::sync::Arc;
use tokio::sync::Notify;

use super::types::Config;
use crate::site::Site;

/// Application state shared by every connection of the long-lived server
pub struct AppState {
    pub config: Config,
    pub site: Arc<Site>,
    /// Notified once when the process should stop accepting connections
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            site: Arc::new(Site::from_config(config)),
            shutdown: Arc::new(Notify::new()),
        }
    }
}
