//! Public asset serving
//!
//! Optional directory served for GET requests that match no fixed route.
//! A miss is not an error; the router answers it with the 404 page.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::http::mime;
use crate::logger;

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub struct PublicAssets {
    root: PathBuf,
}

impl PublicAssets {
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Load an asset for a request path, with index file support
    ///
    /// Returns `None` for missing files and for anything resolving outside the root.
    pub async fn load(&self, path: &str) -> Option<(Vec<u8>, &'static str)> {
        // Prevent directory traversal, then keep the path relative to the root
        let cleaned = path.replace("..", "");
        let relative_path = cleaned.trim_start_matches('/');
        let mut file_path = self.root.join(relative_path);

        let root_canonical = match fs::canonicalize(&self.root).await {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Public directory not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return None;
            }
        };

        if relative_path.is_empty() || relative_path.ends_with('/') || is_dir(&file_path).await {
            file_path = file_path.join(INDEX_FILE);
        }

        // File not found is common (404), no need to log at warning level
        let file_canonical = fs::canonicalize(&file_path).await.ok()?;
        if !file_canonical.starts_with(&root_canonical) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {}",
                file_path.display()
            ));
            return None;
        }

        let content = fs::read(&file_canonical).await.ok()?;
        Some((content, mime::content_type_for(&file_canonical)))
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}
