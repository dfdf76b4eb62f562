//! Fixed HTML pages
//!
//! Every page ships embedded in the binary. When a pages directory is
//! configured, pages are read from it instead, using the same relative names.

use hyper::StatusCode;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::SiteError;

/// Placeholder replaced with the configured public base URL
const BASE_URL_PLACEHOLDER: &str = "{{base_url}}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    NotFound,
    InternalError,
    BadGateway,
    Upload,
    CdnTest,
}

impl Page {
    pub const ALL: [Self; 6] = [
        Self::Home,
        Self::NotFound,
        Self::InternalError,
        Self::BadGateway,
        Self::Upload,
        Self::CdnTest,
    ];

    /// Status code the page is served with
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Home | Self::Upload | Self::CdnTest => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
        }
    }

    /// File name relative to the pages directory
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Home => "index.html",
            Self::NotFound => "error/404.html",
            Self::InternalError => "error/500.html",
            Self::BadGateway => "error/502.html",
            Self::Upload => "upload.html",
            Self::CdnTest => "test.html",
        }
    }

    const fn embedded(self) -> &'static str {
        match self {
            Self::Home => include_str!("pages/index.html"),
            Self::NotFound => include_str!("pages/error/404.html"),
            Self::InternalError => include_str!("pages/error/500.html"),
            Self::BadGateway => include_str!("pages/error/502.html"),
            Self::Upload => include_str!("pages/upload.html"),
            Self::CdnTest => include_str!("pages/test.html"),
        }
    }
}

/// Page renderer bound to one site configuration
#[derive(Debug, Clone)]
pub struct Pages {
    base_url: String,
    override_dir: Option<PathBuf>,
}

impl Pages {
    pub fn new(base_url: &str, override_dir: Option<PathBuf>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            override_dir,
        }
    }

    /// Render a page, reading it from the override directory if one is set
    pub async fn render(&self, page: Page) -> Result<String, SiteError> {
        match &self.override_dir {
            Some(dir) => {
                let template = load_override(dir, page).await?;
                Ok(self.fill(&template))
            }
            None => Ok(self.render_embedded(page)),
        }
    }

    /// Render the built-in copy; never fails
    pub fn render_embedded(&self, page: Page) -> String {
        self.fill(page.embedded())
    }

    fn fill(&self, template: &str) -> String {
        template.replace(BASE_URL_PLACEHOLDER, &self.base_url)
    }
}

async fn load_override(dir: &Path, page: Page) -> Result<String, SiteError> {
    let path = dir.join(page.file_name());
    fs::read_to_string(&path)
        .await
        .map_err(|e| SiteError::Internal(format!("Failed to load page {}: {e}", path.display())))
}
