//! Site handler set
//!
//! The pages, the upload echo and the dispatcher that ties them together.
//! Both the long-lived server and the per-request edge adapter call
//! [`Site::handle`]; they only differ in how they build a [`SiteRequest`].

pub mod assets;
pub mod error;
pub mod pages;
pub mod router;
pub mod upload;

pub use error::SiteError;
pub use pages::{Page, Pages};
pub use router::Route;
pub use upload::{UploadEcho, UploadRecord};

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::http::request::Parts;
use hyper::{Method, Response};

use crate::config::Config;
use crate::http;
use assets::PublicAssets;

/// Adapter-neutral request with the body already buffered
#[derive(Debug, Clone)]
pub struct SiteRequest {
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl SiteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content_type: None,
            body: Bytes::new(),
        }
    }

    /// Build from request head and a body the adapter already buffered
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        Self::new(parts.method.clone(), parts.uri.path()).with_body(content_type, body)
    }

    #[must_use]
    pub fn with_body(mut self, content_type: Option<String>, body: Bytes) -> Self {
        self.content_type = content_type;
        self.body = body;
        self
    }
}

/// Immutable handler set shared by every request
#[derive(Debug, Clone)]
pub struct Site {
    pub(crate) pages: Pages,
    pub(crate) uploads: UploadEcho,
    pub(crate) assets: Option<PublicAssets>,
    server_name: String,
    max_body_size: u64,
}

impl Site {
    pub fn from_config(config: &Config) -> Self {
        let base_url = &config.site.public_base_url;
        Self {
            pages: Pages::new(base_url, config.site.pages_dir.clone()),
            uploads: UploadEcho::new(base_url, config.upload.max_file_size),
            assets: config.site.public_dir.clone().map(PublicAssets::new),
            server_name: config.http.server_name.clone(),
            max_body_size: config.http.max_body_size,
        }
    }

    /// Request body limit adapters enforce before calling [`Site::handle`]
    pub const fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    /// Dispatch one request; never fails
    pub async fn handle(&self, request: SiteRequest) -> Response<Full<Bytes>> {
        let response = router::dispatch(self, request).await;
        http::with_server_header(response, &self.server_name)
    }

    /// Response for a failure that happened before dispatch (e.g. body too large)
    pub async fn reject(&self, err: SiteError) -> Response<Full<Bytes>> {
        let response = router::error_response(self, err).await;
        http::with_server_header(response, &self.server_name)
    }
}
