//! Request routing dispatch module
//!
//! Exact-match routing on method and path. Unmatched requests get the 404
//! page; internal failures are logged and answered with the 500 page.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};

use super::pages::Page;
use super::{Site, SiteError, SiteRequest};
use crate::http;
use crate::logger;

/// Handler selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Page(Page),
    Upload,
}

/// Resolve method and path to a route by exact string equality
pub fn resolve(method: &Method, path: &str) -> Option<Route> {
    match (method, path) {
        (&Method::GET, "/") => Some(Route::Page(Page::Home)),
        (&Method::GET, "/error/404") => Some(Route::Page(Page::NotFound)),
        (&Method::GET, "/error/500") => Some(Route::Page(Page::InternalError)),
        (&Method::GET, "/error/502") => Some(Route::Page(Page::BadGateway)),
        (&Method::GET, "/upload") => Some(Route::Page(Page::Upload)),
        (&Method::GET, "/test") => Some(Route::Page(Page::CdnTest)),
        (&Method::POST, "/api/upload") => Some(Route::Upload),
        _ => None,
    }
}

/// Main entry point for request dispatch
pub async fn dispatch(site: &Site, request: SiteRequest) -> Response<Full<Bytes>> {
    let result = match resolve(&request.method, &request.path) {
        Some(Route::Page(page)) => serve_page(site, page).await,
        Some(Route::Upload) => serve_upload(site, request).await,
        None => serve_fallback(site, &request).await,
    };

    match result {
        Ok(response) => response,
        Err(err) => error_response(site, err).await,
    }
}

/// Turn a handler failure into a response
///
/// Client errors become JSON `{error}` bodies; internal ones the 500 page.
pub async fn error_response(site: &Site, err: SiteError) -> Response<Full<Bytes>> {
    if err.is_internal() {
        logger::log_error(&format!("Request failed: {err}"));
        return internal_error_page(site).await;
    }
    http::build_json_response(err.status(), &err.body())
}

async fn serve_page(site: &Site, page: Page) -> Result<Response<Full<Bytes>>, SiteError> {
    let html = site.pages.render(page).await?;
    Ok(http::build_html_response(page.status(), html))
}

async fn serve_upload(site: &Site, request: SiteRequest) -> Result<Response<Full<Bytes>>, SiteError> {
    let record = site
        .uploads
        .handle(request.content_type.as_deref(), request.body)
        .await?;
    logger::log_upload(&record.original_name, record.size, &record.filename);
    Ok(http::build_json_response(StatusCode::OK, &record))
}

/// Unmatched request: public asset if one exists, otherwise the 404 page
async fn serve_fallback(
    site: &Site,
    request: &SiteRequest,
) -> Result<Response<Full<Bytes>>, SiteError> {
    if request.method == Method::GET {
        if let Some(assets) = &site.assets {
            if let Some((content, content_type)) = assets.load(&request.path).await {
                return Ok(http::build_static_file_response(content, content_type));
            }
        }
    }
    serve_page(site, Page::NotFound).await
}

/// 500 page, falling back to the embedded copy if the configured one fails
async fn internal_error_page(site: &Site) -> Response<Full<Bytes>> {
    let html = match site.pages.render(Page::InternalError).await {
        Ok(html) => html,
        Err(e) => {
            logger::log_warning(&format!("Falling back to built-in 500 page: {e}"));
            site.pages.render_embedded(Page::InternalError)
        }
    };
    http::build_html_response(StatusCode::INTERNAL_SERVER_ERROR, html)
}
