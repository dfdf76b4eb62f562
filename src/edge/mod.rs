//! Edge adapter
//!
//! Stateless entry point for runtimes that hand over one fully buffered
//! request per invocation. [`handle`] can be embedded by any host; [`cgi`]
//! wires it to a CGI/1.1 process.

pub mod cgi;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response};

use crate::http;
use crate::site::{Site, SiteError, SiteRequest};

/// Serve one buffered request with the shared handler set
///
/// The body limit is checked against `Content-Length` and the actual body
/// length, since the host has already read it.
pub async fn handle(site: &Site, request: Request<Bytes>) -> Response<Bytes> {
    let (parts, body) = request.into_parts();
    let limit = site.max_body_size();

    let response = match http::check_content_length(&parts.headers, limit) {
        Err(err) => site.reject(err).await,
        Ok(()) if body.len() as u64 > limit => site.reject(SiteError::PayloadTooLarge).await,
        Ok(()) => site.handle(SiteRequest::from_parts(&parts, body)).await,
    };

    buffered(response).await
}

/// Flatten a handler response into a fully buffered one
pub(crate) async fn buffered(response: Response<Full<Bytes>>) -> Response<Bytes> {
    let (parts, body) = response.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    Response::from_parts(parts, bytes)
}
