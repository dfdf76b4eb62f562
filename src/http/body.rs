//! Request body reading module
//!
//! Enforces the request body limit before and while a body is buffered.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, CONTENT_LENGTH};

use crate::logger;
use crate::site::SiteError;

/// Validate Content-Length header against the body limit
///
/// A missing or unparsable header is not an error here; the limit is
/// enforced again while the body is read.
pub fn check_content_length(headers: &HeaderMap, max_body_size: u64) -> Result<(), SiteError> {
    let Some(content_length) = headers.get(CONTENT_LENGTH) else {
        return Ok(());
    };
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return Ok(());
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Err(SiteError::PayloadTooLarge)
        }
        Ok(_) => Ok(()),
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            Ok(())
        }
    }
}

/// Buffer a request body, failing with 413 once it exceeds `max_body_size`
pub async fn read_limited<B>(body: B, max_body_size: u64) -> Result<Bytes, SiteError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Request body exceeded {max_body_size} bytes while reading"
            ));
            Err(SiteError::PayloadTooLarge)
        }
        Err(e) => Err(SiteError::BadRequest(format!(
            "Failed to read request body: {e}"
        ))),
    }
}
