//! CGI/1.1 adapter
//!
//! Every invocation serves exactly one request: meta-variables come from the
//! environment, the body from stdin, and the response goes to stdout as a
//! `Status:` line, header lines, a blank line and the body. Logging never
//! touches stdout.

use std::io::Write;
use std::time::Instant;

use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, REFERER, USER_AGENT};
use hyper::{Method, Request, Response, Uri};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::LoggingConfig;
use crate::logger::{self, AccessLogEntry};
use crate::site::{Site, SiteError};

/// Bytes escaped when a decoded `PATH_INFO` is put back into a URI: all but
/// unreserved characters, sub-delims, `:`, `@` and `/`
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Meta-variables describing one CGI request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CgiEnv {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub remote_addr: Option<String>,
}

impl CgiEnv {
    /// Read the meta-variables through `var`, usually `std::env::var`
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| var(name).filter(|v| !v.is_empty());

        let path = non_empty("PATH_INFO")
            .or_else(|| non_empty("SCRIPT_NAME"))
            .or_else(|| {
                non_empty("REQUEST_URI")
                    .map(|uri| uri.split('?').next().unwrap_or_default().to_string())
            })
            .unwrap_or_else(|| "/".to_string());

        Self {
            method: non_empty("REQUEST_METHOD").unwrap_or_else(|| "GET".to_string()),
            path,
            query: non_empty("QUERY_STRING"),
            content_type: non_empty("CONTENT_TYPE"),
            content_length: non_empty("CONTENT_LENGTH").and_then(|v| v.trim().parse().ok()),
            referer: non_empty("HTTP_REFERER"),
            user_agent: non_empty("HTTP_USER_AGENT"),
            remote_addr: non_empty("REMOTE_ADDR"),
        }
    }

    pub fn from_process_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn access_entry(&self) -> AccessLogEntry {
        let remote = self.remote_addr.as_deref().unwrap_or("-");
        let mut entry = AccessLogEntry::new(remote, self.method.as_str(), self.path.as_str());
        entry.query.clone_from(&self.query);
        entry.referer.clone_from(&self.referer);
        entry.user_agent.clone_from(&self.user_agent);
        entry
    }

    /// `PATH_INFO` arrives decoded; escape it again so any path yields a URI
    ///
    /// A query string that still does not parse is dropped, routing ignores it.
    fn request_uri(&self) -> Uri {
        let mut path = utf8_percent_encode(&self.path, PATH_ESCAPE).to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        if let Some(query) = &self.query {
            match format!("{path}?{query}").parse::<Uri>() {
                Ok(uri) => return uri,
                Err(e) => logger::log_warning(&format!("Ignoring QUERY_STRING '{query}': {e}")),
            }
        }
        // only pchar bytes are left unescaped, so this always parses
        path.parse().unwrap_or_default()
    }

    /// Rebuild the HTTP request the web server received
    pub fn to_request(&self, body: Bytes) -> Result<Request<Bytes>, SiteError> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|e| SiteError::BadRequest(format!("Invalid REQUEST_METHOD: {e}")))?;

        let mut builder = Request::builder().method(method).uri(self.request_uri());
        if let Some(ct) = &self.content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        if let Some(len) = self.content_length {
            builder = builder.header(CONTENT_LENGTH, len);
        }
        if let Some(referer) = &self.referer {
            builder = builder.header(REFERER, referer);
        }
        if let Some(ua) = &self.user_agent {
            builder = builder.header(USER_AGENT, ua);
        }
        builder
            .body(body)
            .map_err(|e| SiteError::BadRequest(format!("Invalid CGI request: {e}")))
    }
}

/// Write a response in CGI form
pub fn write_response<W: Write>(out: &mut W, response: &Response<Bytes>) -> std::io::Result<()> {
    let status = response.status();
    write!(
        out,
        "Status: {} {}\r\n",
        status.as_str(),
        status.canonical_reason().unwrap_or("")
    )?;
    for (name, value) in response.headers() {
        out.write_all(name.as_str().as_bytes())?;
        out.write_all(b": ")?;
        out.write_all(value.as_bytes())?;
        out.write_all(b"\r\n")?;
    }
    out.write_all(b"\r\n")?;
    out.write_all(response.body())?;
    out.flush()
}

/// Serve the single request of this process
///
/// Only a failure to write stdout is returned; everything before that ends
/// up as a response.
pub async fn run(site: &Site, logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let env = CgiEnv::from_process_env();
    let response = respond(site, &env, tokio::io::stdin()).await;

    if logging.access_log {
        let mut entry = env.access_entry();
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().len();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &logging.access_log_format);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_response(&mut out, &response)?;
    Ok(())
}

/// Answer the request described by `env`, reading its body from `input`
pub async fn respond<R>(site: &Site, env: &CgiEnv, input: R) -> Response<Bytes>
where
    R: AsyncRead + Unpin,
{
    let request = read_body(input, env.content_length, site.max_body_size())
        .await
        .map_err(SiteError::from)
        .and_then(|body| env.to_request(body));

    match request {
        Ok(request) => super::handle(site, request).await,
        Err(err) => super::buffered(site.reject(err).await).await,
    }
}

/// Read exactly `CONTENT_LENGTH` bytes; nothing when it is absent or over the limit
async fn read_body<R>(input: R, content_length: Option<u64>, max_body_size: u64) -> std::io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let Some(len) = content_length.filter(|len| *len > 0 && *len <= max_body_size) else {
        return Ok(Bytes::new());
    };
    let mut buf = Vec::new();
    input.take(len).read_to_end(&mut buf).await?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::SiteRequest;
    use crate::site::upload::tests::{multipart_body, multipart_content_type};
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// stdin that breaks on the first read
    struct BrokenInput;

    impl AsyncRead for BrokenInput {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stdin closed",
            )))
        }
    }

    fn default_site() -> Site {
        Site::from_config(&Config::load_from("definitely-not-a-config-file").unwrap())
    }

    fn env_of(vars: &[(&str, &str)]) -> CgiEnv {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CgiEnv::from_vars(|name| map.get(name).cloned())
    }

    #[test]
    fn test_from_vars() {
        let env = env_of(&[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/api/upload"),
            ("QUERY_STRING", ""),
            ("CONTENT_TYPE", "multipart/form-data; boundary=x"),
            ("CONTENT_LENGTH", "42"),
            ("HTTP_USER_AGENT", "curl/8.0"),
            ("REMOTE_ADDR", "10.1.2.3"),
        ]);
        assert_eq!(env.method, "POST");
        assert_eq!(env.path, "/api/upload");
        assert_eq!(env.query, None);
        assert_eq!(env.content_length, Some(42));
        assert_eq!(env.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(env.remote_addr.as_deref(), Some("10.1.2.3"));
        assert_eq!(env.referer, None);
    }

    #[test]
    fn test_path_fallbacks() {
        assert_eq!(env_of(&[]).path, "/");
        assert_eq!(env_of(&[]).method, "GET");
        assert_eq!(env_of(&[("SCRIPT_NAME", "/test")]).path, "/test");
        assert_eq!(
            env_of(&[("PATH_INFO", ""), ("REQUEST_URI", "/upload?x=1")]).path,
            "/upload"
        );
    }

    #[test]
    fn test_access_entry() {
        let env = env_of(&[
            ("PATH_INFO", "/test"),
            ("QUERY_STRING", "v=2"),
            ("HTTP_REFERER", "https://tool.example.com/"),
        ]);
        let log = env.access_entry().format("$remote_addr $request_uri $http_referer");
        assert_eq!(log, "- /test?v=2 https://tool.example.com/");
    }

    #[test]
    fn test_bad_method() {
        let env = env_of(&[("REQUEST_METHOD", "GE T")]);
        assert!(matches!(
            env.to_request(Bytes::new()),
            Err(SiteError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_decoded_path_info_is_not_found() {
        let site = default_site();
        let env = env_of(&[("REQUEST_METHOD", "GET"), ("PATH_INFO", "/no such page")]);
        let request = env.to_request(Bytes::new()).unwrap();
        assert_eq!(request.uri().path(), "/no%20such%20page");

        let response = respond(&site, &env, tokio::io::empty()).await;
        assert_eq!(response.status(), 404);
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
        assert!(String::from_utf8_lossy(response.body()).contains("<h1>404</h1>"));

        // a query string that cannot go into a URI is dropped, the path still routes
        let env = env_of(&[("PATH_INFO", "/test"), ("QUERY_STRING", "a b")]);
        let response = respond(&site, &env, tokio::io::empty()).await;
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_stdin_failure_serves_500_page() {
        let site = default_site();
        let env = env_of(&[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/api/upload"),
            ("CONTENT_LENGTH", "64"),
        ]);
        let response = respond(&site, &env, BrokenInput).await;
        assert_eq!(response.status(), 500);
        assert!(String::from_utf8_lossy(response.body()).contains("<h1>500</h1>"));

        let mut out = Vec::new();
        write_response(&mut out, &response).unwrap();
        assert!(out.starts_with(b"Status: 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn test_upload_body_from_input() {
        let site = default_site();
        let body = multipart_body(&[("file", Some("notes.txt"), "hello cgi")]);
        let content_length = body.len().to_string();
        let content_type = multipart_content_type();
        let env = env_of(&[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/api/upload"),
            ("CONTENT_TYPE", content_type.as_str()),
            ("CONTENT_LENGTH", content_length.as_str()),
        ]);
        let response = respond(&site, &env, &body[..]).await;
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(json["originalName"], "notes.txt");
        assert_eq!(json["size"], 9);
    }

    #[test]
    fn test_write_response() {
        let response = Response::builder()
            .status(404)
            .header("content-type", "text/html; charset=utf-8")
            .body(Bytes::from_static(b"<h1>404</h1>"))
            .unwrap();
        let mut out = Vec::new();
        write_response(&mut out, &response).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Status: 404 Not Found\r\ncontent-type: text/html; charset=utf-8\r\n\r\n<h1>404</h1>"
        );
    }

    #[tokio::test]
    async fn test_matches_server_variant() {
        let cfg = Config::load_from("definitely-not-a-config-file").unwrap();
        let site = Site::from_config(&cfg);

        let env = env_of(&[("REQUEST_METHOD", "GET"), ("PATH_INFO", "/test")]);
        let cgi = crate::edge::handle(&site, env.to_request(Bytes::new()).unwrap()).await;
        let server = site.handle(SiteRequest::new(Method::GET, "/test")).await;

        assert_eq!(cgi.status(), server.status());
        let server_body = server.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(cgi.body(), &server_body);

        let mut out = Vec::new();
        write_response(&mut out, &cgi).unwrap();
        assert!(out.starts_with(b"Status: 200 OK\r\n"));
        assert!(out.ends_with(&server_body));
    }
}
