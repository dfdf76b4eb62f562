//! Debug site: a small web application for exercising reverse proxies and
//! CDNs. Fixed HTML pages, fixed error pages and an upload endpoint that only
//! echoes metadata, served either by a long-lived HTTP server or once per
//! process by the edge/CGI adapter.

pub mod config;
pub mod edge;
pub mod http;
pub mod logger;
pub mod server;
pub mod site;
