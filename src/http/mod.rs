//! HTTP protocol layer module
//!
//! Response builders, MIME detection and body reading shared by both adapters.
//! Nothing in here knows which page or route is being served.

pub mod body;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use body::{check_content_length, read_limited};
pub use response::{
    build_html_response, build_json_response, build_static_file_response, with_server_header,
};
