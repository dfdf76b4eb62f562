//! MIME type detection module
//!
//! Returns the Content-Type for a public asset based on its file extension.

use std::path::Path;

/// Get MIME Content-Type based on the file's extension
///
/// # Examples
/// ```
/// use debug_site::http::mime::content_type_for;
/// use std::path::Path;
/// assert_eq!(content_type_for(Path::new("a/index.html")), "text/html; charset=utf-8");
/// assert_eq!(content_type_for(Path::new("clip.MP4")), "video/mp4");
/// assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt" | "md") => "text/plain; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdn_test_resources() {
        assert_eq!(content_type_for(Path::new("test-image.jpg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("test-styles.css")), "text/css");
        assert_eq!(
            content_type_for(Path::new("test-script.js")),
            "application/javascript"
        );
        assert_eq!(content_type_for(Path::new("test-video.mp4")), "video/mp4");
        assert_eq!(
            content_type_for(Path::new("test-data.json")),
            "application/json"
        );
    }

    #[test]
    fn test_extension_case_is_ignored() {
        assert_eq!(content_type_for(Path::new("PHOTO.PNG")), "image/png");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(
            content_type_for(Path::new("archive.xyz")),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
    }
}
