//! Upload echo handler
//!
//! Accepts one multipart file and reports what a real upload would have
//! produced. The content is measured and dropped; nothing is written anywhere.

use futures::stream;
use hyper::body::Bytes;
use rand::Rng;
use serde::Serialize;
use std::convert::Infallible;

use super::SiteError;

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

const SUCCESS_MESSAGE: &str = "File uploaded successfully";
const DEFAULT_EXTENSION: &str = ".bin";
const RANDOM_SUFFIX_MAX: u32 = 1_000_000_000;

/// A file pulled out of the request body
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    pub name: String,
    pub content: Bytes,
}

/// Response payload describing the fictitious stored file
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub message: &'static str,
    pub filename: String,
    pub url: String,
    pub original_name: String,
    pub size: u64,
}

/// Upload echo bound to one site configuration
#[derive(Debug, Clone)]
pub struct UploadEcho {
    base_url: String,
    max_file_size: u64,
}

impl UploadEcho {
    pub fn new(base_url: &str, max_file_size: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            max_file_size,
        }
    }

    /// Parse the request body and echo the submitted file
    pub async fn handle(
        &self,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<UploadRecord, SiteError> {
        let file = read_file_field(content_type, body).await?;
        self.echo(&file)
    }

    /// Echo a file using the current time and a fresh random suffix
    pub fn echo(&self, file: &SubmittedFile) -> Result<UploadRecord, SiteError> {
        let timestamp_ms = chrono::Utc::now().timestamp_millis();
        let random = rand::thread_rng().gen_range(0..=RANDOM_SUFFIX_MAX);
        self.echo_with(file, timestamp_ms, random)
    }

    /// Echo a file with explicit clock and random inputs
    pub fn echo_with(
        &self,
        file: &SubmittedFile,
        timestamp_ms: i64,
        random: u32,
    ) -> Result<UploadRecord, SiteError> {
        let size = u64::try_from(file.content.len()).unwrap_or(u64::MAX);
        if size > self.max_file_size {
            return Err(SiteError::PayloadTooLarge);
        }

        let filename = generate_filename(&file.name, timestamp_ms, random);
        let url = format!("{}/uploads/{filename}", self.base_url);

        Ok(UploadRecord {
            message: SUCCESS_MESSAGE,
            filename,
            url,
            original_name: file.name.clone(),
            size,
        })
    }
}

/// `file-<timestamp>-<random><extension>`
pub fn generate_filename(original_name: &str, timestamp_ms: i64, random: u32) -> String {
    format!(
        "file-{timestamp_ms}-{random}{}",
        extension_of(original_name)
    )
}

/// Everything from the last `.` on, case preserved; `.bin` when there is no dot
pub fn extension_of(name: &str) -> &str {
    name.rfind('.').map_or(DEFAULT_EXTENSION, |idx| &name[idx..])
}

/// Pull the `file` field out of a multipart body
///
/// Fields with another name, without a filename, or with an empty filename
/// (what browsers send when nothing was chosen) do not count as a file.
pub async fn read_file_field(
    content_type: Option<&str>,
    body: Bytes,
) -> Result<SubmittedFile, SiteError> {
    let content_type = content_type.ok_or(SiteError::NoFile)?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| SiteError::BadRequest("Expected multipart/form-data".to_string()))?;

    let body_stream = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body_stream, boundary);

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content = field.bytes().await.map_err(malformed)?;
        return Ok(SubmittedFile { name, content });
    }

    Err(SiteError::NoFile)
}

fn malformed(err: multer::Error) -> SiteError {
    SiteError::BadRequest(format!("Malformed multipart body: {err}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const BOUNDARY: &str = "----debugsiteboundary";

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    /// Build a multipart body with one part per `(field, filename, content)`
    pub fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> Bytes {
        let mut body = Vec::new();
        for (field, filename, content) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(content.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Bytes::from(body)
    }

    fn echo() -> UploadEcho {
        UploadEcho::new("https://tool.example.com/", 4096)
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(extension_of("photo.PNG"), ".PNG");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), ".bin");
        assert_eq!(extension_of(".bashrc"), ".bashrc");
        assert_eq!(extension_of("trailing."), ".");
    }

    #[test]
    fn test_generate_filename_order() {
        let name = generate_filename("photo.PNG", 1_700_000_000_123, 42);
        assert_eq!(name, "file-1700000000123-42.PNG");

        let name = generate_filename("noext", 1, 0);
        assert_eq!(name, "file-1-0.bin");
    }

    #[test]
    fn test_echo_record() {
        let file = SubmittedFile {
            name: "photo.PNG".to_string(),
            content: Bytes::from(vec![7u8; 1024]),
        };
        let record = echo().echo_with(&file, 1_700_000_000_000, 99).unwrap();
        assert_eq!(record.message, SUCCESS_MESSAGE);
        assert_eq!(record.filename, "file-1700000000000-99.PNG");
        assert_eq!(
            record.url,
            "https://tool.example.com/uploads/file-1700000000000-99.PNG"
        );
        assert_eq!(record.original_name, "photo.PNG");
        assert_eq!(record.size, 1024);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originalName"], "photo.PNG");
        assert_eq!(json["size"], 1024);
    }

    #[test]
    fn test_random_suffix_in_range() {
        let file = SubmittedFile {
            name: "a.txt".to_string(),
            content: Bytes::new(),
        };
        let record = echo().echo(&file).unwrap();
        let parts: Vec<&str> = record
            .filename
            .trim_end_matches(".txt")
            .splitn(3, '-')
            .collect();
        assert_eq!(parts[0], "file");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert!(parts[2].parse::<u32>().unwrap() <= RANDOM_SUFFIX_MAX);
    }

    #[test]
    fn test_file_over_limit() {
        let file = SubmittedFile {
            name: "big.bin".to_string(),
            content: Bytes::from(vec![0u8; 4097]),
        };
        assert!(matches!(
            echo().echo(&file),
            Err(SiteError::PayloadTooLarge)
        ));
    }

    #[tokio::test]
    async fn test_read_file_field() {
        let body = multipart_body(&[
            ("note", None, "hello"),
            ("file", Some("photo.PNG"), "\x01\x02\x03"),
        ]);
        let file = read_file_field(Some(&multipart_content_type()), body)
            .await
            .unwrap();
        assert_eq!(file.name, "photo.PNG");
        assert_eq!(&file.content[..], &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let body = multipart_body(&[("other", Some("a.txt"), "x")]);
        let err = read_file_field(Some(&multipart_content_type()), body)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::NoFile));

        // text field named `file` and an empty file input are both "no file"
        let body = multipart_body(&[("file", None, "text"), ("file", Some(""), "")]);
        let err = read_file_field(Some(&multipart_content_type()), body)
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::NoFile));
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let err = read_file_field(Some("application/json"), Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), hyper::StatusCode::BAD_REQUEST);

        let err = read_file_field(None, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, SiteError::NoFile));
    }
}
