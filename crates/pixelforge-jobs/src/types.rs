//! Job wire types.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Statuses after which a job no longer changes.
const TERMINAL_STATUSES: &[&str] = &["SUCCESS", "COMPLETED", "FAILED", "ERROR", "CANCELLED"];

/// Returns true if `status` is one the server never moves on from.
pub fn is_terminal_status(status: &str) -> bool {
    TERMINAL_STATUSES
        .iter()
        .any(|terminal| terminal.eq_ignore_ascii_case(status))
}

/// A conversion job as the server reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub input_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    pub original_format: String,
    pub target_format: String,
    #[serde(default)]
    pub input_size_bytes: Option<u64>,
    #[serde(default)]
    pub output_size_bytes: Option<u64>,
    pub user_id: i64,
    pub status: String,
    pub created_at: String,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        is_terminal_status(&self.status)
    }
}

/// Lightweight status projection used while polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusReport {
    pub id: i64,
    pub status: String,
    pub user_id: i64,
    pub created_at: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

impl JobStatusReport {
    pub fn is_terminal(&self) -> bool {
        is_terminal_status(&self.status)
    }
}

/// Download metadata for a finished job. Carries no bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDownload {
    pub filename: String,
    pub url: String,
    pub public_url: String,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    /// Total across all pages.
    pub count: u64,
    pub page: u32,
    pub size: u32,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default)]
    pub prev_url: Option<String>,
}

impl<T> PaginatedResponse<T> {
    pub fn has_next(&self) -> bool {
        self.next_url.is_some()
    }
}

/// Input for creating a job. Both fields must be present to submit.
#[derive(Debug, Clone, Default)]
pub struct JobUpload {
    pub target_format: Option<String>,
    pub file: Option<UploadFile>,
}

impl JobUpload {
    pub fn new(file: UploadFile, target_format: impl Into<String>) -> Self {
        Self {
            target_format: Some(target_format.into()),
            file: Some(file),
        }
    }
}

/// A local image ready to be sent as a multipart part.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            bytes,
            content_type,
        }
    }

    /// Read `path` and infer the content type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, bytes))
    }
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminal_statuses() {
        for status in ["SUCCESS", "completed", "Failed", "ERROR", "cancelled"] {
            assert!(is_terminal_status(status), "{status} should be terminal");
        }
        for status in ["PENDING", "QUEUED", "processing", ""] {
            assert!(!is_terminal_status(status), "{status} should not be terminal");
        }
    }

    #[test]
    fn test_job_tolerates_missing_optionals() {
        let job: Job = serde_json::from_value(json!({
            "id": 7,
            "filename": "cat.png",
            "original_format": "png",
            "target_format": "jpeg",
            "user_id": 1,
            "status": "PENDING",
            "created_at": "2024-01-01T00:00:00"
        }))
        .unwrap();

        assert_eq!(job.id, 7);
        assert!(job.output_path.is_none());
        assert!(job.input_size_bytes.is_none());
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_page_without_links() {
        let page: PaginatedResponse<Job> = serde_json::from_value(json!({
            "results": [],
            "count": 0,
            "page": 1,
            "size": 10
        }))
        .unwrap();

        assert!(page.results.is_empty());
        assert!(!page.has_next());
        assert!(page.pages.is_none());
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(UploadFile::new("a.PNG", vec![]).content_type, "image/png");
        assert_eq!(UploadFile::new("b.jpeg", vec![]).content_type, "image/jpeg");
        assert_eq!(UploadFile::new("c.webp", vec![]).content_type, "image/webp");
        assert_eq!(
            UploadFile::new("notes", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.filename, "photo.gif");
        assert_eq!(file.content_type, "image/gif");
        assert_eq!(file.bytes, b"GIF89a");
    }
}
