//! Conversion job lifecycle client.

use crate::blob::{BlobRegistry, BlobUrl, SaveTarget};
use crate::types::{Job, JobDownload, JobStatusReport, JobUpload, PaginatedResponse};
use crate::{JobError, JobResult};
use pixelforge_http::multipart::{Form, Part};
use pixelforge_http::{ApiError, HttpClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Thin wrapper over the job endpoints.
///
/// Every operation is a single request through the shared [`HttpClient`],
/// so bearer decoration and 401 handling apply uniformly. Nothing here
/// retries or polls.
pub struct JobClient {
    http: Arc<HttpClient>,
    blobs: BlobRegistry,
}

impl JobClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self::with_blobs(http, BlobRegistry::new())
    }

    pub fn with_blobs(http: Arc<HttpClient>, blobs: BlobRegistry) -> Self {
        Self { http, blobs }
    }

    /// Registry holding blobs handed out by [`JobClient::preview_blob`].
    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    /// List the caller's jobs, one page at a time. `page` is 1-based.
    pub async fn list(&self, page: u32, size: u32) -> JobResult<PaginatedResponse<Job>> {
        if page < 1 {
            return Err(JobError::Validation("page must be at least 1".into()));
        }
        if size == 0 {
            return Err(JobError::Validation("size must be positive".into()));
        }

        let jobs: PaginatedResponse<Job> = self
            .http
            .get_json_with_query("job", &[("page", page), ("size", size)])
            .await?;
        debug!(page, size, returned = jobs.results.len(), total = jobs.count, "Listed jobs");
        Ok(jobs)
    }

    /// Target formats the server can convert to, in server order.
    pub async fn supported_target_formats(&self) -> JobResult<Vec<String>> {
        Ok(self.http.get_json("format/image").await?)
    }

    /// Submit a new conversion job.
    ///
    /// Not idempotent: each successful call creates a job.
    pub async fn create(&self, upload: JobUpload) -> JobResult<Job> {
        let target_format = upload
            .target_format
            .filter(|format| !format.trim().is_empty())
            .ok_or_else(|| JobError::Validation("target format is required".into()))?;
        let file = upload
            .file
            .ok_or_else(|| JobError::Validation("file is required".into()))?;
        if file.bytes.is_empty() {
            return Err(JobError::Validation(format!(
                "file {} is empty",
                file.filename
            )));
        }

        info!(
            filename = %file.filename,
            target_format = %target_format,
            len = file.bytes.len(),
            "Submitting conversion job"
        );

        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.content_type)
            .map_err(ApiError::from)?;
        let form = Form::new()
            .text("target_format", target_format)
            .part("file", part);

        let job: Job = self.http.post_multipart("job/convert", form).await?;
        info!(job_id = job.id, status = %job.status, "Conversion job created");
        Ok(job)
    }

    /// Current status of a job. Callers poll this until it is terminal.
    pub async fn status(&self, job_id: i64) -> JobResult<JobStatusReport> {
        let report: JobStatusReport = self.http.get_json(&format!("job/status/{job_id}")).await?;
        debug!(job_id, status = %report.status, "Job status");
        Ok(report)
    }

    pub async fn download_info(&self, job_id: i64) -> JobResult<JobDownload> {
        Ok(self.http.get_json(&format!("job/download/{job_id}")).await?)
    }

    /// Fetch the converted artifact and hand it to `target` as `filename`.
    ///
    /// The intermediate blob is released whether or not saving succeeds.
    pub async fn download_artifact(
        &self,
        job_id: i64,
        filename: &str,
        target: &dyn SaveTarget,
    ) -> JobResult<PathBuf> {
        let bytes = self.http.get_bytes(&format!("job/download/{job_id}")).await?;
        let len = bytes.len();
        let url = self.blobs.create(bytes);

        let saved = match self.blobs.get(&url) {
            Some(blob) => target.save(filename, &blob),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("blob {url} vanished before save"),
            )),
        };
        self.blobs.revoke(&url);

        match saved {
            Ok(path) => {
                info!(job_id, len, path = %path.display(), "Artifact saved");
                Ok(path)
            }
            Err(e) => {
                warn!(job_id, error = %e, "Failed to save artifact");
                Err(e.into())
            }
        }
    }

    /// Fetch a preview into a blob. The caller owns the returned handle and
    /// must revoke it through [`JobClient::blobs`].
    pub async fn preview_blob(&self, job_id: i64) -> JobResult<BlobUrl> {
        let bytes = self.http.get_bytes(&format!("job/preview/{job_id}")).await?;
        Ok(self.blobs.create(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::DirectorySaveTarget;
    use crate::types::UploadFile;
    use pixelforge_http::{ClientConfig, ErrorKind};
    use pixelforge_storage::MemoryStorage;
    use serde_json::{json, Value};
    use std::io;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn job_json(id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "filename": format!("image-{id}.png"),
            "input_path": format!("uploads/image-{id}.png"),
            "original_format": "png",
            "target_format": "jpeg",
            "input_size_bytes": 2048,
            "user_id": 1,
            "status": status,
            "created_at": "2024-01-01T00:00:00"
        })
    }

    fn status_json(id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "status": status,
            "user_id": 1,
            "created_at": "2024-01-01T00:00:00"
        })
    }

    fn client_for(server: &MockServer) -> JobClient {
        let storage = Arc::new(MemoryStorage::new());
        let config = ClientConfig::new(&format!("{}/api/v1/", server.uri())).unwrap();
        let http = HttpClient::new(config, storage).unwrap();
        http.set_token("T1").unwrap();
        JobClient::new(Arc::new(http))
    }

    struct FailingTarget;

    impl SaveTarget for FailingTarget {
        fn save(&self, _filename: &str, _bytes: &[u8]) -> io::Result<PathBuf> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn test_list_first_page() {
        let server = MockServer::start().await;
        let results: Vec<Value> = (1..=10).map(|id| job_json(id, "COMPLETED")).collect();
        Mock::given(method("GET"))
            .and(path("/api/v1/job"))
            .and(query_param("page", "1"))
            .and(query_param("size", "10"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": results,
                "count": 25,
                "page": 1,
                "size": 10,
                "pages": 3,
                "next_url": "/api/v1/job?page=2&size=10",
                "prev_url": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).list(1, 10).await.unwrap();

        assert_eq!(page.results.len(), 10);
        assert_eq!(page.count, 25);
        assert_eq!(page.pages, Some(3));
        assert!(page.next_url.is_some());
        assert!(page.prev_url.is_none());
    }

    #[tokio::test]
    async fn test_list_rejects_bad_paging() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client.list(0, 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = client.list(1, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_supported_formats_keep_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/format/image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["webp", "png", "jpeg"])))
            .mount(&server)
            .await;

        let formats = client_for(&server).supported_target_formats().await.unwrap();
        assert_eq!(formats, vec!["webp", "png", "jpeg"]);
    }

    #[tokio::test]
    async fn test_create_without_file_sends_nothing() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client
            .create(JobUpload {
                target_format: Some("jpeg".into()),
                file: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));

        let err = client
            .create(JobUpload {
                target_format: Some("  ".into()),
                file: Some(UploadFile::new("a.png", vec![1])),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_reports_empty_file_separately() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let err = client
            .create(JobUpload::new(UploadFile::new("blank.png", Vec::new()), "jpeg"))
            .await
            .unwrap_err();

        match err {
            JobError::Validation(message) => assert_eq!(message, "file blank.png is empty"),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_sends_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/job/convert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json(42, "PENDING")))
            .expect(1)
            .mount(&server)
            .await;

        let upload = JobUpload::new(UploadFile::new("cat.png", b"PNGDATA".to_vec()), "jpeg");
        let job = client_for(&server).create(upload).await.unwrap();
        assert_eq!(job.id, 42);
        assert_eq!(job.status, "PENDING");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"target_format\""));
        assert!(body.contains("jpeg"));
        assert!(body.contains("name=\"file\"; filename=\"cat.png\""));
        assert!(body.contains("image/png"));
        assert!(body.contains("PNGDATA"));
    }

    #[tokio::test]
    async fn test_create_then_poll_until_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/job/convert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(job_json(42, "queued")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/status/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_json(42, "processing")))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/status/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(status_json(42, "completed")))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let upload = JobUpload::new(UploadFile::new("cat.png", vec![1, 2, 3]), "jpeg");
        let job = client.create(upload).await.unwrap();

        let mut polls = 0;
        let report = loop {
            let report = client.status(job.id).await.unwrap();
            polls += 1;
            if report.is_terminal() {
                break report;
            }
        };

        assert_eq!(polls, 3);
        assert_eq!(report.status, "completed");
    }

    #[tokio::test]
    async fn test_download_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/download/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "filename": "cat.jpeg",
                "url": "/files/cat.jpeg",
                "public_url": "https://cdn.example.com/cat.jpeg"
            })))
            .mount(&server)
            .await;

        let info = client_for(&server).download_info(42).await.unwrap();
        assert_eq!(info.filename, "cat.jpeg");
        assert_eq!(info.public_url, "https://cdn.example.com/cat.jpeg");
    }

    #[tokio::test]
    async fn test_download_releases_blob() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/download/42"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEGDATA".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = DirectorySaveTarget::new(dir.path());
        let client = client_for(&server);

        for _ in 0..3 {
            let saved = client
                .download_artifact(42, "cat.jpeg", &target)
                .await
                .unwrap();
            assert_eq!(saved, dir.path().join("cat.jpeg"));
            assert_eq!(client.blobs().live_count(), 0);
        }
        assert_eq!(std::fs::read(dir.path().join("cat.jpeg")).unwrap(), b"JPEGDATA");
    }

    #[tokio::test]
    async fn test_download_releases_blob_when_save_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/download/42"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEGDATA".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .download_artifact(42, "cat.jpeg", &FailingTarget)
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Io(_)));
        assert_eq!(client.blobs().live_count(), 0);
    }

    #[tokio::test]
    async fn test_preview_blob_lives_until_revoked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/preview/42"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PREVIEW".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.preview_blob(42).await.unwrap();

        assert_eq!(client.blobs().live_count(), 1);
        assert_eq!(client.blobs().get(&url).as_deref(), Some(&b"PREVIEW"[..]));

        assert!(client.blobs().revoke(&url));
        assert_eq!(client.blobs().live_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_status_clears_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/job/status/42"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "Could not validate credentials"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut rx = client.http.subscribe_unauthorized();

        let err = client.status(42).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!client.http.has_token());
        assert!(rx.try_recv().is_ok());
    }
}
