pub mod errors;
pub mod helpers;

pub use errors::{ClientError, NetworkErrorKind, humanize_error};
pub use helpers::*;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::app_state::{DownloadResult, HealthStatus, VideoPreview};
use crate::config::Config;

/// Operations the UI needs from the download service.
///
/// [`BackendClient`] is the HTTP implementation; the effect runner only
/// sees this trait.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    async fn fetch_preview(&self, url: &str) -> Result<VideoPreview, ClientError>;

    async fn start_download(
        &self,
        url: &str,
        quality: &str,
        format_id: Option<&str>,
    ) -> Result<DownloadResult, ClientError>;

    async fn check_health(&self) -> Result<HealthStatus, ClientError>;

    async fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>, ClientError>;

    async fn save_artifact(&self, filename: &str, dir: &Path) -> Result<PathBuf, ClientError>;
}

#[derive(Serialize)]
struct PreviewRequest<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct DownloadRequest<'a> {
    url: &'a str,
    quality: &'a str,
    format_id: Option<&'a str>,
}

/// HTTP client for the download service
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    /// Artifact transfers: no overall deadline, only `timeout` between reads
    transfer_http: reqwest::Client,
    timeout: Duration,
    api_url: String,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        Self::with_timeout(&config.api_url, Duration::from_millis(config.timeout_ms))
    }

    /// Build a client whose API requests are aborted after `timeout`.
    ///
    /// Artifact downloads may run longer; they fail only when the server
    /// goes quiet for `timeout`.
    pub fn with_timeout(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let user_agent = concat!("vidgrab/", env!("CARGO_PKG_VERSION"));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        let transfer_http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http,
            transfer_http,
            timeout,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fail with a timeout if `fut` makes no progress within `self.timeout`
    async fn idle_bounded<T, E, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<ClientError>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ClientError::Network {
                kind: NetworkErrorKind::Timeout,
                message: "Request timeout".to_string(),
            }),
        }
    }

    /// Stream the body into `partial`, then move it to `target`
    async fn write_artifact(
        &self,
        response: &mut Response,
        partial: &Path,
        target: &Path,
    ) -> Result<u64, ClientError> {
        let mut file = tokio::fs::File::create(partial).await?;
        let mut written = 0u64;

        while let Some(chunk) = self.idle_bounded(response.chunk()).await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(partial, target).await?;
        Ok(written)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.http.post(self.endpoint(path)).json(body)).await?;
        decode(response).await
    }

    /// Send a request, turning transport failures and non-2xx statuses into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(status = status.as_u16(), error = %e, "Could not read error body");
                String::new()
            }
        };
        let message = error_detail(&text).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        tracing::debug!(status = status.as_u16(), %message, "Backend returned an error");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

/// Pull the `detail` field out of an error body, if there is one
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn require_video_url(url: &str) -> Result<(), ClientError> {
    if url.trim().is_empty() {
        return Err(ClientError::validation("Please enter a video URL"));
    }
    if !validate_url(url) {
        return Err(ClientError::validation("Please enter a valid video URL"));
    }
    Ok(())
}

#[async_trait]
impl VideoBackend for BackendClient {
    async fn fetch_preview(&self, url: &str) -> Result<VideoPreview, ClientError> {
        require_video_url(url)?;
        tracing::debug!(url, "Requesting preview");

        let preview: VideoPreview = self
            .post_json("/preview", &PreviewRequest { url: url.trim() })
            .await?;

        tracing::info!(title = %preview.title, formats = preview.formats.len(), "Preview loaded");
        Ok(preview)
    }

    async fn start_download(
        &self,
        url: &str,
        quality: &str,
        format_id: Option<&str>,
    ) -> Result<DownloadResult, ClientError> {
        require_video_url(url)?;
        if quality.trim().is_empty() {
            return Err(ClientError::validation("Please select a video quality first"));
        }
        tracing::debug!(url, quality, ?format_id, "Requesting download");

        self.post_json(
            "/download",
            &DownloadRequest {
                url: url.trim(),
                quality,
                format_id,
            },
        )
        .await
    }

    async fn check_health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.send(self.http.get(self.endpoint("/health"))).await?;
        decode(response).await
    }

    async fn fetch_thumbnail(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.send(self.http.get(url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn save_artifact(&self, filename: &str, dir: &Path) -> Result<PathBuf, ClientError> {
        // Only the final component is trusted; the server name must not escape `dir`
        let local_name = Path::new(filename)
            .file_name()
            .ok_or_else(|| ClientError::validation(format!("Invalid file name: {}", filename)))?;
        let target = dir.join(local_name);
        let mut partial = target.clone().into_os_string();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let request = self
            .transfer_http
            .get(artifact_url(&self.api_url, filename));
        let mut response = self.idle_bounded(self.send(request)).await?;

        tokio::fs::create_dir_all(dir).await?;
        match self.write_artifact(&mut response, &partial, &target).await {
            Ok(written) => {
                tracing::info!(path = %target.display(), bytes = written, "Artifact saved");
                Ok(target)
            }
            Err(error) => {
                if let Err(e) = tokio::fs::remove_file(&partial).await {
                    tracing::debug!(path = %partial.display(), error = %e, "No partial file to remove");
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> BackendClient {
        BackendClient::with_timeout(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn preview_body() -> serde_json::Value {
        json!({
            "title": "Never Gonna Give You Up",
            "uploader": "Rick Astley",
            "duration_formatted": "3:33",
            "view_count": 1_500_000_000u64,
            "like_count": 17_000_000u64,
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg",
            "formats": [
                {"quality": "1080p", "format_id": "f1", "filesize_formatted": "50MB"},
                {"quality": "720p", "format_id": "f2", "filesize_formatted": "30MB"}
            ]
        })
    }

    #[tokio::test]
    async fn test_fetch_preview_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/preview"))
            .and(body_json(json!({"url": "https://youtu.be/dQw4w9WgXcQ"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(preview_body()))
            .expect(1)
            .mount(&server)
            .await;

        let preview = client_for(&server)
            .fetch_preview("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(preview.title, "Never Gonna Give You Up");
        assert_eq!(preview.uploader, "Rick Astley");
        assert_eq!(preview.duration, "3:33");
        assert_eq!(preview.view_count, Some(1_500_000_000));
        assert_eq!(preview.thumbnail_url, "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg");
        assert_eq!(preview.formats.len(), 2);
        assert_eq!(preview.formats[0].quality_label, "1080p");
        assert_eq!(preview.formats[0].format_id, "f1");
        assert_eq!(preview.formats[1].file_size, "30MB");
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(preview_body()))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_preview("https://vimeo.com/123").await;
        assert!(matches!(result, Err(ClientError::Validation(_))));

        let result = client_for(&server)
            .start_download("", "720p", Some("f2"))
            .await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[tokio::test]
    async fn test_api_error_uses_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/preview"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"detail": "Video unavailable"})),
            )
            .mount(&server)
            .await;

        match client_for(&server)
            .fetch_preview("https://youtu.be/dQw4w9WgXcQ")
            .await
        {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Video unavailable");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/preview"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_preview("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/preview"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(preview_body())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = BackendClient::with_timeout(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = client
            .fetch_preview("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_timeout() {
        // Bind then drop to get a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = BackendClient::with_timeout(
            &format!("http://127.0.0.1:{}", port),
            Duration::from_secs(5),
        )
        .unwrap();

        match client.fetch_preview("https://youtu.be/dQw4w9WgXcQ").await {
            Err(ClientError::Network { kind, .. }) => assert_eq!(kind, NetworkErrorKind::Connection),
            other => panic!("Expected connection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_download_sends_selection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .and(body_json(json!({
                "url": "https://youtu.be/dQw4w9WgXcQ",
                "quality": "720p",
                "format_id": "f2"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "filename": "Never Gonna Give You Up.mp4",
                "message": "Download completed"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .start_download("https://youtu.be/dQw4w9WgXcQ", "720p", Some("f2"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.filename.as_deref(), Some("Never Gonna Give You Up.mp4"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .start_download("https://youtu.be/dQw4w9WgXcQ", "720p", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_check_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
            .mount(&server)
            .await;

        let status = client_for(&server).check_health().await.unwrap();
        assert_eq!(status.0["status"], "healthy");
    }

    #[tokio::test]
    async fn test_save_artifact_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/downloads/My%20Video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let saved = client_for(&server)
            .save_artifact("My Video.mp4", dir.path())
            .await
            .unwrap();

        assert_eq!(saved, dir.path().join("My Video.mp4"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"video-bytes");
    }

    #[test]
    fn test_error_detail_shapes() {
        assert_eq!(error_detail(r#"{"detail":"nope"}"#), Some("nope".to_string()));
        assert_eq!(error_detail(r#"{"detail":null}"#), None);
        assert_eq!(error_detail(r#"{"other":1}"#), None);
        assert_eq!(error_detail("not json"), None);
        assert_eq!(
            error_detail(r#"{"detail":[{"msg":"field required"}]}"#),
            Some(r#"[{"msg":"field required"}]"#.to_string())
        );
    }

    /// Raw HTTP server: writes `head`, then `chunks` kilobytes with `pause`
    /// between them, then keeps the socket open for `hold`
    async fn trickle_server(head: String, chunks: usize, pause: Duration, hold: Duration) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            socket.write_all(head.as_bytes()).await.unwrap();
            for _ in 0..chunks {
                if socket.write_all(&[b'x'; 1000]).await.is_err() {
                    return;
                }
                tokio::time::sleep(pause).await;
            }
            tokio::time::sleep(hold).await;
        });
        format!("http://{}", addr)
    }

    fn ok_head(len: usize) -> String {
        format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n", len)
    }

    #[tokio::test]
    async fn test_slow_artifact_outlives_request_timeout() {
        // 8 chunks at 100ms take longer than the 400ms timeout, but never stall
        let uri = trickle_server(ok_head(8000), 8, Duration::from_millis(100), Duration::from_secs(2)).await;
        let client = BackendClient::with_timeout(&uri, Duration::from_millis(400)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let saved = client.save_artifact("clip.mp4", dir.path()).await.unwrap();

        assert_eq!(std::fs::metadata(&saved).unwrap().len(), 8000);
        assert!(!dir.path().join("clip.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_stalled_artifact_times_out_and_leaves_no_file() {
        let uri = trickle_server(ok_head(10_000), 2, Duration::from_millis(10), Duration::from_secs(5)).await;
        let client = BackendClient::with_timeout(&uri, Duration::from_millis(300)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let err = client.save_artifact("clip.mp4", dir.path()).await.unwrap_err();

        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
        assert!(!dir.path().join("clip.mp4").exists());
        assert!(!dir.path().join("clip.mp4.part").exists());
    }

    #[tokio::test]
    async fn test_missing_artifact_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/downloads/gone.mp4"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client_for(&server)
            .save_artifact("gone.mp4", dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 404, ref message } if message == "Not found"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_truncated_error_body_falls_back_to_status() {
        let head = "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 5000\r\n\r\n".to_string();
        let uri = trickle_server(head, 1, Duration::ZERO, Duration::ZERO).await;
        let client = BackendClient::with_timeout(&uri, Duration::from_secs(5)).unwrap();

        let err = client
            .fetch_preview("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ClientError::Api { status: 500, ref message } if message == "HTTP 500"),
            "got {:?}",
            err
        );
    }
}
