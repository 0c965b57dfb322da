use log::debug;
use serde::Serialize;
use std::io::BufReader;
use std::time::Duration;
use ureq::{Agent, BodyReader};

use super::error::ClipsError;
use super::job::JobSnapshot;
use super::poller::JobSource;
use super::stream::SnapshotStream;

/// Base URL of the Reka Clips API
pub const DEFAULT_BASE_URL: &str = "https://vision-agent.api.reka.ai/v1/clips";

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-Api-Key";

/// Live event stream of a freshly submitted job
pub type SubmissionStream = SnapshotStream<BufReader<BodyReader<'static>>>;

/// Where and how to reach the API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Limit for establishing the connection
    pub connect_timeout: Duration,
    /// Limit for receiving the response headers (a stream body may run longer)
    pub response_timeout: Duration,
}

/// Body of a clip generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub video_urls: Vec<String>,
    pub prompt: String,
    pub generation_config: GenerationOptions,
    pub rendering_config: RenderingOptions,
    /// Ask for server-sent progress events instead of a single reply
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub template: String,
    pub num_generations: u32,
    pub min_duration_seconds: u32,
    pub max_duration_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderingOptions {
    pub subtitles: bool,
    pub aspect_ratio: String,
}

/// Blocking client for the clips endpoints
pub struct ClipsClient {
    agent: Agent,
    base_url: String,
    api_key: String,
}

impl ClipsClient {
    pub fn new(config: ApiConfig) -> Self {
        // Non-success statuses come back as responses so their body can be read
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_recv_response(Some(config.response_timeout))
            .build()
            .into();

        Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        }
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.base_url, job_id)
    }

    /// Fetch the current state of an existing job
    pub fn fetch_status(&self, job_id: &str) -> Result<JobSnapshot, ClipsError> {
        let url = self.job_url(job_id);
        debug!("GET {}", url);

        let mut response = self
            .agent
            .get(&url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .call()?;
        let status = response.status();
        debug!("Got {} from status endpoint", status);

        let body = response.body_mut().read_to_string()?;
        if !status.is_success() {
            return Err(ClipsError::rejected(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| ClipsError::InvalidResponse(e.to_string()))
    }

    /// Submit a generation request and open its progress stream
    ///
    /// The job is created by this call; its id arrives as part of the stream.
    pub fn submit(&self, request: &GenerationRequest) -> Result<SubmissionStream, ClipsError> {
        let payload = serde_json::to_string(request)
            .map_err(|e| ClipsError::Transport(format!("failed to encode request: {}", e)))?;
        debug!("POST {} ({} bytes)", self.base_url, payload.len());

        let mut response = self
            .agent
            .post(&self.base_url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send(payload.as_bytes())?;
        let status = response.status();
        debug!("Got {} from generation endpoint", status);

        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(ClipsError::rejected(status.as_u16(), &body));
        }

        let reader = response.into_body().into_reader();
        Ok(SnapshotStream::new(BufReader::new(reader)))
    }
}

impl JobSource for ClipsClient {
    fn fetch(&mut self, job_id: &str) -> Result<JobSnapshot, ClipsError> {
        self.fetch_status(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::job::JobStatus;
    use crate::utils::stream::StreamEvent;
    use std::io::{BufRead, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer exactly one request with a canned response, returning what was received
    fn serve_once(status_line: &str, content_type: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            content_type,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            let mut content_length = 0usize;

            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some((name, value)) = line.split_once(':') {
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                let end_of_headers = line == "\r\n" || line.is_empty();
                request.push_str(&line);
                if end_of_headers {
                    break;
                }
            }

            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            request.push_str(&String::from_utf8_lossy(&body));

            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });

        (format!("http://{}/v1/clips", addr), handle)
    }

    fn client(base_url: String) -> ClipsClient {
        ClipsClient::new(ApiConfig {
            base_url,
            api_key: "test-key".to_string(),
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
        })
    }

    fn generation_request() -> GenerationRequest {
        GenerationRequest {
            video_urls: vec!["https://www.youtube.com/watch?v=abc".to_string()],
            prompt: "Best moments".to_string(),
            generation_config: GenerationOptions {
                template: "moments".to_string(),
                num_generations: 1,
                min_duration_seconds: 0,
                max_duration_seconds: 30,
            },
            rendering_config: RenderingOptions {
                subtitles: true,
                aspect_ratio: "9:16".to_string(),
            },
            stream: true,
        }
    }

    #[test]
    fn test_fetch_status_success() {
        let (base_url, server) = serve_once(
            "200 OK",
            "application/json",
            r#"{"id": "job-1", "status": "processing"}"#,
        );

        let snapshot = client(base_url).fetch_status("job-1").unwrap();
        assert_eq!(snapshot.id.as_deref(), Some("job-1"));
        assert_eq!(snapshot.status, JobStatus::InProgress("processing".to_string()));

        let request = server.join().unwrap().to_lowercase();
        assert!(request.starts_with("get /v1/clips/job-1 "));
        assert!(request.contains("x-api-key: test-key"));
    }

    #[test]
    fn test_fetch_status_rejected() {
        let (base_url, server) = serve_once(
            "404 Not Found",
            "application/json",
            r#"{"detail": "Job not found"}"#,
        );

        let err = client(base_url).fetch_status("missing").unwrap_err();
        match err {
            ClipsError::RequestRejected { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Job not found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.join().unwrap();
    }

    #[test]
    fn test_fetch_status_invalid_body() {
        let (base_url, server) = serve_once("200 OK", "text/html", "<html>maintenance</html>");

        let err = client(base_url).fetch_status("job-1").unwrap_err();
        assert!(matches!(err, ClipsError::InvalidResponse(_)));
        server.join().unwrap();
    }

    #[test]
    fn test_connection_refused_is_transient() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = client(format!("http://127.0.0.1:{}/v1/clips", port))
            .fetch_status("job-1")
            .unwrap_err();
        assert!(err.is_transient(), "expected transient error, got {:?}", err);
    }

    #[test]
    fn test_submit_streams_events() {
        let body = [
            r#"data: {"id": "job-7", "status": "queued"}"#,
            "",
            r#"data: {"id": "job-7", "status": "queued"}"#,
            "",
            r#"data: {"id": "job-7", "status": "completed", "output": [{"title": "T1"}]}"#,
            "",
        ]
        .join("\n");
        let (base_url, server) = serve_once("200 OK", "text/event-stream", &body);

        let events: Vec<StreamEvent> = client(base_url)
            .submit(&generation_request())
            .unwrap()
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], StreamEvent::JobId("job-7".to_string()));

        let request = server.join().unwrap();
        let (_, json) = request.split_once("\r\n\r\n").unwrap();
        let sent: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(sent["stream"], true);
        assert_eq!(sent["video_urls"][0], "https://www.youtube.com/watch?v=abc");
        assert_eq!(sent["generation_config"]["template"], "moments");
        assert_eq!(sent["rendering_config"]["aspect_ratio"], "9:16");
        assert!(request.to_lowercase().starts_with("post /v1/clips "));
    }

    #[test]
    fn test_submit_rejected() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            "application/json",
            r#"{"message": "Invalid API key"}"#,
        );

        let err = client(base_url).submit(&generation_request()).err().unwrap();
        assert_eq!(err.to_string(), "HTTP 401: Invalid API key");
        server.join().unwrap();
    }
}
