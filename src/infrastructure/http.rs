use crate::types::{
    ApiError, DEFAULT_RETRIES, DEFAULT_TIMEOUT, MAX_TEXT_BODY_CHARS, RETRY_DELAY, Result,
    TRUNCATION_MARKER,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A request as handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// A raw response as returned by the transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// Failures below the HTTP layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportFailure {
    /// The server could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// The transport gave up waiting
    #[error("transport timeout")]
    Timeout,
}

/// Executes single HTTP exchanges. `ReqwestTransport` is the production
/// implementation.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn execute(&self, request: HttpRequest)
    -> std::result::Result<HttpResponse, TransportFailure>;
}

/// HTTP transport backed by `reqwest`
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn transport_failure(error: reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        TransportFailure::Timeout
    } else {
        TransportFailure::Network(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_failure)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(transport_failure)?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Parsed body of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Decodes the body into `T`. Text bodies are parsed as JSON.
    pub fn json<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        match self {
            Self::Json(value) => serde_json::from_value(value),
            Self::Text(text) => serde_json::from_str(&text),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

/// Client-wide settings. Durations are in milliseconds; `None` selects the
/// default.
#[derive(Debug, Clone, Default)]
pub struct RequestClientOptions {
    /// Prefix joined with every endpoint, e.g. `http://localhost:3000/api/`
    pub base_url: String,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    /// Step of the linear delay between retries
    pub retry_delay: Option<u64>,
    pub default_headers: Vec<(String, String)>,
}

/// Per-call overrides
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
}

impl RequestOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}

/// Retry bookkeeping for a single call
#[derive(Debug, Clone, Copy)]
struct RetryState {
    retries_remaining: u32,
    retries_made: u32,
}

impl RetryState {
    fn new(retries: u32) -> Self {
        Self {
            retries_remaining: retries,
            retries_made: 0,
        }
    }

    /// Linear backoff: `step`, `2 * step`, `3 * step`, ...
    fn next_delay(&mut self, step: Duration) -> Option<Duration> {
        if self.retries_remaining == 0 {
            return None;
        }
        self.retries_remaining -= 1;
        self.retries_made += 1;
        Some(step * self.retries_made)
    }
}

/// Control-plane request client with a per-call timeout and retry on
/// connectivity loss and server errors.
///
/// Client errors (4xx) and timeouts are returned at once. Retries repeat the
/// request as-is, including writes, so a 5xx whose mutation already applied
/// server-side can be applied twice.
///
/// # Example
///
/// ```no_run
/// use monitor_link::{RequestClient, RequestClientOptions, RequestOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let api = RequestClient::new(RequestClientOptions {
///     base_url: "http://localhost:3000/api/".to_string(),
///     ..Default::default()
/// })?;
///
/// let status = api.get("crawler/status", &RequestOptions::default()).await?;
/// println!("{:?}", status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestClient {
    base_url: Url,
    options: RequestClientOptions,
    transport: Arc<dyn HttpTransport>,
}

impl RequestClient {
    /// Creates a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::UrlParse`](crate::ChannelError::UrlParse) if
    /// `base_url` is not an absolute URL.
    pub fn new(options: RequestClientOptions) -> Result<Self> {
        Self::with_transport(options, ReqwestTransport::default())
    }

    pub fn with_transport(
        options: RequestClientOptions,
        transport: impl HttpTransport,
    ) -> Result<Self> {
        let mut base_url = Url::parse(&options.base_url)?;
        // Endpoints are appended below the base path, never in place of its
        // last segment.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            options,
            transport: Arc::new(transport),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> std::result::Result<ResponseBody, ApiError> {
        self.request(Method::GET, endpoint, None, options).await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        data: &T,
        options: &RequestOptions,
    ) -> std::result::Result<ResponseBody, ApiError> {
        let body = encode_body(data)
            .map_err(|err| log_failure(&Method::POST, endpoint, options, err))?;
        self.request(Method::POST, endpoint, Some(body), options)
            .await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        data: &T,
        options: &RequestOptions,
    ) -> std::result::Result<ResponseBody, ApiError> {
        let body = encode_body(data)
            .map_err(|err| log_failure(&Method::PUT, endpoint, options, err))?;
        self.request(Method::PUT, endpoint, Some(body), options)
            .await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> std::result::Result<ResponseBody, ApiError> {
        self.request(Method::DELETE, endpoint, None, options)
            .await
    }

    /// Performs one logical request, retrying retryable failures.
    ///
    /// Every failure is logged with its endpoint and options before it is
    /// retried or returned.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> std::result::Result<ResponseBody, ApiError> {
        let url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| {
                let err = ApiError::new(400, format!("Invalid endpoint '{endpoint}': {e}"));
                log_failure(&method, endpoint, options, err)
            })?;

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        headers.extend(self.options.default_headers.iter().cloned());
        headers.extend(options.headers.iter().cloned());

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
        };
        let timeout = Duration::from_millis(
            options
                .timeout
                .or(self.options.timeout)
                .unwrap_or(DEFAULT_TIMEOUT),
        );
        let step = Duration::from_millis(self.options.retry_delay.unwrap_or(RETRY_DELAY));
        let mut retry = RetryState::new(
            options
                .retries
                .or(self.options.retries)
                .unwrap_or(DEFAULT_RETRIES),
        );

        loop {
            let err = match self.attempt(request.clone(), timeout).await {
                Ok(body) => return Ok(body),
                Err(err) => log_failure(&request.method, endpoint, options, err),
            };

            if !err.is_retryable() {
                return Err(err);
            }
            let Some(delay) = retry.next_delay(step) else {
                return Err(err);
            };
            tracing::info!(
                endpoint,
                "Retrying in {}ms ({} retries left)",
                delay.as_millis(),
                retry.retries_remaining
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One exchange under the timeout. When the timeout fires the transport
    /// future is dropped, which cancels the in-flight request.
    async fn attempt(
        &self,
        request: HttpRequest,
        timeout: Duration,
    ) -> std::result::Result<ResponseBody, ApiError> {
        let response = match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(TransportFailure::Network(message))) => {
                return Err(ApiError::connectivity(format!(
                    "Network error - unable to reach server: {message}"
                )));
            }
            Ok(Err(TransportFailure::Timeout)) | Err(_) => return Err(ApiError::timeout()),
        };

        let status = response.status;
        let parsed = parse_body(&response);

        if (200..300).contains(&status) {
            return parsed.map_err(|e| {
                ApiError::new(status, format!("Invalid JSON response: {e}"))
                    .with_data(Value::String(truncate_text(&response.body)))
            });
        }

        let body = parsed.unwrap_or_else(|_| ResponseBody::Text(truncate_text(&response.body)));
        Err(error_from_response(status, body))
    }
}

/// Logs a failed call with its endpoint and options, then hands the error back.
fn log_failure(
    method: &Method,
    endpoint: &str,
    options: &RequestOptions,
    err: ApiError,
) -> ApiError {
    tracing::error!(
        endpoint,
        method = %method,
        status = err.status,
        options = ?options,
        "API request failed: {}",
        err.message
    );
    err
}

fn encode_body<T: Serialize + ?Sized>(data: &T) -> std::result::Result<Value, ApiError> {
    serde_json::to_value(data)
        .map_err(|e| ApiError::new(400, format!("Invalid request body: {e}")))
}

/// `application/json` and structured `+json` types such as
/// `application/problem+json`
fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|value| {
        let value = value.to_ascii_lowercase();
        let media_type = value.split(';').next().unwrap_or_default().trim();
        media_type == "application/json" || media_type.ends_with("+json")
    })
}

fn parse_body(response: &HttpResponse) -> serde_json::Result<ResponseBody> {
    if !is_json(response.content_type.as_deref()) {
        return Ok(ResponseBody::Text(truncate_text(&response.body)));
    }
    if response.body.trim().is_empty() {
        return Ok(ResponseBody::Json(Value::Null));
    }
    serde_json::from_str(&response.body).map(ResponseBody::Json)
}

/// Cuts text to `MAX_TEXT_BODY_CHARS` characters plus a marker.
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_BODY_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn error_from_response(status: u16, body: ResponseBody) -> ApiError {
    let from_body = body.as_json().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    });
    let message = from_body.unwrap_or_else(|| {
        StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP error {status}"))
    });
    ApiError::new(status, message).with_data(body.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MockHttpTransport, MockReply};
    use crate::types::ApiErrorKind;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct LogWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn client(transport: &MockHttpTransport) -> RequestClient {
        RequestClient::with_transport(
            RequestClientOptions {
                base_url: "http://monitor.test/api/".to_string(),
                ..Default::default()
            },
            transport.clone(),
        )
        .unwrap()
    }

    #[test]
    fn test_retry_delays_grow_linearly() {
        let mut retry = RetryState::new(3);
        let step = Duration::from_millis(1000);
        assert_eq!(retry.next_delay(step), Some(Duration::from_secs(1)));
        assert_eq!(retry.next_delay(step), Some(Duration::from_secs(2)));
        assert_eq!(retry.next_delay(step), Some(Duration::from_secs(3)));
        assert_eq!(retry.next_delay(step), None);
    }

    #[test]
    fn test_truncate_text() {
        let short = "a".repeat(1000);
        assert_eq!(truncate_text(&short), short);

        let long = "é".repeat(1500);
        let truncated = truncate_text(&long);
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncated.chars().count(), 1000 + TRUNCATION_MARKER.chars().count());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_errors_then_succeeds() {
        let transport = MockHttpTransport::new(vec![
            MockReply::status(503),
            MockReply::status(503),
            MockReply::json(200, json!({"running": true})),
        ]);
        let api = client(&transport);

        let started = Instant::now();
        let body = api
            .get("/crawler/status", &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(body, ResponseBody::Json(json!({"running": true})));
        let times = transport.request_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(2));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_server_errors_then_success_uses_all_retries() {
        let transport = MockHttpTransport::new(vec![
            MockReply::status(503),
            MockReply::status(503),
            MockReply::status(503),
            MockReply::json(200, json!({"ok": true})),
        ]);
        let api = client(&transport);

        let body = api.get("x", &RequestOptions::default()).await.unwrap();
        assert_eq!(body.json::<Value>().unwrap(), json!({"ok": true}));

        let times = transport.request_times();
        assert_eq!(times.len(), 4);
        assert_eq!(times[3] - times[2], Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_retries_exhausted() {
        let transport = MockHttpTransport::new(vec![
            MockReply::json(500, json!({"message": "database unavailable"})),
            MockReply::json(500, json!({"message": "database unavailable"})),
            MockReply::json(500, json!({"message": "database unavailable"})),
            MockReply::json(500, json!({"message": "database unavailable"})),
            MockReply::json(200, json!({})),
        ]);
        let api = client(&transport);

        let err = api.get("jobs", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.status, 500);
        assert_eq!(err.message, "database unavailable");
        assert_eq!(err.data, Some(json!({"message": "database unavailable"})));
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let transport = MockHttpTransport::new(vec![
            MockReply::json(404, json!({"error": "Job not found"})),
            MockReply::json(200, json!({})),
        ]);
        let api = client(&transport);

        let started = Instant::now();
        let err = api.get("jobs/42", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.kind(), ApiErrorKind::Client);
        assert_eq!(err.message, "Job not found");
        assert_eq!(transport.request_count(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_without_message_uses_reason_phrase() {
        let transport = MockHttpTransport::new(vec![MockReply::text(403, "nope")]);
        let api = client(&transport);

        let err = api.delete("jobs/1", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.status, 403);
        assert_eq!(err.message, "Forbidden");
        assert_eq!(err.data, Some(json!("nope")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_retried_as_status_zero() {
        let transport = MockHttpTransport::new(vec![
            MockReply::Network,
            MockReply::Network,
            MockReply::Network,
            MockReply::Network,
        ]);
        let api = client(&transport);

        let err = api.get("health", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.status, 0);
        assert_eq!(err.kind(), ApiErrorKind::Connectivity);
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_recovers() {
        let transport =
            MockHttpTransport::new(vec![MockReply::Network, MockReply::text(200, "pong")]);
        let api = client(&transport);

        let body = api.get("health", &RequestOptions::default()).await.unwrap();
        assert_eq!(body.as_text(), Some("pong"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_with_408_and_cancels_call() {
        let transport = MockHttpTransport::new(vec![
            MockReply::Delayed(Duration::from_secs(60), Box::new(MockReply::json(200, json!({})))),
            MockReply::json(200, json!({})),
        ]);
        let api = client(&transport);

        let started = Instant::now();
        let err = api.get("slow", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.status, 408);
        assert_eq!(err.kind(), ApiErrorKind::Timeout);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
        assert_eq!(transport.request_count(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_overrides() {
        let transport = MockHttpTransport::new(vec![
            MockReply::status(502),
            MockReply::status(502),
        ]);
        let api = client(&transport);

        let options = RequestOptions::default()
            .with_retries(1)
            .with_timeout(500)
            .with_header("X-Trace", "abc");
        let err = api.get("jobs", &options).await.unwrap_err();
        assert_eq!(err.status, 502);
        assert_eq!(transport.request_count(), 2);

        let request = &transport.requests()[0];
        assert!(request.headers.contains(&("X-Trace".to_string(), "abc".to_string())));
        assert!(
            request
                .headers
                .contains(&("Accept".to_string(), "application/json".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_sends_json_body_to_joined_url() {
        let transport = MockHttpTransport::new(vec![MockReply::json(201, json!({"id": 7}))]);
        let api = client(&transport);

        let body = api
            .post("/jobs", &json!({"url": "https://example.com"}), &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(body, ResponseBody::Json(json!({"id": 7})));

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "http://monitor.test/api/jobs");
        assert_eq!(request.body, Some(json!({"url": "https://example.com"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_base_url_without_trailing_slash_keeps_its_path() {
        let transport = MockHttpTransport::new(vec![MockReply::json(200, json!({}))]);
        let api = RequestClient::with_transport(
            RequestClientOptions {
                base_url: "http://monitor.test/api".to_string(),
                ..Default::default()
            },
            transport.clone(),
        )
        .unwrap();

        api.get("/crawler/status", &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "http://monitor.test/api/crawler/status"
        );
        assert_eq!(api.base_url().as_str(), "http://monitor.test/api/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_failures_are_logged_and_never_sent() {
        let logs = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer_logs = Arc::clone(&logs);
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || LogWriter(Arc::clone(&writer_logs)))
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = MockHttpTransport::new(vec![]);
        let api = client(&transport);

        let mut unencodable = HashMap::new();
        unencodable.insert((1, 2), "tuple keys are not valid JSON");
        let err = api
            .post("jobs", &unencodable, &RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        let err = api
            .get("http://[::1", &RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        assert_eq!(transport.request_count(), 0);
        let output = String::from_utf8(logs.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("API request failed").count(), 2);
        assert!(output.contains("Invalid request body"));
        assert!(output.contains("Invalid endpoint"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_problem_json_error_body_is_parsed() {
        let transport = MockHttpTransport::new(vec![MockReply::Raw(HttpResponse {
            status: 422,
            content_type: Some("application/problem+json; charset=utf-8".to_string()),
            body: json!({"message": "depth must be positive"}).to_string(),
        })]);
        let api = client(&transport);

        let err = api
            .post("crawler/start", &json!({"depth": -1}), &RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status, 422);
        assert_eq!(err.message, "depth must be positive");
        assert_eq!(err.data, Some(json!({"message": "depth must be positive"})));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json(Some("application/json")));
        assert!(is_json(Some("Application/JSON; charset=utf-8")));
        assert!(is_json(Some("application/problem+json")));
        assert!(is_json(Some("application/vnd.api+json")));
        assert!(!is_json(Some("text/plain")));
        assert!(!is_json(Some("application/jsonp")));
        assert!(!is_json(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_text_body_is_truncated() {
        let transport = MockHttpTransport::new(vec![MockReply::text(200, &"x".repeat(5000))]);
        let api = client(&transport);

        let body = api.get("log", &RequestOptions::default()).await.unwrap();
        let text = body.as_text().unwrap();
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert_eq!(text.len(), 1000 + TRUNCATION_MARKER.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_json_on_success_is_an_error() {
        let transport = MockHttpTransport::new(vec![MockReply::Raw(HttpResponse {
            status: 200,
            content_type: Some("application/json; charset=utf-8".to_string()),
            body: "{not json".to_string(),
        })]);
        let api = client(&transport);

        let err = api.get("jobs", &RequestOptions::default()).await.unwrap_err();
        assert_eq!(err.status, 200);
        assert!(err.message.starts_with("Invalid JSON response"));
        assert_eq!(transport.request_count(), 1);
    }
}
