//! HTTP execution with bounded retry
//!
//! One [`ResolvedRequest`] in, one [`ResponseOutcome`] out. Any HTTP status is
//! a valid outcome. Only connection failures and timeouts are retried, with
//! exponential backoff and a little jitter.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use specrun_core::{HttpSettings, ResolvedRequest, ResponseBody, ResponseOutcome};

use crate::document::RunnerError;

/// Status line, headers and raw body of one HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// Set when the status arrived but the body could not be read in full.
    pub body_error: Option<String>,
}

/// Why a request produced no response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    /// Malformed request: bad URL, method or header. Never retried.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_))
    }
}

/// Sends one request, once.
pub trait Transport {
    fn send(
        &self,
        request: &ResolvedRequest,
        timeout: Duration,
    ) -> Result<RawHttpResponse, TransportError>;
}

/// Blocking reqwest transport
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, RunnerError> {
        let mut defaults = reqwest::header::HeaderMap::new();
        defaults.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("specrun/", env!("CARGO_PKG_VERSION")))
            .default_headers(defaults)
            .build()
            .map_err(|e| RunnerError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: &ResolvedRequest,
        timeout: Duration,
    ) -> Result<RawHttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let mut req = self.client.request(method, &request.url).timeout(timeout);
        for (k, v) in &request.headers {
            if reqwest::header::HeaderName::from_bytes(k.as_bytes()).is_err() {
                tracing::warn!(header = %k, "dropping header with invalid name");
            } else if reqwest::header::HeaderValue::from_str(v).is_err() {
                tracing::warn!(header = %k, "dropping header with invalid value");
            } else {
                req = req.header(k, v);
            }
        }
        let query = query_pairs(&request.query_params);
        if !query.is_empty() {
            req = req.query(&query);
        }
        if request.method.sends_body() {
            if let Some(payload) = &request.payload {
                req = req.json(payload);
            }
        }

        let resp = req.send().map_err(classify)?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        // The request was accepted once a status exists; a failed body read
        // must not turn into a retry.
        let (body, body_error) = match resp.bytes() {
            Ok(bytes) => (bytes.to_vec(), None),
            Err(e) => {
                tracing::warn!(url = %request.url, status, error = %e, "response body not read");
                (Vec::new(), Some(format!("response body could not be read: {e}")))
            }
        };
        Ok(RawHttpResponse {
            status,
            headers,
            body,
            body_error,
        })
    }
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

/// Query parameters as string pairs; arrays repeat the key.
fn query_pairs(params: &BTreeMap<String, serde_json::Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (k, v) in params {
        match v {
            serde_json::Value::Null => {}
            serde_json::Value::Array(items) => {
                pairs.extend(items.iter().map(|i| (k.clone(), value_to_param_string(i))));
            }
            other => pairs.push((k.clone(), value_to_param_string(other))),
        }
    }
    pairs
}

/// Render a JSON value as it appears in a URL or header.
pub fn value_to_param_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Exponential backoff for retryable transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&HttpSettings::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_settings(http: &HttpSettings) -> Self {
        Self {
            max_retries: http.max_retries,
            base_delay: Duration::from_millis(http.base_delay_ms),
            max_delay: Duration::from_millis(http.max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, ±10%,
    /// never above `max_delay`.
    pub fn delay_for(&self, retry: u32, rng: &mut impl Rng) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let nominal = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter: f64 = rng.gen_range(0.9..=1.1);
        nominal.mul_f64(jitter).min(self.max_delay)
    }
}

/// Result of a reachability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connectivity {
    pub reachable: bool,
    pub status: Option<u16>,
    pub detail: String,
}

/// Executes requests over a [`Transport`] with retry and timing.
pub struct HttpExecutor<T> {
    transport: T,
    timeout: Duration,
    retry: RetryPolicy,
    rng: SmallRng,
}

impl HttpExecutor<ReqwestTransport> {
    /// Executor over reqwest, configured from `[http]` settings.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_settings(http: &HttpSettings) -> Result<Self, RunnerError> {
        Ok(Self::new(ReqwestTransport::new()?)
            .with_timeout(http.timeout())
            .with_retry(RetryPolicy::from_settings(http)))
    }
}

impl<T: Transport> HttpExecutor<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: HttpSettings::default().timeout(),
            retry: RetryPolicy::default(),
            rng: SmallRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request`, retrying connection failures and timeouts.
    ///
    /// Makes at most `max_retries + 1` attempts. `elapsed_ms` covers all of
    /// them, backoff included.
    pub fn execute(&mut self, request: &ResolvedRequest) -> ResponseOutcome {
        let start = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.transport.send(request, self.timeout) {
                Ok(raw) => {
                    tracing::debug!(url = %request.url, status = raw.status, attempt, "response");
                    let mut outcome = ResponseOutcome::from_status(
                        raw.status,
                        raw.headers,
                        ResponseBody::from_bytes(&raw.body),
                        elapsed_ms(start),
                        attempt,
                    );
                    outcome.error = raw.body_error;
                    return outcome;
                }
                Err(e) if e.is_retryable() && attempt <= self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt - 1, &mut self.rng);
                    tracing::warn!(
                        url = %request.url,
                        attempt,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "retrying request"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, attempt, error = %e, "request failed");
                    return ResponseOutcome::from_error(
                        e.to_string(),
                        elapsed_ms(start),
                        attempt,
                    );
                }
            }
        }
    }

    /// Try `base_url` with HEAD, then GET. Any status below 500 counts as reachable.
    pub fn check_connectivity(&self, base_url: &str) -> Connectivity {
        let mut last_status = None;
        let mut detail = String::new();
        for method in [specrun_core::HttpMethod::Head, specrun_core::HttpMethod::Get] {
            let request = ResolvedRequest::new(method, base_url);
            match self.transport.send(&request, self.timeout) {
                Ok(raw) if raw.status < 500 => {
                    return Connectivity {
                        reachable: true,
                        status: Some(raw.status),
                        detail: format!("{method} {base_url} → {}", raw.status),
                    };
                }
                Ok(raw) => {
                    last_status = Some(raw.status);
                    detail = format!("{method} {base_url} → {}", raw.status);
                }
                Err(e) => detail = format!("{method} {base_url}: {e}"),
            }
        }
        Connectivity {
            reachable: false,
            status: last_status,
            detail,
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}


#[cfg(test)]
mod tests {
    use super::fake::{AlwaysTimeout, ScriptedTransport, json};
    use super::*;
    use specrun_core::HttpMethod;

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn get(url: &str) -> ResolvedRequest {
        ResolvedRequest::new(HttpMethod::Get, url)
    }

    #[test]
    fn always_timeout_makes_bounded_attempts() {
        let transport = AlwaysTimeout {
            calls: std::cell::Cell::new(0),
        };
        let mut exec = HttpExecutor::new(transport).with_retry(no_wait(3));
        let outcome = exec.execute(&get("http://api.test/slow"));
        assert_eq!(exec.transport().calls.get(), 4);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.status_code, None);
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("timed out"));
    }

    #[test]
    fn connect_error_then_success() {
        let transport = ScriptedTransport::new([
            Err(TransportError::Connect("refused".into())),
            json(201, serde_json::json!({"id": 7})),
        ]);
        let mut exec = HttpExecutor::new(transport).with_retry(no_wait(3));
        let outcome = exec.execute(&get("http://api.test/users"));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.status_code, Some(201));
        assert!(outcome.success);
        assert_eq!(outcome.body, ResponseBody::Json(serde_json::json!({"id": 7})));
        assert_eq!(outcome.headers["content-type"], "application/json");
    }

    #[test]
    fn http_errors_are_not_retried() {
        let transport = ScriptedTransport::new([json(503, serde_json::json!({"error": "down"}))]);
        let mut exec = HttpExecutor::new(transport).with_retry(no_wait(3));
        let outcome = exec.execute(&get("http://api.test/x"));
        assert_eq!(exec.transport().calls(), 1);
        assert_eq!(outcome.status_code, Some(503));
        assert!(!outcome.success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn malformed_request_fails_immediately() {
        let transport = ScriptedTransport::new([Err(TransportError::Request("bad url".into()))]);
        let mut exec = HttpExecutor::new(transport).with_retry(no_wait(3));
        let outcome = exec.execute(&get("::nope"));
        assert_eq!(exec.transport().calls(), 1);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.is_error());
    }

    #[test]
    fn non_json_body_kept_as_text() {
        let transport = ScriptedTransport::new([Ok(RawHttpResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: b"pong".to_vec(),
            body_error: None,
        })]);
        let mut exec = HttpExecutor::new(transport);
        let outcome = exec.execute(&get("http://api.test/ping"));
        assert_eq!(outcome.body, ResponseBody::Text("pong".into()));
    }

    #[test]
    fn status_with_unreadable_body_is_not_resent() {
        let transport = ScriptedTransport::new([Ok(RawHttpResponse {
            status: 201,
            headers: BTreeMap::new(),
            body: Vec::new(),
            body_error: Some("response body could not be read: timed out".into()),
        })]);
        let mut exec = HttpExecutor::new(transport).with_retry(no_wait(3));
        let mut post = ResolvedRequest::new(HttpMethod::Post, "http://api.test/accounts");
        post.payload = Some(serde_json::json!({"name": "a"}));

        let outcome = exec.execute(&post);

        assert_eq!(exec.transport().calls(), 1);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.status_code, Some(201));
        assert!(outcome.success);
        assert_eq!(outcome.body, ResponseBody::Empty);
        assert!(outcome.error.as_deref().unwrap().contains("body"));
        assert!(!outcome.is_error());
    }

    /// Accepts one connection, answers with `response` and holds the socket
    /// open for `hold`. The handle yields the raw request bytes.
    fn serve_once(
        response: &'static [u8],
        hold: Duration,
    ) -> (String, std::thread::JoinHandle<Vec<u8>>) {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).unwrap();
            buf.truncate(n);
            stream.write_all(response).unwrap();
            stream.flush().unwrap();
            std::thread::sleep(hold);
            buf
        });
        (url, handle)
    }

    #[test]
    fn reqwest_stalled_body_keeps_status_without_retry() {
        let (url, server) = serve_once(
            b"HTTP/1.1 201 Created\r\nContent-Length: 20\r\n\r\nhello",
            Duration::from_millis(900),
        );
        let mut exec = HttpExecutor::new(ReqwestTransport::new().unwrap())
            .with_timeout(Duration::from_millis(300))
            .with_retry(no_wait(2));

        let outcome = exec.execute(&get(&format!("{url}/accounts")));

        assert_eq!(outcome.status_code, Some(201));
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.is_some());
        server.join().unwrap();
    }

    #[test]
    fn reqwest_drops_invalid_header_names() {
        let (url, server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n{}",
            Duration::ZERO,
        );
        let mut exec = HttpExecutor::new(ReqwestTransport::new().unwrap()).with_retry(no_wait(0));
        let mut request = get(&format!("{url}/ping"));
        request.headers.insert("bad header".into(), "x".into());
        request.headers.insert("x-trace".into(), "abc".into());

        let outcome = exec.execute(&request);

        assert_eq!(outcome.status_code, Some(200));
        let sent = String::from_utf8(server.join().unwrap()).unwrap().to_lowercase();
        assert!(sent.contains("x-trace: abc"));
        assert!(!sent.contains("bad header"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8000),
        };
        let mut rng = SmallRng::seed_from_u64(7);
        let d0 = policy.delay_for(0, &mut rng);
        let d2 = policy.delay_for(2, &mut rng);
        let d10 = policy.delay_for(10, &mut rng);
        let d40 = policy.delay_for(40, &mut rng);
        assert!((450..=550).contains(&d0.as_millis()), "{d0:?}");
        assert!((1800..=2200).contains(&d2.as_millis()), "{d2:?}");
        assert!(d10 <= Duration::from_millis(8000));
        assert!(d10 >= Duration::from_millis(7200));
        assert!(d40 <= Duration::from_millis(8000));
    }

    #[test]
    fn connectivity_head_then_get() {
        let transport = ScriptedTransport::new([
            json(503, serde_json::json!({})),
            json(404, serde_json::json!({})),
        ]);
        let exec = HttpExecutor::new(transport);
        let c = exec.check_connectivity("http://api.test");
        assert!(c.reachable);
        assert_eq!(c.status, Some(404));
        let sent = exec.transport().sent.borrow();
        assert_eq!(sent[0].method, HttpMethod::Head);
        assert_eq!(sent[1].method, HttpMethod::Get);
    }

    #[test]
    fn connectivity_unreachable() {
        let exec = HttpExecutor::new(AlwaysTimeout {
            calls: std::cell::Cell::new(0),
        });
        let c = exec.check_connectivity("http://api.test");
        assert!(!c.reachable);
        assert_eq!(exec.transport().calls.get(), 2);
        assert!(c.detail.starts_with("GET http://api.test"));
    }

    #[test]
    fn query_pairs_repeat_arrays() {
        let params = BTreeMap::from([
            ("ids".to_string(), serde_json::json!([1, 2])),
            ("q".to_string(), serde_json::json!("x y")),
            ("skip".to_string(), serde_json::Value::Null),
            ("limit".to_string(), serde_json::json!(10)),
        ]);
        assert_eq!(
            query_pairs(&params),
            vec![
                ("ids".to_string(), "1".to_string()),
                ("ids".to_string(), "2".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("q".to_string(), "x y".to_string()),
            ]
        );
    }
}
