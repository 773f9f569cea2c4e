//! HTTP delivery with retries and fallback files
//!
//! Failed posts are retried with Fibonacci backoff. When every attempt
//! fails the body is written to a fallback file whose name encodes where it
//! was headed, so an operator or replay job can resend it.

use apolo_core::{AppError, AppResult};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

pub const ACTIONS_POSTER_MODULE: &str = "*actions";
pub const META_HTTP_JSON: &str = "*http_json";
pub const CONTENT_JSON: &str = "application/json";

/// Separator between the components of a fallback file name
pub const FALLBACK_SEP: char = '|';

/// Name of a fallback file: `module|transport|escaped-address|request-id` + suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackFileName {
    pub module: String,
    pub transport: String,
    pub address: String,
    pub request_id: String,
    pub file_suffix: String,
}

impl FallbackFileName {
    pub fn new(module: impl Into<String>, transport: &str, address: &str, file_suffix: &str) -> Self {
        Self {
            module: module.into(),
            transport: transport.to_string(),
            address: address.to_string(),
            request_id: Uuid::new_v4().to_string(),
            file_suffix: file_suffix.to_string(),
        }
    }

    pub fn as_string(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{}",
            self.module,
            self.transport,
            urlencoding::encode(&self.address),
            self.request_id,
            self.file_suffix,
            sep = FALLBACK_SEP
        )
    }

    pub fn parse(name: &str) -> AppResult<Self> {
        let parts: Vec<&str> = name.splitn(4, FALLBACK_SEP).collect();
        let [module, transport, address, tail] = parts[..] else {
            return Err(AppError::Parser(format!("invalid fallback file name: {}", name)));
        };
        let address = urlencoding::decode(address)
            .map_err(|e| AppError::Parser(format!("invalid address in {}: {}", name, e)))?
            .into_owned();
        let (request_id, file_suffix) = match tail.find('.') {
            Some(idx) => tail.split_at(idx),
            None => (tail, ""),
        };
        Ok(Self {
            module: module.to_string(),
            transport: transport.to_string(),
            address,
            request_id: request_id.to_string(),
            file_suffix: file_suffix.to_string(),
        })
    }
}

/// Fibonacci delays starting at `base` (1, 1, 2, 3, 5 ... times base)
struct Fibonacci {
    current: Duration,
    next: Duration,
}

impl Fibonacci {
    fn new(base: Duration) -> Self {
        Self {
            current: base,
            next: base,
        }
    }
}

impl Iterator for Fibonacci {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self.current;
        self.current = self.next;
        self.next += delay;
        Some(delay)
    }
}

#[derive(Clone)]
pub struct HttpPoster {
    client: Client,
    backoff_base: Duration,
}

impl HttpPoster {
    pub fn new(skip_tls_verify: bool, reply_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(reply_timeout)
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| AppError::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first backoff delay
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// POST `body` to `address`, retrying up to `attempts` times.
    ///
    /// Returns the reply body of the first 2xx response. When every attempt
    /// fails and `fallback` is given, the body is written there before the
    /// error is returned.
    #[instrument(skip(self, body, fallback), fields(address = %address))]
    pub async fn post(
        &self,
        address: &str,
        content_type: &str,
        body: Vec<u8>,
        attempts: u32,
        fallback: Option<&Path>,
    ) -> AppResult<Vec<u8>> {
        let attempts = attempts.max(1);
        let mut delays = Fibonacci::new(self.backoff_base);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.try_post(address, content_type, &body).await {
                Ok(reply) => {
                    debug!(attempt, "Post delivered");
                    return Ok(reply);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Post failed");
                    last_error = e;
                }
            }
            if attempt < attempts {
                if let Some(delay) = delays.next() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        if let Some(path) = fallback {
            write_fallback(path, &body).await;
        }
        Err(AppError::Http(format!("{}: {}", address, last_error)))
    }

    async fn try_post(&self, address: &str, content_type: &str, body: &[u8]) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .post(address)
            .header(CONTENT_TYPE, content_type)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("unexpected status {}", status));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }
}

async fn write_fallback(path: &Path, body: &[u8]) {
    if let Some(dir) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            error!(path = %dir.display(), error = %e, "Cannot create fallback directory");
            return;
        }
    }
    match tokio::fs::write(path, body).await {
        Ok(()) => warn!(path = %path.display(), "Post saved to fallback file"),
        Err(e) => error!(path = %path.display(), error = %e, "Cannot write fallback file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_name_round_trip() {
        let ffn = FallbackFileName::new(
            "*actions>*call_url",
            META_HTTP_JSON,
            "http://localhost:2080/hook?a=b|c",
            ".json",
        );
        let name = ffn.as_string();
        assert!(!name.contains('/'));
        assert_eq!(name.matches(FALLBACK_SEP).count(), 3);
        assert!(name.ends_with(".json"));

        let parsed = FallbackFileName::parse(&name).unwrap();
        assert_eq!(parsed, ffn);
    }

    #[test]
    fn test_fallback_name_rejects_short_names() {
        assert!(FallbackFileName::parse("*actions|*http_json").is_err());
    }

    #[test]
    fn test_fibonacci_delays() {
        let delays: Vec<u64> = Fibonacci::new(Duration::from_secs(1))
            .take(6)
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![1, 1, 2, 3, 5, 8]);
    }

    #[tokio::test]
    async fn test_post_success_returns_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", CONTENT_JSON)
            .with_status(200)
            .with_body("OK")
            .create_async()
            .await;

        let poster = HttpPoster::new(false, Duration::from_secs(2)).unwrap();
        let reply = poster
            .post(&format!("{}/hook", server.url()), CONTENT_JSON, b"{}".to_vec(), 3, None)
            .await
            .unwrap();
        assert_eq!(reply, b"OK");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_failure_writes_fallback() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("failed").join("post.json");

        let poster = HttpPoster::new(false, Duration::from_secs(2))
            .unwrap()
            .with_backoff_base(Duration::from_millis(1));
        let err = poster
            .post(
                &format!("{}/hook", server.url()),
                CONTENT_JSON,
                br#"{"ID":"x"}"#.to_vec(),
                2,
                Some(&path),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
        mock.assert_async().await;
        assert_eq!(std::fs::read(&path).unwrap(), br#"{"ID":"x"}"#);
    }
}
