//! Transport boundary for remote catalog, thumbnail and blob-storage I/O.
//!
//! Every outbound request in the engine is expressed as an [`HttpRequest`] and
//! sent through an [`HttpTransport`]. Production code uses the reqwest-backed
//! transport; unit tests use the in-memory [`MockTransport`].

use async_trait::async_trait;
use thiserror::Error;

/// Verbs the engine sends: catalog and image reads, blob uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Header list. Lookups through [`header_get`] ignore case.
pub type HttpHeaders = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            body,
            ..Self::get(url)
        }
    }

    /// Append a header, keeping any already present.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("authorization", format!("Bearer {token}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// First non-blank line of the body, lossily decoded. Used in error text.
    #[must_use]
    pub fn summary_line(&self) -> String {
        String::from_utf8_lossy(&self.body)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// First header value matching `name`, case-insensitively.
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(feature = "youtube")]
pub mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport};

    /// Default request timeout for catalog and image fetches.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    fn transport_error(err: reqwest::Error) -> HttpError {
        HttpError::Transport(err.to_string())
    }

    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
            reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("vidsync/", env!("CARGO_PKG_VERSION")))
                .build()
                .map(Self::new)
                .map_err(transport_error)
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;
            let method = match method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
            };

            let builder = headers
                .iter()
                .fold(self.client.request(method, url.as_str()), |b, (name, value)| {
                    b.header(name.as_str(), value.as_str())
                });
            let builder = if body.is_empty() { builder } else { builder.body(body) };
            let resp = builder.send().await.map_err(transport_error)?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();
            // Drained on 304 too so the pooled connection can be reused.
            let body = resp.bytes().await.map_err(transport_error)?.to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}


#[cfg(test)]
pub use mock::MockTransport;

/// Build a response for tests.
#[cfg(test)]
pub(crate) fn response(status: u16, headers: &[(&str, &str)], body: &[u8]) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        body: body.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("ETag".to_string(), "\"abc\"".to_string()),
            ("etag".to_string(), "\"def\"".to_string()),
        ];
        assert_eq!(header_get(&headers, "etag"), Some("\"abc\""));
        assert_eq!(header_get(&headers, "ETAG"), Some("\"abc\""));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn post_carries_body_and_bearer() {
        let req = HttpRequest::post("https://storage.example.com/object/b/p.jpg", vec![1, 2, 3])
            .with_bearer("secret");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body, vec![1, 2, 3]);
        assert_eq!(header_get(&req.headers, "Authorization"), Some("Bearer secret"));
    }

    #[test]
    fn summary_line_skips_blank_lines() {
        let resp = response(500, &[], b"\n  quota exceeded  \nmore detail");
        assert_eq!(resp.summary_line(), "quota exceeded");
        assert_eq!(response(500, &[], b"").summary_line(), "");
    }

    #[test]
    fn request_builder_appends_headers() {
        let req = HttpRequest::get("https://i.ytimg.com/vi/v1/maxresdefault.jpg")
            .with_header("If-None-Match", "\"e1\"");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(header_get(&req.headers, "if-none-match"), Some("\"e1\""));
        assert!(req.body.is_empty());
    }

    #[test]
    fn response_status_helpers() {
        assert!(response(204, &[], b"").is_success());
        assert!(!response(304, &[], b"").is_success());
        assert!(response(304, &[], b"").is_not_modified());
        assert!(!response(500, &[], b"").is_success());
    }

    #[tokio::test]
    async fn mock_transport_returns_queued_responses_in_order() {
        let transport = MockTransport::new();
        let url = "https://example.com/img.jpg";
        transport.push_response(HttpMethod::Get, url, response(200, &[], b"first"));
        transport.push_response(HttpMethod::Get, url, response(304, &[], b""));

        let first = transport.send(HttpRequest::get(url)).await.expect("first");
        let second = transport.send(HttpRequest::get(url)).await.expect("second");
        assert_eq!(first.body, b"first".to_vec());
        assert_eq!(second.status, 304);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn mock_transport_reports_queued_errors_and_missing_routes() {
        let transport = MockTransport::new();
        transport.push_error(HttpMethod::Get, "https://example.com/a", "reset by peer");

        let err = transport
            .send(HttpRequest::get("https://example.com/a"))
            .await
            .expect_err("queued error");
        assert!(matches!(err, HttpError::Transport(ref m) if m == "reset by peer"));

        let err = transport
            .send(HttpRequest::get("https://example.com/b"))
            .await
            .expect_err("missing route");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "GET");
                assert_eq!(url, "https://example.com/b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    #[cfg(feature = "youtube")]
    async fn reqwest_transport_returns_transport_error_for_invalid_url() {
        let transport = reqwest_transport::ReqwestTransport::with_timeout(
            reqwest_transport::DEFAULT_TIMEOUT,
        )
        .expect("reqwest transport should build");
        let err = transport
            .send(HttpRequest::get("not a url"))
            .await
            .expect_err("expected error");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
