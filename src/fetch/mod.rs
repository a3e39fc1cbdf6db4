//! HTTP transport for site adapters
//!
//! One shared [`PageFetcher`] wraps the reqwest client with the headers,
//! timeout, status mapping and charset-aware body decoding every adapter
//! needs. HTTP 410 maps to the distinguished [`FetchError::Gone`] signal so
//! removed articles are skipped without an error log.

use std::time::Duration;

use encoding_rs::Encoding;
use reqwest::{header, Client, StatusCode};

use crate::error::FetchError;

/// Shared HTTP client for fetching tracked pages.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Create a fetcher with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch a URL and decode its body to text.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Gone`] on HTTP 410
    /// - [`FetchError::ServerError`] on any other non-success status
    /// - [`FetchError::Timeout`] when the request deadline passes
    /// - [`FetchError::Decode`] when the body cannot be decoded to text
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::GONE {
            return Err(FetchError::Gone);
        }
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await.map_err(FetchError::Http)?;
        decode_bytes(&bytes, &content_type)
    }
}

/// Decode response bytes to a UTF-8 string.
///
/// Strategies, in order:
/// 1. charset from the Content-Type header
/// 2. strict UTF-8
/// 3. charset sniffed from a meta tag in the first 1024 bytes
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
    if let Some(encoding) = charset_from(content_type) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
        return Err(FetchError::Decode(format!(
            "body is not valid {}",
            encoding.name()
        )));
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    // Legacy pages often declare their charset only in a meta tag
    let head = &bytes[..bytes.len().min(1024)];
    let head_text = String::from_utf8_lossy(head);
    if let Some(encoding) = charset_from(&head_text) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok(text.into_owned());
        }
    }

    Err(FetchError::Decode(
        "could not determine response encoding".to_string(),
    ))
}

/// Resolve a `charset=` declaration anywhere in the given string.
fn charset_from(s: &str) -> Option<&'static Encoding> {
    let lower = s.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let rest = lower[idx + "charset=".len()..].trim_start_matches(['"', '\'']);
    let label: &str = rest
        .split(|c: char| c == ';' || c == '"' || c == '\'' || c == '>' || c.is_whitespace())
        .next()?;
    Encoding::for_label(label.trim().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_decode_utf8_without_header() {
        let text = decode_bytes("plain body".as_bytes(), "").unwrap();
        assert_eq!(text, "plain body");
    }

    #[test]
    fn test_decode_charset_from_header() {
        let euc_kr = Encoding::for_label(b"euc-kr").unwrap();
        let (bytes, _, _) = euc_kr.encode("\u{d55c}\u{ad6d}\u{c5b4}");
        let text = decode_bytes(bytes.as_ref(), "text/html; charset=euc-kr").unwrap();
        assert_eq!(text, "\u{d55c}\u{ad6d}\u{c5b4}");
    }

    #[test]
    fn test_decode_charset_from_meta_tag() {
        let win1252 = Encoding::for_label(b"windows-1252").unwrap();
        let page = "<html><head><meta charset=\"windows-1252\"></head><body>caf\u{e9}</body></html>";
        let (bytes, _, _) = win1252.encode(page);
        let text = decode_bytes(bytes.as_ref(), "text/html").unwrap();
        assert!(text.contains("caf\u{e9}"));
    }

    #[test]
    fn test_decode_failure() {
        // invalid UTF-8 with no charset declared anywhere
        let bytes = [0xff, 0xfe, 0xfd];
        assert!(matches!(
            decode_bytes(&bytes, "application/octet-stream"),
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string("the article body"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5), "newswatch-test").unwrap();
        let body = fetcher
            .fetch(&format!("{}/story", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "the article body");
    }

    #[tokio::test]
    async fn test_fetch_gone_is_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/removed"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5), "newswatch-test").unwrap();
        let err = fetcher
            .fetch(&format!("{}/removed", server.uri()))
            .await
            .unwrap_err();
        assert!(err.is_gone());
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(Duration::from_secs(5), "newswatch-test").unwrap();
        let err = fetcher
            .fetch(&format!("{}/broken", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ServerError(503)));
    }
}
