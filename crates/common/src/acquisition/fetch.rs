use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

use super::article;
use crate::config::AcquisitionConfig;
use crate::errors::{AppError, Result};

/// Downloads web pages and pulls out their main text
#[derive(Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    /// Largest body read from a page
    max_bytes: usize,
}

impl PageFetcher {
    pub fn new(config: &AcquisitionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            max_bytes: config.max_upload_bytes,
        })
    }

    /// Fetch `url` and return its readable text.
    ///
    /// Any failure, including a page with no extractable text, is reported
    /// as [`AppError::UrlExtraction`].
    pub async fn extract_text(&self, url: &str) -> Result<String> {
        let failed = || AppError::UrlExtraction {
            url: url.to_string(),
        };

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            tracing::warn!(url = %url, "Refusing to fetch non-HTTP URL");
            return Err(failed());
        }

        let mut response = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Page fetch failed");
            failed()
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Page fetch returned error status");
            return Err(failed());
        }

        let is_plain_text = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/plain"));

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            tracing::warn!(url = %url, limit = self.max_bytes, "Page larger than the size limit");
            return Err(failed());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to read page body");
            failed()
        })? {
            if bytes.len() + chunk.len() > self.max_bytes {
                tracing::warn!(url = %url, limit = self.max_bytes, "Page body exceeded the size limit");
                return Err(failed());
            }
            bytes.extend_from_slice(&chunk);
        }
        let body = String::from_utf8_lossy(&bytes);

        let text = if is_plain_text {
            body.trim().to_string()
        } else {
            article::extract_main_text(&body)
        };

        if text.is_empty() {
            tracing::warn!(url = %url, "Page had no extractable text");
            return Err(failed());
        }

        tracing::debug!(url = %url, chars = text.len(), "Extracted page text");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> PageFetcher {
        PageFetcher::new(&AcquisitionConfig {
            user_agent: "cognify-test".into(),
            ..AcquisitionConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_extracts_article_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/post"))
            .and(header("user-agent", "cognify-test"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><body><nav>menu</nav><article><p>Mitosis splits cells.</p></article></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;

        let text = fetcher()
            .extract_text(&format!("{}/post", server.uri()))
            .await
            .unwrap();
        assert_eq!(text, "Mitosis splits cells.");
    }

    #[tokio::test]
    async fn test_error_status_is_url_extraction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fetcher().extract_text(&url).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Failed to extract content from URL: {url}"));
    }

    #[tokio::test]
    async fn test_empty_page_is_url_extraction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html><body><script>x</script></body></html>", "text/html"))
            .mount(&server)
            .await;

        let err = fetcher().extract_text(&server.uri()).await.unwrap_err();
        assert!(matches!(err, AppError::UrlExtraction { .. }));
    }

    #[tokio::test]
    async fn test_oversized_page_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("a".repeat(2048), "text/plain"))
            .mount(&server)
            .await;

        let small = PageFetcher::new(&AcquisitionConfig {
            max_upload_bytes: 1024,
            ..AcquisitionConfig::default()
        })
        .unwrap();
        let err = small.extract_text(&server.uri()).await.unwrap_err();
        assert!(matches!(err, AppError::UrlExtraction { .. }));

        let text = fetcher().extract_text(&server.uri()).await.unwrap();
        assert_eq!(text.len(), 2048);
    }

    #[tokio::test]
    async fn test_non_http_scheme_rejected() {
        let err = fetcher().extract_text("ftp://example.com/file").await.unwrap_err();
        assert!(matches!(err, AppError::UrlExtraction { .. }));
    }
}
