use std::time::Duration;

use kestrel_core::error::AppError;
use kestrel_core::traits::Fetcher;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

/// Desktop browser User-Agent; storefronts serve a stripped page to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP fetcher using reqwest.
///
/// Suitable for storefronts that render search results server-side.
/// Pages that assemble listings with JavaScript need the `browser` feature.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_options(Duration::from_secs(30), DEFAULT_USER_AGENT)
    }

    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_custom_user_agent() {
        let fetcher = ReqwestFetcher::with_options(Duration::from_secs(5), "kestrel-test/1.0");
        assert!(fetcher.is_ok());
        assert_eq!(fetcher.unwrap().timeout_secs, 5);
    }

    #[test]
    fn rejects_invalid_user_agent() {
        let result = ReqwestFetcher::with_options(Duration::from_secs(5), "bad\nagent");
        assert!(matches!(result, Err(AppError::HttpError(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let fetcher =
            ReqwestFetcher::with_options(Duration::from_secs(2), DEFAULT_USER_AGENT).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:9/search").await;
        assert!(result.is_err());
    }
}
