//! Per-site spacing between page fetches.
//!
//! A run usually issues several searches against the same storefront.
//! [`ThrottledFetcher`] wraps any [`Fetcher`] and makes consecutive fetches
//! to one host wait at least `interval` (plus optional jitter) after the
//! previous slot, while fetches to other hosts proceed independently.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use kestrel_core::throttle::{ThrottleConfig, ThrottledFetcher};
//! # use kestrel_core::traits::Fetcher;
//! # #[derive(Clone)] struct MyFetcher;
//! # impl Fetcher for MyFetcher {
//! #     async fn fetch(&self, _: &str) -> Result<String, kestrel_core::error::AppError> { todo!() }
//! # }
//! let config = ThrottleConfig::new(Duration::from_secs(10)).with_jitter(Duration::from_secs(5));
//! let fetcher = ThrottledFetcher::new(MyFetcher, config);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use url::Url;

use crate::error::AppError;
use crate::traits::Fetcher;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum spacing between two fetch slots on the same host.
    pub interval: Duration,
    /// Upper bound of the random extra delay added to each slot.
    pub jitter: Duration,
}

impl ThrottleConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn spacing(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        self.interval + Duration::from_millis(jitter_ms(self.jitter.as_millis() as u64))
    }
}

/// A [`Fetcher`] that spaces out requests per host.
///
/// Each call reserves the next free slot for its host under the lock and
/// sleeps outside it, so concurrent callers queue up in arrival order.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    config: ThrottleConfig,
    next_slot: Arc<Mutex<HashMap<String, Instant>>>,
}

impl<F: Fetcher> ThrottledFetcher<F> {
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            next_slot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn host_key(url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        Some(url.host_str()?.to_ascii_lowercase())
    }

    /// Reserve a slot for `host` and return how long to wait for it.
    async fn reserve(&self, host: &str) -> Duration {
        let now = Instant::now();
        let mut slots = self.next_slot.lock().await;
        let slot = match slots.get(host) {
            Some(&next) if next > now => next,
            _ => now,
        };
        slots.insert(host.to_string(), slot + self.config.spacing());
        slot.saturating_duration_since(now)
    }
}

impl<F: Fetcher> Fetcher for ThrottledFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some(host) = Self::host_key(url) {
            let wait = self.reserve(&host).await;
            if !wait.is_zero() {
                tracing::debug!(host = %host, wait_ms = %wait.as_millis(), "Throttling fetch");
                tokio::time::sleep(wait).await;
            }
        }
        self.inner.fetch(url).await
    }
}

// xorshift over the clock; jitter only needs to be unpredictable-looking.
fn jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
        | 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockFetcher;

    type Throttled = ThrottledFetcher<MockFetcher>;

    #[test]
    fn host_key_ignores_path_and_case() {
        assert_eq!(
            Throttled::host_key("https://WWW.Daraz.com.np/catalog/?q=tv"),
            Some("www.daraz.com.np".to_string())
        );
        assert_eq!(Throttled::host_key("not a url"), None);
    }

    #[test]
    fn spacing_with_jitter_is_bounded() {
        let config =
            ThrottleConfig::new(Duration::from_millis(100)).with_jitter(Duration::from_millis(50));
        for _ in 0..100 {
            let d = config.spacing();
            assert!(d >= Duration::from_millis(100));
            assert!(d < Duration::from_millis(150));
        }
        assert_eq!(
            ThrottleConfig::new(Duration::from_secs(2)).spacing(),
            Duration::from_secs(2)
        );
    }

    #[tokio::test]
    async fn same_host_fetches_are_spaced() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new("<html>ok</html>"),
            ThrottleConfig::new(Duration::from_millis(100)),
        );

        let start = Instant::now();
        fetcher.fetch("https://shop.example/s?q=a").await.unwrap();
        fetcher.fetch("https://shop.example/s?q=b").await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn different_hosts_are_independent() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::new("<html>ok</html>"),
            ThrottleConfig::new(Duration::from_millis(300)),
        );

        let start = Instant::now();
        fetcher.fetch("https://a.example/s").await.unwrap();
        fetcher.fetch("https://b.example/s").await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let fetcher = ThrottledFetcher::new(
            MockFetcher::with_error(AppError::HttpError("HTTP 503".into())),
            ThrottleConfig::new(Duration::ZERO),
        );
        let err = fetcher.fetch("https://shop.example").await.unwrap_err();
        assert!(matches!(err, AppError::HttpError(_)));
    }
}
