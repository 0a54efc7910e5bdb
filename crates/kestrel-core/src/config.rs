use std::time::Duration;

use crate::error::AppError;
use crate::filter::FilterThresholds;

/// Maximum number of records extracted per query. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemCap(usize);

impl ItemCap {
    pub const DEFAULT: ItemCap = ItemCap(40);

    pub fn new(cap: usize) -> Result<Self, AppError> {
        if cap == 0 {
            return Err(AppError::ConfigError(
                "Item cap must be at least 1".into(),
            ));
        }
        Ok(Self(cap))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for ItemCap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// How often a search page is refetched after a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before retry `attempt` (1-indexed), capped at 8x the base delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(3);
        self.base_delay.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(2))
    }
}

/// Settings shared by every query of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub max_items: ItemCap,
    pub thresholds: FilterThresholds,
    /// Queries fetched concurrently. Always at least 1.
    pub concurrency: usize,
    /// Minimum delay between two fetches to the same site.
    pub throttle: Duration,
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_items: ItemCap::DEFAULT,
            thresholds: FilterThresholds::default(),
            concurrency: 1,
            throttle: Duration::ZERO,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Read configuration from environment variables.
    ///
    /// - `KESTREL_MAX_ITEMS` (optional, defaults to 40)
    /// - `KESTREL_MIN_SOLD` (optional, defaults to 1)
    /// - `KESTREL_MIN_RATING` (optional, defaults to 1.0)
    /// - `KESTREL_CONCURRENCY` (optional, defaults to 1)
    /// - `KESTREL_THROTTLE_MS` (optional, defaults to 0)
    /// - `KESTREL_RETRIES` (optional, defaults to 2)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, AppError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_items = match parse_var::<usize>(&lookup, "KESTREL_MAX_ITEMS")? {
            Some(n) => ItemCap::new(n)?,
            None => defaults.max_items,
        };
        let min_sold =
            parse_var::<u64>(&lookup, "KESTREL_MIN_SOLD")?.unwrap_or(defaults.thresholds.min_sold);
        let min_rating = parse_var::<f32>(&lookup, "KESTREL_MIN_RATING")?
            .unwrap_or(defaults.thresholds.min_rating);
        let concurrency =
            parse_var::<usize>(&lookup, "KESTREL_CONCURRENCY")?.unwrap_or(defaults.concurrency);
        let throttle = parse_var::<u64>(&lookup, "KESTREL_THROTTLE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.throttle);
        let retry = match parse_var::<u32>(&lookup, "KESTREL_RETRIES")? {
            Some(max_retries) => RetryPolicy {
                max_retries,
                ..defaults.retry
            },
            None => defaults.retry,
        };

        let config = Self {
            max_items,
            thresholds: FilterThresholds {
                min_sold,
                min_rating,
            },
            concurrency,
            throttle,
            retry,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.concurrency == 0 {
            return Err(AppError::ConfigError(
                "KESTREL_CONCURRENCY must be at least 1".into(),
            ));
        }
        if !self.thresholds.min_rating.is_finite() || self.thresholds.min_rating < 0.0 {
            return Err(AppError::ConfigError(format!(
                "Minimum rating {} must be a non-negative number",
                self.thresholds.min_rating
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::ConfigError(format!("Invalid {key} '{raw}'"))),
    }
}
