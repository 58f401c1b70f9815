// Layer 1: Standard library imports
use std::collections::HashSet;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::error::AskErrorKind;

/// Configuration of ask timeouts and retry/backoff behavior.
///
/// The default profile uses a 5s per-attempt timeout with up to 3 retries
/// and exponential backoff (100ms base, 2.0 multiplier, 10s cap). Only
/// timeouts are retried unless the retryable set is widened.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use troupe_rt::ask::AskConfig;
///
/// let config = AskConfig::default()
///     .with_default_timeout(Duration::from_millis(250))
///     .with_max_retries(1);
/// assert_eq!(config.max_retries, 1);
/// ```
#[derive(Debug, Clone)]
pub struct AskConfig {
    /// Per-attempt timeout when the caller does not supply one.
    pub default_timeout: Duration,
    /// Maximum number of retries; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub retry_backoff_base: Duration,
    /// Growth factor per retry; clamped to at least 1.0.
    pub retry_backoff_multiplier: f64,
    /// Upper bound on any single backoff delay.
    pub max_backoff: Duration,
    pub enable_retries: bool,
    /// Error kinds eligible for retry.
    pub retryable_kinds: HashSet<AskErrorKind>,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_backoff_base: Duration::from_millis(100),
            retry_backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
            enable_retries: true,
            retryable_kinds: HashSet::from([AskErrorKind::Timeout]),
        }
    }
}

impl AskConfig {
    /// Preset for interactive development: generous timeout, more retries.
    pub fn development() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_retries: 5,
            retry_backoff_base: Duration::from_millis(200),
            ..Self::default()
        }
    }

    /// Preset for production: tight timeout, fewer retries.
    pub fn production() -> Self {
        Self {
            default_timeout: Duration::from_secs(3),
            max_retries: 2,
            retry_backoff_base: Duration::from_millis(50),
            ..Self::default()
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, base: Duration, multiplier: f64, cap: Duration) -> Self {
        self.retry_backoff_base = base;
        self.retry_backoff_multiplier = multiplier.max(1.0);
        self.max_backoff = cap;
        self
    }

    pub fn without_retries(mut self) -> Self {
        self.enable_retries = false;
        self
    }

    pub fn with_retryable_kinds(mut self, kinds: HashSet<AskErrorKind>) -> Self {
        self.retryable_kinds = kinds;
        self
    }

    /// Backoff before retry number `attempt` (1-based):
    /// `min(base * multiplier^(attempt - 1), max_backoff)`.
    ///
    /// Non-positive attempts yield zero.
    pub fn calculate_backoff(&self, attempt: i32) -> Duration {
        if attempt <= 0 {
            return Duration::ZERO;
        }
        let multiplier = self.retry_backoff_multiplier.max(1.0);
        let scaled = self.retry_backoff_base.as_secs_f64() * multiplier.powi(attempt - 1);
        if !scaled.is_finite() || scaled >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let config = AskConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff_base, Duration::from_millis(100));
        assert!(config.enable_retries);
        assert!(config.retryable_kinds.contains(&AskErrorKind::Timeout));
        assert_eq!(config.retryable_kinds.len(), 1);
    }

    #[test]
    fn test_presets_differ_only_in_parameters() {
        let dev = AskConfig::development();
        assert_eq!(dev.default_timeout, Duration::from_secs(30));
        assert_eq!(dev.max_retries, 5);
        assert_eq!(dev.retry_backoff_base, Duration::from_millis(200));

        let prod = AskConfig::production();
        assert_eq!(prod.default_timeout, Duration::from_secs(3));
        assert_eq!(prod.max_retries, 2);
        assert_eq!(prod.retry_backoff_base, Duration::from_millis(50));
    }

    #[test]
    fn test_backoff_progression_and_cap() {
        let config = AskConfig::default().with_backoff(
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(5),
        );
        assert_eq!(config.calculate_backoff(1), Duration::from_millis(100));
        assert_eq!(config.calculate_backoff(2), Duration::from_millis(200));
        assert_eq!(config.calculate_backoff(3), Duration::from_millis(400));
        assert_eq!(config.calculate_backoff(4), Duration::from_millis(800));
        assert_eq!(config.calculate_backoff(10), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_non_positive_attempts() {
        let config = AskConfig::default();
        assert_eq!(config.calculate_backoff(0), Duration::ZERO);
        assert_eq!(config.calculate_backoff(-3), Duration::ZERO);
    }

    #[test]
    fn test_multiplier_clamped_to_one() {
        let config = AskConfig::default().with_backoff(
            Duration::from_millis(100),
            0.5,
            Duration::from_secs(1),
        );
        // A multiplier below 1.0 would shrink delays; it is clamped instead.
        assert_eq!(config.calculate_backoff(2), Duration::from_millis(100));
    }

    #[test]
    fn test_huge_attempt_saturates_at_cap() {
        let config = AskConfig::default();
        assert_eq!(config.calculate_backoff(1_000), config.max_backoff);
    }
}
