use std::time::Duration;

/// Exponential backoff between fetch attempts
///
/// `delay(attempt) = min(base * 2^attempt, cap)` with a 0-indexed attempt and
/// no jitter. The policy is stateless and `Copy`, so every worker can hold
/// its own copy.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use scrape_guard::fetch::BackoffPolicy;
///
/// let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(5));
/// assert_eq!(policy.delay(0), Duration::from_secs(1));
/// assert_eq!(policy.delay(2), Duration::from_secs(4));
/// assert_eq!(policy.delay(3), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
}

impl BackoffPolicy {
    /// Default cap on a single delay
    pub const DEFAULT_CAP: Duration = Duration::from_secs(60);

    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// A policy with the given base and the default cap
    pub fn with_base(base: Duration) -> Self {
        Self::new(base, Self::DEFAULT_CAP)
    }

    pub fn base(&self) -> Duration {
        self.base
    }

    /// Wait before the retry that follows failed attempt `attempt` (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self.base).min(self.cap)
    }
}

/// Uncapped `base * 2^attempt`, saturating instead of overflowing
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(Duration::MAX)
}
