use std::num::NonZeroU32;
use std::time::{Duration, Instant};

const NANOS_PER_MINUTE: f64 = 60_000_000_000.0;

/// Continuous-refill token bucket guarding one client identity
///
/// Credit refills lazily on each call at `refill` tokens per minute, capped
/// at `burst`. Fractional credit carries over between calls, so a client that
/// is denied still accrues towards its next token.
///
/// # Examples
///
/// ```
/// use sshfolio::TokenBucket;
/// use std::num::NonZeroU32;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut bucket = TokenBucket::per_minute(NonZeroU32::new(2).unwrap(), start);
///
/// assert!(bucket.allow_at(start));
/// assert!(bucket.allow_at(start));
/// assert!(!bucket.allow_at(start));
///
/// // One token every 30 seconds
/// assert!(bucket.allow_at(start + Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    refill: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
    last_access: Instant,
}

impl TokenBucket {
    /// Creates a full bucket refilling at `refill_per_minute`
    pub fn new(refill_per_minute: NonZeroU32, burst: NonZeroU32, now: Instant) -> Self {
        let burst = f64::from(burst.get());
        Self {
            refill: f64::from(refill_per_minute.get()),
            burst,
            tokens: burst,
            last_refill: now,
            last_access: now,
        }
    }

    /// Creates a full bucket that allows `per_minute` requests per minute,
    /// all of which may be spent at once
    pub fn per_minute(per_minute: NonZeroU32, now: Instant) -> Self {
        Self::new(per_minute, per_minute, now)
    }

    /// Attempts to consume one token at `now`
    pub fn allow_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.last_access = self.last_access.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Current credit balance, without refilling
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Maximum credit balance
    pub fn burst(&self) -> f64 {
        self.burst
    }

    /// Time of the most recent `allow` call
    pub fn last_access(&self) -> Instant {
        self.last_access
    }

    /// How long the bucket has gone untouched as of `now`
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }

    fn refill(&mut self, now: Instant) {
        // Callers racing with stale timestamps must not rewind the clock.
        if now <= self.last_refill {
            return;
        }
        // Whole nanoseconds keep exact multiples of the refill period exact.
        let elapsed = now.duration_since(self.last_refill).as_nanos() as f64;
        self.tokens = (self.tokens + elapsed * self.refill / NANOS_PER_MINUTE).min(self.burst);
        self.last_refill = now;
    }
}
