use super::TokenBucket;
use crate::network::RateKey;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, info};

/// What a registry sweep evicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPolicy {
    /// Drop every entry. Every client gets its full burst back, including
    /// clients that were mid-window.
    ClearAll,
    /// Drop only entries untouched for at least this long
    IdleFor(Duration),
}

/// Process-wide map of rate-limit buckets, one per client identity
///
/// Lookup, lazy insert and sweep all go through one mutex, so concurrent
/// first calls for the same key always share a single bucket.
#[derive(Debug)]
pub struct LimiterRegistry {
    limiters: Mutex<HashMap<RateKey, TokenBucket>>,
    per_minute: NonZeroU32,
}

impl LimiterRegistry {
    pub fn new(per_minute: NonZeroU32) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            per_minute,
        }
    }

    /// Consumes one token for `key`, creating its bucket on first use
    pub fn allow(&self, key: &RateKey) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Same as [`allow`](Self::allow) with an explicit clock reading
    pub fn allow_at(&self, key: &RateKey, now: Instant) -> bool {
        let per_minute = self.per_minute;
        self.lock()
            .entry(key.clone())
            .or_insert_with(|| TokenBucket::per_minute(per_minute, now))
            .allow_at(now)
    }

    /// Clears every entry, returning how many were dropped
    pub fn sweep(&self) -> usize {
        self.sweep_with(SweepPolicy::ClearAll, Instant::now())
    }

    /// Applies `policy` as of `now`, returning how many entries were dropped
    pub fn sweep_with(&self, policy: SweepPolicy, now: Instant) -> usize {
        let mut limiters = self.lock();
        let before = limiters.len();
        match policy {
            SweepPolicy::ClearAll => limiters.clear(),
            SweepPolicy::IdleFor(threshold) => {
                limiters.retain(|_, bucket| bucket.idle_for(now) < threshold);
            }
        }
        before - limiters.len()
    }

    /// Number of tracked identities
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn per_minute(&self) -> NonZeroU32 {
        self.per_minute
    }

    // A panic while holding the lock cannot leave a bucket half-updated in a
    // way that matters, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<RateKey, TokenBucket>> {
        self.limiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawns the background task that sweeps `registry` every `period`
///
/// The task exits when `shutdown` fires or its sender is dropped.
pub fn spawn_sweeper(
    registry: Arc<LimiterRegistry>,
    period: Duration,
    policy: SweepPolicy,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = registry.sweep_with(policy, Instant::now());
                    debug!(evicted, remaining = registry.len(), ?policy, "Swept rate limiters");
                }
                _ = shutdown.recv() => {
                    info!("Rate limiter sweeper stopped");
                    break;
                }
            }
        }
    })
}
