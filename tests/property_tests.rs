use proptest::prelude::*;
use sshfolio::{LimiterRegistry, PeerAddr, RateKey, SweepPolicy, TokenBucket};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn rate(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero rate")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: a fresh key gets exactly N admissions at one instant, then denials
    #[test]
    fn fresh_key_admits_exactly_n(n in 1u32..200, extra in 1usize..20) {
        let registry = LimiterRegistry::new(rate(n));
        let key = RateKey::from("203.0.113.7");
        let now = Instant::now();

        let admitted = (0..n as usize + extra)
            .filter(|_| registry.allow_at(&key, now))
            .count();
        prop_assert_eq!(admitted, n as usize);
    }

    /// Property: exhausting one key never affects another
    #[test]
    fn keys_are_independent(n in 1u32..50, a in any::<[u8; 4]>(), b in any::<[u8; 4]>()) {
        prop_assume!(a != b);
        let registry = LimiterRegistry::new(rate(n));
        let first = PeerAddr::from(std::net::SocketAddr::from((a, 1000))).rate_key();
        let second = PeerAddr::from(std::net::SocketAddr::from((b, 1000))).rate_key();
        let now = Instant::now();

        while registry.allow_at(&first, now) {}
        prop_assert!(registry.allow_at(&second, now));
    }

    /// Property: after 60/N seconds (rounded up) an exhausted key gets one more admission
    #[test]
    fn refill_restores_one_token(n in 1u32..600) {
        let start = Instant::now();
        let mut bucket = TokenBucket::per_minute(rate(n), start);
        while bucket.allow_at(start) {}

        let period = Duration::from_nanos((60_000_000_000u64).div_ceil(n as u64));
        prop_assert!(bucket.allow_at(start + period));
        prop_assert!(!bucket.allow_at(start + period));
    }

    /// Property: tokens never exceed the burst, however long the key idles
    #[test]
    fn tokens_capped_at_burst(n in 1u32..1000, idle_secs in 0u64..100_000) {
        let start = Instant::now();
        let mut bucket = TokenBucket::per_minute(rate(n), start);
        bucket.allow_at(start);

        let later = start + Duration::from_secs(idle_secs);
        let admitted = (0..n as usize + 5).filter(|_| bucket.allow_at(later)).count();
        prop_assert!(admitted <= n as usize);
    }

    /// Property: a full sweep gives every key a fresh quota
    #[test]
    fn sweep_restores_quota(n in 1u32..20, keys in prop::collection::hash_set("[a-z]{1,8}", 1..10)) {
        let registry = LimiterRegistry::new(rate(n));
        let now = Instant::now();
        for key in &keys {
            let key = RateKey::new(key.as_str());
            while registry.allow_at(&key, now) {}
        }

        prop_assert_eq!(registry.sweep_with(SweepPolicy::ClearAll, now), keys.len());
        prop_assert!(registry.is_empty());
        for key in &keys {
            prop_assert!(registry.allow_at(&RateKey::new(key.as_str()), now));
        }
    }

    /// Property: concurrent first use of one key admits exactly N
    #[test]
    fn concurrent_first_use_admits_exactly_n(n in 1u32..30, tasks in 31usize..64) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .build()
            .expect("runtime");
        let registry = Arc::new(LimiterRegistry::new(rate(n)));
        let key = RateKey::from("198.51.100.1");

        let admitted = runtime.block_on(async {
            let handles: Vec<_> = (0..tasks)
                .map(|_| {
                    let registry = registry.clone();
                    let key = key.clone();
                    tokio::spawn(async move { registry.allow(&key) })
                })
                .collect();

            let mut admitted = 0;
            for handle in handles {
                if handle.await.expect("task") {
                    admitted += 1;
                }
            }
            admitted
        });

        prop_assert_eq!(admitted, n as usize);
    }
}

#[test]
fn ports_of_one_host_share_a_key() {
    let a: PeerAddr = "192.0.2.10:50000".into();
    let b: PeerAddr = "192.0.2.10:50001".into();
    let v6: PeerAddr = "[2001:db8::1]:22".into();

    assert_eq!(a.rate_key(), b.rate_key());
    assert_eq!(v6.rate_key().as_str(), "2001:db8::1");
}

#[test]
fn sweeper_stops_on_shutdown() {
    tokio_test::block_on(async {
        let registry = Arc::new(LimiterRegistry::new(rate(1)));
        let (tx, rx) = tokio::sync::broadcast::channel(1);
        let handle = sshfolio::security::spawn_sweeper(
            registry,
            Duration::from_secs(3600),
            SweepPolicy::ClearAll,
            rx,
        );

        tx.send(()).expect("sweeper subscribed");
        assert!(handle.await.is_ok());
    });
}
