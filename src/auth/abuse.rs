//! Per-address authentication failure accounting.
//!
//! Each process keeps its own in-memory failure counter per client address.
//! When an address accumulates `threshold` failures, a penalty record is
//! written to the shared store for the rate-limiting layer to act on, and
//! the local counter starts over from zero. The penalty write is best-effort:
//! a slow or unreachable store never blocks or fails the calling request.

use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AbuseConfig;
use crate::store::PenaltyStore;

/// Fixed cost weight in penalty keys, matching the external limiter's key scheme.
const PENALTY_KEY_SUFFIX: &str = "12:0";

pub struct AbuseCounter {
    counts: DashMap<IpAddr, u32>,
    threshold: u32,
    penalty_ttl: Duration,
    write_timeout: Duration,
    penalties: Arc<dyn PenaltyStore>,
}

impl AbuseCounter {
    pub fn new(config: &AbuseConfig, penalties: Arc<dyn PenaltyStore>) -> Self {
        Self {
            counts: DashMap::new(),
            threshold: config.threshold,
            penalty_ttl: config.penalty_ttl,
            write_timeout: config.penalty_write_timeout,
            penalties,
        }
    }

    /// Record one authentication failure for a client address.
    ///
    /// Counting is keyed by address only; `route` scopes the penalty record
    /// that is written when the threshold is reached. Never returns an error.
    pub async fn record_failure(&self, addr: IpAddr, route: &str) {
        // The counter reset happens inside the map guard so concurrent
        // failures for the same address cannot double-trip; the guard must be
        // dropped before the penalty write is awaited.
        let tripped = {
            let mut count = self.counts.entry(addr).or_insert(0);
            *count += 1;
            if *count >= self.threshold {
                *count = 0;
                true
            } else {
                false
            }
        };

        if !tripped {
            return;
        }

        let key = penalty_key(addr, route);
        let value = self.threshold.to_string();
        let ttl_secs = self.penalty_ttl.as_secs();

        match tokio::time::timeout(self.write_timeout, self.penalties.set(&key, &value, ttl_secs)).await {
            Ok(Ok(())) => {
                tracing::warn!(%addr, route, "abuse threshold reached, penalty recorded");
            }
            Ok(Err(e)) => {
                tracing::warn!(%addr, route, error = %e, "abuse threshold reached but penalty write failed");
            }
            Err(_) => {
                tracing::warn!(%addr, route, "abuse threshold reached but penalty write timed out");
            }
        }
    }

    /// Current failure count for an address (zero if never seen).
    #[cfg(test)]
    pub fn count(&self, addr: IpAddr) -> u32 {
        self.counts.get(&addr).map(|c| *c).unwrap_or(0)
    }
}

fn penalty_key(addr: IpAddr, route: &str) -> String {
    format!("ratelimit:{addr}:{route}:{PENALTY_KEY_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockPenaltyStore;

    fn counter_with_mock() -> (AbuseCounter, Arc<MockPenaltyStore>) {
        let penalties = Arc::new(MockPenaltyStore::new());
        let counter = AbuseCounter::new(&AbuseConfig::default(), penalties.clone());
        (counter, penalties)
    }

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_penalty_written_at_threshold() {
        let (counter, penalties) = counter_with_mock();
        let client = addr("203.0.113.7");

        for _ in 0..9 {
            counter.record_failure(client, "/users/me").await;
        }
        assert!(penalties.writes().is_empty());
        assert_eq!(counter.count(client), 9);

        counter.record_failure(client, "/users/me").await;

        let writes = penalties.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].key, "ratelimit:203.0.113.7:/users/me:12:0");
        assert_eq!(writes[0].value, "10");
        assert_eq!(writes[0].ttl_secs, 3600);

        // Counter restarted: the next failure is the first of a new window
        counter.record_failure(client, "/users/me").await;
        assert_eq!(counter.count(client), 1);
        assert_eq!(penalties.writes().len(), 1);
    }

    #[tokio::test]
    async fn test_addresses_counted_independently() {
        let (counter, penalties) = counter_with_mock();

        for _ in 0..9 {
            counter.record_failure(addr("10.0.0.1"), "/tasks").await;
            counter.record_failure(addr("10.0.0.2"), "/tasks").await;
        }

        assert!(penalties.writes().is_empty());
        assert_eq!(counter.count(addr("10.0.0.1")), 9);
        assert_eq!(counter.count(addr("10.0.0.2")), 9);
    }

    #[tokio::test]
    async fn test_penalty_key_scoped_by_route() {
        let (counter, penalties) = counter_with_mock();
        let client = addr("10.0.0.3");

        // Counting is per-address; the route only labels the penalty
        for _ in 0..9 {
            counter.record_failure(client, "/tasks").await;
        }
        counter.record_failure(client, "/users/me").await;

        let writes = penalties.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].key, "ratelimit:10.0.0.3:/users/me:12:0");
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let (counter, penalties) = counter_with_mock();
        penalties.set_failing(true);
        let client = addr("10.0.0.4");

        // record_failure has no error path; the write failure only logs
        for _ in 0..10 {
            counter.record_failure(client, "/tasks").await;
        }

        assert!(penalties.writes().is_empty());
        // Counter still restarted despite the failed write
        counter.record_failure(client, "/tasks").await;
        assert_eq!(counter.count(client), 1);
    }

    #[tokio::test]
    async fn test_threshold_from_config() {
        let penalties = Arc::new(MockPenaltyStore::new());
        let config = AbuseConfig {
            threshold: 3,
            ..Default::default()
        };
        let counter = AbuseCounter::new(&config, penalties.clone());
        let client = addr("10.0.0.5");

        counter.record_failure(client, "/tasks").await;
        counter.record_failure(client, "/tasks").await;
        assert!(penalties.writes().is_empty());

        counter.record_failure(client, "/tasks").await;
        assert_eq!(penalties.writes().len(), 1);
        assert_eq!(penalties.writes()[0].value, "3");
    }
}
