//! Per-client request throttling.
//!
//! A [`Throttler`] holds one or more named tiers. A request is admitted only
//! if every tier has capacity left for the client's address.

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota,
    RateLimiter as GovernorRateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ThrottleTierConfig;
use crate::errors::FailureInput;
use crate::metrics::registry::THROTTLED_REQUESTS_TOTAL;
use crate::utils::net::client_ip;

type KeyedLimiter = GovernorRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// One named limit: `limit` requests per `ttl` for each client
pub struct ThrottleTier {
    name: String,
    limit: u32,
    ttl: Duration,
    limiter: KeyedLimiter,
}

impl ThrottleTier {
    pub fn new(config: &ThrottleTierConfig) -> Result<Self> {
        let limit = NonZeroU32::new(config.limit)
            .with_context(|| format!("Throttle tier '{}' needs a limit above zero", config.name))?;
        let ttl = Duration::from_millis(config.ttl_ms);

        // Burst of `limit`, refilled evenly across the window
        let quota = Quota::with_period(ttl / limit.get())
            .with_context(|| format!("Throttle tier '{}' needs a non-zero ttl", config.name))?
            .allow_burst(limit);

        Ok(Self {
            name: config.name.clone(),
            limit: limit.get(),
            ttl,
            limiter: GovernorRateLimiter::keyed(quota),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

pub struct Throttler {
    tiers: Vec<ThrottleTier>,
}

impl Throttler {
    pub fn new(configs: &[ThrottleTierConfig]) -> Result<Self> {
        let tiers = configs
            .iter()
            .map(ThrottleTier::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[ThrottleTier] {
        &self.tiers
    }

    /// Record a request for `key`; returns the name of the first exhausted tier
    pub fn check(&self, key: &str) -> std::result::Result<(), &str> {
        let key = key.to_string();
        for tier in &self.tiers {
            if tier.limiter.check_key(&key).is_err() {
                return Err(tier.name());
            }
        }
        Ok(())
    }

    /// Forget clients whose limits have fully replenished
    pub fn prune(&self) {
        for tier in &self.tiers {
            tier.limiter.retain_recent();
            tier.limiter.shrink_to_fit();
        }
    }
}

/// Reject the request with a 429 failure when the client is over a limit
pub async fn throttle(
    State(throttler): State<Arc<Throttler>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_ip(request.headers(), request.extensions());

    if let Err(tier) = throttler.check(&key) {
        warn!(client = %key, tier = %tier, path = %request.uri().path(), "Request throttled");
        THROTTLED_REQUESTS_TOTAL.with_label_values(&[tier]).inc();
        return FailureInput::too_many_requests().into_response();
    }

    debug!(client = %key, "Throttle check passed");
    next.run(request).await
}

/// Periodically drop idle client state from every throttler
pub fn start_pruning_job(throttlers: Vec<Arc<Throttler>>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            for throttler in &throttlers {
                throttler.prune();
            }
            debug!("Pruned throttle state");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(name: &str, limit: u32, ttl_ms: u64) -> ThrottleTierConfig {
        ThrottleTierConfig {
            name: name.to_string(),
            limit,
            ttl_ms,
        }
    }

    #[test]
    fn test_allows_up_to_limit() {
        let throttler = Throttler::new(&[tier("short", 3, 60_000)]).unwrap();

        for _ in 0..3 {
            assert!(throttler.check("10.0.0.1").is_ok());
        }
        assert_eq!(throttler.check("10.0.0.1"), Err("short"));
    }

    #[test]
    fn test_clients_are_independent() {
        let throttler = Throttler::new(&[tier("strict", 1, 1_000)]).unwrap();

        assert!(throttler.check("10.0.0.1").is_ok());
        assert!(throttler.check("10.0.0.1").is_err());
        assert!(throttler.check("10.0.0.2").is_ok());
    }

    #[test]
    fn test_reports_first_exhausted_tier() {
        let throttler =
            Throttler::new(&[tier("short", 2, 60_000), tier("long", 100, 60_000)]).unwrap();

        throttler.check("a").unwrap();
        throttler.check("a").unwrap();
        assert_eq!(throttler.check("a"), Err("short"));
    }

    #[test]
    fn test_rejects_zero_limit() {
        assert!(Throttler::new(&[tier("broken", 0, 1_000)]).is_err());
    }

    #[test]
    fn test_rejects_zero_ttl() {
        assert!(Throttler::new(&[tier("broken", 5, 0)]).is_err());
    }

    #[test]
    fn test_tier_accessors() {
        let throttler = Throttler::new(&[tier("long", 100, 60_000)]).unwrap();
        let tier = &throttler.tiers()[0];
        assert_eq!(tier.name(), "long");
        assert_eq!(tier.limit(), 100);
        assert_eq!(tier.ttl(), Duration::from_secs(60));
        throttler.prune();
    }
}
