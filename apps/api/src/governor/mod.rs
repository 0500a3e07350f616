//! Credit & Rate Governor — request admission control: per-endpoint
//! sliding-window rate limits by tier, credit cost policy, and the per-user
//! concurrent-analysis bound.
//!
//! Credit balances themselves are mutated only through the store's atomic
//! check-and-decrement; this module decides how much to charge and whether
//! a request may proceed at all.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::errors::AppError;
use crate::store::models::Tier;

/// Maximum concurrent analyses per user before `busy` rejections.
pub const MAX_CONCURRENT_PER_USER: u32 = 4;

// ────────────────────────────────────────────────────────────────────────────
// Credit cost policy
// ────────────────────────────────────────────────────────────────────────────

/// Cost charged when a request is served from cache, regardless of kind.
pub const CACHE_HIT_COST: i64 = 1;

/// Credit cost of an analysis: quick 1, full 5, +2 when a URL fetch is
/// involved.
pub fn analysis_cost(quick_mode: bool, has_url: bool) -> i64 {
    let base = if quick_mode { 1 } else { 5 };
    base + if has_url { 2 } else { 0 }
}

// ────────────────────────────────────────────────────────────────────────────
// Rate limits
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateEndpoint {
    Analyze,
    Compare,
    Export,
}

impl RateEndpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateEndpoint::Analyze => "analyze",
            RateEndpoint::Compare => "compare",
            RateEndpoint::Export => "export",
        }
    }

    /// Sliding window length; export is a daily window.
    fn window(&self) -> Duration {
        match self {
            RateEndpoint::Analyze | RateEndpoint::Compare => Duration::from_secs(3600),
            RateEndpoint::Export => Duration::from_secs(86_400),
        }
    }

    fn default_limit(&self, tier: Tier) -> u32 {
        match self {
            RateEndpoint::Analyze => match tier {
                Tier::Anonymous => 5,
                Tier::Free => 20,
                Tier::Starter => 100,
                Tier::Growth => 500,
                Tier::Enterprise => 2000,
            },
            RateEndpoint::Compare => match tier {
                Tier::Anonymous => 5,
                Tier::Free => 10,
                Tier::Starter => 50,
                Tier::Growth => 200,
                Tier::Enterprise => 1000,
            },
            RateEndpoint::Export => match tier {
                Tier::Anonymous => 1,
                Tier::Free => 5,
                Tier::Starter => 20,
                Tier::Growth => 100,
                Tier::Enterprise => 1000,
            },
        }
    }
}

/// `RATE_LIMIT_OVERRIDES` entries: `endpoint:tier=limit` (comma separated).
pub type RateOverrides = HashMap<(String, String), u32>;

pub fn parse_overrides(raw: &str) -> RateOverrides {
    let mut overrides = RateOverrides::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Some((key, limit)) = entry.split_once('=') else {
            continue;
        };
        let Some((endpoint, tier)) = key.split_once(':') else {
            continue;
        };
        if let Ok(limit) = limit.trim().parse::<u32>() {
            overrides.insert(
                (endpoint.trim().to_lowercase(), tier.trim().to_lowercase()),
                limit,
            );
        }
    }
    overrides
}

pub struct Governor {
    windows: DashMap<(String, RateEndpoint), VecDeque<Instant>>,
    overrides: RateOverrides,
    inflight: Arc<DashMap<String, u32>>,
}

impl Governor {
    pub fn new(overrides: RateOverrides) -> Governor {
        Governor {
            windows: DashMap::new(),
            overrides,
            inflight: Arc::new(DashMap::new()),
        }
    }

    fn limit_for(&self, endpoint: RateEndpoint, tier: Tier) -> u32 {
        self.overrides
            .get(&(endpoint.as_str().to_string(), tier.as_str().to_string()))
            .copied()
            .unwrap_or_else(|| endpoint.default_limit(tier))
    }

    /// Admit or reject one request on the user's sliding window. Rejection
    /// carries `retry_after` and does not consume a slot.
    pub fn check_rate(
        &self,
        user_id: &str,
        endpoint: RateEndpoint,
        tier: Tier,
    ) -> Result<(), AppError> {
        self.check_rate_at(user_id, endpoint, tier, Instant::now())
    }

    fn check_rate_at(
        &self,
        user_id: &str,
        endpoint: RateEndpoint,
        tier: Tier,
        now: Instant,
    ) -> Result<(), AppError> {
        let limit = self.limit_for(endpoint, tier);
        let window = endpoint.window();
        let mut entry = self
            .windows
            .entry((user_id.to_string(), endpoint))
            .or_default();

        while let Some(oldest) = entry.front() {
            if now.duration_since(*oldest) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }

        if entry.len() as u32 >= limit {
            let oldest = entry.front().copied().unwrap_or(now);
            let retry_after = window
                .checked_sub(now.duration_since(oldest))
                .unwrap_or_default()
                .as_secs()
                .max(1);
            return Err(AppError::RateLimited {
                endpoint: endpoint.as_str(),
                tier: tier.as_str().to_string(),
                limit,
                retry_after_secs: retry_after,
                reset_at_epoch: chrono::Utc::now().timestamp() + retry_after as i64,
            });
        }

        entry.push_back(now);
        Ok(())
    }

    /// Reserve a concurrent-analysis slot for the user. The returned guard
    /// frees the slot on drop.
    pub fn acquire_slot(&self, user_id: &str) -> Result<InFlightGuard, AppError> {
        let mut count = self.inflight.entry(user_id.to_string()).or_insert(0);
        if *count >= MAX_CONCURRENT_PER_USER {
            return Err(AppError::Busy);
        }
        *count += 1;
        drop(count);
        Ok(InFlightGuard {
            inflight: self.inflight.clone(),
            user_id: user_id.to_string(),
        })
    }
}

/// RAII slot for the per-user concurrency bound.
pub struct InFlightGuard {
    inflight: Arc<DashMap<String, u32>>,
    user_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(mut count) = self.inflight.get_mut(&self.user_id) {
            *count = count.saturating_sub(1);
        }
        self.inflight
            .remove_if(&self.user_id, |_, count| *count == 0);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_cost_policy() {
        assert_eq!(analysis_cost(true, false), 1);
        assert_eq!(analysis_cost(false, false), 5);
        assert_eq!(analysis_cost(true, true), 3);
        assert_eq!(analysis_cost(false, true), 7);
        assert_eq!(CACHE_HIT_COST, 1);
    }

    #[test]
    fn test_default_limits_table() {
        assert_eq!(RateEndpoint::Analyze.default_limit(Tier::Anonymous), 5);
        assert_eq!(RateEndpoint::Analyze.default_limit(Tier::Free), 20);
        assert_eq!(RateEndpoint::Analyze.default_limit(Tier::Enterprise), 2000);
        assert_eq!(RateEndpoint::Compare.default_limit(Tier::Growth), 200);
        assert_eq!(RateEndpoint::Export.default_limit(Tier::Anonymous), 1);
        assert_eq!(RateEndpoint::Export.default_limit(Tier::Free), 5);
    }

    #[test]
    fn test_nth_plus_one_request_rejected() {
        let governor = Governor::new(RateOverrides::new());
        let now = Instant::now();
        for _ in 0..20 {
            governor
                .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, now)
                .unwrap();
        }
        let err = governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, now)
            .unwrap_err();
        match err {
            AppError::RateLimited {
                endpoint,
                limit,
                retry_after_secs,
                ..
            } => {
                assert_eq!(endpoint, "analyze");
                assert_eq!(limit, 20);
                assert!(retry_after_secs > 0);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_sliding_window_ages_out() {
        let governor = Governor::new(RateOverrides::new());
        let start = Instant::now();

        // Fill the window at t=0 and t=3599s.
        for _ in 0..19 {
            governor
                .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, start)
                .unwrap();
        }
        let almost = start + Duration::from_secs(3599);
        governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, almost)
            .unwrap();
        assert!(governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, almost)
            .is_err());

        // At t=3600 the first 19 requests have aged out.
        let after = start + Duration::from_secs(3600);
        assert!(governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, after)
            .is_ok());
    }

    #[test]
    fn test_users_and_endpoints_are_isolated() {
        let governor = Governor::new(RateOverrides::new());
        let now = Instant::now();
        for _ in 0..5 {
            governor
                .check_rate_at("anon", RateEndpoint::Analyze, Tier::Anonymous, now)
                .unwrap();
        }
        assert!(governor
            .check_rate_at("anon", RateEndpoint::Analyze, Tier::Anonymous, now)
            .is_err());
        // Different user unaffected.
        assert!(governor
            .check_rate_at("other", RateEndpoint::Analyze, Tier::Anonymous, now)
            .is_ok());
        // Different endpoint unaffected.
        assert!(governor
            .check_rate_at("anon", RateEndpoint::Compare, Tier::Anonymous, now)
            .is_ok());
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let overrides = parse_overrides("analyze:free=2, export:growth=7");
        let governor = Governor::new(overrides);
        let now = Instant::now();
        governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, now)
            .unwrap();
        governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, now)
            .unwrap();
        assert!(governor
            .check_rate_at("u1", RateEndpoint::Analyze, Tier::Free, now)
            .is_err());
    }

    #[test]
    fn test_parse_overrides_ignores_malformed_entries() {
        let overrides = parse_overrides("analyze:free=abc,nonsense,compare:starter=9");
        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides.get(&("compare".to_string(), "starter".to_string())),
            Some(&9)
        );
    }

    #[test]
    fn test_concurrency_slots() {
        let governor = Governor::new(RateOverrides::new());
        let slots: Vec<_> = (0..4)
            .map(|_| governor.acquire_slot("u1").unwrap())
            .collect();
        assert!(matches!(
            governor.acquire_slot("u1"),
            Err(AppError::Busy)
        ));
        drop(slots);
        assert!(governor.acquire_slot("u1").is_ok());
    }

    #[test]
    fn test_concurrency_is_per_user() {
        let governor = Governor::new(RateOverrides::new());
        let _slots: Vec<_> = (0..4)
            .map(|_| governor.acquire_slot("u1").unwrap())
            .collect();
        assert!(governor.acquire_slot("u2").is_ok());
    }
}
