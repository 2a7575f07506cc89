use std::collections::HashMap;
use std::sync::Arc;

use teloxide::types::ChatId;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::config;

/// Per-user request throttling with a sliding window and cooldown.
///
/// Each user gets `max_requests` accepted requests per `window`. Exceeding
/// the limit starts a cooldown during which every request is rejected,
/// regardless of the window having since cleared. Only accepted requests
/// count toward the window; rejected attempts are never recorded.
#[derive(Clone)]
pub struct RateLimiter {
    records: Arc<Mutex<HashMap<ChatId, RateLimitRecord>>>,
    max_requests: usize,
    window: Duration,
    cooldown: Duration,
}

#[derive(Debug, Default)]
struct RateLimitRecord {
    /// Timestamps of accepted requests inside the trailing window.
    /// Pruned lazily on every check.
    requests: Vec<Instant>,
    /// When set and in the future, all requests are rejected.
    cooldown_until: Option<Instant>,
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Seconds the user has to wait, rounded up. Zero when allowed.
    pub wait_secs: u64,
}

impl RateDecision {
    fn allowed() -> Self {
        Self { allowed: true, wait_secs: 0 }
    }

    fn rejected(wait_secs: u64) -> Self {
        Self { allowed: false, wait_secs }
    }
}

/// Side-effect-free snapshot of a user's throttling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStats {
    pub requests_in_window: usize,
    pub max_requests: usize,
    pub window_secs: u64,
    pub cooldown_remaining_secs: u64,
}

/// Rounds a duration up to whole seconds so users are never told to wait
/// less than actually remains.
fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl RateLimiter {
    /// Creates a rate limiter from the configured environment values.
    pub fn from_config() -> Self {
        Self::with_limits(
            *config::rate_limit::MAX_REQUESTS as usize,
            config::rate_limit::window(),
            config::rate_limit::cooldown(),
        )
    }

    /// Creates a rate limiter with explicit limits.
    pub fn with_limits(max_requests: usize, window: Duration, cooldown: Duration) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            cooldown,
        }
    }

    /// Checks whether a request from this user is allowed right now, and
    /// records it if so.
    pub async fn check_and_record(&self, chat_id: ChatId) -> RateDecision {
        self.check_and_record_at(chat_id, Instant::now()).await
    }

    /// Deterministic variant of [`check_and_record`](Self::check_and_record)
    /// taking the current instant explicitly.
    pub async fn check_and_record_at(&self, chat_id: ChatId, now: Instant) -> RateDecision {
        let mut records = self.records.lock().await;
        let record = records.entry(chat_id).or_default();

        // Active cooldown rejects without recording anything
        if let Some(until) = record.cooldown_until {
            if now < until {
                let wait = ceil_secs(until - now);
                log::warn!("User {} is in cooldown for {}s", chat_id, wait);
                return RateDecision::rejected(wait);
            }
            record.cooldown_until = None;
        }

        record.requests.retain(|ts| now.saturating_duration_since(*ts) < self.window);

        if record.requests.len() >= self.max_requests {
            record.cooldown_until = Some(now + self.cooldown);
            log::warn!(
                "Rate limit exceeded for user {}, cooldown: {}s",
                chat_id,
                self.cooldown.as_secs()
            );
            // The triggering request itself is not recorded
            return RateDecision::rejected(self.cooldown.as_secs());
        }

        record.requests.push(now);
        RateDecision::allowed()
    }

    /// Clears the window and any cooldown for the user. For operator use;
    /// not reachable from chat.
    pub async fn reset(&self, chat_id: ChatId) {
        let mut records = self.records.lock().await;
        records.remove(&chat_id);
    }

    /// Returns the user's throttling state without mutating it.
    pub async fn stats(&self, chat_id: ChatId) -> RateLimitStats {
        self.stats_at(chat_id, Instant::now()).await
    }

    /// Deterministic variant of [`stats`](Self::stats).
    pub async fn stats_at(&self, chat_id: ChatId, now: Instant) -> RateLimitStats {
        let records = self.records.lock().await;
        let (in_window, cooldown_remaining) = match records.get(&chat_id) {
            Some(record) => {
                let in_window = record
                    .requests
                    .iter()
                    .filter(|ts| now.saturating_duration_since(**ts) < self.window)
                    .count();
                let remaining = record
                    .cooldown_until
                    .filter(|until| now < *until)
                    .map(|until| ceil_secs(until - now))
                    .unwrap_or(0);
                (in_window, remaining)
            }
            None => (0, 0),
        };

        RateLimitStats {
            requests_in_window: in_window,
            max_requests: self.max_requests,
            window_secs: self.window.as_secs(),
            cooldown_remaining_secs: cooldown_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USER: ChatId = ChatId(42);

    fn limiter() -> RateLimiter {
        RateLimiter::with_limits(3, Duration::from_secs(60), Duration::from_secs(30))
    }

    #[tokio::test]
    async fn allows_up_to_max_requests() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..3 {
            let decision = limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
            assert!(decision.allowed, "request {} should pass", i);
        }
    }

    #[tokio::test]
    async fn fourth_request_in_window_is_rejected_with_cooldown_wait() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..3 {
            assert!(limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await.allowed);
        }
        let decision = limiter.check_and_record_at(USER, now + Duration::from_secs(3)).await;
        assert_eq!(decision, RateDecision { allowed: false, wait_secs: 30 });
    }

    #[tokio::test]
    async fn rejected_request_is_not_recorded() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
        }
        let stats = limiter.stats_at(USER, now + Duration::from_secs(4)).await;
        assert_eq!(stats.requests_in_window, 3);
    }

    #[tokio::test]
    async fn cooldown_blocks_even_after_window_clears() {
        // Cooldown longer than the window: at t=20 every recorded request
        // has left the 5s window, but the cooldown started at t=3 still
        // runs until t=63 and must keep rejecting.
        let limiter = RateLimiter::with_limits(3, Duration::from_secs(5), Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
        }
        let decision = limiter.check_and_record_at(USER, now + Duration::from_secs(20)).await;
        assert!(!decision.allowed);
        assert_eq!(decision.wait_secs, 43);
    }

    #[tokio::test]
    async fn cooldown_expires_and_is_cleared() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
        }
        // Cooldown set at t=3 lasts 30s; at t=100 the window is empty too.
        let later = now + Duration::from_secs(100);
        assert!(limiter.check_and_record_at(USER, later).await.allowed);
    }

    #[tokio::test]
    async fn wait_time_rounds_up() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
        }
        // Cooldown ends at t=33; at t=10.5 there are 22.5s left -> report 23.
        let mid = now + Duration::from_millis(10_500);
        let decision = limiter.check_and_record_at(USER, mid).await;
        assert_eq!(decision.wait_secs, 23);
    }

    #[tokio::test]
    async fn window_slides() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..3 {
            assert!(limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await.allowed);
        }
        // 61s after the first request it has left the window
        let later = now + Duration::from_secs(61);
        assert!(limiter.check_and_record_at(USER, later).await.allowed);
    }

    #[tokio::test]
    async fn stats_are_side_effect_free() {
        let limiter = limiter();
        let now = Instant::now();

        limiter.check_and_record_at(USER, now).await;
        let before = limiter.stats_at(USER, now).await;
        let after = limiter.stats_at(USER, now).await;
        assert_eq!(before, after);
        assert_eq!(before.requests_in_window, 1);
        assert_eq!(before.max_requests, 3);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let limiter = limiter();
        let now = Instant::now();

        for i in 0..4 {
            limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
        }
        limiter.reset(USER).await;
        assert!(limiter.check_and_record_at(USER, now + Duration::from_secs(5)).await.allowed);
    }

    #[tokio::test]
    async fn users_are_independent() {
        let limiter = limiter();
        let now = Instant::now();
        let other = ChatId(7);

        for i in 0..4 {
            limiter.check_and_record_at(USER, now + Duration::from_secs(i)).await;
        }
        assert!(limiter.check_and_record_at(other, now + Duration::from_secs(4)).await.allowed);
    }
}
