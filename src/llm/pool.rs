//! Provider Pool
//!
//! Spreads chat requests over several providers in priority order with a
//! shared round-robin cursor, keeping each provider under its published
//! per-minute and per-day quotas.
//!
//! # Failure policy
//!
//! | error                                 | cooldown                          |
//! |---------------------------------------|-----------------------------------|
//! | `RateLimit`                           | Retry-After or 60s, counters reset |
//! | `Auth`, `InvalidRequest`, `Unknown`   | 30s                               |
//! | `Network`, `Server`, `TokenLimit`     | none                              |
//!
//! A request makes at most `providers * 3` attempts. Every attempt takes its
//! quota slot when the provider is selected, under the pool lock, so
//! concurrent callers never overrun a provider.

use super::config::{config_files, ProviderConfig, RateLimitConfig};
use super::error::{LlmError, LlmErrorKind};
use super::provider::{ChatCompletionsProvider, LlmProvider};
use super::LlmResponse;
use parking_lot::Mutex;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);
const ERROR_COOLDOWN: Duration = Duration::from_secs(30);
/// Quota waits shorter than this are slept through instead of skipped
const MAX_INLINE_WAIT: Duration = Duration::from_millis(1000);
const ATTEMPTS_PER_PROVIDER: usize = 3;

/// A provider with its pool settings.
pub struct PooledProvider {
    pub provider: Box<dyn LlmProvider>,
    pub priority: i32,
    pub limits: RateLimitConfig,
}

impl PooledProvider {
    pub fn new(provider: Box<dyn LlmProvider>, priority: i32, limits: RateLimitConfig) -> Self {
        Self {
            provider,
            priority,
            limits,
        }
    }
}

/// Snapshot of one provider's counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUsage {
    pub minute_count: u32,
    pub day_count: u32,
    pub cooling_down: bool,
}

/// One line of `summaries()`.
#[derive(Debug, Clone)]
pub struct ProviderSummary {
    pub name: String,
    pub model: String,
    pub priority: i32,
    pub limits: RateLimitConfig,
}

#[derive(Debug)]
struct Counters {
    minute_start: Instant,
    minute_count: u32,
    day_start: Instant,
    day_count: u32,
    cooldown_until: Option<Instant>,
}

impl Counters {
    fn new(now: Instant) -> Self {
        Self {
            minute_start: now,
            minute_count: 0,
            day_start: now,
            day_count: 0,
            cooldown_until: None,
        }
    }

    fn roll(&mut self, now: Instant) {
        if now.duration_since(self.minute_start) >= MINUTE {
            self.minute_start = now;
            self.minute_count = 0;
        }
        if now.duration_since(self.day_start) >= DAY {
            self.day_start = now;
            self.day_count = 0;
        }
    }

    fn reset(&mut self, now: Instant) {
        let cooldown_until = self.cooldown_until;
        *self = Self::new(now);
        self.cooldown_until = cooldown_until;
    }

    fn cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.map_or(false, |until| until > now)
    }

    /// Time until the provider is back under quota, if it is over.
    fn quota_wait(&self, limits: &RateLimitConfig, now: Instant) -> Option<Duration> {
        let minute = (limits.requests_per_minute > 0 && self.minute_count >= limits.requests_per_minute)
            .then(|| (self.minute_start + MINUTE).saturating_duration_since(now));
        let day = (limits.requests_per_day > 0 && self.day_count >= limits.requests_per_day)
            .then(|| (self.day_start + DAY).saturating_duration_since(now));
        minute.into_iter().chain(day).max()
    }

    /// Whether a request can go out now, after a short sleep, or not at all.
    fn check(&self, limits: &RateLimitConfig, now: Instant) -> QuotaCheck {
        match self.quota_wait(limits, now) {
            None => QuotaCheck::Open,
            Some(wait) if wait < MAX_INLINE_WAIT => QuotaCheck::Inline(wait),
            Some(wait) => QuotaCheck::Cooldown(wait),
        }
    }

    /// Take one request slot. A slot past a full window is booked into the
    /// next one, which is where the request lands after the inline wait.
    fn reserve(&mut self, limits: &RateLimitConfig, now: Instant) {
        if limits.requests_per_minute > 0 && self.minute_count >= limits.requests_per_minute {
            self.minute_start += MINUTE;
            self.minute_count = 0;
        }
        if limits.requests_per_day > 0 && self.day_count >= limits.requests_per_day {
            self.day_start += DAY;
            self.day_count = 0;
        }
        self.roll(now);
        self.minute_count += 1;
        self.day_count += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuotaCheck {
    Open,
    /// Over quota, back under it within `MAX_INLINE_WAIT`
    Inline(Duration),
    Cooldown(Duration),
}

#[derive(Debug)]
struct PoolState {
    cursor: usize,
    counters: Vec<Counters>,
}

/// Rate-limited, failover pool of chat providers.
pub struct ProviderPool {
    providers: Vec<PooledProvider>,
    state: Mutex<PoolState>,
}

impl ProviderPool {
    /// Build from already constructed providers, ordered by priority.
    pub fn new(mut providers: Vec<PooledProvider>) -> Self {
        providers.sort_by_key(|p| p.priority);
        let now = Instant::now();
        let counters = providers.iter().map(|_| Counters::new(now)).collect();
        Self {
            providers,
            state: Mutex::new(PoolState { cursor: 0, counters }),
        }
    }

    /// Load every provider config in `dir`. A missing directory gives an
    /// empty pool; unusable configs are logged and skipped.
    pub fn from_dir(dir: &Path) -> Self {
        if !dir.exists() {
            log::warn!("LLM config directory not found: {}", dir.display());
            return Self::new(Vec::new());
        }

        log::info!("Loading LLM providers from: {}", dir.display());
        let files = match config_files(dir) {
            Ok(files) => files,
            Err(e) => {
                log::error!("Failed to list {}: {}", dir.display(), e);
                return Self::new(Vec::new());
            }
        };

        let mut providers = Vec::new();
        for path in files {
            let mut config = match ProviderConfig::load(&path) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Failed to load provider config: {}", e);
                    continue;
                }
            };
            config.inject_key(dir);

            let priority = config.priority;
            let limits = config.limits();
            if let Some(provider) = ChatCompletionsProvider::from_config(config) {
                log::info!(
                    "Loaded provider {} ({}), priority {}",
                    provider.name(),
                    provider.model(),
                    priority
                );
                providers.push(PooledProvider::new(Box::new(provider), priority, limits));
            }
        }

        log::info!("Total providers loaded: {}", providers.len());
        Self::new(providers)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider.name()).collect()
    }

    pub fn summaries(&self) -> Vec<ProviderSummary> {
        self.providers
            .iter()
            .map(|p| ProviderSummary {
                name: p.provider.name().to_string(),
                model: p.provider.model().to_string(),
                priority: p.priority,
                limits: p.limits,
            })
            .collect()
    }

    /// Current counters of a provider.
    pub fn usage(&self, name: &str) -> Option<ProviderUsage> {
        let idx = self.providers.iter().position(|p| p.provider.name() == name)?;
        let now = Instant::now();
        let state = self.state.lock();
        let counters = &state.counters[idx];
        Some(ProviderUsage {
            minute_count: counters.minute_count,
            day_count: counters.day_count,
            cooling_down: counters.cooling_down(now),
        })
    }

    /// Send a chat request through the first eligible provider, failing over
    /// on errors until the attempt budget is spent.
    pub fn chat(&self, system_prompt: Option<&str>, user_message: &str) -> Result<LlmResponse, LlmError> {
        if self.providers.is_empty() {
            return Err(LlmError::unknown("pool", "No LLM providers available"));
        }

        let max_attempts = self.providers.len() * ATTEMPTS_PER_PROVIDER;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let Some((idx, wait)) = self.select() else {
                return Err(LlmError::rate_limited(
                    "pool",
                    "All providers are rate limited or cooling down",
                    None,
                ));
            };

            if !wait.is_zero() {
                log::debug!(
                    "Waiting {}ms for {} quota",
                    wait.as_millis(),
                    self.providers[idx].provider.name()
                );
                thread::sleep(wait);
            }

            let provider = &self.providers[idx].provider;
            match provider.chat(system_prompt, user_message) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    log::warn!(
                        "Attempt {}/{} via {} failed: {}",
                        attempt,
                        max_attempts,
                        provider.name(),
                        e
                    );
                    self.record_failure(idx, &e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::unknown("pool", "All attempts failed")))
    }

    /// Pick the next eligible provider from the cursor, with the time to wait
    /// before calling it, and take a quota slot for the request while the lock
    /// is held. Providers over quota for a second or more are put in cooldown
    /// for the remaining wait.
    fn select(&self) -> Option<(usize, Duration)> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let n = self.providers.len();

        for offset in 0..n {
            let idx = (state.cursor + offset) % n;
            let pooled = &self.providers[idx];
            let counters = &mut state.counters[idx];

            if counters.cooling_down(now) || !pooled.provider.is_available() {
                continue;
            }

            counters.roll(now);
            let wait = match counters.check(&pooled.limits, now) {
                QuotaCheck::Open => Duration::ZERO,
                QuotaCheck::Inline(wait) => wait,
                QuotaCheck::Cooldown(wait) => {
                    log::info!(
                        "Provider {} over quota, cooling down for {}s",
                        pooled.provider.name(),
                        wait.as_secs()
                    );
                    counters.cooldown_until = Some(now + wait);
                    continue;
                }
            };

            counters.reserve(&pooled.limits, now);
            state.cursor = (idx + 1) % n;
            return Some((idx, wait));
        }

        None
    }

    fn record_failure(&self, idx: usize, error: &LlmError) {
        let cooldown = match error.kind {
            LlmErrorKind::RateLimit => Some(error.retry_after.unwrap_or(RATE_LIMIT_COOLDOWN)),
            LlmErrorKind::Auth | LlmErrorKind::InvalidRequest | LlmErrorKind::Unknown => {
                Some(ERROR_COOLDOWN)
            }
            LlmErrorKind::Network | LlmErrorKind::Server | LlmErrorKind::TokenLimit => None,
        };
        let Some(cooldown) = cooldown else {
            return;
        };

        let now = Instant::now();
        let mut state = self.state.lock();
        let counters = &mut state.counters[idx];
        if error.kind == LlmErrorKind::RateLimit {
            counters.reset(now);
        }
        counters.cooldown_until = Some(now + cooldown);
        log::info!(
            "Provider {} cooling down for {}s ({})",
            self.providers[idx].provider.name(),
            cooldown.as_secs(),
            error.kind
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_quota_wait() {
        let now = Instant::now();
        let limits = RateLimitConfig {
            requests_per_minute: 2,
            requests_per_day: 0,
            tokens_per_day: 0,
        };
        let mut counters = Counters::new(now);
        assert_eq!(counters.quota_wait(&limits, now), None);

        counters.minute_count = 2;
        let wait = counters.quota_wait(&limits, now).unwrap();
        assert!(wait > Duration::from_secs(59));

        // unlimited
        assert_eq!(counters.quota_wait(&RateLimitConfig::default(), now), None);
    }

    #[test]
    fn test_counters_roll_minute_window() {
        let start = Instant::now();
        let mut counters = Counters::new(start);
        counters.minute_count = 5;
        counters.day_count = 5;

        counters.roll(start + Duration::from_secs(61));
        assert_eq!(counters.minute_count, 0);
        assert_eq!(counters.day_count, 5);
    }

    #[test]
    fn test_reset_keeps_cooldown() {
        let now = Instant::now();
        let mut counters = Counters::new(now);
        counters.minute_count = 3;
        counters.cooldown_until = Some(now + Duration::from_secs(10));

        counters.reset(now);
        assert_eq!(counters.minute_count, 0);
        assert!(counters.cooling_down(now));
    }

    fn per_minute(rpm: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: rpm,
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn test_short_quota_wait_is_slept_inline() {
        let start = Instant::now();
        let mut counters = Counters::new(start);
        counters.minute_count = 2;

        let now = start + Duration::from_millis(59_500);
        assert_eq!(
            counters.check(&per_minute(2), now),
            QuotaCheck::Inline(Duration::from_millis(500))
        );
        assert_eq!(counters.check(&per_minute(3), now), QuotaCheck::Open);
    }

    #[test]
    fn test_one_second_quota_wait_cools_down() {
        let start = Instant::now();
        let mut counters = Counters::new(start);
        counters.minute_count = 2;

        let now = start + Duration::from_secs(59);
        assert_eq!(
            counters.check(&per_minute(2), now),
            QuotaCheck::Cooldown(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_reserve_books_into_next_window() {
        let start = Instant::now();
        let limits = per_minute(2);
        let mut counters = Counters::new(start);

        counters.reserve(&limits, start);
        counters.reserve(&limits, start);
        assert_eq!(counters.minute_count, 2);

        // full window: the slot lands in the window starting at start + 60s
        let now = start + Duration::from_millis(59_500);
        counters.reserve(&limits, now);
        assert_eq!(counters.minute_count, 1);
        assert_eq!(counters.day_count, 3);
        assert_eq!(counters.minute_start, start + MINUTE);
        assert_eq!(counters.check(&limits, now), QuotaCheck::Open);
    }

    struct Echo(&'static str);

    impl LlmProvider for Echo {
        fn name(&self) -> &str {
            self.0
        }

        fn model(&self) -> &str {
            "echo"
        }

        fn chat(&self, _system: Option<&str>, _user: &str) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse::text(self.0, "TRUE"))
        }
    }

    #[test]
    fn test_sub_second_wait_keeps_provider() {
        let pool = ProviderPool::new(vec![
            PooledProvider::new(Box::new(Echo("a")), 1, per_minute(1)),
            PooledProvider::new(Box::new(Echo("b")), 2, RateLimitConfig::default()),
        ]);

        // window of "a" is full and ends in 999ms
        let Some(window_start) = Instant::now().checked_sub(MINUTE - Duration::from_millis(999))
        else {
            return;
        };
        {
            let mut state = pool.state.lock();
            state.counters[0].minute_start = window_start;
            state.counters[0].minute_count = 1;
        }

        let started = Instant::now();
        let reply = pool.chat(None, "q").unwrap();
        assert_eq!(reply.provider, "a");
        assert!(started.elapsed() >= Duration::from_millis(900));

        let usage = pool.usage("a").unwrap();
        assert_eq!(usage.minute_count, 1);
        assert!(!usage.cooling_down);
    }

    #[test]
    fn test_empty_pool_is_unknown_error() {
        let pool = ProviderPool::new(Vec::new());
        let err = pool.chat(None, "hello").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn test_missing_dir_is_empty_pool() {
        let pool = ProviderPool::from_dir(Path::new("/nonexistent/llm-config"));
        assert!(pool.is_empty());
    }
}
