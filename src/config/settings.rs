use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::domain::vote::{MAX_SCORE, MIN_SCORE};
use crate::pagination::PaginationConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct PriorSettings {
    pub default_global_mean: f64,
    pub min_votes: u64,
    pub confidence_k: f64,
}

impl Default for PriorSettings {
    fn default() -> Self {
        Self {
            default_global_mean: 3.0,
            min_votes: 10,
            confidence_k: 25.0,
        }
    }
}

impl PriorSettings {
    /// The estimator divides by `confidence_k + votes`, so it must be a
    /// positive finite number.
    pub fn is_valid_confidence_k(k: f64) -> bool {
        k.is_finite() && k > 0.0
    }

    pub fn is_valid_global_mean(mean: f64) -> bool {
        mean.is_finite() && (f64::from(MIN_SCORE)..=f64::from(MAX_SCORE)).contains(&mean)
    }
}

/// How a mutation hands off the follow-up prior refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Spawned onto the runtime; the mutation returns without waiting.
    Background,
    /// Awaited before the mutation returns. Used by tests.
    Inline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub startup_timeout: Duration,
    pub mode: RefreshMode,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10 * 60),
            startup_timeout: Duration::from_secs(5),
            mode: RefreshMode::Background,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub entity_stats_ttl: Duration,
    pub voter_profile_ttl: Duration,
    pub voter_stats_ttl: Duration,
    pub purge_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            entity_stats_ttl: Duration::from_secs(15 * 60),
            voter_profile_ttl: Duration::from_secs(10 * 60),
            voter_stats_ttl: Duration::from_secs(5 * 60),
            purge_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub database_path: String,
    pub admin_token: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            database_path: "ratings.db".to_string(),
            admin_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub prior: PriorSettings,
    pub refresh: RefreshSettings,
    pub cache: CacheSettings,
    pub server: ServerSettings,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by whatever environment variables are set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`. Unparseable values are logged and the
    /// current value is kept.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DATABASE_PATH") {
            self.server.database_path = path;
        }
        if let Some(token) = lookup("ADMIN_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.server.admin_token = Some(token);
        }

        override_parsed(&lookup, "PRIOR_MIN_VOTES", &mut self.prior.min_votes);
        override_checked(
            &lookup,
            "PRIOR_CONFIDENCE_K",
            &mut self.prior.confidence_k,
            PriorSettings::is_valid_confidence_k,
        );
        override_checked(
            &lookup,
            "PRIOR_DEFAULT_MEAN",
            &mut self.prior.default_global_mean,
            PriorSettings::is_valid_global_mean,
        );
        override_parsed(&lookup, "CACHE_ENABLED", &mut self.cache.enabled);

        let mut refresh_secs = self.refresh.interval.as_secs();
        override_parsed(&lookup, "PRIOR_REFRESH_SECS", &mut refresh_secs);
        if refresh_secs == 0 {
            warn!("PRIOR_REFRESH_SECS must be positive, keeping {:?}", self.refresh.interval);
        } else {
            self.refresh.interval = Duration::from_secs(refresh_secs);
        }

        let mut max_limit = self.pagination.max_limit;
        override_parsed(&lookup, "PAGINATION_MAX_LIMIT", &mut max_limit);
        if max_limit == 0 {
            warn!("PAGINATION_MAX_LIMIT must be positive, keeping {}", self.pagination.max_limit);
        } else {
            self.pagination = self.pagination.with_max_limit(max_limit);
        }

        let mut timeout_secs = self.refresh.startup_timeout.as_secs();
        override_parsed(&lookup, "PRIOR_STARTUP_TIMEOUT_SECS", &mut timeout_secs);
        self.refresh.startup_timeout = Duration::from_secs(timeout_secs);

        self
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return;
    };

    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => warn!("Ignoring invalid {key}={raw:?}, keeping {target:?}"),
    }
}

/// Like `override_parsed`, but a parsed value failing `valid` is also ignored.
fn override_checked<F, T, V>(lookup: &F, key: &str, target: &mut T, valid: V)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug + Copy,
    V: Fn(T) -> bool,
{
    let mut candidate = *target;
    override_parsed(lookup, key, &mut candidate);
    if valid(candidate) {
        *target = candidate;
    } else {
        warn!("Ignoring out-of-range {key}={candidate:?}, keeping {target:?}");
    }
}
