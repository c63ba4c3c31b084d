//! Environment configuration (spec §6)
//!
//! Mirrors the teacher's `Config::load`/`Default` shape (see the original
//! `config/store.rs`) but sources values from the process environment
//! instead of a TOML file, since every option here is an operational knob
//! rather than a user profile.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_url: String,
    pub event_store_url: String,
    pub rate_limit_auth_per_min: u32,
    pub event_worker_pool_size: usize,
    pub event_queue_size: usize,
    pub cache_max_entries: usize,
    pub forecast_default_days: u32,
    pub capacity_history_limit: usize,
    pub shutdown_grace: Duration,
    pub cross_tenant_uploads_allowed: bool,
}

impl Settings {
    /// Load from the environment, falling back to the defaults in spec §6.
    /// `DB_URL` is the only required variable.
    pub fn from_env() -> Result<Self, String> {
        let db_url = env::var("DB_URL").map_err(|_| "DB_URL is required".to_string())?;
        let event_store_url = env::var("EVENT_STORE_URL").unwrap_or_else(|_| db_url.clone());
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Ok(Self {
            db_url,
            event_store_url,
            rate_limit_auth_per_min: env_parse("RATE_LIMIT_AUTH_PER_MIN", 10),
            event_worker_pool_size: env_parse("EVENT_WORKER_POOL_SIZE", cpu_count * 2),
            event_queue_size: env_parse("EVENT_QUEUE_SIZE", 1024),
            cache_max_entries: env_parse("CACHE_MAX_ENTRIES", 10_000),
            forecast_default_days: env_parse("FORECAST_DEFAULT_DAYS", 14),
            capacity_history_limit: env_parse("CAPACITY_HISTORY_LIMIT", 50),
            shutdown_grace: Duration::from_secs(env_parse("SHUTDOWN_GRACE_SECONDS", 30)),
            cross_tenant_uploads_allowed: env_parse_bool("CROSS_TENANT_UPLOADS_ALLOWED", false),
        })
    }

    /// Construct settings directly, bypassing the environment — used by
    /// tests and by the CLI's `--db` override.
    pub fn for_db(db_url: impl Into<String>) -> Self {
        let db_url = db_url.into();
        Self {
            event_store_url: db_url.clone(),
            db_url,
            rate_limit_auth_per_min: 10,
            event_worker_pool_size: 2,
            event_queue_size: 1024,
            cache_max_entries: 10_000,
            forecast_default_days: 14,
            capacity_history_limit: 50,
            shutdown_grace: Duration::from_secs(30),
            cross_tenant_uploads_allowed: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_parse_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref() {
        Some("1") | Some("true") | Some("TRUE") => true,
        Some("0") | Some("false") | Some("FALSE") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_db_matches_spec_defaults() {
        let s = Settings::for_db(":memory:");
        assert_eq!(s.rate_limit_auth_per_min, 10);
        assert_eq!(s.cache_max_entries, 10_000);
        assert_eq!(s.forecast_default_days, 14);
        assert_eq!(s.capacity_history_limit, 50);
        assert_eq!(s.shutdown_grace, Duration::from_secs(30));
        assert!(!s.cross_tenant_uploads_allowed);
    }
}
