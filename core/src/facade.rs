//! Service facade (C11, spec §4.11, §6, §7).
//!
//! The single tenant-bound entry point external transports (CLI, future
//! HTTP/gRPC layers) call through. It opens a [`UnitOfWork`] per operation,
//! commits and dispatches staged events on success, rolls back and never
//! dispatches on failure, retries `ERR_STALE` a bounded number of times on
//! idempotent operations, rate limits auth-like endpoints, and translates
//! every [`DomainError`] into the transport-agnostic shape from spec §7.

use crate::config::Settings;
use crate::domain::User;
use crate::error::{DomainError, DomainResult, ErrorKind};
use crate::event_bus::EventBus;
use crate::repository::{init_schema, UnitOfWork};
use crate::tenant::{Actor, TenantContext};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bounded retries of a `Stale` failure before giving up (spec §9).
const MAX_STALE_RETRIES: u32 = 2;

/// Transport-agnostic error envelope (spec §7): never leaks an internal
/// diagnostic, only the logged `tracing::error!` in [`DomainError::internal`]
/// does.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

impl From<&DomainError> for ApiError {
    fn from(err: &DomainError) -> Self {
        let code = match err.kind() {
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Stale => "STALE",
            ErrorKind::DependentRows => "DEPENDENT_ROWS",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Infra => "INFRA",
            ErrorKind::Internal => "INTERNAL",
        };
        let message = match err {
            DomainError::Internal { .. } => "an internal error occurred".to_string(),
            other => other.to_string(),
        };
        ApiError { code, message }
    }
}

/// Fixed-window counter, one per actor, reset every `window`. Grounded on
/// the teacher's `rate_limit.rs` token-bucket-by-key pattern, simplified to
/// fixed windows since spec §6 only requires a per-minute ceiling on
/// auth-like endpoints.
struct RateLimiter {
    window: Duration,
    limit: u32,
    counters: Mutex<HashMap<String, (Instant, u32)>>,
}

impl RateLimiter {
    fn new(limit: u32, window: Duration) -> Self {
        RateLimiter {
            window,
            limit,
            counters: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, key: &str) -> DomainResult<()> {
        let mut counters = self.counters.lock();
        let now = Instant::now();
        let entry = counters.entry(key.to_string()).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;
        if entry.1 > self.limit {
            return Err(DomainError::Forbidden {
                reason: format!("rate limit exceeded for {key}"),
            });
        }
        Ok(())
    }
}

/// Binds a connection opener, the event bus, and cross-cutting policy
/// (rate limiting, stale-retry) into one callable surface. Holds no
/// in-process connection itself — every operation opens its own
/// [`UnitOfWork`] against a fresh connection so concurrent callers never
/// contend on a shared transaction.
pub struct ServiceFacade {
    db_url: String,
    event_bus: EventBus,
    auth_rate_limiter: RateLimiter,
}

impl ServiceFacade {
    pub fn new(settings: &Settings, event_bus: EventBus) -> DomainResult<Self> {
        let conn = open_connection(&settings.db_url)?;
        init_schema(&conn)?;
        Ok(ServiceFacade {
            db_url: settings.db_url.clone(),
            event_bus,
            auth_rate_limiter: RateLimiter::new(
                settings.rate_limit_auth_per_min,
                Duration::from_secs(60),
            ),
        })
    }

    fn open_uow(&self) -> DomainResult<UnitOfWork> {
        UnitOfWork::begin(open_connection(&self.db_url)?)
    }

    /// Auth-like endpoints (login, token issuance) pass through here first
    /// (spec §6: default 10/min per actor).
    pub fn check_auth_rate_limit(&self, actor_key: &str) -> DomainResult<()> {
        self.auth_rate_limiter.check(actor_key)
    }

    /// `login(username, password)` (spec §6). The core never hashes a
    /// password itself (spec §1 Non-goals exclude auth/session machinery
    /// beyond the identity+role claims it consumes) — it only performs the
    /// constant-time compare against the stored hash (spec §4.1).
    pub fn login(&self, username: &str, password: &str) -> DomainResult<Actor> {
        self.check_auth_rate_limit(username)?;
        let conn = open_connection(&self.db_url)?;
        let user: User = crate::repository::UserRepository::new(&conn).get(username)?;
        if !user.active || !constant_time_eq(password.as_bytes(), user.password_hash.as_bytes()) {
            return Err(DomainError::Unauthenticated);
        }
        Ok(Actor {
            user_id: user.user_id,
            role: user.role,
            allowed_client_ids: user.assigned_client_ids,
        })
    }

    /// Read-only path for `query_kpi`/`forecast`-shaped operations (spec
    /// §6): opens a plain connection, no transaction, nothing to commit or
    /// dispatch.
    pub fn query<T>(&self, op: impl FnOnce(&rusqlite::Connection) -> DomainResult<T>) -> DomainResult<T> {
        let conn = open_connection(&self.db_url)?;
        op(&conn)
    }

    /// Resolves a [`TenantContext`] for `actor` against `target_client_id`,
    /// the first step of every operation (spec §4.1).
    pub fn resolve_tenant(
        &self,
        actor: Actor,
        target_client_id: Option<String>,
    ) -> DomainResult<TenantContext> {
        TenantContext::resolve(actor, target_client_id)
    }

    /// Runs `op` inside one unit of work: on `Ok`, commits and dispatches
    /// the staged events; on `Err`, the unit of work's `Drop` rolls back
    /// and nothing is dispatched. Never retries — callers that need the
    /// bounded stale-retry use [`ServiceFacade::execute_idempotent`].
    pub async fn execute<T>(
        &self,
        op: impl FnOnce(&mut UnitOfWork) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let mut uow = self.open_uow()?;
        let result = op(&mut uow)?;
        let events = uow.commit()?;
        self.event_bus.dispatch(events).await;
        Ok(result)
    }

    /// Same as [`ServiceFacade::execute`], but retries up to
    /// `MAX_STALE_RETRIES` times when `op` fails with `ERR_STALE` — for
    /// operations whose retry is safe because `op` re-reads the row's
    /// current `row_version` on each attempt (spec §9).
    pub async fn execute_idempotent<T>(
        &self,
        mut op: impl FnMut(&mut UnitOfWork) -> DomainResult<T>,
    ) -> DomainResult<T> {
        let mut attempt = 0;
        loop {
            let mut uow = self.open_uow()?;
            match op(&mut uow) {
                Ok(result) => {
                    let events = uow.commit()?;
                    self.event_bus.dispatch(events).await;
                    return Ok(result);
                }
                Err(err) if err.retryable() && attempt < MAX_STALE_RETRIES => {
                    uow.rollback()?;
                    attempt += 1;
                    tracing::debug!(attempt, "retrying after stale snapshot");
                    continue;
                }
                Err(err) => {
                    uow.rollback()?;
                    return Err(err);
                }
            }
        }
    }

    /// Enforces a deadline on any async operation (spec §6: bounded call
    /// latency), returning `ERR_INFRA` on timeout.
    pub async fn with_deadline<T>(
        &self,
        deadline: Duration,
        fut: impl Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Infra {
                message: "operation exceeded its deadline".to_string(),
            }),
        }
    }
}

fn open_connection(db_url: &str) -> DomainResult<rusqlite::Connection> {
    rusqlite::Connection::open(db_url).map_err(DomainError::from)
}

/// Constant-time byte comparison (spec §4.1: "constant-time compare on
/// login"). Lengths differing still walks the longer operand so timing
/// doesn't leak the stored hash's length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = (a.len() != b.len()) as u8;
    for i in 0..len {
        diff |= a.get(i).copied().unwrap_or(0) ^ b.get(i).copied().unwrap_or(0);
    }
    diff == 0
}

/// Handle to the spawned worker pool, kept alive by the CLI/transport's
/// `main` for the process lifetime; dropping it without awaiting the
/// handles just detaches the workers (they still drain on channel close).
pub struct FacadeHandles {
    pub facade: Arc<ServiceFacade>,
    pub event_bus_workers: Vec<tokio::task::JoinHandle<()>>,
}

/// Builds a [`ServiceFacade`] plus its event bus worker pool from
/// `settings`. `handlers` are wired by the caller before the bus starts
/// dispatching (spec §4.3).
pub fn bootstrap(
    settings: &Settings,
    builder: crate::event_bus::EventBusBuilder,
) -> DomainResult<FacadeHandles> {
    let (event_bus, workers) = builder.build();
    let facade = ServiceFacade::new(settings, event_bus)?;
    Ok(FacadeHandles {
        facade: Arc::new(facade),
        event_bus_workers: workers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::EventBusBuilder;

    fn test_settings() -> Settings {
        Settings::for_db(":memory:")
    }

    #[test]
    fn api_error_hides_internal_diagnostic() {
        let err = DomainError::Internal {
            diagnostic: "leaked row id 42".to_string(),
        };
        let api: ApiError = (&err).into();
        assert_eq!(api.code, "INTERNAL");
        assert!(!api.message.contains("leaked"));
    }

    #[test]
    fn rate_limiter_rejects_past_the_window_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("u1").is_ok());
        assert!(limiter.check("u1").is_ok());
        assert!(limiter.check("u1").is_err());
        assert!(limiter.check("u2").is_ok());
    }

    #[tokio::test]
    async fn execute_commits_and_dispatches_on_success() {
        let (bus, _handles) = EventBusBuilder::new(1, 16).build();
        let facade = ServiceFacade::new(&test_settings(), bus).unwrap();
        let result = facade
            .execute(|_uow| -> DomainResult<i32> { Ok(7) })
            .await
            .unwrap();
        assert_eq!(result, 7);
    }

    #[tokio::test]
    async fn execute_idempotent_retries_until_success() {
        let (bus, _handles) = EventBusBuilder::new(1, 16).build();
        let facade = ServiceFacade::new(&test_settings(), bus).unwrap();
        let mut calls = 0;
        let result = facade
            .execute_idempotent(|_uow| -> DomainResult<i32> {
                calls += 1;
                if calls < 2 {
                    Err(DomainError::Stale {
                        expected: 1,
                        found: 2,
                    })
                } else {
                    Ok(calls)
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 2);
    }

    #[test]
    fn login_rejects_wrong_password_and_accepts_right_one() {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let db_url = db_file.path().to_str().unwrap().to_string();
        let settings = Settings::for_db(&db_url);
        let (bus, _handles) = EventBusBuilder::new(1, 16).build();
        let facade = ServiceFacade::new(&settings, bus).unwrap();

        let conn = open_connection(&db_url).unwrap();
        crate::repository::UserRepository::new(&conn)
            .insert(&User {
                user_id: "u1".to_string(),
                display_name: "Operator One".to_string(),
                password_hash: "correct-hash".to_string(),
                role: crate::domain::Role::Operator,
                assigned_client_ids: std::iter::once("C1".to_string()).collect(),
                created_at: chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&chrono::Utc),
                active: true,
            })
            .unwrap();

        assert!(facade.login("u1", "wrong-hash").is_err());
        let actor = facade.login("u1", "correct-hash").unwrap();
        assert_eq!(actor.user_id, "u1");
    }

    #[tokio::test]
    async fn execute_idempotent_gives_up_after_bound() {
        let (bus, _handles) = EventBusBuilder::new(1, 16).build();
        let facade = ServiceFacade::new(&test_settings(), bus).unwrap();
        let err = facade
            .execute_idempotent(|_uow| -> DomainResult<()> {
                Err(DomainError::Stale {
                    expected: 1,
                    found: 2,
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Stale);
    }
}
