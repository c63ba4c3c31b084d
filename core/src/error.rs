//! Structured error types for the shop-floor KPI platform
//!
//! Every domain operation returns a typed [`DomainError`]; the service
//! facade (C11) maps each variant's [`ErrorKind`] onto the transport-agnostic
//! error shape described in spec §7. Operators never see an internal
//! message for [`ErrorKind::Internal`] — only the logged diagnostic does.

use thiserror::Error;

/// The ten error kinds from spec §7. Kept distinct from [`DomainError`] so
/// the facade can match on kind without re-deriving it from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    Validation,
    Conflict,
    Stale,
    DependentRows,
    InvalidTransition,
    NotFound,
    Infra,
    Internal,
}

/// Primary error type for shop-floor KPI platform operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Missing or invalid actor (no token claims attached to the call)
    #[error("unauthenticated")]
    Unauthenticated,

    /// Tenant/role check failed for the requested operation
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// Referenced client is not known to the system
    #[error("unknown client: {client_id}")]
    ClientUnknown { client_id: String },

    /// Bad input shape or out-of-range value
    #[error("validation failed on {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Unique-key or invariant violation
    #[error("conflict on {key}: {reason}")]
    Conflict { key: String, reason: String },

    /// Optimistic lock failure (`row_version` mismatch)
    #[error("stale snapshot: expected version {expected}, found {found}")]
    Stale { expected: i64, found: i64 },

    /// Delete blocked because dependent rows reference this entity
    #[error("cannot delete {entity} {id}: has dependent rows")]
    DependentRows { entity: String, id: String },

    /// Workflow transition rejected by the status graph
    #[error("invalid transition for {work_order_id}: {from} -> {to}")]
    InvalidTransition {
        work_order_id: String,
        from: String,
        to: String,
    },

    /// Entity absent within the caller's tenant scope
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// I/O, timeout, or partial outage
    #[error("infrastructure error: {message}")]
    Infra { message: String },

    /// Invariant breach / bug; never expose internals beyond this message
    #[error("internal error")]
    Internal { diagnostic: String },
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Unauthenticated => ErrorKind::Unauthenticated,
            DomainError::Forbidden { .. } | DomainError::ClientUnknown { .. } => {
                ErrorKind::Forbidden
            }
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::Conflict { .. } => ErrorKind::Conflict,
            DomainError::Stale { .. } => ErrorKind::Stale,
            DomainError::DependentRows { .. } => ErrorKind::DependentRows,
            DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Infra { .. } => ErrorKind::Infra,
            DomainError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// True when the service facade may retry the triggering operation
    /// (spec §9: bounded N=2 retries on STALE for idempotent operations).
    pub fn retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Stale)
    }

    pub fn internal(diagnostic: impl Into<String>) -> Self {
        let diagnostic = diagnostic.into();
        tracing::error!(diagnostic = %diagnostic, "internal invariant breach");
        DomainError::Internal { diagnostic }
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DomainError::Conflict {
                    key: msg.clone().unwrap_or_default(),
                    reason: "unique or foreign-key constraint violated".to_string(),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => DomainError::NotFound {
                entity: "row".to_string(),
                id: "unknown".to_string(),
            },
            _ => DomainError::Infra {
                message: err.to_string(),
            },
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_forbidden_variants() {
        let e = DomainError::Forbidden {
            reason: "x".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Forbidden);
        let e = DomainError::ClientUnknown {
            client_id: "c1".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn only_stale_is_retryable() {
        assert!(DomainError::Stale {
            expected: 1,
            found: 2
        }
        .retryable());
        assert!(!DomainError::Conflict {
            key: "k".into(),
            reason: "r".into()
        }
        .retryable());
    }
}
