//! Identity & Tenant Context (C1, spec §4.1)
//!
//! Every inbound call is bound to a [`TenantContext`] before it touches the
//! repository layer. The context is the only place the isolation predicate
//! is computed; repositories just apply it.

use crate::domain::Role;
use crate::error::DomainError;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub allowed_client_ids: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct TenantContext {
    pub actor: Actor,
    pub requested_client_id: Option<String>,
}

impl TenantContext {
    /// Binds an actor to an operation against an optional target client,
    /// resolving to a context or `ERR_FORBIDDEN` (spec §4.1).
    pub fn resolve(
        actor: Actor,
        target_client_id: Option<String>,
    ) -> Result<Self, DomainError> {
        if let Some(ref target) = target_client_id {
            if !actor.role.bypasses_isolation() && !actor.allowed_client_ids.contains(target) {
                return Err(DomainError::Forbidden {
                    reason: format!("actor {} has no access to client {target}", actor.user_id),
                });
            }
        }
        Ok(TenantContext {
            actor,
            requested_client_id: target_client_id,
        })
    }

    /// The isolation predicate `P(row)` from spec §4.1, evaluated against a
    /// row's `client_id`.
    pub fn can_see(&self, row_client_id: &str) -> bool {
        if self.actor.role.bypasses_isolation() {
            return true;
        }
        let in_scope = self.actor.allowed_client_ids.contains(row_client_id);
        let matches_requested = self
            .requested_client_id
            .as_deref()
            .map(|r| r == row_client_id)
            .unwrap_or(true);
        in_scope && matches_requested
    }

    /// The concrete client a write must target. Non-bypass actors write to
    /// their single requested/allowed client; bypass actors must supply an
    /// explicit target (writes never infer a client for ADMIN/POWER_USER).
    pub fn write_client_id(&self) -> Result<String, DomainError> {
        if let Some(ref target) = self.requested_client_id {
            return Ok(target.clone());
        }
        if self.actor.role.bypasses_isolation() {
            return Err(DomainError::Validation {
                field: "client_id".to_string(),
                reason: "admin/power_user writes must target a concrete client".to_string(),
            });
        }
        let mut it = self.actor.allowed_client_ids.iter();
        match (it.next(), it.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => Err(DomainError::Validation {
                field: "client_id".to_string(),
                reason: "actor has no single default client; target_client_id required"
                    .to_string(),
            }),
        }
    }

    /// True when this call crosses tenant boundaries under an explicit
    /// bypass capability — callers must emit `TenantBypassUsed` (spec §9).
    pub fn is_bypass(&self) -> bool {
        self.actor.role.bypasses_isolation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, clients: &[&str]) -> Actor {
        Actor {
            user_id: "u1".to_string(),
            role,
            allowed_client_ids: clients.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn operator_cannot_resolve_out_of_scope_client() {
        let a = actor(Role::Operator, &["A"]);
        let err = TenantContext::resolve(a, Some("B".to_string())).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Forbidden);
    }

    #[test]
    fn admin_bypasses_isolation_but_must_target_client_on_write() {
        let a = actor(Role::Admin, &[]);
        let ctx = TenantContext::resolve(a, None).unwrap();
        assert!(ctx.can_see("any-client"));
        assert!(ctx.write_client_id().is_err());
    }

    #[test]
    fn operator_sees_only_allowed_clients() {
        let a = actor(Role::Operator, &["A"]);
        let ctx = TenantContext::resolve(a, None).unwrap();
        assert!(ctx.can_see("A"));
        assert!(!ctx.can_see("B"));
    }
}
