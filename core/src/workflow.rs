//! Work-order status graph and transitions (C5, spec §4.5).

use crate::domain::{EventKind, WorkOrder, WorkOrderStatus};
use crate::error::{DomainError, DomainResult};
use crate::repository::UnitOfWork;
use crate::tenant::TenantContext;
use serde::Serialize;

/// Canonical directed status graph from spec §4.5. A per-tenant override
/// must pass [`validate_graph`] before activation; this default already
/// does.
pub fn canonical_edges(from: WorkOrderStatus) -> &'static [WorkOrderStatus] {
    use WorkOrderStatus::*;
    match from {
        Received => &[Dispatched, OnHold, Cancelled],
        Dispatched => &[InWip, OnHold, Received],
        InWip => &[Completed, OnHold, Dispatched],
        Completed => &[Shipped, InWip],
        Shipped => &[Closed],
        Closed | Cancelled | Rejected => &[],
        OnHold => &[], // resume target is `active_before_hold`, resolved dynamically
    }
}

pub fn can_transition(from: WorkOrderStatus, to: WorkOrderStatus) -> bool {
    canonical_edges(from).contains(&to)
}

/// Validates a full status graph against spec §4.5's activation rules.
/// `edges` maps every declared status to its allowed destinations.
pub fn validate_graph(
    statuses: &[WorkOrderStatus],
    edges: &dyn Fn(WorkOrderStatus) -> Vec<WorkOrderStatus>,
) -> DomainResult<()> {
    let start = WorkOrderStatus::Received;
    if !statuses.contains(&start) {
        return Err(DomainError::Validation {
            field: "workflow_config".to_string(),
            reason: "exactly one start status RECEIVED is required".to_string(),
        });
    }
    if !statuses.iter().any(|s| s.is_terminal()) {
        return Err(DomainError::Validation {
            field: "workflow_config".to_string(),
            reason: "at least one terminal status required".to_string(),
        });
    }
    for s in statuses {
        if !s.is_terminal() && edges(*s).is_empty() && *s != WorkOrderStatus::OnHold {
            return Err(DomainError::Validation {
                field: "workflow_config".to_string(),
                reason: format!("dead-end non-terminal status: {}", s.as_str()),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct BulkTransitionResult {
    pub successful: Vec<String>,
    pub failed: Vec<FailedTransition>,
}

#[derive(Debug, Serialize)]
pub struct FailedTransition {
    pub work_order_id: String,
    pub reason: String,
}

/// `TransitionOne` (spec §4.5). Applies the status graph, bumps
/// `row_version`, and stages `WorkOrderStatusChanged`.
pub fn transition_one(
    uow: &mut UnitOfWork,
    ctx: &TenantContext,
    work_order_id: &str,
    to: WorkOrderStatus,
    by: &str,
) -> DomainResult<WorkOrder> {
    let repo = uow.work_orders();
    let wo = repo.get(work_order_id)?;
    if !ctx.can_see(&wo.client_id) {
        return Err(DomainError::Forbidden {
            reason: format!("actor cannot see work order {work_order_id}"),
        });
    }
    if !can_transition(wo.status, to) {
        return Err(DomainError::InvalidTransition {
            work_order_id: work_order_id.to_string(),
            from: wo.status.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    repo.update_status(work_order_id, wo.row_version, to, wo.active_before_hold)?;
    uow.stage_event(
        EventKind::WorkOrderStatusChanged {
            work_order_id: work_order_id.to_string(),
            from: wo.status.as_str().to_string(),
            to: to.as_str().to_string(),
            by: by.to_string(),
        }
        .into_event(Some(wo.client_id.clone()), Some(by.to_string())),
    );
    let mut updated = wo;
    updated.status = to;
    updated.row_version += 1;
    Ok(updated)
}

/// `TransitionBulk` (spec §4.5). Incompatible orders are skipped per-item,
/// never rolling back the whole batch unless infra fails (propagated as
/// an error from the caller's surrounding transaction).
pub fn transition_bulk(
    uow: &mut UnitOfWork,
    ctx: &TenantContext,
    work_order_ids: &[String],
    to: WorkOrderStatus,
    by: &str,
) -> DomainResult<BulkTransitionResult> {
    let mut successful = Vec::new();
    let mut failed = Vec::new();
    for id in work_order_ids {
        match transition_one(uow, ctx, id, to, by) {
            Ok(_) => successful.push(id.clone()),
            Err(DomainError::Infra { message }) => {
                return Err(DomainError::Infra { message });
            }
            Err(e) => failed.push(FailedTransition {
                work_order_id: id.clone(),
                reason: e.to_string(),
            }),
        }
    }
    Ok(BulkTransitionResult { successful, failed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn received_allows_dispatch_hold_or_cancel() {
        assert!(can_transition(WorkOrderStatus::Received, WorkOrderStatus::Dispatched));
        assert!(can_transition(WorkOrderStatus::Received, WorkOrderStatus::OnHold));
        assert!(can_transition(WorkOrderStatus::Received, WorkOrderStatus::Cancelled));
        assert!(!can_transition(WorkOrderStatus::Received, WorkOrderStatus::Completed));
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        assert!(canonical_edges(WorkOrderStatus::Closed).is_empty());
        assert!(canonical_edges(WorkOrderStatus::Cancelled).is_empty());
        assert!(canonical_edges(WorkOrderStatus::Rejected).is_empty());
    }
}
