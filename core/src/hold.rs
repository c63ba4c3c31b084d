//! Hold/resume subsystem (C6, spec §4.5 resume semantics, §4.6 aging).

use crate::domain::{EventKind, HoldDisposition, HoldEntry, HoldSeverity, WorkOrderStatus};
use crate::error::{DomainError, DomainResult};
use crate::repository::UnitOfWork;
use crate::tenant::TenantContext;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingBucket {
    Days0To7,
    Days8To14,
    Days15To30,
    Over30,
}

impl AgingBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgingBucket::Days0To7 => "0-7",
            AgingBucket::Days8To14 => "8-14",
            AgingBucket::Days15To30 => "15-30",
            AgingBucket::Over30 => "30+",
        }
    }
}

/// Bucket from age-in-days since `initiated_at` (spec §4.6).
pub fn aging_bucket(hold: &HoldEntry, now: DateTime<Utc>) -> AgingBucket {
    let days = hold.duration_from(now).num_days();
    match days {
        0..=7 => AgingBucket::Days0To7,
        8..=14 => AgingBucket::Days8To14,
        15..=30 => AgingBucket::Days15To30,
        _ => AgingBucket::Over30,
    }
}

/// `Hold(work_order_id, reason, severity, description)` (spec §4.5).
/// Captures the work order's current status as `active_before_hold`,
/// moves it to `ON_HOLD`, and creates the `HoldEntry`.
#[allow(clippy::too_many_arguments)]
pub fn create_hold(
    uow: &mut UnitOfWork,
    ctx: &TenantContext,
    work_order_id: &str,
    quantity_held: i64,
    reason: &str,
    severity: HoldSeverity,
    description: &str,
    required_action: &str,
    initiated_by: &str,
) -> DomainResult<HoldEntry> {
    let wo_repo = uow.work_orders();
    let wo = wo_repo.get(work_order_id)?;
    if !ctx.can_see(&wo.client_id) {
        return Err(DomainError::Forbidden {
            reason: format!("actor cannot see work order {work_order_id}"),
        });
    }

    let open_holds = uow.holds().list_open_for_work_order(work_order_id)?;
    if open_holds.iter().any(|h| h.reason == reason) {
        return Err(DomainError::Conflict {
            key: format!("hold:{work_order_id}:{reason}"),
            reason: "an active hold with this reason code already exists".to_string(),
        });
    }

    let active_before_hold = if wo.status == WorkOrderStatus::OnHold {
        wo.active_before_hold
    } else {
        Some(wo.status)
    };

    let now = Utc::now();
    let hold = HoldEntry {
        hold_id: Uuid::new_v4().to_string(),
        client_id: wo.client_id.clone(),
        work_order_id: work_order_id.to_string(),
        quantity_held,
        reason: reason.to_string(),
        severity,
        description: description.to_string(),
        required_action: required_action.to_string(),
        initiated_by: initiated_by.to_string(),
        initiated_at: now,
        resumed_at: None,
        disposition: None,
        released_quantity: None,
        approved_by: None,
        row_version: 1,
    };
    uow.holds().insert(&hold)?;
    wo_repo.update_status(
        work_order_id,
        wo.row_version,
        WorkOrderStatus::OnHold,
        active_before_hold,
    )?;
    uow.stage_event(
        EventKind::HoldCreated {
            hold_id: hold.hold_id.clone(),
        }
        .into_event(Some(wo.client_id.clone()), Some(initiated_by.to_string())),
    );
    Ok(hold)
}

/// `Resume(hold_id, disposition, released_qty, approved_by, notes)`
/// (spec §4.5). Only when the **last** open hold on a work order resumes
/// does the order leave `ON_HOLD`.
pub fn resume_hold(
    uow: &mut UnitOfWork,
    ctx: &TenantContext,
    hold_id: &str,
    disposition: HoldDisposition,
    released_quantity: i64,
    approved_by: &str,
) -> DomainResult<HoldEntry> {
    let hold_repo = uow.holds();
    let hold = hold_repo.get(hold_id)?;
    if !ctx.can_see(&hold.client_id) {
        return Err(DomainError::Forbidden {
            reason: format!("actor cannot see hold {hold_id}"),
        });
    }
    if !hold.is_active() {
        return Err(DomainError::Conflict {
            key: format!("hold:{hold_id}"),
            reason: "hold already resumed".to_string(),
        });
    }
    if released_quantity > hold.quantity_held {
        return Err(DomainError::Validation {
            field: "released_quantity".to_string(),
            reason: "cannot release more than was held".to_string(),
        });
    }

    let now = Utc::now();
    hold_repo.resume(
        hold_id,
        hold.row_version,
        now,
        disposition,
        released_quantity,
        approved_by,
    )?;

    let wo_repo = uow.work_orders();
    let wo = wo_repo.get(&hold.work_order_id)?;
    let remaining_open = hold_repo
        .list_open_for_work_order(&hold.work_order_id)?
        .into_iter()
        .filter(|h| h.hold_id != hold_id)
        .count();

    if remaining_open == 0 {
        let next_status = match disposition {
            HoldDisposition::Rework => WorkOrderStatus::InWip,
            HoldDisposition::Release => wo.active_before_hold.unwrap_or(WorkOrderStatus::InWip),
            HoldDisposition::Scrap | HoldDisposition::Rts => WorkOrderStatus::Cancelled,
            HoldDisposition::UseAsIs => wo.active_before_hold.unwrap_or(WorkOrderStatus::InWip),
        };
        wo_repo.update_status(&hold.work_order_id, wo.row_version, next_status, None)?;
    }

    uow.stage_event(
        EventKind::HoldResumed {
            hold_id: hold_id.to_string(),
            disposition: format!("{disposition:?}").to_ascii_uppercase(),
        }
        .into_event(Some(hold.client_id.clone()), Some(approved_by.to_string())),
    );

    let mut resumed = hold;
    resumed.resumed_at = Some(now);
    resumed.disposition = Some(disposition);
    resumed.released_quantity = Some(released_quantity);
    resumed.approved_by = Some(approved_by.to_string());
    resumed.row_version += 1;
    Ok(resumed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aging_bucket_boundaries() {
        let now = Utc::now();
        let mk = |days: i64| HoldEntry {
            hold_id: "h".into(),
            client_id: "c".into(),
            work_order_id: "w".into(),
            quantity_held: 1,
            reason: "r".into(),
            severity: HoldSeverity::Low,
            description: String::new(),
            required_action: String::new(),
            initiated_by: "u".into(),
            initiated_at: now - chrono::Duration::days(days),
            resumed_at: None,
            disposition: None,
            released_quantity: None,
            approved_by: None,
            row_version: 1,
        };
        assert_eq!(aging_bucket(&mk(3), now), AgingBucket::Days0To7);
        assert_eq!(aging_bucket(&mk(10), now), AgingBucket::Days8To14);
        assert_eq!(aging_bucket(&mk(20), now), AgingBucket::Days15To30);
        assert_eq!(aging_bucket(&mk(45), now), AgingBucket::Over30);
    }
}
