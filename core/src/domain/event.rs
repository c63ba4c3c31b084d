use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only domain event (spec §3 "Event & audit", §4.3). Never mutated
/// after persistence; `payload` is the event-specific JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: String,
    /// `None` for system events not scoped to a tenant.
    pub client_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub triggered_by: Option<String>,
    pub payload: serde_json::Value,
    /// Sync handlers must not block a critical event's async fan-out;
    /// the async dispatcher uses this to decide drop-oldest vs. bounded
    /// wait (spec §4.3 step 3, §5).
    pub critical: bool,
}

/// Typed constructors for the minimum event set in spec §4.3. Each builds
/// a [`DomainEvent`] with the payload already shaped so handlers can
/// `serde_json::from_value::<T>` it back out.
pub enum EventKind {
    WorkOrderStatusChanged {
        work_order_id: String,
        from: String,
        to: String,
        by: String,
    },
    ProductionEntryCreated {
        entry_id: String,
        key_metrics: serde_json::Value,
    },
    QualityInspectionRecorded {
        entry_id: String,
        fpy_delta: f64,
    },
    HoldCreated {
        hold_id: String,
    },
    HoldResumed {
        hold_id: String,
        disposition: String,
    },
    KpiThresholdViolated {
        kpi: String,
        value: f64,
        threshold: f64,
        window: String,
    },
    TenantBypassUsed {
        actor_user_id: String,
        operation: String,
    },
}

impl EventKind {
    fn type_name(&self) -> &'static str {
        match self {
            EventKind::WorkOrderStatusChanged { .. } => "WorkOrderStatusChanged",
            EventKind::ProductionEntryCreated { .. } => "ProductionEntryCreated",
            EventKind::QualityInspectionRecorded { .. } => "QualityInspectionRecorded",
            EventKind::HoldCreated { .. } => "HoldCreated",
            EventKind::HoldResumed { .. } => "HoldResumed",
            EventKind::KpiThresholdViolated { .. } => "KPIThresholdViolated",
            EventKind::TenantBypassUsed { .. } => "TenantBypassUsed",
        }
    }

    fn aggregate(&self) -> (&'static str, String) {
        match self {
            EventKind::WorkOrderStatusChanged { work_order_id, .. } => {
                ("WorkOrder", work_order_id.clone())
            }
            EventKind::ProductionEntryCreated { entry_id, .. } => {
                ("ProductionEntry", entry_id.clone())
            }
            EventKind::QualityInspectionRecorded { entry_id, .. } => {
                ("QualityEntry", entry_id.clone())
            }
            EventKind::HoldCreated { hold_id } | EventKind::HoldResumed { hold_id, .. } => {
                ("HoldEntry", hold_id.clone())
            }
            EventKind::KpiThresholdViolated { kpi, .. } => ("Kpi", kpi.clone()),
            EventKind::TenantBypassUsed { operation, .. } => ("Tenant", operation.clone()),
        }
    }

    /// Threshold-violation and bypass events block with bounded wait
    /// rather than being dropped under queue pressure (spec §4.3, §5).
    fn is_critical(&self) -> bool {
        matches!(
            self,
            EventKind::KpiThresholdViolated { .. } | EventKind::TenantBypassUsed { .. }
        )
    }

    pub fn into_event(self, client_id: Option<String>, triggered_by: Option<String>) -> DomainEvent {
        let event_type = self.type_name().to_string();
        let critical = self.is_critical();
        let (aggregate_type, aggregate_id) = self.aggregate();
        let payload = match &self {
            EventKind::WorkOrderStatusChanged { from, to, by, .. } => {
                serde_json::json!({ "from": from, "to": to, "by": by })
            }
            EventKind::ProductionEntryCreated { key_metrics, .. } => key_metrics.clone(),
            EventKind::QualityInspectionRecorded { fpy_delta, .. } => {
                serde_json::json!({ "fpy_delta": fpy_delta })
            }
            EventKind::HoldCreated { .. } => serde_json::json!({}),
            EventKind::HoldResumed { disposition, .. } => {
                serde_json::json!({ "disposition": disposition })
            }
            EventKind::KpiThresholdViolated {
                value,
                threshold,
                window,
                ..
            } => serde_json::json!({ "value": value, "threshold": threshold, "window": window }),
            EventKind::TenantBypassUsed {
                actor_user_id,
                operation,
            } => serde_json::json!({ "actor_user_id": actor_user_id, "operation": operation }),
        };

        DomainEvent {
            event_id: Uuid::new_v4(),
            event_type,
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            client_id,
            occurred_at: Utc::now(),
            triggered_by,
            payload,
            critical,
        }
    }
}
