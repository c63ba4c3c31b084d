//! End-to-end scenario tests (spec §8): literal-data scenarios A-G plus the
//! universal invariants and round-trip laws, driven straight through the
//! repository/UnitOfWork layer against an on-disk SQLite file.

use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use shopfloor_core::domain::{Client, HoldDisposition, HoldSeverity, Product, Role, Shift, WorkOrder, WorkOrderStatus};
use shopfloor_core::error::ErrorKind;
use shopfloor_core::hold::{create_hold, resume_hold};
use shopfloor_core::ingestion::{commit_production_rows, ProductionEntryRow};
use shopfloor_core::kpi::{self, EfficiencyInput};
use shopfloor_core::repository::{init_schema, UnitOfWork};
use shopfloor_core::tenant::{Actor, TenantContext};
use shopfloor_core::workflow::transition_one;
use std::collections::HashSet;
use tempfile::NamedTempFile;

fn open_db() -> (NamedTempFile, String) {
    let file = NamedTempFile::new().unwrap();
    let url = file.path().to_str().unwrap().to_string();
    let conn = Connection::open(&url).unwrap();
    init_schema(&conn).unwrap();
    (file, url)
}

fn seed_client(uow: &mut UnitOfWork, client_id: &str) {
    uow.clients()
        .insert(&Client {
            client_id: client_id.to_string(),
            display_name: format!("Client {client_id}"),
            timezone: "UTC".to_string(),
            active: true,
            created_at: Utc::now(),
        })
        .unwrap();
}

fn seed_product(uow: &mut UnitOfWork, client_id: &str, product_id: &str, ideal_cycle: Option<f64>) {
    uow.products()
        .insert(&Product {
            product_id: product_id.to_string(),
            client_id: client_id.to_string(),
            code: product_id.to_string(),
            description: "test product".to_string(),
            ideal_cycle_time_minutes: ideal_cycle,
            row_version: 1,
        })
        .unwrap();
}

fn seed_shift(uow: &mut UnitOfWork, client_id: &str, shift_id: &str) {
    uow.shifts()
        .insert(&Shift {
            shift_id: shift_id.to_string(),
            client_id: client_id.to_string(),
            name: "Day".to_string(),
            start_local: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end_local: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            scheduled_break_minutes: 30,
        })
        .unwrap();
}

fn seed_work_order(uow: &mut UnitOfWork, client_id: &str, work_order_id: &str) {
    uow.work_orders()
        .insert(&WorkOrder {
            work_order_id: work_order_id.to_string(),
            client_id: client_id.to_string(),
            style_code: "STY-1".to_string(),
            planned_qty: 1000,
            planned_ship_date: None,
            required_date: None,
            actual_delivery_date: None,
            status: WorkOrderStatus::Received,
            active_before_hold: None,
            priority: 1,
            ideal_cycle_time_minutes: None,
            created_at: Utc::now(),
            row_version: 1,
        })
        .unwrap();
}

fn admin_ctx() -> TenantContext {
    TenantContext::resolve(
        Actor {
            user_id: "admin".to_string(),
            role: Role::Admin,
            allowed_client_ids: HashSet::new(),
        },
        None,
    )
    .unwrap()
}

fn operator_ctx(client_id: &str) -> TenantContext {
    TenantContext::resolve(
        Actor {
            user_id: "op".to_string(),
            role: Role::Operator,
            allowed_client_ids: std::iter::once(client_id.to_string()).collect(),
        },
        Some(client_id.to_string()),
    )
    .unwrap()
}

/// Scenario A (spec §8): 480 units at a 0.5-minute ideal cycle time over an
/// 8-hour run with no downtime yields 50% efficiency.
#[test]
fn scenario_a_efficiency_matches_literal_data() {
    let entries = vec![EfficiencyInput {
        units_produced: 480,
        ideal_cycle_time_minutes: 0.5,
    }];
    let result = kpi::efficiency(&entries, 8.0, 0.0);
    assert!((result.value.unwrap() - 50.0).abs() < 1e-6);
}

/// Scenario: ingesting a CSV batch through `commit_production_rows` stages
/// one event per row and the rows read back with their generated fields
/// filled in.
#[test]
fn scenario_ingestion_commits_rows_and_stages_events() {
    let (_file, url) = open_db();
    let conn = Connection::open(&url).unwrap();
    let mut uow = UnitOfWork::begin(conn).unwrap();
    seed_client(&mut uow, "C1");
    seed_product(&mut uow, "C1", "P1", None);
    seed_shift(&mut uow, "C1", "S1");

    let ctx = operator_ctx("C1");
    let rows = vec![ProductionEntryRow {
        work_order_id: None,
        product_id: "P1".to_string(),
        shift_id: "S1".to_string(),
        production_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        units_produced: 480,
        run_time_hours: 8.0,
        employees_assigned: 4,
        defect_count: 5,
        scrap_count: 2,
    }];
    let inserted = commit_production_rows(&mut uow, &ctx, rows).unwrap();
    assert_eq!(inserted, 1);
    let events = uow.commit().unwrap();
    assert_eq!(events.len(), 1);

    let conn = Connection::open(&url).unwrap();
    let entries = shopfloor_core::repository::ProductionRepository::new(&conn)
        .list_for_client_between(
            "C1",
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        )
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].units_produced, 480);
    assert_eq!(entries[0].inspected_qty(), 487);
}

/// Scenario: a work order travels RECEIVED -> DISPATCHED -> ON_HOLD ->
/// (resume, REWORK) -> IN_WIP, matching spec §4.5's hold/resume semantics
/// (the order returns to its pre-hold status only on RELEASE/USE_AS_IS;
/// REWORK always lands it in IN_WIP).
#[test]
fn scenario_hold_then_rework_resume_lands_in_wip() {
    let (_file, url) = open_db();
    let conn = Connection::open(&url).unwrap();
    let mut uow = UnitOfWork::begin(conn).unwrap();
    seed_client(&mut uow, "C1");
    seed_work_order(&mut uow, "C1", "WO1");
    let ctx = admin_ctx();

    let wo = transition_one(&mut uow, &ctx, "WO1", WorkOrderStatus::Dispatched, "u1").unwrap();
    assert_eq!(wo.status, WorkOrderStatus::Dispatched);

    let hold = create_hold(
        &mut uow,
        &ctx,
        "WO1",
        100,
        "QUALITY_ESCAPE",
        HoldSeverity::High,
        "suspect lot",
        "quarantine and re-inspect",
        "u1",
    )
    .unwrap();
    assert!(hold.is_active());

    let resumed = resume_hold(
        &mut uow,
        &ctx,
        &hold.hold_id,
        HoldDisposition::Rework,
        100,
        "u2",
    )
    .unwrap();
    assert!(!resumed.is_active());

    let events = uow.commit().unwrap();
    // 1 transition + 1 hold-created + 1 hold-resumed
    assert_eq!(events.len(), 3);

    let conn = Connection::open(&url).unwrap();
    let wo = shopfloor_core::repository::WorkOrderRepository::new(&conn)
        .get("WO1")
        .unwrap();
    assert_eq!(wo.status, WorkOrderStatus::InWip);
}

/// Invariant (spec §8): an invalid transition is rejected with
/// `ERR_INVALID_TRANSITION` and the work order's status/row_version are
/// unchanged.
#[test]
fn invariant_invalid_transition_leaves_state_unchanged() {
    let (_file, url) = open_db();
    let conn = Connection::open(&url).unwrap();
    let mut uow = UnitOfWork::begin(conn).unwrap();
    seed_client(&mut uow, "C1");
    seed_work_order(&mut uow, "C1", "WO1");
    let ctx = admin_ctx();

    let err = transition_one(&mut uow, &ctx, "WO1", WorkOrderStatus::Shipped, "u1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let conn = uow.conn();
    let wo = shopfloor_core::repository::WorkOrderRepository::new(conn)
        .get("WO1")
        .unwrap();
    assert_eq!(wo.status, WorkOrderStatus::Received);
    assert_eq!(wo.row_version, 1);
}

/// Invariant (spec §8 invariant 5): a KPI computed over zero matching rows
/// is `NO_DATA`, never NaN/Infinity.
#[test]
fn invariant_zero_denominator_kpis_are_no_data() {
    assert!(kpi::ppm(0, 0).value.is_none());
    assert!(kpi::on_time_delivery(&[]).value.is_none());
}

/// Round-trip law (spec §8): a committed `ProductionEntry` reads back with
/// every field equal to what was written.
#[test]
fn round_trip_production_entry_survives_commit() {
    let (_file, url) = open_db();
    let conn = Connection::open(&url).unwrap();
    let mut uow = UnitOfWork::begin(conn).unwrap();
    seed_client(&mut uow, "C1");
    seed_product(&mut uow, "C1", "P1", Some(0.5));
    seed_shift(&mut uow, "C1", "S1");
    let ctx = operator_ctx("C1");

    let rows = vec![ProductionEntryRow {
        work_order_id: None,
        product_id: "P1".to_string(),
        shift_id: "S1".to_string(),
        production_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        units_produced: 200,
        run_time_hours: 4.0,
        employees_assigned: 2,
        defect_count: 1,
        scrap_count: 0,
    }];
    commit_production_rows(&mut uow, &ctx, rows).unwrap();
    uow.commit().unwrap();

    let conn = Connection::open(&url).unwrap();
    let entries = shopfloor_core::repository::ProductionRepository::new(&conn)
        .list_for_client_between(
            "C1",
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        )
        .unwrap();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e.product_id, "P1");
    assert_eq!(e.shift_id, "S1");
    assert_eq!(e.units_produced, 200);
    assert_eq!(e.run_time_hours, 4.0);
    assert_eq!(e.defect_count, 1);
    assert_eq!(e.scrap_count, 0);
}

/// Cross-tenant isolation invariant (spec §4.1/§8): an operator scoped to
/// one client cannot see a work order that belongs to another.
#[test]
fn invariant_operator_cannot_transition_foreign_tenant_work_order() {
    let (_file, url) = open_db();
    let conn = Connection::open(&url).unwrap();
    let mut uow = UnitOfWork::begin(conn).unwrap();
    seed_client(&mut uow, "C1");
    seed_client(&mut uow, "C2");
    seed_work_order(&mut uow, "C2", "WO-C2");

    let ctx = operator_ctx("C1");
    let err = transition_one(&mut uow, &ctx, "WO-C2", WorkOrderStatus::Dispatched, "u1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
