//! Repository / Unit-of-Work layer (C2, spec §4.2).
//!
//! One SQLite connection per [`UnitOfWork`], opened with `BEGIN IMMEDIATE`
//! so writers serialize at transaction start rather than at first write.
//! Domain events raised during the transaction are staged in-memory and
//! only handed to the event bus once `commit()` succeeds — grounded on the
//! collect-then-flush pattern the event bus module generalizes.

mod attendance;
mod employees;
mod events;
mod holds;
mod production;
mod quality;
mod reference_data;
mod work_orders;

pub use attendance::AttendanceRepository;
pub use employees::EmployeeRepository;
pub use events::EventRepository;
pub use holds::HoldRepository;
pub use production::{DowntimeRepository, ProductionRepository};
pub use quality::QualityRepository;
pub use reference_data::{ClientRepository, ProductRepository, ShiftRepository, UserRepository};
pub use work_orders::WorkOrderRepository;

use crate::domain::DomainEvent;
use crate::error::{DomainError, DomainResult};
use rusqlite::Connection;

/// Bumps on every committed write to a versioned row; callers that read a
/// row, mutate it, then write it back compare this value and raise
/// `ERR_STALE` on mismatch (spec §4.2 optimistic locking).
pub fn check_row_version(expected: i64, found: i64, entity: &str) -> DomainResult<()> {
    if expected != found {
        tracing::debug!(entity, expected, found, "optimistic lock mismatch");
        return Err(DomainError::Stale { expected, found });
    }
    Ok(())
}

pub struct UnitOfWork {
    conn: Connection,
    pending_events: Vec<DomainEvent>,
    committed: bool,
}

impl UnitOfWork {
    /// Opens a transaction against `conn`. `conn` should come from a pool
    /// keyed one-per-caller; SQLite itself serializes writers so a single
    /// shared connection behind `Arc<parking_lot::Mutex<_>>` is also safe.
    pub fn begin(conn: Connection) -> DomainResult<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(UnitOfWork {
            conn,
            pending_events: Vec::new(),
            committed: false,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Stages an event for post-commit dispatch. Never visible to other
    /// transactions; discarded entirely on rollback.
    pub fn stage_event(&mut self, event: DomainEvent) {
        self.pending_events.push(event);
    }

    pub fn clients(&self) -> ClientRepository<'_> {
        ClientRepository::new(&self.conn)
    }

    pub fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.conn)
    }

    pub fn products(&self) -> ProductRepository<'_> {
        ProductRepository::new(&self.conn)
    }

    pub fn shifts(&self) -> ShiftRepository<'_> {
        ShiftRepository::new(&self.conn)
    }

    pub fn employees(&self) -> EmployeeRepository<'_> {
        EmployeeRepository::new(&self.conn)
    }

    pub fn work_orders(&self) -> WorkOrderRepository<'_> {
        WorkOrderRepository::new(&self.conn)
    }

    pub fn production(&self) -> ProductionRepository<'_> {
        ProductionRepository::new(&self.conn)
    }

    pub fn downtime(&self) -> DowntimeRepository<'_> {
        DowntimeRepository::new(&self.conn)
    }

    pub fn holds(&self) -> HoldRepository<'_> {
        HoldRepository::new(&self.conn)
    }

    pub fn quality(&self) -> QualityRepository<'_> {
        QualityRepository::new(&self.conn)
    }

    pub fn attendance(&self) -> AttendanceRepository<'_> {
        AttendanceRepository::new(&self.conn)
    }

    pub fn events(&self) -> EventRepository<'_> {
        EventRepository::new(&self.conn)
    }

    /// Commits the SQLite transaction, persists staged events to the
    /// append-only event log in the same commit, and returns them for
    /// post-commit dispatch by the event bus.
    pub fn commit(mut self) -> DomainResult<Vec<DomainEvent>> {
        for event in &self.pending_events {
            self.events().append(event)?;
        }
        self.conn.execute_batch("COMMIT")?;
        self.committed = true;
        Ok(std::mem::take(&mut self.pending_events))
    }

    pub fn rollback(mut self) -> DomainResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for UnitOfWork {
    /// Safety net: an un-committed, un-rolled-back unit of work rolls back
    /// rather than leaving the connection mid-transaction.
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

/// Creates every table the domain model needs if it is not already
/// present. Idempotent; safe to call on every process start.
pub fn init_schema(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS clients (
            client_id    TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            timezone     TEXT NOT NULL,
            active       INTEGER NOT NULL,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
            user_id            TEXT PRIMARY KEY,
            display_name       TEXT NOT NULL,
            password_hash      TEXT NOT NULL,
            role               TEXT NOT NULL,
            assigned_client_ids TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            active             INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS products (
            product_id              TEXT PRIMARY KEY,
            client_id               TEXT NOT NULL REFERENCES clients(client_id),
            code                    TEXT NOT NULL,
            description             TEXT NOT NULL,
            ideal_cycle_time_minutes REAL,
            row_version             INTEGER NOT NULL DEFAULT 1,
            UNIQUE(client_id, code)
        );

        CREATE TABLE IF NOT EXISTS shifts (
            shift_id                TEXT PRIMARY KEY,
            client_id               TEXT NOT NULL REFERENCES clients(client_id),
            name                    TEXT NOT NULL,
            start_local             TEXT NOT NULL,
            end_local               TEXT NOT NULL,
            scheduled_break_minutes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS employees (
            employee_id     TEXT PRIMARY KEY,
            client_id       TEXT REFERENCES clients(client_id),
            code            TEXT NOT NULL,
            name            TEXT NOT NULL,
            active          INTEGER NOT NULL,
            is_floating_pool INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS floating_assignments (
            employee_id TEXT NOT NULL REFERENCES employees(employee_id),
            client_id   TEXT NOT NULL REFERENCES clients(client_id),
            valid_from  TEXT NOT NULL,
            valid_to    TEXT,
            PRIMARY KEY (employee_id, client_id, valid_from)
        );

        CREATE TABLE IF NOT EXISTS work_orders (
            work_order_id            TEXT PRIMARY KEY,
            client_id                TEXT NOT NULL REFERENCES clients(client_id),
            style_code               TEXT NOT NULL,
            planned_qty              INTEGER NOT NULL,
            planned_ship_date        TEXT,
            required_date            TEXT,
            actual_delivery_date     TEXT,
            status                   TEXT NOT NULL,
            active_before_hold       TEXT,
            priority                 INTEGER NOT NULL,
            ideal_cycle_time_minutes REAL,
            created_at               TEXT NOT NULL,
            row_version              INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS production_entries (
            entry_id                    TEXT PRIMARY KEY,
            client_id                   TEXT NOT NULL REFERENCES clients(client_id),
            work_order_id               TEXT REFERENCES work_orders(work_order_id),
            product_id                  TEXT NOT NULL REFERENCES products(product_id),
            shift_id                    TEXT NOT NULL REFERENCES shifts(shift_id),
            production_date             TEXT NOT NULL,
            units_produced              INTEGER NOT NULL,
            run_time_hours              REAL NOT NULL,
            employees_assigned          INTEGER NOT NULL,
            defect_count                INTEGER NOT NULL,
            scrap_count                 INTEGER NOT NULL,
            actual_cycle_time_minutes   REAL,
            created_by                  TEXT NOT NULL,
            created_at                  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS downtime_entries (
            entry_id    TEXT PRIMARY KEY,
            client_id   TEXT NOT NULL REFERENCES clients(client_id),
            equipment_id TEXT NOT NULL,
            reason_code TEXT NOT NULL,
            category    TEXT NOT NULL,
            start_at    TEXT NOT NULL,
            end_at      TEXT
        );

        CREATE TABLE IF NOT EXISTS hold_entries (
            hold_id           TEXT PRIMARY KEY,
            client_id         TEXT NOT NULL REFERENCES clients(client_id),
            work_order_id     TEXT NOT NULL REFERENCES work_orders(work_order_id),
            quantity_held     INTEGER NOT NULL,
            reason            TEXT NOT NULL,
            severity          TEXT NOT NULL,
            description       TEXT NOT NULL,
            required_action   TEXT NOT NULL,
            initiated_by      TEXT NOT NULL,
            initiated_at      TEXT NOT NULL,
            resumed_at        TEXT,
            disposition       TEXT,
            released_quantity INTEGER,
            approved_by       TEXT,
            row_version       INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS attendance_entries (
            entry_id        TEXT PRIMARY KEY,
            client_id       TEXT NOT NULL REFERENCES clients(client_id),
            employee_id     TEXT NOT NULL REFERENCES employees(employee_id),
            attendance_date TEXT NOT NULL,
            shift_id        TEXT NOT NULL REFERENCES shifts(shift_id),
            status          TEXT NOT NULL,
            absence_reason  TEXT,
            is_excused      INTEGER NOT NULL,
            scheduled_hours REAL NOT NULL,
            actual_hours    REAL NOT NULL,
            clock_in        TEXT,
            clock_out       TEXT
        );

        CREATE TABLE IF NOT EXISTS defect_types (
            defect_type_id  TEXT PRIMARY KEY,
            client_id       TEXT REFERENCES clients(client_id),
            name            TEXT NOT NULL,
            category        TEXT NOT NULL,
            default_severity TEXT NOT NULL,
            active          INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS part_opportunities (
            product_id             TEXT PRIMARY KEY REFERENCES products(product_id),
            client_id               TEXT NOT NULL REFERENCES clients(client_id),
            opportunities_per_unit REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS quality_entries (
            entry_id              TEXT PRIMARY KEY,
            client_id              TEXT NOT NULL REFERENCES clients(client_id),
            work_order_id          TEXT NOT NULL REFERENCES work_orders(work_order_id),
            product_id             TEXT NOT NULL REFERENCES products(product_id),
            inspected_qty          INTEGER NOT NULL,
            defect_qty             INTEGER NOT NULL,
            rejected_qty           INTEGER NOT NULL,
            inspection_stage       TEXT NOT NULL,
            primary_defect_type_id TEXT REFERENCES defect_types(defect_type_id),
            severity               TEXT NOT NULL,
            disposition            TEXT NOT NULL,
            inspector_id           TEXT NOT NULL,
            inspected_at           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS domain_events (
            event_id       TEXT PRIMARY KEY,
            event_type     TEXT NOT NULL,
            aggregate_type TEXT NOT NULL,
            aggregate_id   TEXT NOT NULL,
            client_id      TEXT,
            occurred_at    TEXT NOT NULL,
            triggered_by   TEXT,
            payload        TEXT NOT NULL,
            critical       INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_work_orders_client ON work_orders(client_id);
        CREATE INDEX IF NOT EXISTS idx_production_client_date ON production_entries(client_id, production_date);
        CREATE INDEX IF NOT EXISTS idx_hold_entries_open ON hold_entries(client_id, work_order_id) WHERE resumed_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_quality_client ON quality_entries(client_id, work_order_id);
        "#,
    )?;
    Ok(())
}
