use crate::domain::{Employee, FloatingAssignment};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

pub struct EmployeeRepository<'c> {
    conn: &'c Connection,
}

impl<'c> EmployeeRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, employee: &Employee) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO employees (employee_id, client_id, code, name, active, is_floating_pool)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                employee.employee_id,
                employee.client_id,
                employee.code,
                employee.name,
                employee.active as i64,
                employee.is_floating_pool as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, employee_id: &str) -> DomainResult<Employee> {
        self.conn
            .query_row(
                "SELECT employee_id, client_id, code, name, active, is_floating_pool
                 FROM employees WHERE employee_id = ?1",
                params![employee_id],
                row_to_employee,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Employee".to_string(),
                id: employee_id.to_string(),
            })
    }

    pub fn add_floating_assignment(&self, assignment: &FloatingAssignment) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO floating_assignments (employee_id, client_id, valid_from, valid_to)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                assignment.employee_id,
                assignment.client_id,
                assignment.valid_from.to_rfc3339(),
                assignment.valid_to.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Resolves which client an employee is assigned to at `at`, following
    /// the floating pool lookup of spec §3/§9.
    pub fn active_assignment(
        &self,
        employee_id: &str,
        at: DateTime<Utc>,
    ) -> DomainResult<Option<FloatingAssignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT employee_id, client_id, valid_from, valid_to
             FROM floating_assignments WHERE employee_id = ?1",
        )?;
        let rows = stmt.query_map(params![employee_id], row_to_assignment)?;
        for row in rows {
            let assignment = row?;
            if assignment.covers(at) {
                return Ok(Some(assignment));
            }
        }
        Ok(None)
    }
}

fn row_to_employee(row: &rusqlite::Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        employee_id: row.get(0)?,
        client_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
        is_floating_pool: row.get::<_, i64>(5)? != 0,
    })
}

fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<FloatingAssignment> {
    let valid_from: String = row.get(2)?;
    let valid_to: Option<String> = row.get(3)?;
    Ok(FloatingAssignment {
        employee_id: row.get(0)?,
        client_id: row.get(1)?,
        valid_from: DateTime::parse_from_rfc3339(&valid_from)
            .unwrap()
            .with_timezone(&Utc),
        valid_to: valid_to.map(|s| DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc)),
    })
}
