use crate::domain::{Client, Product, Role, Shift, User};
use crate::error::{DomainError, DomainResult};
use chrono::{DateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::str::FromStr;

pub struct ClientRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ClientRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, client: &Client) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO clients (client_id, display_name, timezone, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                client.client_id,
                client.display_name,
                client.timezone,
                client.active as i64,
                client.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, client_id: &str) -> DomainResult<Client> {
        self.conn
            .query_row(
                "SELECT client_id, display_name, timezone, active, created_at
                 FROM clients WHERE client_id = ?1",
                params![client_id],
                row_to_client,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Client".to_string(),
                id: client_id.to_string(),
            })
    }

    pub fn list(&self) -> DomainResult<Vec<Client>> {
        let mut stmt = self.conn.prepare(
            "SELECT client_id, display_name, timezone, active, created_at FROM clients",
        )?;
        let rows = stmt.query_map([], row_to_client)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

fn row_to_client(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    let created_at: String = row.get(4)?;
    Ok(Client {
        client_id: row.get(0)?,
        display_name: row.get(1)?,
        timezone: row.get(2)?,
        active: row.get::<_, i64>(3)? != 0,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .unwrap()
            .with_timezone(&Utc),
    })
}

pub struct UserRepository<'c> {
    conn: &'c Connection,
}

impl<'c> UserRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, user: &User) -> DomainResult<()> {
        let assigned: Vec<&str> = user.assigned_client_ids.iter().map(|s| s.as_str()).collect();
        self.conn.execute(
            "INSERT INTO users (user_id, display_name, password_hash, role, assigned_client_ids, created_at, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.user_id,
                user.display_name,
                user.password_hash,
                format!("{:?}", user.role),
                serde_json::to_string(&assigned).unwrap(),
                user.created_at.to_rfc3339(),
                user.active as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> DomainResult<User> {
        self.conn
            .query_row(
                "SELECT user_id, display_name, password_hash, role, assigned_client_ids, created_at, active
                 FROM users WHERE user_id = ?1",
                params![user_id],
                row_to_user,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "User".to_string(),
                id: user_id.to_string(),
            })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    let assigned_json: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let assigned: Vec<String> = serde_json::from_str(&assigned_json).unwrap_or_default();
    Ok(User {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        password_hash: row.get(2)?,
        role: Role::from_str(&role_str.to_uppercase()).unwrap_or(Role::Viewer),
        assigned_client_ids: assigned.into_iter().collect::<HashSet<_>>(),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .unwrap()
            .with_timezone(&Utc),
        active: row.get::<_, i64>(6)? != 0,
    })
}

pub struct ProductRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, product: &Product) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO products (product_id, client_id, code, description, ideal_cycle_time_minutes, row_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                product.product_id,
                product.client_id,
                product.code,
                product.description,
                product.ideal_cycle_time_minutes,
                product.row_version,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, product_id: &str) -> DomainResult<Product> {
        self.conn
            .query_row(
                "SELECT product_id, client_id, code, description, ideal_cycle_time_minutes, row_version
                 FROM products WHERE product_id = ?1",
                params![product_id],
                row_to_product,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Product".to_string(),
                id: product_id.to_string(),
            })
    }

    pub fn find_by_code(&self, client_id: &str, code: &str) -> DomainResult<Option<Product>> {
        Ok(self
            .conn
            .query_row(
                "SELECT product_id, client_id, code, description, ideal_cycle_time_minutes, row_version
                 FROM products WHERE client_id = ?1 AND code = ?2",
                params![client_id, code],
                row_to_product,
            )
            .optional()?)
    }
}

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        product_id: row.get(0)?,
        client_id: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        ideal_cycle_time_minutes: row.get(4)?,
        row_version: row.get(5)?,
    })
}

pub struct ShiftRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ShiftRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, shift: &Shift) -> DomainResult<()> {
        self.conn.execute(
            "INSERT INTO shifts (shift_id, client_id, name, start_local, end_local, scheduled_break_minutes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                shift.shift_id,
                shift.client_id,
                shift.name,
                shift.start_local.to_string(),
                shift.end_local.to_string(),
                shift.scheduled_break_minutes,
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, shift_id: &str) -> DomainResult<Shift> {
        self.conn
            .query_row(
                "SELECT shift_id, client_id, name, start_local, end_local, scheduled_break_minutes
                 FROM shifts WHERE shift_id = ?1",
                params![shift_id],
                row_to_shift,
            )
            .optional()?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Shift".to_string(),
                id: shift_id.to_string(),
            })
    }
}

fn row_to_shift(row: &rusqlite::Row<'_>) -> rusqlite::Result<Shift> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    Ok(Shift {
        shift_id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        start_local: NaiveTime::parse_from_str(&start, "%H:%M:%S").unwrap(),
        end_local: NaiveTime::parse_from_str(&end, "%H:%M:%S").unwrap(),
        scheduled_break_minutes: row.get(5)?,
    })
}
