use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    PowerUser,
    Leader,
    Operator,
    Viewer,
}

impl Role {
    /// ADMIN and POWER_USER bypass the isolation predicate (spec §4.1);
    /// writes still must target a concrete `client_id`.
    pub fn bypasses_isolation(&self) -> bool {
        matches!(self, Role::Admin | Role::PowerUser)
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "POWER_USER" => Ok(Role::PowerUser),
            "LEADER" => Ok(Role::Leader),
            "OPERATOR" => Ok(Role::Operator),
            "VIEWER" => Ok(Role::Viewer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub display_name: String,
    pub timezone: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub assigned_client_ids: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub client_id: String,
    pub code: String,
    pub description: String,
    pub ideal_cycle_time_minutes: Option<f64>,
    pub row_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub shift_id: String,
    pub client_id: String,
    pub name: String,
    pub start_local: NaiveTime,
    pub end_local: NaiveTime,
    pub scheduled_break_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    /// `None` when the employee is part of the floating pool (spec §3, §9).
    pub client_id: Option<String>,
    pub code: String,
    pub name: String,
    pub active: bool,
    pub is_floating_pool: bool,
}

/// A time-scoped capability grant for a floating-pool employee against one
/// client, resolving the open question in spec §9: floating membership is
/// never global, only a bounded assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingAssignment {
    pub employee_id: String,
    pub client_id: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
}

impl FloatingAssignment {
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_to.map(|end| at <= end).unwrap_or(true)
    }
}
