//! Command-line surface over the service facade (spec §6).
//!
//! Each subcommand is a thin translation from argv to one facade call;
//! no domain logic lives here.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "shopfloor", version, about = "Multi-tenant manufacturing KPI platform")]
pub struct Cli {
    /// Overrides DB_URL for this invocation.
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Authenticates a username/password pair (rate-limited).
    Login {
        username: String,
        password: String,
    },

    /// Parses and validates a CSV stream without writing to storage.
    Ingest {
        /// One of: production
        kind: String,
        path: String,
        #[arg(long)]
        client_id: String,
        #[arg(long, default_value_t = true)]
        dry_run: bool,
    },

    /// Reads a single KPI value for a client/window.
    QueryKpi {
        client_id: String,
        kpi: String,
        window: String,
    },

    /// Moves one or more work orders to a new status.
    Transition {
        #[arg(long, value_delimiter = ',')]
        work_order_ids: Vec<String>,
        #[arg(long)]
        to: String,
        #[arg(long, default_value = "")]
        note: String,
    },

    /// Places a work order on hold.
    Hold {
        work_order_id: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        severity: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        required_action: String,
        #[arg(long)]
        quantity_held: i64,
    },

    /// Resumes a hold with a disposition.
    Resume {
        hold_id: String,
        #[arg(long)]
        disposition: String,
        #[arg(long)]
        released_quantity: i64,
    },

    /// Capacity-planning operations.
    Capacity {
        #[command(subcommand)]
        action: CapacityAction,
    },

    /// Forecasts a KPI's near-term trajectory.
    Forecast {
        client_id: String,
        kpi: String,
        #[arg(long, default_value_t = 14)]
        historical_days: u32,
        #[arg(long, default_value_t = 14)]
        forecast_days: u32,
    },

    /// Assembles a report payload (rendering is delegated).
    Report {
        client_id: String,
        kind: String,
        window: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CapacityAction {
    RunComponentCheck { client_id: String },
    RunAnalysis { client_id: String },
    RunScenario { client_id: String, scenario_id: String },
}
