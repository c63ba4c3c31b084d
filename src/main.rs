//! CLI entry point (spec §6). Thin invoker: parses argv, calls into
//! `shopfloor_core`'s facade, prints JSON, and maps `DomainError` kinds
//! onto the exit codes in spec §6.

mod cli;

use clap::Parser;
use cli::{CapacityAction, Cli, Command};
use shopfloor_core::capacity::{check_components, Workbook};
use shopfloor_core::config::Settings;
use shopfloor_core::domain::{HoldDisposition, HoldSeverity, WorkOrderStatus};
use shopfloor_core::error::{DomainError, DomainResult, ErrorKind};
use shopfloor_core::event_bus::EventBusBuilder;
use shopfloor_core::facade::{bootstrap, FacadeHandles};
use shopfloor_core::forecast::forecast_auto;
use shopfloor_core::ingestion::{commit_production_rows, parse_and_validate, ProductionEntryRow};
use shopfloor_core::tenant::{Actor, TenantContext};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A CLI-only identity stand-in for the actor that a real transport would
/// attach from session claims (spec §1 excludes session machinery itself).
fn cli_actor(client_id: &str) -> Actor {
    Actor {
        user_id: "cli".to_string(),
        role: shopfloor_core::domain::Role::Admin,
        allowed_client_ids: std::iter::once(client_id.to_string()).collect(),
    }
}

fn exit_code_for(err: &DomainError) -> i32 {
    match err.kind() {
        ErrorKind::Unauthenticated | ErrorKind::Forbidden => 2,
        ErrorKind::Validation | ErrorKind::InvalidTransition => 3,
        ErrorKind::Conflict | ErrorKind::Stale | ErrorKind::DependentRows => 4,
        ErrorKind::NotFound | ErrorKind::Infra => 5,
        ErrorKind::Internal => 10,
    }
}

fn fail(err: DomainError) -> ! {
    let code = exit_code_for(&err);
    eprintln!("error: {err}");
    std::process::exit(code);
}

/// Capacity workbooks are their own per-tenant JSON document (spec §4.9
/// treats the workbook as a spreadsheet-like unit, not a normalized table
/// set) rather than a row in the relational schema the rest of the domain
/// uses.
fn workbook_dir() -> PathBuf {
    std::env::var("CAPACITY_WORKBOOK_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./capacity-workbooks"))
}

fn load_workbook(client_id: &str, history_limit: usize) -> DomainResult<Workbook> {
    let path = workbook_dir().join(format!("{client_id}.json"));
    if !path.exists() {
        return Ok(Workbook::new(client_id, history_limit));
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| DomainError::Infra {
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| DomainError::Infra {
        message: e.to_string(),
    })
}

fn save_workbook(wb: &Workbook) -> DomainResult<()> {
    let dir = workbook_dir();
    std::fs::create_dir_all(&dir).map_err(|e| DomainError::Infra {
        message: e.to_string(),
    })?;
    let path = dir.join(format!("{}.json", wb.client_id));
    let raw = serde_json::to_string_pretty(wb).map_err(|e| DomainError::Infra {
        message: e.to_string(),
    })?;
    std::fs::write(path, raw).map_err(|e| DomainError::Infra {
        message: e.to_string(),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("usage error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(db) = &cli.db {
        settings = Settings::for_db(db.clone());
    }

    let builder = EventBusBuilder::new(settings.event_worker_pool_size, settings.event_queue_size);
    let FacadeHandles {
        facade,
        event_bus_workers: _workers,
    } = match bootstrap(&settings, builder) {
        Ok(h) => h,
        Err(e) => fail(e),
    };

    let result: DomainResult<serde_json::Value> = match cli.command {
        Command::Login { username, password } => {
            facade.login(&username, &password).map(|actor| {
                serde_json::json!({ "user_id": actor.user_id, "role": format!("{:?}", actor.role) })
            })
        }

        Command::Ingest {
            kind,
            path,
            client_id,
            dry_run,
        } => run_ingest(&facade, &kind, &path, &client_id, dry_run).await,

        Command::QueryKpi {
            client_id,
            kpi,
            window,
        } => run_query_kpi(&facade, &client_id, &kpi, &window).await,

        Command::Transition {
            work_order_ids,
            to,
            note: _,
        } => run_transition(&facade, work_order_ids, &to).await,

        Command::Hold {
            work_order_id,
            reason,
            severity,
            description,
            required_action,
            quantity_held,
        } => {
            run_hold(
                &facade,
                &work_order_id,
                quantity_held,
                &reason,
                &severity,
                &description,
                &required_action,
            )
            .await
        }

        Command::Resume {
            hold_id,
            disposition,
            released_quantity,
        } => run_resume(&facade, &hold_id, &disposition, released_quantity).await,

        Command::Capacity { action } => run_capacity(&settings, action),

        Command::Forecast {
            client_id,
            kpi,
            historical_days,
            forecast_days,
        } => run_forecast(&facade, &client_id, &kpi, historical_days, forecast_days).await,

        Command::Report {
            client_id,
            kind,
            window,
        } => Ok(serde_json::json!({
            "client_id": client_id,
            "kind": kind,
            "window": window,
            "note": "rendering is delegated to a ReportRenderer implementation",
        })),
    };

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap());
            std::process::exit(0);
        }
        Err(e) => fail(e),
    }
}

async fn run_ingest(
    facade: &shopfloor_core::facade::ServiceFacade,
    kind: &str,
    path: &str,
    client_id: &str,
    dry_run: bool,
) -> DomainResult<serde_json::Value> {
    if kind != "production" {
        return Err(DomainError::Validation {
            field: "kind".to_string(),
            reason: format!("unsupported ingest kind: {kind}"),
        });
    }
    let file = std::fs::File::open(Path::new(path)).map_err(|e| DomainError::Validation {
        field: "path".to_string(),
        reason: e.to_string(),
    })?;
    let reader = csv::Reader::from_reader(file);
    let (rows, errors, total): (Vec<ProductionEntryRow>, Vec<_>, usize) =
        parse_and_validate(reader)?;

    if dry_run {
        return Ok(serde_json::json!({
            "total": total,
            "valid": rows.len(),
            "invalid": errors.len(),
            "errors": errors,
        }));
    }

    let client_id = client_id.to_string();
    let inserted = facade
        .execute(move |uow| {
            let ctx = TenantContext::resolve(cli_actor(&client_id), Some(client_id.clone()))?;
            commit_production_rows(uow, &ctx, rows)
        })
        .await?;

    Ok(serde_json::json!({ "inserted": inserted }))
}

/// Parses the CLI's `<from>..<to>` window argument into a date range.
fn parse_window(window: &str) -> DomainResult<(chrono::NaiveDate, chrono::NaiveDate)> {
    let (from, to) = window.split_once("..").ok_or_else(|| DomainError::Validation {
        field: "window".to_string(),
        reason: format!("expected <from>..<to>, got: {window}"),
    })?;
    let parse = |s: &str| {
        chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| DomainError::Validation {
            field: "window".to_string(),
            reason: e.to_string(),
        })
    };
    Ok((parse(from)?, parse(to)?))
}

async fn run_query_kpi(
    facade: &shopfloor_core::facade::ServiceFacade,
    client_id: &str,
    kpi: &str,
    window: &str,
) -> DomainResult<serde_json::Value> {
    let (from, to) = parse_window(window)?;
    let client_id = client_id.to_string();

    match kpi {
        "ppm" => {
            let (client_id, from, to) = (client_id.clone(), from, to);
            facade
                .query(move |conn| {
                    let entries = shopfloor_core::repository::ProductionRepository::new(conn)
                        .list_for_client_between(&client_id, from, to)?;
                    let total_defects: i64 = entries.iter().map(|e| e.defect_count).sum();
                    let total_units: i64 = entries.iter().map(|e| e.units_produced).sum();
                    let value = shopfloor_core::kpi::ppm(total_defects, total_units);
                    Ok(serde_json::to_value(value).unwrap())
                })
        }
        "efficiency" => {
            facade
                .execute(move |uow| {
                    let entries = uow
                        .production()
                        .list_for_client_between(&client_id, from, to)?;
                    let mut inputs = Vec::with_capacity(entries.len());
                    let mut run_time_hours_total = 0.0;
                    for entry in &entries {
                        let cycle = shopfloor_core::kpi::resolve_cycle_time(
                            uow,
                            &client_id,
                            &entry.product_id,
                            entry.work_order_id.as_deref(),
                            entry.production_date,
                        )?;
                        inputs.push(shopfloor_core::kpi::EfficiencyInput {
                            units_produced: entry.units_produced,
                            ideal_cycle_time_minutes: cycle.minutes,
                        });
                        run_time_hours_total += entry.run_time_hours;
                    }
                    let value = shopfloor_core::kpi::efficiency(&inputs, run_time_hours_total, 0.0);
                    Ok(serde_json::to_value(value).unwrap())
                })
                .await
        }
        other => Err(DomainError::Validation {
            field: "kpi".to_string(),
            reason: format!("unsupported kpi for CLI query: {other}"),
        }),
    }
}

async fn run_forecast(
    facade: &shopfloor_core::facade::ServiceFacade,
    client_id: &str,
    kpi: &str,
    historical_days: u32,
    forecast_days: u32,
) -> DomainResult<serde_json::Value> {
    if kpi != "units_produced" {
        return Err(DomainError::Validation {
            field: "kpi".to_string(),
            reason: format!("unsupported kpi for forecasting: {kpi}"),
        });
    }
    let to = chrono::Utc::now().date_naive();
    let from = to - chrono::Duration::days(historical_days as i64);
    let client_id = client_id.to_string();

    let history = facade
        .query(move |conn| {
            let entries = shopfloor_core::repository::ProductionRepository::new(conn)
                .list_for_client_between(&client_id, from, to)?;
            let mut by_day: std::collections::BTreeMap<chrono::NaiveDate, f64> =
                std::collections::BTreeMap::new();
            for entry in entries {
                *by_day.entry(entry.production_date).or_insert(0.0) += entry.units_produced as f64;
            }
            Ok(by_day.into_values().collect::<Vec<f64>>())
        })?;

    let result = forecast_auto(&history, forecast_days as usize);
    Ok(serde_json::to_value(result).map_err(|e| DomainError::internal(e.to_string()))?)
}

async fn run_transition(
    facade: &shopfloor_core::facade::ServiceFacade,
    work_order_ids: Vec<String>,
    to: &str,
) -> DomainResult<serde_json::Value> {
    let to_status = WorkOrderStatus::from_str(&to.to_ascii_uppercase()).map_err(|reason| {
        DomainError::Validation {
            field: "to".to_string(),
            reason,
        }
    })?;
    let to = to_status;
    let result = facade
        .execute(move |uow| {
            let actor = cli_actor("*");
            let ctx = TenantContext::resolve(actor, None)?;
            shopfloor_core::workflow::transition_bulk(uow, &ctx, &work_order_ids, to, "cli")
        })
        .await?;
    Ok(serde_json::to_value(result).unwrap())
}

#[allow(clippy::too_many_arguments)]
async fn run_hold(
    facade: &shopfloor_core::facade::ServiceFacade,
    work_order_id: &str,
    quantity_held: i64,
    reason: &str,
    severity: &str,
    description: &str,
    required_action: &str,
) -> DomainResult<serde_json::Value> {
    let severity = match severity.to_ascii_uppercase().as_str() {
        "CRITICAL" => HoldSeverity::Critical,
        "HIGH" => HoldSeverity::High,
        "MEDIUM" => HoldSeverity::Medium,
        "LOW" => HoldSeverity::Low,
        other => {
            return Err(DomainError::Validation {
                field: "severity".to_string(),
                reason: format!("unknown severity: {other}"),
            })
        }
    };
    let work_order_id = work_order_id.to_string();
    let reason = reason.to_string();
    let description = description.to_string();
    let required_action = required_action.to_string();
    let hold = facade
        .execute(move |uow| {
            let ctx = TenantContext::resolve(cli_actor("*"), None)?;
            shopfloor_core::hold::create_hold(
                uow,
                &ctx,
                &work_order_id,
                quantity_held,
                &reason,
                severity,
                &description,
                &required_action,
                "cli",
            )
        })
        .await?;
    Ok(serde_json::to_value(hold).map_err(|e| DomainError::internal(e.to_string()))?)
}

async fn run_resume(
    facade: &shopfloor_core::facade::ServiceFacade,
    hold_id: &str,
    disposition: &str,
    released_quantity: i64,
) -> DomainResult<serde_json::Value> {
    let disposition = match disposition.to_ascii_uppercase().as_str() {
        "RELEASE" => HoldDisposition::Release,
        "REWORK" => HoldDisposition::Rework,
        "SCRAP" => HoldDisposition::Scrap,
        "RTS" => HoldDisposition::Rts,
        "USE_AS_IS" => HoldDisposition::UseAsIs,
        other => {
            return Err(DomainError::Validation {
                field: "disposition".to_string(),
                reason: format!("unknown disposition: {other}"),
            })
        }
    };
    let hold_id = hold_id.to_string();
    let hold = facade
        .execute_idempotent(move |uow| {
            let ctx = TenantContext::resolve(cli_actor("*"), None)?;
            shopfloor_core::hold::resume_hold(
                uow,
                &ctx,
                &hold_id,
                disposition,
                released_quantity,
                "cli",
            )
        })
        .await?;
    Ok(serde_json::to_value(hold).map_err(|e| DomainError::internal(e.to_string()))?)
}

fn run_capacity(settings: &Settings, action: CapacityAction) -> DomainResult<serde_json::Value> {
    match action {
        CapacityAction::RunComponentCheck { client_id } => {
            let wb = load_workbook(&client_id, settings.capacity_history_limit)?;
            let rows = check_components(&wb.orders, &wb.bom, &wb.stock_snapshot);
            Ok(serde_json::to_value(rows).unwrap())
        }
        CapacityAction::RunAnalysis { client_id } => {
            let wb = load_workbook(&client_id, settings.capacity_history_limit)?;
            let rows = shopfloor_core::capacity::analyze_capacity(
                &wb.master_calendar,
                &wb.production_lines,
                &wb.production_standards,
                &wb.orders,
            );
            Ok(serde_json::to_value(rows).unwrap())
        }
        CapacityAction::RunScenario {
            client_id,
            scenario_id,
        } => {
            let wb = load_workbook(&client_id, settings.capacity_history_limit)?;
            let scenario = wb
                .what_if_scenarios
                .iter()
                .find(|s| s.id == scenario_id)
                .ok_or_else(|| DomainError::NotFound {
                    entity: "Scenario".to_string(),
                    id: scenario_id.clone(),
                })?;
            let delta = shopfloor_core::capacity::run_scenario(&wb, scenario);
            Ok(serde_json::to_value(delta).unwrap())
        }
    }
}

