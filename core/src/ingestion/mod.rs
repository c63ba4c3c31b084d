//! CSV ingestion pipeline (C4, spec §4.4).
//!
//! Two-phase: `dry_run` parses and validates without touching storage;
//! `commit` re-validates (state may have moved between the two calls) and
//! writes everything in one unit of work. No partial commits.

mod production_rows;

pub use production_rows::ProductionEntryRow;

use crate::domain::EventKind;
use crate::error::{DomainError, DomainResult};
use crate::repository::UnitOfWork;
use crate::tenant::TenantContext;
use serde::Serialize;

/// Per-row failure recorded during parse/validate, capped at 100 entries
/// per spec §4.4 step 5 (counting continues past the cap).
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row_index: usize,
    pub reason: String,
    pub raw_row: String,
}

const MAX_REPORTED_ERRORS: usize = 100;

#[derive(Debug, Serialize)]
pub struct ReadBackSummary<T> {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub sample_preview: Vec<T>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Serialize)]
pub struct CommitReceipt {
    pub inserted: usize,
    pub events_emitted: usize,
}

/// Implemented once per ingestible entity kind (spec §9's redesign flag:
/// typed row variants, not a generic dict).
pub trait IngestRow: Sized {
    fn parse_record(
        headers: &[String],
        record: &csv::StringRecord,
    ) -> Result<Self, String>;

    /// Natural key used for within-batch idempotency (spec §4.4's
    /// idempotency clause), `None` when the entity has none.
    fn natural_key(&self) -> Option<String>;
}

/// Parses `reader` into typed rows plus a capped error list. Does not
/// touch the repository layer — this is the dry-run half of spec §4.4.
pub fn parse_and_validate<R: IngestRow + Clone>(
    mut reader: csv::Reader<impl std::io::Read>,
) -> DomainResult<(Vec<R>, Vec<RowError>, usize)> {
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DomainError::Validation {
            field: "header".to_string(),
            reason: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase().replace(' ', "_"))
        .collect();

    let mut valid = Vec::new();
    let mut errors = Vec::new();
    let mut total = 0usize;
    let mut seen_keys = std::collections::HashSet::new();

    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                total += 1;
                push_error(&mut errors, idx, e.to_string(), String::new());
                continue;
            }
        };
        if record.iter().all(|f| f.trim().is_empty()) {
            continue; // trailing blank row, not counted
        }
        total += 1;
        let raw_row = record.iter().collect::<Vec<_>>().join(",");

        match R::parse_record(&headers, &record) {
            Ok(row) => {
                if let Some(key) = row.natural_key() {
                    if !seen_keys.insert(key.clone()) {
                        push_error(
                            &mut errors,
                            idx,
                            format!("duplicate natural key within batch: {key}"),
                            raw_row,
                        );
                        continue;
                    }
                }
                valid.push(row);
            }
            Err(reason) => push_error(&mut errors, idx, reason, raw_row),
        }
    }

    Ok((valid, errors, total))
}

fn push_error(errors: &mut Vec<RowError>, row_index: usize, reason: String, raw_row: String) {
    if errors.len() < MAX_REPORTED_ERRORS {
        errors.push(RowError {
            row_index,
            reason,
            raw_row,
        });
    }
}

/// Commits a previously validated batch of production entries inside one
/// unit of work, emitting one `ProductionEntryCreated` event per row
/// (spec §4.4 step 7). Caller supplies the already-open `UnitOfWork`.
pub fn commit_production_rows(
    uow: &mut UnitOfWork,
    ctx: &TenantContext,
    rows: Vec<ProductionEntryRow>,
) -> DomainResult<usize> {
    let client_id = ctx.write_client_id()?;
    let repo = uow.production();
    let mut inserted = 0;
    for row in rows {
        let entry = row.into_entry(&client_id)?;
        repo.insert(&entry)?;
        let event = EventKind::ProductionEntryCreated {
            entry_id: entry.entry_id.clone(),
            key_metrics: serde_json::json!({
                "units_produced": entry.units_produced,
                "defect_count": entry.defect_count,
            }),
        }
        .into_event(Some(client_id.clone()), None);
        uow.stage_event(event);
        inserted += 1;
    }
    Ok(inserted)
}
