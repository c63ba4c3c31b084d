use super::IngestRow;
use crate::domain::ProductionEntry;
use crate::error::DomainResult;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// One CSV row bound to `ProductionEntry` fields (spec §4.4 step 2-3).
/// `work_order_id` and `created_by` are supplied by the caller at commit
/// time, not read from the sheet.
#[derive(Debug, Clone)]
pub struct ProductionEntryRow {
    pub work_order_id: Option<String>,
    pub product_id: String,
    pub shift_id: String,
    pub production_date: NaiveDate,
    pub units_produced: i64,
    pub run_time_hours: f64,
    pub employees_assigned: i64,
    pub defect_count: i64,
    pub scrap_count: i64,
}

impl ProductionEntryRow {
    pub fn into_entry(self, client_id: &str) -> DomainResult<ProductionEntry> {
        Ok(ProductionEntry {
            entry_id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            work_order_id: self.work_order_id,
            product_id: self.product_id,
            shift_id: self.shift_id,
            production_date: self.production_date,
            units_produced: self.units_produced,
            run_time_hours: self.run_time_hours,
            employees_assigned: self.employees_assigned,
            defect_count: self.defect_count,
            scrap_count: self.scrap_count,
            actual_cycle_time_minutes: None,
            created_by: "ingest".to_string(),
            created_at: Utc::now(),
        })
    }
}

fn field<'a>(headers: &[String], record: &'a csv::StringRecord, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .position(|h| h == name)
        .and_then(|i| record.get(i))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn required<'a>(
    headers: &[String],
    record: &'a csv::StringRecord,
    name: &str,
) -> Result<&'a str, String> {
    field(headers, record, name).ok_or_else(|| format!("missing required column: {name}"))
}

/// Parses `YYYY-MM-DD`, or `DD/MM/YYYY`/`MM/DD/YYYY` disambiguated by which
/// side exceeds 12 (spec §4.4 step 3, §6).
fn parse_flexible_date(raw: &str) -> Result<NaiveDate, String> {
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(d);
    }
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 {
        return Err(format!("unrecognized date format: {raw}"));
    }
    let (a, b, y) = (
        parts[0].parse::<u32>().map_err(|_| "bad date".to_string())?,
        parts[1].parse::<u32>().map_err(|_| "bad date".to_string())?,
        parts[2].parse::<i32>().map_err(|_| "bad date".to_string())?,
    );
    let (day, month) = if a > 12 {
        (a, b) // DD/MM/YYYY
    } else if b > 12 {
        (b, a) // MM/DD/YYYY
    } else {
        (a, b) // ambiguous; treat as DD/MM/YYYY (ISO-adjacent default)
    };
    NaiveDate::from_ymd_opt(y, month, day).ok_or_else(|| format!("invalid date: {raw}"))
}

fn parse_decimal(raw: &str) -> Result<f64, String> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| format!("not a decimal: {raw}"))
}

fn parse_int(raw: &str) -> Result<i64, String> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<i64>()
        .map_err(|_| format!("not an integer: {raw}"))
}

impl IngestRow for ProductionEntryRow {
    fn parse_record(headers: &[String], record: &csv::StringRecord) -> Result<Self, String> {
        let product_id = required(headers, record, "product_id")?.to_string();
        let shift_id = required(headers, record, "shift_id")?.to_string();
        let production_date = parse_flexible_date(required(headers, record, "production_date")?)?;
        let units_produced = parse_int(required(headers, record, "units_produced")?)?;
        let run_time_hours = parse_decimal(required(headers, record, "run_time_hours")?)?;
        if !(run_time_hours > 0.0 && run_time_hours <= 24.0) {
            return Err(format!(
                "run_time_hours out of range (0, 24]: {run_time_hours}"
            ));
        }
        let employees_assigned = field(headers, record, "employees_assigned")
            .map(parse_int)
            .transpose()?
            .unwrap_or(1);
        let defect_count = field(headers, record, "defect_count")
            .map(parse_int)
            .transpose()?
            .unwrap_or(0);
        let scrap_count = field(headers, record, "scrap_count")
            .map(parse_int)
            .transpose()?
            .unwrap_or(0);
        let work_order_id = field(headers, record, "work_order_id").map(|s| s.to_string());

        Ok(ProductionEntryRow {
            work_order_id,
            product_id,
            shift_id,
            production_date,
            units_produced,
            run_time_hours,
            employees_assigned,
            defect_count,
            scrap_count,
        })
    }

    fn natural_key(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec![
            "product_id",
            "shift_id",
            "production_date",
            "units_produced",
            "run_time_hours",
            "employees_assigned",
            "defect_count",
            "scrap_count",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    #[test]
    fn parses_iso_date_row() {
        let headers = headers();
        let record = csv::StringRecord::from(vec![
            "P1", "S1", "2026-01-15", "480", "8.0", "4", "5", "2",
        ]);
        let row = ProductionEntryRow::parse_record(&headers, &record).unwrap();
        assert_eq!(row.units_produced, 480);
        assert_eq!(row.production_date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
    }

    #[test]
    fn rejects_run_time_out_of_range() {
        let headers = headers();
        let record = csv::StringRecord::from(vec![
            "P1", "S1", "2026-01-15", "480", "25.0", "4", "5", "2",
        ]);
        assert!(ProductionEntryRow::parse_record(&headers, &record).is_err());
    }

    #[test]
    fn disambiguates_dmy_over_12() {
        assert_eq!(
            parse_flexible_date("25/03/2026").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 25).unwrap()
        );
    }
}
