use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::helpers::time;
use crate::models::record::StoredRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonthlySummary {
    pub total_minutes: u64,
    pub total_deduction: Decimal,
    pub record_count: usize,
}

impl MonthlySummary {
    pub fn total_label(&self) -> String {
        time::format_duration(self.total_minutes)
    }

    pub fn deduction_label(&self) -> String {
        time::format_money(self.total_deduction)
    }
}

/// Reads a month or year cell. Sheets hand numbers back as "3", "03" or "3.0".
fn normalize_period(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let n: f64 = value.parse().ok()?;
    (n.is_finite() && n.fract() == 0.0).then_some(n as i64)
}

/// Month and year of a row, falling back to its date text when the
/// denormalized cells are blank or unreadable.
pub fn record_period(record: &StoredRecord) -> Option<(u32, i32)> {
    let month = normalize_period(&record.month);
    let year = normalize_period(&record.year);
    match (month, year) {
        (Some(month), Some(year)) => Some((u32::try_from(month).ok()?, i32::try_from(year).ok()?)),
        _ => record.parsed_date().map(|date| (date.month(), date.year())),
    }
}

pub fn belongs_to(record: &StoredRecord, month: u32, year: i32) -> bool {
    record_period(record) == Some((month, year))
}

/// Worked minutes of a row; zero when neither the minute count nor the label
/// can be read, or when the value is longer than a day.
pub fn record_minutes(record: &StoredRecord) -> u64 {
    record
        .minutes
        .trim()
        .parse::<u64>()
        .ok()
        .or_else(|| time::parse_duration_label(&record.worked))
        .filter(|minutes| *minutes <= time::MINUTES_PER_DAY)
        .unwrap_or(0)
}

/// Deduction of a row; blanks, the "Sem desconto" sentinel and other
/// non-numeric text count as zero.
pub fn record_deduction(record: &StoredRecord) -> Decimal {
    record
        .deduction
        .trim()
        .replace(',', ".")
        .parse::<Decimal>()
        .unwrap_or(Decimal::ZERO)
}

pub fn aggregate(records: &[StoredRecord], month: u32, year: i32) -> MonthlySummary {
    records
        .iter()
        .filter(|record| belongs_to(record, month, year))
        .fold(MonthlySummary::default(), |mut summary, record| {
            summary.total_minutes = summary.total_minutes.saturating_add(record_minutes(record));
            match summary.total_deduction.checked_add(record_deduction(record)) {
                Some(total) => summary.total_deduction = total,
                None => warn!(
                    "Ignoring deduction '{}' of {}: total would overflow",
                    record.deduction, record.date
                ),
            }
            summary.record_count += 1;
            summary
        })
}

/// Rows of one month, sorted by date ascending. Rows whose date cannot be
/// read keep their relative order at the end.
pub fn month_records(records: &[StoredRecord], month: u32, year: i32) -> Vec<StoredRecord> {
    let mut selected: Vec<StoredRecord> = records
        .iter()
        .filter(|record| belongs_to(record, month, year))
        .cloned()
        .collect();
    selected.sort_by_key(|record| (record.parsed_date().is_none(), record.parsed_date()));
    selected
}
