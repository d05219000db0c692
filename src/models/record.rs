use chrono::{Datelike, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::helpers::{
    calendar::{self, HolidayCalendar},
    time::{self, TimeError, WorkRules},
};

pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Sheet columns, in the order they are written.
pub const COLUMNS: [&str; 11] = [
    "Data",
    "Dia da Semana",
    "Entrada",
    "Saída",
    "Horas Trabalhadas",
    "Minutos",
    "Atraso",
    "Desconto",
    "Notas",
    "Mês",
    "Ano",
];

/// A day as typed in by the user, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInput {
    pub date: NaiveDate,
    pub entry: String,
    pub exit: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// A validated attendance entry with every derived field filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub entry: NaiveTime,
    /// Effective exit, after the optional cap.
    pub exit: NaiveTime,
    pub worked_minutes: u32,
    pub lateness_minutes: u32,
    pub deduction: Decimal,
    pub note: String,
    pub month: u32,
    pub year: i32,
}

impl DailyRecord {
    /// Validates the input against the rules and derives duration, lateness,
    /// deduction and the holiday note. Nothing is built for invalid input.
    pub fn build(
        input: &RecordInput,
        rules: &WorkRules,
        holidays: &HolidayCalendar,
    ) -> Result<Self, TimeError> {
        let worked = rules.worked_duration(&input.entry, &input.exit)?;
        let lateness = rules.lateness(worked.entry);

        let note = match input.note.as_deref().map(str::trim) {
            Some(note) if !note.is_empty() => note.to_string(),
            _ => holidays
                .holiday_on(input.date)
                .map(str::to_string)
                .unwrap_or_default(),
        };

        Ok(Self {
            date: input.date,
            weekday: calendar::weekday_name(input.date),
            entry: worked.entry,
            exit: worked.effective_exit,
            worked_minutes: worked.minutes,
            lateness_minutes: lateness.minutes,
            deduction: lateness.deduction,
            note,
            month: input.date.month(),
            year: input.date.year(),
        })
    }

    pub fn worked_label(&self) -> String {
        time::format_duration(u64::from(self.worked_minutes))
    }

    pub fn lateness(&self) -> time::Lateness {
        time::Lateness {
            minutes: self.lateness_minutes,
            deduction: self.deduction,
        }
    }
}

/// The textual row kept in the store.
///
/// Fields stay as text so rows written by hand or by older versions of the
/// sheet can still be read; the aggregator normalizes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub date: String,
    pub weekday: String,
    pub entry: String,
    pub exit: String,
    pub worked: String,
    pub minutes: String,
    pub lateness: String,
    pub deduction: String,
    pub note: String,
    pub month: String,
    pub year: String,
}

impl From<&DailyRecord> for StoredRecord {
    fn from(record: &DailyRecord) -> Self {
        let lateness = record.lateness();
        Self {
            date: record.date.format(DATE_FORMAT).to_string(),
            weekday: record.weekday.to_string(),
            entry: time::format_clock(record.entry),
            exit: time::format_clock(record.exit),
            worked: record.worked_label(),
            minutes: record.worked_minutes.to_string(),
            lateness: lateness.label(),
            deduction: time::format_money(record.deduction),
            note: record.note.clone(),
            month: record.month.to_string(),
            year: record.year.to_string(),
        }
    }
}

impl StoredRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.weekday.clone(),
            self.entry.clone(),
            self.exit.clone(),
            self.worked.clone(),
            self.minutes.clone(),
            self.lateness.clone(),
            self.deduction.clone(),
            self.note.clone(),
            self.month.clone(),
            self.year.clone(),
        ]
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }

    pub fn is_blank(&self) -> bool {
        self.to_row().iter().all(|cell| cell.trim().is_empty())
    }
}

/// Maps header names to column positions so rows can be read regardless of
/// column order. Older sheets used `Horas` and `Obs`.
#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    positions: [Option<usize>; COLUMNS.len()],
}

impl SheetLayout {
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Self {
        let mut positions = [None; COLUMNS.len()];
        for (index, name) in header.iter().enumerate() {
            let name = match name.as_ref().trim() {
                "Horas" => "Horas Trabalhadas",
                "Obs" => "Notas",
                other => other,
            };
            if let Some(column) = COLUMNS.iter().position(|c| *c == name) {
                positions[column].get_or_insert(index);
            }
        }
        Self { positions }
    }

    /// Whether the row looks like a header this crate can read.
    pub fn recognizes_any(&self) -> bool {
        self.positions.iter().any(Option::is_some)
    }

    pub fn read<S: AsRef<str>>(&self, cells: &[S]) -> StoredRecord {
        let cell = |column: usize| -> String {
            self.positions[column]
                .and_then(|index| cells.get(index))
                .map(|value| value.as_ref().to_string())
                .unwrap_or_default()
        };

        StoredRecord {
            date: cell(0),
            weekday: cell(1),
            entry: cell(2),
            exit: cell(3),
            worked: cell(4),
            minutes: cell(5),
            lateness: cell(6),
            deduction: cell(7),
            note: cell(8),
            month: cell(9),
            year: cell(10),
        }
    }
}

pub fn header_row() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn input(date: (i32, u32, u32), entry: &str, exit: &str, note: Option<&str>) -> RecordInput {
        RecordInput {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            entry: entry.to_string(),
            exit: exit.to_string(),
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn builds_a_late_record() {
        let record = DailyRecord::build(
            &input((2026, 3, 9), "09:10", "17:00", Some("médico")),
            &WorkRules::default(),
            &HolidayCalendar::default(),
        )
        .unwrap();

        assert_eq!(record.weekday, "Segunda");
        assert_eq!(record.worked_minutes, 410);
        assert_eq!(record.lateness_minutes, 30);
        assert_eq!(record.deduction, dec!(22.91));
        assert_eq!(record.note, "médico");
        assert_eq!((record.month, record.year), (3, 2026));
    }

    #[test]
    fn holiday_fills_an_empty_note() {
        let rules = WorkRules::default();
        let holidays = HolidayCalendar::default();

        let blank = DailyRecord::build(&input((2026, 6, 25), "08:00", "12:00", Some("  ")), &rules, &holidays)
            .unwrap();
        assert_eq!(blank.note, "Dia da Independência Nacional");

        let typed = DailyRecord::build(&input((2026, 6, 25), "08:00", "12:00", Some("plantão")), &rules, &holidays)
            .unwrap();
        assert_eq!(typed.note, "plantão");

        let ordinary = DailyRecord::build(&input((2026, 6, 24), "08:00", "12:00", None), &rules, &holidays)
            .unwrap();
        assert_eq!(ordinary.note, "");
    }

    #[test]
    fn invalid_days_are_never_built() {
        let err = DailyRecord::build(
            &input((2026, 3, 9), "17:00", "08:00", None),
            &WorkRules::default(),
            &HolidayCalendar::default(),
        )
        .unwrap_err();

        assert_eq!(err, TimeError::ExitBeforeEntry);
    }

    #[test]
    fn stored_form_keeps_canonical_numbers_and_labels() {
        let rules = WorkRules {
            max_exit: NaiveTime::from_hms_opt(16, 40, 0),
            ..WorkRules::default()
        };
        let record = DailyRecord::build(&input((2026, 3, 9), "08:00", "18:30", None), &rules, &HolidayCalendar::default())
            .unwrap();
        let stored = StoredRecord::from(&record);

        assert_eq!(stored.date, "09/03/2026");
        assert_eq!(stored.entry, "08:00");
        assert_eq!(stored.exit, "16:40");
        assert_eq!(stored.worked, "7h 40m");
        assert_eq!(stored.minutes, "460");
        assert_eq!(stored.lateness, "Sem atraso");
        assert_eq!(stored.deduction, "0.00");
        assert_eq!(stored.month, "3");
        assert_eq!(stored.parsed_date(), Some(record.date));
        assert_eq!(stored.to_row().len(), COLUMNS.len());
    }

    #[test]
    fn layout_reads_rows_by_header_name() {
        let layout = SheetLayout::from_header(&header_row());
        let stored = StoredRecord {
            date: "02/03/2026".into(),
            note: "x".into(),
            ..StoredRecord::default()
        };

        assert_eq!(layout.read(&stored.to_row()), stored);
    }

    #[test]
    fn layout_understands_legacy_headers() {
        let layout = SheetLayout::from_header(&["Data", "Entrada", "Saída", "Horas", "Obs"]);
        let row = layout.read(&["05/03/2026", "08:00", "16:30", "8.5"]);

        assert!(layout.recognizes_any());
        assert_eq!(row.date, "05/03/2026");
        assert_eq!(row.exit, "16:30");
        assert_eq!(row.worked, "8.5");
        // short rows leave trailing columns blank
        assert_eq!(row.note, "");
        assert_eq!(row.minutes, "");
    }

    #[test]
    fn unknown_headers_are_not_recognized() {
        assert!(!SheetLayout::from_header(&["foo", "bar"]).recognizes_any());
    }
}
