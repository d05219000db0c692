use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

/// Public holidays observed in Mozambique, keyed by (day, month).
const MOZAMBIQUE_HOLIDAYS: [((u32, u32), &str); 9] = [
    ((1, 1), "Ano Novo"),
    ((3, 2), "Dia dos Heróis Moçambicanos"),
    ((7, 4), "Dia da Mulher Moçambicana"),
    ((1, 5), "Dia do Trabalhador"),
    ((25, 6), "Dia da Independência Nacional"),
    ((7, 9), "Dia da Vitória"),
    ((25, 9), "Dia das Forças Armadas"),
    ((4, 10), "Dia da Paz e Reconciliação"),
    ((25, 12), "Dia da Família"),
];

const MONTH_NAMES: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Segunda", "Terça", "Quarta", "Quinta", "Sexta", "Sábado", "Domingo",
];

/// Fixed-date holiday table. Built once and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    holidays: HashMap<(u32, u32), String>,
}

impl HolidayCalendar {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = ((u32, u32), S)>,
        S: Into<String>,
    {
        Self {
            holidays: entries
                .into_iter()
                .map(|(key, label)| (key, label.into()))
                .collect(),
        }
    }

    pub fn mozambique() -> Self {
        Self::from_entries(MOZAMBIQUE_HOLIDAYS)
    }

    pub fn lookup(&self, day: u32, month: u32) -> Option<&str> {
        self.holidays.get(&(day, month)).map(String::as_str)
    }

    pub fn holiday_on(&self, date: NaiveDate) -> Option<&str> {
        self.lookup(date.day(), date.month())
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::mozambique()
    }
}

/// Portuguese month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    month
        .checked_sub(1)
        .and_then(|index| MONTH_NAMES.get(index as usize))
        .copied()
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

/// "Março 2026" style label used in export headers and filenames.
pub fn period_label(month: u32, year: i32) -> String {
    match month_name(month) {
        Some(name) => format!("{name} {year}"),
        None => format!("{month:02}/{year}"),
    }
}
