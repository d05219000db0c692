//! Wall-clock arithmetic for a single working day: worked duration after the
//! lunch deduction, and the late-arrival penalty.

use chrono::NaiveTime;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

pub const DEFAULT_LUNCH_MINUTES: u32 = 60;
pub const NO_LATENESS_LABEL: &str = "Sem atraso";
pub const NO_DEDUCTION_LABEL: &str = "Sem desconto";
pub const MINUTES_PER_DAY: u64 = 24 * 60;

const CLOCK_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("invalid format (use HH:MM): '{0}'")]
    InvalidFormat(String),

    #[error("exit time must be after entry time")]
    ExitBeforeEntry,

    #[error("insufficient time after deductions ({0} min)")]
    InsufficientTime(i64),
}

/// Outcome of a successful duration computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkedDuration {
    pub entry: NaiveTime,
    /// Exit after the optional cap has been applied.
    pub effective_exit: NaiveTime,
    pub minutes: u32,
}

impl WorkedDuration {
    pub fn label(&self) -> String {
        format_duration(u64::from(self.minutes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lateness {
    pub minutes: u32,
    pub deduction: Decimal,
}

impl Lateness {
    pub const NONE: Lateness = Lateness {
        minutes: 0,
        deduction: Decimal::ZERO,
    };

    pub fn is_late(&self) -> bool {
        self.minutes > 0
    }

    pub fn label(&self) -> String {
        match self.minutes {
            0 => NO_LATENESS_LABEL.to_string(),
            m if m < 60 => format!("{m} min"),
            m => format_duration(u64::from(m)),
        }
    }
}

/// Rules applied to every record: lunch deduction, optional exit cap and the
/// lateness penalty.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRules {
    pub lunch_minutes: u32,
    pub max_exit: Option<NaiveTime>,
    pub late_threshold: NaiveTime,
    pub hourly_rate: Decimal,
}

impl Default for WorkRules {
    fn default() -> Self {
        Self {
            lunch_minutes: DEFAULT_LUNCH_MINUTES,
            max_exit: None,
            late_threshold: NaiveTime::from_hms_opt(8, 40, 0).unwrap_or_default(),
            hourly_rate: dec!(45.82),
        }
    }
}

impl WorkRules {
    pub fn worked_duration(&self, entry: &str, exit: &str) -> Result<WorkedDuration, TimeError> {
        compute_worked_duration(entry, exit, self.lunch_minutes, self.max_exit)
    }

    pub fn lateness(&self, entry: NaiveTime) -> Lateness {
        compute_lateness(entry, self.late_threshold, self.hourly_rate)
    }
}

pub fn parse_clock(text: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(text.trim(), CLOCK_FORMAT)
        .map_err(|_| TimeError::InvalidFormat(text.trim().to_string()))
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format(CLOCK_FORMAT).to_string()
}

/// `{H}h {MM}m`, minutes always two digits.
pub fn format_duration(minutes: u64) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

/// Reads a duration label back into minutes.
///
/// Accepts the `{H}h {MM}m` form written by [`format_duration`], a bare
/// `{M}m`, and decimal hours (`8.5`, `7,25`) found in older sheets. Returns
/// `None` for anything else, including decimal hours beyond one day.
pub fn parse_duration_label(label: &str) -> Option<u64> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    if let Some((hours, rest)) = label.split_once('h') {
        let hours: u64 = hours.trim().parse().ok()?;
        let rest = rest.trim();
        let minutes: u64 = if rest.is_empty() {
            0
        } else {
            rest.strip_suffix('m')?.trim().parse().ok()?
        };
        if minutes >= 60 {
            return None;
        }
        return hours.checked_mul(60)?.checked_add(minutes);
    }

    if let Some(minutes) = label.strip_suffix('m') {
        return minutes.trim().parse().ok();
    }

    let hours: f64 = label.replace(',', ".").parse().ok()?;
    if !hours.is_finite() || !(0.0..=24.0).contains(&hours) {
        return None;
    }
    Some((hours * 60.0).round() as u64)
}

pub fn compute_worked_duration(
    entry: &str,
    exit: &str,
    lunch_minutes: u32,
    max_exit: Option<NaiveTime>,
) -> Result<WorkedDuration, TimeError> {
    let entry = parse_clock(entry)?;
    let mut exit = parse_clock(exit)?;

    if let Some(cap) = max_exit {
        if exit > cap {
            exit = cap;
        }
    }

    if exit <= entry {
        return Err(TimeError::ExitBeforeEntry);
    }

    let raw = exit.signed_duration_since(entry).num_minutes();
    let minutes = raw - i64::from(lunch_minutes);
    if minutes <= 0 {
        return Err(TimeError::InsufficientTime(minutes));
    }

    Ok(WorkedDuration {
        entry,
        effective_exit: exit,
        minutes: minutes as u32,
    })
}

pub fn compute_lateness(entry: NaiveTime, threshold: NaiveTime, hourly_rate: Decimal) -> Lateness {
    if entry <= threshold {
        return Lateness::NONE;
    }

    let minutes = entry.signed_duration_since(threshold).num_minutes() as u32;
    let deduction = (Decimal::from(minutes) * hourly_rate / Decimal::from(60))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Lateness { minutes, deduction }
}

/// Two-decimal rendering of a monetary amount.
pub fn format_money(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}
