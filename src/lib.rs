//! Livro de Ponto
//!
//! Attendance book for a single employee: daily entry/exit times are checked
//! and turned into worked minutes and lateness deductions, kept in a Google
//! Sheets worksheet (or in memory), and exported each month as a signable
//! spreadsheet and PDF.

pub mod config;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use service::{TimesheetConfig, TimesheetService};

// Re-export key types for convenience
pub use helpers::aggregate::{aggregate, MonthlySummary};
pub use helpers::calendar::HolidayCalendar;
pub use helpers::store::{MemoryStore, RecordStore};
pub use helpers::time::{compute_lateness, compute_worked_duration, WorkRules};
pub use models::record::{DailyRecord, RecordInput, StoredRecord};
