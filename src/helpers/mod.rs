pub mod aggregate;
pub mod calendar;
pub mod export;
pub mod pdf;
pub mod sheets;
pub mod spreadsheet;
pub mod store;
pub mod time;
