use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    helpers::{
        aggregate::{self, MonthlySummary},
        calendar::{self, HolidayCalendar},
        export::{self, ExportError, ExportHeader, Organization},
        pdf,
        spreadsheet,
        store::{RecordStore, StoreError},
        time::{TimeError, WorkRules},
    },
    models::record::{DailyRecord, RecordInput, StoredRecord},
};

/// Configuration for the timesheet service
#[derive(Debug, Clone, Default)]
pub struct TimesheetConfig {
    pub rules: WorkRules,
    pub organization: Organization,
    pub holidays: HolidayCalendar,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidRecord(#[from] TimeError),

    #[error("invalid period {month}/{year}")]
    InvalidPeriod { month: u32, year: i32 },

    /// Query string or body the router could not decode.
    #[error("{message}")]
    InvalidRequest { status: StatusCode, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidRecord(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InvalidPeriod { .. } => StatusCode::BAD_REQUEST,
            ServiceError::InvalidRequest { status, .. } => *status,
            ServiceError::Store(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// One month of records, sorted by date, with its totals.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub month: u32,
    pub year: i32,
    pub period_label: String,
    pub total_worked: String,
    pub total_deduction: String,
    pub summary: MonthlySummary,
    pub records: Vec<StoredRecord>,
}

#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl IntoResponse for ExportFile {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.file_name);
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// The attendance book: validates days, keeps them in the record store and
/// produces the monthly exports.
#[derive(Clone)]
pub struct TimesheetService {
    pub store: Arc<dyn RecordStore>,
    pub config: Arc<TimesheetConfig>,
}

impl TimesheetService {
    /// Create a new timesheet service instance
    pub fn new(store: Arc<dyn RecordStore>, config: TimesheetConfig) -> Self {
        info!("Creating new TimesheetService instance");
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Create an Axum router for the timesheet service
    pub fn router(self) -> Router {
        info!("Creating timesheet service router");
        let shared_state = Arc::new(self);

        Router::new()
            .route(
                "/records",
                get(list_records).post(save_record).delete(clear_records),
            )
            .route("/holiday", get(holiday))
            .route("/export/spreadsheet", get(export_spreadsheet))
            .route("/export/csv", get(export_csv))
            .route("/export/pdf", get(export_pdf))
            .with_state(shared_state)
    }

    pub fn holiday(&self, date: NaiveDate) -> Option<&str> {
        self.config.holidays.holiday_on(date)
    }

    /// Validates the day and stores it, replacing any record already kept for
    /// the same date.
    pub async fn save_record(&self, input: RecordInput) -> Result<DailyRecord, ServiceError> {
        info!("Saving record for {}", input.date);

        let record = match DailyRecord::build(&input, &self.config.rules, &self.config.holidays) {
            Ok(record) => record,
            Err(e) => {
                warn!("Rejected record for {}: {}", input.date, e);
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.upsert(StoredRecord::from(&record)).await {
            error!("Failed to store record for {}: {}", record.date, e);
            return Err(e.into());
        }

        info!(
            "Stored record for {}: {} worked, {} deducted",
            record.date,
            record.worked_label(),
            record.deduction
        );
        Ok(record)
    }

    pub async fn monthly_report(&self, month: u32, year: i32) -> Result<MonthlyReport, ServiceError> {
        if !(1..=12).contains(&month) {
            return Err(ServiceError::InvalidPeriod { month, year });
        }

        let all = self.store.read().await;
        let summary = aggregate::aggregate(&all, month, year);
        let records = aggregate::month_records(&all, month, year);
        info!(
            "Report for {}/{}: {} records, {} worked",
            month,
            year,
            summary.record_count,
            summary.total_label()
        );

        Ok(MonthlyReport {
            month,
            year,
            period_label: calendar::period_label(month, year),
            total_worked: summary.total_label(),
            total_deduction: summary.deduction_label(),
            summary,
            records,
        })
    }

    fn export_header(&self, report: &MonthlyReport) -> ExportHeader {
        ExportHeader::new(
            &self.config.organization,
            &report.summary,
            report.month,
            report.year,
        )
    }

    pub async fn export_spreadsheet(&self, month: u32, year: i32) -> Result<ExportFile, ServiceError> {
        let report = self.monthly_report(month, year).await?;
        let bytes = spreadsheet::to_spreadsheet_bytes(&report.records, &self.export_header(&report))?;

        Ok(ExportFile {
            file_name: export::export_file_name(month, year, "xlsx"),
            content_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            bytes,
        })
    }

    pub async fn export_csv(&self, month: u32, year: i32) -> Result<ExportFile, ServiceError> {
        let report = self.monthly_report(month, year).await?;
        let bytes = spreadsheet::to_csv_bytes(&report.records, &self.export_header(&report))?;

        Ok(ExportFile {
            file_name: export::export_file_name(month, year, "csv"),
            content_type: "text/csv; charset=utf-8",
            bytes,
        })
    }

    pub async fn export_pdf(&self, month: u32, year: i32) -> Result<ExportFile, ServiceError> {
        let report = self.monthly_report(month, year).await?;
        let bytes = pdf::to_printable_document_bytes(&report.records, &self.export_header(&report))?;

        Ok(ExportFile {
            file_name: export::export_file_name(month, year, "pdf"),
            content_type: "application/pdf",
            bytes,
        })
    }

    /// Deletes every stored record.
    pub async fn clear_records(&self) -> Result<(), ServiceError> {
        warn!("Clearing all stored records");
        self.store.replace(Vec::new()).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct HolidayQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct HolidayResponse {
    pub date: NaiveDate,
    pub holiday: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SavedRecord {
    pub message: String,
    pub record: StoredRecord,
}

// Route handlers
async fn save_record(
    State(service): State<Arc<TimesheetService>>,
    body: Result<Json<RecordInput>, JsonRejection>,
) -> Result<(StatusCode, Json<SavedRecord>), ServiceError> {
    let Json(input) = body?;
    let record = service.save_record(input).await?;
    let message = format!(
        "Registo do dia {} salvo: {}",
        record.date.format("%d/%m/%Y"),
        record.worked_label()
    );

    Ok((
        StatusCode::CREATED,
        Json(SavedRecord {
            message,
            record: StoredRecord::from(&record),
        }),
    ))
}

async fn list_records(
    State(service): State<Arc<TimesheetService>>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<Json<MonthlyReport>, ServiceError> {
    let Query(period) = query?;
    Ok(Json(service.monthly_report(period.month, period.year).await?))
}

async fn clear_records(State(service): State<Arc<TimesheetService>>) -> Result<StatusCode, ServiceError> {
    service.clear_records().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn holiday(
    State(service): State<Arc<TimesheetService>>,
    query: Result<Query<HolidayQuery>, QueryRejection>,
) -> Result<Json<HolidayResponse>, ServiceError> {
    let Query(query) = query?;
    Ok(Json(HolidayResponse {
        date: query.date,
        holiday: service.holiday(query.date).map(str::to_string),
    }))
}

async fn export_spreadsheet(
    State(service): State<Arc<TimesheetService>>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<ExportFile, ServiceError> {
    let Query(period) = query?;
    info!("Exporting spreadsheet for {}/{}", period.month, period.year);
    service.export_spreadsheet(period.month, period.year).await
}

async fn export_csv(
    State(service): State<Arc<TimesheetService>>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<ExportFile, ServiceError> {
    let Query(period) = query?;
    info!("Exporting CSV for {}/{}", period.month, period.year);
    service.export_csv(period.month, period.year).await
}

async fn export_pdf(
    State(service): State<Arc<TimesheetService>>,
    query: Result<Query<PeriodQuery>, QueryRejection>,
) -> Result<ExportFile, ServiceError> {
    let Query(period) = query?;
    info!("Exporting PDF for {}/{}", period.month, period.year);
    service.export_pdf(period.month, period.year).await
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::helpers::store::MemoryStore;

    fn service() -> TimesheetService {
        TimesheetService::new(Arc::new(MemoryStore::new()), TimesheetConfig::default())
    }

    fn input(day: u32, entry: &str, exit: &str) -> RecordInput {
        RecordInput {
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            entry: entry.to_string(),
            exit: exit.to_string(),
            note: None,
        }
    }

    #[tokio::test]
    async fn saved_days_show_up_in_the_monthly_report() {
        let service = service();
        service.save_record(input(10, "08:00", "17:00")).await.unwrap();
        service.save_record(input(9, "09:10", "17:00")).await.unwrap();

        let report = service.monthly_report(3, 2026).await.unwrap();
        assert_eq!(report.summary.record_count, 2);
        assert_eq!(report.summary.total_minutes, 480 + 410);
        assert_eq!(report.summary.total_deduction, dec!(22.91));
        assert_eq!(report.total_worked, "14h 50m");
        assert_eq!(report.period_label, "Março 2026");
        // sorted by date
        assert_eq!(report.records[0].date, "09/03/2026");
    }

    #[tokio::test]
    async fn resubmitting_a_date_corrects_it() {
        let service = service();
        service.save_record(input(10, "08:00", "17:00")).await.unwrap();
        service.save_record(input(10, "08:00", "16:00")).await.unwrap();

        let report = service.monthly_report(3, 2026).await.unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].worked, "7h 00m");
    }

    #[tokio::test]
    async fn invalid_days_are_not_stored() {
        let service = service();
        let err = service.save_record(input(10, "17:00", "08:00")).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidRecord(TimeError::ExitBeforeEntry)));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(service.store.read().await.is_empty());
    }

    #[tokio::test]
    async fn rejects_impossible_months() {
        let err = service().monthly_report(13, 2026).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn exports_are_named_after_the_period() {
        let service = service();
        service.save_record(input(10, "08:00", "17:00")).await.unwrap();

        let workbook = service.export_spreadsheet(3, 2026).await.unwrap();
        assert_eq!(workbook.file_name, "Ponto_Mensal_03_2026.xlsx");
        assert!(workbook.bytes.starts_with(b"PK"));

        let csv = service.export_csv(3, 2026).await.unwrap();
        assert_eq!(csv.file_name, "Ponto_Mensal_03_2026.csv");
        assert!(!csv.bytes.is_empty());

        let pdf = service.export_pdf(3, 2026).await.unwrap();
        assert_eq!(pdf.file_name, "Ponto_Mensal_03_2026.pdf");
        assert!(pdf.bytes.starts_with(b"%PDF-1.5"));
    }

    #[tokio::test]
    async fn clearing_empties_the_store() {
        let service = service();
        service.save_record(input(10, "08:00", "17:00")).await.unwrap();
        service.clear_records().await.unwrap();

        assert_eq!(service.monthly_report(3, 2026).await.unwrap().summary, MonthlySummary::default());
    }
}
