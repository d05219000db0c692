use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use livro_ponto::{config, AppConfig, TimesheetService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Livro de Ponto service");

    // Reads SHEETS_*, LUNCH_MINUTES, LATE_THRESHOLD and friends from the environment or .env
    let app_config = AppConfig::from_env()?;
    config::log_config(&app_config);

    let store = app_config.build_store()?;
    let timesheet_service = TimesheetService::new(store, app_config.timesheet.clone());

    let app = Router::new()
        .nest("/api/ponto", timesheet_service.router())
        .route("/health", axum::routing::get(|| async { "OK" }));

    let listener = TcpListener::bind(app_config.server_addr.as_str()).await?;
    info!("Server running on http://{}", app_config.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/*
Routes:

1. POST /api/ponto/records
   {"date": "2026-03-09", "entry": "08:00", "exit": "17:00", "note": null}
   - Validates and stores the day (one record per date)

2. GET /api/ponto/records?month=3&year=2026
   - Records of the month sorted by date, with totals

3. DELETE /api/ponto/records
   - Removes every record

4. GET /api/ponto/holiday?date=2026-06-25

5. GET /api/ponto/export/spreadsheet?month=3&year=2026
   GET /api/ponto/export/csv?month=3&year=2026
   GET /api/ponto/export/pdf?month=3&year=2026
   - Signable monthly book
*/
