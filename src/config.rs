use std::{env, str::FromStr, sync::Arc, time::Duration};

use chrono::NaiveTime;
use dotenvy::dotenv;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::{
    helpers::{
        calendar::HolidayCalendar,
        export::{Organization, Signatory},
        sheets::{self, SheetConfig, SheetStore},
        store::{MemoryStore, RecordStore, StoreError},
        time::{self, WorkRules},
    },
    service::TimesheetConfig,
};

#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key} ('{value}'): {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

/// Remote sheet settings; absent when no spreadsheet is configured.
#[derive(Debug, Clone)]
pub struct SheetSettings {
    pub token: String,
    pub sheet: SheetConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: String,
    pub sheets: Option<SheetSettings>,
    pub timesheet: TimesheetConfig,
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError {
                key,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }

    fn clock(&self, key: &'static str) -> Result<Option<NaiveTime>, ConfigError> {
        self.get(key)
            .map(|value| {
                time::parse_clock(&value).map_err(|e| ConfigError {
                    key,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }
}

impl AppConfig {
    /// Reads the process environment, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let defaults = WorkRules::default();

        let rules = WorkRules {
            lunch_minutes: vars.parsed("LUNCH_MINUTES", defaults.lunch_minutes)?,
            max_exit: vars.clock("MAX_EXIT_TIME")?,
            late_threshold: vars.clock("LATE_THRESHOLD")?.unwrap_or(defaults.late_threshold),
            hourly_rate: vars.parsed::<Decimal>("HOURLY_RATE", defaults.hourly_rate)?,
        };

        let organization = Organization {
            name: vars.or("ORGANIZATION_NAME", "Paróquia SS. Trindade"),
            supervisor: Signatory::new(
                vars.or("SUPERVISOR_TITLE", "Pároco"),
                vars.or("SUPERVISOR_NAME", ""),
            ),
            employee: Signatory::new(
                vars.or("EMPLOYEE_TITLE", "Secretária"),
                vars.or("EMPLOYEE_NAME", ""),
            ),
        };

        let sheets = match (vars.get("SHEETS_SPREADSHEET_ID"), vars.get("SHEETS_API_TOKEN")) {
            (Some(spreadsheet_id), Some(token)) => Some(SheetSettings {
                token,
                sheet: SheetConfig {
                    base_url: vars.or("SHEETS_BASE_URL", sheets::DEFAULT_BASE_URL),
                    spreadsheet_id,
                    worksheet: vars.or("SHEETS_WORKSHEET", sheets::DEFAULT_WORKSHEET),
                    timeout: Duration::from_secs(vars.parsed("STORE_TIMEOUT_SECS", 15u64)?),
                    cache_ttl: Duration::from_secs(vars.parsed("STORE_CACHE_TTL_SECS", 0u64)?),
                },
            }),
            (Some(_), None) => {
                return Err(ConfigError {
                    key: "SHEETS_API_TOKEN",
                    value: String::new(),
                    reason: "required when SHEETS_SPREADSHEET_ID is set".to_string(),
                });
            }
            _ => None,
        };

        Ok(Self {
            server_addr: vars.or("SERVER_ADDR", "0.0.0.0:3000"),
            sheets,
            timesheet: TimesheetConfig {
                rules,
                organization,
                holidays: HolidayCalendar::default(),
            },
        })
    }

    /// The remote sheet when configured, otherwise a session-local store.
    pub fn build_store(&self) -> Result<Arc<dyn RecordStore>, StoreError> {
        match &self.sheets {
            Some(settings) => {
                let client = sheets::sheets_client_init(&settings.token, settings.sheet.timeout)?;
                Ok(Arc::new(SheetStore::new(client, settings.sheet.clone())))
            }
            None => {
                warn!("No spreadsheet configured; records are kept in memory only");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules = &self.timesheet.rules;
        writeln!(f, "Server address: {}", self.server_addr)?;
        match &self.sheets {
            Some(settings) => writeln!(
                f,
                "Store: sheet {} / {} (timeout {:?}, cache {:?})",
                settings.sheet.spreadsheet_id,
                settings.sheet.worksheet,
                settings.sheet.timeout,
                settings.sheet.cache_ttl
            )?,
            None => writeln!(f, "Store: in memory")?,
        }
        writeln!(f, "Lunch: {} min", rules.lunch_minutes)?;
        writeln!(
            f,
            "Exit cap: {}",
            rules.max_exit.map(time::format_clock).unwrap_or_else(|| "none".to_string())
        )?;
        write!(
            f,
            "Late after {} at {} per hour",
            time::format_clock(rules.late_threshold),
            rules.hourly_rate
        )
    }
}

pub fn log_config(config: &AppConfig) {
    for line in config.to_string().lines() {
        info!("{}", line);
    }
}
