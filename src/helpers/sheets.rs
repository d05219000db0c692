use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{header, Client, Response, Url};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{
    helpers::store::{RecordStore, StoreError},
    models::{
        record::{header_row, SheetLayout, StoredRecord},
        sheets::{AppendResponse, ValueRange},
    },
};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_WORKSHEET: &str = "Ponto";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Last column cleared below rewritten data.
const LAST_COLUMN: &str = "Z";

#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub timeout: Duration,
    /// How long a read may be served from memory. Zero disables caching.
    pub cache_ttl: Duration,
}

impl SheetConfig {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet: DEFAULT_WORKSHEET.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: Duration::ZERO,
        }
    }

    /// A1 reference to the whole worksheet, or to `cells` inside it. Names
    /// with anything but letters, digits and `_` are quoted.
    pub fn range(&self, cells: Option<&str>) -> String {
        let name = if self
            .worksheet
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.worksheet.clone()
        } else {
            format!("'{}'", self.worksheet.replace('\'', "''"))
        };

        match cells {
            Some(cells) => format!("{name}!{cells}"),
            None => name,
        }
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}{action}`, with the id and
    /// range percent-encoded as path segments.
    pub fn values_url(&self, range: &str, action: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            StoreError::Config(format!("invalid Sheets base URL '{}': {e}", self.base_url))
        })?;

        url.path_segments_mut()
            .map_err(|_| StoreError::Config(format!("Sheets base URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values"])
            .push(&format!("{range}{action}"));

        Ok(url)
    }
}

pub fn sheets_client_init(token: &str, timeout: Duration) -> Result<Client, StoreError> {
    info!("Initializing Sheets client");

    let mut auth = match header::HeaderValue::from_str(format!("Bearer {}", token).as_str()) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to create Authorization header value: {}", e);
            return Err(StoreError::Config(format!("invalid API token: {e}")));
        }
    };
    auth.set_sensitive(true);

    let mut headers = header::HeaderMap::new();
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    match Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
    {
        Ok(client) => {
            info!("Sheets client initialized with a {:?} timeout", timeout);
            Ok(client)
        }
        Err(e) => {
            error!("Failed to build Sheets client: {}", e);
            Err(StoreError::Request(e))
        }
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    error!("Sheets API returned error status {}: {}", status, body);
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Record store backed by one worksheet of a Google spreadsheet. The first
/// row of the worksheet holds the column names.
pub struct SheetStore {
    client: Client,
    config: SheetConfig,
    cache: Option<Cache<(), Vec<StoredRecord>>>,
}

impl SheetStore {
    pub fn new(client: Client, config: SheetConfig) -> Self {
        info!(
            "Creating SheetStore for spreadsheet {} / {}",
            config.spreadsheet_id, config.worksheet
        );
        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Self {
            client,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    async fn fetch_values(&self) -> Result<ValueRange, StoreError> {
        let url = self.config.values_url(&self.config.range(None), "")?;
        info!("Fetching rows from {}", url);

        let response = match self.client.get(url).send().await {
            Ok(resp) => check_status(resp).await?,
            Err(e) => {
                error!("Failed to send request to Sheets API: {}", e);
                return Err(StoreError::Request(e));
            }
        };

        let text = response.text().await?;
        match serde_json::from_str::<ValueRange>(&text) {
            Ok(range) => {
                info!("Received {} rows from Sheets API", range.values.len());
                Ok(range)
            }
            Err(e) => {
                error!("Failed to parse Sheets response: {}", e);
                error!("Raw response: {}", text);
                Err(StoreError::Decode(e))
            }
        }
    }

    async fn clear(&self, range: &str) -> Result<(), StoreError> {
        let url = self.config.values_url(range, ":clear")?;
        info!("Clearing {}", range);

        let response = self.client.post(url).json(&serde_json::json!({})).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Writes the header and `records` from the top of the worksheet, then
    /// clears whatever is left below them. A failed write leaves the
    /// previous rows in place.
    async fn overwrite(&self, records: &[StoredRecord]) -> Result<(), StoreError> {
        let url = self.config.values_url(&self.config.range(Some("A1")), "")?;
        info!("Writing {} records to worksheet", records.len());

        let response = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValueRange::with_header(records))
            .send()
            .await?;
        check_status(response).await?;

        // header row plus one row per record
        let first_stale_row = records.len() + 2;
        let leftovers = format!("A{first_stale_row}:{LAST_COLUMN}");
        self.clear(&self.config.range(Some(&leftovers))).await?;

        info!("Worksheet replaced with {} records", records.len());
        Ok(())
    }

    async fn append_row(&self, record: StoredRecord) -> Result<(), StoreError> {
        let values = self.fetch_values().await?;

        match values.header() {
            None => {
                warn!("Worksheet is empty, writing header with the first record");
                return self.overwrite(&[record]).await;
            }
            Some(header) if header != header_row() => {
                if !SheetLayout::from_header(header.as_slice()).recognizes_any() {
                    error!("Refusing to append below unknown header: {:?}", header);
                    return Err(StoreError::Config(format!(
                        "worksheet header not recognized: {}",
                        header.join(", ")
                    )));
                }
                let mut records = values.into_records();
                warn!(
                    "Worksheet uses an older column layout, rewriting {} records with the current header",
                    records.len()
                );
                records.push(record);
                return self.overwrite(&records).await;
            }
            Some(_) => {}
        }

        let url = self.config.values_url(&self.config.range(None), ":append")?;
        info!("Appending record for {}", record.date);

        let body = ValueRange::rows(vec![record.to_row()]);
        let response = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        match response.json::<AppendResponse>().await {
            Ok(AppendResponse {
                updates: Some(updates),
                ..
            }) => info!("Record appended: {}", updates),
            Ok(_) => info!("Record appended"),
            // the row is written; only the summary is unreadable
            Err(e) => warn!("Could not read append summary: {}", e),
        }
        Ok(())
    }

    async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&()).await;
        }
    }
}

#[async_trait]
impl RecordStore for SheetStore {
    async fn fetch(&self) -> Result<Vec<StoredRecord>, StoreError> {
        if let Some(cache) = &self.cache {
            if let Some(records) = cache.get(&()).await {
                info!("Serving {} records from cache", records.len());
                return Ok(records);
            }
        }

        let records = self.fetch_values().await?.into_records();
        info!("Decoded {} records from worksheet", records.len());

        if let Some(cache) = &self.cache {
            cache.insert((), records.clone()).await;
        }
        Ok(records)
    }

    async fn append(&self, record: StoredRecord) -> Result<(), StoreError> {
        let result = self.append_row(record).await;
        self.invalidate().await;
        result
    }

    async fn replace(&self, records: Vec<StoredRecord>) -> Result<(), StoreError> {
        let result = self.overwrite(&records).await;
        self.invalidate().await;
        result
    }
}
