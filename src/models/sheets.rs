use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::models::record::{header_row, SheetLayout, StoredRecord};

/// Body of the Sheets `values` endpoints, both directions.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    pub fn rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            range: None,
            major_dimension: Some("ROWS".to_string()),
            values: rows
                .into_iter()
                .map(|row| row.into_iter().map(Value::String).collect())
                .collect(),
        }
    }

    /// Header row followed by one row per record.
    pub fn with_header(records: &[StoredRecord]) -> Self {
        let mut rows = Vec::with_capacity(records.len() + 1);
        rows.push(header_row());
        rows.extend(records.iter().map(StoredRecord::to_row));
        Self::rows(rows)
    }

    /// Cell values as text. Numbers come back from the API as JSON numbers
    /// when the sheet was edited by hand.
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect()
    }

    /// First row as trimmed text without trailing blank cells, or `None` for
    /// an empty worksheet.
    pub fn header(&self) -> Option<Vec<String>> {
        let first = self.values.first()?;
        let mut header: Vec<String> = first
            .iter()
            .map(|value| cell_text(value).trim().to_string())
            .collect();
        while header.last().is_some_and(|cell| cell.is_empty()) {
            header.pop();
        }
        Some(header)
    }

    /// Decodes records using the first row as header. Blank rows are skipped.
    pub fn into_records(self) -> Vec<StoredRecord> {
        let rows = self.text_rows();
        let Some((header, body)) = rows.split_first() else {
            return Vec::new();
        };

        let layout = SheetLayout::from_header(header.as_slice());
        if !layout.recognizes_any() {
            return Vec::new();
        }

        body.iter()
            .map(|cells| layout.read(cells.as_slice()))
            .filter(|record| !record.is_blank())
            .collect()
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Response of the `:append` endpoint; only the updated range is of interest.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    pub spreadsheet_id: Option<String>,
    pub table_range: Option<String>,
    pub updates: Option<UpdateSummary>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub updated_range: Option<String>,
    pub updated_rows: Option<u64>,
    pub updated_cells: Option<u64>,
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "range {} ({} rows, {} cells)",
            self.updated_range.as_deref().unwrap_or("?"),
            self.updated_rows.unwrap_or(0),
            self.updated_cells.unwrap_or(0)
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_rows_below_the_header() {
        let body = json!({
            "range": "Ponto!A1:K3",
            "majorDimension": "ROWS",
            "values": [
                ["Data", "Entrada", "Saída", "Minutos", "Mês", "Ano"],
                ["02/03/2026", "08:00", "17:00", 480, 3, 2026],
                [],
                ["03/03/2026", "08:10", "16:30"]
            ]
        });
        let range: ValueRange = serde_json::from_value(body).unwrap();
        let records = range.into_records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].minutes, "480");
        assert_eq!(records[0].month, "3");
        assert_eq!(records[1].exit, "16:30");
        assert_eq!(records[1].year, "");
    }

    #[test]
    fn empty_sheets_have_no_values_key() {
        let range: ValueRange = serde_json::from_value(json!({ "range": "Ponto!A1:Z1000" })).unwrap();

        assert!(range.into_records().is_empty());
    }

    #[test]
    fn header_ignores_padding_cells() {
        let range: ValueRange = serde_json::from_value(json!({
            "values": [[" Data ", "Entrada", "", null], ["02/03/2026"]]
        }))
        .unwrap();

        assert_eq!(range.header(), Some(vec!["Data".to_string(), "Entrada".to_string()]));
        assert_eq!(ValueRange::default().header(), None);
    }

    #[test]
    fn writes_the_header_first() {
        let record = StoredRecord {
            date: "02/03/2026".into(),
            ..StoredRecord::default()
        };
        let body = serde_json::to_value(ValueRange::with_header(&[record])).unwrap();

        assert_eq!(body["majorDimension"], "ROWS");
        assert_eq!(body["values"][0][0], "Data");
        assert_eq!(body["values"][1][0], "02/03/2026");
        assert!(body.get("range").is_none());
    }
}
