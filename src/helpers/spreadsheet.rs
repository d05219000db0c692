use csv::WriterBuilder;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use tracing::info;

use crate::{
    helpers::export::{ExportError, ExportHeader, EXPORT_COLUMNS},
    models::record::StoredRecord,
};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const SIGNATURE_LINE: &str = "______________________________";
const DATE_LINE: &str = "Data: _____ / _____ / _________";

/// Row of the column titles; the header block sits above it.
const TABLE_ROW: u32 = 8;
const COLUMN_WIDTHS: [f64; 8] = [12.0, 14.0, 9.0, 9.0, 10.0, 12.0, 10.0, 36.0];
const SIGNATURE_COLUMNS: (u16, u16) = (0, 4);
const MAX_SHEET_NAME: usize = 31;

fn record_cells(record: &StoredRecord) -> [&str; 8] {
    [
        &record.date,
        &record.weekday,
        &record.entry,
        &record.exit,
        &record.worked,
        &record.lateness,
        &record.deduction,
        &record.note,
    ]
}

fn header_lines(header: &ExportHeader) -> [String; 7] {
    [
        header.organization.clone(),
        header.title.clone(),
        header.supervisor.caption(),
        header.employee.caption(),
        header.period_line(),
        header.total_line(),
        header.deduction_line(),
    ]
}

/// Worksheet names may not contain `/ \ ? * [ ] :` and are capped at 31 chars.
fn sheet_name(period_label: &str) -> String {
    period_label
        .replace(['/', '\\', '?', '*', '[', ']', ':'], "-")
        .chars()
        .take(MAX_SHEET_NAME)
        .collect()
}

/// Writes the month as an Excel workbook with one sheet named after the
/// period: a centred title block, the record table and two signature
/// columns.
pub fn to_spreadsheet_bytes(
    records: &[StoredRecord],
    header: &ExportHeader,
) -> Result<Vec<u8>, ExportError> {
    let last_column = (EXPORT_COLUMNS.len() - 1) as u16;
    let title = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center);
    let subtitle = Format::new()
        .set_bold()
        .set_font_size(12)
        .set_align(FormatAlign::Center);
    let column_title = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x2C3E50))
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center);
    let cell = Format::new().set_border(FormatBorder::Thin);
    let striped = Format::new()
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(0xF2F2F2));
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&header.period_label))?;

    let lines = header_lines(header);
    worksheet.merge_range(0, 0, 0, last_column, &lines[0], &title)?;
    worksheet.merge_range(1, 0, 1, last_column, &lines[1], &subtitle)?;
    for (row, line) in (2u32..).zip(&lines[2..]) {
        worksheet.write_string(row, 0, line)?;
    }

    for (col, (name, width)) in (0u16..).zip(EXPORT_COLUMNS.iter().zip(COLUMN_WIDTHS)) {
        worksheet.set_column_width(col, width)?;
        worksheet.write_string_with_format(TABLE_ROW, col, *name, &column_title)?;
    }

    let mut row = TABLE_ROW + 1;
    for (index, record) in records.iter().enumerate() {
        let format = if index % 2 == 1 { &striped } else { &cell };
        for (col, value) in (0u16..).zip(record_cells(record)) {
            worksheet.write_string_with_format(row, col, value, format)?;
        }
        row += 1;
    }

    row += 2;
    let (left, right) = SIGNATURE_COLUMNS;
    worksheet.write_string(row, left, SIGNATURE_LINE)?;
    worksheet.write_string(row, right, SIGNATURE_LINE)?;
    row += 1;
    worksheet.write_string_with_format(row, left, format!("Assinatura: {}", header.employee.name), &bold)?;
    worksheet.write_string_with_format(row, right, format!("Assinatura: {}", header.supervisor.name), &bold)?;
    row += 1;
    worksheet.write_string(row, left, DATE_LINE)?;
    worksheet.write_string(row, right, DATE_LINE)?;

    let bytes = workbook.save_to_buffer()?;
    info!(
        "Created spreadsheet export with {} records, size: {} bytes",
        records.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Same layout as [`to_spreadsheet_bytes`] as UTF-8 CSV with a byte order
/// mark, for tools that do not read workbooks.
pub fn to_csv_bytes(records: &[StoredRecord], header: &ExportHeader) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .from_writer(UTF8_BOM.to_vec());

    for line in header_lines(header) {
        writer.write_record([line])?;
    }
    writer.write_record([""])?;

    writer.write_record(EXPORT_COLUMNS)?;
    for record in records {
        writer.write_record(record_cells(record))?;
    }

    writer.write_record([""])?;
    writer.write_record([""])?;
    writer.write_record([SIGNATURE_LINE, "", "", "", SIGNATURE_LINE])?;
    writer.write_record([
        format!("Assinatura: {}", header.employee.name),
        String::new(),
        String::new(),
        String::new(),
        format!("Assinatura: {}", header.supervisor.name),
    ])?;
    writer.write_record([DATE_LINE, "", "", "", DATE_LINE])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;

    info!(
        "Created CSV export with {} records, size: {} bytes",
        records.len(),
        bytes.len()
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use csv::ReaderBuilder;

    use super::*;
    use crate::helpers::{
        aggregate::aggregate,
        calendar::HolidayCalendar,
        export::{Organization, Signatory},
        time::WorkRules,
    };
    use crate::models::record::{DailyRecord, RecordInput};

    fn header(records: &[StoredRecord]) -> ExportHeader {
        let organization = Organization {
            name: "Paróquia SS. Trindade".into(),
            supervisor: Signatory::new("Pároco", "P. Silva"),
            employee: Signatory::new("Secretária", "A. Costa"),
        };
        ExportHeader::new(&organization, &aggregate(records, 6, 2026), 6, 2026)
    }

    fn read_rows(bytes: &[u8]) -> Vec<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        reader
            .records()
            .map(|row| row.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn engine_records_survive_the_round_trip() {
        let inputs = [
            ("08:00", "17:00", Some("reunião, \"paroquial\"")),
            ("09:10", "16:30", None),
        ];
        let records: Vec<StoredRecord> = inputs
            .iter()
            .enumerate()
            .map(|(i, (entry, exit, note))| {
                let input = RecordInput {
                    date: NaiveDate::from_ymd_opt(2026, 6, 24 + i as u32).unwrap(),
                    entry: entry.to_string(),
                    exit: exit.to_string(),
                    note: note.map(str::to_string),
                };
                let record = DailyRecord::build(&input, &WorkRules::default(), &HolidayCalendar::default())
                    .unwrap();
                StoredRecord::from(&record)
            })
            .collect();

        let bytes = to_csv_bytes(&records, &header(&records)).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        let rows = read_rows(&bytes[UTF8_BOM.len()..]);
        let table_start = rows.iter().position(|row| row[0] == "Data").unwrap() + 1;

        for (row, record) in rows[table_start..].iter().zip(&records) {
            assert_eq!(row[0], record.date);
            assert_eq!(row[2], record.entry);
            assert_eq!(row[3], record.exit);
            assert_eq!(row[7], record.note);
        }
        assert_eq!(rows[table_start][7], "reunião, \"paroquial\"");
        assert_eq!(rows[table_start + 1][7], "Dia da Independência Nacional");
        assert_eq!(rows[table_start + 1][6], "22.91");
    }

    #[test]
    fn header_block_and_signatures_are_written() {
        let bytes = to_csv_bytes(&[], &header(&[])).unwrap();
        let rows = read_rows(&bytes[UTF8_BOM.len()..]);

        assert_eq!(rows[0], ["Paróquia SS. Trindade"]);
        assert_eq!(rows[1], ["Livro de Ponto - A. Costa"]);
        assert_eq!(rows[4], ["Mês: Junho 2026"]);
        assert_eq!(rows[5], ["Total de Horas Trabalhadas: 0h 00m"]);

        let last = rows.len() - 1;
        assert_eq!(rows[last - 1][0], "Assinatura: A. Costa");
        assert_eq!(rows[last - 1][4], "Assinatura: P. Silva");
        assert!(rows[last][0].starts_with("Data:"));
    }

    #[test]
    fn workbook_is_written_as_xlsx() {
        let records = vec![StoredRecord {
            date: "24/06/2026".into(),
            weekday: "Quarta".into(),
            entry: "08:00".into(),
            exit: "17:00".into(),
            worked: "8h 00m".into(),
            ..StoredRecord::default()
        }];
        let bytes = to_spreadsheet_bytes(&records, &header(&records)).unwrap();

        // xlsx files are zip archives
        assert!(bytes.starts_with(b"PK"));
        assert!(to_spreadsheet_bytes(&[], &header(&[])).is_ok());
    }

    #[test]
    fn sheet_names_are_made_valid() {
        assert_eq!(sheet_name("Junho 2026"), "Junho 2026");
        assert_eq!(sheet_name("13/2026"), "13-2026");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }
}
