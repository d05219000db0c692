use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream, StringFormat,
};
use tracing::{error, info};

use crate::{
    helpers::export::{ExportError, ExportHeader, EXPORT_COLUMNS},
    models::record::StoredRecord,
};

// A4 in points, 2 cm margins
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 56.69;
const TOP: f32 = PAGE_HEIGHT - MARGIN;
const BOTTOM: f32 = MARGIN;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const CM: f32 = 28.3465;
const COLUMN_WIDTHS_CM: [f32; 8] = [2.0, 2.4, 1.5, 1.5, 1.7, 1.9, 1.7, 4.3];

const HEADER_ROW_HEIGHT: f32 = 18.0;
const ROW_HEIGHT: f32 = 16.0;
const TABLE_FONT_SIZE: f32 = 8.5;
const CELL_PADDING: f32 = 3.0;
const SIGNATURE_BLOCK_HEIGHT: f32 = 120.0;
const FOOTER_Y: f32 = MARGIN / 2.0;

const HEADER_FILL: (f32, f32, f32) = (0.173, 0.243, 0.314); // #2c3e50
const STRIPE_FILL: (f32, f32, f32) = (0.949, 0.949, 0.949); // #f2f2f2
const GRID_GRAY: f32 = 0.5;

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// Rough Helvetica advance per point of font size.
    fn average_advance(self) -> f32 {
        match self {
            Font::Regular => 0.5,
            Font::Bold => 0.55,
        }
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// WinAnsi bytes for a Rust string; characters outside the code page become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().count() as f32 * size * font.average_advance()
}

/// Cuts text to fit `width`, ending with "..." when shortened.
fn fit_text(text: &str, font: Font, size: f32, width: f32) -> String {
    if text_width(text, font, size) <= width {
        return text.to_string();
    }
    let max_chars = (width / (size * font.average_advance())) as usize;
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Drawing operations for one page.
struct Canvas {
    operations: Vec<Operation>,
}

impl Canvas {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource().as_bytes().to_vec()), real(size)],
            ),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_text(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn centered_text(&mut self, center_x: f32, y: f32, font: Font, size: f32, text: &str) {
        let x = center_x - text_width(text, font, size) / 2.0;
        self.text(x, y, font, size, text);
    }

    fn fill_color(&mut self, (r, g, b): (f32, f32, f32)) {
        self.operations
            .push(Operation::new("rg", vec![real(r), real(g), real(b)]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: (f32, f32, f32)) {
        self.operations.push(Operation::new("q", vec![]));
        self.fill_color(color);
        self.operations.push(Operation::new(
            "re",
            vec![real(x), real(y), real(width), real(height)],
        ));
        self.operations.push(Operation::new("f", vec![]));
        self.operations.push(Operation::new("Q", vec![]));
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, gray: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("G", vec![real(gray)]),
            Operation::new("w", vec![real(width)]),
            Operation::new("m", vec![real(from.0), real(from.1)]),
            Operation::new("l", vec![real(to.0), real(to.1)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new("G", vec![real(GRID_GRAY)]),
            Operation::new("w", vec![real(0.5)]),
            Operation::new("re", vec![real(x), real(y), real(width), real(height)]),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }
}

fn column_widths() -> [f32; 8] {
    COLUMN_WIDTHS_CM.map(|cm| cm * CM)
}

/// Draws one table row whose top edge sits at `top`.
fn draw_row(canvas: &mut Canvas, top: f32, height: f32, cells: &[&str], font: Font, header: bool) {
    let mut x = MARGIN;
    let baseline = top - height / 2.0 - TABLE_FONT_SIZE / 3.0;

    for (width, cell) in column_widths().iter().zip(cells) {
        canvas.stroke_rect(x, top - height, *width, height);
        let text = fit_text(cell, font, TABLE_FONT_SIZE, width - 2.0 * CELL_PADDING);
        if header {
            canvas.fill_color((1.0, 1.0, 1.0));
        }
        canvas.centered_text(x + width / 2.0, baseline, font, TABLE_FONT_SIZE, &text);
        if header {
            canvas.fill_color((0.0, 0.0, 0.0));
        }
        x += width;
    }
}

fn draw_table_header(canvas: &mut Canvas, top: f32) {
    canvas.fill_rect(
        MARGIN,
        top - HEADER_ROW_HEIGHT,
        CONTENT_WIDTH,
        HEADER_ROW_HEIGHT,
        HEADER_FILL,
    );
    draw_row(canvas, top, HEADER_ROW_HEIGHT, &EXPORT_COLUMNS, Font::Bold, true);
}

/// Title block of the first page. Returns the y where the table starts.
fn draw_title_block(canvas: &mut Canvas, header: &ExportHeader) -> f32 {
    let center = PAGE_WIDTH / 2.0;
    let mut y = TOP - 16.0;

    canvas.centered_text(center, y, Font::Bold, 16.0, &header.organization);
    y -= 22.0;
    canvas.centered_text(center, y, Font::Bold, 13.0, &header.title);
    y -= 26.0;
    canvas.centered_text(center, y, Font::Regular, 11.0, &header.period_line());
    y -= 15.0;
    canvas.centered_text(center, y, Font::Regular, 11.0, &header.total_line());
    y -= 15.0;
    canvas.centered_text(center, y, Font::Regular, 11.0, &header.deduction_line());
    y -= 14.0;
    canvas.line((MARGIN, y), (PAGE_WIDTH - MARGIN, y), 1.0, 0.0);

    y - 14.0
}

fn draw_signatures(canvas: &mut Canvas, header: &ExportHeader, top: f32) {
    let left = MARGIN + CONTENT_WIDTH / 4.0;
    let right = MARGIN + CONTENT_WIDTH * 3.0 / 4.0;
    let rule_width = CONTENT_WIDTH / 2.0 - 30.0;

    let mut y = top - 20.0;
    canvas.text(MARGIN, y, Font::Regular, 10.0, "Assinaturas:");
    y -= 50.0;

    for center in [left, right] {
        canvas.line((center - rule_width / 2.0, y), (center + rule_width / 2.0, y), 0.8, 0.0);
    }
    y -= 14.0;
    canvas.centered_text(left, y, Font::Bold, 10.0, &header.supervisor.caption());
    canvas.centered_text(right, y, Font::Bold, 10.0, &header.employee.caption());
    y -= 18.0;
    for center in [left, right] {
        canvas.centered_text(center, y, Font::Regular, 10.0, "Data: _____ / _____ / _________");
    }
}

/// Lays out the title block, the record table and the signature block over
/// as many pages as needed, repeating the column header on each page.
fn layout_pages(records: &[StoredRecord], header: &ExportHeader) -> Vec<Canvas> {
    let mut pages = Vec::new();
    let mut canvas = Canvas::new();

    let mut y = draw_title_block(&mut canvas, header);
    draw_table_header(&mut canvas, y);
    y -= HEADER_ROW_HEIGHT;

    for (index, record) in records.iter().enumerate() {
        if y - ROW_HEIGHT < BOTTOM {
            pages.push(std::mem::replace(&mut canvas, Canvas::new()));
            y = TOP;
            draw_table_header(&mut canvas, y);
            y -= HEADER_ROW_HEIGHT;
        }

        if index % 2 == 1 {
            canvas.fill_rect(MARGIN, y - ROW_HEIGHT, CONTENT_WIDTH, ROW_HEIGHT, STRIPE_FILL);
        }
        let cells = [
            record.date.as_str(),
            record.weekday.as_str(),
            record.entry.as_str(),
            record.exit.as_str(),
            record.worked.as_str(),
            record.lateness.as_str(),
            record.deduction.as_str(),
            record.note.as_str(),
        ];
        draw_row(&mut canvas, y, ROW_HEIGHT, &cells, Font::Regular, false);
        y -= ROW_HEIGHT;
    }

    if y - SIGNATURE_BLOCK_HEIGHT < BOTTOM {
        pages.push(std::mem::replace(&mut canvas, Canvas::new()));
        y = TOP;
    }
    draw_signatures(&mut canvas, header, y);
    pages.push(canvas);

    let count = pages.len();
    for (number, page) in pages.iter_mut().enumerate() {
        page.centered_text(
            PAGE_WIDTH / 2.0,
            FOOTER_Y,
            Font::Regular,
            8.0,
            &format!("Página {} de {}", number + 1, count),
        );
    }

    pages
}

/// Renders the printable attendance book for one period.
pub fn to_printable_document_bytes(
    records: &[StoredRecord],
    header: &ExportHeader,
) -> Result<Vec<u8>, ExportError> {
    let pages = layout_pages(records, header);
    info!(
        "Laid out {} records over {} page(s)",
        records.len(),
        pages.len()
    );

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for canvas in pages {
        let content = Content {
            operations: canvas.operations,
        };
        let encoded = match content.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode page content: {}", e);
                return Err(ExportError::Pdf(e.to_string()));
            }
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                real(PAGE_WIDTH),
                real(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_text(&header.title), StringFormat::Literal),
        "Subject" => Object::String(encode_text(&header.period_label), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut output_buffer: Vec<u8> = Vec::new();
    match doc.save_to(&mut output_buffer) {
        Ok(_) => {
            info!(
                "Successfully converted PDF to bytes, size: {} bytes",
                output_buffer.len()
            );
            Ok(output_buffer)
        }
        Err(e) => {
            error!("Failed to convert PDF to bytes: {}", e);
            Err(ExportError::Pdf(e.to_string()))
        }
    }
}
