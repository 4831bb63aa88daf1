//! Intercom sheet generation.
//!
//! Lays the directory out on a single worksheet: a merged two-row header, a
//! bordered `A1:C20` block, and one cell per extension filled top to bottom,
//! 14 cells per column across three columns. The paging rule in
//! [`GridCursor`] is reproduced as-is, including the 15-row jump when the
//! cursor wraps back to the first column.

use crate::error::ReportError;
use crate::model::ExtensionRow;
use chrono::NaiveDate;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use tracing::debug;
use umya_spreadsheet::{
    Border, HorizontalAlignmentValues, Style, VerticalAlignmentValues, Worksheet,
};

pub const SHEET_NAME: &str = "Intercom List";
pub const REPORT_TITLE: &str = "Intercom List";
pub const REPORT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const GRID_COLUMNS: u32 = 3;
pub const ROWS_PER_COLUMN: usize = 14;
pub const FIRST_DATA_ROW: u32 = 3;
pub const PAGE_ROW_OFFSET: u32 = 15;
pub const BORDERED_LAST_ROW: u32 = 20;
pub const COLUMN_WIDTH: f64 = 25.0;

const COLUMN_LETTERS: [&str; GRID_COLUMNS as usize] = ["A", "B", "C"];
const BORDER_COLOR: &str = "FF000000";
const TITLE_FONT_SIZE: f64 = 14.0;
const DATE_FONT_SIZE: f64 = 12.0;
const ENTRY_FONT_SIZE: f64 = 10.0;

/// 1-based worksheet position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub row: u32,
    pub column: u32,
}

impl CellPosition {
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// `(column, row)`, the order the spreadsheet API expects.
    pub fn coordinates(&self) -> (u32, u32) {
        (self.column, self.row)
    }
}

/// Walks the placement sequence for extension cells.
///
/// Yields the cell for record 1, 2, 3 ... and never terminates.
#[derive(Debug, Clone)]
pub struct GridCursor {
    row: u32,
    column: u32,
    placed: usize,
}

impl GridCursor {
    pub fn new() -> Self {
        Self {
            row: FIRST_DATA_ROW,
            column: 1,
            placed: 0,
        }
    }
}

impl Default for GridCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for GridCursor {
    type Item = CellPosition;

    fn next(&mut self) -> Option<CellPosition> {
        let current = CellPosition::new(self.row, self.column);
        self.placed += 1;
        self.row += 1;
        if self.placed % ROWS_PER_COLUMN == 0 {
            self.row = FIRST_DATA_ROW;
            self.column += 1;
            if self.column > GRID_COLUMNS {
                self.column = 1;
                self.row += PAGE_ROW_OFFSET;
            }
        }
        Some(current)
    }
}

/// Cell for the `index`-th record, counting from 1. Index 0 is treated as 1.
pub fn grid_position(index: usize) -> CellPosition {
    GridCursor::new()
        .nth(index.saturating_sub(1))
        .unwrap_or(CellPosition::new(FIRST_DATA_ROW, 1))
}

/// `19 Oct 2026` style date used in the header and attachment name.
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

pub fn report_filename(date: NaiveDate) -> String {
    format!("Telecom_Report_{}.xlsx", format_report_date(date))
}

pub fn updated_date_caption(date: NaiveDate) -> String {
    format!("Updated Date: {}", format_report_date(date))
}

/// Serialized workbook held in memory behind a read cursor.
///
/// Reading consumes the cursor the way a file handle would; call
/// [`ReportDocument::rewind`] before handing it to the next reader.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    cursor: Cursor<Vec<u8>>,
    generated_on: NaiveDate,
    entries: usize,
}

impl ReportDocument {
    fn new(bytes: Vec<u8>, generated_on: NaiveDate, entries: usize) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            generated_on,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn generated_on(&self) -> NaiveDate {
        self.generated_on
    }

    /// Number of extension cells written.
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn filename(&self) -> String {
        report_filename(self.generated_on)
    }

    pub fn rewind(&mut self) {
        self.cursor.set_position(0);
    }

    /// Reads from the current position to the end.
    pub fn read_all(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len());
        self.cursor.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.cursor.get_ref()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl Read for ReportDocument {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for ReportDocument {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// Builds the intercom workbook for `rows`, dated `today`.
pub fn generate_report(rows: &[ExtensionRow], today: NaiveDate) -> Result<ReportDocument, ReportError> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let sheet = book
        .new_sheet(SHEET_NAME)
        .map_err(|reason| ReportError::Worksheet {
            sheet: SHEET_NAME.to_string(),
            reason: reason.to_string(),
        })?;

    write_header(sheet, today);
    apply_grid_borders(sheet);
    apply_column_layout(sheet);

    for (row, position) in rows.iter().zip(GridCursor::new()) {
        sheet
            .get_cell_mut(position.coordinates())
            .set_value(row.cell_text());
        let style = sheet.get_style_mut(position.coordinates());
        {
            let font = style.get_font_mut();
            font.set_bold(true);
            font.set_size(ENTRY_FONT_SIZE);
        }
        center_wrapped(style);
    }

    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor)
        .map_err(|err| ReportError::Serialize(err.to_string()))?;

    debug!(
        entries = rows.len(),
        bytes = cursor.get_ref().len(),
        "intercom report generated"
    );

    Ok(ReportDocument::new(cursor.into_inner(), today, rows.len()))
}

fn write_header(sheet: &mut Worksheet, today: NaiveDate) {
    let header = [
        (1u32, REPORT_TITLE.to_string(), TITLE_FONT_SIZE),
        (2u32, updated_date_caption(today), DATE_FONT_SIZE),
    ];
    for (row, text, size) in header {
        sheet.add_merge_cells(format!("A{row}:C{row}"));
        sheet.get_cell_mut((1, row)).set_value(text);
        let style = sheet.get_style_mut((1, row));
        {
            let font = style.get_font_mut();
            font.set_bold(true);
            font.set_size(size);
        }
        let alignment = style.get_alignment_mut();
        alignment.set_horizontal(HorizontalAlignmentValues::Center);
        alignment.set_vertical(VerticalAlignmentValues::Center);
    }
}

fn apply_grid_borders(sheet: &mut Worksheet) {
    for row in 1..=BORDERED_LAST_ROW {
        for column in 1..=GRID_COLUMNS {
            let borders = sheet.get_style_mut((column, row)).get_borders_mut();
            thin_black(borders.get_left_border_mut());
            thin_black(borders.get_right_border_mut());
            thin_black(borders.get_top_border_mut());
            thin_black(borders.get_bottom_border_mut());
        }
    }
}

fn thin_black(border: &mut Border) {
    border.set_border_style(Border::BORDER_THIN);
    border.get_color_mut().set_argb(BORDER_COLOR);
}

/// Fixed width plus centered wrapping for every populated row of A-C.
fn apply_column_layout(sheet: &mut Worksheet) {
    let last_row = sheet.get_highest_row();
    for (index, letter) in COLUMN_LETTERS.iter().enumerate() {
        let column = index as u32 + 1;
        sheet.get_column_dimension_mut(letter).set_width(COLUMN_WIDTH);
        for row in 1..=last_row {
            center_wrapped(sheet.get_style_mut((column, row)));
        }
    }
}

fn center_wrapped(style: &mut Style) {
    let alignment = style.get_alignment_mut();
    alignment.set_wrap_text(true);
    alignment.set_horizontal(HorizontalAlignmentValues::Center);
    alignment.set_vertical(VerticalAlignmentValues::Center);
}
