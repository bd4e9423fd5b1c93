//! Spreadsheet rendering: write records to an `.xlsx` workbook.
//!
//! One header row, then one row per record in report order. The "Current
//! Value" cell is coloured by status: red font for `High`, orange for `Low`,
//! unstyled for `Normal`. Absent prior values leave their cells empty.
//!
//! Workbooks are written atomically (temp file + rename) so a reader never
//! sees a half-written file in the outputs directory.

use crate::error::LabSheetError;
use crate::record::{LabResultRecord, Status};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Column headers, in sheet order.
pub const COLUMNS: [&str; 8] = [
    "Test",
    "Previous Value",
    "Previous Date",
    "Current Value",
    "Change",
    "Unit",
    "Reference Range",
    "Status",
];

const CURRENT_VALUE_COL: u16 = 3;

/// Minute-granularity timestamp used in output file names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Visual marker applied to the "Current Value" cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellMarker {
    /// Above the reference range.
    Alert,
    /// Below the reference range.
    Caution,
}

impl CellMarker {
    pub fn for_status(status: Status) -> Option<Self> {
        match status {
            Status::High => Some(CellMarker::Alert),
            Status::Low => Some(CellMarker::Caution),
            Status::Normal => None,
        }
    }

    pub fn font_color(self) -> Color {
        match self {
            CellMarker::Alert => Color::Red,
            CellMarker::Caution => Color::Orange,
        }
    }

    fn format(self) -> Format {
        Format::new().set_font_color(self.font_color())
    }
}

/// `2025-01-31_09-15`
pub fn timestamp_label(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Name of the workbook saved in the outputs directory.
pub fn summary_file_name(timestamp: &str) -> String {
    format!("report_summary_{timestamp}.xlsx")
}

/// Name offered to the user when downloading the workbook.
pub fn download_file_name(timestamp: &str) -> String {
    format!("Medical_Report_{timestamp}.xlsx")
}

/// Render `records` into an in-memory `.xlsx` file.
pub fn render_workbook(
    records: &[LabResultRecord],
    sheet_name: &str,
) -> Result<Vec<u8>, LabSheetError> {
    let mut workbook = build_workbook(records, sheet_name)?;
    Ok(workbook.save_to_buffer()?)
}

/// Render `records` and write the workbook to `path`, creating parent
/// directories as needed.
pub fn write_workbook(
    records: &[LabResultRecord],
    sheet_name: &str,
    path: &Path,
) -> Result<PathBuf, LabSheetError> {
    let bytes = render_workbook(records, sheet_name)?;
    let write_err = |e: std::io::Error| LabSheetError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    // Atomic write: write to temp, then rename
    let tmp_path = path.with_extension("xlsx.tmp");
    std::fs::write(&tmp_path, &bytes).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;

    info!(
        "Wrote {} rows ({} bytes) to {}",
        records.len(),
        bytes.len(),
        path.display()
    );
    Ok(path.to_path_buf())
}

fn build_workbook(records: &[LabResultRecord], sheet_name: &str) -> Result<Workbook, LabSheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    let header = Format::new().set_bold();
    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (i, record) in records.iter().enumerate() {
        write_row(worksheet, i as u32 + 1, record)?;
    }

    worksheet.autofit();
    debug!("Built sheet '{}' with {} rows", sheet_name, records.len());
    Ok(workbook)
}

fn write_row(sheet: &mut Worksheet, row: u32, record: &LabResultRecord) -> Result<(), LabSheetError> {
    sheet.write_string(row, 0, record.test_name())?;
    if let Some(prev) = record.previous_value() {
        sheet.write_number(row, 1, prev)?;
    }
    if let Some(date) = record.previous_date() {
        sheet.write_string(row, 2, date)?;
    }

    match CellMarker::for_status(record.status()) {
        Some(marker) => {
            sheet.write_number_with_format(
                row,
                CURRENT_VALUE_COL,
                record.current_value(),
                &marker.format(),
            )?;
        }
        None => {
            sheet.write_number(row, CURRENT_VALUE_COL, record.current_value())?;
        }
    }

    if let Some(change) = record.change() {
        sheet.write_number(row, 4, change)?;
    }
    sheet.write_string(row, 5, record.unit())?;
    sheet.write_string(row, 6, record.reference_range())?;
    sheet.write_string(row, 7, record.status().as_str())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::PriorResult;
    use chrono::NaiveDate;
    use std::io::{Cursor, Read};

    fn sample_records() -> Vec<LabResultRecord> {
        vec![
            LabResultRecord::new(
                "Hemoglobin",
                "g/dL",
                11.0,
                13.0,
                17.0,
                Some(PriorResult::new(13.2, "2024-12-15")),
            ),
            LabResultRecord::new("Platelet Count", "/uL", 250000.0, 150000.0, 450000.0, None),
            LabResultRecord::new("Triglyceride", "mg/dL", 160.0, 0.0, 150.0, None),
        ]
    }

    fn workbook_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    /// The `<c .../>` start tag of cell `cell_ref`, if the cell was written.
    fn cell_tag<'a>(sheet: &'a str, cell_ref: &str) -> Option<&'a str> {
        let start = sheet.find(&format!("<c r=\"{cell_ref}\""))?;
        let end = start + sheet[start..].find('>')?;
        Some(&sheet[start..end])
    }

    fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
        let key = format!(" {name}=\"");
        let start = tag.find(&key)? + key.len();
        let end = start + tag[start..].find('"')?;
        Some(&tag[start..end])
    }

    /// Font colour (`FFRRGGBB`) of cell format `xf_index`.
    fn font_rgb(styles: &str, xf_index: usize) -> Option<String> {
        let xfs_start = styles.find("<cellXfs")?;
        let xfs = &styles[xfs_start..xfs_start + styles[xfs_start..].find("</cellXfs>")?];
        let xf = xfs.split("<xf ").nth(xf_index + 1)?;
        let font_id: usize = attr(&format!(" {xf}"), "fontId")?.parse().ok()?;

        let fonts_start = styles.find("<fonts")?;
        let fonts = &styles[fonts_start..fonts_start + styles[fonts_start..].find("</fonts>")?];
        let font = fonts.split("<font>").nth(font_id + 1)?;
        let color = &font[font.find("<color ")?..];
        attr(color, "rgb").map(str::to_string)
    }

    #[test]
    fn sheet_cells_follow_records() {
        let bytes = render_workbook(&sample_records(), "Report").unwrap();
        let sheet = workbook_part(&bytes, "xl/worksheets/sheet1.xml");
        let styles = workbook_part(&bytes, "xl/styles.xml");
        let strings = workbook_part(&bytes, "xl/sharedStrings.xml");

        // header + one row per record
        assert!(sheet.contains("<row r=\"4\""));
        assert!(!sheet.contains("<row r=\"5\""));

        // headers in column order
        let positions: Vec<usize> = COLUMNS
            .iter()
            .map(|h| strings.find(&format!(">{h}<")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
        for col in ["A", "B", "C", "D", "E", "F", "G", "H"] {
            assert!(cell_tag(&sheet, &format!("{col}1")).is_some(), "{col}1");
        }

        // Hemoglobin has a prior value; Platelet Count does not
        assert!(cell_tag(&sheet, "B2").is_some());
        assert!(cell_tag(&sheet, "C2").is_some());
        assert!(cell_tag(&sheet, "E2").is_some());
        for cell in ["B3", "C3", "E3"] {
            assert!(cell_tag(&sheet, cell).is_none(), "{cell} should be blank");
        }
        assert!(sheet.contains("<v>250000</v>"));

        // Current Value: Low orange, Normal unstyled, High red
        let style_of = |cell: &str| -> usize {
            attr(cell_tag(&sheet, cell).unwrap(), "s")
                .unwrap_or_else(|| panic!("{cell} has no style"))
                .parse()
                .unwrap()
        };
        assert_eq!(font_rgb(&styles, style_of("D2")).as_deref(), Some("FFFF6600"));
        assert_eq!(font_rgb(&styles, style_of("D4")).as_deref(), Some("FFFF0000"));
        assert_eq!(attr(cell_tag(&sheet, "D3").unwrap(), "s"), None);
    }

    #[test]
    fn markers_by_status() {
        assert_eq!(CellMarker::for_status(Status::High), Some(CellMarker::Alert));
        assert_eq!(CellMarker::for_status(Status::Low), Some(CellMarker::Caution));
        assert_eq!(CellMarker::for_status(Status::Normal), None);
        assert_ne!(
            CellMarker::Alert.font_color(),
            CellMarker::Caution.font_color()
        );
    }

    #[test]
    fn file_names_use_minute_timestamp() {
        let at = NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(9, 5, 59)
            .unwrap();
        let ts = timestamp_label(at);
        assert_eq!(ts, "2025-01-31_09-05");
        assert_eq!(summary_file_name(&ts), "report_summary_2025-01-31_09-05.xlsx");
        assert_eq!(download_file_name(&ts), "Medical_Report_2025-01-31_09-05.xlsx");
    }

    #[test]
    fn workbook_bytes_are_a_zip_container() {
        let bytes = render_workbook(&sample_records(), "Report").unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_record_list_still_renders_header() {
        let bytes = render_workbook(&[], "Report").unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn invalid_sheet_name_is_an_error() {
        let err = render_workbook(&sample_records(), "bad/name").unwrap_err();
        assert!(matches!(err, LabSheetError::Spreadsheet(_)), "got: {err:?}");
    }

    #[test]
    fn write_workbook_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("excel_outputs").join("report_summary_x.xlsx");

        let written = write_workbook(&sample_records(), "Report", &path).unwrap();
        assert_eq!(written, path);
        assert!(path.exists());
        assert!(!path.with_extension("xlsx.tmp").exists());
    }
}
