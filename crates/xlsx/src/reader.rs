//! Workbook reading via calamine.

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use seat_core::{Error, Result, Sheet};
use std::io::{Read, Seek};
use std::path::Path;

/// Reader for XLSX workbooks.
#[derive(Debug, Clone, Default)]
pub struct XlsxReader;

impl XlsxReader {
    /// Create a reader that keeps every sheet.
    pub fn new() -> Self {
        Self
    }

    /// Read a workbook from disk.
    pub fn read_path(&self, path: &Path) -> Result<Vec<Sheet>> {
        let source_name = path.display().to_string();
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| Error::load(&source_name, format!("Failed to open XLSX: {}", e)))?;
        self.read_workbook(&mut workbook, &source_name)
    }

    /// Read a workbook from any seekable reader.
    pub fn read<RS: Read + Seek>(&self, reader: RS, source_name: &str) -> Result<Vec<Sheet>> {
        let mut workbook = Xlsx::new(reader)
            .map_err(|e| Error::load(source_name, format!("Failed to open XLSX: {}", e)))?;
        self.read_workbook(&mut workbook, source_name)
    }

    fn read_workbook<RS: Read + Seek>(
        &self,
        workbook: &mut Xlsx<RS>,
        source_name: &str,
    ) -> Result<Vec<Sheet>> {
        let mut sheets = Vec::new();

        for name in workbook.sheet_names().to_vec() {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                Error::load(source_name, format!("Failed to read sheet '{}': {}", name, e))
            })?;
            sheets.push(range_to_sheet(&name, &range));
        }

        if sheets.is_empty() {
            return Err(Error::load(source_name, "workbook has no sheets"));
        }
        log::debug!("{}: read {} sheets", source_name, sheets.len());
        Ok(sheets)
    }
}

/// Copy a used range into a sheet anchored at A1.
///
/// Calamine ranges start at the first used cell; leading rows and columns
/// are padded so sheet positions match the workbook grid.
pub fn range_to_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut sheet = Sheet::new(name);
    let Some((start_row, start_col)) = range.start() else {
        return sheet;
    };

    for _ in 0..start_row {
        sheet.push_row(std::iter::empty::<Option<String>>());
    }
    for row in range.rows() {
        let padding = std::iter::repeat_with(|| None).take(start_col as usize);
        sheet.push_row(padding.chain(row.iter().map(cell_text)));
    }
    sheet
}

/// Cell text as a user would read it in the spreadsheet.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(format_number(*f)),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::Error(e) => {
            log::debug!("Ignoring cell error {:?}", e);
            None
        }
        Data::DateTime(dt) => Some(format_number(dt.as_f64())),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Integral floats print without a fraction so `30501.0` reads as `30501`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(30501.0), "30501");
        assert_eq!(format_number(72.5), "72.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Float(95.0)), Some("95".to_string()));
        assert_eq!(cell_text(&Data::Int(7)), Some("7".to_string()));
        assert_eq!(
            cell_text(&Data::String("30501 권민지".to_string())),
            Some("30501 권민지".to_string())
        );
    }

    #[test]
    fn test_range_is_anchored_at_a1() {
        let mut range = Range::new((1, 2), (2, 3));
        range.set_value((1, 2), Data::String("30501 Kim".to_string()));
        range.set_value((2, 3), Data::Float(30502.0));

        let sheet = range_to_sheet("3-5", &range);
        assert_eq!(sheet.name, "3-5");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.cell(1, 2), Some("30501 Kim"));
        assert_eq!(sheet.cell(2, 3), Some("30502"));
        assert_eq!(sheet.cell(0, 0), None);
    }

    #[test]
    fn test_seating_extraction_from_range() {
        let mut range = Range::new((0, 0), (1, 1));
        range.set_value((0, 1), Data::String("30502 Lee".to_string()));
        range.set_value((1, 0), Data::String("30501 Kim".to_string()));

        let sheet = range_to_sheet("3-5(C)", &range);
        let records = seat_core::SeatingExtractor::new()
            .extract_sheet(&sheet)
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].row, records[0].col), (1, 2));
        assert_eq!((records[1].row, records[1].col), (2, 1));
    }

    #[test]
    fn test_garbage_is_load_error() {
        let err = XlsxReader::new()
            .read(std::io::Cursor::new(b"not a workbook".to_vec()), "seats.xlsx")
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
