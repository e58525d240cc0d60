//! Domain types for student records and the sources they come from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class number within a grade (the `5` in "3-5").
pub type ClassId = u32;

/// Length of a canonical student id (`GCCNN`).
pub const STUDENT_ID_LEN: usize = 5;

/// A student id, compared as an exact string.
///
/// The canonical form is five ASCII digits `GCCNN`: grade, zero-padded class,
/// zero-padded number. Ids that do not match are still usable as join keys
/// but are flagged by [`StudentId::is_canonical`] so loaders can report them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(String);

impl StudentId {
    /// Create an id from raw cell text. Only surrounding whitespace is removed.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    /// Compose the canonical id from grade, class and number.
    pub fn compose(grade: u32, class_id: ClassId, number: u32) -> Self {
        Self(format!("{}{:02}{:02}", grade % 10, class_id, number))
    }

    /// The id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is exactly five ASCII digits.
    pub fn is_canonical(&self) -> bool {
        self.0.len() == STUDENT_ID_LEN && self.0.bytes().all(|b| b.is_ascii_digit())
    }

    /// Class encoded in digits 2-3 of a canonical id.
    pub fn class_id(&self) -> Option<ClassId> {
        if !self.is_canonical() {
            return None;
        }
        self.0[1..3].parse().ok().filter(|&c| c > 0)
    }

    /// Student number encoded in digits 4-5 of a canonical id.
    pub fn number(&self) -> Option<u32> {
        if !self.is_canonical() {
            return None;
        }
        self.0[3..5].parse().ok()
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row from the seating source: the primary stream of the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatingRecord {
    pub student_id: StudentId,
    pub name: String,
    pub class_id: ClassId,
    /// 1-based seat row, counted from the back of the room.
    pub row: u32,
    /// 1-based seat column.
    pub col: u32,
}

/// A record placed at a seat of a class.
pub trait Seated {
    fn student_id(&self) -> &StudentId;

    /// `(class, row, col)` of the seat.
    fn seat(&self) -> (ClassId, u32, u32);
}

impl Seated for SeatingRecord {
    fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    fn seat(&self) -> (ClassId, u32, u32) {
        (self.class_id, self.row, self.col)
    }
}

/// A row from the score source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub student_id: StudentId,
    pub score: f64,
}

/// A row from the photo source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub student_id: StudentId,
    pub photo_ref: String,
}

/// One student's merged view across seating, score and photo sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: StudentId,
    pub name: String,
    pub class_id: ClassId,
    pub row: u32,
    pub col: u32,
    /// Score in `[0, 100]`; `None` when no score row matched.
    pub score: Option<f64>,
    /// Opaque photo reference; `None` when no photo row matched.
    pub photo_ref: Option<String>,
}

impl StudentRecord {
    /// Start a unified record from a seating row with no optional fields.
    pub fn from_seating(seat: SeatingRecord) -> Self {
        Self {
            student_id: seat.student_id,
            name: seat.name,
            class_id: seat.class_id,
            row: seat.row,
            col: seat.col,
            score: None,
            photo_ref: None,
        }
    }

    /// Whether both optional fields are present.
    pub fn is_complete(&self) -> bool {
        self.score.is_some() && self.photo_ref.is_some()
    }
}

impl Seated for StudentRecord {
    fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    fn seat(&self) -> (ClassId, u32, u32) {
        (self.class_id, self.row, self.col)
    }
}

/// A tabular source reduced to rows of optionally-empty cell strings.
///
/// Format backends (spreadsheet sheets, slide tables, CSV) produce sheets;
/// the extractors in [`crate::extract`] never see the binary format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    /// Sheet, slide or file name.
    pub name: String,
    /// Rows in source order; cells are `None` when empty.
    pub rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    /// Create an empty sheet with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// Append a row, mapping blank cells to `None`.
    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let row = cells
            .into_iter()
            .map(|cell| {
                cell.map(Into::into)
                    .filter(|text: &String| !text.trim().is_empty())
            })
            .collect();
        self.rows.push(row);
    }

    /// Cell at 0-based `(row, col)`, if present and non-empty.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }
}

/// The format of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// Comma-separated text.
    Csv,
    /// Excel workbook (Office Open XML).
    Xlsx,
    /// PowerPoint deck (Office Open XML).
    Pptx,
}

impl SourceFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "pptx" => Some(Self::Pptx),
            _ => None,
        }
    }

    /// Detect format from file magic bytes and extension together.
    ///
    /// XLSX and PPTX are both ZIP archives (`PK\x03\x04`), so the extension
    /// decides between them. A ZIP with an unknown extension is rejected
    /// rather than guessed.
    pub fn detect(bytes: &[u8], ext: Option<&str>) -> Option<Self> {
        let by_ext = ext.and_then(Self::from_extension);

        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return match by_ext {
                Some(Self::Xlsx) => Some(Self::Xlsx),
                Some(Self::Pptx) => Some(Self::Pptx),
                _ => None,
            };
        }

        match by_ext {
            Some(Self::Csv) => Some(Self::Csv),
            Some(_) => None,
            // A header sample may end inside a multi-byte character.
            None if std::str::from_utf8(bytes).map_or_else(|e| e.error_len().is_none(), |_| true) => {
                Some(Self::Csv)
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_id_trims_but_keeps_zeros() {
        assert_eq!(StudentId::new(" 30102 ").as_str(), "30102");
        assert_eq!(StudentId::new("030102").as_str(), "030102");
        assert_ne!(StudentId::new("30102"), StudentId::new("030102"));
    }

    #[test]
    fn test_student_id_canonical() {
        assert!(StudentId::new("30102").is_canonical());
        assert!(!StudentId::new("030102").is_canonical());
        assert!(!StudentId::new("3010A").is_canonical());
        assert!(!StudentId::new("3012").is_canonical());
    }

    #[test]
    fn test_student_id_compose_and_decompose() {
        let id = StudentId::compose(3, 5, 7);
        assert_eq!(id.as_str(), "30507");
        assert_eq!(id.class_id(), Some(5));
        assert_eq!(id.number(), Some(7));
        assert_eq!(StudentId::new("30012").class_id(), None);
    }

    #[test]
    fn test_sheet_blank_cells_are_none() {
        let mut sheet = Sheet::new("3-1");
        sheet.push_row(vec![Some("30101 Kim"), Some("  "), None]);
        assert_eq!(sheet.cell(0, 0), Some("30101 Kim"));
        assert_eq!(sheet.cell(0, 1), None);
        assert_eq!(sheet.cell(0, 2), None);
        assert_eq!(sheet.cell(5, 0), None);
    }

    #[test]
    fn test_source_format_detection() {
        let zip = [0x50, 0x4B, 0x03, 0x04, 0, 0, 0, 0];
        assert_eq!(SourceFormat::detect(&zip, Some("xlsx")), Some(SourceFormat::Xlsx));
        assert_eq!(SourceFormat::detect(&zip, Some("PPTX")), Some(SourceFormat::Pptx));
        assert_eq!(SourceFormat::detect(&zip, Some("csv")), None);
        assert_eq!(SourceFormat::detect(&zip, None), None);
        assert_eq!(SourceFormat::detect(b"student_id,score\n", None), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::detect(b"student_id", Some("xlsx")), None);
    }
}
