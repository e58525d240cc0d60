//! Record extraction from abstract sheets.
//!
//! Format backends hand over [`Sheet`]s; this module recognises seating
//! layouts, score tables and photo roster cells in them.

use crate::normalize::{
    normalize_name, parse_class_label, parse_score, parse_whole_number, score_in_range,
};
use crate::types::{ClassId, ScoreRecord, Seated, SeatingRecord, Sheet, StudentId};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// `30102 권민지`: five-digit id, whitespace, name.
static SEAT_CELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})\s+([^\d\s][^\d]*)").unwrap());

/// `3학년 1반 2번 권민지`: grade, class, number, name.
static ROSTER_CELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\s*학년\s*(\d+)\s*반\s*(\d+)\s*번\s*(.+)").unwrap());

/// Extracts seating records from seating-chart sheets.
///
/// Each sheet is one class, named so that [`parse_class_label`] resolves it
/// (`"3-5(C)"`). Any cell reading `NNNNN name` is a seated student at the
/// cell's 1-based position.
#[derive(Debug, Clone, Default)]
pub struct SeatingExtractor;

impl SeatingExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Seating records of one sheet, or `None` when its name has no class.
    pub fn extract_sheet(&self, sheet: &Sheet) -> Option<Vec<SeatingRecord>> {
        let class_id = parse_class_label(&sheet.name)?;
        let mut records = Vec::new();

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let Some(text) = cell.as_deref() else {
                    continue;
                };
                if let Some(caps) = SEAT_CELL_REGEX.captures(text.trim()) {
                    records.push(SeatingRecord {
                        student_id: StudentId::new(&caps[1]),
                        name: normalize_name(&caps[2]),
                        class_id,
                        row: (row_idx + 1) as u32,
                        col: (col_idx + 1) as u32,
                    });
                }
            }
        }

        log::debug!(
            "Sheet '{}': class {}, {} students",
            sheet.name,
            class_id,
            records.len()
        );
        Some(records)
    }

    /// Seating records of every sheet, in sheet order.
    ///
    /// Sheets without a class label are skipped with a warning. A student id
    /// seen on an earlier seat keeps that seat; later ones are reported and
    /// dropped.
    pub fn extract(&self, sheets: &[Sheet]) -> Vec<SeatingRecord> {
        let mut records = Vec::new();
        for sheet in sheets {
            let Some(sheet_records) = self.extract_sheet(sheet) else {
                log::warn!("Skipping sheet '{}': no class number in its name", sheet.name);
                continue;
            };
            for record in &sheet_records {
                if !record.student_id.is_canonical() {
                    log::warn!("Non-canonical student id '{}' in sheet '{}'", record.student_id, sheet.name);
                }
            }
            records.extend(sheet_records);
        }
        keep_first_seat(records, "seating workbook")
    }
}

/// Drop every record whose student id already holds an earlier seat.
///
/// Order is preserved; each dropped seat is reported.
pub fn keep_first_seat<T: Seated>(records: impl IntoIterator<Item = T>, source_name: &str) -> Vec<T> {
    let mut seen: HashSet<StudentId> = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let first = seen.insert(record.student_id().clone());
            if !first {
                let (class_id, row, col) = record.seat();
                log::warn!(
                    "{}: student {} seated twice; keeping the first seat, dropping class {} ({}, {})",
                    source_name,
                    record.student_id(),
                    class_id,
                    row,
                    col
                );
            }
            first
        })
        .collect()
}

/// Layout of a score table: student numbers down the first column, one
/// column per class under a header such as `1반` or `3-1`.
#[derive(Debug, Clone)]
pub struct ScoreSheetLayout {
    /// Grade digit used to compose student ids.
    grade: u32,
}

impl Default for ScoreSheetLayout {
    fn default() -> Self {
        Self { grade: 3 }
    }
}

impl ScoreSheetLayout {
    /// Create a layout for grade 3.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different grade digit.
    pub fn with_grade(mut self, grade: u32) -> Self {
        self.grade = grade % 10;
        self
    }

    /// Grade digit used to compose ids.
    pub fn grade(&self) -> u32 {
        self.grade
    }

    /// Score records from a score sheet.
    ///
    /// Rows above the header are ignored. Non-numeric and out-of-range
    /// scores are reported and skipped.
    pub fn extract(&self, sheet: &Sheet) -> Vec<ScoreRecord> {
        let Some((header_idx, columns)) = find_class_header(sheet) else {
            log::warn!("Sheet '{}': no class header row found", sheet.name);
            return Vec::new();
        };

        let mut records = Vec::new();
        for row in sheet.rows.iter().skip(header_idx + 1) {
            let Some(number) = row
                .first()
                .and_then(|c| c.as_deref())
                .and_then(parse_whole_number)
            else {
                continue;
            };

            for &(col_idx, class_id) in &columns {
                let Some(text) = row.get(col_idx).and_then(|c| c.as_deref()) else {
                    continue;
                };
                let student_id = StudentId::compose(self.grade, class_id, number);
                match parse_score(text) {
                    Some(score) if score_in_range(score) => {
                        records.push(ScoreRecord { student_id, score });
                    }
                    Some(score) => {
                        log::warn!("Score {} for {} is outside [0, 100]; ignored", score, student_id);
                    }
                    None => {
                        log::warn!("Unreadable score '{}' for {}; ignored", text, student_id);
                    }
                }
            }
        }

        log::debug!("Sheet '{}': {} scores", sheet.name, records.len());
        records
    }
}

/// Locate the header row and its class columns.
fn find_class_header(sheet: &Sheet) -> Option<(usize, Vec<(usize, ClassId)>)> {
    sheet.rows.iter().enumerate().find_map(|(row_idx, row)| {
        let columns: Vec<(usize, ClassId)> = row
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(col_idx, cell)| {
                let text = cell.as_deref()?;
                is_class_header(text)
                    .then(|| parse_class_label(text))
                    .flatten()
                    .map(|class_id| (col_idx, class_id))
            })
            .collect();
        (!columns.is_empty()).then_some((row_idx, columns))
    })
}

/// Header cells must carry a class marker; bare numbers are data.
fn is_class_header(text: &str) -> bool {
    let text = text.trim();
    !text.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// A student named in a photo roster table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRosterEntry {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub name: String,
}

impl PhotoRosterEntry {
    /// Parse `3학년 1반 2번 권민지`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = ROSTER_CELL_REGEX.captures(text.trim())?;
        let grade: u32 = caps[1].parse().ok()?;
        let class_id: ClassId = caps[2].parse().ok().filter(|&c| c > 0)?;
        let number: u32 = caps[3].parse().ok()?;
        let name = normalize_name(&caps[4]);
        if name.is_empty() {
            return None;
        }

        Some(Self {
            student_id: StudentId::compose(grade, class_id, number),
            class_id,
            name,
        })
    }

    /// File name for this student's extracted photo.
    pub fn photo_file_name(&self, extension: &str) -> String {
        let safe_name: String = self
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{}.{}", self.student_id, safe_name, extension.to_lowercase())
    }
}

/// Roster entries found in a table, row-major.
pub fn roster_entries(sheet: &Sheet) -> Vec<PhotoRosterEntry> {
    sheet
        .rows
        .iter()
        .flatten()
        .filter_map(|cell| cell.as_deref())
        .filter_map(PhotoRosterEntry::parse)
        .collect()
}

/// Pair roster entries with pictures in order.
///
/// Returns the pairs and the pictures left over once entries run out.
pub fn pair_with_pictures<P>(
    entries: Vec<PhotoRosterEntry>,
    pictures: Vec<P>,
) -> (Vec<(PhotoRosterEntry, P)>, Vec<P>) {
    let mut pictures = pictures.into_iter();
    let pairs: Vec<(PhotoRosterEntry, P)> = entries
        .into_iter()
        .zip(pictures.by_ref())
        .collect();
    (pairs, pictures.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, rows: Vec<Vec<Option<&str>>>) -> Sheet {
        let mut sheet = Sheet::new(name);
        for row in rows {
            sheet.push_row(row);
        }
        sheet
    }

    #[test]
    fn test_seating_positions_are_one_based() {
        let s = sheet(
            "3-5(C)",
            vec![
                vec![Some("30501 권민지"), None, Some("30502 김하늘")],
                vec![None, None, None],
                vec![None, Some("교탁"), None],
                vec![Some("30503  이 준 ")],
            ],
        );
        let records = SeatingExtractor::new().extract_sheet(&s).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].student_id.as_str(), "30501");
        assert_eq!(records[0].name, "권민지");
        assert_eq!((records[0].row, records[0].col), (1, 1));
        assert_eq!((records[1].row, records[1].col), (1, 3));
        assert_eq!(records[2].name, "이 준");
        assert_eq!((records[2].row, records[2].col), (4, 1));
        assert!(records.iter().all(|r| r.class_id == 5));
    }

    #[test]
    fn test_sheet_without_class_is_skipped() {
        let sheets = vec![
            sheet("Notes", vec![vec![Some("30101 Kim")]]),
            sheet("3-2", vec![vec![Some("30201 Lee")]]),
        ];
        let records = SeatingExtractor::new().extract(&sheets);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].class_id, 2);
    }

    #[test]
    fn test_repeated_student_keeps_first_seat() {
        let sheets = vec![sheet(
            "3-2",
            vec![vec![Some("30201 Lee"), Some("30201 Lee")]],
        )];
        let records = SeatingExtractor::new().extract(&sheets);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].col, 1);
    }

    #[test]
    fn test_score_sheet_extraction() {
        let s = sheet(
            "score",
            vec![
                vec![Some("Midterm")],
                vec![Some("번호"), Some("1반"), Some("2반"), Some("열11")],
                vec![Some("1"), Some("88"), None, Some("999")],
                vec![Some("2.0"), Some("abc"), Some("40")],
                vec![Some("3"), Some("101"), Some("59.5점")],
                vec![None, Some("70")],
            ],
        );
        let records = ScoreSheetLayout::new().extract(&s);
        let pairs: Vec<(&str, f64)> = records
            .iter()
            .map(|r| (r.student_id.as_str(), r.score))
            .collect();

        assert_eq!(pairs, vec![("30101", 88.0), ("30202", 40.0), ("30203", 59.5)]);
    }

    #[test]
    fn test_score_sheet_grade_override() {
        let s = sheet(
            "score",
            vec![vec![Some("No"), Some("2-4")], vec![Some("9"), Some("77")]],
        );
        let records = ScoreSheetLayout::new().with_grade(2).extract(&s);
        assert_eq!(records[0].student_id.as_str(), "20409");
    }

    #[test]
    fn test_score_sheet_without_header() {
        let s = sheet("score", vec![vec![Some("1"), Some("88")]]);
        assert!(ScoreSheetLayout::new().extract(&s).is_empty());
    }

    #[test]
    fn test_roster_entry_parse() {
        let entry = PhotoRosterEntry::parse("3학년 1반 2번 권민지").unwrap();
        assert_eq!(entry.student_id.as_str(), "30102");
        assert_eq!(entry.class_id, 1);
        assert_eq!(entry.name, "권민지");
        assert_eq!(entry.photo_file_name("JPEG"), "30102_권민지.jpeg");

        assert!(PhotoRosterEntry::parse("3학년 0반 2번 권민지").is_none());
        assert!(PhotoRosterEntry::parse("담임: 홍길동").is_none());
    }

    #[test]
    fn test_pair_with_pictures_reports_surplus() {
        let s = sheet(
            "slide1",
            vec![vec![Some("3학년 1반 1번 가"), Some("3학년 1반 2번 나")]],
        );
        let entries = roster_entries(&s);
        let (pairs, rest) = pair_with_pictures(entries, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].1, "b.png");
        assert_eq!(rest, vec!["c.png"]);
    }
}
