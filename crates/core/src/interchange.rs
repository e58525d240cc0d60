//! CSV interchange for seating, score, photo and unified records.
//!
//! All files are UTF-8 with a header row. Files meant for spreadsheets start
//! with a byte order mark so Hangul names open correctly; readers accept it.
//! Optional fields are written as empty cells. A malformed row is reported and skipped; a missing column
//! fails the whole file.

use crate::error::{Error, Result};
use crate::extract::keep_first_seat;
use crate::grid::SeatGrid;
use crate::normalize::{normalize_name, score_in_range};
use crate::render::score_one_decimal;
use crate::types::{PhotoRecord, ScoreRecord, SeatingRecord, StudentId, StudentRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Columns of the unified file, in order.
pub const UNIFIED_COLUMNS: &[&str] = &[
    "student_id",
    "name",
    "class_id",
    "row",
    "col",
    "score",
    "photo_ref",
];

/// Columns of a seating file.
pub const SEATING_COLUMNS: &[&str] = &["student_id", "name", "class_id", "row", "col"];

/// Columns of a score file.
pub const SCORE_COLUMNS: &[&str] = &["student_id", "score"];

/// Columns of a photo file.
pub const PHOTO_COLUMNS: &[&str] = &["student_id", "photo_ref"];

/// Columns of a per-class chart file.
pub const CLASS_CHART_COLUMNS: &[&str] = &[
    "student_id",
    "name",
    "row",
    "col",
    "seat",
    "score",
    "photo_ref",
    "score_display",
    "has_photo",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Deserialize every well-formed row of a CSV source.
fn read_rows<T, R>(reader: R, source_name: &str, required: &[&str]) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::load(source_name, e))?
        .clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(Error::load(
                source_name,
                format!("missing column '{}'", column),
            ));
        }
    }

    let mut rows = Vec::new();
    for (idx, result) in csv_reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            // Line 1 is the header.
            Err(e) => log::warn!("{}: skipping line {}: {}", source_name, idx + 2, e),
        }
    }
    Ok(rows)
}

/// Serialize rows with a header.
fn write_rows<T, W>(writer: W, rows: &[T]) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn warn_non_canonical(source_name: &str, id: &StudentId) {
    if !id.is_canonical() {
        log::warn!(
            "{}: student id '{}' is not a 5-digit id; it will only join with an identical id",
            source_name,
            id
        );
    }
}

/// Read unified records, validating seats and scores.
///
/// Rows with a zero seat coordinate are skipped; out-of-range scores are
/// reported and treated as absent.
pub fn read_unified<R: Read>(reader: R, source_name: &str) -> Result<Vec<StudentRecord>> {
    let rows: Vec<StudentRecord> = read_rows(reader, source_name, UNIFIED_COLUMNS)?;
    let mut records = Vec::with_capacity(rows.len());

    for mut record in rows {
        warn_non_canonical(source_name, &record.student_id);
        if record.row == 0 || record.col == 0 {
            log::warn!(
                "{}: student {} has seat ({}, {}); skipped",
                source_name,
                record.student_id,
                record.row,
                record.col
            );
            continue;
        }
        if let Some(score) = record.score.filter(|&s| !score_in_range(s)) {
            log::warn!(
                "{}: score {} for {} is outside [0, 100]; treated as absent",
                source_name,
                score,
                record.student_id
            );
            record.score = None;
        }
        record.name = normalize_name(&record.name);
        record.photo_ref = record.photo_ref.filter(|p| !p.is_empty());
        records.push(record);
    }

    Ok(keep_first_seat(records, source_name))
}

/// Write unified records.
pub fn write_unified<W: Write>(mut writer: W, records: &[StudentRecord]) -> Result<()> {
    writer.write_all(UTF8_BOM)?;
    write_rows(writer, records)
}

#[derive(Serialize)]
struct ClassChartRow<'a> {
    student_id: &'a StudentId,
    name: &'a str,
    row: u32,
    col: u32,
    seat: String,
    score: Option<f64>,
    photo_ref: Option<&'a str>,
    score_display: String,
    has_photo: &'static str,
}

/// Write one class chart: its students in seat order with display columns.
pub fn write_class_chart<W: Write>(mut writer: W, grid: &SeatGrid) -> Result<()> {
    let rows: Vec<ClassChartRow> = grid
        .students()
        .map(|s| ClassChartRow {
            student_id: &s.student_id,
            name: &s.name,
            row: s.row,
            col: s.col,
            seat: format!("({},{})", s.row, s.col),
            score: s.score,
            photo_ref: s.photo_ref.as_deref(),
            score_display: score_one_decimal(s.score).unwrap_or_else(|| "no score".to_string()),
            has_photo: if s.photo_ref.is_some() { "yes" } else { "no" },
        })
        .collect();
    writer.write_all(UTF8_BOM)?;
    write_rows(writer, &rows)
}

/// Read seating records.
pub fn read_seating<R: Read>(reader: R, source_name: &str) -> Result<Vec<SeatingRecord>> {
    let rows: Vec<SeatingRecord> = read_rows(reader, source_name, SEATING_COLUMNS)?;
    let seated = rows
        .into_iter()
        .filter(|r| {
            warn_non_canonical(source_name, &r.student_id);
            let valid = r.row > 0 && r.col > 0;
            if !valid {
                log::warn!("{}: student {} has no valid seat; skipped", source_name, r.student_id);
            }
            valid
        })
        .map(|mut r| {
            r.name = normalize_name(&r.name);
            r
        });
    Ok(keep_first_seat(seated, source_name))
}

/// Read score records, dropping out-of-range scores.
pub fn read_scores<R: Read>(reader: R, source_name: &str) -> Result<Vec<ScoreRecord>> {
    let rows: Vec<ScoreRecord> = read_rows(reader, source_name, SCORE_COLUMNS)?;
    Ok(rows
        .into_iter()
        .filter(|r| {
            warn_non_canonical(source_name, &r.student_id);
            let valid = score_in_range(r.score);
            if !valid {
                log::warn!(
                    "{}: score {} for {} is outside [0, 100]; ignored",
                    source_name,
                    r.score,
                    r.student_id
                );
            }
            valid
        })
        .collect())
}

/// Read photo records, dropping empty references.
pub fn read_photos<R: Read>(reader: R, source_name: &str) -> Result<Vec<PhotoRecord>> {
    let rows: Vec<PhotoRecord> = read_rows(reader, source_name, PHOTO_COLUMNS)?;
    Ok(rows
        .into_iter()
        .filter(|r| {
            warn_non_canonical(source_name, &r.student_id);
            !r.photo_ref.is_empty()
        })
        .collect())
}

/// Open a CSV file for one of the readers above.
///
/// A missing or unreadable file is a `Load` error.
pub fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::load(path.display().to_string(), e))
}

/// Create a CSV file for writing.
pub fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Sort unified records by class, then student id.
pub fn sort_unified(records: &mut [StudentRecord]) {
    records.sort_by(|a, b| {
        a.class_id
            .cmp(&b.class_id)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
}
