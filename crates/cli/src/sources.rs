//! Input loading with format detection.

use anyhow::{bail, Context, Result};
use seat_core::interchange;
use seat_core::{
    PhotoRecord, ScoreRecord, ScoreSheetLayout, SeatingExtractor, SeatingRecord, SourceFormat,
    StudentRecord,
};
use seat_pptx::PptxParser;
use seat_xlsx::XlsxReader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Bytes sniffed from the head of a file for format detection.
const SNIFF_LEN: usize = 512;

/// Detect the format of an input file.
pub fn detect_format(path: &Path) -> Result<SourceFormat> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64)
        .read_to_end(&mut head)
        .with_context(|| format!("Failed to read header of {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str());
    SourceFormat::detect(&head, ext)
        .ok_or_else(|| anyhow::anyhow!("Could not detect file format of {}", path.display()))
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}

/// Seating records from a seating workbook or seating CSV.
pub fn load_seating(path: &Path) -> Result<Vec<SeatingRecord>> {
    let records = match detect_format(path)? {
        SourceFormat::Xlsx => {
            log::debug!("Reading seating workbook {}", path.display());
            let sheets = XlsxReader::new().read_path(path)?;
            SeatingExtractor::new().extract(&sheets)
        }
        SourceFormat::Csv => interchange::read_seating(interchange::open(path)?, &source_name(path))?,
        SourceFormat::Pptx => bail!("{} is a slide deck, not a seating source", path.display()),
    };
    if records.is_empty() {
        bail!("No seated students found in {}", path.display());
    }
    Ok(records)
}

/// Score records from a score workbook or score CSV.
pub fn load_scores(path: &Path, grade: u32) -> Result<Vec<ScoreRecord>> {
    match detect_format(path)? {
        SourceFormat::Xlsx => {
            log::debug!("Reading score workbook {}", path.display());
            let layout = ScoreSheetLayout::new().with_grade(grade);
            let sheets = XlsxReader::new().read_path(path)?;
            Ok(sheets.iter().flat_map(|sheet| layout.extract(sheet)).collect())
        }
        SourceFormat::Csv => Ok(interchange::read_scores(
            interchange::open(path)?,
            &source_name(path),
        )?),
        SourceFormat::Pptx => bail!("{} is a slide deck, not a score source", path.display()),
    }
}

/// Photo records from a roster deck or photo CSV.
///
/// Deck pictures are written to `photo_dir` as `<id>_<name>.<ext>`; the
/// written path becomes the photo reference.
pub fn load_photos(path: &Path, photo_dir: &Path) -> Result<Vec<PhotoRecord>> {
    match detect_format(path)? {
        SourceFormat::Pptx => extract_deck_photos(path, photo_dir),
        SourceFormat::Csv => Ok(interchange::read_photos(
            interchange::open(path)?,
            &source_name(path),
        )?),
        SourceFormat::Xlsx => bail!("{} is a workbook, not a photo source", path.display()),
    }
}

fn extract_deck_photos(path: &Path, photo_dir: &Path) -> Result<Vec<PhotoRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown");

    log::debug!("Parsing photo roster {}", filename);
    let roster = PptxParser::new().parse(BufReader::new(file), filename)?;
    let assigned = roster.assign();

    if !assigned.surplus.is_empty() {
        log::warn!(
            "{}: {} pictures had no roster entry and were not saved",
            filename,
            assigned.surplus.len()
        );
    }
    for entry in &assigned.unpictured {
        log::warn!("{}: no picture for {} {}", filename, entry.student_id, entry.name);
    }

    std::fs::create_dir_all(photo_dir)
        .with_context(|| format!("Failed to create photo directory: {}", photo_dir.display()))?;

    let mut records = Vec::with_capacity(assigned.photos.len());
    for (entry, picture) in assigned.photos {
        let target = photo_dir.join(entry.photo_file_name(&picture.extension));
        std::fs::write(&target, &picture.bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        records.push(PhotoRecord {
            student_id: entry.student_id,
            photo_ref: photo_ref_string(&target),
        });
    }

    log::debug!("{}: saved {} photos", filename, records.len());
    Ok(records)
}

/// Forward-slash path text so references are portable across platforms.
fn photo_ref_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Unified records from a unified CSV.
pub fn load_unified(path: &Path) -> Result<Vec<StudentRecord>> {
    match detect_format(path)? {
        SourceFormat::Csv => {}
        other => bail!(
            "{} is {:?}; expected a unified CSV written by `integrate`",
            path.display(),
            other
        ),
    }
    let records = interchange::read_unified(interchange::open(path)?, &source_name(path))?;
    if records.is_empty() {
        bail!("No students found in {}", path.display());
    }
    Ok(records)
}

/// Report photo references that do not resolve to a file.
///
/// Relative references are resolved against `base` when given.
pub fn missing_photos<'a, I>(records: I, base: Option<&Path>) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a StudentRecord>,
{
    records
        .into_iter()
        .filter_map(|r| r.photo_ref.as_deref())
        .map(|photo_ref| match base {
            Some(base) => base.join(photo_ref),
            None => PathBuf::from(photo_ref),
        })
        .filter(|path| !path.exists())
        .collect()
}
