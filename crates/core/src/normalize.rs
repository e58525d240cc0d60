//! Text normalization for cell contents.
//!
//! Handles class label parsing, student name cleanup, and score parsing.

use crate::types::ClassId;
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse whitespace runs into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// `3-5(C)`, `3-05`: grade, dash, class, anything.
static GRADE_FORM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d\s*-\s*(\d+)").unwrap());

/// `picture_5.pptx`, `class_05`: word, underscore, class, optional extension.
static FILE_FORM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+_(\d+)(?:\.[A-Za-z0-9]+)?$").unwrap());

/// `5반`: class followed by the Korean class suffix.
static KOREAN_FORM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*반$").unwrap());

/// Bare class number.
static BARE_FORM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)$").unwrap());

/// Resolve a class id from a sheet name, file name or header cell.
///
/// Grammar (whitespace around the label is ignored, class 0 is rejected):
///
/// ```text
/// label       := grade-form | file-form | korean-form | bare
/// grade-form  := DIGIT "-" DIGITS ANY*          "3-5(C)"         -> 5
/// file-form   := ALPHA+ "_" DIGITS ["." EXT]    "picture_5.pptx" -> 5
/// korean-form := DIGITS "반"                     "5반"            -> 5
/// bare        := DIGITS                         "05"             -> 5
/// ```
pub fn parse_class_label(label: &str) -> Option<ClassId> {
    let label = label.trim();

    [
        &*GRADE_FORM_REGEX,
        &*FILE_FORM_REGEX,
        &*KOREAN_FORM_REGEX,
        &*BARE_FORM_REGEX,
    ]
    .iter()
    .find_map(|re| re.captures(label))
    .and_then(|caps| caps[1].parse::<ClassId>().ok())
    .filter(|&class_id| class_id > 0)
}

/// Normalize a student name: NFC composition, collapsed whitespace, trimmed.
///
/// Spreadsheets saved on some platforms store Hangul decomposed into jamo;
/// composing keeps names comparable and renderable.
pub fn normalize_name(name: &str) -> String {
    let composed: String = name.nfc().collect();
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(composed.trim(), " ")
        .into_owned()
}

/// Parse a score cell. Accepts plain numbers and a trailing `점`.
///
/// Returns `None` for text that is not a finite number.
pub fn parse_score(text: &str) -> Option<f64> {
    let text = text.trim().trim_end_matches('점').trim();
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whether a score lies in the valid `[0, 100]` range.
pub fn score_in_range(score: f64) -> bool {
    (0.0..=100.0).contains(&score)
}

/// Parse a whole-number cell such as a student number.
///
/// Spreadsheet backends may render integral numbers as `"7.0"`; those are
/// accepted, fractional values are not.
pub fn parse_whole_number(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Ok(n) = text.parse::<u32>() {
        return Some(n);
    }
    let value = text.parse::<f64>().ok()?;
    if value.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}
