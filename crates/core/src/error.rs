//! Error types for seating chart processing.
//!
//! Only `Load` and `Io` abort a run. The remaining variants are scoped to one
//! class or one record and are either returned per class (`DuplicateSeat`,
//! `EmptyClass`) or reported as recovered diagnostics (`JoinConflict`,
//! `Render`).

use crate::types::{ClassId, StudentId};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, joining, gridding or rendering.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input or output file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The input document is missing, unreadable or structurally corrupt.
    #[error("Failed to load {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    /// CSV interchange error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// A secondary stream holds more than one row for the same student.
    #[error("Duplicate {stream} rows for student {student_id}: kept the first, discarded {discarded}")]
    JoinConflict {
        stream: &'static str,
        student_id: StudentId,
        discarded: usize,
    },

    /// Two students claim the same seat within one class.
    #[error("Class {class_id}: seat ({row}, {col}) claimed by both {first} and {second}")]
    DuplicateSeat {
        class_id: ClassId,
        row: u32,
        col: u32,
        first: StudentId,
        second: StudentId,
    },

    /// A class has no records to place.
    #[error("Class {0} has no students")]
    EmptyClass(ClassId),

    /// A record carries a seat coordinate of zero.
    #[error("Student {student_id} has invalid seat ({row}, {col})")]
    InvalidSeat {
        student_id: StudentId,
        row: u32,
        col: u32,
    },

    /// A record was handed to the grid of another class.
    #[error("Student {student_id} belongs to class {found}, not class {expected}")]
    ClassMismatch {
        student_id: StudentId,
        expected: ClassId,
        found: ClassId,
    },

    /// The target format cannot represent part of a record; a placeholder was used.
    #[error("Render fallback for {student_id}: {reason}")]
    Render {
        student_id: StudentId,
        reason: String,
    },
}

impl Error {
    /// Build a `Load` error for the named source.
    pub fn load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Load {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the whole run rather than one class or record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::IoError(_) | Error::Load { .. } | Error::CsvError(_)
        )
    }
}
