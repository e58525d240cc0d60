//! XLSX backend: reads every worksheet of a workbook into a [`Sheet`](seat_core::Sheet).
//!
//! Seating and score workbooks are handed to the extractors in
//! `seat_core::extract` as plain cell text.

pub mod reader;

pub use reader::{range_to_sheet, XlsxReader};
