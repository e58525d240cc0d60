//! PDF seating charts.
//!
//! [`PdfRenderer`] turns one class into one landscape A4 page of content
//! operations; [`PdfWriter`] collects pages into a document. Text is set in
//! Helvetica; with an [`EmbeddedFont`] configured, strings Helvetica cannot
//! show use that font instead.

pub mod encoding;
pub mod error;
pub mod font;
pub mod page;
pub mod writer;

pub use error::{Error, Result};
pub use font::{EmbeddedFont, Glyph};
pub use page::{PdfPage, PdfRenderer};
pub use writer::{render_document, PdfWriter};
