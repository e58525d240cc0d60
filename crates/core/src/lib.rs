//! Core domain types, identity join, seat grid assembly, summary statistics
//! and text/HTML rendering for classroom seating charts.

pub mod chart;
pub mod error;
pub mod extract;
pub mod grid;
pub mod interchange;
pub mod join;
pub mod normalize;
pub mod render;
pub mod summary;
pub mod tier;
pub mod types;

pub use chart::{ChartSet, ClassChart};
pub use error::{Error, Result};
pub use extract::{keep_first_seat, PhotoRosterEntry, ScoreSheetLayout, SeatingExtractor};
pub use grid::{partition_by_class, walk, SeatGrid, SeatVisitor};
pub use join::{join_records, JoinConflict, JoinReport};
pub use normalize::{normalize_name, parse_class_label};
pub use render::{GridRenderer, HtmlRenderer, Rendered, TextRenderer};
pub use summary::{ClassSummary, CohortSummary, ScoreStats};
pub use tier::{ScoreBucket, ScoreTier};
pub use types::{
    ClassId, PhotoRecord, ScoreRecord, Seated, SeatingRecord, Sheet, SourceFormat, StudentId,
    StudentRecord,
};
