//! Grid rendering for console text and HTML.
//!
//! Every target walks the grid through [`crate::grid::walk`], so row
//! skipping, column filling and the trailing podium are shared. Targets only
//! decide how a seat looks.

pub mod html;
pub mod text;

pub use html::HtmlRenderer;
pub use text::TextRenderer;

use crate::error::Error;
use crate::grid::SeatGrid;
use crate::summary::ClassSummary;

/// Podium label shared by all targets.
pub const PODIUM_LABEL: &str = "Teacher's desk";

/// Rendered output plus the recovered problems met while producing it.
#[derive(Debug)]
pub struct Rendered<T> {
    pub output: T,
    /// Recovered [`Error::Render`] fallbacks, in seat order.
    pub issues: Vec<Error>,
}

impl<T> Rendered<T> {
    /// Output with no issues.
    pub fn clean(output: T) -> Self {
        Self {
            output,
            issues: Vec::new(),
        }
    }

    /// Log every issue at warn level and return the output.
    pub fn into_logged(self) -> T {
        for issue in &self.issues {
            log::warn!("{}", issue);
        }
        self.output
    }
}

/// A target that can draw one class's seating chart.
///
/// Implementations must be pure: the same grid and summary always produce
/// the same output.
pub trait GridRenderer {
    type Output;

    /// Render one class.
    fn render_class(&self, grid: &SeatGrid, summary: &ClassSummary) -> Rendered<Self::Output>;
}

/// Score with one decimal, or `None` when absent.
pub(crate) fn score_one_decimal(score: Option<f64>) -> Option<String> {
    score.map(|s| format!("{:.1}", s))
}
