//! Per-class chart preparation with per-class failure isolation.

use crate::error::{Error, Result};
use crate::grid::{partition_by_class, SeatGrid};
use crate::render::{GridRenderer, Rendered};
use crate::summary::ClassSummary;
use crate::types::{ClassId, StudentRecord};

/// Grid and summary for one class.
#[derive(Debug, Clone)]
pub struct ClassChart {
    pub grid: SeatGrid,
    pub summary: ClassSummary,
}

impl ClassChart {
    /// Build the chart of `class_id` from that class's records.
    pub fn build(class_id: ClassId, records: &[&StudentRecord]) -> Result<Self> {
        let grid = SeatGrid::build(class_id, records.iter().copied())?;
        let summary = ClassSummary::compute(class_id, records.iter().copied());
        Ok(Self { grid, summary })
    }

    pub fn class_id(&self) -> ClassId {
        self.grid.class_id()
    }

    /// Render with any target.
    pub fn render<R: GridRenderer + ?Sized>(&self, renderer: &R) -> Rendered<R::Output> {
        renderer.render_class(&self.grid, &self.summary)
    }
}

/// Charts for every renderable class plus the classes that were skipped.
#[derive(Debug, Default)]
pub struct ChartSet {
    /// Ascending class id.
    pub charts: Vec<ClassChart>,
    /// One error per skipped class (`DuplicateSeat`, `EmptyClass`, ...).
    pub skipped: Vec<Error>,
}

impl ChartSet {
    /// Build charts for every class present in `records`.
    pub fn build(records: &[StudentRecord]) -> Self {
        Self::build_selected(records, None)
    }

    /// Build charts for `selection`, or for every class when `None`.
    ///
    /// A selected class with no records is reported as `EmptyClass`. A
    /// failing class never prevents the others from being built.
    pub fn build_selected(records: &[StudentRecord], selection: Option<&[ClassId]>) -> Self {
        let classes = partition_by_class(records);
        let wanted: Vec<ClassId> = match selection {
            Some(ids) => {
                let mut ids = ids.to_vec();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            None => classes.keys().copied().collect(),
        };

        let mut set = ChartSet::default();
        for class_id in wanted {
            let members = classes.get(&class_id).map(Vec::as_slice).unwrap_or(&[]);
            match ClassChart::build(class_id, members) {
                Ok(chart) => set.charts.push(chart),
                Err(e) => {
                    log::warn!("Skipping class {}: {}", class_id, e);
                    set.skipped.push(e);
                }
            }
        }
        set
    }

    /// Class ids that produced a chart.
    pub fn class_ids(&self) -> Vec<ClassId> {
        self.charts.iter().map(ClassChart::class_id).collect()
    }
}
