//! Seat grid assembly and the row-major walk shared by all renderers.

use crate::error::{Error, Result};
use crate::types::{ClassId, StudentRecord};
use std::collections::BTreeMap;

/// Sparse seat map for one class. A missing key is an empty seat.
#[derive(Debug, Clone, PartialEq)]
pub struct SeatGrid {
    class_id: ClassId,
    seats: BTreeMap<(u32, u32), StudentRecord>,
    max_row: u32,
    max_col: u32,
}

impl SeatGrid {
    /// Build the grid for `class_id` from that class's records.
    ///
    /// Fails on an empty input, on a seat coordinate of zero, on a record
    /// from another class, and when two records claim the same seat.
    pub fn build<'a, I>(class_id: ClassId, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a StudentRecord>,
    {
        let mut seats: BTreeMap<(u32, u32), StudentRecord> = BTreeMap::new();

        for record in records {
            if record.class_id != class_id {
                return Err(Error::ClassMismatch {
                    student_id: record.student_id.clone(),
                    expected: class_id,
                    found: record.class_id,
                });
            }
            if record.row == 0 || record.col == 0 {
                return Err(Error::InvalidSeat {
                    student_id: record.student_id.clone(),
                    row: record.row,
                    col: record.col,
                });
            }
            if let Some(existing) = seats.get(&(record.row, record.col)) {
                return Err(Error::DuplicateSeat {
                    class_id,
                    row: record.row,
                    col: record.col,
                    first: existing.student_id.clone(),
                    second: record.student_id.clone(),
                });
            }
            seats.insert((record.row, record.col), record.clone());
        }

        if seats.is_empty() {
            return Err(Error::EmptyClass(class_id));
        }

        let max_row = seats.keys().map(|&(r, _)| r).max().unwrap_or(0);
        let max_col = seats.keys().map(|&(_, c)| c).max().unwrap_or(0);

        Ok(Self {
            class_id,
            seats,
            max_row,
            max_col,
        })
    }

    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    pub fn max_col(&self) -> u32 {
        self.max_col
    }

    /// Student at a 1-based seat, if any.
    pub fn get(&self, row: u32, col: u32) -> Option<&StudentRecord> {
        self.seats.get(&(row, col))
    }

    /// Number of occupied seats.
    pub fn occupied(&self) -> usize {
        self.seats.len()
    }

    /// Whether any seat in `row` is occupied.
    pub fn row_is_occupied(&self, row: u32) -> bool {
        self.seats.range((row, 1)..=(row, u32::MAX)).next().is_some()
    }

    /// Rows that hold at least one student, ascending.
    pub fn occupied_rows(&self) -> Vec<u32> {
        let mut rows: Vec<u32> = self.seats.keys().map(|&(r, _)| r).collect();
        rows.dedup();
        rows
    }

    /// Students in seat order (row-major).
    pub fn students(&self) -> impl Iterator<Item = &StudentRecord> {
        self.seats.values()
    }
}

/// Group records by class, ascending class id, input order within a class.
pub fn partition_by_class(records: &[StudentRecord]) -> BTreeMap<ClassId, Vec<&StudentRecord>> {
    let mut classes: BTreeMap<ClassId, Vec<&StudentRecord>> = BTreeMap::new();
    for record in records {
        classes.entry(record.class_id).or_default().push(record);
    }
    classes
}

/// Callbacks for the row-major grid walk.
pub trait SeatVisitor {
    /// An occupied row is about to be emitted.
    fn begin_row(&mut self, row: u32);

    /// One column of the current row, occupied or empty.
    fn seat(&mut self, row: u32, col: u32, student: Option<&StudentRecord>);

    /// The current row is complete.
    fn end_row(&mut self, row: u32);

    /// Emitted exactly once, after the last row.
    fn podium(&mut self);
}

/// Walk `grid` row-major, skipping unoccupied rows.
///
/// Inside an emitted row every column `1..=max_col` produces a `seat` call
/// so physical alignment is preserved. The podium follows the last row.
pub fn walk<V: SeatVisitor + ?Sized>(grid: &SeatGrid, visitor: &mut V) {
    for row in 1..=grid.max_row() {
        if !grid.row_is_occupied(row) {
            continue;
        }
        visitor.begin_row(row);
        for col in 1..=grid.max_col() {
            visitor.seat(row, col, grid.get(row, col));
        }
        visitor.end_row(row);
    }
    visitor.podium();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentId;

    fn student(id: &str, class_id: ClassId, row: u32, col: u32) -> StudentRecord {
        StudentRecord {
            student_id: StudentId::new(id),
            name: format!("Student {}", id),
            class_id,
            row,
            col,
            score: None,
            photo_ref: None,
        }
    }

    #[derive(Default)]
    struct Trace(Vec<String>);

    impl SeatVisitor for Trace {
        fn begin_row(&mut self, row: u32) {
            self.0.push(format!("row{}", row));
        }
        fn seat(&mut self, _row: u32, col: u32, student: Option<&StudentRecord>) {
            match student {
                Some(s) => self.0.push(s.student_id.to_string()),
                None => self.0.push(format!("empty{}", col)),
            }
        }
        fn end_row(&mut self, _row: u32) {
            self.0.push("/".to_string());
        }
        fn podium(&mut self) {
            self.0.push("podium".to_string());
        }
    }

    #[test]
    fn test_build_computes_extent() {
        let records = vec![student("30101", 1, 1, 1), student("30102", 1, 3, 4)];
        let grid = SeatGrid::build(1, &records).unwrap();
        assert_eq!(grid.max_row(), 3);
        assert_eq!(grid.max_col(), 4);
        assert_eq!(grid.occupied(), 2);
        assert_eq!(grid.occupied_rows(), vec![1, 3]);
        assert!(grid.get(2, 2).is_none());
    }

    #[test]
    fn test_duplicate_seat_is_rejected() {
        let records = vec![student("30301", 3, 1, 1), student("30302", 3, 1, 1)];
        match SeatGrid::build(3, &records) {
            Err(Error::DuplicateSeat {
                class_id,
                row,
                col,
                first,
                second,
            }) => {
                assert_eq!((class_id, row, col), (3, 1, 1));
                assert_eq!(first.as_str(), "30301");
                assert_eq!(second.as_str(), "30302");
            }
            other => panic!("expected DuplicateSeat, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_class_is_rejected() {
        let records: Vec<StudentRecord> = Vec::new();
        assert!(matches!(SeatGrid::build(4, &records), Err(Error::EmptyClass(4))));
    }

    #[test]
    fn test_zero_seat_and_foreign_class_are_rejected() {
        let zero = vec![student("30101", 1, 0, 2)];
        assert!(matches!(SeatGrid::build(1, &zero), Err(Error::InvalidSeat { .. })));

        let foreign = vec![student("30201", 2, 1, 1)];
        assert!(matches!(
            SeatGrid::build(1, &foreign),
            Err(Error::ClassMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn test_walk_skips_empty_rows_and_fills_columns() {
        let records = vec![
            student("30101", 1, 1, 1),
            student("30102", 1, 1, 3),
            student("30103", 1, 3, 2),
        ];
        let grid = SeatGrid::build(1, &records).unwrap();
        let mut trace = Trace::default();
        walk(&grid, &mut trace);

        assert_eq!(
            trace.0,
            vec![
                "row1", "30101", "empty2", "30102", "/", "row3", "empty1", "30103", "empty3", "/",
                "podium",
            ]
        );
    }

    #[test]
    fn test_partition_by_class_is_ordered() {
        let records = vec![
            student("30501", 5, 1, 1),
            student("30201", 2, 1, 1),
            student("30502", 5, 1, 2),
        ];
        let classes = partition_by_class(&records);
        assert_eq!(classes.keys().copied().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(classes[&5][0].student_id.as_str(), "30501");
        assert_eq!(classes[&5][1].student_id.as_str(), "30502");
    }
}
