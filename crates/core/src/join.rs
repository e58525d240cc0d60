//! Identity join of the seating, score and photo streams.
//!
//! The seating stream is primary: every seated student yields exactly one
//! unified record, in seating order. Secondary streams are left-joined by
//! exact student id. When a secondary stream repeats an id, the first row
//! wins and a [`JoinConflict`] is reported.

use crate::error::Error;
use crate::types::{PhotoRecord, ScoreRecord, SeatingRecord, StudentId, StudentRecord};
use std::collections::{HashMap, HashSet};

/// A record that can be looked up by student id.
pub trait Keyed {
    /// Join key.
    fn student_id(&self) -> &StudentId;
}

impl Keyed for SeatingRecord {
    fn student_id(&self) -> &StudentId {
        &self.student_id
    }
}

impl Keyed for ScoreRecord {
    fn student_id(&self) -> &StudentId {
        &self.student_id
    }
}

impl Keyed for PhotoRecord {
    fn student_id(&self) -> &StudentId {
        &self.student_id
    }
}

/// A secondary-stream id that appeared more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConflict {
    /// Name of the secondary stream ("score", "photo").
    pub stream: &'static str,
    pub student_id: StudentId,
    /// Number of rows discarded after the first match.
    pub discarded: usize,
}

impl From<JoinConflict> for Error {
    fn from(conflict: JoinConflict) -> Self {
        Error::JoinConflict {
            stream: conflict.stream,
            student_id: conflict.student_id,
            discarded: conflict.discarded,
        }
    }
}

/// Outcome of a join.
#[derive(Debug, Clone, Default)]
pub struct JoinReport {
    /// Unified records in primary order.
    pub records: Vec<StudentRecord>,
    /// Recovered duplicate-key conflicts, in stream then input order.
    pub conflicts: Vec<JoinConflict>,
    /// Distinct secondary ids that matched no seated student.
    pub unmatched: usize,
}

/// First-match index over one secondary stream.
struct FirstMatchIndex<'a, T> {
    by_id: HashMap<&'a StudentId, &'a T>,
    conflicts: Vec<JoinConflict>,
}

impl<'a, T: Keyed> FirstMatchIndex<'a, T> {
    fn build(stream: &'static str, rows: &'a [T]) -> Self {
        let mut by_id: HashMap<&StudentId, &T> = HashMap::with_capacity(rows.len());
        // Conflicts keep first-seen order so diagnostics are deterministic.
        let mut discarded: Vec<(&StudentId, usize)> = Vec::new();

        for row in rows {
            let id = row.student_id();
            if by_id.contains_key(id) {
                match discarded.iter_mut().find(|(seen, _)| *seen == id) {
                    Some((_, count)) => *count += 1,
                    None => discarded.push((id, 1)),
                }
            } else {
                by_id.insert(id, row);
            }
        }

        let conflicts = discarded
            .into_iter()
            .map(|(id, count)| JoinConflict {
                stream,
                student_id: id.clone(),
                discarded: count,
            })
            .collect();

        Self { by_id, conflicts }
    }

    fn get(&self, id: &StudentId) -> Option<&'a T> {
        self.by_id.get(id).copied()
    }

    fn unmatched(&self, seated: &HashSet<&StudentId>) -> usize {
        self.by_id.keys().filter(|id| !seated.contains(*id)).count()
    }
}

/// Left-join scores and photos onto the seating stream.
pub fn join_records(
    seating: Vec<SeatingRecord>,
    scores: &[ScoreRecord],
    photos: &[PhotoRecord],
) -> JoinReport {
    let score_index = FirstMatchIndex::build("score", scores);
    let photo_index = FirstMatchIndex::build("photo", photos);

    let seated: HashSet<&StudentId> = seating.iter().map(|s| &s.student_id).collect();
    let unmatched = score_index.unmatched(&seated) + photo_index.unmatched(&seated);

    let mut conflicts = score_index.conflicts.clone();
    conflicts.extend(photo_index.conflicts.iter().cloned());
    for conflict in &conflicts {
        log::warn!("{}", Error::from(conflict.clone()));
    }
    if unmatched > 0 {
        log::debug!("Dropped {} secondary ids with no seated student", unmatched);
    }

    let records = seating
        .iter()
        .map(|seat| {
            let mut record = StudentRecord::from_seating(seat.clone());
            record.score = score_index.get(&seat.student_id).map(|s| s.score);
            record.photo_ref = photo_index
                .get(&seat.student_id)
                .map(|p| p.photo_ref.clone());
            record
        })
        .collect();

    JoinReport {
        records,
        conflicts,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(id: &str, name: &str, row: u32, col: u32) -> SeatingRecord {
        SeatingRecord {
            student_id: StudentId::new(id),
            name: name.to_string(),
            class_id: 1,
            row,
            col,
        }
    }

    fn score(id: &str, score: f64) -> ScoreRecord {
        ScoreRecord {
            student_id: StudentId::new(id),
            score,
        }
    }

    fn photo(id: &str, photo_ref: &str) -> PhotoRecord {
        PhotoRecord {
            student_id: StudentId::new(id),
            photo_ref: photo_ref.to_string(),
        }
    }

    #[test]
    fn test_left_join_keeps_primary_order() {
        let seating = vec![seat("30102", "B", 1, 2), seat("30101", "A", 1, 1)];
        let report = join_records(seating, &[score("30101", 88.0)], &[photo("30102", "b.jpg")]);

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].student_id.as_str(), "30102");
        assert_eq!(report.records[0].score, None);
        assert_eq!(report.records[0].photo_ref.as_deref(), Some("b.jpg"));
        assert_eq!(report.records[1].score, Some(88.0));
        assert_eq!(report.records[1].photo_ref, None);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_unmatched_secondary_rows_are_dropped() {
        let report = join_records(
            vec![seat("30101", "A", 1, 1)],
            &[score("30199", 50.0)],
            &[photo("30198", "x.jpg")],
        );
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].score, None);
        assert_eq!(report.unmatched, 2);
    }

    #[test]
    fn test_first_match_wins_and_conflict_reported() {
        let report = join_records(
            vec![seat("30101", "A", 1, 1)],
            &[score("30101", 70.0), score("30101", 20.0), score("30101", 30.0)],
            &[],
        );
        assert_eq!(report.records[0].score, Some(70.0));
        assert_eq!(
            report.conflicts,
            vec![JoinConflict {
                stream: "score",
                student_id: StudentId::new("30101"),
                discarded: 2,
            }]
        );
    }

    #[test]
    fn test_leading_zero_ids_do_not_match() {
        let report = join_records(vec![seat("30102", "A", 1, 1)], &[score("030102", 90.0)], &[]);
        assert_eq!(report.records[0].score, None);
        assert_eq!(report.unmatched, 1);
    }

    #[test]
    fn test_whitespace_is_normalized_before_matching() {
        let report = join_records(vec![seat(" 30102", "A", 1, 1)], &[score("30102 ", 61.0)], &[]);
        assert_eq!(report.records[0].score, Some(61.0));
    }
}
