//! Per-class and cohort statistics over unified records.

use crate::grid::partition_by_class;
use crate::tier::{ScoreBucket, ScoreTier};
use crate::types::{ClassId, StudentRecord};
use serde::Serialize;

/// Mean, extremes and spread of the scores that are present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

impl ScoreStats {
    /// Statistics over `scores`, or `None` when there are none.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }
}

/// Read-only statistics for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub class_id: ClassId,
    pub total: usize,
    pub scored_count: usize,
    pub photo_count: usize,
    /// Absent when `scored_count == 0`.
    pub score_stats: Option<ScoreStats>,
    /// Counts per [`ScoreBucket::ALL`] position.
    pub buckets: [usize; 4],
    /// Counts per [`ScoreTier::ALL`] position.
    pub tiers: [usize; 4],
}

impl ClassSummary {
    /// Summarize the records of one class.
    pub fn compute<'a, I>(class_id: ClassId, records: I) -> Self
    where
        I: IntoIterator<Item = &'a StudentRecord>,
    {
        let mut total = 0;
        let mut photo_count = 0;
        let mut scores = Vec::new();
        let mut buckets = [0usize; 4];
        let mut tiers = [0usize; 4];

        for record in records {
            total += 1;
            if record.photo_ref.is_some() {
                photo_count += 1;
            }
            if let Some(score) = record.score {
                scores.push(score);
                buckets[ScoreBucket::of(score).index()] += 1;
            }
            let tier = ScoreTier::classify(record.score);
            if let Some(pos) = ScoreTier::ALL.iter().position(|&t| t == tier) {
                tiers[pos] += 1;
            }
        }

        Self {
            class_id,
            total,
            scored_count: scores.len(),
            photo_count,
            score_stats: ScoreStats::from_scores(&scores),
            buckets,
            tiers,
        }
    }

    /// Count of students in `bucket`.
    pub fn bucket(&self, bucket: ScoreBucket) -> usize {
        self.buckets[bucket.index()]
    }

    /// Count of students in `tier`.
    pub fn tier(&self, tier: ScoreTier) -> usize {
        ScoreTier::ALL
            .iter()
            .position(|&t| t == tier)
            .map_or(0, |pos| self.tiers[pos])
    }

    /// Share of scored students in `tier`, as a percentage.
    pub fn tier_percent(&self, tier: ScoreTier) -> Option<f64> {
        ratio(self.tier(tier), self.scored_count).map(|r| r * 100.0)
    }
}

/// A student listed for a missing optional field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingEntry {
    pub class_id: ClassId,
    pub student_id: String,
    pub name: String,
}

impl MissingEntry {
    fn of(record: &StudentRecord) -> Self {
        Self {
            class_id: record.class_id,
            student_id: record.student_id.to_string(),
            name: record.name.clone(),
        }
    }
}

/// Statistics across every class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    /// One summary per class, ascending class id.
    pub classes: Vec<ClassSummary>,
    pub total: usize,
    pub scored_count: usize,
    pub photo_count: usize,
    /// Students with both a score and a photo.
    pub complete_count: usize,
    pub score_stats: Option<ScoreStats>,
    pub buckets: [usize; 4],
    pub missing_scores: Vec<MissingEntry>,
    pub missing_photos: Vec<MissingEntry>,
}

impl CohortSummary {
    /// Summarize all unified records.
    pub fn compute(records: &[StudentRecord]) -> Self {
        let classes: Vec<ClassSummary> = partition_by_class(records)
            .into_iter()
            .map(|(class_id, members)| ClassSummary::compute(class_id, members))
            .collect();

        let scores: Vec<f64> = records.iter().filter_map(|r| r.score).collect();
        let mut buckets = [0usize; 4];
        for class in &classes {
            for (slot, count) in buckets.iter_mut().zip(class.buckets) {
                *slot += count;
            }
        }

        let mut sorted: Vec<&StudentRecord> = records.iter().collect();
        sorted.sort_by(|a, b| {
            a.class_id
                .cmp(&b.class_id)
                .then_with(|| a.student_id.cmp(&b.student_id))
        });

        Self {
            total: records.len(),
            scored_count: scores.len(),
            photo_count: records.iter().filter(|r| r.photo_ref.is_some()).count(),
            complete_count: records.iter().filter(|r| r.is_complete()).count(),
            score_stats: ScoreStats::from_scores(&scores),
            buckets,
            missing_scores: sorted
                .iter()
                .filter(|r| r.score.is_none())
                .map(|r| MissingEntry::of(r))
                .collect(),
            missing_photos: sorted
                .iter()
                .filter(|r| r.photo_ref.is_none())
                .map(|r| MissingEntry::of(r))
                .collect(),
            classes,
        }
    }

    /// Fraction of students with a score.
    pub fn score_completeness(&self) -> Option<f64> {
        ratio(self.scored_count, self.total)
    }

    /// Fraction of students with a photo.
    pub fn photo_completeness(&self) -> Option<f64> {
        ratio(self.photo_count, self.total)
    }

    /// Fraction of students with both.
    pub fn complete_ratio(&self) -> Option<f64> {
        ratio(self.complete_count, self.total)
    }

    /// Mean class size.
    pub fn mean_class_size(&self) -> Option<f64> {
        ratio(self.total, self.classes.len())
    }

    /// Summary for one class.
    pub fn class(&self, class_id: ClassId) -> Option<&ClassSummary> {
        self.classes.iter().find(|c| c.class_id == class_id)
    }
}

/// `part / whole`, or `None` when `whole` is zero.
pub fn ratio(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentId;

    fn record(id: &str, class_id: ClassId, score: Option<f64>, photo: bool) -> StudentRecord {
        StudentRecord {
            student_id: StudentId::new(id),
            name: format!("S{}", id),
            class_id,
            row: 1,
            col: 1,
            score,
            photo_ref: photo.then(|| format!("{}.jpg", id)),
        }
    }

    #[test]
    fn test_class_summary_counts() {
        let records = vec![
            record("30501", 5, Some(95.0), true),
            record("30502", 5, Some(55.0), false),
            record("30503", 5, None, true),
        ];
        let summary = ClassSummary::compute(5, &records);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.scored_count, 2);
        assert_eq!(summary.photo_count, 2);
        let stats = summary.score_stats.unwrap();
        assert_eq!(stats.mean, 75.0);
        assert_eq!(stats.min, 55.0);
        assert_eq!(stats.max, 95.0);
        assert_eq!(stats.std_dev, 20.0);
        assert_eq!(summary.tier(ScoreTier::Excellent), 1);
        assert_eq!(summary.tier(ScoreTier::NeedsImprovement), 1);
        assert_eq!(summary.tier(ScoreTier::None), 1);
        assert_eq!(summary.tier_percent(ScoreTier::Excellent), Some(50.0));
    }

    #[test]
    fn test_no_scores_means_no_stats() {
        let records = vec![record("30101", 1, None, false)];
        let summary = ClassSummary::compute(1, &records);
        assert_eq!(summary.scored_count, 0);
        assert!(summary.score_stats.is_none());
        assert_eq!(summary.tier_percent(ScoreTier::Good), None);
    }

    #[test]
    fn test_buckets_sum_to_scored_count() {
        let records: Vec<StudentRecord> = [0.0, 39.9, 40.0, 59.0, 60.0, 80.0, 100.0]
            .iter()
            .enumerate()
            .map(|(i, &s)| record(&format!("301{:02}", i + 1), 1, Some(s), false))
            .chain(std::iter::once(record("30199", 1, None, false)))
            .collect();
        let summary = ClassSummary::compute(1, &records);

        assert_eq!(summary.buckets.iter().sum::<usize>(), summary.scored_count);
        assert!(summary.scored_count <= summary.total);
        assert!(summary.photo_count <= summary.total);
        assert_eq!(summary.bucket(ScoreBucket::Below40), 2);
        assert_eq!(summary.bucket(ScoreBucket::From40To60), 2);
        assert_eq!(summary.bucket(ScoreBucket::From60To80), 1);
        assert_eq!(summary.bucket(ScoreBucket::From80To100), 2);
    }

    #[test]
    fn test_cohort_completeness() {
        let records = vec![
            record("30201", 2, Some(70.0), true),
            record("30101", 1, None, true),
            record("30102", 1, Some(90.0), false),
            record("30103", 1, None, false),
        ];
        let cohort = CohortSummary::compute(&records);

        assert_eq!(cohort.classes.len(), 2);
        assert_eq!(cohort.classes[0].class_id, 1);
        assert_eq!(cohort.score_completeness(), Some(0.5));
        assert_eq!(cohort.photo_completeness(), Some(0.5));
        assert_eq!(cohort.complete_ratio(), Some(0.25));
        assert_eq!(cohort.mean_class_size(), Some(2.0));
        assert_eq!(
            cohort
                .missing_scores
                .iter()
                .map(|m| m.student_id.as_str())
                .collect::<Vec<_>>(),
            vec!["30101", "30103"]
        );
        assert_eq!(cohort.buckets.iter().sum::<usize>(), cohort.scored_count);
    }

    #[test]
    fn test_empty_cohort_has_no_ratios() {
        let cohort = CohortSummary::compute(&[]);
        assert_eq!(cohort.total, 0);
        assert_eq!(cohort.score_completeness(), None);
        assert_eq!(cohort.mean_class_size(), None);
        assert!(cohort.score_stats.is_none());
    }
}
