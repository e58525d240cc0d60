//! Console text output.
//!
//! Each occupied seat row prints as three lines (tier glyph and id, photo
//! glyph and name, score), followed by a separator. The podium line closes
//! the chart, then the legend, class statistics and the seat-order roster.

use super::{score_one_decimal, GridRenderer, Rendered, PODIUM_LABEL};
use crate::grid::{walk, SeatGrid, SeatVisitor};
use crate::summary::{ClassSummary, CohortSummary};
use crate::tier::{ScoreBucket, ScoreTier};
use crate::types::StudentRecord;

/// Width of the banner rules.
const BANNER_WIDTH: usize = 70;

/// Glyph for a student with a photo.
const PHOTO_GLYPH: &str = "📷";

/// Glyph for a student without a photo.
const NO_PHOTO_GLYPH: &str = "❌";

/// Glyph in front of the podium label.
const PODIUM_GLYPH: &str = "🏫";

/// Console renderer.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    /// Characters per seat cell.
    cell_width: usize,
    /// Whether to append the seat-order student list.
    show_roster: bool,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            cell_width: 14,
            show_roster: true,
        }
    }
}

impl TextRenderer {
    /// Create a renderer with 14-character cells and the roster enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the student list after the chart.
    pub fn with_roster(mut self, show: bool) -> Self {
        self.show_roster = show;
        self
    }

    /// Plain-text cohort report.
    pub fn render_cohort(&self, cohort: &CohortSummary) -> String {
        let mut lines = vec![
            "=".repeat(BANNER_WIDTH + 10),
            format!("{:^80}", "Student data summary"),
            "=".repeat(BANNER_WIDTH + 10),
            String::new(),
        ];

        section(&mut lines, "1. Overview");
        lines.push(format!("• Students: {}", cohort.total));
        lines.push(format!("• Classes: {}", cohort.classes.len()));
        if let Some(mean) = cohort.mean_class_size() {
            lines.push(format!("• Mean class size: {:.1}", mean));
        }

        section(&mut lines, "2. Classes");
        lines.push(format!(
            "{:>7} {:>6} {:>9} {:>7} {:>7} {:>9} {:>7}",
            "class", "total", "scored", "rate", "mean", "photos", "rate"
        ));
        for class in &cohort.classes {
            lines.push(format!(
                "{:>7} {:>6} {:>9} {:>7} {:>7} {:>9} {:>7}",
                class.class_id,
                class.total,
                format!("{}/{}", class.scored_count, class.total),
                percent(class.scored_count, class.total),
                class
                    .score_stats
                    .map_or_else(|| "N/A".to_string(), |s| format!("{:.1}", s.mean)),
                format!("{}/{}", class.photo_count, class.total),
                percent(class.photo_count, class.total),
            ));
        }

        section(&mut lines, "3. Completeness");
        lines.push(format!(
            "• Scores: {}/{} ({})",
            cohort.scored_count,
            cohort.total,
            percent(cohort.scored_count, cohort.total)
        ));
        lines.push(format!(
            "• Photos: {}/{} ({})",
            cohort.photo_count,
            cohort.total,
            percent(cohort.photo_count, cohort.total)
        ));
        lines.push(format!(
            "• Score and photo: {}/{} ({})",
            cohort.complete_count,
            cohort.total,
            percent(cohort.complete_count, cohort.total)
        ));

        section(&mut lines, "4. Scores");
        match cohort.score_stats {
            Some(stats) => {
                lines.push(format!("• Mean: {:.1}", stats.mean));
                lines.push(format!("• Highest: {:.1}", stats.max));
                lines.push(format!("• Lowest: {:.1}", stats.min));
                lines.push(format!("• Standard deviation: {:.1}", stats.std_dev));
                lines.push(String::new());
                lines.push("Distribution:".to_string());
                for bucket in ScoreBucket::ALL {
                    let count = cohort.buckets[bucket.index()];
                    lines.push(format!(
                        "  {:<10} {} ({})",
                        bucket.label(),
                        count,
                        percent(count, cohort.scored_count)
                    ));
                }
            }
            None => lines.push("• No score data".to_string()),
        }

        section(&mut lines, "5. Missing data");
        missing_list(&mut lines, "score", &cohort.missing_scores);
        lines.push(String::new());
        missing_list(&mut lines, "photo", &cohort.missing_photos);

        lines.join("\n") + "\n"
    }
}

impl GridRenderer for TextRenderer {
    type Output = String;

    fn render_class(&self, grid: &SeatGrid, summary: &ClassSummary) -> Rendered<String> {
        let class_id = grid.class_id();
        let mut lines = vec![
            "=".repeat(BANNER_WIDTH),
            format!("{:^70}", format!("Class {} Seating Chart", class_id)),
            "=".repeat(BANNER_WIDTH),
            format!(
                "👥 {} students | 📊 scored: {} | 📷 photos: {}",
                summary.total, summary.scored_count, summary.photo_count
            ),
            String::new(),
        ];

        let mut seats = SeatLines::new(self.cell_width, grid.max_col() as usize);
        walk(grid, &mut seats);
        lines.extend(seats.lines);
        lines.push(String::new());

        lines.push("📋 Legend:".to_string());
        lines.push(format!(
            "  {}",
            ScoreTier::ALL
                .iter()
                .map(|t| format!("{} {}", t.glyph(), t.label()))
                .collect::<Vec<_>>()
                .join("  ")
        ));
        lines.push(format!("  {} photo  {} no photo", PHOTO_GLYPH, NO_PHOTO_GLYPH));
        lines.push(String::new());

        class_statistics(&mut lines, grid, summary);

        if self.show_roster {
            lines.push(String::new());
            lines.push(format!("📝 Class {} students (seat order)", class_id));
            lines.push("-".repeat(BANNER_WIDTH));
            for (idx, student) in grid.students().enumerate() {
                lines.push(format!(
                    "{:2}. {} {} | seat ({},{}) | {:8} | {}",
                    idx + 1,
                    student.student_id,
                    student.name,
                    student.row,
                    student.col,
                    score_one_decimal(student.score).unwrap_or_else(|| "no score".to_string()),
                    photo_glyph(student)
                ));
            }
        }

        Rendered::clean(lines.join("\n") + "\n")
    }
}

/// Collects the three lines per seat row.
struct SeatLines {
    width: usize,
    max_col: usize,
    ids: Vec<String>,
    names: Vec<String>,
    scores: Vec<String>,
    lines: Vec<String>,
}

impl SeatLines {
    fn new(width: usize, max_col: usize) -> Self {
        Self {
            width,
            max_col,
            ids: Vec::new(),
            names: Vec::new(),
            scores: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn rule_width(&self) -> usize {
        self.width * self.max_col + 3 * self.max_col.saturating_sub(1)
    }

    fn cell(&self, text: &str) -> String {
        format!("{:<width$}", text, width = self.width)
    }

    fn joined(cells: &[String]) -> String {
        format!("  {}", cells.join(" | ")).trim_end().to_string()
    }
}

impl SeatVisitor for SeatLines {
    fn begin_row(&mut self, _row: u32) {
        self.ids.clear();
        self.names.clear();
        self.scores.clear();
    }

    fn seat(&mut self, _row: u32, _col: u32, student: Option<&StudentRecord>) {
        let (id, name, score) = match student {
            Some(s) => (
                self.cell(&format!(
                    "{} {}",
                    ScoreTier::classify(s.score).glyph(),
                    s.student_id
                )),
                self.cell(&format!("{} {}", photo_glyph(s), s.name)),
                self.cell(&format!(
                    "   {}",
                    score_one_decimal(s.score).unwrap_or_else(|| "no score".to_string())
                )),
            ),
            None => (self.cell(""), self.cell(""), self.cell("")),
        };
        self.ids.push(id);
        self.names.push(name);
        self.scores.push(score);
    }

    fn end_row(&mut self, _row: u32) {
        let rows = [
            Self::joined(&self.ids),
            Self::joined(&self.names),
            Self::joined(&self.scores),
        ];
        self.lines.extend(rows);
        self.lines.push(format!("  {}", "-".repeat(self.rule_width())));
    }

    fn podium(&mut self) {
        let indent = self.rule_width() / 2;
        let indent = indent.saturating_sub(PODIUM_LABEL.len() / 2);
        self.lines.push(format!(
            "  {}{} {}",
            " ".repeat(indent),
            PODIUM_GLYPH,
            PODIUM_LABEL
        ));
    }
}

fn photo_glyph(student: &StudentRecord) -> &'static str {
    if student.photo_ref.is_some() {
        PHOTO_GLYPH
    } else {
        NO_PHOTO_GLYPH
    }
}

fn class_statistics(lines: &mut Vec<String>, grid: &SeatGrid, summary: &ClassSummary) {
    lines.push(format!("📊 Class {} statistics:", summary.class_id));
    score_statistics(lines, grid, summary);

    // Row 1 is at the back; the desk sits past the last row.
    let last = grid.max_row();
    let rows_of = |keep: &dyn Fn(u32) -> bool| {
        grid.students()
            .filter(|s| keep(s.row))
            .map(|s| s.name.as_str())
            .collect::<Vec<&str>>()
    };
    let front = rows_of(&|row| row + 1 >= last);
    if !front.is_empty() {
        lines.push(format!("  • Front rows ({}): {}", front.len(), front.join(", ")));
    }
    let back = rows_of(&|row| row <= 2);
    if !back.is_empty() {
        lines.push(format!("  • Back rows ({}): {}", back.len(), back.join(", ")));
    }
}

fn score_statistics(lines: &mut Vec<String>, grid: &SeatGrid, summary: &ClassSummary) {
    let Some(stats) = summary.score_stats else {
        lines.push("  • No score data".to_string());
        return;
    };

    lines.push(format!("  • Mean score: {:.1}", stats.mean));
    lines.push(format!(
        "  • Highest: {:.1} | Lowest: {:.1}",
        stats.max, stats.min
    ));
    lines.push("  • Distribution:".to_string());
    for tier in [ScoreTier::Excellent, ScoreTier::Good, ScoreTier::NeedsImprovement] {
        lines.push(format!(
            "    - {} {}: {} ({:.1}%)",
            tier.glyph(),
            tier.label(),
            summary.tier(tier),
            summary.tier_percent(tier).unwrap_or(0.0)
        ));
    }

    let names_in = |tier: ScoreTier| {
        grid.students()
            .filter(|s| s.score.is_some() && ScoreTier::classify(s.score) == tier)
            .map(|s| s.name.as_str())
            .collect::<Vec<&str>>()
    };
    let top = names_in(ScoreTier::Excellent);
    if !top.is_empty() {
        lines.push(format!("  • 🌟 Excellent: {}", top.join(", ")));
    }
    let low = names_in(ScoreTier::NeedsImprovement);
    if !low.is_empty() {
        lines.push(format!("  • 💪 Needs improvement: {}", low.join(", ")));
    }
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push("=".repeat(50));
    lines.push(title.to_string());
    lines.push("=".repeat(50));
}

fn missing_list(lines: &mut Vec<String>, field: &str, entries: &[crate::summary::MissingEntry]) {
    if entries.is_empty() {
        lines.push(format!("✅ No missing {}", field));
        return;
    }
    lines.push(format!("Missing {} ({}):", field, entries.len()));
    for entry in entries {
        lines.push(format!(
            "  • Class {}: {} {}",
            entry.class_id, entry.student_id, entry.name
        ));
    }
}

fn percent(part: usize, whole: usize) -> String {
    crate::summary::ratio(part, whole)
        .map_or_else(|| "N/A".to_string(), |r| format!("{:.1}%", r * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentId;

    fn student(id: &str, row: u32, col: u32, score: Option<f64>) -> StudentRecord {
        StudentRecord {
            student_id: StudentId::new(id),
            name: format!("N{}", &id[3..]),
            class_id: 5,
            row,
            col,
            score,
            photo_ref: None,
        }
    }

    fn render(records: &[StudentRecord]) -> String {
        let grid = SeatGrid::build(5, records).unwrap();
        let summary = ClassSummary::compute(5, records);
        TextRenderer::new().render_class(&grid, &summary).output
    }

    /// Tier glyphs of the seat rows, in order.
    fn chart_tiers(output: &str) -> Vec<ScoreTier> {
        let chart = output.split(PODIUM_GLYPH).next().unwrap();
        chart
            .lines()
            .skip(4) // banner and headline
            .flat_map(|line| line.split(" | "))
            .filter_map(|cell| cell.split_whitespace().next())
            .filter_map(ScoreTier::from_glyph)
            .collect()
    }

    #[test]
    fn test_three_lines_per_row_and_blank_cells() {
        let out = render(&[
            student("30501", 1, 1, Some(95.0)),
            student("30502", 1, 3, Some(55.0)),
        ]);
        let chart: Vec<&str> = out.lines().skip(5).take(4).collect();

        assert_eq!(chart[0], format!("  {:<14} | {:<14} | 🔴 30502", "🟢 30501", ""));
        assert_eq!(chart[1], format!("  {:<14} | {:<14} | ❌ N02", "❌ N01", ""));
        assert!(chart[2].contains("95.0"));
        assert!(chart[3].starts_with("  ---"));
    }

    #[test]
    fn test_empty_rows_skipped_and_single_podium() {
        let out = render(&[student("30501", 1, 1, None), student("30502", 4, 1, None)]);
        // Two emitted rows: 3 lines + separator each.
        let separators = out.lines().filter(|l| l.starts_with("  ---")).count();
        assert_eq!(separators, 2);
        assert_eq!(out.matches(PODIUM_LABEL).count(), 1);
    }

    #[test]
    fn test_tier_sequence() {
        let out = render(&[
            student("30501", 1, 1, Some(95.0)),
            student("30502", 1, 2, Some(55.0)),
            student("30503", 2, 1, None),
        ]);
        assert_eq!(
            chart_tiers(&out),
            vec![
                ScoreTier::Excellent,
                ScoreTier::NeedsImprovement,
                ScoreTier::None
            ]
        );
        assert!(out.contains("Mean score: 75.0"));
        assert!(out.contains("🌟 Excellent: N01"));
        assert!(out.contains("💪 Needs improvement: N02"));
    }

    #[test]
    fn test_front_and_back_rows() {
        let out = render(&[
            student("30501", 1, 1, None),
            student("30502", 3, 1, Some(70.0)),
            student("30503", 4, 2, None),
            student("30504", 5, 1, None),
        ]);
        assert!(out.contains("  • Front rows (2): N03, N04"));
        assert!(out.contains("  • Back rows (1): N01"));
    }

    #[test]
    fn test_no_scores_statistics() {
        let out = render(&[student("30501", 1, 1, None)]);
        assert!(out.contains("No score data"));
        assert!(out.contains("  • Front rows (1): N01"));
    }

    #[test]
    fn test_roster_toggle() {
        let records = [student("30501", 2, 2, Some(70.0))];
        let grid = SeatGrid::build(5, &records).unwrap();
        let summary = ClassSummary::compute(5, &records);

        let with = TextRenderer::new().render_class(&grid, &summary).output;
        assert!(with.contains(" 1. 30501 N01 | seat (2,2) | 70.0"));

        let without = TextRenderer::new()
            .with_roster(false)
            .render_class(&grid, &summary)
            .output;
        assert!(!without.contains("seat order"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let records = [student("30501", 1, 1, Some(81.0)), student("30502", 2, 2, None)];
        assert_eq!(render(&records), render(&records));
    }

    #[test]
    fn test_cohort_report() {
        let records = vec![student("30501", 1, 1, Some(40.0)), student("30502", 1, 2, None)];
        let cohort = CohortSummary::compute(&records);
        let report = TextRenderer::new().render_cohort(&cohort);

        assert!(report.contains("• Students: 2"));
        assert!(report.contains("• Scores: 1/2 (50.0%)"));
        assert!(report.contains("[40, 60)   1 (100.0%)"));
        assert!(report.contains("Missing score (1):"));
        assert!(report.contains("  • Class 5: 30502 N02"));
        assert!(report.contains("Missing photo (2):"));
    }
}
