//! Page layout for one class.

use crate::encoding::{encode_win_ansi, is_win_ansi, text_width};
use crate::font::{EmbeddedFont, Glyph};
use lopdf::content::Operation;
use lopdf::{Object, StringFormat};
use std::collections::BTreeMap;
use std::sync::Arc;
use seat_core::grid::{walk, SeatGrid, SeatVisitor};
use seat_core::render::{GridRenderer, Rendered, PODIUM_LABEL};
use seat_core::{ClassId, ClassSummary, Error as CoreError, ScoreTier, StudentRecord};

/// Landscape A4 width in points.
pub const PAGE_WIDTH: f32 = 842.0;

/// Landscape A4 height in points.
pub const PAGE_HEIGHT: f32 = 595.0;

const MARGIN: f32 = 36.0;
const TABLE_TOP: f32 = PAGE_HEIGHT - 100.0;
const TABLE_BOTTOM_LIMIT: f32 = 150.0;
const PODIUM_HEIGHT: f32 = 28.0;
const MAX_ROW_HEIGHT: f32 = 60.0;
const MAX_COL_WIDTH: f32 = 110.0;

/// Resource names of the two fonts every page uses.
pub(crate) const FONT_REGULAR: &str = "F1";
pub(crate) const FONT_BOLD: &str = "F2";

/// Resource name of the embedded font, when one is configured.
pub(crate) const FONT_EMBEDDED: &str = "F3";

type Rgb = (f32, f32, f32);

const BLACK: Rgb = (0.0, 0.0, 0.0);
const ROW_SHADE: Rgb = (0.92, 0.92, 0.92);
const PODIUM_FILL: Rgb = (1.0, 0.93, 0.4);

/// Text color of a seat by tier.
fn tier_color(tier: ScoreTier) -> Rgb {
    match tier {
        ScoreTier::Excellent => (0.0, 0.5, 0.0),
        ScoreTier::Good => (0.9, 0.5, 0.0),
        ScoreTier::NeedsImprovement => (0.8, 0.0, 0.0),
        ScoreTier::None => (0.5, 0.5, 0.5),
    }
}

/// Content operations of one class page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub class_id: ClassId,
    pub operations: Vec<Operation>,
    /// Embedded-font glyph ids shown on the page, with their characters.
    pub glyphs: BTreeMap<u16, char>,
}

/// PDF renderer; one page per class.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    font: Option<Arc<EmbeddedFont>>,
}

impl PdfRenderer {
    /// Create a renderer using only the base-14 Helvetica fonts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Show text outside WinAnsi with `font`.
    pub fn with_font(mut self, font: Arc<EmbeddedFont>) -> Self {
        self.font = Some(font);
        self
    }

    pub fn font(&self) -> Option<&Arc<EmbeddedFont>> {
        self.font.as_ref()
    }
}

impl GridRenderer for PdfRenderer {
    type Output = PdfPage;

    fn render_class(&self, grid: &SeatGrid, summary: &ClassSummary) -> Rendered<PdfPage> {
        let class_id = grid.class_id();
        let mut canvas = Canvas::new(self.font.as_deref());

        canvas.centered_text(
            PAGE_HEIGHT - 50.0,
            FONT_BOLD,
            18.0,
            BLACK,
            &format!("Class {} Seating Chart", class_id),
        );
        canvas.centered_text(
            PAGE_HEIGHT - 74.0,
            FONT_REGULAR,
            12.0,
            BLACK,
            &format!(
                "{} students | scored: {} | photos: {}",
                summary.total, summary.scored_count, summary.photo_count
            ),
        );

        let mut table = SeatTable::new(canvas, grid);
        walk(grid, &mut table);
        let SeatTable {
            mut canvas, issues, ..
        } = table;

        legend(&mut canvas);
        statistics(&mut canvas, summary);

        Rendered {
            output: PdfPage {
                class_id,
                operations: canvas.operations,
                glyphs: canvas.glyphs,
            },
            issues,
        }
    }
}

/// Text prepared for one of the page fonts.
enum Shaped {
    WinAnsi { bytes: Vec<u8>, lossy: bool },
    Embedded(Vec<(char, Glyph)>),
}

/// Collects content operations.
struct Canvas<'a> {
    operations: Vec<Operation>,
    font: Option<&'a EmbeddedFont>,
    glyphs: BTreeMap<u16, char>,
}

impl<'a> Canvas<'a> {
    fn new(font: Option<&'a EmbeddedFont>) -> Self {
        Self {
            operations: Vec::new(),
            font,
            glyphs: BTreeMap::new(),
        }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.operations.push(Operation::new(operator, operands));
    }

    fn fill_color(&mut self, (r, g, b): Rgb) {
        self.op("rg", vec![real(r), real(g), real(b)]);
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, paint: &str) {
        self.op("re", vec![real(x), real(y), real(width), real(height)]);
        self.op(paint, vec![]);
    }

    /// Helvetica when it can show `text`, else the embedded font when it has
    /// every glyph, else Helvetica with replacements.
    fn shape(&self, text: &str) -> Shaped {
        if !is_win_ansi(text) {
            if let Some(glyphs) = self.font.and_then(|font| font.encode(text)) {
                return Shaped::Embedded(glyphs);
            }
        }
        let (bytes, lossy) = encode_win_ansi(text);
        Shaped::WinAnsi { bytes, lossy }
    }

    fn width(&self, text: &str, size: f32) -> f32 {
        match (self.shape(text), self.font) {
            (Shaped::Embedded(glyphs), Some(font)) => font.width(&glyphs, size),
            _ => text_width(text, size),
        }
    }

    /// Draw text at `(x, y)`; returns whether characters were replaced.
    fn text(&mut self, x: f32, y: f32, font: &str, size: f32, color: Rgb, text: &str) -> bool {
        let (font, shown, lossy) = match self.shape(text) {
            Shaped::WinAnsi { bytes, lossy } => (font, Object::String(bytes, StringFormat::Literal), lossy),
            Shaped::Embedded(glyphs) => {
                let mut bytes = Vec::with_capacity(glyphs.len() * 2);
                for (c, glyph) in glyphs {
                    bytes.extend_from_slice(&glyph.id.to_be_bytes());
                    self.glyphs.insert(glyph.id, c);
                }
                (FONT_EMBEDDED, Object::String(bytes, StringFormat::Hexadecimal), false)
            }
        };

        self.fill_color(color);
        self.op("BT", vec![]);
        self.op("Tf", vec![Object::Name(font.as_bytes().to_vec()), real(size)]);
        self.op("Td", vec![real(x), real(y)]);
        self.op("Tj", vec![shown]);
        self.op("ET", vec![]);
        lossy
    }

    fn centered_text(&mut self, y: f32, font: &str, size: f32, color: Rgb, text: &str) -> bool {
        let x = (PAGE_WIDTH - self.width(text, size)) / 2.0;
        self.text(x.max(MARGIN), y, font, size, color, text)
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Grid walk that draws the seat table and podium.
struct SeatTable<'a> {
    canvas: Canvas<'a>,
    issues: Vec<CoreError>,
    left: f32,
    col_width: f32,
    row_height: f32,
    font_size: f32,
    /// Top edge of the next row.
    cursor: f32,
    row_index: usize,
    max_col: u32,
}

impl<'a> SeatTable<'a> {
    fn new(canvas: Canvas<'a>, grid: &SeatGrid) -> Self {
        let rows = grid.occupied_rows().len().max(1) as f32;
        let max_col = grid.max_col().max(1);
        let usable_height = TABLE_TOP - TABLE_BOTTOM_LIMIT - PODIUM_HEIGHT;
        let row_height = (usable_height / rows).min(MAX_ROW_HEIGHT);
        let col_width = ((PAGE_WIDTH - 2.0 * MARGIN) / max_col as f32).min(MAX_COL_WIDTH);
        let table_width = col_width * max_col as f32;

        Self {
            canvas,
            issues: Vec::new(),
            left: (PAGE_WIDTH - table_width) / 2.0,
            col_width,
            row_height,
            font_size: (row_height / 4.0).min(10.0),
            cursor: TABLE_TOP,
            row_index: 0,
            max_col,
        }
    }

    fn table_width(&self) -> f32 {
        self.col_width * self.max_col as f32
    }

    fn cell_text(&mut self, x: f32, y: f32, color: Rgb, text: &str) -> bool {
        let size = self.font_size;
        let offset = (self.col_width - self.canvas.width(text, size)).max(4.0) / 2.0;
        self.canvas.text(x + offset, y, FONT_REGULAR, size, color, text)
    }
}

impl SeatVisitor for SeatTable<'_> {
    fn begin_row(&mut self, _row: u32) {
        if self.row_index % 2 == 1 {
            self.canvas.fill_color(ROW_SHADE);
            let (left, bottom, width, height) = (
                self.left,
                self.cursor - self.row_height,
                self.table_width(),
                self.row_height,
            );
            self.canvas.rect(left, bottom, width, height, "f");
        }
    }

    fn seat(&mut self, _row: u32, col: u32, student: Option<&StudentRecord>) {
        let x = self.left + (col - 1) as f32 * self.col_width;
        let bottom = self.cursor - self.row_height;

        self.canvas.op("w", vec![real(0.8)]);
        self.canvas.op("RG", vec![real(0.0), real(0.0), real(0.0)]);
        self.canvas.rect(x, bottom, self.col_width, self.row_height, "S");

        let Some(student) = student else {
            return;
        };

        let color = tier_color(ScoreTier::classify(student.score));
        let step = self.row_height / 4.0;
        let score = student
            .score
            .map_or_else(|| "no score".to_string(), |s| format!("{:.1}", s));

        self.cell_text(x, self.cursor - step - self.font_size / 2.0, color, student.student_id.as_str());
        let lossy = self.cell_text(x, self.cursor - 2.0 * step - self.font_size / 2.0, color, &student.name);
        self.cell_text(x, self.cursor - 3.0 * step - self.font_size / 2.0, color, &score);

        if lossy {
            self.issues.push(CoreError::Render {
                student_id: student.student_id.clone(),
                reason: format!(
                    "name '{}' has characters no page font can show; replaced with '?'",
                    student.name
                ),
            });
        }
    }

    fn end_row(&mut self, _row: u32) {
        self.cursor -= self.row_height;
        self.row_index += 1;
    }

    fn podium(&mut self) {
        let bottom = self.cursor - PODIUM_HEIGHT;
        let (left, width) = (self.left, self.table_width());
        self.canvas.fill_color(PODIUM_FILL);
        self.canvas.rect(left, bottom, width, PODIUM_HEIGHT, "f");

        let size = 14.0;
        let x = left + (width - text_width(PODIUM_LABEL, size)) / 2.0;
        self.canvas
            .text(x, bottom + (PODIUM_HEIGHT - size) / 2.0 + 3.0, FONT_BOLD, size, BLACK, PODIUM_LABEL);
        self.cursor = bottom;
    }
}

fn legend(canvas: &mut Canvas<'_>) {
    let mut y = 120.0;
    canvas.text(MARGIN + 14.0, y, FONT_BOLD, 10.0, BLACK, "Legend:");
    for tier in ScoreTier::ALL {
        y -= 14.0;
        canvas.text(
            MARGIN + 14.0,
            y,
            FONT_REGULAR,
            10.0,
            tier_color(tier),
            &format!("• {}", tier.label()),
        );
    }
}

fn statistics(canvas: &mut Canvas<'_>, summary: &ClassSummary) {
    let x = PAGE_WIDTH / 2.0;
    let mut y = 120.0;
    canvas.text(x, y, FONT_BOLD, 11.0, BLACK, "Score statistics:");

    let Some(stats) = summary.score_stats else {
        canvas.text(x, y - 16.0, FONT_REGULAR, 11.0, BLACK, "• No score data");
        return;
    };

    let lines = [
        format!("• Mean score: {:.1}", stats.mean),
        format!("• Highest: {:.1} | Lowest: {:.1}", stats.max, stats.min),
        format!(
            "• Distribution: excellent {}, good {}, needs improvement {}",
            summary.tier(ScoreTier::Excellent),
            summary.tier(ScoreTier::Good),
            summary.tier(ScoreTier::NeedsImprovement)
        ),
    ];
    for line in &lines {
        y -= 16.0;
        canvas.text(x, y, FONT_REGULAR, 11.0, BLACK, line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seat_core::{StudentId, StudentRecord};

    fn student(id: &str, name: &str, row: u32, col: u32, score: Option<f64>) -> StudentRecord {
        StudentRecord {
            student_id: StudentId::new(id),
            name: name.to_string(),
            class_id: 5,
            row,
            col,
            score,
            photo_ref: None,
        }
    }

    fn render_with(renderer: &PdfRenderer, records: &[StudentRecord]) -> Rendered<PdfPage> {
        let grid = SeatGrid::build(5, records).unwrap();
        let summary = ClassSummary::compute(5, records);
        renderer.render_class(&grid, &summary)
    }

    fn render(records: &[StudentRecord]) -> Rendered<PdfPage> {
        render_with(&PdfRenderer::new(), records)
    }

    fn hangul_renderer(chars: &[char]) -> PdfRenderer {
        let font = EmbeddedFont::from_bytes("Gothic", crate::font::tiny_truetype(chars)).unwrap();
        PdfRenderer::new().with_font(Arc::new(font))
    }

    fn shown_text(page: &PdfPage) -> Vec<Vec<u8>> {
        page.operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_page_shows_every_seat_once() {
        let records = vec![
            student("30501", "Kim", 1, 1, Some(95.0)),
            student("30502", "Lee", 1, 2, Some(55.0)),
            student("30503", "Park", 2, 1, None),
        ];
        let rendered = render(&records);
        assert!(rendered.issues.is_empty());

        let text = shown_text(&rendered.output);
        for expected in ["30501", "Kim", "95.0", "55.0", "no score", "Teacher's desk"] {
            assert_eq!(
                text.iter().filter(|t| t.as_slice() == expected.as_bytes()).count(),
                1,
                "{}",
                expected
            );
        }
        assert!(text.contains(&b"Class 5 Seating Chart".to_vec()));
        assert!(text.contains(&b"3 students | scored: 2 | photos: 0".to_vec()));
        assert!(text.contains(&b"\x95 Mean score: 75.0".to_vec()));
    }

    #[test]
    fn test_seat_borders_cover_full_columns() {
        let records = vec![
            student("30501", "Kim", 1, 1, None),
            student("30502", "Lee", 2, 3, None),
        ];
        let page = render(&records).output;
        let strokes = page.operations.iter().filter(|op| op.operator == "S").count();
        assert_eq!(strokes, 6);
    }

    #[test]
    fn test_hangul_name_is_reported() {
        let records = vec![student("30501", "권민지", 1, 1, Some(80.0))];
        let rendered = render(&records);

        assert_eq!(rendered.issues.len(), 1);
        assert!(matches!(
            &rendered.issues[0],
            CoreError::Render { student_id, .. } if student_id.as_str() == "30501"
        ));
        assert!(shown_text(&rendered.output).contains(&b"???".to_vec()));
        assert!(rendered.output.glyphs.is_empty());
    }

    #[test]
    fn test_hangul_name_uses_embedded_glyphs() {
        let records = vec![
            student("30102", "권민지", 1, 1, Some(90.0)),
            student("30103", "Kim", 1, 2, None),
        ];
        let rendered = render_with(&hangul_renderer(&['권', '민', '지']), &records);
        assert!(rendered.issues.is_empty());

        let page = &rendered.output;
        let text = shown_text(page);
        assert!(text.contains(&vec![0, 1, 0, 2, 0, 3]));
        assert!(text.contains(&b"Kim".to_vec()));
        assert!(text.contains(&b"90.0".to_vec()));
        assert!(!text.contains(&b"???".to_vec()));
        assert_eq!(
            page.glyphs,
            [(1, '권'), (2, '민'), (3, '지')].into_iter().collect::<BTreeMap<u16, char>>()
        );

        let embedded_runs = page
            .operations
            .iter()
            .filter(|op| {
                op.operator == "Tf"
                    && matches!(op.operands.first(), Some(Object::Name(n)) if n == FONT_EMBEDDED.as_bytes())
            })
            .count();
        assert_eq!(embedded_runs, 1);
    }

    #[test]
    fn test_font_without_glyph_falls_back() {
        let records = vec![student("30102", "권민지", 1, 1, Some(90.0))];
        let rendered = render_with(&hangul_renderer(&['권', '민']), &records);

        assert_eq!(rendered.issues.len(), 1);
        assert!(shown_text(&rendered.output).contains(&b"???".to_vec()));
        assert!(rendered.output.glyphs.is_empty());
    }
}
