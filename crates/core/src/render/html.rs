//! HTML output.
//!
//! [`HtmlRenderer::render_class`] produces one `<section>` holding a seat
//! table; [`HtmlRenderer::document`] wraps any number of sections into a
//! self-contained page with styles, class tabs and a photo modal.

use super::{GridRenderer, Rendered, PODIUM_LABEL};
use crate::error::Error;
use crate::grid::{walk, SeatGrid, SeatVisitor};
use crate::summary::ClassSummary;
use crate::tier::ScoreTier;
use crate::types::{ClassId, StudentRecord};

/// A rendered class section, ready to be placed in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlSection {
    pub class_id: ClassId,
    pub markup: String,
}

/// HTML renderer.
#[derive(Debug, Clone, Default)]
pub struct HtmlRenderer {
    /// Prefix joined in front of every photo reference.
    photo_base: Option<String>,
}

impl HtmlRenderer {
    /// Create a renderer that uses photo references as-is.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix photo references with `base` (e.g. `"photos/"`).
    pub fn with_photo_base(mut self, base: impl Into<String>) -> Self {
        let mut base = base.into().replace('\\', "/");
        if !base.is_empty() && !base.ends_with('/') {
            base.push('/');
        }
        self.photo_base = Some(base);
        self
    }

    /// Render one class as a standalone section.
    pub fn render_section(&self, grid: &SeatGrid, summary: &ClassSummary) -> Rendered<HtmlSection> {
        let rendered = self.render_class(grid, summary);
        Rendered {
            output: HtmlSection {
                class_id: grid.class_id(),
                markup: rendered.output,
            },
            issues: rendered.issues,
        }
    }

    /// Wrap sections into a complete page.
    ///
    /// With more than one section a tab bar switches between classes.
    pub fn document(&self, title: &str, sections: &[HtmlSection]) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"ko\">\n<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
        );
        html.push_str(&format!("    <title>{}</title>\n", escape(title)));
        html.push_str("    <style>\n");
        html.push_str(STYLE);
        html.push_str("    </style>\n</head>\n<body>\n");
        html.push_str(&format!(
            "    <div class=\"header\"><h1>🏫 {}</h1></div>\n",
            escape(title)
        ));

        if sections.len() > 1 {
            html.push_str("    <nav class=\"tabs\">\n");
            for (idx, section) in sections.iter().enumerate() {
                html.push_str(&format!(
                    "        <button class=\"tab{}\" data-target=\"class-{}\">Class {}</button>\n",
                    if idx == 0 { " active" } else { "" },
                    section.class_id,
                    section.class_id
                ));
            }
            html.push_str("    </nav>\n");
        }

        for (idx, section) in sections.iter().enumerate() {
            let markup = if idx == 0 || sections.len() == 1 {
                section.markup.clone()
            } else {
                section
                    .markup
                    .replacen("class=\"class-chart\"", "class=\"class-chart hidden\"", 1)
            };
            html.push_str(&markup);
        }

        html.push_str(&legend());
        html.push_str(MODAL_AND_SCRIPT);
        html.push_str("</body>\n</html>\n");
        html
    }
}

impl GridRenderer for HtmlRenderer {
    type Output = String;

    fn render_class(&self, grid: &SeatGrid, summary: &ClassSummary) -> Rendered<String> {
        let class_id = grid.class_id();
        let mut cells = SeatCells {
            photo_base: self.photo_base.as_deref().unwrap_or(""),
            max_col: grid.max_col(),
            markup: String::new(),
            issues: Vec::new(),
        };
        walk(grid, &mut cells);

        let mut html = String::new();
        html.push_str(&format!(
            "    <section class=\"class-chart\" id=\"class-{}\">\n",
            class_id
        ));
        html.push_str(&format!("        <h2>Class {} Seating Chart</h2>\n", class_id));
        html.push_str(&format!(
            "        <div class=\"stats\">{} students | scored: {} | photos: {}</div>\n",
            summary.total, summary.scored_count, summary.photo_count
        ));
        html.push_str("        <div class=\"seating-container\">\n");
        html.push_str("        <table class=\"seating-table\">\n");
        html.push_str(&cells.markup);
        html.push_str("        </table>\n");
        html.push_str("        </div>\n");
        html.push_str(&class_stats(summary));
        html.push_str("    </section>\n");

        Rendered {
            output: html,
            issues: cells.issues,
        }
    }
}

/// Builds the `<tr>`/`<td>` markup during the grid walk.
struct SeatCells<'a> {
    photo_base: &'a str,
    max_col: u32,
    markup: String,
    issues: Vec<Error>,
}

impl SeatVisitor for SeatCells<'_> {
    fn begin_row(&mut self, _row: u32) {
        self.markup.push_str("            <tr>\n");
    }

    fn seat(&mut self, _row: u32, _col: u32, student: Option<&StudentRecord>) {
        let Some(student) = student else {
            self.markup
                .push_str("                <td class=\"seat empty\"></td>\n");
            return;
        };

        let tier = ScoreTier::classify(student.score);
        let photo = match &student.photo_ref {
            Some(photo_ref) => format!(
                "<img src=\"{}{}\" alt=\"{}\" class=\"student-photo\">",
                escape(self.photo_base),
                escape(&photo_ref.replace('\\', "/")),
                escape(&student.name)
            ),
            None => {
                self.issues.push(Error::Render {
                    student_id: student.student_id.clone(),
                    reason: "no photo reference, using placeholder".to_string(),
                });
                "<div class=\"no-photo\">👤</div>".to_string()
            }
        };
        let score = student
            .score
            .map_or_else(|| "-".to_string(), |s| format!("{:.0}", s));

        self.markup.push_str(&format!(
            "                <td class=\"seat {}\">\n",
            tier.as_str()
        ));
        self.markup.push_str(&format!("                    {}\n", photo));
        self.markup.push_str(&format!(
            "                    <div class=\"student-id\">{}</div>\n",
            escape(student.student_id.as_str())
        ));
        self.markup.push_str(&format!(
            "                    <div class=\"student-name\">{}</div>\n",
            escape(&student.name)
        ));
        self.markup.push_str(&format!(
            "                    <div class=\"student-score\">{} {}</div>\n",
            tier_emoji(tier),
            score
        ));
        self.markup.push_str("                </td>\n");
    }

    fn end_row(&mut self, _row: u32) {
        self.markup.push_str("            </tr>\n");
    }

    fn podium(&mut self) {
        self.markup.push_str(&format!(
            "            <tr class=\"podium-row\"><td class=\"podium\" colspan=\"{}\">🏫 {}</td></tr>\n",
            self.max_col,
            escape(PODIUM_LABEL)
        ));
    }
}

fn tier_emoji(tier: ScoreTier) -> &'static str {
    match tier {
        ScoreTier::Excellent => "🌟",
        ScoreTier::Good => "👍",
        ScoreTier::NeedsImprovement => "💪",
        ScoreTier::None => "❓",
    }
}

fn class_stats(summary: &ClassSummary) -> String {
    let Some(stats) = summary.score_stats else {
        return "        <div class=\"class-stats\">No score data</div>\n".to_string();
    };
    format!(
        "        <div class=\"class-stats\">Mean {:.1} | Highest {:.1} | Lowest {:.1} | {} excellent, {} good, {} needs improvement</div>\n",
        stats.mean,
        stats.max,
        stats.min,
        summary.tier(ScoreTier::Excellent),
        summary.tier(ScoreTier::Good),
        summary.tier(ScoreTier::NeedsImprovement)
    )
}

fn legend() -> String {
    let mut html = String::from("    <div class=\"legend\">\n");
    for tier in ScoreTier::ALL {
        html.push_str(&format!(
            "        <span class=\"legend-item {}\">{} {}</span>\n",
            tier.as_str(),
            tier_emoji(tier),
            escape(tier.label())
        ));
    }
    html.push_str("    </div>\n");
    html
}

/// Escape text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"        body { font-family: 'Malgun Gothic', Arial, sans-serif; margin: 20px; background-color: #f5f5f5; }
        .header { text-align: center; margin-bottom: 30px; background: white; padding: 20px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        .header h1 { color: #2c3e50; margin: 0; }
        .tabs { text-align: center; margin-bottom: 20px; }
        .tab { border: none; background: #ecf0f1; padding: 8px 16px; margin: 2px; border-radius: 6px; cursor: pointer; }
        .tab.active { background: #2c3e50; color: white; }
        .class-chart.hidden { display: none; }
        .class-chart h2 { text-align: center; color: #2c3e50; }
        .stats, .class-stats { text-align: center; color: #7f8c8d; margin: 10px 0; }
        .seating-container { display: flex; justify-content: center; margin-bottom: 20px; }
        .seating-table { border-collapse: separate; border-spacing: 10px; background: white; padding: 20px; border-radius: 15px; box-shadow: 0 4px 15px rgba(0,0,0,0.1); }
        .seat { width: 120px; height: 110px; border: 2px solid #ddd; border-radius: 8px; text-align: center; vertical-align: top; padding: 5px; background: white; transition: all 0.3s ease; cursor: pointer; }
        .seat.empty { border-style: dashed; background: transparent; cursor: default; }
        .seat.excellent { border-color: #27ae60; }
        .seat.good { border-color: #f39c12; }
        .seat.needs-improvement { border-color: #e74c3c; }
        .seat.none { border-color: #95a5a6; }
        .student-photo { width: 50px; height: 50px; border-radius: 12px; object-fit: cover; display: block; margin: 2px auto 5px; }
        .no-photo { width: 50px; height: 50px; border-radius: 12px; background: #ecf0f1; margin: 2px auto 5px; display: flex; align-items: center; justify-content: center; color: #bdc3c7; }
        .student-id { font-size: 0.8em; font-weight: bold; color: #2c3e50; }
        .student-name { font-size: 0.85em; color: #2c3e50; }
        .student-score { font-size: 0.75em; font-weight: bold; padding: 1px 4px; border-radius: 10px; display: inline-block; color: white; }
        .excellent .student-score { background: #27ae60; }
        .good .student-score { background: #f39c12; }
        .needs-improvement .student-score { background: #e74c3c; }
        .none .student-score { background: #95a5a6; }
        .podium { text-align: center; background: #f1c40f; border-radius: 8px; padding: 10px; font-weight: bold; }
        .legend { text-align: center; margin: 20px 0; }
        .legend-item { margin: 0 10px; }
        .modal { display: none; position: fixed; z-index: 1000; left: 0; top: 0; width: 100%; height: 100%; background-color: rgba(0,0,0,0.8); }
        .modal-content { position: absolute; top: 50%; left: 50%; transform: translate(-50%, -50%); background: white; padding: 20px; border-radius: 15px; text-align: center; }
        .modal-image { max-width: 300px; max-height: 400px; border-radius: 15px; }
        .close { position: absolute; top: 10px; right: 15px; font-size: 28px; font-weight: bold; color: #aaa; cursor: pointer; }
        @media print { .tabs, .modal { display: none !important; } .class-chart.hidden { display: block; } .class-chart { page-break-after: always; } }
"#;

const MODAL_AND_SCRIPT: &str = r#"    <div id="imageModal" class="modal">
        <div class="modal-content">
            <span class="close">&times;</span>
            <img id="modalImage" class="modal-image" src="" alt="">
            <div id="modalInfo"></div>
        </div>
    </div>
    <script>
        const modal = document.getElementById('imageModal');
        const modalImage = document.getElementById('modalImage');
        const modalInfo = document.getElementById('modalInfo');
        document.querySelectorAll('.seat:not(.empty)').forEach(seat => {
            seat.addEventListener('click', function() {
                const img = this.querySelector('.student-photo');
                if (!img) return;
                modalImage.src = img.src;
                modalImage.alt = img.alt;
                modalInfo.textContent = this.querySelector('.student-id').textContent + ' '
                    + this.querySelector('.student-name').textContent + ' '
                    + this.querySelector('.student-score').textContent;
                modal.style.display = 'block';
            });
        });
        document.querySelector('.close').addEventListener('click', () => { modal.style.display = 'none'; });
        modal.addEventListener('click', e => { if (e.target === modal) modal.style.display = 'none'; });
        document.addEventListener('keydown', e => { if (e.key === 'Escape') modal.style.display = 'none'; });
        document.querySelectorAll('.tab').forEach(tab => {
            tab.addEventListener('click', function() {
                document.querySelectorAll('.tab').forEach(t => t.classList.remove('active'));
                document.querySelectorAll('.class-chart').forEach(c => c.classList.add('hidden'));
                this.classList.add('active');
                document.getElementById(this.dataset.target).classList.remove('hidden');
            });
        });
    </script>
"#;
