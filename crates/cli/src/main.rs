//! CLI tool for integrating student data and printing seating charts.

mod sources;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use seat_core::chart::ChartSet;
use seat_core::interchange;
use seat_core::render::html::HtmlSection;
use seat_core::{join_records, ClassId, CohortSummary, HtmlRenderer, TextRenderer};
use seat_pdf::{EmbeddedFont, PdfRenderer};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Merge seating, score and photo sources and render classroom seating charts.
#[derive(Parser, Debug)]
#[command(name = "seatchart")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join seating, score and photo sources into one unified CSV
    Integrate {
        /// Seating workbook (.xlsx, one sheet per class) or seating CSV
        #[arg(long)]
        seating: PathBuf,

        /// Score workbook (.xlsx) or score CSV
        #[arg(long)]
        scores: Option<PathBuf>,

        /// Photo roster deck(s) (.pptx) or photo CSV(s)
        #[arg(long)]
        photos: Vec<PathBuf>,

        /// Grade digit used to compose ids from score sheets
        #[arg(long, default_value = "3")]
        grade: u32,

        /// Directory for pictures extracted from roster decks
        #[arg(long, default_value = "photos")]
        photo_dir: PathBuf,

        /// Unified CSV to write
        #[arg(short, long, default_value = "integrated_student_data.csv")]
        output: PathBuf,
    },

    /// Print seating charts as text
    Show {
        #[command(flatten)]
        input: ChartInput,

        /// Omit the seat-order student list
        #[arg(long)]
        no_roster: bool,

        /// Also write class_<N>_seating_chart.csv files into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },

    /// Write seating charts as HTML
    Html {
        #[command(flatten)]
        input: ChartInput,

        /// Output file, or output directory with --per-class
        #[arg(short, long, default_value = "seating_charts.html")]
        output: PathBuf,

        /// Write one document per class instead of one tabbed document
        #[arg(long)]
        per_class: bool,

        /// Prefix prepended to every photo reference
        #[arg(long)]
        photo_base: Option<String>,
    },

    /// Write seating charts as PDF, one page per class
    Pdf {
        #[command(flatten)]
        input: ChartInput,

        /// Output file
        #[arg(short, long, default_value = "seating_charts.pdf")]
        output: PathBuf,

        /// TrueType font embedded for names outside Latin-1 (e.g. malgun.ttf)
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Print cohort statistics
    Summary {
        /// Unified CSV written by `integrate`
        input: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Unified CSV plus an optional class selection.
#[derive(ClapArgs, Debug)]
struct ChartInput {
    /// Unified CSV written by `integrate`
    input: PathBuf,

    /// Only these classes (repeatable); all classes by default
    #[arg(short, long = "class")]
    classes: Vec<ClassId>,
}

impl ChartInput {
    fn load(&self) -> Result<ChartSet> {
        let records = sources::load_unified(&self.input)?;
        let selection = (!self.classes.is_empty()).then_some(self.classes.as_slice());
        let set = ChartSet::build_selected(&records, selection);

        // Skipped classes are already logged; only a run-level error stops here.
        if let Some(fatal) = set.skipped.iter().find(|e| e.is_fatal()) {
            anyhow::bail!("Cannot chart {}: {}", self.input.display(), fatal);
        }
        if set.charts.is_empty() {
            anyhow::bail!("No class could be charted from {}", self.input.display());
        }
        Ok(set)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Integrate {
            seating,
            scores,
            photos,
            grade,
            photo_dir,
            output,
        } => integrate(&seating, scores.as_deref(), &photos, grade, &photo_dir, &output),
        Command::Show {
            input,
            no_roster,
            csv_dir,
        } => show(&input, !no_roster, csv_dir.as_deref()),
        Command::Html {
            input,
            output,
            per_class,
            photo_base,
        } => html(&input, &output, per_class, photo_base),
        Command::Pdf {
            input,
            output,
            font,
        } => pdf(&input, &output, font.as_deref()),
        Command::Summary { input, json } => summary(&input, json),
    }
}

fn integrate(
    seating: &Path,
    scores: Option<&Path>,
    photos: &[PathBuf],
    grade: u32,
    photo_dir: &Path,
    output: &Path,
) -> Result<()> {
    let seating = sources::load_seating(seating)?;
    let scores = match scores {
        Some(path) => sources::load_scores(path, grade)?,
        None => Vec::new(),
    };
    let mut photo_records = Vec::new();
    for path in photos {
        photo_records.extend(sources::load_photos(path, photo_dir)?);
    }

    log::debug!(
        "Joining {} seats, {} scores, {} photos",
        seating.len(),
        scores.len(),
        photo_records.len()
    );
    let mut report = join_records(seating, &scores, &photo_records);
    interchange::sort_unified(&mut report.records);

    let mut file = interchange::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    interchange::write_unified(&mut file, &report.records)
        .and_then(|()| file.flush().map_err(Into::into))
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let cohort = CohortSummary::compute(&report.records);
    println!(
        "Integrated {} students in {} classes: {} scored, {} with photos",
        cohort.total,
        cohort.classes.len(),
        cohort.scored_count,
        cohort.photo_count
    );
    if !report.conflicts.is_empty() || report.unmatched > 0 {
        println!(
            "{} duplicate rows ignored, {} ids matched no seat",
            report.conflicts.len(),
            report.unmatched
        );
    }
    println!("Written to: {}", output.display());
    Ok(())
}

fn show(input: &ChartInput, roster: bool, csv_dir: Option<&Path>) -> Result<()> {
    let set = input.load()?;
    let renderer = TextRenderer::new().with_roster(roster);

    let mut stdout = std::io::stdout().lock();
    for chart in &set.charts {
        let text = chart.render(&renderer).into_logged();
        writeln!(stdout, "{}", text)?;
    }

    if let Some(dir) = csv_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        for chart in &set.charts {
            let path = dir.join(format!("class_{}_seating_chart.csv", chart.class_id()));
            let mut file = interchange::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            interchange::write_class_chart(&mut file, &chart.grid)
                .and_then(|()| file.flush().map_err(Into::into))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            writeln!(stdout, "Written to: {}", path.display())?;
        }
    }
    Ok(())
}

fn html(input: &ChartInput, output: &Path, per_class: bool, photo_base: Option<String>) -> Result<()> {
    let set = input.load()?;

    let renderer = match &photo_base {
        Some(base) => HtmlRenderer::new().with_photo_base(base.clone()),
        None => HtmlRenderer::new(),
    };

    let html_dir = if per_class {
        output.to_path_buf()
    } else {
        output.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    let check_base = match &photo_base {
        Some(base) => html_dir.join(base),
        None => html_dir.clone(),
    };
    let charted = set.charts.iter().flat_map(|chart| chart.grid.students());
    for missing in sources::missing_photos(charted, Some(&check_base)) {
        log::warn!("Photo not found: {}", missing.display());
    }

    let sections: Vec<HtmlSection> = set
        .charts
        .iter()
        .map(|chart| renderer.render_section(&chart.grid, &chart.summary).into_logged())
        .collect();

    if per_class {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory: {}", output.display()))?;
        for section in &sections {
            let path = output.join(format!("class_{}_seating_chart.html", section.class_id));
            let title = format!("Class {} Seating Chart", section.class_id);
            write_output(&path, renderer.document(&title, std::slice::from_ref(section)).as_bytes())?;
            println!("Written to: {}", path.display());
        }
    } else {
        let document = renderer.document("Seating Charts", &sections);
        write_output(output, document.as_bytes())?;
        println!("Written to: {}", output.display());
    }
    Ok(())
}

fn pdf(input: &ChartInput, output: &Path, font: Option<&Path>) -> Result<()> {
    let set = input.load()?;

    let renderer = match font.map(EmbeddedFont::from_file) {
        Some(Ok(font)) => {
            log::debug!("Embedding font {} ({} glyphs)", font.name(), font.glyph_count());
            PdfRenderer::new().with_font(Arc::new(font))
        }
        Some(Err(e)) => {
            log::warn!("{}; falling back to Helvetica", e);
            PdfRenderer::new()
        }
        None => PdfRenderer::new(),
    };
    let rendered = seat_pdf::render_document(&renderer, &set.charts).context("Failed to build PDF")?;
    let bytes = rendered.into_logged();

    write_output(output, &bytes)?;
    println!(
        "Written to: {} ({} pages, {:.1} KB)",
        output.display(),
        set.charts.len(),
        bytes.len() as f64 / 1024.0
    );
    Ok(())
}

fn summary(input: &Path, json: bool) -> Result<()> {
    let records = sources::load_unified(input)?;
    let cohort = CohortSummary::compute(&records);

    if json {
        let text = serde_json::to_string_pretty(&cohort).context("Failed to serialize summary")?;
        println!("{}", text);
    } else {
        print!("{}", TextRenderer::new().render_cohort(&cohort));
    }
    Ok(())
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
