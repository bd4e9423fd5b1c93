//! CLI binary for labsheet.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReportConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use labsheet::{
    format_value, inspect, process_file, ExtractionProgressCallback, InMemoryReferenceStore,
    LabResultRecord, LabSheetError, PageSelection, PdfiumTextSupplier, ProgressCallback,
    ReportConfig, ReportLayout, ReportOutput, Status,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the selected pages, with a log
/// line per page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; its length is set in `on_extraction_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reading");
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{chars:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_blank(&self, page_num: usize, total_pages: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            yellow("∅"),
            page_num,
            total_pages,
            dim("no text layer"),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, _total_pages: usize, _pages_with_text: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a report (archives it in ./sample_reports, writes ./excel_outputs/*.xlsx)
  labsheet blood_test.pdf

  # Compare against prior results from a JSON file
  labsheet --reference history.json blood_test.pdf

  # One result per line, only the first two pages
  labsheet --layout single-line --pages 1-2 blood_test.pdf

  # A lab with its own line format
  labsheet --pattern '(?P<test>\w[\w ]*?):\s+(?P<result>[\d.]+)\s+(?P<unit>\S+)\s+\[(?P<low>[\d.]+)-(?P<high>[\d.]+)\]' report.pdf

  # Structured output for scripts
  labsheet --json --no-preview blood_test.pdf > summary.json

  # Inspect PDF metadata only
  labsheet --inspect-only blood_test.pdf

REFERENCE FILE FORMAT:
  { "Hemoglobin": { "value": 13.2, "date": "2024-12-15" }, ... }

EXIT CODES:
  0  workbook written
  1  error (bad input, unreadable PDF, write failure)
  2  no text could be extracted from the PDF
  3  no valid test data found in the text

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (otherwise the system library is used)
  RUST_LOG          Override the log filter (e.g. labsheet=debug)
"#;

/// Extract lab results from a PDF report into a colour-coded spreadsheet.
#[derive(Parser, Debug)]
#[command(
    name = "labsheet",
    version,
    about = "Extract lab results from a PDF report into a colour-coded spreadsheet",
    long_about = "Reads the text layer of a laboratory report, finds lines of the form \
'<test> <result> <unit> <low> - <high>', flags results outside their reference range, \
compares them with prior values and writes an .xlsx summary.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF report to process.
    input: PathBuf,

    /// Directory where processed reports are archived.
    #[arg(long, env = "LABSHEET_REPORTS_DIR", default_value = "sample_reports")]
    reports_dir: PathBuf,

    /// Directory where workbooks are written.
    #[arg(long, env = "LABSHEET_OUTPUTS_DIR", default_value = "excel_outputs")]
    outputs_dir: PathBuf,

    /// JSON file of prior results (defaults to the built-in dataset).
    #[arg(long, env = "LABSHEET_REFERENCE")]
    reference: Option<PathBuf>,

    /// Do not copy the report into the reports directory.
    #[arg(long, env = "LABSHEET_NO_ARCHIVE")]
    no_archive: bool,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "LABSHEET_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "LABSHEET_PASSWORD")]
    password: Option<String>,

    /// Built-in line layout.
    #[arg(long, env = "LABSHEET_LAYOUT", value_enum, default_value = "tabular")]
    layout: LayoutArg,

    /// Custom line regex with named groups test, result, unit, low, high.
    /// Overrides --layout.
    #[arg(long, env = "LABSHEET_PATTERN")]
    pattern: Option<String>,

    /// Number of characters of extracted text to preview.
    #[arg(long, env = "LABSHEET_PREVIEW_CHARS", default_value_t = 3000)]
    preview_chars: usize,

    /// Do not print the text preview.
    #[arg(long, env = "LABSHEET_NO_PREVIEW")]
    no_preview: bool,

    /// Worksheet name (1–31 characters).
    #[arg(long, env = "LABSHEET_SHEET_NAME", default_value = "Report")]
    sheet_name: String,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Output structured JSON (ReportOutput) instead of a table.
    #[arg(long, env = "LABSHEET_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "LABSHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LABSHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LABSHEET_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum LayoutArg {
    Tabular,
    SingleLine,
}

impl From<LayoutArg> for ReportLayout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Tabular => ReportLayout::Tabular,
            LayoutArg::SingleLine => ReportLayout::SingleLine,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_failure(&err),
    }
}

/// Print a failure and pick the exit code for it.
fn report_failure(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<LabSheetError>() {
        Some(LabSheetError::NoTextExtracted { .. }) => {
            eprintln!("{} No text could be extracted from the PDF.", red("✘"));
            ExitCode::from(2)
        }
        Some(LabSheetError::NoValidTestData { .. }) => {
            eprintln!("{} No valid test data found.", red("✘"));
            ExitCode::from(3)
        }
        _ => {
            eprintln!("{} {:#}", red("error:"), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, &config).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
        }
        return Ok(());
    }

    // ── Run pipeline ─────────────────────────────────────────────────────
    // Errors stay typed so `report_failure` can pick the exit code.
    let output = process_file(&cli.input, &config)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        print_summary(&output, !cli.no_preview);
    }
    Ok(())
}

/// Map CLI args to `ReportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let pages: PageSelection = cli.pages.parse().context("Invalid --pages")?;

    let layout = match &cli.pattern {
        Some(pattern) => ReportLayout::Custom(pattern.clone()),
        None => cli.layout.clone().into(),
    };

    let supplier = match &cli.pdfium_lib {
        Some(path) => PdfiumTextSupplier::with_library(path),
        None => PdfiumTextSupplier::default(),
    };

    let mut builder = ReportConfig::builder()
        .reports_dir(&cli.reports_dir)
        .outputs_dir(&cli.outputs_dir)
        .archive_uploads(!cli.no_archive)
        .preview_chars(cli.preview_chars)
        .sheet_name(&cli.sheet_name)
        .pages(pages)
        .layout(layout)
        .text_supplier(Arc::new(supplier));

    if let Some(ref path) = cli.reference {
        let store = InMemoryReferenceStore::from_json_file(path)
            .with_context(|| format!("Failed to load reference data from {:?}", path))?;
        builder = builder.reference_store(Arc::new(store));
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

// ── Terminal summary ─────────────────────────────────────────────────────────

fn print_summary(output: &ReportOutput, show_preview: bool) {
    if show_preview && !output.preview.is_empty() {
        println!("{}", bold("Extracted text"));
        println!("{}", dim(&output.preview));
        println!();
    }

    println!("{}", records_table(&output.records));

    if !output.rejected.is_empty() {
        println!(
            "{} {} line(s) matched but could not be parsed:",
            yellow("⚠"),
            output.rejected.len()
        );
        for rejected in &output.rejected {
            println!("  {}", dim(&rejected.to_string()));
        }
    }

    let stats = &output.stats;
    eprintln!(
        "{} {} results  ({} low, {} high)  {}ms",
        green("✔"),
        bold(&stats.records.to_string()),
        stats.low,
        stats.high,
        stats.total_duration_ms,
    );
    if let Some(ref archived) = output.archived_path {
        eprintln!("   archived  {}", dim(&archived.display().to_string()));
    }
    eprintln!(
        "   saved     {}",
        bold(&output.workbook_path.display().to_string())
    );
    eprintln!("   download  {}", output.download_name);
}

fn records_table(records: &[LabResultRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        labsheet::pipeline::render::COLUMNS
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for record in records {
        table.add_row(vec![
            Cell::new(record.test_name()),
            optional_number(record.previous_value()),
            Cell::new(record.previous_date().unwrap_or("-")),
            status_colored(
                Cell::new(format_value(record.current_value())),
                record.status(),
            ),
            optional_number(record.change().map(tidy)),
            Cell::new(record.unit()),
            Cell::new(record.reference_range()),
            status_colored(Cell::new(record.status()), record.status()),
        ]);
    }

    for col in [1, 3, 4] {
        if let Some(column) = table.column_mut(col) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

fn optional_number(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(format_value(v)),
        None => Cell::new("-").fg(Color::DarkGrey),
    }
}

/// Round away float noise from subtraction (`-2.1999999999999993` → `-2.2`)
/// for display. The workbook keeps the exact difference.
fn tidy(value: f64) -> f64 {
    if value.abs() < 1e9 {
        (value * 1e6).round() / 1e6
    } else {
        value
    }
}

fn status_colored(cell: Cell, status: Status) -> Cell {
    match status {
        Status::High => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        Status::Low => cell.fg(Color::DarkYellow).add_attribute(Attribute::Bold),
        Status::Normal => cell,
    }
}
