//! CLI binary for tariff-tracker.
//!
//! A thin shim over the library crate: maps flags to `TrackerConfig`, runs
//! one batch, prints the report and writes the HTML/DOCX exports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tariff_tracker::report::{plain, Report};
use tariff_tracker::{
    parse_tickers, BatchProgressCallback, ProgressCallback, TariffTracker, TrackerConfig,
    UploadedDocument,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Progress bar over companies plus one log line per finished company.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} companies  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self, key: &str) -> String {
        let secs = self
            .start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating analysis for {total} companies…"))
        ));
    }

    fn on_company_start(&self, key: &str, _index: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), Instant::now());
        self.bar.set_message(key.to_string());
    }

    fn on_company_complete(&self, key: &str, index: usize, total: usize) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {:<16}  {}",
            green("✓"),
            index,
            total,
            key,
            self.elapsed(key)
        ));
        self.bar.inc(1);
    }

    fn on_company_error(&self, key: &str, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = match error.char_indices().nth(90) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {:<16}  {}  {}",
            red("✗"),
            index,
            total,
            key,
            red(&msg),
            self.elapsed(key)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} companies analysed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} companies analysed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Earnings calls for three tickers, Q2 2025
  tariff-tracker fetch "AAPL, MSFT, GOOGL" --year 2025 --quarter 2

  # Uploaded filings
  tariff-tracker upload Siemens_Q2.pdf Bosch_H1.pdf -o reports/

  # JSON dump of the analysis set instead of the text report
  tariff-tracker --json fetch F,GM

  # Branded HTML export
  tariff-tracker --logo logo.png fetch AAPL

  # Use another provider through edgequake-llm
  tariff-tracker --provider openai --model gpt-4.1-mini fetch AAPL

ENVIRONMENT VARIABLES (also read from .env):
  FMP_API_KEY             Financial Modeling Prep key (transcripts)
  DEEPSEEK_API_KEY        DeepSeek key (extraction; not needed with --provider)
  OPENAI_API_KEY, ...     Keys for alternate providers
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Overrides the log filter

OUTPUT:
  tariff_impact_report.html   self-contained report with embedded styles
  tariff_impact_report.docx   the same sections as a Word document
"#;

/// Track tariff impacts across earnings calls and filings.
#[derive(Parser, Debug)]
#[command(
    name = "tariff-tracker",
    version,
    about = "Extract tariff impacts from earnings calls and PDFs and compare companies",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory for tariff_impact_report.html and .docx.
    #[arg(short, long, global = true, env = "TARIFF_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Skip writing the HTML/DOCX reports.
    #[arg(long, global = true)]
    no_export: bool,

    /// Print the analysis set as JSON instead of the text report.
    #[arg(long, global = true)]
    json: bool,

    /// PNG logo for the HTML report header.
    #[arg(long, global = true, env = "TARIFF_LOGO")]
    logo: Option<PathBuf>,

    /// Financial Modeling Prep API key.
    #[arg(long, env = "FMP_API_KEY", hide_env_values = true, global = true)]
    fmp_api_key: Option<String>,

    /// DeepSeek API key.
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true, global = true)]
    deepseek_api_key: Option<String>,

    /// Alternate LLM provider: openai, anthropic, gemini, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER", global = true, requires = "model")]
    provider: Option<String>,

    /// Model ID. Default: deepseek-chat.
    #[arg(long, env = "TARIFF_MODEL", global = true)]
    model: Option<String>,

    /// Characters of each document sent for extraction.
    #[arg(long, default_value_t = 40_000, global = true)]
    max_input_chars: usize,

    /// Extraction call timeout in seconds.
    #[arg(long, default_value_t = 120, global = true)]
    api_timeout: u64,

    /// Transcript fetch timeout in seconds.
    #[arg(long, default_value_t = 60, global = true)]
    fetch_timeout: u64,

    /// Disable progress bar.
    #[arg(long, global = true)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and analyse earnings-call transcripts.
    Fetch {
        /// Comma-separated tickers, e.g. "AAPL, MSFT, GOOGL".
        tickers: String,

        #[arg(long, default_value_t = 2025,
              value_parser = clap::value_parser!(i32).range(2010..=2030))]
        year: i32,

        #[arg(long, default_value_t = 2,
              value_parser = clap::value_parser!(u8).range(1..=4))]
        quarter: u8,
    },
    /// Analyse one or more PDF documents.
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env fallbacks.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let mut tracker = TariffTracker::new(&config).context("Failed to start tracker")?;

    // ── Run batch ────────────────────────────────────────────────────────
    match &cli.command {
        Command::Fetch {
            tickers,
            year,
            quarter,
        } => {
            let tickers = parse_tickers(tickers);
            if tickers.is_empty() {
                anyhow::bail!("Enter at least one ticker, e.g. \"AAPL, MSFT\"");
            }
            tracker.analyze_transcripts(&tickers, *year, *quarter).await;
        }
        Command::Upload { files } => {
            let mut docs = Vec::with_capacity(files.len());
            for path in files {
                docs.push(
                    UploadedDocument::from_path(path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                );
            }
            tracker.analyze_uploads(docs).await;
        }
    }

    let set = tracker
        .current()
        .context("Batch produced no analysis set")?;

    // ── Print ────────────────────────────────────────────────────────────
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(set).context("Failed to serialise analysis")?
        );
    } else {
        print!("{}", plain::render(&Report::from_set(set)));
    }

    // ── Export ───────────────────────────────────────────────────────────
    if !cli.no_export {
        let paths = tracker
            .export(&cli.output_dir)
            .await
            .context("Export failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} companies  →  {}, {}",
                if set.success_count() == set.len() {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                set.success_count(),
                set.len(),
                bold(&paths.html.display().to_string()),
                bold(&paths.docx.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `TrackerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TrackerConfig> {
    let mut builder = TrackerConfig::builder_from_env()
        .max_input_chars(cli.max_input_chars)
        .extraction_timeout_secs(cli.api_timeout)
        .transcript_timeout_secs(cli.fetch_timeout);

    if let Some(ref key) = cli.fmp_api_key {
        builder = builder.fmp_api_key(key.clone());
    }
    if let Some(ref key) = cli.deepseek_api_key {
        builder = builder.deepseek_api_key(key.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref logo) = cli.logo {
        builder = builder.logo_path(logo.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
