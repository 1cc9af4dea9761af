//! CLI binary for georef-iiif.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConvertConfig` / `CheckConfig` and prints a summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use georef_iiif::{
    convert_from_metadata, run_check, BatchProgressCallback, CheckConfig, ConvertConfig,
    OutputFormat, PixelProperty, ProgressCallback, Sharding, WriteMode,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar plus one log line per item.
struct CliProgressCallback {
    bar: ProgressBar,
    /// "records" or "manifests", used in the bar and summary.
    noun: &'static str,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new(verb: &'static str, noun: &'static str) -> Arc<Self> {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>4}}/{{len}} {noun}  \
             ⏱ {{elapsed_precise}}  ETA {{eta_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix(verb);
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            noun,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_item_start(&self, _index: usize, _total: usize, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn on_item_complete(&self, index: usize, total: usize, label: &str) {
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}",
            green("✓"),
            index,
            total,
            dim(label)
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, label: &str, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>4}/{:<4}  {}  {}",
            red("✗"),
            index,
            total,
            label,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 && success_count == total {
            eprintln!(
                "{} {} {} ok",
                green("✔"),
                bold(&success_count.to_string()),
                self.noun
            );
        } else {
            eprintln!(
                "{} {}/{} {} ok  ({} failed)",
                if success_count == 0 && total > 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total,
                self.noun,
                red(&total.saturating_sub(success_count).to_string()),
            );
        }
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every record listed in metadata.csv
  georef convert -m metadata.csv -i klokan/ -o annotations/ \
      -b https://maps.example.org/georef

  # Allmaps-style output, unsharded
  georef convert -m metadata.csv -i klokan/ --format allmaps --flat

  # Check manifests and images, half a second apart
  georef check -m metadata.csv -o report.csv

  # Add to an existing report
  georef check -m metadata.csv -o report.csv --append --delay-ms 1000

METADATA COLUMNS:
  georef_id      record identifier (alias: georef_klokan)
  image_uri      IIIF Image API base URI
  manifest_url   IIIF Presentation manifest URL (check only)
"#;

/// Convert Klokan georeferencing records to IIIF annotations and check IIIF reachability.
#[derive(Parser, Debug)]
#[command(
    name = "georef",
    version,
    about = "Convert Klokan georeferencing records to IIIF Georeference Annotations",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "GEOREF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "GEOREF_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "GEOREF_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert records into annotation documents.
    Convert(ConvertArgs),
    /// Check that manifests and images respond.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// CSV metadata table with georef_id and image_uri columns.
    #[arg(short, long, env = "GEOREF_METADATA")]
    metadata: PathBuf,

    /// Root of the sharded Klokan record tree.
    #[arg(short, long, env = "GEOREF_INPUT")]
    input: PathBuf,

    /// Root of the output tree.
    #[arg(short, long, env = "GEOREF_OUTPUT", default_value = "./output")]
    output: PathBuf,

    /// Base URI for annotation ids; the record id is appended.
    #[arg(short, long, env = "GEOREF_BASE_URI", default_value = "")]
    base_uri: String,

    /// Output document format.
    #[arg(long, env = "GEOREF_FORMAT", value_enum, default_value = "iiif")]
    format: FormatArg,

    /// Property name for pixel coordinates on each GCP feature.
    #[arg(long, env = "GEOREF_PIXEL_PROPERTY", value_enum, default_value = "resource-coords")]
    pixel_property: PixelPropertyArg,

    /// Write all outputs directly under the output root.
    #[arg(long, env = "GEOREF_FLAT")]
    flat: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// CSV metadata table with manifest_url and image_uri columns.
    #[arg(short, long, env = "GEOREF_METADATA")]
    metadata: PathBuf,

    /// Report CSV path.
    #[arg(short, long, env = "GEOREF_REPORT")]
    output: PathBuf,

    /// Keep existing report rows instead of overwriting.
    #[arg(long, env = "GEOREF_APPEND")]
    append: bool,

    /// Pause between checks in milliseconds; 0 disables.
    #[arg(long, env = "GEOREF_DELAY_MS", default_value_t = 500)]
    delay_ms: u64,

    /// Per-request timeout in seconds. No timeout when unset.
    #[arg(long, env = "GEOREF_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Iiif,
    Allmaps,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Iiif => OutputFormat::IiifAnnotation,
            FormatArg::Allmaps => OutputFormat::Allmaps,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PixelPropertyArg {
    ResourceCoords,
    PixelCoords,
}

impl From<PixelPropertyArg> for PixelProperty {
    fn from(v: PixelPropertyArg) -> Self {
        match v {
            PixelPropertyArg::ResourceCoords => PixelProperty::ResourceCoords,
            PixelPropertyArg::PixelCoords => PixelProperty::PixelCoords,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already reports each item, so library INFO logs are
    // muted while it is shown.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    match &cli.command {
        Commands::Convert(args) => run_convert(&cli, args, show_progress).await,
        Commands::Check(args) => run_check_command(&cli, args, show_progress).await,
    }
}

async fn run_convert(cli: &Cli, args: &ConvertArgs, show_progress: bool) -> Result<()> {
    let mut builder = ConvertConfig::builder()
        .input_dir(&args.input)
        .output_dir(&args.output)
        .base_uri(args.base_uri.clone())
        .format(args.format.into())
        .pixel_property(args.pixel_property.into())
        .sharding(if args.flat {
            Sharding::Flat
        } else {
            Sharding::ByFirstChar
        });
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new("Converting", "records");
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output = convert_from_metadata(&args.metadata, &config)
        .await
        .context("Conversion failed")?;

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} records  {} GCPs  {}ms  →  {}",
            if stats.failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.converted,
            stats.total_records,
            stats.total_gcps,
            stats.total_duration_ms,
            bold(&args.output.display().to_string()),
        );
        if !show_progress {
            for failure in output.failures() {
                if let Some(ref e) = failure.error {
                    eprintln!("  {} {}  {}", red("✗"), failure.georef_id, e);
                }
            }
        }
    }
    Ok(())
}

async fn run_check_command(cli: &Cli, args: &CheckArgs, show_progress: bool) -> Result<()> {
    let mut builder = CheckConfig::builder()
        .delay_ms(args.delay_ms)
        .write_mode(if args.append {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        });
    if let Some(secs) = args.timeout_secs {
        builder = builder.timeout_secs(secs);
    }
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new("Checking", "manifests");
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let stats = run_check(&args.metadata, &args.output, &config)
        .await
        .context("Check failed")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} rows  {} manifests ok  {} images ok  {} errors  {}ms  →  {}",
            if stats.errors == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.total_rows,
            stats.manifests_ok,
            stats.images_ok,
            stats.errors,
            stats.total_duration_ms,
            bold(&args.output.display().to_string()),
        );
    }
    Ok(())
}
