mod collect_cmd;
mod convert_cmd;
mod history_cmd;
mod output;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use toon_metrics::codec::{Delimiter, EncodeOptions, ToonCodec};
use toon_metrics::config::{self, MetricsConfig};
use toon_metrics::paths;

const LOG_ENV: &str = "TOON_METRICS_LOG";

#[derive(Parser)]
#[command(
    name = "toon-metrics",
    version,
    about = "Measure and track token savings of compact tabular output over verbose JSON"
)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Machine-readable JSON output
    #[arg(long, global = true)]
    json: bool,

    /// History file to read and write (overrides TOON_METRICS_HISTORY and config)
    #[arg(long, global = true, value_name = "PATH")]
    history_file: Option<PathBuf>,

    /// Project name recorded with each run
    #[arg(long, global = true)]
    project: Option<String>,

    /// Workflow name recorded with each run
    #[arg(long, global = true)]
    workflow: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure an architecture document and append the run to history
    Collect {
        /// JSON document to measure
        file: PathBuf,
    },
    /// Measure an architecture document and print the savings report
    Report {
        /// JSON document to measure
        file: PathBuf,
        /// API price in dollars per 1K tokens
        #[arg(long)]
        price: Option<f64>,
        /// Pipeline runs per month
        #[arg(long)]
        runs: Option<u32>,
    },
    /// List recent runs
    History {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show averages and extrema across all recorded runs
    Trend,
    /// Encode a JSON document into the compact format
    Encode {
        file: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Decode compact text back into pretty JSON
    Decode {
        file: PathBuf,
        /// Spaces per nesting level expected in the input
        #[arg(long)]
        indent: Option<usize>,
        /// Accept array length and indentation mismatches
        #[arg(long)]
        lenient: bool,
    },
    /// Encode, decode and compare a JSON document
    Roundtrip {
        file: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Compare verbose and compact sizes of a JSON document
    Stats {
        file: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
    },
}

#[derive(clap::Args)]
struct FormatArgs {
    /// Separator for array values and table cells
    #[arg(long, value_enum)]
    delimiter: Option<DelimiterArg>,
    /// Spaces per nesting level
    #[arg(long)]
    indent: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DelimiterArg {
    Comma,
    Tab,
    Pipe,
}

impl From<DelimiterArg> for Delimiter {
    fn from(arg: DelimiterArg) -> Self {
        match arg {
            DelimiterArg::Comma => Self::Comma,
            DelimiterArg::Tab => Self::Tab,
            DelimiterArg::Pipe => Self::Pipe,
        }
    }
}

/// Everything a command needs after flags, env and config are merged.
pub struct Settings {
    pub config: MetricsConfig,
    pub project: String,
    pub workflow: String,
    pub json: bool,
    history_file: Option<PathBuf>,
}

impl Settings {
    fn resolve(cli: &Cli) -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        let root = config::project_root_for(&cwd);
        let config = MetricsConfig::load(Some(&root));
        let project = cli
            .project
            .clone()
            .or_else(|| config.project.clone())
            .unwrap_or_else(|| config::project_name_for(&root));
        let workflow = cli.workflow.clone().unwrap_or_else(|| config.workflow.clone());
        tracing::debug!(root = %root.display(), %project, %workflow, "resolved settings");
        Self {
            config,
            project,
            workflow,
            json: cli.json,
            history_file: cli.history_file.clone(),
        }
    }

    /// # Errors
    /// Fails when no history path is configured and the platform has no data directory.
    pub fn history_path(&self) -> anyhow::Result<PathBuf> {
        paths::history_path(
            self.history_file.as_deref(),
            self.config.history_path.as_deref(),
        )
        .ok_or_else(|| anyhow::anyhow!("cannot determine history file path"))
    }

    /// Codec configured from `[codec]`, with command-line overrides applied.
    fn codec(&self, format: Option<&FormatArgs>) -> ToonCodec {
        let mut options: EncodeOptions = self.config.codec;
        if let Some(f) = format {
            if let Some(d) = f.delimiter {
                options.delimiter = d.into();
            }
            if let Some(i) = f.indent {
                options.indent = i;
            }
        }
        ToonCodec::with_options(options)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "toon_metrics=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn or_exit(r: anyhow::Result<i32>) -> i32 {
    r.unwrap_or_else(|e| {
        eprintln!("[toon-metrics] error: {e:#}");
        1
    })
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = Settings::resolve(&cli);

    let exit_code = match &cli.command {
        Commands::Collect { file } => {
            or_exit(collect_cmd::cmd_collect(file, &settings, &settings.codec(None)))
        }
        Commands::Report { file, price, runs } => or_exit(collect_cmd::cmd_report(
            file,
            *price,
            *runs,
            &settings,
            &settings.codec(None),
        )),
        Commands::History { limit } => or_exit(history_cmd::cmd_history(*limit, &settings)),
        Commands::Trend => or_exit(history_cmd::cmd_trend(&settings)),
        Commands::Encode { file, format } => {
            or_exit(convert_cmd::cmd_encode(file, &settings.codec(Some(format))))
        }
        Commands::Decode {
            file,
            indent,
            lenient,
        } => {
            let mut codec = settings.codec(None);
            if let Some(i) = indent {
                codec.decode.indent = *i;
            }
            codec.decode.strict = !lenient;
            or_exit(convert_cmd::cmd_decode(file, &codec))
        }
        Commands::Roundtrip { file, format } => {
            or_exit(convert_cmd::cmd_roundtrip(file, &settings.codec(Some(format))))
        }
        Commands::Stats { file, format } => or_exit(convert_cmd::cmd_stats(
            file,
            &settings,
            &settings.codec(Some(format)),
        )),
    };
    std::process::exit(exit_code);
}

/// Read and parse a JSON input document.
pub fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    use anyhow::Context as _;

    let text = toon_metrics::fs::read_text(path)?
        .ok_or_else(|| anyhow::anyhow!("file not found: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
}
