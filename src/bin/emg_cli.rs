use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use emg_analytics::config::AppConfig;
use emg_analytics::fixtures::{load_session_parameters, FixtureCatalog, InputSource, LoadedInput};
use emg_analytics::models::{AnalysisReport, ChannelView};
use emg_analytics::processor::{ChannelAnalyticsOrchestrator, ScoreRecalculator};
use emg_analytics::session::SessionParameters;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "emg_cli",
    about = "Contraction detection and EMG metrics for recorded sessions"
)]
struct Cli {
    /// Override directory containing fixture specs (defaults to <crate>/fixtures)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Exactly one input must be named
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Synthetic fixture name or spec path
    #[arg(long)]
    fixture: Option<String>,
    /// JSON channel bundle
    #[arg(long)]
    bundle: Option<PathBuf>,
    /// WAV recording, one channel per WAV channel
    #[arg(long)]
    wav: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a recording and print the report JSON
    Analyze {
        #[command(flatten)]
        input: InputArgs,
        /// Channel labels for --wav, in file order
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
        /// Session parameters JSON (defaults to the fixture's own, if any)
        #[arg(long)]
        params: Option<PathBuf>,
        /// Engine configuration JSON
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        threshold_factor: Option<f64>,
        #[arg(long)]
        min_duration_ms: Option<f64>,
        #[arg(long)]
        smoothing_window: Option<usize>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-grade a stored report against new session parameters
    Recalculate {
        #[arg(long)]
        report: PathBuf,
        #[arg(long)]
        params: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print one channel's samples and contractions
    View {
        #[command(flatten)]
        input: InputArgs,
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
        /// Full label or logical channel name
        #[arg(long)]
        channel: String,
        /// Report whose contractions should be attached
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available fixtures on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(FixtureCatalog::default);

    match cli.command {
        Commands::Analyze {
            input,
            labels,
            params,
            config,
            threshold_factor,
            min_duration_ms,
            smoothing_window,
            output,
        } => {
            let mut config = match config {
                Some(path) => AppConfig::try_load_from_file(path)?,
                None => AppConfig::default(),
            };
            if let Some(factor) = threshold_factor {
                config.detection.threshold_factor = factor;
            }
            if let Some(ms) = min_duration_ms {
                config.detection.min_duration_ms = ms;
            }
            if let Some(window) = smoothing_window {
                config.detection.smoothing_window = window;
            }
            config.validate()?;
            run_analyze(&catalog, input.into_source(labels)?, params, config, output)
        }
        Commands::Recalculate {
            report,
            params,
            output,
        } => run_recalculate(report, params, output),
        Commands::View {
            input,
            labels,
            channel,
            report,
            output,
        } => run_view(&catalog, input.into_source(labels)?, &channel, report, output),
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

impl InputArgs {
    fn into_source(self, labels: Vec<String>) -> Result<InputSource> {
        match (self.fixture, self.bundle, self.wav) {
            (Some(name), None, None) => Ok(InputSource::Fixture(name)),
            (None, Some(path), None) => Ok(InputSource::Bundle(path)),
            (None, None, Some(path)) => Ok(InputSource::Wav { path, labels }),
            _ => Err(anyhow!("exactly one of --fixture, --bundle or --wav is required")),
        }
    }
}

fn run_analyze(
    catalog: &FixtureCatalog,
    source: InputSource,
    params_path: Option<PathBuf>,
    config: AppConfig,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let input = source.load(catalog)?;
    let params = session_parameters(&input, params_path)?;
    let orchestrator = ChannelAnalyticsOrchestrator::new(config);
    let report = orchestrator
        .process(
            input.source.clone(),
            input.attributes,
            &input.channels,
            &params,
        )
        .with_context(|| format!("analyzing {}", input.source))?;

    emit_json(&report, output_path)?;
    Ok(ExitCode::from(0))
}

fn run_recalculate(
    report_path: PathBuf,
    params_path: PathBuf,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut report = read_report(&report_path)?;
    let params = load_session_parameters(&params_path)?;
    ScoreRecalculator::recalculate_report(&mut report, &params)
        .with_context(|| format!("recalculating {}", report_path.display()))?;

    emit_json(&report, output_path)?;
    Ok(ExitCode::from(0))
}

fn run_view(
    catalog: &FixtureCatalog,
    source: InputSource,
    channel: &str,
    report_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let input = source.load(catalog)?;
    let report = report_path.as_deref().map(read_report).transpose()?;
    let view = ChannelView::build(&input.channels, channel, report.as_ref()).ok_or_else(|| {
        anyhow!(
            "Channel '{}' not found; available: {}",
            channel,
            input.channels.labels().join(", ")
        )
    })?;

    emit_json(&view, output_path)?;
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(params) = metadata.params_path {
            println!("{} -> {}", metadata.name, params.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

/// Explicit --params wins over parameters shipped with the input
fn session_parameters(
    input: &LoadedInput,
    params_path: Option<PathBuf>,
) -> Result<SessionParameters> {
    match params_path {
        Some(path) => load_session_parameters(path),
        None => Ok(input.params.clone().unwrap_or_default()),
    }
}

fn read_report(path: &std::path::Path) -> Result<AnalysisReport> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading report {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing report {}", path.display()))
}

fn emit_json<T: Serialize>(value: &T, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(())
}
