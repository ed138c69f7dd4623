use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use jankscope_core::SlowFramesConfig;
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::replay::{ReplayOptions, replay};
use crate::trace::read_trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// The whole outcome as pretty JSON.
    #[default]
    Json,
    /// One line per record, tagged with its listener.
    Jsonl,
}

#[derive(Debug, Clone, Args)]
pub struct ReplayArgs {
    /// JSONL trace of frames and lifecycle directives.
    pub trace: PathBuf,

    /// JSON configuration; omitted fields keep their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long = "refresh-rate", default_value_t = 60.0)]
    pub refresh_rate: f64,

    /// Number of classifier listeners fed from the trace.
    #[arg(long, default_value_t = 1)]
    pub listeners: usize,

    /// Drain records out of the reports instead of snapshotting them.
    #[arg(long)]
    pub drain: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Write here instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CheckConfigArgs {
    pub config: PathBuf,
}

pub fn load_config(path: &Path) -> Result<SlowFramesConfig> {
    if !path.exists() {
        return Err(HarnessError::MissingPath {
            path: path.to_path_buf(),
        });
    }
    let config: SlowFramesConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
    config.validate()?;
    Ok(config)
}

pub fn run_replay(args: ReplayArgs) -> Result<()> {
    if !args.trace.exists() {
        return Err(HarnessError::MissingPath { path: args.trace });
    }
    if !(args.refresh_rate.is_finite() && args.refresh_rate > 0.0) {
        return Err(HarnessError::invalid(format!(
            "--refresh-rate must be a positive number (got {})",
            args.refresh_rate
        )));
    }

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SlowFramesConfig::default(),
    };
    let entries = read_trace(BufReader::new(fs::File::open(&args.trace)?))?;
    debug!(
        trace = %args.trace.display(),
        lines = entries.len(),
        "trace loaded"
    );

    let options = ReplayOptions {
        config,
        refresh_rate_hz: args.refresh_rate,
        listeners: args.listeners,
        drain: args.drain,
    };
    let outcome = replay(&entries, &options)?;
    let text = match args.format {
        OutputFormat::Json => outcome.to_json()? + "\n",
        OutputFormat::Jsonl => outcome.to_jsonl(),
    };
    write_output(args.output.as_deref(), &text)
}

pub fn run_check_config(args: CheckConfigArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn print_defaults() -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(&SlowFramesConfig::default())?
    );
    Ok(())
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, text)?;
        }
        None => print!("{text}"),
    }
    Ok(())
}
