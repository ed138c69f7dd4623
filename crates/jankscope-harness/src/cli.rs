use clap::{Parser, Subcommand};

use crate::commands::{CheckConfigArgs, ReplayArgs, print_defaults, run_check_config, run_replay};
use crate::error::Result;
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "jankscope",
    about = "Replay frame-timing traces through slow/frozen frame classifiers",
    version
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSONL trace and print the resulting reports.
    Replay(ReplayArgs),

    /// Check a configuration file and print it with defaults filled in.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),

    /// Print the default configuration as JSON.
    Defaults,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_json);
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Replay(args) => run_replay(args),
        Commands::CheckConfig(args) => run_check_config(args),
        Commands::Defaults => print_defaults(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_flags_parse_with_defaults() {
        let cli = Cli::parse_from(["jankscope", "replay", "trace.jsonl"]);
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.trace.to_str(), Some("trace.jsonl"));
        assert_eq!(args.refresh_rate, 60.0);
        assert_eq!(args.listeners, 1);
        assert!(!args.drain);
        assert!(args.config.is_none());
        assert!(!cli.log_json);
    }

    #[test]
    fn log_json_is_global() {
        let cli = Cli::parse_from([
            "jankscope",
            "replay",
            "t.jsonl",
            "--log-json",
            "--listeners",
            "3",
            "--refresh-rate",
            "120",
        ]);
        assert!(cli.log_json);
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.listeners, 3);
        assert_eq!(args.refresh_rate, 120.0);
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
