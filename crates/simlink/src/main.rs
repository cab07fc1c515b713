mod cmd;
mod exit;
mod firmware;
mod input;
mod logging;
mod output;
mod render;
mod store;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "simlink", version, about = "Simulated device bridge")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Append logs to this file instead of stderr.
    #[arg(long, value_name = "FILE", env = "SIMLINK_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level, cli.log_file.as_deref());

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_firmware_command() {
        let cli = Cli::try_parse_from([
            "simlink",
            "run",
            "--model",
            "q1",
            "--poll-interval",
            "2ms",
            "--",
            "python3",
            "-m",
            "firmware",
        ])
        .expect("run args should parse");

        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.firmware, vec!["python3", "-m", "firmware"]);
        assert_eq!(args.poll_interval, "2ms");
    }

    #[test]
    fn run_requires_firmware() {
        let err = Cli::try_parse_from(["simlink", "run"]).expect_err("firmware is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_keys_subcommand() {
        let cli = Cli::try_parse_from(["simlink", "--format", "json", "keys", "--model", "mk4"])
            .expect("keys args should parse");
        assert!(matches!(cli.command, Command::Keys(_)));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }

    #[test]
    fn log_file_is_global() {
        let cli = Cli::try_parse_from(["simlink", "version", "--log-file", "/tmp/simlink.log"])
            .expect("log file should parse after subcommand");
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/simlink.log")));
    }

    #[test]
    fn rejects_unknown_model() {
        let err = Cli::try_parse_from(["simlink", "keys", "--model", "mk3"])
            .expect_err("unknown model should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
