use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use simlink_session::DeviceModel;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod keys;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run firmware and bridge it to this terminal.
    Run(RunArgs),
    /// Decode a captured display stream.
    Decode(DecodeArgs),
    /// Show the host to device key map.
    Keys(KeysArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Keys(args) => keys::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    Mk4,
    Q1,
}

impl From<ModelArg> for DeviceModel {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::Mk4 => DeviceModel::Mk4,
            ModelArg::Q1 => DeviceModel::Q1,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RenderArg {
    None,
    Terminal,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Device model the firmware was built for.
    #[arg(long, env = "SIMLINK_MODEL", default_value = "mk4")]
    pub model: ModelArg,
    /// Maximum wait for firmware output per loop iteration (e.g. 1ms, 500us).
    #[arg(long, default_value = "1ms")]
    pub poll_interval: String,
    /// Maximum stall while reading one display record payload.
    #[arg(long, default_value = "250ms")]
    pub payload_timeout: String,
    /// Socket the firmware binds; stale sockets are removed before and after.
    #[arg(long, env = "SIMLINK_SOCKET", default_value = "/tmp/ckcc-simulator.sock")]
    pub socket_path: PathBuf,
    /// Working directory for the firmware process.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,
    /// Directory for snapshots, recordings and NFC dumps.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
    /// NFC dump written by the firmware, relative to the work directory.
    #[arg(long, value_name = "FILE", default_value = "nfc-dump.ndef")]
    pub nfc_dump: PathBuf,
    /// Inherited descriptor carrying extra firmware output.
    #[arg(long, value_name = "FD")]
    pub passthrough_fd: Option<i32>,
    /// How decoded frames are shown.
    #[arg(long, default_value = "terminal")]
    pub render: RenderArg,
    /// Firmware command and arguments; channel descriptors are appended.
    #[arg(last = true, required = true, value_name = "FIRMWARE")]
    pub firmware: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding captured display-in bytes.
    pub path: PathBuf,
    /// Device model whose encoding the capture uses.
    #[arg(long, env = "SIMLINK_MODEL", default_value = "mk4")]
    pub model: ModelArg,
    /// Also write the decoded frame as a PPM image.
    #[arg(long, value_name = "FILE")]
    pub ppm: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct KeysArgs {
    /// Device model whose keypad to list.
    #[arg(long, env = "SIMLINK_MODEL", default_value = "mk4")]
    pub model: ModelArg,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("us") {
        (num, "us")
    } else if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "us" => Ok(Duration::from_micros(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
