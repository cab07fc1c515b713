use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use simlink_session::{ExitReason, SessionOutcome};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RunReport<'a> {
    #[serde(flatten)]
    outcome: &'a SessionOutcome,
    socket_path: &'a str,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Key/value table with the reference layout.
pub fn print_table(rows: Vec<(String, String)>, header: [&str; 2]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for (key, value) in rows {
        table.add_row(vec![key, value]);
    }
    println!("{table}");
}

pub fn print_outcome(outcome: &SessionOutcome, socket_path: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&RunReport {
            outcome,
            socket_path,
        }),
        OutputFormat::Table => print_table(outcome_rows(outcome), ["FIELD", "VALUE"]),
        OutputFormat::Pretty | OutputFormat::Raw => {
            let rows = outcome_rows(outcome)
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>();
            println!("{}", rows.join(" "));
        }
    }
}

fn outcome_rows(outcome: &SessionOutcome) -> Vec<(String, String)> {
    let reason = match outcome.reason {
        ExitReason::Quit => "quit".to_string(),
        ExitReason::FirmwareExited(status) => format!("firmware exited ({status})"),
    };
    vec![
        ("model".to_string(), outcome.model.to_string()),
        ("reason".to_string(), reason),
        ("ticks".to_string(), outcome.ticks.to_string()),
        ("frames".to_string(), outcome.frames.to_string()),
        ("led_updates".to_string(), outcome.led_updates.to_string()),
        ("key_bytes".to_string(), outcome.key_bytes.to_string()),
    ]
}
