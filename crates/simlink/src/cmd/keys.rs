use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use simlink_session::{Binding, ControlAction, DeviceModel, KeyTranslator, Translation};

use crate::cmd::KeysArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct KeyRow {
    host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<ControlAction>,
}

impl From<Binding> for KeyRow {
    fn from(binding: Binding) -> Self {
        match binding.translation {
            Translation::Key { key, .. } => Self {
                host: binding.host,
                device: Some(key.to_string()),
                code: Some(key.code()),
                action: None,
            },
            Translation::Action(action) => Self {
                host: binding.host,
                device: None,
                code: None,
                action: Some(action),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct KeyMapOutput {
    model: DeviceModel,
    keys: Vec<KeyRow>,
}

pub fn run(args: KeysArgs, format: OutputFormat) -> CliResult<i32> {
    let model = DeviceModel::from(args.model);
    let translator = KeyTranslator::new(model.keypad());
    let keys = translator
        .bindings()
        .into_iter()
        .map(KeyRow::from)
        .collect();
    let output = KeyMapOutput { model, keys };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["HOST", "DEVICE", "CODE"]);
            for row in &output.keys {
                table.add_row(vec![row.host.clone(), device_cell(row), code_cell(row)]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for row in &output.keys {
                println!("{:<10} {}", row.host, device_cell(row));
            }
        }
    }
    Ok(SUCCESS)
}

fn device_cell(row: &KeyRow) -> String {
    match (&row.device, row.action) {
        (Some(device), _) => device.clone(),
        (None, Some(action)) => format!("<{}>", action_name(action)),
        (None, None) => String::new(),
    }
}

fn code_cell(row: &KeyRow) -> String {
    row.code.map(|c| format!("0x{c:02x}")).unwrap_or_default()
}

fn action_name(action: ControlAction) -> &'static str {
    match action {
        ControlAction::Quit => "quit",
        ControlAction::Snapshot => "snapshot",
        ControlAction::StartRecording => "start recording",
        ControlAction::StopRecording => "stop recording",
        ControlAction::ReadNfcDump => "read nfc",
    }
}

#[cfg(test)]
mod tests {
    use simlink_session::{DeviceKey, Edge};

    use super::*;

    #[test]
    fn binding_rows_split_keys_and_actions() {
        let key = KeyRow::from(Binding {
            host: "Esc".to_string(),
            translation: Translation::Key {
                key: DeviceKey::new(b'x').unwrap(),
                edge: Edge::Down,
            },
        });
        assert_eq!(device_cell(&key), "x");
        assert_eq!(code_cell(&key), "0x78");

        let action = KeyRow::from(Binding {
            host: "Ctrl+Q".to_string(),
            translation: Translation::Action(ControlAction::Quit),
        });
        assert_eq!(device_cell(&action), "<quit>");
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"host":"Ctrl+Q","action":"quit"}"#);
    }
}
