use std::io::Cursor;

use serde::Serialize;
use simlink_display::{
    BitplaneDecoder, DecoderConfig, IndexedDecoder, Palette, PixelBuffer, PALETTE_SIZE,
};
use simlink_session::DeviceModel;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, protocol_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_raw, print_table, OutputFormat};
use crate::render::half_blocks;
use crate::store::{save_ppm, write_ppm};

#[derive(Debug, Serialize)]
struct DecodeOutput {
    model: DeviceModel,
    width: usize,
    height: usize,
    input_bytes: usize,
    records: usize,
    lit_pixels: usize,
    histogram: [usize; PALETTE_SIZE],
}

struct Decoded {
    pixels: PixelBuffer,
    palette: Palette,
    records: usize,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let model = DeviceModel::from(args.model);
    let data = std::fs::read(&args.path)
        .map_err(|err| io_error(&format!("failed to read {}", args.path.display()), err))?;

    let decoded = decode(model, &data)?;

    if let Some(path) = &args.ppm {
        save_ppm(path, &decoded.pixels, &decoded.palette)
            .map_err(|err| io_error(&format!("failed to write {}", path.display()), err))?;
    }

    let histogram = decoded.pixels.histogram();
    let output = DecodeOutput {
        model,
        width: decoded.pixels.width(),
        height: decoded.pixels.height(),
        input_bytes: data.len(),
        records: decoded.records,
        lit_pixels: count_lit(&histogram),
        histogram,
    };
    print_decoded(&output, &decoded, format);
    Ok(SUCCESS)
}

fn count_lit(histogram: &[usize; PALETTE_SIZE]) -> usize {
    histogram[Palette::BACKGROUND as usize + 1..].iter().sum()
}

fn decode(model: DeviceModel, data: &[u8]) -> CliResult<Decoded> {
    match model {
        DeviceModel::Mk4 => {
            let mut decoder = BitplaneDecoder::new();
            if !decoder
                .apply(data)
                .map_err(|err| protocol_error("decode failed", err))?
            {
                return Err(CliError::new(DATA_INVALID, "input holds no frame"));
            }
            Ok(Decoded {
                pixels: decoder.pixels().clone(),
                palette: decoder.palette().clone(),
                records: 1,
            })
        }
        DeviceModel::Q1 => {
            let mut decoder = IndexedDecoder::with_config(DecoderConfig::default());
            let records = decoder
                .apply(&mut Cursor::new(data))
                .map_err(|err| protocol_error("decode failed", err))?;
            Ok(Decoded {
                pixels: decoder.pixels().clone(),
                palette: decoder.palette().clone(),
                records,
            })
        }
    }
}

fn print_decoded(output: &DecodeOutput, decoded: &Decoded, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let mut rows = vec![
                ("model".to_string(), output.model.to_string()),
                (
                    "size".to_string(),
                    format!("{}x{}", output.width, output.height),
                ),
                ("input_bytes".to_string(), output.input_bytes.to_string()),
                ("records".to_string(), output.records.to_string()),
                ("lit_pixels".to_string(), output.lit_pixels.to_string()),
            ];
            for (index, count) in output.histogram.iter().enumerate() {
                if *count > 0 {
                    rows.push((format!("index {index}"), count.to_string()));
                }
            }
            print_table(rows, ["FIELD", "VALUE"]);
        }
        OutputFormat::Pretty => {
            print!("{}", half_blocks(&decoded.pixels, &decoded.palette));
            println!(
                "{} {}x{} records={} lit={}",
                output.model, output.width, output.height, output.records, output.lit_pixels
            );
        }
        OutputFormat::Raw => {
            let mut image = Vec::new();
            if write_ppm(&mut image, &decoded.pixels, &decoded.palette).is_ok() {
                print_raw(&image);
            }
        }
    }
}
