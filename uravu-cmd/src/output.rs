//! JSON and CSV writers shared by the commands.

use log::info;
use serde_json::{Number, Value};
use std::path::Path;
use uravu_core::report::FluxRecord;

/// Pretty-print `value` to `output`, or to stdout when no path is given.
pub fn write_json(value: &Value, output: Option<&Path>) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Round every non-integer number in `value` to `decimals` places.
pub fn round_floats(value: &mut Value, decimals: i32) {
    match value {
        Value::Number(n) if n.is_f64() => {
            let scale = 10f64.powi(decimals);
            if let Some(rounded) = n
                .as_f64()
                .and_then(|v| Number::from_f64((v * scale).round() / scale))
            {
                *n = rounded;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| round_floats(v, decimals)),
        Value::Object(map) => map.values_mut().for_each(|v| round_floats(v, decimals)),
        _ => {}
    }
}

/// Write the flux series as `date,flux_L` rows.
pub fn write_series_csv(path: &Path, series: &[FluxRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", "flux_L"])?;
    for record in series {
        let flux = record.flux_l.to_string();
        writer.write_record([record.date.as_str(), flux.as_str()])?;
    }
    writer.flush()?;
    info!("Wrote {} flux records to {}", series.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rounds_nested_floats_only() {
        let mut value = json!({
            "a": 16.117929,
            "b": 12,
            "c": [1.23456, {"d": 2.00049}],
            "e": "16.117929",
        });
        round_floats(&mut value, 3);
        assert_eq!(
            value,
            json!({"a": 16.118, "b": 12, "c": [1.235, {"d": 2.0}], "e": "16.117929"})
        );
    }

    #[test]
    fn series_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let series = vec![
            FluxRecord {
                date: "2024-12-15".to_string(),
                flux_l: 1.5e8,
            },
            FluxRecord {
                date: "2024-12-16".to_string(),
                flux_l: 2.25,
            },
        ];
        write_series_csv(&path, &series).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,flux_L\n2024-12-15,150000000\n2024-12-16,2.25\n");
    }

    #[test]
    fn empty_series_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_series_csv(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "date,flux_L\n");
    }

    #[test]
    fn json_goes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&json!({"ok": true}), Some(&path)).unwrap();
        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, json!({"ok": true}));
    }
}
