//! Output rendering for CLI results

use crate::core::history::{Sample, SampleWindow};
use crate::core::reading::{DualReading, GaugeIdentity, Reading};
use crate::core::status::PressureUnit;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Output format for results printed to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human readable
    #[default]
    Text,
    /// One JSON object per result
    Json,
    /// Comma separated values
    Csv,
}

fn csv_text(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn reading_json(gauge: u8, reading: &Reading, unit: PressureUnit) -> serde_json::Value {
    json!({
        "gauge": gauge,
        "value": reading.value,
        "unit": unit.symbol(),
        "status_code": reading.status_code(),
        "status": reading.status_text(),
    })
}

/// Render one gauge reading
pub fn render_reading(
    gauge: u8,
    reading: &Reading,
    unit: PressureUnit,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format!(
            "Gauge {gauge}: {:.4e} {unit} ({})",
            reading.value,
            reading.status_text()
        ),
        OutputFormat::Json => reading_json(gauge, reading, unit).to_string(),
        OutputFormat::Csv => format!(
            "{gauge},{:e},{unit},{},{}",
            reading.value,
            reading.status_code(),
            csv_text(reading.status_text())
        ),
    }
}

/// Render both gauge readings
pub fn render_dual_reading(dual: &DualReading, unit: PressureUnit, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json!({
            "gauge1": reading_json(1, &dual.gauge1, unit),
            "gauge2": reading_json(2, &dual.gauge2, unit),
        })
        .to_string(),
        _ => format!(
            "{}\n{}",
            render_reading(1, &dual.gauge1, unit, format),
            render_reading(2, &dual.gauge2, unit, format)
        ),
    }
}

/// Render gauge identification
pub fn render_identity(ids: &(GaugeIdentity, GaugeIdentity), format: OutputFormat) -> String {
    let (first, second) = ids;
    match format {
        OutputFormat::Text => format!("Gauge 1: {first}\nGauge 2: {second}"),
        OutputFormat::Json => json!({
            "gauge1": { "code": first.code.token(), "description": first.description },
            "gauge2": { "code": second.code.token(), "description": second.description },
        })
        .to_string(),
        OutputFormat::Csv => format!(
            "1,{},{}\n2,{},{}",
            first.code,
            csv_text(first.description),
            second.code,
            csv_text(second.description)
        ),
    }
}

/// Render controller information (firmware, gauges, unit)
pub fn render_info(
    firmware: &str,
    ids: &(GaugeIdentity, GaugeIdentity),
    unit: PressureUnit,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format!(
            "Firmware: {firmware}\n{}\nUnit: {unit}",
            render_identity(ids, format)
        ),
        OutputFormat::Json => json!({
            "firmware": firmware,
            "gauges": [ids.0.code.token(), ids.1.code.token()],
            "unit": unit.symbol(),
        })
        .to_string(),
        OutputFormat::Csv => format!(
            "{},{},{},{}",
            csv_text(firmware),
            ids.0.code,
            ids.1.code,
            unit
        ),
    }
}

/// Render one monitor sample with the window summary
pub fn render_sample(
    sample: &Sample,
    window: &SampleWindow,
    unit: PressureUnit,
    format: OutputFormat,
) -> String {
    let (min, max) = window
        .value_range()
        .unwrap_or((sample.reading.value, sample.reading.value));
    match format {
        OutputFormat::Text => format!(
            "[{}] #{} {} | min {:.4e} max {:.4e} ({} samples)",
            sample.timestamp.format("%H:%M:%S"),
            sample.index,
            render_reading(sample.gauge, &sample.reading, unit, format),
            min,
            max,
            window.len()
        ),
        OutputFormat::Json => {
            let mut value = reading_json(sample.gauge, &sample.reading, unit);
            value["index"] = json!(sample.index);
            value["timestamp"] = json!(sample.timestamp.to_rfc3339());
            value["window_min"] = json!(min);
            value["window_max"] = json!(max);
            value.to_string()
        }
        OutputFormat::Csv => format!(
            "{},{},{}",
            sample.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            sample.index,
            render_reading(sample.gauge, &sample.reading, unit, format)
        ),
    }
}
