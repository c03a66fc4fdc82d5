//! Reply payload grammar
//!
//! Data lines are comma separated ASCII fields, e.g. `0,+1.0000E-05` for PR1 or
//! `TPR,IKR9` for TID. Decoders take the terminator-stripped line; encoders produce
//! the same grammar for the virtual device.

use super::ProtocolError;
use crate::core::reading::{DualReading, GaugeIdentity, Reading};
use crate::core::status::{CodeTable, GaugeId, MeasurementStatus, PressureUnit};

fn fields(payload: &str) -> Vec<&str> {
    payload.split(',').map(str::trim).collect()
}

fn malformed(payload: &str) -> ProtocolError {
    ProtocolError::MalformedPayload(payload.as_bytes().to_vec())
}

fn expect_fields<'a>(payload: &'a str, count: usize) -> Result<Vec<&'a str>, ProtocolError> {
    let fields = fields(payload);
    if fields.len() == count {
        Ok(fields)
    } else {
        Err(malformed(payload))
    }
}

fn decode_code(field: &str, payload: &str, table: CodeTable) -> Result<u8, ProtocolError> {
    let digits = field.strip_prefix('+').unwrap_or(field);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(payload));
    }
    digits.parse::<u8>().map_err(|_| ProtocolError::UnknownCode {
        table,
        code: field.to_string(),
    })
}

fn decode_pair(status: &str, value: &str, payload: &str) -> Result<Reading, ProtocolError> {
    let code = decode_code(status, payload, CodeTable::MeasurementStatus)?;
    let status = MeasurementStatus::from_code(code).ok_or_else(|| ProtocolError::UnknownCode {
        table: CodeTable::MeasurementStatus,
        code: status.to_string(),
    })?;
    let value: f64 = value.parse().map_err(|_| malformed(payload))?;
    Ok(Reading::new(value, status))
}

fn decode_gauge_id(token: &str) -> Result<GaugeIdentity, ProtocolError> {
    GaugeId::from_token(token)
        .map(GaugeIdentity::from)
        .ok_or_else(|| ProtocolError::UnknownCode {
            table: CodeTable::GaugeId,
            code: token.to_string(),
        })
}

/// Decode a PR1 / PR2 reply: `status,value`
pub fn parse_reading(payload: &str) -> Result<Reading, ProtocolError> {
    let f = expect_fields(payload, 2)?;
    decode_pair(f[0], f[1], payload)
}

/// Decode a PRX reply: `status1,value1,status2,value2`.
///
/// Either both readings decode or the call fails.
pub fn parse_dual_reading(payload: &str) -> Result<DualReading, ProtocolError> {
    let f = expect_fields(payload, 4)?;
    Ok(DualReading {
        gauge1: decode_pair(f[0], f[1], payload)?,
        gauge2: decode_pair(f[2], f[3], payload)?,
    })
}

/// Decode a TID reply: `id1,id2`
pub fn parse_identification(
    payload: &str,
) -> Result<(GaugeIdentity, GaugeIdentity), ProtocolError> {
    let f = expect_fields(payload, 2)?;
    Ok((decode_gauge_id(f[0])?, decode_gauge_id(f[1])?))
}

/// Decode a UNI reply: a single unit code
pub fn parse_unit(payload: &str) -> Result<PressureUnit, ProtocolError> {
    let f = expect_fields(payload, 1)?;
    let code = decode_code(f[0], payload, CodeTable::PressureUnit)?;
    PressureUnit::from_code(code).ok_or_else(|| ProtocolError::UnknownCode {
        table: CodeTable::PressureUnit,
        code: f[0].to_string(),
    })
}

// ============ Encoders ============

/// Format a pressure the way the controller does: `+1.0000E-05`
pub fn format_pressure(value: f64) -> String {
    let formatted = format!("{value:.4E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if mantissa.starts_with('-') { "" } else { "+" };
            format!("{sign}{mantissa}E{exponent:+03}")
        }
        None => formatted,
    }
}

/// Format a single-gauge reply
pub fn format_reading(reading: &Reading) -> String {
    format!("{},{}", reading.status_code(), format_pressure(reading.value))
}

/// Format a dual-gauge reply
pub fn format_dual_reading(dual: &DualReading) -> String {
    format!("{},{}", format_reading(&dual.gauge1), format_reading(&dual.gauge2))
}

/// Format a TID reply
pub fn format_identification(first: GaugeId, second: GaugeId) -> String {
    format!("{},{}", first.token(), second.token())
}

/// Format a UNI reply
pub fn format_unit(unit: PressureUnit) -> String {
    unit.code().to_string()
}
