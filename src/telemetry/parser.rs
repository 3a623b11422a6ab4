//! Record parsing: `ax,ay,az,rx,ry,rz\n` → (AccelSample, RotSample).
//!
//! A record is accepted whole or not at all. Fields beyond the sixth are
//! ignored; surrounding whitespace and `\r\n` endings are tolerated.

use crate::error::{AppResult, StreamError};
use crate::telemetry::sample::{AccelSample, RotSample};

/// Minimum number of fields in a record
pub const FIELD_COUNT: usize = 6;

/// Decode one frame.
///
/// `t_ns` becomes the acceleration sample's timestamp.
pub fn parse_record(frame: &[u8], t_ns: i64) -> AppResult<(AccelSample, RotSample)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(frame);

    let mut record = csv::ByteRecord::new();
    let found = reader
        .read_byte_record(&mut record)
        .map_err(|e| StreamError::parse(0, line_text(frame), e.to_string()))?;
    if !found {
        return Err(StreamError::parse(0, line_text(frame), "empty record"));
    }

    if record.len() < FIELD_COUNT {
        return Err(StreamError::parse(
            record.len(),
            line_text(frame),
            format!("expected at least {} fields, found {}", FIELD_COUNT, record.len()),
        ));
    }

    let mut values = [0.0f64; FIELD_COUNT];
    for (index, slot) in values.iter_mut().enumerate() {
        *slot = parse_field(index, record.get(index).unwrap_or_default())?;
    }

    let [ax, ay, az, rx, ry, rz] = values;
    Ok((
        AccelSample::new(ax, ay, az, t_ns),
        RotSample::new(rx, ry, rz),
    ))
}

fn parse_field(index: usize, raw: &[u8]) -> AppResult<f64> {
    let text = std::str::from_utf8(raw).map_err(|_| {
        StreamError::parse(index, String::from_utf8_lossy(raw), "field is not valid UTF-8")
    })?;

    let value: f64 = text
        .parse()
        .map_err(|e: std::num::ParseFloatError| StreamError::parse(index, text, e.to_string()))?;

    if !value.is_finite() {
        return Err(StreamError::parse(index, text, "non-finite value"));
    }
    Ok(value)
}

fn line_text(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).trim_end().to_string()
}
