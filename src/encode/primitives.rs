//! Allocation-free scalar writers shared by the text and JSON encoders.

use std::{fmt, time::Duration};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Datelike, Timelike};

use crate::{
    buffer::Buffer,
    error::{LogError, LogResult},
    field::Timestamp,
    level::Level,
};

const HEX: &[u8; 16] = b"0123456789abcdef";

pub(crate) fn write_u64(buf: &mut Buffer, mut value: u64) {
    let mut tmp = [0u8; 20];
    let mut i = tmp.len();
    loop {
        i -= 1;
        tmp[i] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    buf.extend_from_slice(&tmp[i..]);
}

pub(crate) fn write_i64(buf: &mut Buffer, value: i64) {
    if value < 0 {
        buf.push(b'-');
    }
    write_u64(buf, value.unsigned_abs());
}

/// Shortest round-trip form of a finite float; exponent notation outside
/// `[1e-4, 1e21)`.
pub(crate) fn write_finite_float<F>(buf: &mut Buffer, value: F)
where
    F: fmt::Display + fmt::LowerExp + Into<f64> + Copy,
{
    use fmt::Write as _;

    let abs = value.into().abs();
    // Display/LowerExp on floats cannot fail and Buffer never rejects input.
    let _ = if abs != 0.0 && !(1e-4..1e21).contains(&abs) {
        write!(buf, "{value:e}")
    } else {
        write!(buf, "{value}")
    };
}

/// Text form: non-finite values are spelled `NaN`, `+Inf`, `-Inf`.
pub(crate) fn write_float_text<F>(buf: &mut Buffer, value: F)
where
    F: fmt::Display + fmt::LowerExp + Into<f64> + Copy,
{
    let wide: f64 = value.into();
    if wide.is_nan() {
        buf.push_str("NaN");
    } else if wide == f64::INFINITY {
        buf.push_str("+Inf");
    } else if wide == f64::NEG_INFINITY {
        buf.push_str("-Inf");
    } else {
        write_finite_float(buf, value);
    }
}

/// JSON form: non-finite values become `null`.
pub(crate) fn write_float_json<F>(buf: &mut Buffer, value: F)
where
    F: fmt::Display + fmt::LowerExp + Into<f64> + Copy,
{
    if value.into().is_finite() {
        write_finite_float(buf, value);
    } else {
        buf.push_str("null");
    }
}

/// Digits of a fraction with `width` places, trailing zeros trimmed.
/// Writes nothing (not even the dot) for zero.
fn write_fraction_digits(buf: &mut Buffer, fraction: u64, width: usize) {
    if fraction == 0 {
        return;
    }
    let mut digits = [b'0'; 9];
    let mut rest = fraction;
    for slot in digits[..width].iter_mut().rev() {
        *slot = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    let mut end = width;
    while end > 0 && digits[end - 1] == b'0' {
        end -= 1;
    }
    buf.push(b'.');
    buf.extend_from_slice(&digits[..end]);
}

fn write_padded(buf: &mut Buffer, value: u32, width: usize) {
    let mut tmp = [b'0'; 10];
    let mut rest = value;
    for slot in tmp[..width].iter_mut().rev() {
        *slot = b'0' + (rest % 10) as u8;
        rest /= 10;
    }
    buf.extend_from_slice(&tmp[..width]);
}

/// Human duration: `0s`, `750ns`, `1.5µs`, `20ms`, `1.5s`, `2m3s`, `1h0m0s`.
pub(crate) fn write_duration_human(buf: &mut Buffer, value: Duration) {
    let nanos = value.as_nanos();
    if nanos == 0 {
        buf.push_str("0s");
        return;
    }
    if nanos < 1_000 {
        write_u64(buf, nanos as u64);
        buf.push_str("ns");
        return;
    }
    if nanos < 1_000_000 {
        write_u64(buf, (nanos / 1_000) as u64);
        write_fraction_digits(buf, (nanos % 1_000) as u64, 3);
        buf.push_str("µs");
        return;
    }
    if nanos < 1_000_000_000 {
        write_u64(buf, (nanos / 1_000_000) as u64);
        write_fraction_digits(buf, (nanos % 1_000_000) as u64, 6);
        buf.push_str("ms");
        return;
    }

    let secs = value.as_secs();
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    if hours > 0 {
        write_u64(buf, hours);
        buf.push(b'h');
    }
    if hours > 0 || minutes > 0 {
        write_u64(buf, minutes);
        buf.push(b'm');
    }
    write_u64(buf, secs % 60);
    write_fraction_digits(buf, u64::from(value.subsec_nanos()), 9);
    buf.push(b's');
}

pub(crate) fn duration_millis(value: Duration) -> u64 {
    u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) fn duration_nanos(value: Duration) -> u64 {
    u64::try_from(value.as_nanos()).unwrap_or(u64::MAX)
}

/// `2024-12-31T23:59:59.123456789Z`, fraction trimmed, `Z` always.
pub(crate) fn write_rfc3339_nano(buf: &mut Buffer, ts: &Timestamp) {
    let year = ts.year();
    if (0..=9999).contains(&year) {
        write_padded(buf, year as u32, 4);
    } else {
        buf.push(if year < 0 { b'-' } else { b'+' });
        write_u64(buf, u64::from(year.unsigned_abs()));
    }
    buf.push(b'-');
    write_padded(buf, ts.month(), 2);
    buf.push(b'-');
    write_padded(buf, ts.day(), 2);
    buf.push(b'T');
    write_padded(buf, ts.hour(), 2);
    buf.push(b':');
    write_padded(buf, ts.minute(), 2);
    buf.push(b':');
    write_padded(buf, ts.second(), 2);
    // Leap seconds are carried as nanos >= 1e9.
    write_fraction_digits(buf, u64::from(ts.nanosecond() % 1_000_000_000), 9);
    buf.push(b'Z');
}

pub(crate) fn unix_millis(ts: &Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Nanoseconds since the epoch, saturating outside the `i64` range.
pub(crate) fn unix_nanos(ts: &Timestamp) -> i64 {
    ts.timestamp_nanos_opt()
        .unwrap_or(if ts.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

/// Write `ts` with a strftime layout.
pub(crate) fn write_time_layout(buf: &mut Buffer, ts: &Timestamp, layout: &str) -> LogResult<()> {
    use fmt::Write as _;

    let start = buf.len();
    if write!(buf, "{}", ts.format(layout)).is_err() {
        buf.truncate(start);
        return Err(LogError::Render(format!("invalid time layout {layout:?}")));
    }
    Ok(())
}

pub(crate) fn write_level_name(buf: &mut Buffer, level: Level) {
    let (name, offset) = level.name_and_offset();
    buf.push_str(name);
    if offset > 0 {
        buf.push(b'+');
    }
    if offset != 0 {
        write_i64(buf, i64::from(offset));
    }
}

/// Escape `bytes` as JSON string content (no surrounding quotes).
///
/// Invalid UTF-8 sequences become U+FFFD.
pub(crate) fn write_json_escaped(buf: &mut Buffer, bytes: &[u8]) {
    for chunk in bytes.utf8_chunks() {
        escape_str(buf, chunk.valid());
        if !chunk.invalid().is_empty() {
            buf.push_str("\\ufffd");
        }
    }
}

pub(crate) fn write_json_quoted(buf: &mut Buffer, s: &str) {
    buf.push(b'"');
    escape_str(buf, s);
    buf.push(b'"');
}

fn escape_str(buf: &mut Buffer, s: &str) {
    let bytes = s.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b >= 0x20 && b != b'"' && b != b'\\' && b != 0xE2 {
            i += 1;
            continue;
        }
        // U+2028 / U+2029 encode as E2 80 A8 / E2 80 A9.
        let separator = b == 0xE2
            && bytes.get(i + 1) == Some(&0x80)
            && matches!(bytes.get(i + 2), Some(0xA8) | Some(0xA9));
        if b == 0xE2 && !separator {
            i += 1;
            continue;
        }

        buf.extend_from_slice(&bytes[start..i]);
        if separator {
            buf.push_str(if bytes[i + 2] == 0xA8 {
                "\\u2028"
            } else {
                "\\u2029"
            });
            i += 3;
        } else {
            match b {
                b'"' => buf.push_str("\\\""),
                b'\\' => buf.push_str("\\\\"),
                b'\n' => buf.push_str("\\n"),
                b'\r' => buf.push_str("\\r"),
                b'\t' => buf.push_str("\\t"),
                0x08 => buf.push_str("\\b"),
                0x0C => buf.push_str("\\f"),
                _ => {
                    buf.push_str("\\u00");
                    buf.push(HEX[usize::from(b >> 4)]);
                    buf.push(HEX[usize::from(b & 0x0F)]);
                }
            }
            i += 1;
        }
        start = i;
    }
    buf.extend_from_slice(&bytes[start..]);
}

/// `fmt::Write` adaptor that JSON-escapes whatever a `Display` impl writes.
pub(crate) struct JsonEscaper<'b> {
    buf: &'b mut Buffer,
}

impl<'b> JsonEscaper<'b> {
    pub(crate) fn new(buf: &'b mut Buffer) -> Self {
        JsonEscaper { buf }
    }
}

impl fmt::Write for JsonEscaper<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        escape_str(self.buf, s);
        Ok(())
    }
}

/// Whether a text value must be quoted to keep the line unambiguous.
pub(crate) fn needs_text_quoting(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .any(|&b| b < 0x20 || b == 0x7F || b == b' ' || b == b'"')
}

/// Text value: raw unless it contains a space, quote, or control character.
pub(crate) fn write_text_str(buf: &mut Buffer, s: &str) {
    if needs_text_quoting(s.as_bytes()) {
        write_json_quoted(buf, s);
    } else {
        buf.push_str(s);
    }
}

/// Re-quote everything written after `start` if it needs quoting.
pub(crate) fn requote_text_tail(buf: &mut Buffer, start: usize) {
    if !needs_text_quoting(buf.tail(start)) {
        return;
    }
    let raw = buf.split_tail(start);
    buf.push(b'"');
    write_json_escaped(buf, &raw);
    buf.push(b'"');
}

/// Standard base64 in quotes; empty input becomes `""`.
pub(crate) fn write_base64_quoted(buf: &mut Buffer, data: &[u8]) -> LogResult<()> {
    if data.is_empty() {
        buf.push_str("\"\"");
        return Ok(());
    }
    let encoded_len = base64::encoded_len(data.len(), true)
        .ok_or_else(|| LogError::Render("byte blob too large to encode".to_string()))?;
    buf.reserve(encoded_len + 2);
    buf.push(b'"');
    let bytes = buf.as_mut_vec();
    let start = bytes.len();
    bytes.resize(start + encoded_len, 0);
    let written = STANDARD
        .encode_slice(data, &mut bytes[start..])
        .map_err(|err| LogError::Render(err.to_string()))?;
    bytes.truncate(start + written);
    buf.push(b'"');
    Ok(())
}
