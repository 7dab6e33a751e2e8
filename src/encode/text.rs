//! `ts=.. level=.. msg=.. key=value` records.
//!
//! Keys are written raw. Values are written raw unless they contain a space,
//! a double quote or a control character, in which case they are quoted with
//! JSON escaping.

use std::{fmt::Write as _, time::Duration};

use super::{
    classify,
    primitives::{
        duration_millis, duration_nanos, requote_text_tail, unix_millis, unix_nanos,
        write_duration_human, write_float_text, write_i64, write_level_name, write_rfc3339_nano,
        write_text_str, write_time_layout, write_u64,
    },
    Shape, UNKNOWN_PLACEHOLDER,
};
use crate::{
    buffer::Buffer,
    engine::LogRequest,
    error::LogResult,
    field::{AnyValue, Field, Timestamp, Value},
    option::{DurationEncoding, Encoding, LevelEncoding, TimeEncoding},
};

/// Append one text record plus newline.
pub fn write_record(
    buf: &mut Buffer,
    request: &LogRequest<'_>,
    bound_prefix: &[u8],
    encoding: &Encoding,
) -> LogResult<()> {
    buf.push_str("ts=");
    match encoding.text_time_format.as_deref() {
        Some(layout) => {
            let start = buf.len();
            write_time_layout(buf, &request.timestamp, layout)?;
            requote_text_tail(buf, start);
        }
        None => write_time(buf, &request.timestamp, encoding),
    }
    buf.push_str(" level=");
    match encoding.level {
        LevelEncoding::Numeric => write_i64(buf, i64::from(request.level.as_i32())),
        LevelEncoding::Name => write_level_name(buf, request.level),
    }
    buf.push_str(" msg=");
    write_text_str(buf, request.message);
    buf.extend_from_slice(bound_prefix);
    for field in request.fields {
        write_field(buf, field, encoding)?;
    }
    buf.push(b'\n');
    Ok(())
}

/// Append ` key=value`.
pub fn write_field(buf: &mut Buffer, field: &Field<'_>, encoding: &Encoding) -> LogResult<()> {
    buf.push(b' ');
    buf.push_str(field.key());
    buf.push(b'=');
    write_value(buf, field.value(), encoding)
}

fn write_value(buf: &mut Buffer, value: &Value<'_>, encoding: &Encoding) -> LogResult<()> {
    match value {
        Value::Str(s) => write_text_str(buf, s),
        Value::Int64(v) => write_i64(buf, *v),
        Value::Uint64(v) => write_u64(buf, *v),
        Value::Float64(v) => write_float_text(buf, *v),
        Value::Bool(v) => write_bool(buf, *v),
        Value::Duration(d) => write_duration(buf, *d, encoding),
        Value::Time(t) => write_time(buf, t, encoding),
        Value::Error(None) | Value::Any(None) => buf.push_str("null"),
        Value::Error(Some(err)) => {
            let start = buf.len();
            write!(buf, "{err}")?;
            requote_text_tail(buf, start);
        }
        Value::Bytes(bytes) => write_len(buf, bytes.len()),
        Value::Any(Some(any)) => write_any(buf, any, encoding),
    }
    Ok(())
}

fn write_any(buf: &mut Buffer, value: &AnyValue, encoding: &Encoding) {
    match classify(value) {
        Shape::RawJson(raw) | Shape::Str(raw) => write_text_str(buf, raw),
        Shape::Bytes(bytes) => write_len(buf, bytes.len()),
        Shape::Bool(v) => write_bool(buf, v),
        Shape::Int(v) => write_i64(buf, v),
        Shape::Uint(v) => write_u64(buf, v),
        Shape::Float32(v) => write_float_text(buf, v),
        Shape::Float64(v) => write_float_text(buf, v),
        Shape::Time(t) => write_time(buf, t, encoding),
        Shape::Duration(d) => write_duration(buf, d, encoding),
        Shape::Opaque => {
            let start = buf.len();
            match value.encode_structured(buf.as_mut_vec()) {
                Some(Ok(())) => requote_text_tail(buf, start),
                Some(Err(_)) => {
                    buf.truncate(start);
                    buf.push_str("null");
                }
                None => buf.push_str(UNKNOWN_PLACEHOLDER),
            }
        }
    }
}

fn write_bool(buf: &mut Buffer, value: bool) {
    buf.push_str(if value { "true" } else { "false" });
}

fn write_len(buf: &mut Buffer, len: usize) {
    buf.push_str("len:");
    write_u64(buf, len as u64);
}

fn write_time(buf: &mut Buffer, ts: &Timestamp, encoding: &Encoding) {
    match encoding.time {
        TimeEncoding::Rfc3339Nano => write_rfc3339_nano(buf, ts),
        TimeEncoding::UnixMillis => write_i64(buf, unix_millis(ts)),
        TimeEncoding::UnixNanos => write_i64(buf, unix_nanos(ts)),
    }
}

fn write_duration(buf: &mut Buffer, value: Duration, encoding: &Encoding) {
    match encoding.duration {
        DurationEncoding::String => write_duration_human(buf, value),
        DurationEncoding::Millis => write_u64(buf, duration_millis(value)),
        DurationEncoding::Nanos => write_u64(buf, duration_nanos(value)),
    }
}
