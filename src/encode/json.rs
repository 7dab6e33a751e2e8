//! `{"ts":..,"level":..,"msg":..,"key":value}` records.

use std::{fmt::Write as _, time::Duration};

use super::{
    classify,
    primitives::{
        duration_millis, duration_nanos, unix_millis, unix_nanos, write_base64_quoted,
        write_duration_human, write_float_json, write_i64, write_json_quoted, write_level_name,
        write_rfc3339_nano, write_u64, JsonEscaper,
    },
    Shape, UNKNOWN_PLACEHOLDER,
};
use crate::{
    buffer::Buffer,
    engine::LogRequest,
    error::LogResult,
    field::{AnyValue, Field, Timestamp, Value},
    level::Level,
    option::{DurationEncoding, Encoding, LevelEncoding, TimeEncoding},
};

/// Append one JSON record plus newline.
pub fn write_record(
    buf: &mut Buffer,
    request: &LogRequest<'_>,
    bound_prefix: &[u8],
    encoding: &Encoding,
) -> LogResult<()> {
    buf.push_str("{\"ts\":");
    write_time(buf, &request.timestamp, encoding);
    buf.push_str(",\"level\":");
    write_level(buf, request.level, encoding);
    buf.push_str(",\"msg\":");
    write_json_quoted(buf, request.message);
    buf.extend_from_slice(bound_prefix);
    for field in request.fields {
        write_field(buf, field, encoding)?;
    }
    buf.push_str("}\n");
    Ok(())
}

/// Append `,"key":value`.
pub fn write_field(buf: &mut Buffer, field: &Field<'_>, encoding: &Encoding) -> LogResult<()> {
    buf.push(b',');
    write_json_quoted(buf, field.key());
    buf.push(b':');
    write_value(buf, field.value(), encoding)
}

fn write_value(buf: &mut Buffer, value: &Value<'_>, encoding: &Encoding) -> LogResult<()> {
    match value {
        Value::Str(s) => write_json_quoted(buf, s),
        Value::Int64(v) => write_i64(buf, *v),
        Value::Uint64(v) => write_u64(buf, *v),
        Value::Float64(v) => write_float_json(buf, *v),
        Value::Bool(v) => write_bool(buf, *v),
        Value::Duration(d) => write_duration(buf, *d, encoding),
        Value::Time(t) => write_time(buf, t, encoding),
        Value::Error(None) | Value::Any(None) => buf.push_str("null"),
        Value::Error(Some(err)) => {
            buf.push(b'"');
            let mut escaper = JsonEscaper::new(buf);
            write!(escaper, "{err}")?;
            buf.push(b'"');
        }
        Value::Bytes(bytes) => write_base64_quoted(buf, bytes)?,
        Value::Any(Some(any)) => write_any(buf, any, encoding)?,
    }
    Ok(())
}

fn write_any(buf: &mut Buffer, value: &AnyValue, encoding: &Encoding) -> LogResult<()> {
    match classify(value) {
        Shape::RawJson("") => buf.push_str("\"\""),
        Shape::RawJson(raw) => buf.push_str(raw),
        Shape::Str(s) => write_json_quoted(buf, s),
        Shape::Bytes(bytes) => write_base64_quoted(buf, bytes)?,
        Shape::Bool(v) => write_bool(buf, v),
        Shape::Int(v) => write_i64(buf, v),
        Shape::Uint(v) => write_u64(buf, v),
        Shape::Float32(v) => write_float_json(buf, v),
        Shape::Float64(v) => write_float_json(buf, v),
        Shape::Time(t) => write_time(buf, t, encoding),
        Shape::Duration(d) => write_duration(buf, d, encoding),
        Shape::Opaque => {
            let start = buf.len();
            match value.encode_structured(buf.as_mut_vec()) {
                Some(Ok(())) => {}
                Some(Err(_)) => {
                    buf.truncate(start);
                    buf.push_str("null");
                }
                None => write_json_quoted(buf, UNKNOWN_PLACEHOLDER),
            }
        }
    }
    Ok(())
}

fn write_bool(buf: &mut Buffer, value: bool) {
    buf.push_str(if value { "true" } else { "false" });
}

fn write_level(buf: &mut Buffer, level: Level, encoding: &Encoding) {
    match encoding.level {
        LevelEncoding::Numeric => write_i64(buf, i64::from(level.as_i32())),
        LevelEncoding::Name => {
            buf.push(b'"');
            write_level_name(buf, level);
            buf.push(b'"');
        }
    }
}

fn write_time(buf: &mut Buffer, ts: &Timestamp, encoding: &Encoding) {
    match encoding.time {
        TimeEncoding::Rfc3339Nano => {
            buf.push(b'"');
            write_rfc3339_nano(buf, ts);
            buf.push(b'"');
        }
        TimeEncoding::UnixMillis => write_i64(buf, unix_millis(ts)),
        TimeEncoding::UnixNanos => write_i64(buf, unix_nanos(ts)),
    }
}

fn write_duration(buf: &mut Buffer, value: Duration, encoding: &Encoding) {
    match encoding.duration {
        DurationEncoding::String => {
            buf.push(b'"');
            write_duration_human(buf, value);
            buf.push(b'"');
        }
        DurationEncoding::Millis => write_u64(buf, duration_millis(value)),
        DurationEncoding::Nanos => write_u64(buf, duration_nanos(value)),
    }
}
