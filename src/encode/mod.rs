//! Record encoders.
//!
//! Both encoders are plain functions over the [`Field`](crate::Field) enum;
//! no reflection and no intermediate allocations on the common path. Every
//! record is laid out in the same order: timestamp, level, message, the bound
//! prefix bytes verbatim, then the event fields in call order, followed by a
//! newline.

pub mod json;
pub(crate) mod primitives;
pub mod text;

use std::time::Duration;

use crate::{
    buffer::Buffer,
    engine::LogRequest,
    error::LogResult,
    field::{AnyValue, Field, RawJson, Timestamp},
    option::{Encoding, Format},
};

/// Placeholder written for opaque values no encoder understands.
pub const UNKNOWN_PLACEHOLDER: &str = "unknown";

/// Append one complete, newline-terminated record to `buf`.
///
/// Output depends only on the arguments, so rendering the same inputs twice
/// yields identical bytes.
pub fn render(
    buf: &mut Buffer,
    format: Format,
    request: &LogRequest<'_>,
    bound_prefix: &[u8],
    encoding: &Encoding,
) -> LogResult<()> {
    match format {
        Format::Text => text::write_record(buf, request, bound_prefix, encoding),
        Format::Json => json::write_record(buf, request, bound_prefix, encoding),
    }
}

/// Append the prefix fragment for `fields` in `format`.
///
/// Each field carries its own leading separator, so fragments concatenate.
pub fn render_fields(
    buf: &mut Buffer,
    format: Format,
    fields: &[Field<'_>],
    encoding: &Encoding,
) -> LogResult<()> {
    for field in fields {
        match format {
            Format::Text => text::write_field(buf, field, encoding)?,
            Format::Json => json::write_field(buf, field, encoding)?,
        }
    }
    Ok(())
}

/// Known shapes an opaque value is matched against before the structured
/// fallback.
pub(crate) enum Shape<'v> {
    RawJson(&'v str),
    Str(&'v str),
    Bytes(&'v [u8]),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float64(f64),
    Time(&'v Timestamp),
    Duration(Duration),
    Opaque,
}

macro_rules! match_shapes {
    ($value:expr; $($ty:ty => |$v:ident| $shape:expr),* $(,)?) => {
        $(
            if let Some($v) = $value.downcast_ref::<$ty>() {
                return $shape;
            }
        )*
    };
}

pub(crate) fn classify(value: &AnyValue) -> Shape<'_> {
    match_shapes!(value;
        RawJson => |v| Shape::RawJson(&v.0),
        String => |v| Shape::Str(v),
        &'static str => |v| Shape::Str(v),
        Vec<u8> => |v| Shape::Bytes(v),
        &'static [u8] => |v| Shape::Bytes(v),
        bool => |v| Shape::Bool(*v),
        i8 => |v| Shape::Int(i64::from(*v)),
        i16 => |v| Shape::Int(i64::from(*v)),
        i32 => |v| Shape::Int(i64::from(*v)),
        i64 => |v| Shape::Int(*v),
        isize => |v| Shape::Int(*v as i64),
        u8 => |v| Shape::Uint(u64::from(*v)),
        u16 => |v| Shape::Uint(u64::from(*v)),
        u32 => |v| Shape::Uint(u64::from(*v)),
        u64 => |v| Shape::Uint(*v),
        usize => |v| Shape::Uint(*v as u64),
        f32 => |v| Shape::Float32(*v),
        f64 => |v| Shape::Float64(*v),
        Timestamp => |v| Shape::Time(v),
        Duration => |v| Shape::Duration(*v),
    );
    Shape::Opaque
}
