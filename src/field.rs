use std::{any::Any, borrow::Cow, error::Error as StdError, fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

/// Wall-clock instant attached to records and `Time` fields.
pub type Timestamp = DateTime<Utc>;

/// Shared, type-erased error payload.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Kind tag identifying which [`Value`] variant a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    Uint64,
    /// 64-bit float; may be non-finite.
    Float64,
    /// Boolean.
    Bool,
    /// Elapsed time.
    Duration,
    /// Wall-clock instant.
    Time,
    /// Error message (or nil).
    Error,
    /// Byte blob.
    Bytes,
    /// Opaque value (or nil).
    Any,
}

/// Typed payload of a [`Field`].
///
/// String and byte payloads borrow from the caller until the field crosses a
/// thread boundary, at which point [`Value::to_static`] copies them.
#[derive(Clone)]
pub enum Value<'a> {
    /// UTF-8 string.
    Str(Cow<'a, str>),
    /// Signed integer.
    Int64(i64),
    /// Unsigned integer.
    Uint64(u64),
    /// Float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// Elapsed time.
    Duration(Duration),
    /// Wall-clock instant.
    Time(Timestamp),
    /// Error; `None` renders as `null`.
    Error(Option<SharedError>),
    /// Byte blob.
    Bytes(Cow<'a, [u8]>),
    /// Opaque value; `None` renders as `null`.
    Any(Option<AnyValue>),
}

impl Value<'_> {
    /// Kind tag for this payload.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Str(_) => Kind::String,
            Value::Int64(_) => Kind::Int64,
            Value::Uint64(_) => Kind::Uint64,
            Value::Float64(_) => Kind::Float64,
            Value::Bool(_) => Kind::Bool,
            Value::Duration(_) => Kind::Duration,
            Value::Time(_) => Kind::Time,
            Value::Error(_) => Kind::Error,
            Value::Bytes(_) => Kind::Bytes,
            Value::Any(_) => Kind::Any,
        }
    }

    /// Deep copy that no longer borrows from the caller.
    pub fn to_static(&self) -> Value<'static> {
        match self {
            Value::Str(s) => Value::Str(Cow::Owned(s.clone().into_owned())),
            Value::Int64(v) => Value::Int64(*v),
            Value::Uint64(v) => Value::Uint64(*v),
            Value::Float64(v) => Value::Float64(*v),
            Value::Bool(v) => Value::Bool(*v),
            Value::Duration(v) => Value::Duration(*v),
            Value::Time(v) => Value::Time(*v),
            Value::Error(e) => Value::Error(e.clone()),
            Value::Bytes(b) => Value::Bytes(Cow::Owned(b.clone().into_owned())),
            Value::Any(a) => Value::Any(a.clone()),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Value::Uint64(v) => f.debug_tuple("Uint64").field(v).finish(),
            Value::Float64(v) => f.debug_tuple("Float64").field(v).finish(),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            Value::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Value::Error(e) => f
                .debug_tuple("Error")
                .field(&e.as_ref().map(|e| e.to_string()))
                .finish(),
            Value::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Value::Any(a) => f.debug_tuple("Any").field(a).finish(),
        }
    }
}

/// A key plus one typed value.
///
/// Construction never validates: empty keys, nil errors and nil opaque
/// values are all legal.
#[derive(Clone, Debug)]
pub struct Field<'a> {
    key: Cow<'a, str>,
    value: Value<'a>,
}

impl<'a> Field<'a> {
    /// Build a field from a key and an already-typed value.
    pub fn new(key: impl Into<Cow<'a, str>>, value: Value<'a>) -> Self {
        Field {
            key: key.into(),
            value,
        }
    }

    /// String field. Borrowed input is not copied.
    pub fn str(key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Field::new(key, Value::Str(value.into()))
    }

    /// Signed integer field.
    pub fn int64(key: impl Into<Cow<'a, str>>, value: i64) -> Self {
        Field::new(key, Value::Int64(value))
    }

    /// Unsigned integer field.
    pub fn uint64(key: impl Into<Cow<'a, str>>, value: u64) -> Self {
        Field::new(key, Value::Uint64(value))
    }

    /// Float field. NaN and infinities are accepted.
    pub fn float64(key: impl Into<Cow<'a, str>>, value: f64) -> Self {
        Field::new(key, Value::Float64(value))
    }

    /// Boolean field.
    pub fn bool(key: impl Into<Cow<'a, str>>, value: bool) -> Self {
        Field::new(key, Value::Bool(value))
    }

    /// Duration field.
    pub fn duration(key: impl Into<Cow<'a, str>>, value: Duration) -> Self {
        Field::new(key, Value::Duration(value))
    }

    /// Timestamp field.
    pub fn time(key: impl Into<Cow<'a, str>>, value: Timestamp) -> Self {
        Field::new(key, Value::Time(value))
    }

    /// Error field rendered through the error's `Display`.
    pub fn error<E>(key: impl Into<Cow<'a, str>>, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Field::new(key, Value::Error(Some(Arc::new(err))))
    }

    /// Error field from an already shared error.
    pub fn shared_error(key: impl Into<Cow<'a, str>>, err: SharedError) -> Self {
        Field::new(key, Value::Error(Some(err)))
    }

    /// Error field with no error; renders `null`.
    pub fn nil_error(key: impl Into<Cow<'a, str>>) -> Self {
        Field::new(key, Value::Error(None))
    }

    /// Byte blob field. Borrowed input is not copied.
    pub fn bytes(key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, [u8]>>) -> Self {
        Field::new(key, Value::Bytes(value.into()))
    }

    /// Opaque field. Known primitive shapes render natively, anything else
    /// renders as the `unknown` placeholder.
    pub fn any<T>(key: impl Into<Cow<'a, str>>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Field::new(key, Value::Any(Some(AnyValue::new(value))))
    }

    /// Opaque field that falls back to its `serde` representation when it
    /// is not one of the known primitive shapes.
    #[cfg(feature = "serde")]
    pub fn serde<T>(key: impl Into<Cow<'a, str>>, value: T) -> Self
    where
        T: serde::Serialize + Any + Send + Sync,
    {
        Field::new(key, Value::Any(Some(AnyValue::serializable(value))))
    }

    /// Pre-encoded JSON spliced verbatim into JSON output.
    ///
    /// The content must already be valid JSON; it is not checked.
    pub fn raw_json(key: impl Into<Cow<'a, str>>, json: impl Into<String>) -> Self {
        Field::any(key, RawJson(json.into()))
    }

    /// Opaque field with no value; renders `null`.
    pub fn null(key: impl Into<Cow<'a, str>>) -> Self {
        Field::new(key, Value::Any(None))
    }

    /// Field key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field payload.
    pub fn value(&self) -> &Value<'a> {
        &self.value
    }

    /// Kind tag of the payload.
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Deep copy that owns its key and payload.
    pub fn to_static(&self) -> Field<'static> {
        Field {
            key: Cow::Owned(self.key.clone().into_owned()),
            value: self.value.to_static(),
        }
    }
}

/// JSON text spliced into JSON output without quoting or escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJson(pub String);

#[cfg(feature = "serde")]
type StructuredEncoder = fn(&(dyn Any + Send + Sync), &mut Vec<u8>) -> Result<(), String>;

/// Type-erased opaque value carried by [`Value::Any`].
#[derive(Clone)]
pub struct AnyValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    #[cfg(feature = "serde")]
    structured: Option<StructuredEncoder>,
}

impl AnyValue {
    /// Wrap a value matched only against the known primitive shapes.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        AnyValue {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            #[cfg(feature = "serde")]
            structured: None,
        }
    }

    /// Wrap a value that can fall back to its `serde` JSON encoding.
    #[cfg(feature = "serde")]
    pub fn serializable<T>(value: T) -> Self
    where
        T: serde::Serialize + Any + Send + Sync,
    {
        AnyValue {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            structured: Some(serialize_json::<T>),
        }
    }

    /// Borrow the value as `T` if that is its concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Name of the wrapped type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Append the structured JSON encoding, if one was captured.
    ///
    /// Returns `None` when the value has no structured encoder.
    pub(crate) fn encode_structured(&self, out: &mut Vec<u8>) -> Option<Result<(), String>> {
        #[cfg(feature = "serde")]
        {
            self.structured.map(|encode| encode(self.inner.as_ref(), out))
        }
        #[cfg(not(feature = "serde"))]
        {
            let _ = out;
            None
        }
    }
}

#[cfg(feature = "serde")]
fn serialize_json<T>(value: &(dyn Any + Send + Sync), out: &mut Vec<u8>) -> Result<(), String>
where
    T: serde::Serialize + Any,
{
    let value = value
        .downcast_ref::<T>()
        .ok_or_else(|| "structured encoder type mismatch".to_string())?;
    serde_json::to_writer(out, value).map_err(|err| err.to_string())
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyValue")
            .field("type", &self.type_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl StdError for Boom {}

    #[test]
    fn constructors_tag_kinds() {
        let cases = [
            (Field::str("a", "b"), Kind::String),
            (Field::int64("a", -1), Kind::Int64),
            (Field::uint64("a", 1), Kind::Uint64),
            (Field::float64("a", 0.5), Kind::Float64),
            (Field::bool("a", true), Kind::Bool),
            (Field::duration("a", Duration::from_millis(1)), Kind::Duration),
            (Field::time("a", Utc::now()), Kind::Time),
            (Field::error("a", Boom), Kind::Error),
            (Field::nil_error("a"), Kind::Error),
            (Field::bytes("a", &b"xy"[..]), Kind::Bytes),
            (Field::any("a", 7u8), Kind::Any),
            (Field::null("a"), Kind::Any),
        ];
        for (field, kind) in cases {
            assert_eq!(field.kind(), kind);
            assert_eq!(field.key(), "a");
        }
    }

    #[test]
    fn borrowed_payloads_are_not_copied() {
        let text = String::from("borrowed");
        let field = Field::str("k", text.as_str());
        match field.value() {
            Value::Str(Cow::Borrowed(s)) => assert!(std::ptr::eq(*s, text.as_str())),
            other => panic!("expected borrowed string, got {other:?}"),
        }
    }

    #[test]
    fn to_static_owns_everything() {
        let key = String::from("key");
        let payload = vec![1u8, 2, 3];
        let owned: Field<'static> = {
            let field = Field::bytes(key.as_str(), payload.as_slice());
            field.to_static()
        };
        drop(key);
        drop(payload);
        assert_eq!(owned.key(), "key");
        assert!(matches!(owned.value(), Value::Bytes(Cow::Owned(b)) if b == &[1, 2, 3]));
    }

    #[test]
    fn any_value_downcasts() {
        let value = AnyValue::new(42i32);
        assert_eq!(value.downcast_ref::<i32>(), Some(&42));
        assert!(value.downcast_ref::<u32>().is_none());
        assert_eq!(value.type_name(), "i32");
    }
}
