#![deny(missing_docs)]
//! Structured-event logging pipeline.
//!
//! Callers attach typed [`Field`]s to a level-tagged message and a [`Logger`]
//! renders the record to a byte stream as `key=value` text or JSON. Encoding
//! works directly on the field enum (no reflection), reuses pooled buffers,
//! pre-renders bound fields once per child logger, and can hand records to a
//! single background writer through a bounded queue with an explicit
//! overflow policy.
//!
//! ```no_run
//! use fieldline::{Field, Format, Logger, Options};
//!
//! let logger = Logger::to_writer(std::io::stdout(), Options::default().format(Format::Json))
//!     .expect("logger");
//! let api = logger.bind(&[Field::str("svc", "api")]);
//! api.info("ready", &[Field::int64("port", 8080)]);
//! logger.close();
//! ```

pub(crate) mod observability;

/// Pooled, reusable byte buffers and freelists.
pub mod buffer;

/// Fields bound to a logger and their pre-rendered prefixes.
pub mod bound;

/// Text and JSON record encoders.
pub mod encode;

/// Delivery engine: level filter, async queue, sink writes.
pub mod engine;

/// Error type shared by the pipeline.
pub mod error;

/// Typed key/value fields.
pub mod field;

/// Process-wide default logger installed once at startup.
pub mod global;

/// Severity levels.
pub mod level;

/// Write counters and the metrics observer hook.
pub mod metrics;

/// Engine configuration.
pub mod option;

/// Output sinks.
pub mod sink;

pub use crate::{
    bound::BoundFields,
    engine::{LogRequest, Logger},
    error::{LogError, LogResult},
    field::{AnyValue, Field, Kind, RawJson, Timestamp, Value},
    level::Level,
    metrics::{MetricsObserver, StatsSnapshot},
    option::{DurationEncoding, Format, LevelEncoding, Options, OverflowPolicy, TimeEncoding},
    sink::{LevelRouter, Sink, WriterSink},
};
