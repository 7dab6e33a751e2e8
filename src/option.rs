use std::{fmt, sync::Arc};

use crate::{
    error::LogError,
    level::Level,
    metrics::MetricsObserver,
    observability::log_warn,
};

/// Queue capacity used when none (or zero) is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Initial render buffer capacity used when none (or zero) is configured.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2048;

/// Callback receiving every error the pipeline swallows.
pub type ErrorHandler = Arc<dyn Fn(&LogError) + Send + Sync>;

/// Output record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `ts=.. level=.. msg=.. key=value`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Encoding for the record timestamp and every `Time` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeEncoding {
    /// RFC 3339 in UTC with up to nine trimmed fractional digits.
    #[default]
    Rfc3339Nano,
    /// Integer milliseconds since the Unix epoch.
    UnixMillis,
    /// Integer nanoseconds since the Unix epoch.
    UnixNanos,
}

/// Encoding for every `Duration` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationEncoding {
    /// Human string such as `1.5s` or `2m3s`.
    #[default]
    String,
    /// Integer milliseconds (truncated).
    Millis,
    /// Integer nanoseconds.
    Nanos,
}

/// Encoding for the `level` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelEncoding {
    /// The numeric value, e.g. `0` for info.
    #[default]
    Numeric,
    /// The name, e.g. `INFO` or `INFO+2`.
    Name,
}

/// Behavior when the async queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Discard the incoming record. Never blocks.
    #[default]
    DropNewest,
    /// Evict one queued record to make room; degrades to `DropNewest` if
    /// the queue fills again before the retry.
    DropOldest,
    /// Block the caller until the worker frees a slot. Never drops.
    Block,
}

/// Value encodings shared by both renderers.
#[derive(Debug, Clone, Default)]
pub struct Encoding {
    pub(crate) time: TimeEncoding,
    pub(crate) duration: DurationEncoding,
    pub(crate) level: LevelEncoding,
    pub(crate) text_time_format: Option<Arc<str>>,
}

impl Encoding {
    /// Timestamp encoding.
    pub fn time(&self) -> TimeEncoding {
        self.time
    }

    /// Duration encoding.
    pub fn duration(&self) -> DurationEncoding {
        self.duration
    }

    /// Level encoding.
    pub fn level(&self) -> LevelEncoding {
        self.level
    }
}

/// Engine configuration, fixed when the [`Logger`](crate::Logger) is built.
#[derive(Clone)]
pub struct Options {
    pub(crate) format: Format,
    pub(crate) min_level: Level,
    pub(crate) async_delivery: bool,
    pub(crate) queue_capacity: usize,
    pub(crate) overflow: OverflowPolicy,
    pub(crate) encoding: Encoding,
    pub(crate) buffer_capacity: usize,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) metrics: Option<Arc<dyn MetricsObserver>>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            format: Format::Text,
            min_level: Level::INFO,
            async_delivery: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow: OverflowPolicy::DropNewest,
            encoding: Encoding::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            error_handler: Arc::new(default_error_handler),
            metrics: None,
        }
    }
}

impl Options {
    /// Output record format.
    pub fn format(self, format: Format) -> Self {
        Options { format, ..self }
    }

    /// Records below this level are discarded before any work is done.
    pub fn min_level(self, min_level: Level) -> Self {
        Options { min_level, ..self }
    }

    /// Hand records to a background writer thread.
    pub fn async_delivery(self, async_delivery: bool) -> Self {
        Options {
            async_delivery,
            ..self
        }
    }

    /// Bounded queue size for async delivery; `0` selects the default.
    pub fn queue_capacity(self, queue_capacity: usize) -> Self {
        let queue_capacity = if queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            queue_capacity
        };
        Options {
            queue_capacity,
            ..self
        }
    }

    /// Policy applied when the async queue is full.
    pub fn overflow_policy(self, overflow: OverflowPolicy) -> Self {
        Options { overflow, ..self }
    }

    /// Encoding for the record timestamp and `Time` fields.
    pub fn time_encoding(self, time: TimeEncoding) -> Self {
        Options {
            encoding: Encoding {
                time,
                ..self.encoding
            },
            ..self
        }
    }

    /// Encoding for `Duration` fields.
    pub fn duration_encoding(self, duration: DurationEncoding) -> Self {
        Options {
            encoding: Encoding {
                duration,
                ..self.encoding
            },
            ..self
        }
    }

    /// Encoding for the `level` key.
    pub fn level_encoding(self, level: LevelEncoding) -> Self {
        Options {
            encoding: Encoding {
                level,
                ..self.encoding
            },
            ..self
        }
    }

    /// strftime layout for the text `ts=` value, e.g. `%H:%M:%S%.3f`.
    ///
    /// Only affects the text record timestamp. An invalid layout surfaces as
    /// a render error on each record.
    pub fn text_time_format(self, layout: impl Into<Arc<str>>) -> Self {
        Options {
            encoding: Encoding {
                text_time_format: Some(layout.into()),
                ..self.encoding
            },
            ..self
        }
    }

    /// Initial capacity of each render buffer; `0` selects the default.
    pub fn buffer_capacity(self, buffer_capacity: usize) -> Self {
        let buffer_capacity = if buffer_capacity == 0 {
            DEFAULT_BUFFER_CAPACITY
        } else {
            buffer_capacity
        };
        Options {
            buffer_capacity,
            ..self
        }
    }

    /// Callback for swallowed errors. Defaults to a `tracing` warn event.
    pub fn error_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&LogError) + Send + Sync + 'static,
    {
        Options {
            error_handler: Arc::new(handler),
            ..self
        }
    }

    /// Observer called after every write attempt. Write latency is only
    /// measured while an observer is installed.
    pub fn metrics_observer(self, observer: Arc<dyn MetricsObserver>) -> Self {
        Options {
            metrics: Some(observer),
            ..self
        }
    }
}

impl Options {
    /// Value encodings shared by both renderers.
    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("format", &self.format)
            .field("min_level", &self.min_level)
            .field("async_delivery", &self.async_delivery)
            .field("queue_capacity", &self.queue_capacity)
            .field("overflow", &self.overflow)
            .field("encoding", &self.encoding)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

fn default_error_handler(err: &LogError) {
    log_warn!(event = "delivery_error", error = %err);
}
