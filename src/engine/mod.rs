//! Level filter, delivery and lifecycle.
//!
//! A [`Logger`] is a cheap handle onto a shared engine plus its own bound
//! prefix. Every handle derived through [`Logger::bind`] shares the engine's
//! options, sink, queue and counters.
//!
//! The engine moves through three states. While open it accepts records and,
//! when async delivery is configured, hands them to one background writer
//! through a bounded queue. Closing stops new enqueues (records are written
//! on the caller's thread instead) and waits for the writer to drain. Once
//! closed every call is a no-op.

mod worker;

use std::{
    any::Any,
    fmt, io,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Instant,
};

use chrono::Utc;
use parking_lot::Mutex;

use self::worker::Queue;
use crate::{
    bound::BoundFields,
    buffer::{BufferPool, Pool, DEFAULT_MAX_IDLE, MAX_RETAINED_BUFFER, MAX_RETAINED_FIELDS},
    encode,
    error::{LogError, LogResult},
    field::{Field, Timestamp},
    level::Level,
    metrics::{Stats, StatsSnapshot},
    option::{Encoding, Format, Options, OverflowPolicy},
    sink::{Sink, WriterSink},
};

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// One record as handed to the engine and the encoders.
///
/// Everything is borrowed from the caller; nothing is copied unless the
/// record is queued for the background writer.
#[derive(Debug, Clone, Copy)]
pub struct LogRequest<'a> {
    /// Severity.
    pub level: Level,
    /// Human-readable message.
    pub message: &'a str,
    /// When the event happened.
    pub timestamp: Timestamp,
    /// Event fields in call order.
    pub fields: &'a [Field<'a>],
}

impl<'a> LogRequest<'a> {
    /// Assemble a request.
    pub fn new(level: Level, message: &'a str, timestamp: Timestamp, fields: &'a [Field<'a>]) -> Self {
        LogRequest {
            level,
            message,
            timestamp,
            fields,
        }
    }
}

/// State shared by the engine handle and the background writer.
pub(crate) struct Shared {
    options: Options,
    sink: Mutex<Box<dyn Sink>>,
    buffers: BufferPool,
    field_lists: Pool<Vec<Field<'static>>>,
    stats: Stats,
}

impl Shared {
    fn new(sink: Box<dyn Sink>, options: Options) -> Self {
        Shared {
            options,
            sink: Mutex::new(sink),
            buffers: BufferPool::new(MAX_RETAINED_BUFFER, DEFAULT_MAX_IDLE),
            field_lists: Pool::new(MAX_RETAINED_FIELDS, DEFAULT_MAX_IDLE),
            stats: Stats::default(),
        }
    }

    /// Render and write one record under the sink lock.
    ///
    /// Never fails outward: errors and panics are counted and reported, and
    /// the observer sees every attempt.
    pub(crate) fn write(&self, request: &LogRequest<'_>, bound: &BoundFields) {
        let started = self.options.metrics.as_ref().map(|_| Instant::now());
        let mut size = 0;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> LogResult<()> {
            let format = self.options.format;
            let mut buf = self.buffers.acquire(self.options.buffer_capacity);
            encode::render(
                &mut buf,
                format,
                request,
                bound.prefix(format),
                &self.options.encoding,
            )?;
            size = buf.len();
            let written = self
                .sink
                .lock()
                .write_record(request.level, buf.as_slice())
                .map_err(LogError::Write)?;
            if written < size {
                return Err(LogError::Write(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {written} of {size} bytes"),
                )));
            }
            Ok(())
        }))
        .unwrap_or_else(|payload| Err(LogError::Panicked(panic_message(payload.as_ref()))));

        let error = outcome.err();
        if let Some(err) = &error {
            self.report(err);
        }
        if let (Some(observer), Some(started)) = (&self.options.metrics, started) {
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            observer.record_write(request.level, duration_ms, size, error.as_ref());
        }
    }

    pub(crate) fn flush_sink(&self) {
        let result = self.sink.lock().flush();
        if let Err(err) = result {
            self.report(&LogError::Write(err));
        }
    }

    /// Count `err` and hand it to the error handler.
    pub(crate) fn report(&self, err: &LogError) {
        self.stats.record_error();
        (self.options.error_handler)(err);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct Engine {
    shared: Arc<Shared>,
    queue: Option<Queue>,
    state: AtomicU8,
}

impl Engine {
    fn new(sink: Box<dyn Sink>, options: Options) -> LogResult<Self> {
        let shared = Arc::new(Shared::new(sink, options));
        let queue = if shared.options.async_delivery {
            Some(Queue::spawn(Arc::clone(&shared))?)
        } else {
            None
        };
        Ok(Engine {
            shared,
            queue,
            state: AtomicU8::new(OPEN),
        })
    }

    fn deliver(&self, request: &LogRequest<'_>, bound: &Arc<BoundFields>) {
        match self.state.load(Ordering::Acquire) {
            CLOSED => {}
            OPEN => match &self.queue {
                Some(queue) if queue.submit(&self.shared, request, bound) => {}
                _ => self.shared.write(request, bound),
            },
            _ => self.shared.write(request, bound),
        }
    }

    fn flush(&self) {
        if self.state.load(Ordering::Acquire) == CLOSED {
            return;
        }
        let drained = match &self.queue {
            Some(queue) => queue.flush(),
            None => false,
        };
        if !drained {
            self.shared.flush_sink();
        }
    }

    fn close(&self) {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Some(queue) = &self.queue {
            queue.shutdown();
        }
        self.shared.flush_sink();
        self.state.store(CLOSED, Ordering::Release);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle used to emit records.
///
/// Cloning is cheap and clones share everything, including the bound prefix.
/// Dropping the last handle of a logger family closes the engine.
#[derive(Clone)]
pub struct Logger {
    engine: Arc<Engine>,
    bound: Arc<BoundFields>,
}

impl Logger {
    /// Build a logger writing to `sink`.
    ///
    /// Fails only when async delivery is requested and the writer thread
    /// cannot be started.
    pub fn new<S>(sink: S, options: Options) -> LogResult<Logger>
    where
        S: Sink + 'static,
    {
        let engine = Engine::new(Box::new(sink), options)?;
        Ok(Logger {
            engine: Arc::new(engine),
            bound: Arc::new(BoundFields::empty()),
        })
    }

    /// Build a logger over any [`io::Write`].
    pub fn to_writer<W>(writer: W, options: Options) -> LogResult<Logger>
    where
        W: io::Write + Send + 'static,
    {
        Logger::new(WriterSink::new(writer), options)
    }

    /// Child logger with `fields` appended to the inherited bound fields.
    ///
    /// The prefix is rendered once here. If rendering fails the error is
    /// reported and the child keeps its parent's prefix.
    pub fn bind(&self, fields: &[Field<'_>]) -> Logger {
        let shared = &self.engine.shared;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.bound
                .bind(fields, &shared.options.encoding, &shared.buffers)
        }))
        .unwrap_or_else(|payload| Err(LogError::Panicked(panic_message(payload.as_ref()))));

        let bound = match result {
            Ok(bound) => Arc::new(bound),
            Err(err) => {
                shared.report(&err);
                Arc::clone(&self.bound)
            }
        };
        Logger {
            engine: Arc::clone(&self.engine),
            bound,
        }
    }

    /// Deliver a fully specified record.
    ///
    /// Records below the minimum level return before any work is done.
    /// Never fails: problems go to the error handler and the counters.
    pub fn log(&self, request: &LogRequest<'_>) {
        if request.level < self.engine.shared.options.min_level {
            return;
        }
        self.engine.deliver(request, &self.bound);
    }

    /// Deliver a record stamped with the current time.
    pub fn log_at(&self, level: Level, message: &str, fields: &[Field<'_>]) {
        if !self.enabled(level) {
            return;
        }
        self.log(&LogRequest::new(level, message, Utc::now(), fields));
    }

    /// [`Level::TRACE`] record.
    pub fn trace(&self, message: &str, fields: &[Field<'_>]) {
        self.log_at(Level::TRACE, message, fields);
    }

    /// [`Level::DEBUG`] record.
    pub fn debug(&self, message: &str, fields: &[Field<'_>]) {
        self.log_at(Level::DEBUG, message, fields);
    }

    /// [`Level::INFO`] record.
    pub fn info(&self, message: &str, fields: &[Field<'_>]) {
        self.log_at(Level::INFO, message, fields);
    }

    /// [`Level::WARN`] record.
    pub fn warn(&self, message: &str, fields: &[Field<'_>]) {
        self.log_at(Level::WARN, message, fields);
    }

    /// [`Level::ERROR`] record.
    pub fn error(&self, message: &str, fields: &[Field<'_>]) {
        self.log_at(Level::ERROR, message, fields);
    }

    /// [`Level::FATAL`] record. Only rendered; the process keeps running.
    pub fn fatal(&self, message: &str, fields: &[Field<'_>]) {
        self.log_at(Level::FATAL, message, fields);
    }

    /// Whether a record at `level` would be delivered.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.engine.shared.options.min_level && !self.is_closed()
    }

    /// Configured minimum level.
    pub fn min_level(&self) -> Level {
        self.engine.shared.options.min_level
    }

    /// Configured output format.
    pub fn format(&self) -> Format {
        self.engine.shared.options.format
    }

    /// Whether records go through the background writer.
    pub fn is_async(&self) -> bool {
        self.engine.shared.options.async_delivery
    }

    /// Async queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.engine.shared.options.queue_capacity
    }

    /// Policy applied when the async queue is full.
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.engine.shared.options.overflow
    }

    /// Value encodings shared by both renderers.
    pub fn encoding(&self) -> &Encoding {
        &self.engine.shared.options.encoding
    }

    /// Fields bound to this handle.
    pub fn bound_fields(&self) -> &BoundFields {
        &self.bound
    }

    /// Wait until every record enqueued before this call is written, then
    /// flush the sink.
    pub fn flush(&self) {
        self.engine.flush();
    }

    /// Stop accepting async work, drain the queue and flush the sink.
    ///
    /// Affects every handle of this logger family. Idempotent.
    pub fn close(&self) {
        self.engine.close();
    }

    /// Whether [`close`](Logger::close) has completed.
    pub fn is_closed(&self) -> bool {
        self.engine.state.load(Ordering::Acquire) == CLOSED
    }

    /// Current counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.shared.stats.snapshot()
    }

    /// Zero the counters.
    pub fn reset_stats(&self) {
        self.engine.shared.stats.reset();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("options", &self.engine.shared.options)
            .field("bound", &self.bound)
            .field("state", &self.engine.state.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::metrics::MetricsObserver;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Sink for Capture {
        fn write_record(&mut self, _level: Level, record: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(record);
            Ok(record.len())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).expect("utf8")
        }
    }

    struct Short;

    impl Sink for Short {
        fn write_record(&mut self, _level: Level, record: &[u8]) -> io::Result<usize> {
            Ok(record.len() / 2)
        }
    }

    #[derive(Default)]
    struct Calls(AtomicUsize);

    impl MetricsObserver for Calls {
        fn record_write(&self, _: Level, _: f64, _: usize, _: Option<&LogError>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn closed_logger_is_a_no_op() {
        let sink = Capture::default();
        let logger = Logger::new(sink.clone(), Options::default()).expect("logger");
        logger.info("before", &[]);
        logger.close();
        assert!(logger.is_closed());
        logger.info("after", &[]);
        logger.close();
        let out = sink.text();
        assert!(out.contains("msg=before"));
        assert!(!out.contains("msg=after"));
        assert!(!logger.enabled(Level::FATAL));
    }

    #[test]
    fn short_writes_are_errors() {
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&failures);
        let logger = Logger::new(
            Short,
            Options::default().error_handler(move |err| {
                assert!(matches!(err, LogError::Write(_)));
                seen.fetch_add(1, Ordering::Relaxed);
            }),
        )
        .expect("logger");
        logger.warn("half", &[]);
        assert_eq!(logger.stats().errors, 1);
        assert_eq!(failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn observer_sees_each_delivered_record() {
        let calls = Arc::new(Calls::default());
        let logger = Logger::new(
            Capture::default(),
            Options::default()
                .min_level(Level::WARN)
                .metrics_observer(calls.clone()),
        )
        .expect("logger");
        logger.info("filtered", &[]);
        logger.warn("kept", &[]);
        logger.error("kept", &[]);
        assert_eq!(calls.0.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn bind_shares_engine_but_not_prefix() {
        let sink = Capture::default();
        let root = Logger::new(sink.clone(), Options::default().format(Format::Json))
            .expect("logger");
        let child = root.bind(&[Field::str("svc", "api")]);
        root.info("root", &[]);
        child.info("child", &[]);
        assert!(root.bound_fields().is_empty());
        assert_eq!(child.bound_fields().fields().len(), 1);

        let out = sink.text();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].contains("svc"));
        assert!(lines[1].ends_with(",\"msg\":\"child\",\"svc\":\"api\"}"));
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload = panic::catch_unwind(|| panic!("boom {}", 7)).expect_err("panicked");
        assert_eq!(panic_message(payload.as_ref()), "boom 7");
        let payload = panic::catch_unwind(|| panic!("static")).expect_err("panicked");
        assert_eq!(panic_message(payload.as_ref()), "static");
    }
}
