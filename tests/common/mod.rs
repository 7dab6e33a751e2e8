//! Common sinks and helpers for integration tests.
#![allow(dead_code)]

use std::{
    io,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use fieldline::{Level, LogError, MetricsObserver, Sink};
use parking_lot::{Condvar, Mutex};

/// How long a test waits for the writer thread before giving up.
pub const WAIT: Duration = Duration::from_secs(5);

/// In-memory sink whose contents stay readable after the logger owns it.
#[derive(Clone, Default)]
pub struct MemorySink {
    bytes: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
}

impl MemorySink {
    pub fn text(&self) -> String {
        String::from_utf8(self.bytes.lock().clone()).expect("records are utf8")
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_owned).collect()
    }

    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).expect("every line is valid json"))
            .collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl Sink for MemorySink {
    fn write_record(&mut self, _level: Level, record: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(record);
        Ok(record.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Latch that holds writers until opened.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

/// Sink that announces each write and then parks until its gate opens.
pub struct GatedSink {
    inner: MemorySink,
    gate: Arc<Gate>,
    entered: flume::Sender<()>,
}

impl GatedSink {
    /// Returns the sink, its gate, and a receiver signalled as each write
    /// starts.
    pub fn new(inner: MemorySink) -> (Self, Arc<Gate>, flume::Receiver<()>) {
        let gate = Arc::new(Gate::default());
        let (entered, entered_rx) = flume::unbounded();
        let sink = GatedSink {
            inner,
            gate: Arc::clone(&gate),
            entered,
        };
        (sink, gate, entered_rx)
    }
}

impl Sink for GatedSink {
    fn write_record(&mut self, level: Level, record: &[u8]) -> io::Result<usize> {
        let _ = self.entered.send(());
        self.gate.wait();
        self.inner.write_record(level, record)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Sink rejecting every write.
pub struct FailingSink;

impl Sink for FailingSink {
    fn write_record(&mut self, _level: Level, _record: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}

/// Sink that accepts writes but fails every flush.
#[derive(Clone, Default)]
pub struct FlushFailingSink(pub MemorySink);

impl Sink for FlushFailingSink {
    fn write_record(&mut self, level: Level, record: &[u8]) -> io::Result<usize> {
        self.0.write_record(level, record)
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "flush refused"))
    }
}

/// Run `f` on a helper thread and report whether it finished within [`WAIT`].
pub fn finishes_in_time<F>(f: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let (done_tx, done_rx) = flume::bounded(1);
    std::thread::spawn(move || {
        f();
        let _ = done_tx.send(());
    });
    done_rx.recv_timeout(WAIT).is_ok()
}

/// Error handler that keeps every reported error as a string.
#[derive(Clone, Default)]
pub struct ErrorLog(Arc<Mutex<Vec<String>>>);

impl ErrorLog {
    pub fn handler(&self) -> impl Fn(&LogError) + Send + Sync + 'static {
        let errors = Arc::clone(&self.0);
        move |err| errors.lock().push(err.to_string())
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Observer tallying write callbacks.
#[derive(Default)]
pub struct CountingObserver {
    pub calls: AtomicUsize,
    pub failures: AtomicUsize,
    pub bytes: AtomicU64,
    pub negative_durations: AtomicUsize,
}

impl MetricsObserver for CountingObserver {
    fn record_write(&self, _level: Level, duration_ms: f64, bytes: usize, error: Option<&LogError>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(bytes as u64, Ordering::SeqCst);
        if error.is_some() {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
        if duration_ms < 0.0 {
            self.negative_durations.fetch_add(1, Ordering::SeqCst);
        }
    }
}
