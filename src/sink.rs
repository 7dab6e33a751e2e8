use std::{
    collections::HashMap,
    fmt,
    io::{self, Write},
};

use crate::level::Level;

/// Destination for rendered records.
///
/// The engine serializes all calls: `write_record` is never invoked
/// concurrently on the same sink, and every call carries exactly one complete
/// record ending in `\n`. A short write is reported as an error by the
/// implementation, never retried by the engine.
pub trait Sink: Send {
    /// Write one record, returning the number of bytes accepted.
    fn write_record(&mut self, level: Level, record: &[u8]) -> io::Result<usize>;

    /// Push buffered bytes to the underlying device.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for Box<dyn Sink> {
    fn write_record(&mut self, level: Level, record: &[u8]) -> io::Result<usize> {
        (**self).write_record(level, record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Sink over any [`Write`] implementation.
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        WriterSink { writer }
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_record(&mut self, _level: Level, record: &[u8]) -> io::Result<usize> {
        self.writer.write_all(record)?;
        Ok(record.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl<W> fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSink").finish_non_exhaustive()
    }
}

type BoxWriter = Box<dyn Write + Send>;

/// Sink choosing a writer per exact level, falling back to a default.
///
/// ```
/// use fieldline::{Level, LevelRouter};
///
/// let router = LevelRouter::new(std::io::stdout()).route(Level::ERROR, std::io::stderr());
/// # drop(router);
/// ```
pub struct LevelRouter {
    default: BoxWriter,
    routes: HashMap<Level, BoxWriter>,
}

impl LevelRouter {
    /// Router sending every level to `default`.
    pub fn new<W>(default: W) -> Self
    where
        W: Write + Send + 'static,
    {
        LevelRouter {
            default: Box::new(default),
            routes: HashMap::new(),
        }
    }

    /// Send records of exactly `level` to `writer`.
    pub fn route<W>(mut self, level: Level, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        self.routes.insert(level, Box::new(writer));
        self
    }

    fn writer_for(&mut self, level: Level) -> &mut BoxWriter {
        match self.routes.get_mut(&level) {
            Some(writer) => writer,
            None => &mut self.default,
        }
    }
}

impl Sink for LevelRouter {
    fn write_record(&mut self, level: Level, record: &[u8]) -> io::Result<usize> {
        self.writer_for(level).write_all(record)?;
        Ok(record.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.default.flush()?;
        for writer in self.routes.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for LevelRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routed: Vec<_> = self.routes.keys().copied().collect();
        routed.sort();
        f.debug_struct("LevelRouter")
            .field("routed", &routed)
            .finish_non_exhaustive()
    }
}
