use std::fmt;

/// Severity of a record.
///
/// Levels are plain integers ordered `TRACE < DEBUG < INFO < WARN < ERROR <
/// FATAL`, spaced four apart so callers can slot custom levels in between.
/// The engine only uses them as a filter threshold; `FATAL` is rendered like
/// any other level and never ends the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i32);

impl Level {
    /// Finest-grained diagnostics.
    pub const TRACE: Level = Level(-8);
    /// Debugging detail.
    pub const DEBUG: Level = Level(-4);
    /// Normal operation.
    pub const INFO: Level = Level(0);
    /// Something unexpected that the caller recovered from.
    pub const WARN: Level = Level(4);
    /// An operation failed.
    pub const ERROR: Level = Level(8);
    /// An unrecoverable condition. Rendered only; no side effects.
    pub const FATAL: Level = Level(12);

    const NAMED: [(Level, &'static str); 6] = [
        (Level::TRACE, "TRACE"),
        (Level::DEBUG, "DEBUG"),
        (Level::INFO, "INFO"),
        (Level::WARN, "WARN"),
        (Level::ERROR, "ERROR"),
        (Level::FATAL, "FATAL"),
    ];

    /// Build a level from its numeric value.
    pub const fn new(value: i32) -> Self {
        Level(value)
    }

    /// Numeric value written to `level=` / `"level":`.
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Nearest named level at or below `self` and the offset from it.
    ///
    /// Values below `TRACE` are reported relative to `TRACE` with a negative
    /// offset.
    pub fn name_and_offset(self) -> (&'static str, i32) {
        let mut base = Self::NAMED[0];
        for named in Self::NAMED {
            if named.0 <= self {
                base = named;
            }
        }
        (base.1, self.0 - base.0 .0)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl From<i32> for Level {
    fn from(value: i32) -> Self {
        Level(value)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, offset) = self.name_and_offset();
        match offset {
            0 => f.write_str(name),
            n if n > 0 => write!(f, "{name}+{n}"),
            n => write!(f, "{name}{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_severity() {
        assert!(Level::TRACE < Level::DEBUG);
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::INFO < Level::WARN);
        assert!(Level::WARN < Level::ERROR);
        assert!(Level::ERROR < Level::FATAL);
        assert_eq!(Level::INFO.as_i32(), 0);
    }

    #[test]
    fn display_names_and_offsets() {
        assert_eq!(Level::WARN.to_string(), "WARN");
        assert_eq!(Level::new(2).to_string(), "INFO+2");
        assert_eq!(Level::new(-10).to_string(), "TRACE-2");
        assert_eq!(Level::new(20).to_string(), "FATAL+8");
    }
}
