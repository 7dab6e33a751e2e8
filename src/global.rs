//! A process-wide logger is opt-in: nothing is installed until the
//! application calls [`init_default`], and the first installed logger stays
//! for the life of the process.

use once_cell::sync::OnceCell;

use crate::engine::Logger;

static DEFAULT: OnceCell<Logger> = OnceCell::new();

/// Install `logger` as the process default.
///
/// Only the first call succeeds; later calls hand their logger back.
pub fn init_default(logger: Logger) -> Result<(), Logger> {
    DEFAULT.set(logger)
}

/// The installed default, if any.
pub fn default() -> Option<&'static Logger> {
    DEFAULT.get()
}
