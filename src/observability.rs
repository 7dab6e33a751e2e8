//! Internal diagnostics for the pipeline itself.
//!
//! fieldline reports its own lifecycle and delivery failures through
//! `tracing`. All events use target "fieldline" and carry an `event` field.
//! The library never installs a subscriber; applications decide where these
//! events go.

/// Target for all fieldline diagnostic events.
pub(crate) const FIELDLINE_TARGET: &str = "fieldline";

/// Macro for debug-level diagnostic events.
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::FIELDLINE_TARGET, $($field)*)
    };
}

/// Macro for warn-level diagnostic events.
///
/// # Example
/// ```ignore
/// log_warn!(event = "delivery_error", error = %err);
/// ```
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::FIELDLINE_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_warn;
