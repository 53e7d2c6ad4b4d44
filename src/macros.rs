//! Hot-path logging macros
//!
//! Used on the per-frame audio path. They log in debug builds and are
//! compiled out of release builds; arguments are still type-checked.

/// Debug-level log, debug builds only
#[macro_export]
macro_rules! perf_debug {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            log::debug!($($arg)*);
        }
    };
}

/// Trace-level log, debug builds only
#[macro_export]
macro_rules! perf_trace {
    ($($arg:tt)*) => {
        if cfg!(debug_assertions) {
            log::trace!($($arg)*);
        }
    };
}
