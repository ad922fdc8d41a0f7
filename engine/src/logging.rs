//! FILENAME: engine/src/logging.rs
//! PURPOSE: Category-tagged logging macros on top of the `log` facade.
//! CONTEXT: Each line carries a category (STORE, HISTORY, JOIN, EVAL, CODEC, SQL)
//! as its log target, so hosts can filter per subsystem. The engine never
//! installs a logger; the embedding application picks one.

// ============================================================================
// CATEGORIES
// ============================================================================

pub const STORE: &str = "STORE";
pub const HISTORY: &str = "HISTORY";
pub const JOIN: &str = "JOIN";
pub const EVAL: &str = "EVAL";
pub const CODEC: &str = "CODEC";
pub const SQL: &str = "SQL";

/// Formats an ENTER line for function tracing.
pub fn enter_line(func_name: &str, params: &str) -> String {
    if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    }
}

/// Formats an EXIT line for function tracing.
pub fn exit_line(func_name: &str, result: &str) -> String {
    if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    }
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        ::log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        ::log::info!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        ::log::warn!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($cat:expr, $($arg:tt)*) => {
        ::log::error!(target: $cat, $($arg)*)
    };
}

// ENTER/EXIT macros for function tracing

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        ::log::debug!(target: $cat, "{}", $crate::logging::enter_line($func, ""))
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        ::log::debug!(target: $cat, "{}", $crate::logging::enter_line($func, &format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        ::log::debug!(target: $cat, "{}", $crate::logging::exit_line($func, ""))
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        ::log::debug!(target: $cat, "{}", $crate::logging::exit_line($func, &format!($($arg)*)))
    };
}

// Re-export the macros so they can be imported via `use crate::logging::log_info;`
pub use log_debug;
pub use log_enter;
pub use log_error;
pub use log_exit;
pub use log_info;
pub use log_warn;
