// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging utilities for Waypoint.
//!
//! Everything in the crate logs through the `log` facade.  The backend is
//! chosen once at startup:
//!
//! * [`init`] installs `env_logger` (honours `RUST_LOG`);
//! * [`init_with_config`] installs either `env_logger` or, when
//!   `proxy.logging.structured = true`, a `slog` drain bridged through
//!   `slog-stdlog`.
//!
//! Per-request correlation lives in [`context`].

pub mod config;
pub mod context;
pub mod structured;
pub mod wrapper;

#[cfg(test)]
pub mod test_logger;

use log::{LevelFilter, error, info, warn};
use once_cell::sync::OnceCell;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use self::config::LoggingConfig;
use self::structured::{LoggerGuard, init_global_logger};

static INIT: Once = Once::new();
static USING_STRUCTURED: AtomicBool = AtomicBool::new(false);
static STRUCTURED_GUARD: OnceCell<LoggerGuard> = OnceCell::new();

/// Initialize `env_logger` with the specified level.
///
/// This function ensures logging is only initialized once.
pub fn init(level: Option<LevelFilter>) {
    INIT.call_once(|| install_env_logger(level.unwrap_or(LevelFilter::Info)));
}

/// Initialize logging from a [`LoggingConfig`].
///
/// `level` is the fallback used when the configuration's own level string is
/// not recognised.  Like [`init`], only the first call has any effect.
pub fn init_with_config(level: LevelFilter, config: &LoggingConfig) {
    INIT.call_once(|| {
        let level = parse_level(&config.level).unwrap_or(level);

        if config.structured {
            let mut logger_config = config.to_logger_config();
            logger_config.level = structured::slog_level(level);

            let guard = init_global_logger(&logger_config);
            let _ = STRUCTURED_GUARD.set(guard);

            match level.to_level() {
                Some(bridge_level) => {
                    if slog_stdlog::init_with_level(bridge_level).is_err() {
                        warn!("A log backend was already installed; structured output disabled");
                        return;
                    }
                }
                None => log::set_max_level(LevelFilter::Off),
            }

            USING_STRUCTURED.store(true, Ordering::SeqCst);
            info!("Structured logging initialized at level: {}", log::max_level());
        } else {
            install_env_logger(level);
        }
    });
}

/// Whether the structured (`slog`) backend is active.
pub fn is_structured() -> bool {
    USING_STRUCTURED.load(Ordering::SeqCst)
}

/// Map a textual level (`"debug"`, `"WARN"`, …) onto a [`LevelFilter`].
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

fn install_env_logger(level: LevelFilter) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level.as_str().to_lowercase());

    let installed = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(true)
        .try_init();

    if installed.is_ok() {
        info!("Logging initialized at level: {}", log::max_level());
    }
}

/// Log an error with context and return the error.
///
/// This is useful for logging errors in a chain of Results.
pub fn log_error<E: std::fmt::Display>(context: &str, err: E) -> E {
    error!("{}: {}", context, err);
    err
}

/// Log an info message with context.
pub fn log_info<M: std::fmt::Display>(context: &str, msg: M) {
    info!("{}: {}", context, msg);
}
