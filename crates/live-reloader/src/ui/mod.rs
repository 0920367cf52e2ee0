//! Terminal UI helpers for human-facing status lines.
//!
//! Request and watch activity goes through `tracing`; this module only covers
//! the handful of lines a person reads at startup and shutdown (the serving
//! banner, the Ctrl+C hint, fatal errors).
//!
//! ```no_run
//! use live_reloader::ui;
//!
//! ui::init_colors(false);
//! ui::success("Serving \"/srv/site\" at http://localhost:3000");
//! ```

mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

pub use messages::{error, info, success, warning};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Check if color output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` enables them even without a
/// terminal, otherwise stderr must be attended by a user.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }

    console::user_attended_stderr()
}

/// Initialize color support based on flags and environment.
///
/// Should be called early in `main`, before any status line is printed.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}
