//! Structured console logging.
//!
//! The headless subcommands log through the `tracing` ecosystem; the
//! TUI leaves the subscriber uninitialized so nothing scribbles over
//! the alternate screen. This is separate from the plain-text
//! application log shared with usb-creator (see `core::logfile`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Default)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
}

/// Initialize the tracing subscriber. Call once, early in main(); the
/// level can be overridden at runtime via `RUST_LOG`.
pub fn init(config: LogConfig) {
    let default_level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("usbmate={}", default_level.as_str().to_lowercase()))
    });

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }
}

/// A rate limiter for throttling log messages, used by the per-tick
/// progress updates that would otherwise spam the output.
pub struct LogThrottle {
    interval_ms: u64,
    /// Last log time in ms, or u64::MAX for "never logged"
    last_log_ms: AtomicU64,
    start: Instant,
}

const NEVER_LOGGED: u64 = u64::MAX;

impl LogThrottle {
    pub fn new(interval: std::time::Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_log_ms: AtomicU64::new(NEVER_LOGGED),
            start: Instant::now(),
        }
    }

    /// Returns true if enough time has passed since the last log.
    pub fn should_log(&self) -> bool {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let last = self.last_log_ms.load(Ordering::Relaxed);

        let should = last == NEVER_LOGGED || now_ms.saturating_sub(last) >= self.interval_ms;

        if should {
            // if we lose the race, another thread logged
            self.last_log_ms
                .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        } else {
            false
        }
    }

    /// Reset the throttle, allowing the next log immediately.
    pub fn reset(&self) {
        self.last_log_ms.store(NEVER_LOGGED, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn throttle_allows_first_log() {
        let throttle = LogThrottle::new(Duration::from_secs(1));
        assert!(throttle.should_log());
    }

    #[test]
    fn throttle_blocks_immediate_second_log() {
        let throttle = LogThrottle::new(Duration::from_secs(1));
        assert!(throttle.should_log());
        assert!(!throttle.should_log());
    }

    #[test]
    fn throttle_reset_allows_log() {
        let throttle = LogThrottle::new(Duration::from_secs(100));
        assert!(throttle.should_log());
        assert!(!throttle.should_log());
        throttle.reset();
        assert!(throttle.should_log());
    }
}
