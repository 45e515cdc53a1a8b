//! The shared plain-text application log.
//!
//! usb-creator and this front-end write to the same log file. Its path
//! is not configured anywhere; it is read once at startup out of the
//! `LOG=` assignment in the tool's own script, with a fixed fallback
//! when the script is missing or holds no assignment.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Used when the companion script yields no log path.
pub const FALLBACK_LOG: &str = "/var/log/usb-creator.log";

/// The log is truncated at startup once it outgrows this.
const MAX_LOG_KB: u64 = 5120;

fn log_assignment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^\s*LOG=["']?([^"']+?)["']?\s*$"#).unwrap())
}

/// Parse the `LOG=` assignment out of the usb-creator script.
pub fn discover_log_path(script: &Path) -> Option<PathBuf> {
    let text = std::fs::read_to_string(script).ok()?;
    for line in text.lines() {
        if let Some(caps) = log_assignment().captures(line) {
            let value = caps[1].trim();
            if !value.is_empty() {
                return Some(PathBuf::from(value));
            }
        }
    }
    None
}

/// Append-only writer for the shared log. Write failures degrade
/// silently — losing a log line must never interrupt an operation.
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Ok(meta) = std::fs::metadata(&path) {
            if meta.len() / 1024 > MAX_LOG_KB {
                let _ = std::fs::write(&path, "");
            }
        }
        Self { path }
    }

    pub fn write(&self, line: &str) {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(err) = result {
            debug!(path = %self.path.display(), error = %err, "log write failed");
        }
    }

    /// Startup banner. The separator lines are exactly what the
    /// progress monitor's `==` filter discards.
    pub fn write_banner(&self) {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.write(&format!(
            "\n===============================================\n\
             Start USB Mate: {stamp}\n\
             ==============================================="
        ));
    }
}
