//! Progress estimation from the usb-creator log.
//!
//! usb-creator reports nothing on stdout while it runs; the only live
//! signal is its log file. On every poll tick the monitor reads the
//! trailing lines, walks them newest to oldest and matches each against
//! a fixed marker table to decide which phase the tool is in. Scanning
//! stops at the current session's start marker so an older run can
//! never influence the estimate.

use std::path::PathBuf;

/// A known log marker and the phase it indicates. A percentage of 0
/// means the phase has no fixed completion point: the indicator pulses
/// and the line's trailing token (a running counter) is appended to the
/// message.
pub struct LogProgressRule {
    pub marker: &'static str,
    pub percent: u8,
    pub message: &'static str,
}

/// Matched in table order; the first hit wins.
pub const PROGRESS_RULES: &[LogProgressRule] = &[
    LogProgressRule { marker: "partitioning usb", percent: 5, message: "Partitioning USB..." },
    LogProgressRule { marker: "searching for bad blocks", percent: 0, message: "Searching for bad block" },
    LogProgressRule { marker: "installing", percent: 15, message: "Installing Grub..." },
    LogProgressRule { marker: "rsync", percent: 25, message: "Start copying ISO..." },
    LogProgressRule { marker: "left to copy", percent: 0, message: "kB left to copy:" },
    LogProgressRule { marker: "check md5sum", percent: 85, message: "Check md5sum of ISO..." },
];

/// Paired symbols marking the first log line of a write session.
const SESSION_START: &str = ">>>>>";
const SESSION_END: &str = "<<<<<";

/// How far back into the log each poll looks.
const TAIL_LINES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Jump the indicator straight to this percentage. Not clamped: a
    /// later line matching an earlier phase legitimately moves the bar
    /// backward.
    Fraction { percent: u8, message: String },
    /// Advance the indeterminate pulse.
    Pulse { message: String },
}

impl ProgressUpdate {
    pub fn message(&self) -> &str {
        match self {
            ProgressUpdate::Fraction { message, .. } => message,
            ProgressUpdate::Pulse { message } => message,
        }
    }
}

/// Scan already-tailed, already-filtered log lines, newest first.
pub fn scan_tail(lines: &[&str]) -> Option<ProgressUpdate> {
    for line in lines.iter().rev() {
        if line.contains(SESSION_START) && line.contains(SESSION_END) {
            break;
        }
        let lowered = line.to_lowercase();
        for rule in PROGRESS_RULES {
            if !lowered.contains(rule.marker) {
                continue;
            }
            if rule.percent == 0 {
                let token = line.split_whitespace().next_back().unwrap_or("");
                let message = format!("{} {}", rule.message, token).trim_end().to_string();
                return Some(ProgressUpdate::Pulse { message });
            }
            return Some(ProgressUpdate::Fraction {
                percent: rule.percent,
                message: rule.message.to_string(),
            });
        }
    }
    None
}

/// Polls the usb-creator log file, resolved once at startup.
pub struct ProgressMonitor {
    log_file: PathBuf,
}

impl ProgressMonitor {
    pub fn new(log_file: impl Into<PathBuf>) -> Self {
        Self { log_file: log_file.into() }
    }

    /// One poll tick. A missing or unreadable log yields no update, by
    /// design — the previous status simply stands.
    pub fn poll(&self) -> Option<ProgressUpdate> {
        let text = std::fs::read_to_string(&self.log_file).ok()?;
        let all: Vec<&str> = text.lines().collect();
        let start = all.len().saturating_sub(TAIL_LINES);
        let tail: Vec<&str> = all[start..]
            .iter()
            .copied()
            .filter(|line| !line.contains("DEBUG") && !line.contains("=="))
            .collect();
        scan_tail(&tail)
    }
}

/// Indicator state owned by the session and rendered by the front-end.
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    pub fraction: f64,
    pub pulse: usize,
    pub indeterminate: bool,
}

impl ProgressState {
    pub fn apply(&mut self, update: &ProgressUpdate) {
        match update {
            ProgressUpdate::Fraction { percent, .. } => {
                self.indeterminate = false;
                self.fraction = f64::from(*percent) / 100.0;
            }
            ProgressUpdate::Pulse { .. } => {
                self.indeterminate = true;
                self.pulse = self.pulse.wrapping_add(1);
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
