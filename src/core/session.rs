//! Presentation-layer state, minus any rendering.
//!
//! The session owns everything the front-ends display: the enumerated
//! devices, the current device snapshot, the ISO inventory, the pending
//! ISO operation, the busy flag and the progress indicator. Front-ends
//! (the TUI and the headless subcommands) translate user intent into
//! the methods here and render the public fields back out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::inventory::{self, DeviceSnapshot, IsoEntry, PendingIso};
use crate::core::logfile::{self, SessionLog};
use crate::core::progress::{ProgressMonitor, ProgressState};
use crate::core::worker::{CommandWorker, WorkerReply};
use crate::error::{self, ToolError};
use crate::logging::LogThrottle;
use crate::shell::Shell;

/// Validation failures caught before usb-creator is ever invoked.
/// Nothing has changed on the device when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteError {
    #[error("A write operation is already running.")]
    Busy,
    #[error("No device selected.")]
    NoDevice,
    #[error(
        "Cannot add ISO from path: {entered}.\n\
         Please, remove the ISO path or browse for an existing ISO."
    )]
    IsoMismatch { entered: String },
    #[error(
        "There is not enough space available on the pen drive.\n\
         Please, remove unneeded files before continuing."
    )]
    InsufficientSpace,
}

/// Final result of a write operation, derived from the tool's exit
/// code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Success,
    Failed(ToolError),
}

/// Result of an unmount request. Detach failures are never reported by
/// the utilities; the only signal is the device still being enumerable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountReport {
    NoDevice,
    Detached,
    StillPresent,
}

pub struct Session {
    shell: Arc<dyn Shell>,
    config: Arc<AppConfig>,

    pub devices: Vec<String>,
    pub current: Option<DeviceSnapshot>,
    pub isos: Vec<IsoEntry>,
    pub iso_text: String,
    pub pending: Option<PendingIso>,
    pub format_device: bool,
    pub format_locked: bool,
    pub repair_device: bool,
    pub status: String,
    pub progress: ProgressState,

    outcome: Option<WriteOutcome>,
    worker: Option<CommandWorker>,
    busy: bool,
    monitor: ProgressMonitor,
    applog: SessionLog,
    throttle: LogThrottle,
    version: String,
}

impl Session {
    pub fn new(config: Arc<AppConfig>, shell: Arc<dyn Shell>) -> Self {
        let log_file = config
            .log_file
            .clone()
            .or_else(|| logfile::discover_log_path(&config.tool_script))
            .unwrap_or_else(|| PathBuf::from(logfile::FALLBACK_LOG));
        let applog = SessionLog::new(log_file.clone());
        applog.write_banner();

        let version = inventory::package_version(shell.as_ref(), &config.tool);
        let mut session = Self {
            shell,
            config,
            devices: Vec::new(),
            current: None,
            isos: Vec::new(),
            iso_text: String::new(),
            pending: None,
            format_device: false,
            format_locked: false,
            repair_device: false,
            status: String::new(),
            progress: ProgressState::default(),
            outcome: None,
            worker: None,
            busy: false,
            monitor: ProgressMonitor::new(log_file),
            applog,
            throttle: LogThrottle::new(Duration::from_millis(500)),
            version,
        };
        session.status = session.version_status();
        session
    }

    fn version_status(&self) -> String {
        format!("Version: {}", self.version)
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    /// The write outcome, if one arrived since the last call. Taking it
    /// is what dismissing the result dialog maps to.
    pub fn take_outcome(&mut self) -> Option<WriteOutcome> {
        self.outcome.take()
    }

    // ===============================================
    // Inventory
    // ===============================================

    /// Re-enumerate devices, replacing the whole set. Keeps the current
    /// selection when the device is still present, otherwise falls back
    /// to the first device.
    pub fn refresh_devices(&mut self) {
        self.devices = inventory::list_devices(self.shell.as_ref());
        if self.devices.is_empty() {
            self.clear_current();
            return;
        }
        let path = match &self.current {
            Some(current) if self.devices.contains(&current.path) => current.path.clone(),
            _ => self.devices[0].clone(),
        };
        self.select_device(&path);
    }

    /// Take a fresh snapshot of one device and rescan its ISOs. The
    /// format flag is forced on (and locked) for an unpartitioned
    /// device; both checkboxes otherwise reset, as on every selection
    /// change.
    pub fn select_device(&mut self, path: &str) {
        let snapshot = inventory::describe_device(self.shell.as_ref(), path);
        if snapshot.has_partition {
            self.format_device = false;
            self.format_locked = false;
        } else {
            self.format_device = true;
            self.format_locked = true;
        }
        self.repair_device = false;
        self.isos = match snapshot.mount_point.as_deref() {
            Some(mount) => inventory::list_isos(self.shell.as_ref(), mount),
            None => Vec::new(),
        };
        self.applog.write(&format!(
            "Selected device info: {} size={}kB partition={} mount={:?} available={}kB",
            snapshot.path,
            snapshot.size_kb,
            snapshot.has_partition,
            snapshot.mount_point,
            snapshot.available_kb
        ));
        self.current = Some(snapshot);
        self.recompute_pending();
    }

    pub fn select_index(&mut self, index: usize) {
        if let Some(path) = self.devices.get(index).cloned() {
            self.select_device(&path);
        }
    }

    fn clear_current(&mut self) {
        self.current = None;
        self.isos.clear();
        self.iso_text.clear();
        self.pending = None;
        self.format_device = false;
        self.format_locked = false;
        self.repair_device = false;
    }

    // ===============================================
    // ISO field
    // ===============================================

    pub fn set_iso_text(&mut self, text: impl Into<String>) {
        self.iso_text = text.into();
        self.recompute_pending();
    }

    pub fn clear_iso_text(&mut self) {
        self.set_iso_text("");
    }

    fn recompute_pending(&mut self) {
        let entered = self.iso_text.trim();
        if entered.is_empty() {
            self.pending = None;
            return;
        }
        let mount = self.current.as_ref().and_then(|d| d.mount_point.as_deref());
        self.pending = inventory::pending_iso(self.shell.as_ref(), Path::new(entered), mount);
        match &self.pending {
            Some(pending) => self.applog.write(&format!(
                "New ISO: {}, {}",
                pending.path.display(),
                pending.required_kb
            )),
            None => self.applog.write(&format!("Invalid ISO path: {entered}")),
        }
    }

    /// Space the pending operation needs, in kB.
    pub fn required_kb(&self) -> i64 {
        self.pending.as_ref().map(|p| p.required_kb).unwrap_or(0)
    }

    /// Space the write can use: the partition's free space, or the full
    /// raw size when the device is about to be formatted.
    pub fn available_kb(&self) -> u64 {
        match &self.current {
            Some(device) if self.format_device => device.size_kb,
            Some(device) => device.available_kb,
            None => 0,
        }
    }

    // ===============================================
    // Checkboxes
    // ===============================================

    pub fn toggle_format(&mut self) {
        if !self.format_locked && !self.busy {
            self.format_device = !self.format_device;
        }
    }

    pub fn set_format(&mut self, on: bool) {
        if !self.format_locked && !self.busy {
            self.format_device = on;
        }
    }

    pub fn toggle_repair(&mut self) {
        if !self.busy {
            self.repair_device = !self.repair_device;
        }
    }

    pub fn set_repair(&mut self, on: bool) {
        if !self.busy {
            self.repair_device = on;
        }
    }

    pub fn toggle_iso(&mut self, index: usize) {
        if let Some(iso) = self.isos.get_mut(index) {
            iso.selected = !iso.selected;
        }
    }

    pub fn selected_iso_count(&self) -> usize {
        self.isos.iter().filter(|iso| iso.selected).count()
    }

    // ===============================================
    // Write operation
    // ===============================================

    /// Validate and start the write. On success the busy flag is up
    /// until [`Session::poll`] sees the worker finish; a second call in
    /// that window is rejected.
    pub fn execute(&mut self) -> Result<(), ExecuteError> {
        if self.busy {
            return Err(ExecuteError::Busy);
        }
        let device = self.current.clone().ok_or(ExecuteError::NoDevice)?;
        if !Path::new(&device.path).exists() {
            return Err(ExecuteError::NoDevice);
        }

        let entered = self.iso_text.trim().to_string();
        let iso = self.pending.as_ref().map(|p| p.path.clone());
        let iso_text = iso
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        if iso_text != entered {
            return Err(ExecuteError::IsoMismatch { entered });
        }
        if (self.available_kb() as i64) - self.required_kb() < 0 {
            return Err(ExecuteError::InsufficientSpace);
        }

        let mut arguments = vec![format!("-d {}", device.path)];
        if self.format_device {
            arguments.push("-f".to_string());
            arguments.push("-b".to_string());
        }
        if self.repair_device {
            arguments.push("-r".to_string());
            arguments.push("-b".to_string());
            arguments.push("-g".to_string());
        }
        if let Some(iso) = &iso {
            if iso.exists() {
                arguments.push(format!("-i \"{}\"", iso.display()));
                arguments.push("-m".to_string());
            }
        }

        let command = format!("{} {}", self.config.tool, arguments.join(" "));
        self.applog.write(&format!("Execute command: {command}"));
        info!(%command, "starting write operation");

        self.outcome = None;
        self.progress.reset();
        self.worker = Some(CommandWorker::spawn(self.shell.clone(), vec![command], false));
        self.busy = true;
        Ok(())
    }

    /// UI-tick handler: feed the progress monitor while the worker is
    /// alive, drain the hand-off channel, and on completion map the
    /// exit status, re-enable, and refresh the inventory.
    pub fn poll(&mut self) {
        if self.worker.is_none() {
            return;
        }

        if let Some(update) = self.monitor.poll() {
            self.status = update.message().to_string();
            self.progress.apply(&update);
            if self.throttle.should_log() {
                debug!(status = %self.status, "progress");
            }
        }

        let mut replies = Vec::new();
        let finished = match self.worker.as_mut() {
            Some(worker) => {
                while let Some(reply) = worker.try_recv() {
                    replies.push(reply);
                }
                worker.is_finished()
            }
            None => return,
        };

        if finished {
            // final drain: the thread can finish with a reply queued
            if let Some(worker) = self.worker.as_mut() {
                while let Some(reply) = worker.try_recv() {
                    replies.push(reply);
                }
            }
            self.worker = None;
            self.busy = false;
        }

        for reply in &replies {
            self.applog.write(&format!("Queue returns: {reply:?}"));
        }

        if finished {
            self.applog.write(">> Worker is done");
            if let Some(WorkerReply::Status(code)) = replies
                .iter()
                .rev()
                .find(|r| matches!(r, WorkerReply::Status(_)))
            {
                self.outcome = Some(match error::write_outcome(*code) {
                    Ok(()) => WriteOutcome::Success,
                    Err(err) => WriteOutcome::Failed(err),
                });
            }
            self.progress.reset();
            if let Some(current) = self.current.clone() {
                self.select_device(&current.path);
            }
            self.status = self.version_status();
        }
    }

    // ===============================================
    // Device maintenance
    // ===============================================

    /// Remove the selected ISOs from the device, then rescan.
    pub fn delete_selected_isos(&mut self) -> usize {
        let Some(mount) = self.current.as_ref().and_then(|d| d.mount_point.clone()) else {
            return 0;
        };
        let mut removed = 0;
        for iso in self.isos.iter().filter(|iso| iso.selected) {
            let path = mount.join(&iso.name);
            if !path.exists() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    self.applog.write(&format!("Remove ISO: {}", path.display()));
                    removed += 1;
                }
                Err(err) => {
                    self.applog.write(&format!(
                        "Failed to remove ISO {}: {err}",
                        path.display()
                    ));
                }
            }
        }
        if removed > 0 {
            if let Some(current) = self.current.clone() {
                self.select_device(&current.path);
            }
        }
        removed
    }

    /// Unmount and detach the current device, then re-enumerate to see
    /// whether it actually went away.
    pub fn unmount_current(&mut self) -> UnmountReport {
        let Some(device) = self.current.as_ref().map(|d| d.path.clone()) else {
            return UnmountReport::NoDevice;
        };
        inventory::unmount_device(self.shell.as_ref(), &device);
        self.refresh_devices();
        if self.devices.contains(&device) {
            UnmountReport::StillPresent
        } else {
            UnmountReport::Detached
        }
    }

    /// Shutdown path: unmount every known device, including one that
    /// may be mid-write.
    pub fn unmount_all(&mut self) {
        for device in self.devices.clone() {
            if inventory::device_mount(self.shell.as_ref(), &device).is_some() {
                inventory::unmount_device(self.shell.as_ref(), &device);
            }
        }
    }
}
