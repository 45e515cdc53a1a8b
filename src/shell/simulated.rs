//! Canned shell backend for development and tests.
//!
//! Knows just enough about the fixed query pipelines the inventory
//! issues to answer them from an in-memory device table, backed by a
//! scratch directory that stands in for the mounted filesystem.
//! Mutating commands are recorded and acknowledged with exit code 0.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};

use super::{QueryError, Shell};

#[derive(Debug, Clone)]
pub struct SimDevice {
    pub path: String,
    pub size_bytes: u64,
    pub detachable: bool,
    pub partitions: u32,
    pub mounted: bool,
}

pub struct SimulatedShell {
    devices: Mutex<Vec<SimDevice>>,
    mount_root: PathBuf,
    commands: Mutex<Vec<String>>,
}

impl SimulatedShell {
    pub fn new(mount_root: impl Into<PathBuf>) -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            mount_root: mount_root.into(),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Scratch environment with one eligible 8 GB stick, one
    /// non-detachable disk that the device filter must drop, and a
    /// sample ISO already on the mounted filesystem.
    pub fn with_defaults(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let dev_dir = root.join("dev");
        let media_dir = root.join("media");
        fs::create_dir_all(&dev_dir).context("failed to create simulated /dev")?;
        fs::create_dir_all(&media_dir).context("failed to create simulated mount point")?;

        let sdy = dev_dir.join("sdy");
        let sdz = dev_dir.join("sdz");
        fs::write(&sdy, b"").context("failed to create simulated device node")?;
        fs::write(&sdz, b"").context("failed to create simulated device node")?;
        fs::write(media_dir.join("solydx_64.iso"), vec![0u8; 4096])
            .context("failed to seed sample ISO")?;

        let shell = Self::new(media_dir);
        shell.add_device(SimDevice {
            path: sdy.display().to_string(),
            size_bytes: 8 * 1024 * 1024 * 1024,
            detachable: true,
            partitions: 1,
            mounted: false,
        });
        shell.add_device(SimDevice {
            path: sdz.display().to_string(),
            size_bytes: 500 * 1024 * 1024 * 1024,
            detachable: false,
            partitions: 2,
            mounted: false,
        });
        Ok(shell)
    }

    pub fn add_device(&self, device: SimDevice) {
        self.devices.lock().unwrap_or_else(|e| e.into_inner()).push(device);
    }

    pub fn mount_root(&self) -> &PathBuf {
        &self.mount_root
    }

    /// Every command handed to [`Shell::run`], in order.
    pub fn recorded_commands(&self) -> Vec<String> {
        self.commands.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn info_lines(device: &SimDevice) -> Vec<String> {
        let mut lines = vec![
            format!("Showing information for {}", device.path),
            format!("  size:           {}", device.size_bytes),
            format!("  detachable:     {}", if device.detachable { 1 } else { 0 }),
        ];
        if device.partitions > 0 {
            lines.push("  partition table:".to_string());
            lines.push("    scheme:       mbr".to_string());
            lines.push(format!("    count:        {}", device.partitions));
        }
        lines
    }

    fn used_kb(&self) -> u64 {
        let Ok(dir) = fs::read_dir(&self.mount_root) else {
            return 0;
        };
        dir.flatten()
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len().div_ceil(1024))
            .sum()
    }
}

fn quoted_path(command: &str) -> Option<&str> {
    let start = command.find('"')? + 1;
    let end = command.rfind('"')?;
    if end > start { Some(&command[start..end]) } else { None }
}

impl Shell for SimulatedShell {
    fn run(&self, command: &str) -> Result<i32, QueryError> {
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.to_string());

        let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        if command.contains("udisks --mount") {
            for device in devices.iter_mut() {
                if command.contains(&format!("{}1", device.path)) && device.partitions > 0 {
                    device.mounted = true;
                }
            }
        } else if command.contains("udisks --unmount") {
            for device in devices.iter_mut() {
                if command.contains(&format!("{}1", device.path)) {
                    device.mounted = false;
                }
            }
        } else if command.contains("udisks --detach") {
            // detach only succeeds for an unmounted device; a failure is
            // not reported, the device simply stays enumerable
            devices.retain(|d| d.mounted || !command.contains(&d.path));
        }
        Ok(0)
    }

    fn capture_checked(&self, command: &str) -> Result<Vec<String>, QueryError> {
        let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());

        if command.contains("--enumerate-device-files") {
            return Ok(devices.iter().map(|d| d.path.clone()).collect());
        }

        if command.contains("--show-info") {
            let Some(device) = devices.iter().find(|d| command.contains(&d.path)) else {
                return Ok(Vec::new());
            };
            let lines = Self::info_lines(device);
            if command.contains("grep size") {
                return Ok(lines.into_iter().filter(|l| l.contains("size")).collect());
            }
            if command.contains("grep count") {
                return Ok(lines
                    .into_iter()
                    .filter(|l| l.contains("count") && !l.contains("block"))
                    .collect());
            }
            if command.contains("grep detachable") {
                return Ok(lines.into_iter().filter(|l| l.contains("detachable")).collect());
            }
            return Ok(lines);
        }

        if command.contains("df --output=avail") {
            let Some(device) = devices
                .iter()
                .find(|d| command.contains(&format!("{}1", d.path)))
            else {
                return Ok(Vec::new());
            };
            if device.partitions == 0 {
                return Ok(Vec::new());
            }
            let total_kb = device.size_bytes / 1024;
            return Ok(vec![total_kb.saturating_sub(self.used_kb()).to_string()]);
        }

        if command.contains("du -k") {
            let Some(path) = quoted_path(command) else {
                return Ok(Vec::new());
            };
            let Ok(meta) = fs::metadata(path) else {
                return Ok(Vec::new());
            };
            return Ok(vec![meta.len().div_ceil(1024).to_string()]);
        }

        if command.contains("/etc/mtab") {
            let mounted = devices
                .iter()
                .any(|d| d.mounted && command.contains(&format!("{}1", d.path)));
            if mounted {
                return Ok(vec![self.mount_root.display().to_string()]);
            }
            return Ok(Vec::new());
        }

        if command.contains("apt-cache policy") {
            return Ok(vec!["  Installed: 0.1.0-sim".to_string()]);
        }

        Ok(Vec::new())
    }
}
