//! Device and ISO inventory.
//!
//! Everything here is a thin query layer over the system disk
//! utilities: udisks for enumeration, attributes, mounting and
//! detaching, /etc/mtab for mount points, df for free space and du for
//! ISO sizes. Queries go through the [`Shell`] seam and degrade to
//! empty results on failure, so a missing utility shows up as "no
//! devices" rather than an error.

use std::path::{Path, PathBuf};

use crate::shell::Shell;

/// Immutable view of one removable device, rebuilt on every refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub path: String,
    pub size_kb: u64,
    pub detachable: bool,
    pub has_partition: bool,
    pub mount_point: Option<PathBuf>,
    pub available_kb: u64,
}

/// One `*.iso` file found at the device's mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoEntry {
    pub name: String,
    pub size_kb: u64,
    pub logo: &'static str,
    pub selected: bool,
}

impl IsoEntry {
    pub fn size_display(&self) -> String {
        format!("{} MB", self.size_kb / 1024)
    }
}

/// A validated ISO source and the net space it needs on the device.
/// Negative when an overwritten file is larger than its replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIso {
    pub path: PathBuf,
    pub required_kb: i64,
}

/// Distribution names recognised in ISO file names, checked in order;
/// anything else gets the generic key.
pub const LOGO_KEYS: &[&str] = &[
    "solydx", "solydk", "debian", "ubuntu", "mint", "fedora", "manjaro", "arch",
];

const GENERIC_LOGO: &str = "iso";

pub fn logo_for(iso_name: &str) -> &'static str {
    let lowered = iso_name.to_lowercase();
    LOGO_KEYS
        .iter()
        .find(|key| lowered.contains(*key))
        .copied()
        .unwrap_or(GENERIC_LOGO)
}

/// Enumerate removable devices: block devices matching the fixed name
/// pattern that udisks marks both detachable and partitioned, sorted
/// lexicographically by device path.
pub fn list_devices(shell: &dyn Shell) -> Vec<String> {
    let mut devices = Vec::new();
    let candidates = shell.capture("udisks --enumerate-device-files | egrep '/dev/sd[a-z]$'");
    for device in candidates {
        let info = shell.capture(&format!("udisks --show-info {device}"));
        let mut detachable = false;
        let mut has_partition = false;
        for line in &info {
            if line.contains("detachable") && line.contains('1') {
                detachable = true;
            } else if line.contains("partition") {
                has_partition = true;
            }
            if detachable && has_partition {
                devices.push(device.clone());
                break;
            }
        }
    }
    devices.sort();
    devices
}

/// Build a full snapshot of one device, auto-mounting the first
/// partition when one exists. An unpartitioned device reports its full
/// raw size as available: it is always about to be formatted.
pub fn describe_device(shell: &dyn Shell, path: &str) -> DeviceSnapshot {
    // udisks reports bytes, df and du report kB
    let mut size_kb = 0;
    let size_lines = shell.capture(&format!("env LANG=C udisks --show-info {path} | grep size"));
    if let Some(first) = size_lines.first() {
        if let Some(value) = first.split(':').nth(1) {
            size_kb = value.trim().parse::<u64>().unwrap_or(0) / 1024;
        }
    }

    let detachable = shell
        .capture(&format!("udisks --show-info {path} | grep detachable"))
        .first()
        .map(|line| line.contains('1'))
        .unwrap_or(false);

    let has_partition = device_has_partition(shell, path);
    let (mount_point, available_kb) = if has_partition {
        let mount = device_mount(shell, path);
        let available = shell
            .capture(&format!("df --output=avail {path}1 | awk 'NR==2'"))
            .first()
            .and_then(|line| line.trim().parse::<u64>().ok())
            .unwrap_or(0);
        (mount, available)
    } else {
        (None, size_kb)
    };

    DeviceSnapshot {
        path: path.to_string(),
        size_kb,
        detachable,
        has_partition,
        mount_point,
        available_kb,
    }
}

fn device_has_partition(shell: &dyn Shell, path: &str) -> bool {
    shell
        .capture(&format!("udisks --show-info {path} | grep count | grep -v block"))
        .first()
        .map(|line| line.contains('1'))
        .unwrap_or(false)
}

/// Mount the first partition (a no-op when already mounted) and return
/// its mount point from the mount table.
pub fn device_mount(shell: &dyn Shell, path: &str) -> Option<PathBuf> {
    let _ = shell.run(&format!("udisks --mount {path}1"));
    let mount = shell.capture(&format!(
        "grep {path}1 /etc/mtab | awk '{{print $2}}' | sed 's/\\040/ /g'"
    ));
    mount.first().map(|m| PathBuf::from(m.trim()))
}

/// ISO files directly under the mount point, non-recursive, sorted by
/// name.
pub fn list_isos(shell: &dyn Shell, mount: &Path) -> Vec<IsoEntry> {
    let mut entries = Vec::new();
    let Ok(dir) = std::fs::read_dir(mount) else {
        return entries;
    };
    for entry in dir.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("iso") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        entries.push(IsoEntry {
            logo: logo_for(name),
            size_kb: iso_size_kb(shell, &path),
            name: name.to_string(),
            selected: false,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// File size in kB via the disk-usage utility.
pub fn iso_size_kb(shell: &dyn Shell, path: &Path) -> u64 {
    shell
        .capture(&format!("du -k \"{}\" | awk '{{print $1}}'", path.display()))
        .first()
        .and_then(|line| line.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Work out the pending operation for an ISO path. A single file is
/// always accepted (its net requirement may even be negative); a
/// directory is accepted only when the ISOs inside it need net space on
/// the device. Overwriting a same-named file on the mount point only
/// costs the size difference.
pub fn pending_iso(shell: &dyn Shell, iso_path: &Path, mount: Option<&Path>) -> Option<PendingIso> {
    if !iso_path.exists() {
        return None;
    }

    if iso_path.is_dir() {
        let mut required_kb: i64 = 0;
        let Ok(dir) = std::fs::read_dir(iso_path) else {
            return None;
        };
        for entry in dir.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("iso") {
                required_kb += net_required_kb(shell, &path, mount);
            }
        }
        if required_kb > 0 {
            return Some(PendingIso { path: iso_path.to_path_buf(), required_kb });
        }
        return None;
    }

    Some(PendingIso {
        path: iso_path.to_path_buf(),
        required_kb: net_required_kb(shell, iso_path, mount),
    })
}

fn net_required_kb(shell: &dyn Shell, iso: &Path, mount: Option<&Path>) -> i64 {
    let new_kb = iso_size_kb(shell, iso) as i64;
    let existing_kb = iso
        .file_name()
        .and_then(|name| mount.map(|m| m.join(name)))
        .filter(|target| target.exists())
        .map(|target| iso_size_kb(shell, &target) as i64)
        .unwrap_or(0);
    new_kb - existing_kb
}

/// Unmount the first partition, then detach the device. Failures are
/// not surfaced; the caller infers the result by re-running
/// [`list_devices`] and checking whether the device is still there.
pub fn unmount_device(shell: &dyn Shell, path: &str) {
    let _ = shell.run(&format!("udisks --unmount {path}1"));
    let _ = shell.run(&format!("udisks --detach {path}"));
}

/// Installed package version from the package manager, empty when not
/// installed.
pub fn package_version(shell: &dyn Shell, package: &str) -> String {
    let lines = shell.capture(&format!(
        "env LANG=C bash -c 'apt-cache policy {package} | grep \"Installed:\"'"
    ));
    let Some(first) = lines.first() else {
        return String::new();
    };
    let version = first.split_whitespace().next_back().unwrap_or("");
    if version.contains("none") {
        return String::new();
    }
    version.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logo_key_from_known_distribution_names() {
        assert_eq!(logo_for("solydx_64_202401.iso"), "solydx");
        assert_eq!(logo_for("SolydK-BE.iso"), "solydk");
        assert_eq!(logo_for("debian-12.5-netinst.iso"), "debian");
        assert_eq!(logo_for("mystery-os.iso"), "iso");
    }
}
