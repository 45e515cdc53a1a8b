//! Inventory tests against a scripted shell.
//!
//! The fake answers each known query pipeline with fixed lines, which
//! pins both the parsing and the silent-failure contract: a query the
//! fake does not know simply produces no output.

use std::path::PathBuf;

use usbmate::core::inventory;
use usbmate::shell::{QueryError, Shell};

struct FakeShell {
    responses: Vec<(String, Vec<String>)>,
}

impl FakeShell {
    fn new(pairs: Vec<(String, Vec<&str>)>) -> Self {
        Self {
            responses: pairs
                .into_iter()
                .map(|(needle, lines)| {
                    (needle, lines.into_iter().map(str::to_string).collect())
                })
                .collect(),
        }
    }
}

impl Shell for FakeShell {
    fn run(&self, _command: &str) -> Result<i32, QueryError> {
        Ok(0)
    }

    // first matching needle wins, so keep specific pipelines first
    fn capture_checked(&self, command: &str) -> Result<Vec<String>, QueryError> {
        for (needle, lines) in &self.responses {
            if command.contains(needle.as_str()) {
                return Ok(lines.clone());
            }
        }
        Ok(Vec::new())
    }
}

#[test]
fn list_devices_filters_and_sorts() {
    let shell = FakeShell::new(vec![
        (
            "enumerate-device-files".to_string(),
            vec!["/dev/sdc", "/dev/sda", "/dev/sdb"],
        ),
        // sda: not detachable
        (
            "--show-info /dev/sda".to_string(),
            vec!["  detachable:   0", "  partition table:", "    count:  1"],
        ),
        // sdb: eligible
        (
            "--show-info /dev/sdb".to_string(),
            vec!["  detachable:   1", "  partition table:", "    count:  1"],
        ),
        // sdc: eligible, listed out of order by the enumeration
        (
            "--show-info /dev/sdc".to_string(),
            vec!["  detachable:   1", "  partition table:", "    count:  1"],
        ),
    ]);

    let devices = inventory::list_devices(&shell);
    assert_eq!(devices, vec!["/dev/sdb".to_string(), "/dev/sdc".to_string()]);
}

#[test]
fn list_devices_excludes_unpartitioned() {
    let shell = FakeShell::new(vec![
        ("enumerate-device-files".to_string(), vec!["/dev/sdb"]),
        ("--show-info /dev/sdb".to_string(), vec!["  detachable:   1"]),
    ]);

    assert!(inventory::list_devices(&shell).is_empty());
}

#[test]
fn list_devices_degrades_to_empty_when_queries_fail() {
    let shell = FakeShell::new(Vec::new());
    assert!(inventory::list_devices(&shell).is_empty());
}

#[test]
fn describe_partitioned_device() {
    let shell = FakeShell::new(vec![
        (
            "--show-info /dev/sdb | grep size".to_string(),
            vec!["  size:   8004304896"],
        ),
        (
            "--show-info /dev/sdb | grep detachable".to_string(),
            vec!["  detachable:   1"],
        ),
        (
            "--show-info /dev/sdb | grep count".to_string(),
            vec!["    count:  1"],
        ),
        ("df --output=avail /dev/sdb1".to_string(), vec!["1843200"]),
        (
            "grep /dev/sdb1 /etc/mtab".to_string(),
            vec!["/media/usb"],
        ),
    ]);

    let device = inventory::describe_device(&shell, "/dev/sdb");
    assert_eq!(device.path, "/dev/sdb");
    assert_eq!(device.size_kb, 8004304896 / 1024);
    assert!(device.detachable);
    assert!(device.has_partition);
    assert_eq!(device.mount_point, Some(PathBuf::from("/media/usb")));
    assert_eq!(device.available_kb, 1843200);
}

#[test]
fn unpartitioned_device_offers_full_raw_size() {
    let shell = FakeShell::new(vec![
        (
            "--show-info /dev/sdb | grep size".to_string(),
            vec!["  size:   8004304896"],
        ),
        (
            "--show-info /dev/sdb | grep detachable".to_string(),
            vec!["  detachable:   1"],
        ),
        // no partition count line at all
    ]);

    let device = inventory::describe_device(&shell, "/dev/sdb");
    assert!(!device.has_partition);
    assert_eq!(device.mount_point, None);
    assert_eq!(device.available_kb, device.size_kb);
}

#[test]
fn required_space_subtracts_overwritten_file() {
    let source = tempfile::tempdir().unwrap();
    let mount = tempfile::tempdir().unwrap();

    let new_iso = source.path().join("alpha.iso");
    let existing_iso = mount.path().join("alpha.iso");
    std::fs::write(&new_iso, b"x").unwrap();
    std::fs::write(&existing_iso, b"x").unwrap();

    let shell = FakeShell::new(vec![
        (format!("du -k \"{}\"", new_iso.display()), vec!["300"]),
        (format!("du -k \"{}\"", existing_iso.display()), vec!["120"]),
    ]);

    let pending = inventory::pending_iso(&shell, &new_iso, Some(mount.path())).unwrap();
    assert_eq!(pending.required_kb, 300 - 120);
}

#[test]
fn required_space_is_full_size_without_existing_file() {
    let source = tempfile::tempdir().unwrap();
    let mount = tempfile::tempdir().unwrap();

    let new_iso = source.path().join("beta.iso");
    std::fs::write(&new_iso, b"x").unwrap();

    let shell = FakeShell::new(vec![(
        format!("du -k \"{}\"", new_iso.display()),
        vec!["300"],
    )]);

    let pending = inventory::pending_iso(&shell, &new_iso, Some(mount.path())).unwrap();
    assert_eq!(pending.required_kb, 300);
}

#[test]
fn directory_source_aggregates_every_iso() {
    let source = tempfile::tempdir().unwrap();
    let mount = tempfile::tempdir().unwrap();

    let alpha = source.path().join("alpha.iso");
    let beta = source.path().join("beta.iso");
    let existing = mount.path().join("alpha.iso");
    std::fs::write(&alpha, b"x").unwrap();
    std::fs::write(&beta, b"x").unwrap();
    std::fs::write(&existing, b"x").unwrap();
    // non-ISO files are ignored
    std::fs::write(source.path().join("notes.txt"), b"x").unwrap();

    let shell = FakeShell::new(vec![
        (format!("du -k \"{}\"", alpha.display()), vec!["300"]),
        (format!("du -k \"{}\"", beta.display()), vec!["200"]),
        (format!("du -k \"{}\"", existing.display()), vec!["120"]),
    ]);

    let pending = inventory::pending_iso(&shell, source.path(), Some(mount.path())).unwrap();
    assert_eq!(pending.path, source.path());
    assert_eq!(pending.required_kb, (300 - 120) + 200);
}

#[test]
fn directory_needing_no_space_is_cleared() {
    let source = tempfile::tempdir().unwrap();
    let mount = tempfile::tempdir().unwrap();

    let alpha = source.path().join("alpha.iso");
    let existing = mount.path().join("alpha.iso");
    std::fs::write(&alpha, b"x").unwrap();
    std::fs::write(&existing, b"x").unwrap();

    // the copy on the device is bigger than the replacement
    let shell = FakeShell::new(vec![
        (format!("du -k \"{}\"", alpha.display()), vec!["100"]),
        (format!("du -k \"{}\"", existing.display()), vec!["400"]),
    ]);

    assert!(inventory::pending_iso(&shell, source.path(), Some(mount.path())).is_none());
}

#[test]
fn missing_iso_path_yields_no_pending_operation() {
    let shell = FakeShell::new(Vec::new());
    let missing = PathBuf::from("/nonexistent/solydx.iso");
    assert!(inventory::pending_iso(&shell, &missing, None).is_none());
}

#[test]
fn package_version_takes_trailing_token() {
    let shell = FakeShell::new(vec![(
        "apt-cache policy usb-creator".to_string(),
        vec!["  Installed: 1.5.2"],
    )]);
    assert_eq!(inventory::package_version(&shell, "usb-creator"), "1.5.2");
}

#[test]
fn uninstalled_package_has_empty_version() {
    let shell = FakeShell::new(vec![(
        "apt-cache policy usb-creator".to_string(),
        vec!["  Installed: (none)"],
    )]);
    assert_eq!(inventory::package_version(&shell, "usb-creator"), "");

    let silent = FakeShell::new(Vec::new());
    assert_eq!(inventory::package_version(&silent, "usb-creator"), "");
}

#[test]
fn listed_isos_carry_logo_keys_and_sorted_names() {
    let mount = tempfile::tempdir().unwrap();
    let solydx = mount.path().join("solydx_64.iso");
    let debian = mount.path().join("debian-12.iso");
    std::fs::write(&solydx, b"x").unwrap();
    std::fs::write(&debian, b"x").unwrap();
    std::fs::write(mount.path().join("README"), b"x").unwrap();

    let shell = FakeShell::new(vec![
        (format!("du -k \"{}\"", solydx.display()), vec!["2048"]),
        (format!("du -k \"{}\"", debian.display()), vec!["1024"]),
    ]);

    let isos = inventory::list_isos(&shell, mount.path());
    assert_eq!(isos.len(), 2);
    assert_eq!(isos[0].name, "debian-12.iso");
    assert_eq!(isos[0].logo, "debian");
    assert_eq!(isos[0].size_display(), "1 MB");
    assert_eq!(isos[1].name, "solydx_64.iso");
    assert_eq!(isos[1].logo, "solydx");
    assert_eq!(isos[1].size_kb, 2048);
}
