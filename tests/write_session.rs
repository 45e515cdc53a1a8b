//! Session-level tests: validation, the single-in-flight guard, exit
//! code mapping and the full write/delete/unmount flows against the
//! simulated shell.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use usbmate::config::AppConfig;
use usbmate::core::inventory::{DeviceSnapshot, PendingIso};
use usbmate::core::session::{ExecuteError, Session, UnmountReport, WriteOutcome};
use usbmate::error::ToolError;
use usbmate::shell::{QueryError, Shell, SimulatedShell};

/// Shell whose write command takes a while and exits with a fixed code.
struct StubShell {
    exit_code: i32,
    delay: Duration,
}

impl Shell for StubShell {
    fn run(&self, _command: &str) -> Result<i32, QueryError> {
        std::thread::sleep(self.delay);
        Ok(self.exit_code)
    }

    fn capture_checked(&self, _command: &str) -> Result<Vec<String>, QueryError> {
        Ok(Vec::new())
    }
}

fn test_config(dir: &std::path::Path) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        log_file: Some(dir.join("usbmate-test.log")),
        poll_interval_ms: 10,
        ..AppConfig::default()
    })
}

fn null_device() -> DeviceSnapshot {
    // /dev/null exists everywhere, which is all execute() checks
    DeviceSnapshot {
        path: "/dev/null".to_string(),
        size_kb: 8_000_000,
        detachable: true,
        has_partition: true,
        mount_point: None,
        available_kb: 4_000_000,
    }
}

async fn drain(session: &mut Session) {
    for _ in 0..500 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.poll();
        if !session.busy() {
            return;
        }
    }
    panic!("worker never finished");
}

#[tokio::test]
async fn second_execute_is_rejected_while_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(StubShell {
        exit_code: 0,
        delay: Duration::from_millis(300),
    });
    let mut session = Session::new(test_config(dir.path()), shell);
    session.current = Some(null_device());

    assert_eq!(session.execute(), Ok(()));
    assert!(session.busy());
    assert_eq!(session.execute(), Err(ExecuteError::Busy));

    // polling before completion must not re-enable anything
    session.poll();
    assert!(session.busy());

    drain(&mut session).await;
    assert_eq!(session.take_outcome(), Some(WriteOutcome::Success));
}

#[tokio::test]
async fn exit_code_4_maps_to_iso_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(StubShell {
        exit_code: 4,
        delay: Duration::ZERO,
    });
    let mut session = Session::new(test_config(dir.path()), shell);
    session.current = Some(null_device());

    session.execute().unwrap();
    drain(&mut session).await;

    assert_eq!(
        session.take_outcome(),
        Some(WriteOutcome::Failed(ToolError::IsoNotFound))
    );
}

#[tokio::test]
async fn exit_code_255_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(StubShell {
        exit_code: 255,
        delay: Duration::ZERO,
    });
    let mut session = Session::new(test_config(dir.path()), shell);
    session.current = Some(null_device());

    session.execute().unwrap();
    drain(&mut session).await;

    assert_eq!(session.take_outcome(), Some(WriteOutcome::Success));
}

#[tokio::test]
async fn mismatched_iso_path_aborts_before_the_tool_runs() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(StubShell {
        exit_code: 0,
        delay: Duration::ZERO,
    });
    let mut session = Session::new(test_config(dir.path()), shell);
    session.current = Some(null_device());
    session.iso_text = "/nonexistent/solydx.iso".to_string();

    assert_eq!(
        session.execute(),
        Err(ExecuteError::IsoMismatch {
            entered: "/nonexistent/solydx.iso".to_string()
        })
    );
    assert!(!session.busy());
}

#[tokio::test]
async fn insufficient_space_aborts_unless_formatting() {
    let dir = tempfile::tempdir().unwrap();
    let iso = dir.path().join("solydx.iso");
    std::fs::write(&iso, b"x").unwrap();

    let shell = Arc::new(StubShell {
        exit_code: 0,
        delay: Duration::ZERO,
    });
    let mut session = Session::new(test_config(dir.path()), shell);

    let mut device = null_device();
    device.size_kb = 1_000_000;
    device.available_kb = 100;
    session.current = Some(device);
    session.iso_text = iso.display().to_string();
    session.pending = Some(PendingIso {
        path: PathBuf::from(&iso),
        required_kb: 500,
    });

    assert_eq!(session.execute(), Err(ExecuteError::InsufficientSpace));

    // formatting frees the whole raw size
    session.toggle_format();
    assert_eq!(session.available_kb(), 1_000_000);
    session.execute().unwrap();
    drain(&mut session).await;
    assert_eq!(session.take_outcome(), Some(WriteOutcome::Success));
}

#[tokio::test]
async fn simulated_write_flow_builds_the_documented_command_line() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(SimulatedShell::with_defaults(dir.path()).unwrap());
    let mut session = Session::new(test_config(dir.path()), shell.clone());

    session.refresh_devices();
    // only the detachable, partitioned stick survives the filter
    assert_eq!(session.devices.len(), 1);
    let device = session.devices[0].clone();
    assert!(device.ends_with("sdy"));

    let current = session.current.clone().unwrap();
    assert_eq!(current.size_kb, 8 * 1024 * 1024);
    assert!(current.has_partition);
    assert_eq!(current.mount_point.as_deref(), Some(shell.mount_root().as_path()));

    // sample ISO from the mounted filesystem is inventoried
    assert_eq!(session.isos.len(), 1);
    assert_eq!(session.isos[0].name, "solydx_64.iso");
    assert_eq!(session.isos[0].logo, "solydx");

    // same-named replacement only needs the size difference
    let source = dir.path().join("source");
    std::fs::create_dir_all(&source).unwrap();
    let new_iso = source.join("solydx_64.iso");
    std::fs::write(&new_iso, vec![0u8; 10 * 1024]).unwrap();
    session.set_iso_text(new_iso.display().to_string());
    assert_eq!(session.required_kb(), 10 - 4);

    session.toggle_repair();
    session.execute().unwrap();
    drain(&mut session).await;
    assert_eq!(session.take_outcome(), Some(WriteOutcome::Success));

    let commands = shell.recorded_commands();
    let write_command = commands
        .iter()
        .find(|c| c.starts_with("usb-creator"))
        .expect("write command recorded");
    assert_eq!(
        *write_command,
        format!("usb-creator -d {device} -r -b -g -i \"{}\" -m", new_iso.display())
    );
}

#[tokio::test]
async fn deleting_selected_isos_rescans_the_device() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(SimulatedShell::with_defaults(dir.path()).unwrap());
    let mut session = Session::new(test_config(dir.path()), shell.clone());

    session.refresh_devices();
    assert_eq!(session.isos.len(), 1);
    let on_device = shell.mount_root().join("solydx_64.iso");
    assert!(on_device.exists());

    session.toggle_iso(0);
    assert_eq!(session.delete_selected_isos(), 1);
    assert!(!on_device.exists());
    assert!(session.isos.is_empty());
}

#[tokio::test]
async fn unmount_report_follows_device_presence() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(SimulatedShell::with_defaults(dir.path()).unwrap());
    let mut session = Session::new(test_config(dir.path()), shell);

    session.refresh_devices();
    assert!(session.current.is_some());

    // unmount succeeds, detach removes the device, a fresh enumeration
    // no longer lists it
    assert_eq!(session.unmount_current(), UnmountReport::Detached);
    assert!(session.devices.is_empty());
    assert!(session.current.is_none());
}

#[tokio::test]
async fn no_device_means_nothing_to_execute_or_unmount() {
    let dir = tempfile::tempdir().unwrap();
    let shell = Arc::new(StubShell {
        exit_code: 0,
        delay: Duration::ZERO,
    });
    let mut session = Session::new(test_config(dir.path()), shell);

    assert_eq!(session.execute(), Err(ExecuteError::NoDevice));
    assert_eq!(session.unmount_current(), UnmountReport::NoDevice);
}
