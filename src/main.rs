use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use usbmate::config::AppConfig;
use usbmate::core::inventory;
use usbmate::core::session::{Session, WriteOutcome};
use usbmate::shell::{self, Shell};
use usbmate::{logging, tui};

#[derive(Parser)]
#[command(name = "usbmate")]
#[command(about = "Write ISO images to USB devices via usb-creator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Answer device queries from canned data instead of udisks
    #[arg(long, global = true)]
    simulation: Option<bool>,

    #[arg(long, global = true)]
    verbose: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal interface (the default)
    Tui,
    /// List eligible removable devices
    List,
    /// List ISO files on a device
    Isos(DeviceArgs),
    /// Write an ISO to a device without the interface
    Write(WriteArgs),
    /// Unmount and detach a device
    Unmount(DeviceArgs),
}

#[derive(Args)]
struct DeviceArgs {
    /// Device node, e.g. /dev/sdb
    device: String,
}

#[derive(Args)]
struct WriteArgs {
    /// Device node, e.g. /dev/sdb
    device: String,

    /// ISO file, or a directory of ISOs, to copy
    #[arg(long)]
    iso: Option<String>,

    /// Partition and format the device first
    #[arg(long)]
    format: bool,

    /// Repair an unbootable device
    #[arg(long)]
    repair: bool,
}

#[derive(Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    simulation: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    verbose: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = CliOverrides {
        simulation: cli.simulation,
        verbose: cli.verbose,
    };
    let config = Arc::new(AppConfig::new(Some(&overrides))?);

    let command = cli.command.unwrap_or(Commands::Tui);

    // the TUI owns the screen; console logging is for headless runs
    if !matches!(command, Commands::Tui) {
        logging::init(logging::LogConfig {
            verbose: config.verbose,
            ..Default::default()
        });
    }

    let shell = shell::get_shell(config.simulation)?;

    match command {
        Commands::Tui => tui::run(config, shell).context("Terminal interface failed")?,
        Commands::List => run_list(shell),
        Commands::Isos(args) => run_isos(shell, &args.device),
        Commands::Write(args) => run_write(config, shell, args).await?,
        Commands::Unmount(args) => run_unmount(shell, &args.device)?,
    }

    Ok(())
}

fn run_list(shell: Arc<dyn Shell>) {
    let devices = inventory::list_devices(shell.as_ref());
    if devices.is_empty() {
        println!("No removable devices found.");
        return;
    }
    for path in devices {
        let device = inventory::describe_device(shell.as_ref(), &path);
        let mounted = match &device.mount_point {
            Some(mount) => format!("  mounted at {}", mount.display()),
            None => String::new(),
        };
        println!(
            "{}  {} MB  {} MB free{}",
            device.path,
            device.size_kb / 1024,
            device.available_kb / 1024,
            mounted
        );
    }
}

fn run_isos(shell: Arc<dyn Shell>, device: &str) {
    let snapshot = inventory::describe_device(shell.as_ref(), device);
    let Some(mount) = &snapshot.mount_point else {
        println!("{device} has no mounted partition.");
        return;
    };
    let isos = inventory::list_isos(shell.as_ref(), mount);
    if isos.is_empty() {
        println!("No ISOs on {}.", mount.display());
        return;
    }
    for iso in isos {
        println!("{:<40}  {:>9}  {}", iso.name, iso.size_display(), iso.logo);
    }
}

async fn run_write(config: Arc<AppConfig>, shell: Arc<dyn Shell>, args: WriteArgs) -> Result<()> {
    let mut session = Session::new(config, shell);
    session.refresh_devices();
    if !session.devices.contains(&args.device) {
        bail!("{} is not an eligible removable device", args.device);
    }
    session.select_device(&args.device);

    if let Some(iso) = &args.iso {
        session.set_iso_text(iso.clone());
    }
    session.set_format(args.format);
    session.set_repair(args.repair);

    session.execute()?;

    let interval = session.poll_interval();
    let mut last_status = String::new();
    while session.busy() {
        tokio::time::sleep(interval).await;
        session.poll();
        if session.status != last_status && !session.status.is_empty() {
            println!("{}", session.status);
            last_status = session.status.clone();
        }
    }

    match session.take_outcome() {
        Some(WriteOutcome::Failed(err)) => Err(err.into()),
        Some(WriteOutcome::Success) | None => {
            println!("The USB was successfully written.");
            Ok(())
        }
    }
}

fn run_unmount(shell: Arc<dyn Shell>, device: &str) -> Result<()> {
    inventory::unmount_device(shell.as_ref(), device);
    if inventory::list_devices(shell.as_ref()).contains(&device.to_string()) {
        bail!("Could not unmount the device. Please unmount the device manually.");
    }
    println!("You can now safely remove the device.");
    Ok(())
}
