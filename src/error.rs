//! Exit-code taxonomy for the external usb-creator tool.
//!
//! The tool's process exit code is the only success/failure signal it
//! gives us. Codes 0, 1 and 255 form the success band; 2 through 10 map
//! to specific failure categories; everything else falls back to
//! [`ToolError::Unknown`].

use thiserror::Error;

/// Failure categories reported by usb-creator, keyed by exit code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Wrong arguments were passed to usb-creator.")]
    BadArguments,
    #[error("The device was not found or no device was given.")]
    DeviceNotFound,
    #[error("Given ISO path was not found.")]
    IsoNotFound,
    #[error("Device is in use by another application.")]
    DeviceBusy,
    #[error("Unable to mount the device.")]
    MountFailed,
    #[error("Md5sum mismatch.")]
    ChecksumMismatch,
    #[error("The device has no fat32 partition.")]
    MissingFat32,
    #[error("The device has no bootloader installed.")]
    MissingBootloader,
    #[error("There is not enough space available on the device.")]
    InsufficientSpace,
    #[error("An unknown error occurred (exit code {0}).")]
    Unknown(i32),
}

/// Map a usb-creator exit code onto the documented taxonomy.
pub fn write_outcome(code: i32) -> Result<(), ToolError> {
    match code {
        0 | 1 | 255 => Ok(()),
        2 => Err(ToolError::BadArguments),
        3 => Err(ToolError::DeviceNotFound),
        4 => Err(ToolError::IsoNotFound),
        5 => Err(ToolError::DeviceBusy),
        6 => Err(ToolError::MountFailed),
        7 => Err(ToolError::ChecksumMismatch),
        8 => Err(ToolError::MissingFat32),
        9 => Err(ToolError::MissingBootloader),
        10 => Err(ToolError::InsufficientSpace),
        other => Err(ToolError::Unknown(other)),
    }
}
