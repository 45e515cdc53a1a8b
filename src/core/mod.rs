pub mod inventory;
pub mod logfile;
pub mod progress;
pub mod session;
pub mod worker;

pub use inventory::{DeviceSnapshot, IsoEntry, PendingIso};
pub use progress::{ProgressMonitor, ProgressState, ProgressUpdate};
pub use session::{ExecuteError, Session, UnmountReport, WriteOutcome};
pub use worker::{CommandWorker, WorkerReply};
