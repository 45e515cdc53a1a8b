//! Background execution of the write command.
//!
//! The worker takes an ordered list of command lines (in practice a
//! single usb-creator invocation), runs them sequentially on a blocking
//! thread and pushes one reply per command into a bounded channel. The
//! owner either polls the handle from its UI tick or awaits completion;
//! there is no cancellation — once started, the external command runs to
//! completion.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::shell::Shell;

/// One reply per executed command: the raw exit status, or the captured
/// stdout lines when capture mode was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReply {
    Status(i32),
    Output(Vec<String>),
}

pub struct CommandWorker {
    rx: mpsc::Receiver<WorkerReply>,
    handle: JoinHandle<()>,
}

impl CommandWorker {
    const CHANNEL_CAPACITY: usize = 16;

    pub fn spawn(shell: Arc<dyn Shell>, commands: Vec<String>, capture: bool) -> Self {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        let handle = tokio::task::spawn_blocking(move || {
            for command in commands {
                let reply = if capture {
                    WorkerReply::Output(shell.capture(&command))
                } else {
                    match shell.run(&command) {
                        Ok(code) => WorkerReply::Status(code),
                        Err(err) => {
                            warn!(%command, error = %err, "command failed to start");
                            WorkerReply::Status(-1)
                        }
                    }
                };
                if tx.blocking_send(reply).is_err() {
                    break;
                }
            }
        });
        Self { rx, handle }
    }

    /// Non-blocking drain step for the owner's poll tick.
    pub fn try_recv(&mut self) -> Option<WorkerReply> {
        self.rx.try_recv().ok()
    }

    /// True once the worker thread has run every command. Replies may
    /// still be queued; drain with [`CommandWorker::try_recv`].
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Await completion and collect every remaining reply.
    pub async fn wait(mut self) -> Vec<WorkerReply> {
        let mut replies = Vec::new();
        while let Some(reply) = self.rx.recv().await {
            replies.push(reply);
        }
        if let Err(err) = (&mut self.handle).await {
            warn!(error = %err, "worker task failed");
        }
        replies
    }
}
