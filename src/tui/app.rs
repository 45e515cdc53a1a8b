//! TUI application state and logic.

use crate::core::session::{Session, UnmountReport, WriteOutcome};

/// Which panel keyboard navigation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Devices,
    IsoTable,
}

/// Blocking overlays. While one is up, every key goes to it.
#[derive(Debug, Clone)]
pub enum Modal {
    Message { title: String, body: String },
    Error { title: String, body: String },
    ConfirmDelete { count: usize },
}

/// Input interpretation mode, derived from app state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Editing,
    Modal,
}

/// Actions that can be triggered by user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    NextPanel,
    Select,
    Refresh,
    Unmount,
    Execute,
    Delete,
    ToggleFormat,
    ToggleRepair,
    EditIso,
    ClearIso,
    // editing mode
    Input(char),
    Backspace,
    CommitEdit,
    CancelEdit,
    // modal mode
    Confirm,
    Dismiss,
}

pub struct TuiApp {
    pub session: Session,
    pub focus: Focus,
    pub device_index: usize,
    pub iso_index: usize,
    pub edit_buffer: String,
    pub editing: bool,
    pub modal: Option<Modal>,
    pub running: bool,
}

impl TuiApp {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            focus: Focus::Devices,
            device_index: 0,
            iso_index: 0,
            edit_buffer: String::new(),
            editing: false,
            modal: None,
            running: true,
        }
    }

    pub fn init(&mut self) {
        self.session.refresh_devices();
        self.sync_indexes();
    }

    pub fn mode(&self) -> Mode {
        if self.modal.is_some() {
            Mode::Modal
        } else if self.editing {
            Mode::Editing
        } else {
            Mode::Normal
        }
    }

    /// One UI tick: drive the session poll and raise the result dialog
    /// when a write finishes.
    pub fn tick(&mut self) {
        self.session.poll();
        if let Some(outcome) = self.session.take_outcome() {
            self.modal = Some(match outcome {
                WriteOutcome::Success => Modal::Message {
                    title: "USB Mate".to_string(),
                    body: "The USB was successfully written.".to_string(),
                },
                WriteOutcome::Failed(err) => Modal::Error {
                    title: "Execute".to_string(),
                    body: err.to_string(),
                },
            });
            self.sync_indexes();
        }
    }

    pub fn handle_action(&mut self, action: Action) {
        match self.mode() {
            Mode::Modal => self.handle_modal_action(action),
            Mode::Editing => self.handle_edit_action(action),
            Mode::Normal => self.handle_normal_action(action),
        }
    }

    fn handle_modal_action(&mut self, action: Action) {
        let confirm_delete = matches!(self.modal, Some(Modal::ConfirmDelete { .. }));
        match action {
            Action::Confirm => {
                self.modal = None;
                if confirm_delete {
                    self.session.delete_selected_isos();
                    self.sync_indexes();
                }
            }
            Action::Dismiss => self.modal = None,
            _ => {}
        }
    }

    fn handle_edit_action(&mut self, action: Action) {
        match action {
            Action::Input(c) => self.edit_buffer.push(c),
            Action::Backspace => {
                self.edit_buffer.pop();
            }
            Action::CommitEdit => {
                self.session.set_iso_text(self.edit_buffer.clone());
                self.editing = false;
            }
            Action::CancelEdit => self.editing = false,
            _ => {}
        }
    }

    fn handle_normal_action(&mut self, action: Action) {
        // while a write is in flight every control except quit is
        // disabled; completion re-enables them
        if self.session.busy() && action != Action::Quit {
            return;
        }

        match action {
            Action::Quit => self.running = false,
            Action::Up => self.navigate(-1),
            Action::Down => self.navigate(1),
            Action::NextPanel => {
                self.focus = match self.focus {
                    Focus::Devices => Focus::IsoTable,
                    Focus::IsoTable => Focus::Devices,
                };
            }
            Action::Select => match self.focus {
                Focus::Devices => self.session.select_index(self.device_index),
                Focus::IsoTable => self.session.toggle_iso(self.iso_index),
            },
            Action::Refresh => {
                self.session.refresh_devices();
                self.sync_indexes();
            }
            Action::Unmount => {
                let report = self.session.unmount_current();
                self.sync_indexes();
                self.modal = Some(Modal::Message {
                    title: "Unmount".to_string(),
                    body: match report {
                        UnmountReport::NoDevice => "No device selected.".to_string(),
                        UnmountReport::Detached => {
                            "You can now safely remove the device.".to_string()
                        }
                        UnmountReport::StillPresent => {
                            "Could not unmount the device.\n\
                             Please unmount the device manually."
                                .to_string()
                        }
                    },
                });
            }
            Action::Execute => {
                if let Err(err) = self.session.execute() {
                    self.modal = Some(Modal::Error {
                        title: "Execute".to_string(),
                        body: err.to_string(),
                    });
                }
            }
            Action::Delete => {
                let count = self.session.selected_iso_count();
                if count > 0 {
                    self.modal = Some(Modal::ConfirmDelete { count });
                }
            }
            Action::ToggleFormat => self.session.toggle_format(),
            Action::ToggleRepair => self.session.toggle_repair(),
            Action::EditIso => {
                self.edit_buffer = self.session.iso_text.clone();
                self.editing = true;
            }
            Action::ClearIso => self.session.clear_iso_text(),
            _ => {}
        }
    }

    fn navigate(&mut self, step: isize) {
        match self.focus {
            Focus::Devices => {
                let len = self.session.devices.len();
                if len == 0 {
                    return;
                }
                let next = move_index(self.device_index, step, len);
                if next != self.device_index {
                    self.device_index = next;
                    self.session.select_index(next);
                    self.iso_index = 0;
                }
            }
            Focus::IsoTable => {
                let len = self.session.isos.len();
                if len == 0 {
                    return;
                }
                self.iso_index = move_index(self.iso_index, step, len);
            }
        }
    }

    /// Keep list cursors valid after the inventory was replaced.
    fn sync_indexes(&mut self) {
        self.device_index = self
            .session
            .current
            .as_ref()
            .and_then(|current| {
                self.session
                    .devices
                    .iter()
                    .position(|path| *path == current.path)
            })
            .unwrap_or(0);
        if self.iso_index >= self.session.isos.len() {
            self.iso_index = 0;
        }
    }
}

fn move_index(current: usize, step: isize, len: usize) -> usize {
    if step < 0 {
        current.saturating_sub(step.unsigned_abs())
    } else {
        (current + step.unsigned_abs()).min(len - 1)
    }
}
