//! Interactive terminal interface.
//!
//! One screen: device selector, ISO path field, format/repair toggles,
//! the ISOs already on the device, a progress bar and a status line.
//! Messages and confirmations are modal — they swallow all input until
//! dismissed.

mod app;
mod input;
mod ui;

use std::io::{self, stdout};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::{
    event, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::config::AppConfig;
use crate::core::Session;
use crate::shell::Shell;

use app::TuiApp;

pub fn run(config: Arc<AppConfig>, shell: Arc<dyn Shell>) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = TuiApp::new(Session::new(config, shell));
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    // release every known device on the way out, mid-write or not
    app.session.unmount_all();

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut TuiApp,
) -> Result<()> {
    app.init();

    // worker liveness and log polling share the UI tick
    let tick = app.session.poll_interval();
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            let event = event::read()?;
            if let Some(action) = input::handle_event(&event, app.mode()) {
                app.handle_action(action);
            }
        }

        if last_tick.elapsed() >= tick {
            app.tick();
            last_tick = Instant::now();
        }

        if !app.running {
            break;
        }
    }

    Ok(())
}
