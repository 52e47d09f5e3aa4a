//! Entity Console - terminal client for the entity API
//!
//! Lists and creates entities through the REST backend, and hosts the
//! points scroll demo that keeps its active row centered.

mod api;
mod app;
mod changes;
mod config;
mod models;
mod scroll;
mod scroller;
mod theme;
mod ui;
mod validate;

use std::io::{self, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;

use api::{ApiClient, ApiCommand, ApiMessage};
use app::App;
use config::Cli;
use validate::SystemClock;

/// Frame rate for redraws (approximately 30 FPS)
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// How often the connection indicator is re-checked
const CONNECTION_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install().ok();

    let cli = Cli::parse();
    config::init_logging(cli.log_file.as_ref())?;
    run_tui(&cli).await
}

/// Run the TUI application
async fn run_tui(cli: &Cli) -> Result<()> {
    // Build the client before touching the terminal so errors print normally
    let api_client = ApiClient::new(cli.api_url.as_str(), cli.timeout())?;
    tracing::info!(
        api_url = %api_client.base_url(),
        points = cli.points,
        "starting entity console"
    );

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    // Create communication channels
    let (api_tx, mut api_rx) = mpsc::channel::<ApiMessage>(32);
    let (cmd_tx, cmd_rx) = mpsc::channel::<ApiCommand>(32);

    let api_task = tokio::spawn(api::run_api_worker(api_client, api_tx, cmd_rx));

    // Send initial refresh command
    cmd_tx.send(ApiCommand::RefreshEntities).await.ok();

    let mut app = App::new(cli.points, Box::new(SystemClock));

    // Main event loop
    let result = run_event_loop(&mut terminal, &mut app, &mut api_rx, &cmd_tx).await;

    // Cleanup
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    api_task.abort();
    tracing::info!("entity console stopped");

    result
}

/// Run the main event loop
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    api_rx: &mut mpsc::Receiver<ApiMessage>,
    cmd_tx: &mpsc::Sender<ApiCommand>,
) -> Result<()> {
    let mut last_check = Instant::now();

    loop {
        // Layout of the scroll view depends on the terminal size
        let size = terminal.size()?;
        app.tick(size.width, size.height);

        terminal.draw(|frame| ui::render(frame, app))?;

        // Check for API messages (non-blocking)
        while let Ok(msg) = api_rx.try_recv() {
            let created = matches!(msg, ApiMessage::Created(_));

            app.handle_api_message(msg);

            // The list is re-read after a create
            if created {
                cmd_tx.send(ApiCommand::RefreshEntities).await.ok();
            }
        }

        if last_check.elapsed() >= CONNECTION_CHECK_INTERVAL {
            cmd_tx.send(ApiCommand::CheckConnection).await.ok();
            last_check = Instant::now();
        }

        // Handle input events with timeout for redraws
        if event::poll(FRAME_DURATION)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    if let Some(cmd) = app.handle_key(key) {
                        cmd_tx.send(cmd).await.ok();
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
