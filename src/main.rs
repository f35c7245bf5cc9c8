use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    fs::{self, File},
    io,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::{sync::mpsc, time};
use tracing_subscriber::EnvFilter;

mod app_state;
mod client;
mod config;
mod runner;
mod thumbnail;
mod ui;

use app_state::{Controller, events::InputEvent};
use client::{BackendClient, VideoBackend};
use config::Config;
use runner::EffectRunner;
use ui::{App, handle_input};

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config)?;
    tracing::info!(api_url = %config.api_url, timeout_ms = config.timeout_ms, "Starting vidgrab");

    let backend: Arc<dyn VideoBackend> = Arc::new(BackendClient::new(&config)?);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run(&mut terminal, &config, backend).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Exited with error");
    }
    result
}

fn init_logging(config: &Config) -> Result<()> {
    let path = config.log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vidgrab=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(terminal: &mut Tui, config: &Config, backend: Arc<dyn VideoBackend>) -> Result<()> {
    let mut controller = Controller::new(config.thumbnails);
    let mut app = App::new(config.api_url.clone());

    // Create communication channels
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<InputEvent>();
    let (app_tx, mut app_rx) = mpsc::unbounded_channel();

    let mut runner = EffectRunner::new(backend, app_tx, config.download_dir.clone());
    runner.spawn_health_check();

    // Terminal reads block, so they get their own thread
    let input_task = tokio::task::spawn_blocking(move || {
        let tick_rate = Duration::from_millis(250);

        while !input_tx.is_closed() {
            match event::poll(tick_rate) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Polling terminal events failed");
                    break;
                }
            }

            let input = match event::read() {
                Ok(Event::Key(key)) => InputEvent::Key(key),
                Ok(Event::Resize(w, h)) => InputEvent::Resize(w, h),
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Reading terminal event failed");
                    break;
                }
            };
            if input_tx.send(input).is_err() {
                break;
            }
        }
    });

    // Main event loop
    let mut last_render = Instant::now();
    let render_rate = Duration::from_millis(50);
    terminal.draw(|f| app.render(f, controller.state()))?;

    let result = loop {
        tokio::select! {
            // Handle input events
            input_event = input_rx.recv() => {
                let Some(event) = input_event else {
                    break Ok(());
                };
                let effects = handle_input(event, &mut controller);
                runner.run_all(effects);
            }

            // Handle results of background requests
            app_event = app_rx.recv() => {
                if let Some(event) = app_event {
                    let effects = controller.handle(event);
                    runner.run_all(effects);
                }
            }

            _ = time::sleep_until(time::Instant::from_std(last_render + render_rate)) => {
                terminal.draw(|f| app.render(f, controller.state()))?;
                last_render = Instant::now();
            }
        }

        if controller.state().should_quit {
            break Ok(());
        }
    };

    // Cleanup
    runner.cancel_all();
    drop(input_rx);
    if let Err(e) = input_task.await {
        tracing::warn!(error = %e, "Input thread did not shut down cleanly");
    }

    result
}
