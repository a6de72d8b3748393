//! RunScope: synchronized three-pane backtest results viewer.

use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use runscope_core::api::{BacktestApi, DemoApi, HttpApi};
use runscope_core::config::{ApiSource, ViewerConfig};
use runscope_tui::app::{AppSettings, AppState};
use runscope_tui::worker::{self, WorkerCommand};
use runscope_tui::{input, ui};

#[derive(Parser, Debug)]
#[command(name = "runscope", version, about = "Synchronized three-pane backtest results viewer")]
struct Args {
    /// Config file [default: <config dir>/runscope/config.toml]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Results API base URL (overrides config and RUNSCOPE_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Use the built-in demo source instead of the HTTP API
    #[arg(long)]
    demo: bool,

    /// Log filter, e.g. "runscope_core=debug"
    #[arg(long)]
    log: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let log_path = init_logging(&config)?;

    // Panics inside the chart fault boundary are caught and must not tear
    // down the terminal, so the hook only logs. Crashes are handled below.
    panic::set_hook(Box::new(|info| {
        error!(panic = %info, "panic");
    }));

    let api: Arc<dyn BacktestApi> = match config.api.source {
        ApiSource::Http => Arc::new(
            HttpApi::new(&config.api.base_url, config.api.timeout())
                .context("cannot build results API client")?,
        ),
        ApiSource::Demo => Arc::new(DemoApi::new(config.api.demo_seed)),
    };
    info!(source = api.name(), base_url = %config.api.base_url, "starting");

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (resp_tx, resp_rx) = mpsc::channel();
    let worker_handle = worker::spawn_worker(Arc::clone(&api), cmd_rx, resp_tx)
        .context("failed to spawn worker thread")?;

    let settings = AppSettings {
        source_name: match config.api.source {
            ApiSource::Http => config.api.base_url.clone(),
            ApiSource::Demo => api.name().to_string(),
        },
        policy: config.trade_reason_policy(),
        formatter: config.formatter(),
    };
    let mut app = AppState::new(settings, cmd_tx.clone(), resp_rx);
    app.request_runs();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_app(&mut terminal, &mut app)));

    let _ = cmd_tx.send(WorkerCommand::Shutdown);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match outcome {
        Ok(result) => {
            let _ = worker_handle.join();
            info!("exit");
            result
        }
        Err(payload) => {
            eprintln!("runscope crashed; details in {}", log_path.display());
            panic::resume_unwind(payload)
        }
    }
}

fn load_config(args: &Args) -> Result<ViewerConfig> {
    let path = args.config.clone().or_else(ViewerConfig::default_path);
    let mut config = match &path {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    config.apply_env();

    if let Some(url) = &args.base_url {
        config.api.base_url = url.clone();
    }
    if args.demo {
        config.api.source = ApiSource::Demo;
    }
    if let Some(filter) = &args.log {
        config.logging.filter = filter.clone();
    }
    Ok(config)
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(config: &ViewerConfig) -> Result<PathBuf> {
    let path = config.log_file();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(path)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<()> {
    loop {
        // 1. Size the chart surfaces, then render
        let size = terminal.size()?;
        let (width, height) = ui::pane_size(Rect::new(0, 0, size.width, size.height));
        app.resize_charts(width, height);
        terminal.draw(|f| ui::draw(f, app))?;

        // 2. Drain worker responses (non-blocking)
        while let Ok(resp) = app.worker_rx.try_recv() {
            app.handle_worker_response(resp);
        }

        // 3. Poll for input events (50ms timeout for ~20 FPS tick)
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                input::handle_key(app, key);
            }
        }

        // 4. Check quit
        if !app.running {
            break;
        }
    }
    Ok(())
}
