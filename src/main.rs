use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod columns;
mod controller;
mod domain;
mod format;
mod grid;
mod model;
mod pin;
mod record;
mod sort;
mod source;
mod store;
mod ui;

use controller::Controller;
use domain::{DEFAULT_URL, DataSource, GridConfig, GridError};
use model::{Model, Status};
use ui::TableUI;

/// Sortable, pinnable data grid for JSON records and tabular files.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File to show instead of fetching (json, csv, parquet, arrow)
    path: Option<String>,

    /// Same as the positional path
    #[arg(long, conflicts_with = "path")]
    file: Option<String>,

    /// Endpoint returning a JSON array of flat records
    #[arg(long, default_value = DEFAULT_URL)]
    url: String,

    /// Only show the built-in sample rows
    #[arg(long, conflicts_with_all = ["path", "file"])]
    offline: bool,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Upper bound for a rendered column width
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Log destination, RUST_LOG controls the level
    #[arg(long)]
    log_file: Option<String>,
}

fn expand_path(path: &str) -> Result<PathBuf, GridError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.into_owned()))
        .map_err(|e| GridError::LoadingFailed(format!("Cannot expand \"{path}\": {e}")))
}

impl Args {
    fn to_config(&self) -> Result<GridConfig, GridError> {
        let source = if self.offline {
            DataSource::Offline
        } else if let Some(path) = self.path.as_ref().or(self.file.as_ref()) {
            DataSource::File(expand_path(path)?)
        } else {
            DataSource::Url(self.url.clone())
        };
        Ok(GridConfig::default()
            .source(source)
            .event_poll_time(self.poll_ms)
            .max_column_width(self.max_column_width.max(1)))
    }

    fn log_path(&self) -> Result<PathBuf, GridError> {
        match &self.log_file {
            Some(path) => expand_path(path),
            None => Ok(std::env::temp_dir().join("tg.log")),
        }
    }
}

fn init_logging(path: &Path) -> Result<(), GridError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init();
    if let Err(e) = installed {
        eprintln!("Logging disabled: {e}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), GridError> {
    let cfg = args.to_config()?;
    init_logging(&args.log_path()?)?;
    info!("Starting tg with {:?}", cfg);

    let mut terminal = ratatui::init();
    let result = execute!(stdout(), EnableMouseCapture)
        .map_err(GridError::from)
        .and_then(|_| event_loop(&mut terminal, &cfg));
    let restored = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
    result?;
    restored?;
    Ok(())
}

fn event_loop(terminal: &mut DefaultTerminal, cfg: &GridConfig) -> Result<(), GridError> {
    let size = terminal.size()?;
    let mut model = Model::init(cfg, size.width as usize, size.height as usize)?;
    let mut ui = TableUI::new();
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        model.poll_loader();

        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event()?;
        model.update(message)?;
    }

    Ok(())
}
