//! fcover - index revisioned NetCDF rasters and extract zones by date
//!
//! This is the command-line entry point.

use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info};

use fcover::config::Command;
use fcover::interactive::InteractiveSession;
use fcover::{init_tracing, log_error, plot_title, Archive, Config, PngPresenter, Presenter, Result};

fn main() -> ExitCode {
    // Load configuration before tracing so the level is known
    let (config, command) = match Config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log_level);
    info!("Starting fcover v{}", env!("CARGO_PKG_VERSION"));

    match run(&config, command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_recoverable() => {
            // Missing date or zone: a plain answer, not a crash
            eprintln!("{}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            log_error(&e, "fcover");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, command: Command) -> Result<()> {
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let archive = Archive::open(config)?;
    info!("{}", archive);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Dates => {
            for date in archive.list_dates() {
                writeln!(out, "{}", date)?;
            }
        }
        Command::Zones => {
            for zone in archive.list_zone_names() {
                writeln!(out, "{}", zone)?;
            }
        }
        Command::Extract { date, zone, json } => {
            let grid = archive.extract_values(&date, &zone)?;
            if json {
                serde_json::to_writer(&mut out, &grid.to_json())?;
                writeln!(out)?;
            } else {
                let summary = grid.summary();
                writeln!(out, "{}", plot_title(&zone, archive.variable(), &date))?;
                writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
            }
        }
        Command::Plot { date, zone, .. } => {
            let grid = archive.extract_values(&date, &zone)?;
            let mut presenter = PngPresenter::from_config(&config.render)?;
            presenter.render(&grid, &plot_title(&zone, archive.variable(), &date))?;
            if let Some(path) = presenter.last_written() {
                writeln!(out, "{}", path.display())?;
            }
        }
        Command::Interactive { .. } => {
            let presenter = PngPresenter::from_config(&config.render)?;
            let mut session = InteractiveSession::new(&archive, presenter);
            session.run(io::stdin().lock(), out)?;
        }
    }

    Ok(())
}
