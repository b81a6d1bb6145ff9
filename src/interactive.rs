//! Interactive date/zone selection.
//!
//! A line-oriented request/response loop: the user selects a date and a zone
//! among the archive's lists, and every change of selection re-runs the
//! extraction and the render.

use std::io::{BufRead, Write};

use crate::archive::Archive;
use crate::error::Result;
use crate::logging::log_error;
use crate::render::{plot_title, Presenter};
use crate::zones::ZoneResolver;

const HELP: &str = "\
Commands:
  dates              list the available dates
  zones              list the zone names
  date <dd-mm-yyyy>  select a date (or #n for the n-th listed date)
  zone <name>        select a zone (or #n for the n-th listed zone)
  show               render the current selection again
  help               show this message
  quit               leave";

/// One parsed input line
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Dates,
    Zones,
    Date(String),
    Zone(String),
    Show,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Request {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match (word, rest.is_empty()) {
            ("", _) => Request::Empty,
            ("dates", true) => Request::Dates,
            ("zones", true) => Request::Zones,
            ("date", false) => Request::Date(rest.to_string()),
            ("zone", false) => Request::Zone(rest.to_string()),
            ("show", true) => Request::Show,
            ("help", true) | ("?", true) => Request::Help,
            ("quit", true) | ("exit", true) => Request::Quit,
            _ => Request::Unknown(line.to_string()),
        }
    }
}

/// Resolve `#n` (1-based) against a list, anything else is taken verbatim
fn pick(choice: &str, options: &[String]) -> Option<String> {
    match choice.strip_prefix('#') {
        Some(n) => n
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| options.get(i).cloned()),
        None => Some(choice.to_string()),
    }
}

/// Selection state driving an archive and a presenter
pub struct InteractiveSession<'a, R, P> {
    archive: &'a Archive<R>,
    presenter: P,
    dates: Vec<String>,
    zones: Vec<String>,
    date: Option<String>,
    zone: Option<String>,
}

impl<'a, R: ZoneResolver, P: Presenter> InteractiveSession<'a, R, P> {
    /// Start with the first date and the first zone selected
    pub fn new(archive: &'a Archive<R>, presenter: P) -> Self {
        let dates = archive.list_dates();
        let zones = archive.list_zone_names();
        Self {
            archive,
            presenter,
            date: dates.first().cloned(),
            zone: zones.first().cloned(),
            dates,
            zones,
        }
    }

    pub fn selection(&self) -> (Option<&str>, Option<&str>) {
        (self.date.as_deref(), self.zone.as_deref())
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Serve requests until `quit` or end of input
    pub fn run<I: BufRead, O: Write>(&mut self, input: I, mut output: O) -> Result<()> {
        writeln!(output, "{}", self.archive)?;
        self.refresh(&mut output)?;

        for line in input.lines() {
            if !self.handle(Request::parse(&line?), &mut output)? {
                break;
            }
        }
        Ok(())
    }

    /// Apply one request. Returns `false` when the session should end.
    pub fn handle<O: Write>(&mut self, request: Request, output: &mut O) -> Result<bool> {
        match request {
            Request::Dates => {
                for (i, date) in self.dates.iter().enumerate() {
                    writeln!(output, "#{:<4} {}", i + 1, date)?;
                }
            }
            Request::Zones => {
                for (i, zone) in self.zones.iter().enumerate() {
                    writeln!(output, "#{:<4} {}", i + 1, zone)?;
                }
            }
            Request::Date(choice) => match pick(&choice, &self.dates) {
                Some(date) if self.dates.contains(&date) => {
                    if self.date.as_ref() != Some(&date) {
                        self.date = Some(date);
                        self.refresh(output)?;
                    }
                }
                _ => writeln!(output, "No raster file for date {}", choice)?,
            },
            Request::Zone(choice) => match pick(&choice, &self.zones) {
                Some(zone) if self.zones.contains(&zone) => {
                    if self.zone.as_ref() != Some(&zone) {
                        self.zone = Some(zone);
                        self.refresh(output)?;
                    }
                }
                _ => writeln!(output, "Unknown zone: {}", choice)?,
            },
            Request::Show => self.refresh(output)?,
            Request::Help => writeln!(output, "{}", HELP)?,
            Request::Quit => return Ok(false),
            Request::Empty => {}
            Request::Unknown(line) => {
                writeln!(output, "Unrecognized command: {} (try help)", line)?
            }
        }
        Ok(true)
    }

    /// Extract and render the current selection, reporting per-call failures
    fn refresh<O: Write>(&mut self, output: &mut O) -> Result<()> {
        let (Some(date), Some(zone)) = (self.date.clone(), self.zone.clone()) else {
            writeln!(output, "Nothing to show: the archive has no date or no zone")?;
            return Ok(());
        };

        let title = plot_title(&zone, self.archive.variable(), &date);
        let outcome = self
            .archive
            .extract_values(&date, &zone)
            .and_then(|grid| {
                self.presenter.render(&grid, &title)?;
                Ok(grid.summary())
            });

        match outcome {
            Ok(summary) => writeln!(
                output,
                "{}: {}x{} cells, {} valid",
                title, summary.rows, summary.cols, summary.valid_cells
            )?,
            Err(e) => {
                log_error(&e, "interactive refresh");
                writeln!(output, "{}: {}", title, e)?;
            }
        }
        Ok(())
    }
}
