mod app;
mod chart;
mod filterprompt;
mod help;
mod jumpto;
mod report;
mod selector;
mod store;
mod theme;
use crate::app::App;
use crate::report::{JsonFileSource, ReportSource};
use crate::store::{FilterStore, JsonFileStore, MemoryStore, YMD_FMT};
use anyhow::Context;
use lexopt::{Arg, Parser, ValueExt};
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::{Path, PathBuf};
use time::{Date, OffsetDateTime};

/// Store key prefix used when `--module` is not given
const DEFAULT_MODULE: &str = "report";

/// Environment variable holding the `env_logger` filter
const LOG_ENV: &str = "RANGEPICK_LOG";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct RunOptions {
    today: Option<Date>,
    module: Option<String>,
    store: Option<PathBuf>,
    report: Option<PathBuf>,
    log: Option<PathBuf>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Command {
    Run(RunOptions),
    Help,
    Version,
}

impl Command {
    fn from_parser(mut parser: Parser) -> Result<Command, lexopt::Error> {
        let mut opts = RunOptions::default();
        while let Some(arg) = parser.next()? {
            match arg {
                Arg::Short('h') | Arg::Long("help") => return Ok(Command::Help),
                Arg::Short('V') | Arg::Long("version") => return Ok(Command::Version),
                Arg::Short('m') | Arg::Long("module") => {
                    opts.module = Some(parser.value()?.string()?);
                }
                Arg::Short('s') | Arg::Long("store") => {
                    opts.store = Some(PathBuf::from(parser.value()?));
                }
                Arg::Short('r') | Arg::Long("report") => {
                    opts.report = Some(PathBuf::from(parser.value()?));
                }
                Arg::Long("log") => opts.log = Some(PathBuf::from(parser.value()?)),
                Arg::Value(value) if opts.today.is_none() => {
                    let value = value.string()?;
                    match Date::parse(&value, &YMD_FMT) {
                        Ok(d) => opts.today = Some(d),
                        Err(e) => {
                            return Err(lexopt::Error::ParsingFailed {
                                value,
                                error: Box::new(e),
                            })
                        }
                    }
                }
                _ => return Err(arg.unexpected()),
            }
        }
        Ok(Command::Run(opts))
    }

    fn run(self) -> anyhow::Result<()> {
        match self {
            Command::Run(opts) => {
                if let Some(path) = &opts.log {
                    init_logging(path)?;
                }
                let today = match opts.today {
                    Some(d) => d,
                    None => OffsetDateTime::now_local()
                        .context("failed to determine local date")?
                        .date(),
                };
                let module = opts.module.unwrap_or_else(|| String::from(DEFAULT_MODULE));
                let source = opts.report.map(|path| -> Box<dyn ReportSource> {
                    Box::new(JsonFileSource::new(path))
                });
                match opts.store {
                    Some(path) => {
                        let store = JsonFileStore::open(&path).with_context(|| {
                            format!("failed to open filter store {}", path.display())
                        })?;
                        log::info!("Saving filters in {}", store.path().display());
                        run_app(today, module, store, source)
                    }
                    None => run_app(today, module, MemoryStore::new(), source),
                }
            }
            Command::Help => {
                println!("Usage: rangepick [OPTIONS] [YYYY-MM-DD]");
                println!();
                println!("Terminal date range picker with persisted report filters and charts");
                println!();
                println!("The optional date is used in place of today's date.");
                println!();
                println!("Options:");
                println!("  -m, --module <NAME>   Prefix for saved filter keys [default: report]");
                println!("  -s, --store <FILE>    Save filters in this JSON file");
                println!("  -r, --report <FILE>   Chart the daily report in this JSON file");
                println!("      --log <FILE>      Write log messages to this file (level from {LOG_ENV})");
                println!("  -h, --help            Display this help message and exit");
                println!("  -V, --version         Show the program version and exit");
                Ok(())
            }
            Command::Version => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    Command::from_parser(Parser::from_env())?.run()
}

fn run_app<S: FilterStore>(
    today: Date,
    module: String,
    store: S,
    source: Option<Box<dyn ReportSource>>,
) -> anyhow::Result<()> {
    log::info!("Starting with today = {today}, module = {module:?}, store = {store:?}");
    let app = App::new(today, module, store, source).context("failed to restore saved filters")?;
    with_terminal(|terminal| {
        terminal.hide_cursor().context("failed to hide cursor")?;
        app.run(terminal)?;
        Ok(())
    })
}

// stderr belongs to the terminal UI, so logs only go to a file
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("failed to initialize logging")
}

fn with_terminal<F, T>(func: F) -> anyhow::Result<T>
where
    F: FnOnce(&mut DefaultTerminal) -> anyhow::Result<T>,
{
    let mut terminal = ratatui::init();
    let r = func(&mut terminal);
    ratatui::restore();
    r
}
