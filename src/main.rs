use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use hs_mon::config::{DEFAULT_LOG_FILE, Settings};
use hs_mon::crash::{self, DEFAULT_CRASH_LOG};
use hs_mon::reader::{open_port, spawn_reader, ReaderLink, TelemetryReader};
use hs_mon::{discovery, Dashboard, ReadMode, Revision, Schedule};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::fs::File;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// Exit status when no board is connected.
const EXIT_NOT_FOUND: u8 = 2;

// Set while the dashboard owns the terminal.
static TERMINAL_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Hall sensor board monitor
#[derive(Parser)]
#[command(name = "monitor_cli")]
#[command(version)]
#[command(about = "Shows live telemetry from a hall sensor driver board")]
struct Cli {
    /// Board firmware revision (1, 2 or 3)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    revision: u8,

    /// Port description to look for (defaults to the revision's adapter)
    #[arg(short, long)]
    marker: Option<String>,

    /// List serial ports with their descriptions and exit
    #[arg(long)]
    list_ports: bool,

    /// Print records to stdout instead of drawing the dashboard
    #[arg(long)]
    headless: bool,

    /// File that receives the report if the monitor crashes
    #[arg(long, default_value = DEFAULT_CRASH_LOG)]
    crash_log: PathBuf,

    /// Log file used while the dashboard is on screen
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        let revision = Revision::try_from(self.revision).unwrap_or_default();
        let settings = Settings::new(revision)
            .with_crash_log(self.crash_log.clone())
            .with_log_file(self.log_file.clone())
            .headless(self.headless);
        match &self.marker {
            Some(marker) => settings.with_marker(marker),
            None => settings,
        }
    }
}

// The main entry point for the monitor.
fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = cli.settings();

    crash::install(settings.crash_log.clone(), release_terminal);

    match run(&cli, &settings) {
        Ok(code) => code,
        Err(err) => {
            release_terminal();
            match crash::report(&settings.crash_log, &err) {
                Ok(()) => eprintln!(
                    "[FATAL] {:#}. Details written to {}",
                    err,
                    settings.crash_log.display()
                ),
                Err(e) => eprintln!("[FATAL] {:#}. Could not write crash log: {}", err, e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &Settings) -> Result<ExitCode> {
    if cli.list_ports {
        print_ports()?;
        return Ok(ExitCode::SUCCESS);
    }

    init_logging(settings, cli.verbose)?;
    log::info!("Starting monitor for {}", settings.revision);

    let found = discovery::find_port(&settings.port_marker)
        .context("Could not enumerate serial ports")?;
    let port = match found {
        Some(port) => port,
        None => {
            eprintln!("[ERROR] No device found matching '{}'.", settings.port_marker);
            log::error!("No device found matching '{}'", settings.port_marker);
            return Ok(ExitCode::from(EXIT_NOT_FOUND));
        }
    };

    let connection = open_port(&port)?;
    let link = spawn_reader(TelemetryReader::new(connection, settings.revision))
        .context("Could not start the reader thread")?;
    let dashboard = Dashboard::new(settings.revision);

    if settings.headless {
        run_headless(settings, link, dashboard)?;
    } else {
        run_dashboard(settings, link, dashboard)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(settings: &Settings, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(level);
    let mut builder = env_logger::Builder::from_env(env);

    // The dashboard owns the terminal, so logs go to a file instead.
    if !settings.headless {
        let file = File::create(&settings.log_file).with_context(|| {
            format!("Failed to create log file: {}", settings.log_file.display())
        })?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("Logger already initialized")?;
    Ok(())
}

fn print_ports() -> Result<()> {
    let ports = discovery::list_ports().context("Could not enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    println!("Available serial ports:");
    for port in ports {
        println!("  {}: {}", port.name, port.description);
    }
    Ok(())
}

fn request_interval(settings: &Settings) -> Option<Duration> {
    match settings.revision.read_mode() {
        ReadMode::Poll => Some(settings.request_interval),
        ReadMode::Push => None,
    }
}

// How the presentation loop ended.
enum Outcome {
    Quit,
    ReaderStopped,
}

// Hands the reader's exit status to the caller once its thread is gone.
fn finish(link: ReaderLink, outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Quit => {
            log::info!("Closed by user");
            Ok(())
        }
        Outcome::ReaderStopped => {
            let stats = link.join()?;
            log::info!("Connection closed after {} records", stats.records);
            Ok(())
        }
    }
}

// Runs the request/hand-off loop until the reader stops or `tick` asks to quit.
// `tick` gets the dashboard, whether a refresh is due and how long it may wait.
fn drive<F>(
    settings: &Settings,
    link: ReaderLink,
    dashboard: &mut Dashboard,
    mut tick: F,
) -> Result<()>
where
    F: FnMut(&Dashboard, bool, Duration) -> Result<bool>,
{
    let mut schedule = Schedule::new(
        request_interval(settings),
        settings.refresh_interval,
        Instant::now(),
    );

    let outcome = loop {
        let due = schedule.poll(Instant::now());
        if due.request {
            link.request();
        }

        match link.try_take() {
            Ok(Some(record)) => dashboard.update(record),
            Ok(None) => {}
            Err(_) => break Outcome::ReaderStopped,
        }

        if tick(&*dashboard, due.refresh, schedule.until_next(Instant::now()))? {
            break Outcome::Quit;
        }
    };

    finish(link, outcome)
}

fn run_dashboard(settings: &Settings, link: ReaderLink, mut dashboard: Dashboard) -> Result<()> {
    let mut terminal = claim_terminal()?;

    let result = drive(settings, link, &mut dashboard, |dashboard, refresh, wait| {
        if refresh {
            terminal.draw(|frame| dashboard.render(frame))?;
        }
        quit_requested(wait)
    });

    release_terminal();
    result
}

// Waits up to `wait` for a key press; true for q, Esc or Ctrl+C.
fn quit_requested(wait: Duration) -> Result<bool> {
    if !event::poll(wait)? {
        return Ok(false);
    }
    let Event::Key(key) = event::read()? else {
        return Ok(false);
    };
    let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
    Ok(key.kind == KeyEventKind::Press
        && (matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) || ctrl_c))
}

fn run_headless(settings: &Settings, link: ReaderLink, mut dashboard: Dashboard) -> Result<()> {
    let mut shown = 0;

    println!("Monitoring {}. Press Ctrl+C to exit.", settings.revision);
    drive(settings, link, &mut dashboard, |dashboard, refresh, wait| {
        if refresh && dashboard.updates() != shown {
            shown = dashboard.updates();
            if let Some(line) = dashboard.describe() {
                println!("{}", line);
            }
        }
        std::thread::sleep(wait);
        Ok(false)
    })
}

fn claim_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    TERMINAL_ACTIVE.store(true, Ordering::SeqCst);
    execute!(io::stdout(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    Ok(terminal)
}

// Safe to call more than once; only the first call after claiming does work.
fn release_terminal() {
    if TERMINAL_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}
