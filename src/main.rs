use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tracing::{error, info, warn};

mod actions;
mod catalogue;
mod elevation;
mod error;
mod events;
mod logging;
mod orchestrator;
mod session;
mod theme;
mod ui;

use catalogue::Catalogue;
use error::Result;
use logging::LogTarget;
use orchestrator::{Orchestrator, RunHandle};
use session::{Command, Session};
use theme::Theme;

const ELEVATION_WAIT: Duration = Duration::from_secs(3);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(
    name = "turbo-optimizer",
    version,
    about = "Pick maintenance actions, run them in parallel, watch them finish"
)]
struct Cli {
    /// Replace every maintenance action with a harmless simulated one.
    #[arg(long)]
    dry_run: bool,

    /// TOML file overriding the colour palette.
    #[arg(long, value_name = "PATH")]
    theme: Option<PathBuf>,

    /// Log file path, or `-` to disable logging.
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    log_level: String,

    /// Start immediately after the privilege warning instead of pausing.
    #[arg(long)]
    skip_elevation_wait: bool,
}

/// The run currently owned by the event loop, and whether a result wait is armed.
#[derive(Default)]
struct RunSlot {
    handle: Option<RunHandle>,
    awaiting_result: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_target = LogTarget::from_arg(cli.log_file.as_deref());
    if let Err(err) = logging::init(&log_target, &cli.log_level) {
        eprintln!("logging disabled: {err}");
    }

    if !elevation::is_elevated() {
        println!("{}", elevation::ELEVATION_WARNING);
        warn!("running without administrative rights");
        if !cli.skip_elevation_wait {
            println!("Waiting {} seconds...", ELEVATION_WAIT.as_secs());
            thread::sleep(ELEVATION_WAIT);
        }
    }

    let catalogue = if cli.dry_run {
        Catalogue::simulated()
    } else {
        Catalogue::standard()
    };
    let theme = cli
        .theme
        .as_deref()
        .map(Theme::load_or_default)
        .unwrap_or_default();
    info!(
        dry_run = cli.dry_run,
        tasks = catalogue.len(),
        "starting session"
    );

    match run_tui(&catalogue, &theme) {
        Ok(()) => {
            println!("\n  Optimization finished.\n");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "ui runtime failed");
            eprintln!("fatal: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_tui(catalogue: &Catalogue, theme: &Theme) -> Result<()> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    let result = run_app(&mut terminal, catalogue, theme);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    catalogue: &Catalogue,
    theme: &Theme,
) -> Result<()> {
    let orchestrator = Orchestrator::default();
    let mut session = Session::new(catalogue.all());
    let mut run = RunSlot::default();

    while !session.should_quit() {
        terminal.draw(|frame| ui::render(frame, &session, theme))?;

        // One result per loop turn, so every applied result gets its own frame.
        if pump_result(&mut session, &mut run) {
            continue;
        }

        let event = events::next_event()?;
        let command = session.handle_event(event);
        apply_command(command, catalogue, &orchestrator, &mut run)?;
    }

    if let Some(handle) = run.handle.take() {
        shutdown_run(&handle);
    }
    Ok(())
}

/// Consumes at most one delivered result if a wait is armed. Returns whether
/// the session changed.
fn pump_result(session: &mut Session, run: &mut RunSlot) -> bool {
    if !run.awaiting_result {
        return false;
    }
    let Some(outcome) = run.handle.as_ref().and_then(RunHandle::try_next) else {
        return false;
    };
    run.awaiting_result = false;
    if session.apply_result(outcome) == Command::AwaitResult {
        run.awaiting_result = true;
    }
    true
}

fn apply_command(
    command: Command,
    catalogue: &Catalogue,
    orchestrator: &Orchestrator,
    run: &mut RunSlot,
) -> Result<()> {
    match command {
        Command::None | Command::Quit => {}
        Command::StartRun(task_ids) => {
            let jobs = catalogue.jobs_for(&task_ids)?;
            run.handle = Some(orchestrator.start(jobs));
            run.awaiting_result = true;
        }
        Command::AwaitResult => run.awaiting_result = true,
    }
    Ok(())
}

fn shutdown_run(handle: &RunHandle) {
    if handle.is_exhausted() {
        return;
    }
    let abandoned = handle.shutdown(SHUTDOWN_GRACE);
    if abandoned > 0 {
        warn!(
            abandoned,
            launched = handle.launched(),
            "quit with tasks still running; their results are lost"
        );
    } else {
        info!("in-flight tasks settled before exit");
    }
}
