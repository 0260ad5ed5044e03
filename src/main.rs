//! bnreg - Business Name Registration
//!
//! Runs the registration wizard in the terminal, or answers one-off
//! questions about an application from the command line.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use bnreg::application::{App, FieldStore, RESUME_MARKER_KEY, STATE_KEY, WizardController};
use bnreg::config::AppConfig;
use bnreg::error::AppError;
use bnreg::infrastructure::{
    FileStorage, HttpRegistrationApi, RegistrationApi, SessionStorage, SystemClipboard,
};
use bnreg::presentation::{InputHandler, render_ui};
use bnreg::telemetry;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
};
use tracing::info;

const INPUT_POLL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "bnreg", about = "Register a business name from the terminal", version)]
struct Cli {
    /// Directory holding the saved session and the log file
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    /// Override the registration backend base URL
    #[arg(long, global = true)]
    api_base: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the registration wizard (default command)
    Run,
    /// Look up the status of a submitted application
    Status {
        /// Application or transaction reference
        reference: String,
    },
    /// Discard the saved session
    Reset,
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(dir) = cli.state_dir {
        config.storage.state_dir = dir;
    }
    if let Some(base) = cli.api_base.as_deref() {
        config.set_base_url(base)?;
    }
    telemetry::init(&config.telemetry, &config.log_file())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_wizard(&config),
        Command::Status { reference } => print_status(&config, &reference),
        Command::Reset => reset_session(&config),
    }
}

fn run_wizard(config: &AppConfig) -> Result<(), AppError> {
    let api = HttpRegistrationApi::new(&config.api.base_url, config.api.timeout)?;
    let store = FieldStore::open(Box::new(FileStorage::new(&config.storage.state_dir)));
    let mut wizard = WizardController::new(
        store,
        Box::new(api),
        Box::new(SystemClipboard::new()),
        config.wizard_settings(),
    );
    wizard.start();
    info!(
        step = wizard.state().current_step.number(),
        base_url = %config.api.base_url,
        "wizard started"
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(wizard);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("wizard closed");
    res.map_err(AppError::from)
}

/// Main application event loop.
///
/// Draws, runs any queued network action, then waits briefly for a key so
/// the payment poll keeps ticking while the user is idle.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        if app.run_pending() {
            continue;
        }

        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    InputHandler::handle_key_event(app, key.code, key.modifiers);
                }
            }
        }
        if app.should_quit {
            return Ok(());
        }

        app.tick(Instant::now());
    }
}

fn print_status(config: &AppConfig, reference: &str) -> Result<(), AppError> {
    let api = HttpRegistrationApi::new(&config.api.base_url, config.api.timeout)?;
    let status = api.application_status(reference)?;

    println!("Reference:        {}", reference.trim());
    println!("Status:           {}", status.status);
    if !status.transaction_ref.is_empty() {
        println!("Transaction ref:  {}", status.transaction_ref);
    }
    if let Some(entity) = &status.entity {
        println!("RC number:        {}", entity.rc_number);
        println!("Entity name:      {}", entity.entity_name);
        println!("Entity type:      {}", entity.entity_type);
        println!("Registered:       {}", entity.registration_date);
        println!("TIN:              {}", entity.tin);
    }
    if !status.message.is_empty() {
        println!("{}", status.message);
    }
    Ok(())
}

fn reset_session(config: &AppConfig) -> Result<(), AppError> {
    let mut storage = FileStorage::new(&config.storage.state_dir);
    for key in [STATE_KEY, RESUME_MARKER_KEY] {
        storage.remove(key)?;
    }
    info!(dir = %config.storage.state_dir.display(), "session discarded");
    println!("Saved session cleared.");
    Ok(())
}
