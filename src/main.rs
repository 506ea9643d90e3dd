//! ADaide TUI - a terminal client for ADaide accounts.
//!
//! Signs in against the ADaide backend, shows the signed-in profile and
//! signs the user out automatically after a period of inactivity.

mod api;
mod app;
mod auth;
mod config;
mod session;
mod ui;
mod utils;

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api::ApiClient;
use app::{App, AppState};
use auth::{gate, open_token_store, AuthState, TokenStore};
use config::Config;
use session::{LogoutCoordinator, LogoutNotifier, LogoutReason};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// How a single run of the TUI ended
enum Exit {
    Quit,
    Reload,
}

fn env_filter() -> EnvFilter {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Log to stderr. Used by the one-shot CLI commands.
fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false).compact())
        .with(env_filter())
        .init();
}

/// Log to a daily rolling file, since stderr belongs to the terminal UI.
/// The returned guard flushes buffered lines when dropped.
fn init_tui_tracing(config: &Config) -> Result<WorkerGuard> {
    let log_dir = config.log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "adaide.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(env_filter())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;
    Ok(guard)
}

fn load_config() -> Config {
    match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Check for CLI commands
    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("--status") => {
            init_cli_tracing();
            return print_status();
        }
        Some("--login") => {
            init_cli_tracing();
            return login_prompt().await;
        }
        Some("--logout") => {
            init_cli_tracing();
            return logout_now().await;
        }
        Some("--help") | Some("-h") => {
            print_usage();
            return Ok(());
        }
        Some(other) => {
            eprintln!("Unknown option: {}", other);
            print_usage();
            std::process::exit(2);
        }
        None => {}
    }

    let config = load_config();
    let _log_guard = match init_tui_tracing(&config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Logging disabled: {:#}", e);
            None
        }
    };
    info!("ADaide TUI starting");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Each iteration is one application load; a logout ends it with a reload
    let result = loop {
        let mut app = match App::new() {
            Ok(app) => app,
            Err(e) => break Err(e),
        };
        match run_app(&mut terminal, &mut app).await {
            Ok(Exit::Reload) => {
                info!("Reloading after logout");
                continue;
            }
            Ok(Exit::Quit) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
    }

    info!("ADaide TUI shutting down");
    Ok(())
}

fn print_usage() {
    eprintln!("Usage: adaide [--status | --login | --logout]");
    eprintln!();
    eprintln!("  (no option)  Start the terminal UI");
    eprintln!("  --status     Show who is signed in");
    eprintln!("  --login      Sign in from the command line");
    eprintln!("  --logout     Sign out and end the server session");
}

/// Run the authentication gate once and report the outcome.
fn print_status() -> Result<()> {
    let config = load_config();
    let store = open_token_store(&config)?;

    match gate::evaluate(store.as_ref(), Utc::now()) {
        AuthState::LoggedIn(identity) => {
            println!("Signed in as {}", identity.email);
            println!("Roles: {}", utils::format_roles(&identity.roles));
        }
        AuthState::LoggedOut => println!("Not signed in"),
    }
    Ok(())
}

/// Prompt for credentials on the terminal and store the issued token.
async fn login_prompt() -> Result<()> {
    let mut config = load_config();
    let store = open_token_store(&config)?;
    let api = ApiClient::new(config.api_url())?;

    let default_email = config.last_email.clone().unwrap_or_default();
    if default_email.is_empty() {
        print!("Email: ");
    } else {
        print!("Email [{}]: ", default_email);
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let email = match line.trim() {
        "" => default_email,
        typed => typed.to_string(),
    };
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }

    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }

    let token = api.login(&email, &password).await?;
    let claims = auth::decode_claims(&token).context("Server issued an unreadable token")?;
    if claims.is_expired_at(Utc::now()) {
        anyhow::bail!("Server issued an already expired token");
    }
    store.save(&token).context("Failed to store session token")?;

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Signed in as {}", claims.identity().email);
    Ok(())
}

/// Sign out through the same coordinator the TUI uses.
async fn logout_now() -> Result<()> {
    let config = load_config();
    let store = open_token_store(&config)?;
    let api = ApiClient::new(config.api_url())?;

    match end_stored_session(store, Arc::new(api)).await {
        Some(message) => println!("{}", message),
        None => println!("Not signed in."),
    }
    Ok(())
}

/// Run the coordinator unless the slot is known to be empty. An unreadable
/// slot holds a corrupt token and is cleared like any other. Returns the
/// logout message, or `None` when nobody was signed in.
async fn end_stored_session(
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn LogoutNotifier>,
) -> Option<&'static str> {
    match store.load() {
        Ok(None) => return None,
        Ok(Some(_)) => {}
        Err(e) => warn!(error = %e, "Stored token unreadable, clearing it"),
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let coordinator = LogoutCoordinator::new(store, notifier, tx);
    coordinator.logout(LogoutReason::UserInitiated).await;

    rx.try_recv().ok().map(|event| event.message())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<Exit> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so the countdown stays live
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            let ev = event::read()?;
            app.on_terminal_event(&ev);

            if let Event::Key(key) = ev {
                if key.kind == KeyEventKind::Press {
                    // Ctrl+C to quit
                    if key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(Exit::Quit);
                    }

                    // Handle input
                    if handle_input(app, key).await? {
                        return Ok(Exit::Quit);
                    }
                }
            }
        }

        // Check for completed background tasks
        app.check_background_tasks().await;

        // Pick up a logout raised by the countdown
        app.check_session_events();

        match app.state {
            AppState::Reloading => return Ok(Exit::Reload),
            AppState::Quitting => return Ok(Exit::Quit),
            _ => {}
        }
    }
}
