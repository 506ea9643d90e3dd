//! Application state management for ADaide.
//!
//! This module contains the core `App` struct that owns the configuration,
//! the token store, the API client and, while the profile view is on screen,
//! the session manager that enforces the inactivity budget.
//!
//! An `App` corresponds to one application load: the authentication gate runs
//! once in [`App::with_services`], and a logout ends with the whole `App` being
//! rebuilt rather than patched back into a signed-out shape.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::event::Event;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{is_unauthorized, ApiClient, Profile};
use crate::auth::{decode_claims, gate, open_token_store, AuthState, TokenStore};
use crate::config::Config;
use crate::session::{
    system_clock, LogoutCoordinator, LogoutNotifier, LogoutReason, SessionEvent,
    SessionManager, SharedClock,
};
use crate::ui::layout::AuthStatus;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email input (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Environment variables that pre-fill the login form
const EMAIL_ENV: &str = "ADAIDE_EMAIL";
const PASSWORD_ENV: &str = "ADAIDE_PASSWORD";

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Result of a background profile fetch, sent back to the UI loop.
enum ProfileResult {
    Loaded(Profile),
    /// The backend rejected the token
    Unauthorized,
    /// Any other failure, already phrased for the status bar
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    LoggingIn,
    Profile,
    ConfirmingQuit,
    /// Blocking acknowledgement after a logout
    ShowingNotice,
    /// Notice acknowledged; the main loop rebuilds the app
    Reloading,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

/// Main application state container
pub struct App {
    // Core services
    pub config: Config,
    pub api: ApiClient,
    store: Arc<dyn TokenStore>,
    coordinator: LogoutCoordinator,
    clock: SharedClock,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
    profile_rx: mpsc::Receiver<ProfileResult>,
    profile_tx: mpsc::Sender<ProfileResult>,

    // Authentication
    pub auth: AuthState,
    /// Present only while the authenticated view is mounted
    pub session: Option<SessionManager>,
    pub profile: Option<Profile>,

    // UI State
    pub state: AppState,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Logout acknowledgement text
    pub notice: Option<String>,

    // Status message
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance. The profile is fetched in the
    /// background so the first frame is drawn right away.
    pub fn new() -> Result<Self> {
        debug!("App::new() starting");
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let store = open_token_store(&config)?;
        let api = ApiClient::new(config.api_url())?;
        debug!(api_url = api.base_url(), "API client configured");
        let notifier: Arc<dyn LogoutNotifier> = Arc::new(api.clone());

        let mut app = Self::with_services(config, api, store, notifier, system_clock());
        if app.auth.is_logged_in() {
            app.refresh_profile_background();
        }
        Ok(app)
    }

    /// Assemble an app from its services and run the authentication gate.
    pub fn with_services(
        config: Config,
        api: ApiClient,
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn LogoutNotifier>,
        clock: SharedClock,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (profile_tx, profile_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let coordinator = LogoutCoordinator::new(store.clone(), notifier, tx);

        let auth = gate::evaluate(store.as_ref(), Utc::now());
        debug!(logged_in = auth.is_logged_in(), "Authentication gate evaluated");

        let login_email = std::env::var(EMAIL_ENV)
            .ok()
            .or_else(|| config.last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var(PASSWORD_ENV).unwrap_or_default();

        let mut app = Self {
            config,
            api,
            store,
            coordinator,
            clock,
            session_rx: rx,
            profile_rx,
            profile_tx,

            auth,
            session: None,
            profile: None,

            state: AppState::LoggingIn,

            login_email,
            login_password,
            login_focus: LoginFocus::Email,
            login_error: None,

            notice: None,
            status_message: None,
        };

        if app.auth.is_logged_in() {
            app.mount_session();
        } else {
            app.start_login();
        }
        app
    }

    // =========================================================================
    // Authenticated view lifecycle
    // =========================================================================

    fn mount_session(&mut self) {
        self.unmount_session();
        let mut session = SessionManager::new(
            self.config.inactivity_budget(),
            self.clock.clone(),
            self.coordinator.clone(),
        );
        session.start();
        self.session = Some(session);
        self.state = AppState::Profile;
        debug!("Authenticated view mounted");
    }

    fn unmount_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
            debug!("Authenticated view unmounted");
        }
    }

    /// Forward a terminal event to the activity monitor, if one is mounted.
    pub fn on_terminal_event(&self, event: &Event) {
        if let Some(ref session) = self.session {
            session.on_event(event);
        }
    }

    /// Time until forced logout, while the authenticated view is mounted.
    pub fn session_remaining(&self) -> Option<Duration> {
        self.session.as_ref().map(SessionManager::remaining)
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    /// Start the login process (show login form)
    pub fn start_login(&mut self) {
        self.state = AppState::LoggingIn;
        self.login_focus = if self.login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();

        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        let token = match self.api.login(&email, &password).await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "Login failed");
                self.login_error = Some(login_error_message(&e));
                return Err(e);
            }
        };

        if let Err(e) = self.accept_token(&token) {
            error!(error = %e, "Login token rejected");
            self.login_error = Some(format!("Login failed: {}", e));
            return Err(e);
        }

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.login_password.clear();
        info!("Login successful");
        self.refresh_profile_background();
        Ok(())
    }

    /// Store a freshly issued token and mount the authenticated view.
    fn accept_token(&mut self, token: &str) -> Result<()> {
        let claims = decode_claims(token).context("Server issued an unreadable token")?;
        if claims.is_expired_at(Utc::now()) {
            anyhow::bail!("Server issued an already expired token");
        }
        self.store.save(token).context("Failed to store session token")?;
        self.auth = AuthState::LoggedIn(claims.identity());
        self.mount_session();
        Ok(())
    }

    /// Sign out. Safe to call while an expiry logout is already running.
    pub async fn logout(&mut self, reason: LogoutReason) {
        if !self.coordinator.logout(reason).await {
            debug!(?reason, "Logout request ignored");
        }
        self.check_session_events();
    }

    /// Drain session events raised by the countdown or a logout call.
    pub fn check_session_events(&mut self) {
        while let Ok(event) = self.session_rx.try_recv() {
            match event {
                SessionEvent::LoggedOut { reason, .. } => {
                    info!(?reason, "Session ended");
                    self.unmount_session();
                    self.auth = AuthState::LoggedOut;
                    self.profile = None;
                    self.notice = Some(event.message().to_string());
                    self.state = AppState::ShowingNotice;
                }
            }
        }
    }

    /// The user read the logout notice; reload into the signed-out app.
    pub fn acknowledge_notice(&mut self) {
        self.notice = None;
        self.state = AppState::Reloading;
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Spawn a background fetch of the signed-in user's profile.
    pub fn refresh_profile_background(&mut self) {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.status_message = Some("Not signed in".to_string());
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read token");
                self.status_message = Some("Not signed in".to_string());
                return;
            }
        };

        let api = self.api.clone();
        let tx = self.profile_tx.clone();
        tokio::spawn(async move {
            Self::execute_profile_fetch(api, token, tx).await;
        });

        self.status_message = Some("Loading profile...".to_string());
    }

    async fn execute_profile_fetch(
        api: ApiClient,
        token: String,
        tx: mpsc::Sender<ProfileResult>,
    ) {
        let result = match api.fetch_profile(&token).await {
            Ok(profile) => ProfileResult::Loaded(profile),
            Err(e) if is_unauthorized(&e) => ProfileResult::Unauthorized,
            Err(e) => {
                error!(error = %e, "Profile fetch failed");
                ProfileResult::Failed(status_error_message(&e))
            }
        };
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send profile result - channel closed");
        }
    }

    /// Check for completed background tasks and process results
    pub async fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.profile_rx.try_recv() {
            results.push(result);
        }

        for result in results {
            self.process_profile_result(result).await;
        }
    }

    /// A rejected token ends the session. Results arriving after a logout
    /// are dropped.
    async fn process_profile_result(&mut self, result: ProfileResult) {
        if !self.is_logged_in() {
            debug!("Ignoring profile result after logout");
            return;
        }
        match result {
            ProfileResult::Loaded(profile) => {
                debug!(?profile, "Profile loaded");
                self.profile = Some(profile);
                self.status_message = None;
            }
            ProfileResult::Unauthorized => {
                warn!("Profile request rejected, ending session");
                self.status_message = None;
                self.logout(LogoutReason::Unauthorized).await;
            }
            ProfileResult::Failed(message) => {
                self.status_message = Some(message);
            }
        }
    }
}

impl AuthStatus for App {
    fn is_logged_in(&self) -> bool {
        self.auth.is_logged_in() && !self.coordinator.has_logged_out()
    }

    fn signed_in_as(&self) -> Option<&str> {
        self.auth.identity().map(|i| i.email.as_str())
    }
}

/// User-facing text for a failed login
fn login_error_message(e: &anyhow::Error) -> String {
    if is_unauthorized(e) {
        return "Invalid email or password".to_string();
    }
    let text = e.to_string().to_lowercase();
    if text.contains("network") || text.contains("connect") {
        "Unable to connect to server. Check your connection.".to_string()
    } else if text.contains("timeout") || text.contains("timed out") {
        "Connection timed out. Please try again.".to_string()
    } else {
        format!("Login failed: {}", e)
    }
}

fn status_error_message(e: &anyhow::Error) -> String {
    let text = format!("{:#}", e).to_lowercase();
    if text.contains("rate limit") {
        "Server is busy. Please wait a moment and try again.".to_string()
    } else if text.contains("network") || text.contains("connect") {
        "Network error. Check your connection.".to_string()
    } else {
        format!("Error: {}", e)
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
