//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes. Activity tracking is separate: every qualifying
//! event reaches the session manager before it gets here.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_email_char, can_add_password_char, App, AppState, LoginFocus};
use crate::session::LogoutReason;

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::LoggingIn => handle_login_input(app, key).await,
        AppState::ShowingNotice => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                app.acknowledge_notice();
            }
            Ok(false)
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Profile;
                }
                _ => {}
            }
            Ok(false)
        }
        AppState::Profile => handle_profile_input(app, key).await,
        AppState::Reloading | AppState::Quitting => Ok(false),
    }
}

async fn handle_profile_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('l') | KeyCode::Char('L') => {
            app.logout(LogoutReason::UserInitiated).await;
        }
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.refresh_profile_background();
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        _ => {}
    }
    Ok(false)
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Email,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Email => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Email,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => {
                app.login_focus = LoginFocus::Password;
            }
            LoginFocus::Password | LoginFocus::Button => {
                // Failure leaves login_error set and the form on screen
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::ApiClient;
    use crate::auth::claims::testutil::make_token;
    use crate::auth::token_store::testutil::MemoryTokenStore;
    use crate::config::Config;
    use crate::session::clock::testutil::TestClock;
    use crate::session::logout::testutil::CountingNotifier;
    use crossterm::event::KeyModifiers;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(store: Arc<MemoryTokenStore>) -> App {
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        App::with_services(
            Config::default(),
            api,
            store,
            Arc::new(CountingNotifier::default()),
            Arc::new(TestClock::new()),
        )
    }

    fn signed_in_store() -> Arc<MemoryTokenStore> {
        let token = make_token(json!({
            "sub": "a@b.com",
            "auth": "ROLE_USER",
            "exp": chrono::Utc::now().timestamp() + 600,
        }));
        Arc::new(MemoryTokenStore::with_token(&token))
    }

    #[tokio::test]
    async fn test_login_focus_cycles() {
        let mut app = app(Arc::new(MemoryTokenStore::default()));
        app.login_focus = LoginFocus::Email;

        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Password);
        handle_input(&mut app, key(KeyCode::Down)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Button);
        handle_input(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Email);
        handle_input(&mut app, key(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.login_focus, LoginFocus::Button);
    }

    #[tokio::test]
    async fn test_login_typing_and_backspace() {
        let mut app = app(Arc::new(MemoryTokenStore::default()));
        app.login_email.clear();
        app.login_focus = LoginFocus::Email;

        for c in "a@b".chars() {
            handle_input(&mut app, key(KeyCode::Char(c))).await.unwrap();
        }
        handle_input(&mut app, key(KeyCode::Char(' '))).await.unwrap();
        assert_eq!(app.login_email, "a@b");
        handle_input(&mut app, key(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.login_email, "a@");
    }

    #[tokio::test]
    async fn test_empty_login_reports_error() {
        let mut app = app(Arc::new(MemoryTokenStore::default()));
        app.login_email.clear();
        app.login_password.clear();
        app.login_focus = LoginFocus::Button;

        let quit = handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(!quit);
        assert_eq!(app.state, AppState::LoggingIn);
        assert_eq!(app.login_error.as_deref(), Some("Email and password required"));
    }

    #[tokio::test]
    async fn test_esc_on_login_quits() {
        let mut app = app(Arc::new(MemoryTokenStore::default()));
        assert!(handle_input(&mut app, key(KeyCode::Esc)).await.unwrap());
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_sign_out_key_then_acknowledge() {
        let store = signed_in_store();
        let mut app = app(store.clone());
        assert_eq!(app.state, AppState::Profile);

        handle_input(&mut app, key(KeyCode::Char('l'))).await.unwrap();
        assert_eq!(app.state, AppState::ShowingNotice);
        assert_eq!(store.current(), None);

        // Pressing sign out again while the notice is up does nothing
        handle_input(&mut app, key(KeyCode::Char('l'))).await.unwrap();
        assert_eq!(store.removals(), 1);

        handle_input(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.state, AppState::Reloading);
    }

    #[tokio::test]
    async fn test_quit_confirmation() {
        let mut app = app(signed_in_store());

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert_eq!(app.state, AppState::ConfirmingQuit);
        handle_input(&mut app, key(KeyCode::Char('n'))).await.unwrap();
        assert_eq!(app.state, AppState::Profile);

        handle_input(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(handle_input(&mut app, key(KeyCode::Char('y'))).await.unwrap());
        assert_eq!(app.state, AppState::Quitting);
    }
}
