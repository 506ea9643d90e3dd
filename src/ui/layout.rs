//! Header and footer shared by every screen.
//!
//! Screens differ only in what the header offers: a signed-in user sees who
//! they are and how to sign out, everyone else sees how to sign in.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::utils::truncate_string;

use super::styles;

/// Authentication capability the shared layout renders from.
pub trait AuthStatus {
    fn is_logged_in(&self) -> bool;
    fn signed_in_as(&self) -> Option<&str>;
}

/// Longest email shown in the header before truncation
const MAX_HEADER_EMAIL: usize = 32;

/// Split the screen into header, body and footer areas.
pub fn frame_areas(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Body
            Constraint::Length(2), // Footer
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Right-hand header text for the given auth state.
pub fn header_actions(auth: &dyn AuthStatus) -> String {
    if auth.is_logged_in() {
        match auth.signed_in_as() {
            Some(email) => format!(
                "{}  [l] Sign out",
                truncate_string(email, MAX_HEADER_EMAIL)
            ),
            None => "[l] Sign out".to_string(),
        }
    } else {
        "Sign in".to_string()
    }
}

pub fn render_header(frame: &mut Frame, area: Rect, auth: &dyn AuthStatus) {
    let title = "  ADaide";
    let actions = header_actions(auth);
    let padding = (area.width as usize).saturating_sub(title.len() + actions.len() + 4);

    let line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(actions, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(line).block(block), area);
}

pub fn render_footer(frame: &mut Frame, area: Rect, status: Option<&str>, shortcuts: &str) {
    let left_text = match status {
        Some(msg) => format!(" {} ", msg),
        None => format!(" © ADaide v{} ", env!("CARGO_PKG_VERSION")),
    };
    let right_text = format!(" {} ", shortcuts);
    let padding_len = (area.width as usize)
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}
