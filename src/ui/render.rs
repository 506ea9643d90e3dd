use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, LoginFocus};
use crate::session::format_remaining;
use crate::utils::format_roles;

use super::layout::{self, AuthStatus};
use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let (header, body, footer) = layout::frame_areas(frame.area());

    layout::render_header(frame, header, app);
    if app.is_logged_in() {
        render_profile(frame, app, body);
    } else {
        render_signed_out(frame, body);
    }
    layout::render_footer(frame, footer, app.status_message.as_deref(), shortcuts(app.state));

    // Render overlays
    match app.state {
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ShowingNotice => render_notice_overlay(frame, app),
        _ => {}
    }
}

fn shortcuts(state: AppState) -> &'static str {
    match state {
        AppState::LoggingIn => "[Tab] next field | [Enter] select | [Esc] quit",
        AppState::Profile => "[r]efresh | [l] sign out | [q]uit",
        AppState::ConfirmingQuit => "[y] quit | [n] cancel",
        AppState::ShowingNotice => "[Enter] continue",
        AppState::Reloading | AppState::Quitting => "",
    }
}

fn render_signed_out(frame: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  AI ad copy for your products, published straight to Meta.",
            styles::muted_style(),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_profile(frame: &mut Frame, app: &App, area: Rect) {
    let identity = app.auth.identity();
    let email = identity.map(|i| i.email.as_str()).unwrap_or("-");
    let roles = identity.map(|i| format_roles(&i.roles)).unwrap_or_default();

    let nickname = app
        .profile
        .as_ref()
        .and_then(|p| p.nickname.as_deref())
        .unwrap_or("-");

    let mut lines = vec![
        Line::from(""),
        field_line("Email", email.to_string()),
        field_line("Nickname", nickname.to_string()),
        field_line("Roles", roles),
        Line::from(""),
    ];

    if let Some(remaining) = app.session_remaining() {
        lines.push(Line::from(vec![
            Span::styled("  Auto logout in:  ", styles::muted_style()),
            Span::styled(
                format_remaining(remaining),
                styles::countdown_style(remaining.as_secs()),
            ),
        ]));
    }

    let block = Block::default()
        .title(Span::styled(" My Page ", styles::title_style()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.state == AppState::Profile));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn field_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<16}", format!("{}:", label)), styles::muted_style()),
        Span::styled(value, styles::list_item_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    // Fixed size dialog - compact
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(50, height, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Sign in to ADaide", styles::title_style())),
        Line::from(""),
    ];

    // Email field
    let email_focused = app.login_focus == LoginFocus::Email;
    let email_style = if email_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let email_tail: String = {
        let count = app.login_email.chars().count();
        app.login_email.chars().skip(count.saturating_sub(24)).collect()
    };
    let cursor = if email_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled("Email:    [", styles::muted_style()),
        Span::styled(format!("{:<24}{}", email_tail, cursor), email_style),
        Span::styled("]", styles::muted_style()),
    ]));

    // Password field
    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let password_masked: String = "*".repeat(app.login_password.chars().count().min(24));
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{:<24}{}", password_masked, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    // Login button
    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    lines.push(Line::from(""));
    let label = if button_focused { " ▶ Sign in ◀ " } else { "   Sign in   " };
    lines.push(Line::from(vec![
        Span::raw("               ["),
        Span::styled(label, button_style),
        Span::raw("]"),
    ]));

    // Error message
    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_notice_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(54, 8, frame.area());
    frame.render_widget(Clear, area);

    let message = app.notice.as_deref().unwrap_or_default();
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", message), styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" to continue", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed_clamps_to_screen() {
        let r = centered_rect_fixed(50, 10, Rect::new(0, 0, 40, 8));
        assert_eq!(r, Rect::new(0, 0, 40, 8));

        let r = centered_rect_fixed(20, 4, Rect::new(0, 0, 80, 24));
        assert_eq!(r, Rect::new(30, 10, 20, 4));
    }

    #[test]
    fn test_every_state_has_shortcuts_line() {
        assert!(shortcuts(AppState::Profile).contains("sign out"));
        assert!(shortcuts(AppState::ShowingNotice).contains("Enter"));
    }
}
