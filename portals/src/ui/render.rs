//! Render orchestration for the portals TUI

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, InputTarget};
use crate::ui::layout::{centered_rect_fixed, AppLayout};
use crate::ui::widgets::{ChronicleWidget, ConsultState, ControlsWidget, InputWidget, OutputLogWidget};

/// Which panel is focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusedPanel {
    #[default]
    Console,
    Chronicle,
}

/// Overlay types
#[derive(Debug, Clone)]
pub enum Overlay {
    Help,
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let layout = AppLayout::calculate(area);

    render_title_bar(frame, layout.title_area);

    let consult = if app.is_running() {
        ConsultState::Running {
            frame: app.animation_frame,
        }
    } else if app.can_consult() {
        ConsultState::Ready
    } else {
        ConsultState::Unconfigured
    };

    let console_focused = matches!(app.focused_panel, FocusedPanel::Console);

    let controls = ControlsWidget::new(
        &app.theme,
        &app.model_name,
        app.session.variant(),
        app.session.chart_date(),
    )
    .connected(app.session.model_name(), app.connection_error.as_deref())
    .chapters(app.session.story().len())
    .consult(consult)
    .focused(console_focused);
    frame.render_widget(controls, layout.controls_area);

    let output = OutputLogWidget::new(&app.console_log, &app.theme)
        .scroll(app.console_scroll)
        .focused(console_focused)
        .pending(app.is_running().then_some("..."));
    frame.render_widget(output, layout.output_area);

    let chronicle = ChronicleWidget::new(app.session.story(), &app.chronicle, &app.theme)
        .focused(matches!(app.focused_panel, FocusedPanel::Chronicle));
    frame.render_widget(chronicle, layout.chronicle_area);

    render_status_bar(frame, app, layout.status_bar);
    render_input(frame, app, layout.input_area);

    if let Some(overlay) = app.overlay() {
        render_overlay(frame, app, overlay, area);
    }
}

/// Render the title bar
fn render_title_bar(frame: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            " Portals: TempleOS reimagined ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "| Consult the oracle to let divine providence guide your adventure.",
            Style::default().add_modifier(Modifier::DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode = match app.input_mode {
        InputMode::Normal => "NORMAL",
        InputMode::Insert => "INSERT",
        InputMode::Command => "COMMAND",
    };

    let mut spans = vec![Span::styled(
        format!(" {mode} "),
        Style::default()
            .fg(Color::Black)
            .bg(app.theme.border_focused)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(message) = app.status_message() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(message.to_string(), app.theme.text_style()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Render the input area
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = matches!(app.input_mode, InputMode::Insert | InputMode::Command);
    let is_command = matches!(app.input_mode, InputMode::Command);

    let label = match (app.input_mode, app.input_target) {
        (InputMode::Insert, InputTarget::Model) => "Enter Ollama model name (e.g., 'llama3')",
        (InputMode::Insert, InputTarget::Date) => "Chart date (YYYY-MM-DD)",
        (InputMode::Command, _) => "Command",
        (InputMode::Normal, _) => "",
    };

    let input_widget = InputWidget::new(app.input_buffer(), &app.theme)
        .cursor_position(app.cursor_position())
        .active(is_active)
        .command_mode(is_command)
        .label(label)
        .placeholder("c consult | m model | C connect | d date | : command | ? help");

    frame.render_widget(input_widget, area);
}

/// Render overlay
fn render_overlay(frame: &mut Frame, app: &App, overlay: &Overlay, area: Rect) {
    match overlay {
        Overlay::Help => render_help_overlay(frame, app, area),
    }
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup_area = centered_rect_fixed(54, 27, area);
    frame.render_widget(Clear, popup_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::UNDERLINED),
        ))
    };

    let help_text = vec![
        Line::from(Span::styled(
            " Portals - Help ",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        heading("Oracle:"),
        Line::from("  m       Edit the model name (Enter connects)"),
        Line::from("  C       Connect to the model"),
        Line::from("  c       Consult the oracle"),
        Line::from("  d       Edit the chart date"),
        Line::from(""),
        heading("Navigation:"),
        Line::from("  Tab          Switch console / chronicle"),
        Line::from("  j/k or ↑/↓   Scroll output / select chapter"),
        Line::from("  Enter        Expand or collapse chapter"),
        Line::from("  g/G          Jump to top/bottom"),
        Line::from("  Mouse wheel  Scroll"),
        Line::from(""),
        heading("Commands:"),
        Line::from("  :connect [MODEL]   Connect a model"),
        Line::from("  :consult           Consult the oracle"),
        Line::from("  :date YYYY-MM-DD   Set the chart date"),
        Line::from("  :q                 Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or q to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, popup_area);
}
