//! Console controls panel

use chrono::NaiveDate;
use portals_core::Variant;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::ui::theme::PortalTheme;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// State of the consult control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultState {
    Ready,
    Unconfigured,
    Running { frame: u8 },
}

/// Backend status, the editable fields and the consult control
pub struct ControlsWidget<'a> {
    theme: &'a PortalTheme,
    connected_model: Option<&'a str>,
    connection_error: Option<&'a str>,
    model_field: &'a str,
    variant: Variant,
    date: NaiveDate,
    chapter_count: usize,
    consult: ConsultState,
    focused: bool,
}

impl<'a> ControlsWidget<'a> {
    pub fn new(theme: &'a PortalTheme, model_field: &'a str, variant: Variant, date: NaiveDate) -> Self {
        Self {
            theme,
            connected_model: None,
            connection_error: None,
            model_field,
            variant,
            date,
            chapter_count: 0,
            consult: ConsultState::Unconfigured,
            focused: false,
        }
    }

    pub fn connected(mut self, model: Option<&'a str>, error: Option<&'a str>) -> Self {
        self.connected_model = model;
        self.connection_error = error;
        self
    }

    pub fn chapters(mut self, count: usize) -> Self {
        self.chapter_count = count;
        self
    }

    pub fn consult(mut self, state: ConsultState) -> Self {
        self.consult = state;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    fn backend_line(&self) -> Line<'a> {
        let status = match (self.connected_model, self.connection_error) {
            (Some(model), _) => Span::styled(
                format!("● connected to {model}"),
                self.theme.connected_style(true),
            ),
            (None, Some(_)) => Span::styled("✗ connection failed", self.theme.connected_style(false)),
            (None, None) => Span::styled("○ not connected", self.theme.dim_style()),
        };
        Line::from(vec![Span::styled("Backend: ", self.theme.dim_style()), status])
    }

    fn consult_line(&self) -> Line<'a> {
        match self.consult {
            ConsultState::Ready => Line::from(vec![
                Span::styled("[c] ", self.theme.control_style(true)),
                Span::styled("Consult the Oracle", self.theme.control_style(true)),
            ]),
            ConsultState::Unconfigured => Line::from(vec![
                Span::styled("[c] Consult the Oracle ", self.theme.control_style(false)),
                Span::styled("(connect first)", self.theme.dim_style()),
            ]),
            ConsultState::Running { frame } => {
                let spinner = SPINNER[frame as usize % SPINNER.len()];
                Line::from(Span::styled(
                    format!("{spinner} The Fates are weaving..."),
                    self.theme.control_style(false),
                ))
            }
        }
    }
}

impl Widget for ControlsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Oracle's Console ")
            .title_style(self.theme.title_style(self.focused))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let date = match self.variant {
            Variant::Celestial => Span::styled(self.date.to_string(), self.theme.text_style()),
            Variant::Scripture => Span::styled(format!("{} (unused)", self.date), self.theme.dim_style()),
        };

        let lines = vec![
            self.backend_line(),
            Line::from(vec![
                Span::styled("Model:   ", self.theme.dim_style()),
                Span::styled(self.model_field.to_string(), self.theme.text_style()),
                Span::styled("  [m] [C]", self.theme.dim_style()),
            ]),
            Line::from(vec![
                Span::styled("Oracle:  ", self.theme.dim_style()),
                Span::styled(self.variant.to_string(), self.theme.text_style()),
                Span::styled(format!("  {} chapters", self.chapter_count), self.theme.dim_style()),
            ]),
            Line::from(vec![
                Span::styled("Date:    ", self.theme.dim_style()),
                date,
                Span::styled("  [d]", self.theme.dim_style()),
            ]),
            Line::from(""),
            self.consult_line(),
        ];

        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(theme: &PortalTheme) -> ControlsWidget<'_> {
        ControlsWidget::new(
            theme,
            "llama3",
            Variant::Celestial,
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
        )
    }

    #[test]
    fn test_backend_line_states() {
        let theme = PortalTheme::default();
        let line = widget(&theme).connected(Some("llama3"), None).backend_line();
        assert_eq!(line.spans[1].content, "● connected to llama3");

        let line = widget(&theme).connected(None, Some("refused")).backend_line();
        assert_eq!(line.spans[1].content, "✗ connection failed");
    }

    #[test]
    fn test_spinner_wraps() {
        let theme = PortalTheme::default();
        let line = widget(&theme)
            .consult(ConsultState::Running { frame: 13 })
            .consult_line();
        assert!(line.spans[0].content.starts_with('⠸'));
    }
}
