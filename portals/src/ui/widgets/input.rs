//! Input line widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::PortalTheme;

/// Single-line editor for console fields and : commands
pub struct InputWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    theme: &'a PortalTheme,
    label: &'a str,
    placeholder: &'a str,
    is_active: bool,
    is_command_mode: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(content: &'a str, theme: &'a PortalTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            theme,
            label: "",
            placeholder: "",
            is_active: false,
            is_command_mode: false,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    /// Name of the field being edited, shown in the border.
    pub fn label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn command_mode(mut self, is_command: bool) -> Self {
        self.is_command_mode = is_command;
        self
    }

    fn line(&self) -> Line<'a> {
        if !self.is_active {
            return Line::from(Span::styled(self.placeholder, self.theme.dim_style()));
        }

        let prefix = if self.is_command_mode { ":" } else { "> " };
        let display_content = if self.is_command_mode {
            self.content.strip_prefix(':').unwrap_or(self.content)
        } else {
            self.content
        };
        let cursor = if self.is_command_mode {
            self.cursor_position.saturating_sub(1)
        } else {
            self.cursor_position
        };

        // Character-based slicing for unicode safety
        let before_cursor: String = display_content.chars().take(cursor).collect();
        let at_cursor = display_content
            .chars()
            .nth(cursor)
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string());
        let after_cursor: String = display_content.chars().skip(cursor + 1).collect();

        Line::from(vec![
            Span::styled(prefix, self.theme.control_style(true)),
            Span::raw(before_cursor),
            Span::styled(
                at_cursor,
                Style::default()
                    .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
                    .fg(self.theme.accent),
            ),
            Span::raw(after_cursor),
        ])
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));
        if !self.label.is_empty() {
            block = block.title(format!(" {} ", self.label));
        }

        let inner = block.inner(area);
        block.render(area, buf);
        Paragraph::new(self.line()).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_cursor_mid_text() {
        let theme = PortalTheme::default();
        let line = InputWidget::new("llama3", &theme)
            .active(true)
            .cursor_position(2)
            .line();
        assert_eq!(spans(&line), vec!["> ", "ll", "a", "ma3"]);
    }

    #[test]
    fn test_command_mode_hides_colon() {
        let theme = PortalTheme::default();
        let line = InputWidget::new(":date", &theme)
            .active(true)
            .command_mode(true)
            .line();
        assert_eq!(spans(&line), vec![":", "date", " ", ""]);
    }

    #[test]
    fn test_inactive_shows_placeholder() {
        let theme = PortalTheme::default();
        let line = InputWidget::new("", &theme).placeholder("Press : for commands").line();
        assert_eq!(spans(&line), vec!["Press : for commands"]);
    }
}
