//! Oracle output widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};

use portals_core::{LogEntry, LogKind};

use crate::ui::theme::PortalTheme;

/// Widget for the message log of the current run
pub struct OutputLogWidget<'a> {
    entries: &'a [LogEntry],
    scroll: usize,
    theme: &'a PortalTheme,
    focused: bool,
    pending: Option<&'a str>,
}

impl<'a> OutputLogWidget<'a> {
    pub fn new(entries: &'a [LogEntry], theme: &'a PortalTheme) -> Self {
        Self {
            entries,
            scroll: 0,
            theme,
            focused: false,
            pending: None,
        }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Trailing line shown while more entries are expected.
    pub fn pending(mut self, text: Option<&'a str>) -> Self {
        self.pending = text;
        self
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let mut lines: Vec<Line> = Vec::new();

        for entry in self.entries {
            let style = self.theme.log_style(entry.kind);
            let prefix = match entry.kind {
                LogKind::Error => "! ",
                LogKind::Success => "* ",
                _ => "",
            };

            for (i, line) in entry.text.lines().enumerate() {
                let text = if i == 0 {
                    format!("{prefix}{line}")
                } else {
                    line.to_string()
                };
                lines.push(Line::from(Span::styled(text, style)));
            }

            // Separator between entries
            lines.push(Line::from(Span::styled("---", self.theme.dim_style())));
        }

        if let Some(pending) = self.pending {
            lines.push(Line::from(Span::styled(
                pending.to_string(),
                self.theme.dim_style().add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    }
}

impl Widget for OutputLogWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.focused {
            " Oracle Output [j/k scroll] "
        } else {
            " Oracle Output "
        };

        let block = Block::default()
            .title(title)
            .title_style(self.theme.title_style(self.focused))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        if self.entries.is_empty() && self.pending.is_none() {
            Paragraph::new(Span::styled(
                "The oracle has not been consulted yet.",
                self.theme.dim_style(),
            ))
            .render(inner, buf);
            return;
        }

        let lines = self.lines();

        let visible_height = inner.height as usize;
        let total_lines = lines.len();
        let max_scroll = total_lines.saturating_sub(visible_height);
        let scroll = self.scroll.min(max_scroll);

        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);

        if total_lines > visible_height {
            let scrollbar_area = Rect {
                x: inner.x + inner.width.saturating_sub(1),
                y: inner.y,
                width: 1,
                height: inner.height,
            };

            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .thumb_style(Style::default().fg(Color::DarkGray))
                .track_style(Style::default().fg(Color::Black))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);
            scrollbar.render(scrollbar_area, buf, &mut scrollbar_state);

            if scroll < max_scroll {
                let hint = format!(" ↓{} more ", max_scroll - scroll);
                let hint_y = inner.y + inner.height.saturating_sub(1);
                let hint_style = Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM);
                for (i, ch) in hint.chars().enumerate() {
                    let x = inner.x + (i as u16);
                    if x < inner.x + inner.width.saturating_sub(2) {
                        buf[(x, hint_y)].set_char(ch).set_style(hint_style);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiline_entries_get_separators() {
        let theme = PortalTheme::default();
        let entries = vec![
            LogEntry::new(LogKind::Draw, "The heavens spin... a number is chosen: 7"),
            LogEntry::new(LogKind::Verse, "A verse is revealed (from line ~7):\n\nline 7"),
        ];
        let widget = OutputLogWidget::new(&entries, &theme).pending(Some("..."));
        let lines = widget.lines();

        // 1 + sep + 3 + sep + pending
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[1].spans[0].content, "---");
        assert_eq!(lines[6].spans[0].content, "...");
    }

    #[test]
    fn test_error_prefix() {
        let theme = PortalTheme::default();
        let entries = vec![LogEntry::new(LogKind::Error, "The oracle faltered: boom")];
        let lines = OutputLogWidget::new(&entries, &theme).lines();
        assert_eq!(lines[0].spans[0].content, "! The oracle faltered: boom");
    }
}
