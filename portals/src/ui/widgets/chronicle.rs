//! Campaign chronicle widget
//!
//! Shows the story title, then every chapter newest first. Expanded
//! chapters show their text; collapsed ones show only a heading.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use portals_core::Story;

use crate::app::ChronicleState;
use crate::ui::theme::PortalTheme;

pub struct ChronicleWidget<'a> {
    story: &'a Story,
    state: &'a ChronicleState,
    theme: &'a PortalTheme,
    focused: bool,
}

impl<'a> ChronicleWidget<'a> {
    pub fn new(story: &'a Story, state: &'a ChronicleState, theme: &'a PortalTheme) -> Self {
        Self {
            story,
            state,
            theme,
            focused: false,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    /// Rendered lines plus the index of the selected chapter's heading.
    fn lines(&self) -> (Vec<Line<'a>>, usize) {
        let count = self.story.len();
        let mut lines = vec![
            Line::from(Span::styled(self.story.title.clone(), self.theme.story_title_style())),
            Line::from(""),
        ];
        let mut selected_line = 0;

        if count == 0 {
            lines.push(Line::from(Span::styled(
                "No chapters yet. Consult the oracle to begin.",
                self.theme.dim_style(),
            )));
            return (lines, selected_line);
        }

        for (position, chapter) in self.story.chapters.iter().rev().enumerate() {
            let selected = self.focused && position == self.state.selected;
            let expanded = self.state.is_expanded(chapter.chapter_num, count);
            if position == self.state.selected {
                selected_line = lines.len();
            }

            let marker = if expanded { "▾" } else { "▸" };
            lines.push(Line::from(Span::styled(
                format!("{marker} Chapter {}", chapter.chapter_num),
                self.theme.chapter_heading_style(selected),
            )));

            if expanded {
                for paragraph in chapter.content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {paragraph}"),
                        self.theme.chapter_style(),
                    )));
                }
                lines.push(Line::from(""));
            }
        }

        (lines, selected_line)
    }
}

impl Widget for ChronicleWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.focused {
            " Campaign Chronicle [j/k select, Enter expand] "
        } else {
            " Campaign Chronicle "
        };

        let block = Block::default()
            .title(title)
            .title_style(self.theme.title_style(self.focused))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.focused));

        let inner = block.inner(area);
        block.render(area, buf);

        let (lines, selected_line) = self.lines();

        // Keep the selected heading in the upper third of the pane
        let visible_height = inner.height as usize;
        let max_scroll = lines.len().saturating_sub(visible_height);
        let scroll = selected_line
            .saturating_sub(visible_height / 3)
            .min(max_scroll);

        Paragraph::new(lines)
            .scroll((scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .render(inner, buf);
    }
}
