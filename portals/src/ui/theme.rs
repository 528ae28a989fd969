//! Color theme and styling for the portals TUI

use portals_core::LogKind;
use ratatui::style::{Color, Modifier, Style};

/// Portals UI color theme
#[derive(Debug, Clone)]
pub struct PortalTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub accent: Color,

    // Oracle output colors
    pub draw_text: Color,
    pub verse_text: Color,
    pub analysis_text: Color,
    pub chart_text: Color,
    pub inspiration_text: Color,
    pub success_text: Color,
    pub silence_text: Color,
    pub error_text: Color,

    // Chronicle colors
    pub title_text: Color,
    pub chapter_text: Color,
}

impl Default for PortalTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            accent: Color::Yellow,

            draw_text: Color::LightBlue,
            verse_text: Color::Yellow,
            analysis_text: Color::White,
            chart_text: Color::Magenta,
            inspiration_text: Color::Cyan,
            success_text: Color::Green,
            silence_text: Color::DarkGray,
            error_text: Color::Red,

            title_text: Color::LightYellow,
            chapter_text: Color::White,
        }
    }
}

impl PortalTheme {
    /// Style for a log entry
    pub fn log_style(&self, kind: LogKind) -> Style {
        match kind {
            LogKind::Draw => Style::default().fg(self.draw_text),
            LogKind::Verse => Style::default()
                .fg(self.verse_text)
                .add_modifier(Modifier::ITALIC),
            LogKind::Analysis => Style::default().fg(self.analysis_text),
            LogKind::Chart => Style::default().fg(self.chart_text),
            LogKind::Inspiration => Style::default()
                .fg(self.inspiration_text)
                .add_modifier(Modifier::BOLD),
            LogKind::Success => Style::default()
                .fg(self.success_text)
                .add_modifier(Modifier::BOLD),
            LogKind::Silence => Style::default()
                .fg(self.silence_text)
                .add_modifier(Modifier::DIM),
            LogKind::Error => Style::default()
                .fg(self.error_text)
                .add_modifier(Modifier::BOLD),
        }
    }

    pub fn text_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    /// Style for labels and hints
    pub fn dim_style(&self) -> Style {
        Style::default().add_modifier(Modifier::DIM)
    }

    /// Style for a control that can be used right now
    pub fn control_style(&self, enabled: bool) -> Style {
        if enabled {
            Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            self.dim_style()
        }
    }

    pub fn connected_style(&self, connected: bool) -> Style {
        Style::default().fg(if connected {
            self.success_text
        } else {
            self.error_text
        })
    }

    pub fn story_title_style(&self) -> Style {
        Style::default()
            .fg(self.title_text)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    }

    /// Style for a chapter heading in the chronicle
    pub fn chapter_heading_style(&self, selected: bool) -> Style {
        let style = Style::default().fg(self.accent);
        if selected {
            style.add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            style
        }
    }

    pub fn chapter_style(&self) -> Style {
        Style::default().fg(self.chapter_text)
    }

    /// Get border style
    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }

    /// Get title style
    pub fn title_style(&self, focused: bool) -> Style {
        let style = Style::default().fg(if focused {
            self.border_focused
        } else {
            self.foreground
        });

        if focused {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }
}
