//! Screen layout calculations

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Height of the console controls panel.
const CONTROLS_HEIGHT: u16 = 8;

/// Areas of the main screen.
///
/// The body is split one third console, two thirds chronicle.
#[derive(Debug, Clone, Copy)]
pub struct AppLayout {
    pub title_area: Rect,
    pub controls_area: Rect,
    pub output_area: Rect,
    pub chronicle_area: Rect,
    pub status_bar: Rect,
    pub input_area: Rect,
}

impl AppLayout {
    pub fn calculate(area: Rect) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
            .split(rows[1]);

        let console = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(CONTROLS_HEIGHT), Constraint::Min(3)])
            .split(columns[0]);

        Self {
            title_area: rows[0],
            controls_area: console[0],
            output_area: console[1],
            chronicle_area: columns[1],
            status_bar: rows[2],
            input_area: rows[3],
        }
    }
}

/// A `width` x `height` rectangle centred in `area`, clipped to fit.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
