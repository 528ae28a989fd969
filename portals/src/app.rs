//! Main application state and logic

use std::collections::BTreeSet;

use chrono::NaiveDate;
use portals_core::{LogEntry, LogKind, RunOutcome, RunReport, Session, SessionError, Variant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::ui::theme::PortalTheme;
use crate::ui::{FocusedPanel, Overlay};

/// Status shown while a run is in flight.
pub const WEAVING_STATUS: &str =
    "The Oracle is interpreting the holy message... The Fates are weaving...";

/// Vim-style input modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal mode - navigation and hotkeys (default)
    #[default]
    Normal,
    /// Insert mode - editing a console field
    Insert,
    /// Command mode - entering : commands
    Command,
}

/// Which console field the input line edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputTarget {
    #[default]
    Model,
    Date,
}

/// A run spawned on the runtime.
struct ActiveRun {
    handle: JoinHandle<RunReport>,
    progress: UnboundedReceiver<LogEntry>,
}

/// Selection and expansion state of the chronicle pane.
///
/// Chapters are listed newest first, so `selected == 0` is the latest
/// chapter. The latest chapter is always expanded.
#[derive(Debug, Clone, Default)]
pub struct ChronicleState {
    pub selected: usize,
    expanded: BTreeSet<u32>,
}

impl ChronicleState {
    pub fn select_next(&mut self, chapter_count: usize) {
        if self.selected + 1 < chapter_count {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_latest(&mut self) {
        self.selected = 0;
    }

    pub fn select_oldest(&mut self, chapter_count: usize) {
        self.selected = chapter_count.saturating_sub(1);
    }

    /// Chapter number of the selected entry.
    pub fn selected_chapter(&self, chapter_count: usize) -> Option<u32> {
        (self.selected < chapter_count).then(|| (chapter_count - self.selected) as u32)
    }

    /// Toggle the selected chapter open or closed.
    pub fn toggle_selected(&mut self, chapter_count: usize) {
        if let Some(num) = self.selected_chapter(chapter_count) {
            if !self.expanded.remove(&num) {
                self.expanded.insert(num);
            }
        }
    }

    pub fn is_expanded(&self, chapter_num: u32, chapter_count: usize) -> bool {
        chapter_num as usize == chapter_count || self.expanded.contains(&chapter_num)
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").ok()
}

/// Status line summarising how a run ended.
pub fn outcome_status(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::OutOfRange { draw } => format!("Draw {draw} fell outside the sacred texts"),
        RunOutcome::NoResonance(run) => format!("Line ~{} held no meaning for the story", run.draw),
        RunOutcome::ChapterWritten(run) => match &run.chapter {
            Some(chapter) => format!("Chapter {} was written", chapter.chapter_num),
            None => "The story progresses".to_string(),
        },
        RunOutcome::Failed { reason } => format!("The oracle faltered: {reason}"),
    }
}

/// Main application state
pub struct App {
    pub session: Session,

    // UI state
    pub theme: PortalTheme,
    pub focused_panel: FocusedPanel,
    overlay: Option<Overlay>,

    // Oracle output
    pub console_log: Vec<LogEntry>,
    pub console_scroll: usize,
    pub scroll_locked_to_bottom: bool,

    // Chronicle
    pub chronicle: ChronicleState,

    // Input state
    pub input_mode: InputMode,
    pub input_target: InputTarget,
    input_buffer: String,
    cursor_position: usize,

    // Backend
    pub model_name: String,
    pub connection_error: Option<String>,
    pub pending_connect: Option<String>,

    // Run in flight
    run: Option<ActiveRun>,

    // Status
    status_message: Option<String>,
    pub should_quit: bool,
    quit_armed: bool,

    // Animation
    pub animation_frame: u8,
}

impl App {
    /// Create a new application around an open session.
    ///
    /// `model_name` pre-fills the model field; nothing is connected yet.
    pub fn new(session: Session, model_name: impl Into<String>) -> Self {
        let mut app = Self {
            session,
            theme: PortalTheme::default(),
            focused_panel: FocusedPanel::default(),
            overlay: None,
            console_log: Vec::new(),
            console_scroll: 0,
            scroll_locked_to_bottom: true,
            chronicle: ChronicleState::default(),
            input_mode: InputMode::Normal,
            input_target: InputTarget::default(),
            input_buffer: String::new(),
            cursor_position: 0,
            model_name: model_name.into(),
            connection_error: None,
            pending_connect: None,
            run: None,
            status_message: None,
            should_quit: false,
            quit_armed: false,
            animation_frame: 0,
        };

        app.set_status("Press 'C' to connect, 'c' to consult the oracle, '?' for help");
        app
    }

    // =========================================================================
    // Backend
    // =========================================================================

    /// Queue a connection attempt; the main loop performs it.
    pub fn request_connect(&mut self, model: Option<&str>) {
        if let Some(model) = model {
            self.model_name = model.trim().to_string();
        }
        if self.model_name.is_empty() {
            self.set_status("Enter a model name first ('m' to edit)");
            return;
        }
        self.pending_connect = Some(self.model_name.clone());
    }

    /// Connect to `model`, reporting the result on the status line.
    pub async fn connect(&mut self, model: &str) {
        match self.session.connect(model).await {
            Ok(()) => {
                self.connection_error = None;
                self.set_status(format!(
                    "Successfully connected to Ollama with model '{model}'."
                ));
            }
            Err(e) => {
                self.connection_error = Some(e.to_string());
                self.set_status(format!(
                    "Failed to connect to Ollama. Ensure Ollama is running and the model is downloaded. Error: {e}"
                ));
            }
        }
    }

    // =========================================================================
    // Consultation
    // =========================================================================

    /// Whether a run is in flight. Stays true until its report is collected.
    pub fn is_running(&self) -> bool {
        self.run.is_some() || self.session.is_busy()
    }

    /// Whether the consult control is enabled.
    pub fn can_consult(&self) -> bool {
        self.run.is_none() && self.session.can_consult()
    }

    /// Start a run on the runtime. Ignored while one is in flight.
    pub fn trigger_consult(&mut self) {
        if self.is_running() {
            self.set_status(WEAVING_STATUS);
            return;
        }

        let ticket = match self.session.begin_run() {
            Ok(ticket) => ticket,
            Err(SessionError::BackendUnconfigured) => {
                self.set_status("Please select and configure an LLM provider first.");
                return;
            }
            Err(e) => {
                self.set_status(e.to_string());
                return;
            }
        };

        let draw = ticket.draw(&mut rand::thread_rng());
        let (tx, rx) = mpsc::unbounded_channel();
        info!(draw, "consultation started");

        self.console_log.clear();
        self.scroll_to_bottom();
        self.run = Some(ActiveRun {
            handle: tokio::spawn(ticket.execute(draw, Some(tx))),
            progress: rx,
        });
        self.set_status(WEAVING_STATUS);
    }

    /// Move streamed log entries into the console.
    pub fn drain_progress(&mut self) {
        let Some(run) = self.run.as_mut() else {
            return;
        };

        let mut received = false;
        while let Ok(entry) = run.progress.try_recv() {
            self.console_log.push(entry);
            received = true;
        }

        if received && self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    /// Whether the spawned run has finished and can be collected.
    pub fn run_finished(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.handle.is_finished())
    }

    /// Hand the finished run's report back to the session.
    pub async fn collect_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        match run.handle.await {
            Ok(report) => {
                let outcome = self.session.finish_run(report);
                self.console_log = self.session.log().to_vec();
                if outcome.chapter().is_some() {
                    self.chronicle.select_latest();
                }
                self.set_status(outcome_status(&outcome));
            }
            Err(e) => {
                error!(error = %e, "consultation task failed");
                self.console_log
                    .push(LogEntry::new(LogKind::Error, format!("The oracle faltered: {e}")));
                self.set_status("The consultation ended unexpectedly");
            }
        }

        if self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    // =========================================================================
    // Date
    // =========================================================================

    /// Set the chart date from user input.
    pub fn set_date(&mut self, input: &str) {
        match parse_date(input) {
            Some(date) => {
                self.session.set_chart_date(date);
                let note = match self.session.variant() {
                    Variant::Celestial => "",
                    Variant::Scripture => " (only the celestial oracle reads the stars)",
                };
                self.set_status(format!("The stars will be read for {date}{note}"));
            }
            None => self.set_status(format!("Invalid date '{}' (expected YYYY-MM-DD)", input.trim())),
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Start editing a console field, pre-filled with its current value.
    pub fn begin_edit(&mut self, target: InputTarget) {
        let current = match target {
            InputTarget::Model => self.model_name.clone(),
            InputTarget::Date => self.session.chart_date().to_string(),
        };
        self.input_target = target;
        self.input_mode = InputMode::Insert;
        self.set_input(current);
    }

    /// Apply the edited field and return to normal mode.
    pub fn submit_input(&mut self) {
        let input = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;
        self.input_mode = InputMode::Normal;

        match self.input_target {
            InputTarget::Model => self.request_connect(Some(&input)),
            InputTarget::Date => self.set_date(&input),
        }
    }

    /// Enter command mode (starts with :)
    pub fn enter_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer.clear();
        self.input_buffer.push(':');
        self.cursor_position = 1;
    }

    /// Exit to normal mode
    pub fn enter_normal_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.clear_input();
    }

    /// Process a colon command
    pub fn process_command(&mut self, command: &str) {
        let cmd = command.trim_start_matches(':');
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        let Some(&name) = parts.first() else {
            return;
        };

        match name {
            "q" | "quit" | "exit" => self.request_quit(),
            "q!" => self.should_quit = true,
            "connect" | "c" => {
                let model = (parts.len() > 1).then(|| parts[1..].join(" "));
                self.request_connect(model.as_deref());
            }
            "consult" | "o" => self.trigger_consult(),
            "date" | "d" => match parts.get(1) {
                Some(date) => self.set_date(date),
                None => self.set_status(format!(
                    "Chart date is {} (usage: :date YYYY-MM-DD)",
                    self.session.chart_date()
                )),
            },
            "help" | "h" => self.toggle_help(),
            _ => self.set_status(format!("Unknown command: {name}")),
        }
    }

    /// Handle a typed character (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Handle delete (unicode-safe)
    pub fn delete(&mut self) {
        if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position) {
            self.input_buffer
                .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    /// Set input buffer content and move cursor to end (unicode-safe)
    pub fn set_input(&mut self, content: impl Into<String>) {
        self.input_buffer = content.into();
        self.cursor_position = self.input_buffer.chars().count();
    }

    pub fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    // =========================================================================
    // Scrolling and focus
    // =========================================================================

    /// Scroll the console to the bottom and lock it there
    pub fn scroll_to_bottom(&mut self) {
        // The widget caps this to the real maximum
        self.console_scroll = usize::MAX / 2;
        self.scroll_locked_to_bottom = true;
    }

    /// Rough line count of the console log, assuming ~40 columns.
    fn estimate_max_scroll(&self) -> usize {
        const ESTIMATED_WIDTH: usize = 40;
        const ESTIMATED_VISIBLE_HEIGHT: usize = 15;

        let estimated_lines: usize = self
            .console_log
            .iter()
            .map(|entry| {
                entry
                    .text
                    .lines()
                    .map(|line| (line.len() / ESTIMATED_WIDTH).max(1))
                    .sum::<usize>()
                    + 1
            })
            .sum();

        estimated_lines.saturating_sub(ESTIMATED_VISIBLE_HEIGHT)
    }

    /// Scroll the console up (unlocks from bottom)
    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        if self.console_scroll > max_scroll {
            self.console_scroll = max_scroll;
        }
        self.console_scroll = self.console_scroll.saturating_sub(lines);
        self.scroll_locked_to_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        self.console_scroll = self.console_scroll.saturating_add(lines).min(max_scroll + 100);
    }

    pub fn scroll_to_top(&mut self) {
        self.console_scroll = 0;
        self.scroll_locked_to_bottom = false;
    }

    pub fn cycle_focus(&mut self) {
        self.focused_panel = match self.focused_panel {
            FocusedPanel::Console => FocusedPanel::Chronicle,
            FocusedPanel::Chronicle => FocusedPanel::Console,
        };
    }

    // =========================================================================
    // Overlay, status, quitting
    // =========================================================================

    pub fn toggle_help(&mut self) {
        if matches!(self.overlay, Some(Overlay::Help)) {
            self.overlay = None;
        } else {
            self.overlay = Some(Overlay::Help);
        }
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Quit, asking for confirmation if a run is in flight.
    pub fn request_quit(&mut self) {
        if self.is_running() && !self.quit_armed {
            self.quit_armed = true;
            self.set_status("A consultation is in progress. Press q again to abandon it.");
            return;
        }
        self.should_quit = true;
    }

    /// Tick for animations
    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Set status message (always overwrites)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.quit_armed = false;
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chronicle_selection_bounds() {
        let mut state = ChronicleState::default();
        state.select_prev();
        assert_eq!(state.selected, 0);

        state.select_next(3);
        state.select_next(3);
        state.select_next(3);
        assert_eq!(state.selected, 2);
        assert_eq!(state.selected_chapter(3), Some(1));

        state.select_latest();
        assert_eq!(state.selected_chapter(3), Some(3));
        assert_eq!(state.selected_chapter(0), None);
    }

    #[test]
    fn test_latest_chapter_always_expanded() {
        let mut state = ChronicleState::default();
        assert!(state.is_expanded(4, 4));
        assert!(!state.is_expanded(3, 4));

        state.select_next(4);
        state.toggle_selected(4);
        assert!(state.is_expanded(3, 4));

        state.toggle_selected(4);
        assert!(!state.is_expanded(3, 4));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(" 2024-03-20 "), NaiveDate::from_ymd_opt(2024, 3, 20));
        assert_eq!(parse_date("20/03/2024"), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn test_outcome_status() {
        assert!(outcome_status(&RunOutcome::OutOfRange { draw: 500_000 }).contains("500000"));
        let failed = RunOutcome::Failed {
            reason: "timeout".to_string(),
        };
        assert_eq!(outcome_status(&failed), "The oracle faltered: timeout");
    }
}
