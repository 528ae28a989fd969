//! TUI widgets for the portals console

pub mod chronicle;
pub mod controls;
pub mod input;
pub mod output_log;

pub use chronicle::ChronicleWidget;
pub use controls::{ConsultState, ControlsWidget};
pub use input::InputWidget;
pub use output_log::OutputLogWidget;
