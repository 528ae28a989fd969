//! Portals - an oracle console and campaign chronicle.
//!
//! A terminal interface that draws random verses from a numbered text, asks
//! a local language model whether they fit the story, and grows the
//! campaign one chapter at a time.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a line-oriented interface suitable for scripting:
//!
//! ```bash
//! cargo run -p portals -- --headless --variant celestial
//! ```

mod app;
mod events;
mod headless;
mod ui;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use portals_core::session::DEFAULT_MODEL;
use portals_core::{CorpusError, Session, SessionConfig, SessionError, Variant};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::App;
use events::{handle_event, EventResult};
use ui::render::render;

/// Oracle-driven campaign generator
#[derive(Parser, Debug)]
#[command(name = "portals", version, about)]
struct Args {
    /// Run in headless mode (text-only, no TUI)
    #[arg(long)]
    headless: bool,

    /// Ollama model name
    #[arg(long, env = "PORTALS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_HOST")]
    host: Option<String>,

    /// Numbered reference text
    #[arg(long, env = "PORTALS_CORPUS", default_value = "NumBible.TXT")]
    corpus: PathBuf,

    /// Story document
    #[arg(long, env = "PORTALS_STORY", default_value = "campaign.json")]
    story: PathBuf,

    /// Oracle variant: scripture or celestial
    #[arg(long, env = "PORTALS_VARIANT", default_value = "scripture")]
    variant: Variant,

    /// Chart date (YYYY-MM-DD), defaults to today
    #[arg(long, env = "PORTALS_DATE")]
    date: Option<NaiveDate>,

    /// Diagnostics log file (TUI mode; headless logs to stderr)
    #[arg(long, env = "PORTALS_LOG_FILE", default_value = "portals.log")]
    log_file: PathBuf,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.corpus, &self.story)
            .with_variant(self.variant)
            .with_model(&self.model);
        if let Some(host) = &self.host {
            config = config.with_host(host);
        }
        if let Some(date) = self.date {
            config = config.with_chart_date(date);
        }
        config
    }
}

/// Install the tracing subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
            .init();
    } else {
        // The TUI owns the terminal, so diagnostics go to a file
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log_file)
            .with_context(|| format!("opening log file {}", args.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let session = match Session::open(args.session_config()).await {
        Ok(session) => session,
        Err(SessionError::Corpus(CorpusError::Unavailable { path })) => {
            eprintln!(
                "Error: {} not found. Please create it with numbered lines of text.",
                path.display()
            );
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("failed to open session"),
    };

    if args.headless {
        return headless::run_headless(session, &args.model).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, App::new(session, args.model.clone())).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

/// The interface event loop.
///
/// Connection attempts run inline after a status redraw. Consultations run
/// on a spawned task; their log entries are drained every tick and the
/// report is collected once the task finishes.
async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render(f, &app))?;

        if let Some(model) = app.pending_connect.take() {
            app.set_status(format!("Connecting to Ollama model '{model}'..."));
            terminal.draw(|f| render(f, &app))?;
            app.connect(&model).await;
            continue;
        }

        app.drain_progress();
        if app.run_finished() {
            app.collect_run().await;
        }

        // Poll for events with timeout for the spinner
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            match handle_event(&mut app, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            app.tick();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
