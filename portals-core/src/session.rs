//! Session - the per-user context the interface drives.
//!
//! A session owns the story, the language-model connection, the last run's
//! log and the busy flag that keeps runs from overlapping. Interfaces call
//! [`Session::begin_run`] to get a [`RunTicket`], execute it (inline or on a
//! task), then hand the [`RunReport`] back with [`Session::finish_run`].

use crate::chart::{ChartProvider, Location, MeanElementEphemeris};
use crate::corpus::{Corpus, CorpusError, DEFAULT_RADIUS, MAX_LINE};
use crate::oracle::{connect_ollama, LanguageModel, ModelError};
use crate::pipeline::{Pipeline, PipelineSettings, RunOutcome, Variant, RNG_MAX};
use crate::run_log::{LogEntry, RunLog};
use crate::story::{Story, StoryError, StoryStore};
use chrono::NaiveDate;
use rand::Rng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tracing::{info, warn};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "dengcao/Qwen3-30B-A3B-Instruct-2507:latest";

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No language model configured - connect a model first")]
    BackendUnconfigured,

    #[error("A consultation is already in progress")]
    Busy,

    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Story error: {0}")]
    Store(#[from] StoryError),

    #[error("Language model error: {0}")]
    Backend(#[from] ModelError),
}

/// Configuration for opening a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path of the numbered reference text.
    pub corpus_path: PathBuf,

    /// Path of the story document.
    pub story_path: PathBuf,

    /// Which oracle variant to run.
    pub variant: Variant,

    /// Model name to connect to.
    pub model: String,

    /// Ollama host; `None` uses the client default.
    pub host: Option<String>,

    /// Lines either side of the drawn line.
    pub radius: usize,

    /// Inclusive upper bound of the draw.
    pub rng_max: u32,

    /// Highest draw that reads the corpus.
    pub max_line: u32,

    /// Date the chart is cast for; defaults to today.
    pub chart_date: Option<NaiveDate>,

    /// Where the chart is cast.
    pub location: Location,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("NumBible.TXT"),
            story_path: PathBuf::from("campaign.json"),
            variant: Variant::default(),
            model: DEFAULT_MODEL.to_string(),
            host: None,
            radius: DEFAULT_RADIUS,
            rng_max: RNG_MAX,
            max_line: MAX_LINE,
            chart_date: None,
            location: Location::default(),
        }
    }
}

impl SessionConfig {
    /// Create a config with the given corpus and story paths.
    pub fn new(corpus_path: impl Into<PathBuf>, story_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            story_path: story_path.into(),
            ..Self::default()
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = radius;
        self
    }

    /// Set the draw bounds.
    pub fn with_draw_limits(mut self, rng_max: u32, max_line: u32) -> Self {
        self.rng_max = rng_max;
        self.max_line = max_line;
        self
    }

    pub fn with_chart_date(mut self, date: NaiveDate) -> Self {
        self.chart_date = Some(date);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            variant: self.variant,
            rng_max: self.rng_max,
            max_line: self.max_line,
            radius: self.radius,
        }
    }
}

/// Holds the busy flag for as long as it lives.
///
/// Dropping the guard clears the flag, whether the run finished, failed
/// or panicked.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Permission to execute one run, plus everything the run needs.
///
/// The chart date is not captured here; the run reads the session's current
/// date when it reaches the chart stage.
pub struct RunTicket {
    pipeline: Pipeline,
    story: Story,
    date: watch::Receiver<NaiveDate>,
    _guard: BusyGuard,
}

impl RunTicket {
    /// Stage 1: pick the number for this run.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.pipeline.draw(rng)
    }

    /// Run the remaining stages for `draw`.
    ///
    /// Entries are mirrored to `progress` as they are logged. The busy flag
    /// is released when this returns.
    pub async fn execute(self, draw: u32, progress: Option<UnboundedSender<LogEntry>>) -> RunReport {
        let RunTicket {
            pipeline,
            mut story,
            date,
            _guard,
        } = self;

        let mut log = match progress {
            Some(tx) => RunLog::with_progress(tx),
            None => RunLog::new(),
        };

        let outcome = pipeline.consult(draw, &mut story, &date, &mut log).await;

        RunReport {
            outcome,
            log: log.into_entries(),
            story,
        }
    }
}

/// The result of an executed ticket.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub log: Vec<LogEntry>,
    /// The story after the run; unchanged unless a chapter was written.
    pub story: Story,
}

/// A user session.
pub struct Session {
    config: SessionConfig,
    corpus: Arc<Corpus>,
    store: Arc<StoryStore>,
    chart: Arc<dyn ChartProvider>,
    model: Option<Arc<dyn LanguageModel>>,
    story: Story,
    log: Vec<LogEntry>,
    busy: Arc<AtomicBool>,
    chart_date: watch::Sender<NaiveDate>,
}

impl Session {
    /// Open a session: check the corpus exists and load (or create) the story.
    ///
    /// No model is connected yet; call [`Session::connect`] or
    /// [`Session::set_model`].
    pub async fn open(config: SessionConfig) -> Result<Self, SessionError> {
        let corpus = Corpus::open(&config.corpus_path)?;
        let store = StoryStore::new(&config.story_path, config.variant.initial_story());
        let story = store.load().await?;

        let chart_date = config
            .chart_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let chart = Arc::new(MeanElementEphemeris::new(config.location.clone()));

        info!(
            corpus = %config.corpus_path.display(),
            story = %config.story_path.display(),
            variant = %config.variant,
            chapters = story.len(),
            "session opened"
        );

        Ok(Self {
            config,
            corpus: Arc::new(corpus),
            store: Arc::new(store),
            chart,
            model: None,
            story,
            log: Vec::new(),
            busy: Arc::new(AtomicBool::new(false)),
            chart_date: watch::Sender::new(chart_date),
        })
    }

    /// Replace the chart source.
    pub fn with_chart_provider(mut self, chart: Arc<dyn ChartProvider>) -> Self {
        self.chart = chart;
        self
    }

    /// Connect to `model` on the configured Ollama host.
    ///
    /// On failure the session is left without a model.
    pub async fn connect(&mut self, model: &str) -> Result<(), SessionError> {
        self.model = None;
        match connect_ollama(self.config.host.as_deref(), model).await {
            Ok(client) => {
                self.config.model = model.to_string();
                self.model = Some(client);
                Ok(())
            }
            Err(e) => {
                warn!(model, error = %e, "failed to connect");
                Err(e.into())
            }
        }
    }

    /// Install an already-connected model.
    pub fn set_model(&mut self, model: Arc<dyn LanguageModel>) {
        self.model = Some(model);
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_ref().map(|m| m.name())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Messages from the most recent run.
    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn chart_date(&self) -> NaiveDate {
        *self.chart_date.borrow()
    }

    /// Change the chart date. A run already in flight picks it up if it has
    /// not yet reached the chart stage.
    pub fn set_chart_date(&mut self, date: NaiveDate) {
        self.chart_date.send_replace(date);
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether a run may be started right now.
    pub fn can_consult(&self) -> bool {
        self.is_configured() && !self.is_busy()
    }

    /// Claim the busy flag and package up a run.
    ///
    /// Clears the previous run's log. Fails without side effects if no
    /// model is configured or a run is already in flight.
    pub fn begin_run(&mut self) -> Result<RunTicket, SessionError> {
        let model = self.model.clone().ok_or(SessionError::BackendUnconfigured)?;
        let guard = BusyGuard::acquire(&self.busy).ok_or(SessionError::Busy)?;

        self.log.clear();

        let pipeline = Pipeline::new(
            model,
            self.corpus.clone(),
            self.store.clone(),
            self.config.pipeline_settings(),
        )
        .with_chart(self.chart.clone());

        Ok(RunTicket {
            pipeline,
            story: self.story.clone(),
            date: self.chart_date.subscribe(),
            _guard: guard,
        })
    }

    /// Take in the result of an executed ticket.
    pub fn finish_run(&mut self, report: RunReport) -> RunOutcome {
        self.story = report.story;
        self.log = report.log;
        report.outcome
    }

    /// Begin, execute and finish one run with a random draw.
    pub async fn consult<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RunOutcome, SessionError> {
        let ticket = self.begin_run()?;
        let draw = ticket.draw(rng);
        let report = ticket.execute(draw, None).await;
        Ok(self.finish_run(report))
    }

    /// Begin, execute and finish one run with a fixed draw.
    pub async fn consult_with_draw(&mut self, draw: u32) -> Result<RunOutcome, SessionError> {
        let ticket = self.begin_run()?;
        let report = ticket.execute(draw, None).await;
        Ok(self.finish_run(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_corpus, ScriptedModel};
    use tempfile::TempDir;

    async fn open_session(dir: &TempDir, variant: Variant) -> Session {
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(&corpus, numbered_corpus(50)).unwrap();
        let config = SessionConfig::new(corpus, dir.path().join("campaign.json"))
            .with_variant(variant)
            .with_chart_date(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        Session::open(config).await.unwrap()
    }

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = BusyGuard::acquire(&flag).unwrap();
        assert!(flag.load(Ordering::Acquire));
        assert!(BusyGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(!flag.load(Ordering::Acquire));
        assert!(BusyGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new("c.txt", "s.json")
            .with_variant(Variant::Celestial)
            .with_model("llama3")
            .with_host("http://box:11434")
            .with_radius(2)
            .with_draw_limits(100, 10);

        assert_eq!(config.variant, Variant::Celestial);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.host.as_deref(), Some("http://box:11434"));
        let settings = config.pipeline_settings();
        assert_eq!(settings.radius, 2);
        assert_eq!(settings.rng_max, 100);
        assert_eq!(settings.max_line, 10);
    }

    #[tokio::test]
    async fn test_open_fails_without_corpus() {
        let dir = TempDir::new().unwrap();
        let config = SessionConfig::new(dir.path().join("missing.txt"), dir.path().join("s.json"));
        let result = Session::open(config).await;
        assert!(matches!(result, Err(SessionError::Corpus(CorpusError::Unavailable { .. }))));
    }

    #[tokio::test]
    async fn test_open_seeds_story_per_variant() {
        let dir = TempDir::new().unwrap();
        let session = open_session(&dir, Variant::Scripture).await;
        assert_eq!(session.story().len(), 1);

        let dir = TempDir::new().unwrap();
        let session = open_session(&dir, Variant::Celestial).await;
        assert!(session.story().is_empty());
    }

    #[tokio::test]
    async fn test_begin_run_requires_model() {
        let dir = TempDir::new().unwrap();
        let mut session = open_session(&dir, Variant::Scripture).await;

        assert!(!session.can_consult());
        assert!(matches!(session.begin_run(), Err(SessionError::BackendUnconfigured)));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_second_begin_run_is_rejected_while_first_is_alive() {
        let dir = TempDir::new().unwrap();
        let mut session = open_session(&dir, Variant::Scripture).await;
        session.set_model(Arc::new(ScriptedModel::new(Vec::new())));

        let ticket = session.begin_run().unwrap();
        assert!(session.is_busy());
        assert!(!session.can_consult());
        assert!(matches!(session.begin_run(), Err(SessionError::Busy)));

        drop(ticket);
        assert!(session.can_consult());
        assert!(session.begin_run().is_ok());
    }

    #[tokio::test]
    async fn test_begin_run_clears_previous_log() {
        let dir = TempDir::new().unwrap();
        let mut session = open_session(&dir, Variant::Scripture).await;
        session.set_model(Arc::new(ScriptedModel::new(Vec::new())));

        session.consult_with_draw(RNG_MAX).await.unwrap();
        assert_eq!(session.log().len(), 2);

        let _ticket = session.begin_run().unwrap();
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn test_chart_date_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut session = open_session(&dir, Variant::Celestial).await;
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        session.set_chart_date(date);
        assert_eq!(session.chart_date(), date);
    }
}
