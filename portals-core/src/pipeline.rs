//! The consultation pipeline.
//!
//! One run is five strictly sequential stages:
//!
//! 1. Draw a number in `0..=rng_max`. Draws past `max_line` end the run.
//! 2. Read the corpus window around the drawn line.
//! 3. Ask the model whether the verse resonates with the last chapter.
//! 4. Ask the model which kind of story element the verse inspires.
//! 5. Ask the model for the next chapter, append it and save the story.
//!
//! The draw space is deliberately much larger than the corpus, so most runs
//! end silently at stage 1.

use crate::chart::{reduce_to_major_aspects, ChartError, ChartProvider};
use crate::corpus::{Corpus, CorpusError, DEFAULT_RADIUS, MAX_LINE};
use crate::oracle::{LanguageModel, ModelError};
use crate::prompts::{chapter_prompt, entity_prompt, resonance_prompt, RESONANCE_MARKER};
use crate::run_log::{LogKind, RunLog};
use crate::sanitize::strip_deliberation;
use crate::story::{Chapter, Story, StoryError, StoryStore};
use chrono::NaiveDate;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Upper bound (inclusive) of the random draw.
pub const RNG_MAX: u32 = 1_000_000;

const OUT_OF_RANGE_MESSAGE: &str =
    "The number is outside the sacred texts. The oracle offers no guidance. Try again.";
const NO_RESONANCE_MESSAGE: &str =
    "The heavens are silent. The verse holds no meaning for your current path. Consult the oracle again.";
const BOOTSTRAP_MESSAGE: &str =
    "Analysis: The story has no chapters yet, so the verse is taken as its first omen.";
const SUCCESS_MESSAGE: &str = "The vision is clear! Your story progresses.";

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    #[error("Language model error: {0}")]
    Backend(#[from] ModelError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Story error: {0}")]
    Store(#[from] StoryError),

    #[error("The model returned an empty chapter")]
    EmptyChapter,

    #[error("No chart source configured for the celestial oracle")]
    ChartUnavailable,
}

/// Which flavour of oracle is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// Corpus only; the story starts from a fixed opening chapter.
    #[default]
    Scripture,
    /// Corpus plus an astrological chart; the story starts empty and model
    /// deliberation spans are stripped.
    Celestial,
}

impl Variant {
    pub fn uses_chart(self) -> bool {
        matches!(self, Variant::Celestial)
    }

    /// The story written out when no document exists yet.
    pub fn initial_story(self) -> Story {
        match self {
            Variant::Scripture => Story::seeded(),
            Variant::Celestial => Story::new(crate::story::DEFAULT_TITLE),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Scripture => write!(f, "scripture"),
            Variant::Celestial => write!(f, "celestial"),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scripture" | "classic" => Ok(Variant::Scripture),
            "celestial" | "astral" => Ok(Variant::Celestial),
            other => Err(format!("unknown variant '{other}' (expected scripture or celestial)")),
        }
    }
}

/// Numeric knobs of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub variant: Variant,
    pub rng_max: u32,
    pub max_line: u32,
    pub radius: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            rng_max: RNG_MAX,
            max_line: MAX_LINE,
            radius: DEFAULT_RADIUS,
        }
    }
}

/// The resonance verdict for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resonance {
    /// The story was empty, so the check was skipped.
    Assumed,
    High { response: String },
    Low { response: String },
}

impl Resonance {
    fn from_response(response: String) -> Self {
        if response.contains(RESONANCE_MARKER) {
            Resonance::High { response }
        } else {
            Resonance::Low { response }
        }
    }

    pub fn is_resonant(&self) -> bool {
        !matches!(self, Resonance::Low { .. })
    }
}

/// Everything a single run produced. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub draw: u32,
    pub paragraph: String,
    pub resonance: Resonance,
    pub chart: Option<String>,
    /// The entity reply as received, before trimming.
    pub entity_response: Option<String>,
    pub entity: Option<String>,
    pub chapter: Option<Chapter>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The draw landed past the end of the corpus.
    OutOfRange { draw: u32 },
    /// The verse did not fit the story.
    NoResonance(PipelineRun),
    /// A chapter was appended and saved.
    ChapterWritten(PipelineRun),
    /// A stage failed; the story is unchanged.
    Failed { reason: String },
}

impl RunOutcome {
    pub fn chapter(&self) -> Option<&Chapter> {
        match self {
            RunOutcome::ChapterWritten(run) => run.chapter.as_ref(),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

/// The collaborators a run needs.
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn LanguageModel>,
    corpus: Arc<Corpus>,
    store: Arc<StoryStore>,
    chart: Option<Arc<dyn ChartProvider>>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        corpus: Arc<Corpus>,
        store: Arc<StoryStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            model,
            corpus,
            store,
            chart: None,
            settings,
        }
    }

    /// Set the chart source. Required by the celestial variant.
    pub fn with_chart(mut self, chart: Arc<dyn ChartProvider>) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Stage 1: draw uniformly from `0..=rng_max`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(0..=self.settings.rng_max)
    }

    /// Run every stage after the draw, catching any failure.
    ///
    /// Failures are logged as an error entry and reported as
    /// [`RunOutcome::Failed`]; `story` is only replaced once the new chapter
    /// has been saved. `date` is read when the chart is computed, so a date
    /// changed while earlier stages run still applies.
    pub async fn consult(
        &self,
        draw: u32,
        story: &mut Story,
        date: &watch::Receiver<NaiveDate>,
        log: &mut RunLog,
    ) -> RunOutcome {
        let span = info_span!("consult", run_id = %Uuid::new_v4(), draw);
        async {
            match self.run(draw, story, date, log).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "run failed");
                    log.push(LogKind::Error, format!("The oracle faltered: {e}"));
                    RunOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run every stage after the draw, propagating failures.
    pub async fn run(
        &self,
        draw: u32,
        story: &mut Story,
        date: &watch::Receiver<NaiveDate>,
        log: &mut RunLog,
    ) -> Result<RunOutcome, PipelineError> {
        log.push(
            LogKind::Draw,
            format!("The heavens spin... a number is chosen: {draw}"),
        );

        if draw > self.settings.max_line {
            info!(draw, max_line = self.settings.max_line, "draw outside corpus");
            log.push(LogKind::Silence, OUT_OF_RANGE_MESSAGE);
            return Ok(RunOutcome::OutOfRange { draw });
        }

        let paragraph = self.corpus.read_window(draw, self.settings.radius).await?;
        log.push(
            LogKind::Verse,
            format!("A verse is revealed (from line ~{draw}):\n\n{}", paragraph.trim()),
        );

        let resonance = match story.last() {
            None => {
                log.push(LogKind::Analysis, BOOTSTRAP_MESSAGE);
                Resonance::Assumed
            }
            Some(last) => {
                let response = self.ask(&resonance_prompt(&paragraph, &last.content)).await?;
                debug!(response = %response, "resonance response");
                log.push(LogKind::Analysis, format!("Analysis: {}", response.trim()));
                Resonance::from_response(response)
            }
        };

        let mut run = PipelineRun {
            draw,
            paragraph,
            resonance,
            chart: None,
            entity_response: None,
            entity: None,
            chapter: None,
        };

        if !run.resonance.is_resonant() {
            info!("no resonance");
            log.push(LogKind::Silence, NO_RESONANCE_MESSAGE);
            return Ok(RunOutcome::NoResonance(run));
        }

        if self.settings.variant.uses_chart() {
            let provider = self.chart.as_ref().ok_or(PipelineError::ChartUnavailable)?;
            let date = *date.borrow();
            let reduced = reduce_to_major_aspects(&provider.compute(date)?);
            log.push(LogKind::Chart, format!("The stars are read for {date}:\n\n{}", reduced.trim_end()));
            run.chart = Some(reduced);
        }

        let entity_response = self
            .ask(&entity_prompt(&run.paragraph, run.chart.as_deref()))
            .await?;
        debug!(response = %entity_response, "entity response");
        let entity = entity_response.trim().to_string();
        log.push(LogKind::Inspiration, format!("The verse inspires a new {entity}."));
        run.entity_response = Some(entity_response);

        let history = (!story.is_empty()).then(|| story.history());
        let drafted = self
            .ask(&chapter_prompt(
                history.as_deref(),
                &run.paragraph,
                &entity,
                run.chart.as_deref(),
            ))
            .await?;
        let content = drafted.trim();
        if content.is_empty() {
            return Err(PipelineError::EmptyChapter);
        }

        let mut next = story.clone();
        let chapter = next.append(content).clone();
        self.store.save(&next).await?;
        *story = next;

        info!(chapter = chapter.chapter_num, entity = %entity, "chapter written");
        log.push(LogKind::Success, SUCCESS_MESSAGE);

        run.entity = Some(entity);
        run.chapter = Some(chapter);
        Ok(RunOutcome::ChapterWritten(run))
    }

    /// Send one prompt, stripping deliberation spans in the celestial variant.
    async fn ask(&self, prompt: &str) -> Result<String, ModelError> {
        let response = self.model.generate(prompt).await?;
        Ok(match self.settings.variant {
            Variant::Celestial => strip_deliberation(&response),
            Variant::Scripture => response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{numbered_corpus, FixedChart, ScriptedModel};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_variant_parse_and_display() {
        assert_eq!("scripture".parse::<Variant>().unwrap(), Variant::Scripture);
        assert_eq!("Celestial".parse::<Variant>().unwrap(), Variant::Celestial);
        assert!("lunar".parse::<Variant>().is_err());
        assert_eq!(Variant::Celestial.to_string(), "celestial");
    }

    #[test]
    fn test_variant_initial_story() {
        assert_eq!(Variant::Scripture.initial_story().len(), 1);
        assert!(Variant::Celestial.initial_story().is_empty());
    }

    #[test]
    fn test_resonance_is_substring_and_case_sensitive() {
        assert!(Resonance::from_response("High Resonance".into()).is_resonant());
        assert!(Resonance::from_response("Verdict: High Resonance, clearly.".into()).is_resonant());
        assert!(!Resonance::from_response("high resonance".into()).is_resonant());
        assert!(!Resonance::from_response("Low Resonance".into()).is_resonant());
        assert!(Resonance::Assumed.is_resonant());
    }

    fn pipeline_in(dir: &tempfile::TempDir, model: Arc<ScriptedModel>, settings: PipelineSettings) -> Pipeline {
        let corpus_path = dir.path().join("corpus.txt");
        std::fs::write(&corpus_path, numbered_corpus(20)).unwrap();

        Pipeline::new(
            model,
            Arc::new(Corpus::open(&corpus_path).unwrap()),
            Arc::new(StoryStore::new(dir.path().join("story.json"), Story::seeded())),
            settings,
        )
    }

    #[test]
    fn test_draw_stays_in_range() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::new(Vec::new()));
        let pipeline = pipeline_in(
            &dir,
            model,
            PipelineSettings {
                rng_max: 10,
                ..PipelineSettings::default()
            },
        );

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(pipeline.draw(&mut rng) <= 10);
        }
    }

    #[tokio::test]
    async fn test_celestial_without_chart_source_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::replying(["Character", "A chapter."]));
        let pipeline = pipeline_in(
            &dir,
            model.clone(),
            PipelineSettings {
                variant: Variant::Celestial,
                ..PipelineSettings::default()
            },
        );

        let (_tx, date) = watch::channel(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        let mut story = Story::new("Empty");
        let mut log = RunLog::new();

        let result = pipeline.run(3, &mut story, &date, &mut log).await;
        assert!(matches!(result, Err(PipelineError::ChartUnavailable)));
        assert!(story.is_empty());
        assert_eq!(model.call_count(), 0);
        assert!(!dir.path().join("story.json").exists());
    }

    #[tokio::test]
    async fn test_chart_date_read_when_chart_is_computed() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::replying(["Omen", "It begins."]));
        let pipeline = pipeline_in(
            &dir,
            model,
            PipelineSettings {
                variant: Variant::Celestial,
                ..PipelineSettings::default()
            },
        )
        .with_chart(Arc::new(FixedChart::default()));

        let (tx, date) = watch::channel(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
        tx.send_replace(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());

        let mut story = Story::new("Empty");
        let mut log = RunLog::new();
        let outcome = pipeline.run(3, &mut story, &date, &mut log).await.unwrap();

        assert!(outcome.chapter().is_some());
        let chart_entry = log
            .entries()
            .iter()
            .find(|e| e.kind == LogKind::Chart)
            .unwrap();
        assert!(chart_entry.text.contains("2001-01-01"));
    }
}
