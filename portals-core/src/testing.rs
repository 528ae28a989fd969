//! Testing utilities.
//!
//! This module provides deterministic stand-ins for the external oracles:
//! - `ScriptedModel` replays canned replies and records every prompt
//! - `FixedChart` returns the same chart report for any date
//! - `numbered_corpus` builds corpus text whose lines name their index

use crate::chart::{ChartError, ChartProvider, ChartReport};
use crate::oracle::{LanguageModel, ModelError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A scripted reply from the mock model.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text.
    Text(String),
    /// Fail the call with this message.
    Failure(String),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Text(text.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ScriptedReply::Failure(message.into())
    }
}

/// A language model that returns scripted replies in order.
///
/// Once the script runs out every call fails.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a script of plain text replies.
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(ScriptedReply::text).collect())
    }

    /// Add a reply to the end of the script.
    pub fn queue(&self, reply: ScriptedReply) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Every prompt received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let next = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match next {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure(message)) => Err(ModelError::Unavailable(message)),
            None => Err(ModelError::Unavailable("no more scripted replies".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A chart provider that ignores the date.
#[derive(Debug, Clone, Default)]
pub struct FixedChart {
    report: ChartReport,
}

impl FixedChart {
    pub fn new(report: ChartReport) -> Self {
        Self { report }
    }
}

impl ChartProvider for FixedChart {
    fn compute(&self, _date: NaiveDate) -> Result<ChartReport, ChartError> {
        Ok(self.report.clone())
    }
}

/// Corpus text of `count` lines, `line 0` through `line {count-1}`.
pub fn numbered_corpus(count: usize) -> String {
    (0..count).map(|i| format!("line {i}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::AspectRecord;

    #[tokio::test]
    async fn test_scripted_model_replays_in_order() {
        let model = ScriptedModel::replying(["one", "two"]);
        assert_eq!(model.generate("a").await.unwrap(), "one");
        assert_eq!(model.generate("b").await.unwrap(), "two");
        assert!(model.generate("c").await.is_err());
        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = ScriptedModel::new(vec![ScriptedReply::failure("connection reset")]);
        let err = model.generate("x").await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_queue_extends_script() {
        let model = ScriptedModel::new(Vec::new());
        model.queue(ScriptedReply::text("late"));
        assert_eq!(model.remaining(), 1);
        assert_eq!(model.generate("x").await.unwrap(), "late");
        assert_eq!(model.call_count(), 1);
    }

    #[test]
    fn test_fixed_chart() {
        let chart = FixedChart::new(ChartReport {
            header: "h".into(),
            aspects: vec![AspectRecord::new("Sun", "trine", "Moon", 0.5)],
        });
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(chart.compute(date).unwrap().aspects.len(), 1);
    }

    #[test]
    fn test_numbered_corpus() {
        let text = numbered_corpus(3);
        assert_eq!(text, "line 0\nline 1\nline 2\n");
    }
}
