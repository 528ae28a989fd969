//! Oracle-driven serialized story engine.
//!
//! This crate provides:
//! - Random passage lookup in a large numbered reference text
//! - A five-stage pipeline that asks a language model whether a passage
//!   resonates with the story, and if so writes the next chapter
//! - An optional astrological chart as a second source of inspiration
//! - Story persistence in a single JSON document
//!
//! # Quick Start
//!
//! ```ignore
//! use portals_core::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("NumBible.TXT", "campaign.json");
//!     let mut session = Session::open(config).await?;
//!     session.connect("llama3").await?;
//!
//!     let outcome = session.consult(&mut rand::thread_rng()).await?;
//!     for entry in session.log() {
//!         println!("{}", entry.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod chart;
pub mod corpus;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod run_log;
pub mod sanitize;
pub mod session;
pub mod story;
pub mod testing;

// Primary public API
pub use chart::{reduce_to_major_aspects, AspectRecord, ChartProvider, ChartReport, Location};
pub use corpus::{Corpus, CorpusError, MAX_LINE};
pub use oracle::{LanguageModel, ModelError};
pub use pipeline::{Pipeline, PipelineError, PipelineRun, Resonance, RunOutcome, Variant, RNG_MAX};
pub use run_log::{LogEntry, LogKind, RunLog};
pub use session::{RunReport, RunTicket, Session, SessionConfig, SessionError};
pub use story::{Chapter, Story, StoryStore};
pub use testing::{FixedChart, ScriptedModel, ScriptedReply};
