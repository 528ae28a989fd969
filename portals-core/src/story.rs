//! Story persistence.
//!
//! The story is a title plus an append-only list of numbered chapters, kept
//! in a single human-readable JSON document.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// Title given to a freshly created story.
pub const DEFAULT_TITLE: &str = "The War of the Heavens";

/// First chapter of a seeded story.
pub const OPENING_CHAPTER: &str = "You stand on the precipice of the shattered city of Aethelburg, a celestial tear shimmering in the sky above. An angelic feather, pure white, drifts down and lands at your feet. The air crackles with a divine and infernal energy. Your quest has just begun: to seal the rift before the world is consumed by the final war between heaven and hell.";

/// Errors from story persistence.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One numbered chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_num: u32,
    pub content: String,
}

/// The serialized story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    pub chapters: Vec<Chapter>,
}

impl Story {
    /// Create a story with no chapters.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            chapters: Vec::new(),
        }
    }

    /// Create the default story with its fixed opening chapter.
    pub fn seeded() -> Self {
        let mut story = Self::new(DEFAULT_TITLE);
        story.append(OPENING_CHAPTER);
        story
    }

    /// Append a chapter numbered one past the current last.
    pub fn append(&mut self, content: impl Into<String>) -> &Chapter {
        let chapter_num = self.chapters.len() as u32 + 1;
        self.chapters.push(Chapter {
            chapter_num,
            content: content.into(),
        });
        &self.chapters[self.chapters.len() - 1]
    }

    pub fn last(&self) -> Option<&Chapter> {
        self.chapters.last()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// All chapter texts in order, one per line.
    pub fn history(&self) -> String {
        self.chapters
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether chapter numbers run `1..=len` in order.
    pub fn is_contiguous(&self) -> bool {
        self.chapters
            .iter()
            .enumerate()
            .all(|(i, c)| c.chapter_num as usize == i + 1)
    }
}

/// Reads and writes the story document.
#[derive(Debug, Clone)]
pub struct StoryStore {
    path: PathBuf,
    template: Story,
}

impl StoryStore {
    /// Create a store at `path`. `template` is written out whenever the
    /// document is missing or unreadable.
    pub fn new(path: impl AsRef<Path>, template: Story) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            template,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the story, reinitialising the document if it is absent or corrupt.
    ///
    /// A document whose chapter numbers do not run `1..=len` counts as corrupt.
    pub async fn load(&self) -> Result<Story, StoryError> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Story>(&bytes) {
                Ok(story) if story.is_contiguous() => return Ok(story),
                Ok(_) => {
                    warn!(path = %self.path.display(), "story chapters misnumbered, reinitialising");
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "story document corrupt, reinitialising");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no story document, creating one");
            }
            Err(e) => return Err(e.into()),
        }

        let story = self.template.clone();
        self.save(&story).await?;
        Ok(story)
    }

    /// Overwrite the document with `story`.
    pub async fn save(&self, story: &Story) -> Result<(), StoryError> {
        let content = serde_json::to_string_pretty(story)?;
        fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_numbers_sequentially() {
        let mut story = Story::new("Test");
        assert_eq!(story.append("one").chapter_num, 1);
        assert_eq!(story.append("two").chapter_num, 2);
        assert_eq!(story.append("three").chapter_num, 3);
        assert!(story.is_contiguous());
        assert_eq!(story.last().unwrap().content, "three");
    }

    #[test]
    fn test_seeded_story() {
        let story = Story::seeded();
        assert_eq!(story.title, DEFAULT_TITLE);
        assert_eq!(story.len(), 1);
        assert_eq!(story.chapters[0].chapter_num, 1);
        assert_eq!(story.chapters[0].content, OPENING_CHAPTER);
    }

    #[test]
    fn test_history_joins_with_newlines() {
        let mut story = Story::new("Test");
        assert_eq!(story.history(), "");
        story.append("first");
        story.append("second");
        assert_eq!(story.history(), "first\nsecond");
    }

    #[test]
    fn test_json_field_names() {
        let story = Story::seeded();
        let json = serde_json::to_value(&story).unwrap();
        assert_eq!(json["title"], DEFAULT_TITLE);
        assert_eq!(json["chapters"][0]["chapter_num"], 1);
        assert!(json["chapters"][0]["content"].is_string());
    }

    #[tokio::test]
    async fn test_load_creates_missing_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaign.json");
        let store = StoryStore::new(&path, Story::seeded());

        let story = store.load().await.unwrap();
        assert_eq!(story, Story::seeded());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_load_recovers_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaign.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = StoryStore::new(&path, Story::new(DEFAULT_TITLE));
        let story = store.load().await.unwrap();
        assert!(story.is_empty());

        let on_disk: Story = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, story);
    }

    #[tokio::test]
    async fn test_load_recovers_non_utf8_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaign.json");
        std::fs::write(&path, [0xff, 0xfe, 0x7b, 0x00, 0xc3]).unwrap();

        let store = StoryStore::new(&path, Story::seeded());
        let story = store.load().await.unwrap();
        assert_eq!(story, Story::seeded());

        let on_disk: Story = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, story);
    }

    #[tokio::test]
    async fn test_load_rejects_misnumbered_chapters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaign.json");
        std::fs::write(
            &path,
            r#"{"title":"Gaps","chapters":[{"chapter_num":1,"content":"A"},{"chapter_num":3,"content":"B"}]}"#,
        )
        .unwrap();

        let store = StoryStore::new(&path, Story::seeded());
        let mut story = store.load().await.unwrap();
        assert_eq!(story, Story::seeded());
        assert_eq!(story.append("next").chapter_num, 2);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaign.json");
        let store = StoryStore::new(&path, Story::seeded());

        let mut story = store.load().await.unwrap();
        story.append("The rift widens.");
        store.save(&story).await.unwrap();

        assert_eq!(store.load().await.unwrap(), story);
    }

    #[tokio::test]
    async fn test_load_reads_document_written_by_hand() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("campaign.json");
        std::fs::write(
            &path,
            r#"{
    "title": "Custom",
    "chapters": [
        {"chapter_num": 1, "content": "Once."}
    ]
}"#,
        )
        .unwrap();

        let store = StoryStore::new(&path, Story::seeded());
        let story = store.load().await.unwrap();
        assert_eq!(story.title, "Custom");
        assert_eq!(story.chapters[0].content, "Once.");
    }
}
