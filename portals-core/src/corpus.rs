//! Reference corpus access.
//!
//! The corpus is a flat, newline-delimited text file. Passages are read as a
//! window of lines around a target index.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// Highest line index a draw may land on.
pub const MAX_LINE: u32 = 100_117;

/// Lines taken on each side of the target line.
pub const DEFAULT_RADIUS: usize = 5;

/// Errors from corpus access.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Corpus file not found: {}", path.display())]
    Unavailable { path: PathBuf },

    #[error("IO error reading corpus: {0}")]
    Io(#[from] std::io::Error),
}

/// A read-only handle to the corpus file.
#[derive(Debug, Clone)]
pub struct Corpus {
    path: PathBuf,
}

impl Corpus {
    /// Open the corpus, failing if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(CorpusError::Unavailable { path });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the lines `line_index - radius ..= line_index + radius`, clipped
    /// to the file.
    ///
    /// The whole file is re-read on each call so edits to the corpus are
    /// picked up without restarting.
    pub async fn read_window(&self, line_index: u32, radius: usize) -> Result<String, CorpusError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CorpusError::Unavailable {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let paragraph = window(&text, line_index as usize, radius);
        debug!(line_index, bytes = paragraph.len(), "read corpus window");
        Ok(paragraph)
    }
}

/// Slice `radius` lines either side of `line_index` out of `text`.
///
/// Line terminators are kept, so the result is a verbatim substring of the
/// input. An index past the end yields an empty string.
pub fn window(text: &str, line_index: usize, radius: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();

    let start = line_index.saturating_sub(radius).min(lines.len());
    let end = line_index
        .saturating_add(radius)
        .saturating_add(1)
        .min(lines.len());

    if start >= end {
        return String::new();
    }
    lines[start..end].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> String {
        (0..count).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_window_centered() {
        let text = numbered(100);
        let w = window(&text, 50, 5);
        let lines: Vec<&str> = w.lines().collect();

        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "line 45");
        assert_eq!(lines[5], "line 50");
        assert_eq!(lines[10], "line 55");
    }

    #[test]
    fn test_window_every_interior_index_has_eleven_lines() {
        let text = numbered(40);
        for i in 5..=34 {
            assert_eq!(window(&text, i, 5).lines().count(), 11, "index {i}");
        }
    }

    #[test]
    fn test_window_clipped_at_start() {
        let text = numbered(100);
        let w = window(&text, 2, 5);
        let lines: Vec<&str> = w.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[7], "line 7");
    }

    #[test]
    fn test_window_clipped_at_end() {
        let text = numbered(100);
        let w = window(&text, 97, 5);
        let lines: Vec<&str> = w.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "line 92");
        assert_eq!(lines[7], "line 99");
    }

    #[test]
    fn test_window_at_length_keeps_tail() {
        // Index equal to the line count still reaches back into the file
        let text = numbered(20);
        let w = window(&text, 20, 5);
        assert_eq!(w.lines().count(), 5);
        assert!(w.starts_with("line 15\n"));
    }

    #[test]
    fn test_window_past_end_is_empty() {
        let text = numbered(20);
        assert_eq!(window(&text, 26, 5), "");
        assert_eq!(window(&text, 1_000, 5), "");
    }

    #[test]
    fn test_window_preserves_terminators() {
        let text = "a\r\nb\nc";
        assert_eq!(window(text, 1, 1), "a\r\nb\nc");
        assert_eq!(window(text, 0, 0), "a\r\n");
    }

    #[test]
    fn test_window_empty_text() {
        assert_eq!(window("", 0, 5), "");
    }

    #[test]
    fn test_open_missing_file() {
        let result = Corpus::open("/definitely/not/here.txt");
        assert!(matches!(result, Err(CorpusError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_read_window_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, numbered(30)).unwrap();

        let corpus = Corpus::open(&path).unwrap();
        let paragraph = corpus.read_window(10, DEFAULT_RADIUS).await.unwrap();
        assert_eq!(paragraph.lines().count(), 11);
        assert!(paragraph.starts_with("line 5\n"));
    }

    #[tokio::test]
    async fn test_read_window_after_file_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("corpus.txt");
        std::fs::write(&path, numbered(30)).unwrap();

        let corpus = Corpus::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let result = corpus.read_window(10, DEFAULT_RADIUS).await;
        assert!(matches!(result, Err(CorpusError::Unavailable { .. })));
    }
}
