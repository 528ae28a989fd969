//! Cleanup of raw model output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker opening a model's internal deliberation.
pub const THINK_OPEN: &str = "<think>";

/// Marker closing a model's internal deliberation.
pub const THINK_CLOSE: &str = "</think>";

static DELIBERATION: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        "(?s){}.*?{}",
        regex::escape(THINK_OPEN),
        regex::escape(THINK_CLOSE)
    );
    Regex::new(&pattern).expect("deliberation pattern is valid")
});

/// Remove every `<think>...</think>` span, markers included.
///
/// Spans may cross line breaks. An opening marker with no matching close is
/// left as-is.
pub fn strip_deliberation(text: &str) -> String {
    DELIBERATION.replace_all(text, "").into_owned()
}
