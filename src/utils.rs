//! Small shared helpers: operation timing and text helpers for logging.

use std::time::Instant;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Scoped timer that logs elapsed time on drop
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.start.elapsed().as_millis()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("{} took {}ms", self.label, self.elapsed_ms());
    }
}

/// Word count by Unicode word boundaries
pub fn word_count(text: &str) -> usize {
    text.unicode_words().count()
}

/// Truncate text to `max_chars` characters for log output, appending an
/// ellipsis when anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}…", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_leaves_short_text_alone() {
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        assert_eq!(preview("abcdef", 3), "abc…");
        assert_eq!(preview("αβγδ", 2), "αβ…");
    }

    #[test]
    fn word_count_uses_unicode_boundaries() {
        assert_eq!(word_count("the lessor, and the lessee"), 5);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn timer_reports_elapsed() {
        let timer = Timer::start("noop");
        assert!(timer.elapsed_ms() < 1000);
    }
}
