use serde::{Deserialize, Serialize};

pub const MAX_TITLE_LENGTH: usize = 120;
pub const MAX_PROMPT_TEXT_LENGTH: usize = 5_000;
pub const MAX_NAME_LENGTH: usize = 60;
pub const MAX_TAG_LENGTH: usize = 30;

/// How long per-address events are kept for rate limiting.
pub const IP_EVENT_RETENTION_MS: i64 = 7 * 24 * 60 * 60 * 1_000;

const DEFAULT_SUBMISSIONS_PER_WINDOW: u64 = 10;
const DEFAULT_SUBMISSION_WINDOW_MS: i64 = 60 * 60 * 1_000;

/// Case-insensitive substring blocklist applied to submitted text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentPolicy {
    banned_words: Vec<String>,
}

impl ContentPolicy {
    pub fn new<I, S>(banned_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = banned_words
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        words.sort();
        words.dedup();
        Self {
            banned_words: words,
        }
    }

    /// Parses a comma separated list such as `"spam, scam"`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn banned_words(&self) -> &[String] {
        &self.banned_words
    }

    pub fn contains_banned(&self, text: &str) -> bool {
        if self.banned_words.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.banned_words
            .iter()
            .any(|word| lower.contains(word.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionLimits {
    pub max_per_window: u64,
    pub window_ms: i64,
}

impl Default for SubmissionLimits {
    fn default() -> Self {
        Self {
            max_per_window: DEFAULT_SUBMISSIONS_PER_WINDOW,
            window_ms: DEFAULT_SUBMISSION_WINDOW_MS,
        }
    }
}

impl SubmissionLimits {
    pub fn window_start(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.window_ms)
    }

    pub fn is_exhausted(&self, recent_events: u64) -> bool {
        recent_events >= self.max_per_window
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IpEventKind {
    Submit,
}

impl IpEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IpEvent {
    pub hashed_ip: String,
    pub kind: IpEventKind,
    pub created_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case_and_surrounding_text() {
        let policy = ContentPolicy::from_csv("spam, BadWord ,");
        assert!(policy.contains_banned("Totally not SPAMMY"));
        assert!(policy.contains_banned("a badword here"));
        assert!(!policy.contains_banned("a perfectly fine prompt"));
    }

    #[test]
    fn blank_entries_are_dropped() {
        let policy = ContentPolicy::from_csv(" , ,");
        assert!(policy.banned_words().is_empty());
        assert!(!policy.contains_banned("anything"));
    }

    #[test]
    fn duplicate_words_collapse() {
        let policy = ContentPolicy::new(["Spam", "spam", " SPAM "]);
        assert_eq!(policy.banned_words(), ["spam".to_string()]);
    }

    #[test]
    fn submission_window_counts_back_from_now() {
        let limits = SubmissionLimits::default();
        assert_eq!(limits.window_start(10_000_000), 10_000_000 - 3_600_000);
        assert!(!limits.is_exhausted(9));
        assert!(limits.is_exhausted(10));
    }
}
