use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::policy::{
    ContentPolicy, IpEvent, IpEventKind, MAX_NAME_LENGTH, MAX_PROMPT_TEXT_LENGTH, MAX_TAG_LENGTH,
    MAX_TITLE_LENGTH, SubmissionLimits,
};
use crate::ports::bans::BanRepository;
use crate::ports::ip_events::IpEventRepository;
use crate::ports::prompts::{PromptRepository, PromptRepositoryQuery};
use crate::ranking::hot_score;

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;
pub const FEED_LIMIT: usize = 100;

const DAY_MS: i64 = 24 * 60 * 60 * 1_000;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub prompt_id: String,
    pub title: String,
    pub prompt_text: String,
    pub name: String,
    pub tag: Option<String>,
    pub votes_count: u64,
    pub score_cached: f64,
    pub edit_token: String,
    pub author_hashed_ip: String,
    pub is_deleted: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Validated user-editable fields of a prompt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptContent {
    pub title: String,
    pub prompt_text: String,
    pub name: String,
    pub tag: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PromptCreate {
    pub title: String,
    pub prompt_text: String,
    pub name: String,
    pub tag: Option<String>,
    /// Hidden form field; humans leave it empty.
    pub honeypot: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct PromptEdit {
    pub edit_token: String,
    pub title: String,
    pub prompt_text: String,
    pub name: String,
    pub tag: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PromptSort {
    #[default]
    Hot,
    New,
    Top,
}

impl PromptSort {
    /// Descending by the sort key, then newest first, then by id.
    pub fn compare(&self, left: &Prompt, right: &Prompt) -> Ordering {
        let primary = match self {
            Self::Hot => right.score_cached.total_cmp(&left.score_cached),
            Self::New => Ordering::Equal,
            Self::Top => right.votes_count.cmp(&left.votes_count),
        };
        primary
            .then_with(|| right.created_at_ms.cmp(&left.created_at_ms))
            .then_with(|| right.prompt_id.cmp(&left.prompt_id))
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TopRange {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "24h")]
    Day,
}

impl TopRange {
    pub fn cutoff_ms(&self, now_ms: i64) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Week => Some(now_ms - 7 * DAY_MS),
            Self::Day => Some(now_ms - DAY_MS),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptListQuery {
    pub sort: PromptSort,
    pub range: TopRange,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PromptListQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .min(MAX_LIST_LIMIT)
    }

    fn to_repository_query(&self, now_ms: i64) -> PromptRepositoryQuery {
        // Time windows only narrow the all-time vote leaderboard.
        let created_after_ms = match self.sort {
            PromptSort::Top => self.range.cutoff_ms(now_ms),
            PromptSort::Hot | PromptSort::New => None,
        };
        PromptRepositoryQuery {
            sort: self.sort,
            created_after_ms,
            include_deleted: false,
            limit: self.effective_limit(),
            offset: self.offset.unwrap_or(0),
        }
    }
}

#[derive(Clone)]
pub struct PromptService {
    prompts: Arc<dyn PromptRepository>,
    bans: Arc<dyn BanRepository>,
    events: Arc<dyn IpEventRepository>,
    policy: ContentPolicy,
    limits: SubmissionLimits,
}

impl PromptService {
    pub fn new(
        prompts: Arc<dyn PromptRepository>,
        bans: Arc<dyn BanRepository>,
        events: Arc<dyn IpEventRepository>,
        policy: ContentPolicy,
        limits: SubmissionLimits,
    ) -> Self {
        Self {
            prompts,
            bans,
            events,
            policy,
            limits,
        }
    }

    pub async fn submit(
        &self,
        hashed_ip: &str,
        input: PromptCreate,
        now_ms: i64,
    ) -> DomainResult<Prompt> {
        if input
            .honeypot
            .as_deref()
            .is_some_and(|value| !value.is_empty())
        {
            return Err(DomainError::Validation("invalid submission".into()));
        }
        let content = validate_prompt_content(
            &self.policy,
            &input.title,
            &input.prompt_text,
            &input.name,
            input.tag.as_deref(),
        )?;

        if self.bans.is_banned(hashed_ip).await? {
            return Err(DomainError::Forbidden("access denied".into()));
        }

        let recent = self
            .events
            .count_since(
                hashed_ip,
                IpEventKind::Submit,
                self.limits.window_start(now_ms),
            )
            .await?;
        if self.limits.is_exhausted(recent) {
            tracing::info!(recent, "submission rate limit reached");
            return Err(DomainError::RateLimited(
                "too many submissions from your network, try again soon".into(),
            ));
        }

        let prompt = Prompt {
            prompt_id: crate::util::uuid_v7_without_dashes(),
            title: content.title,
            prompt_text: content.prompt_text,
            name: content.name,
            tag: content.tag,
            votes_count: 0,
            score_cached: hot_score(0, now_ms, now_ms),
            edit_token: crate::util::new_edit_token(),
            author_hashed_ip: hashed_ip.to_string(),
            is_deleted: false,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        let prompt = self.prompts.create(&prompt).await?;

        self.events
            .record(&IpEvent {
                hashed_ip: hashed_ip.to_string(),
                kind: IpEventKind::Submit,
                created_at_ms: now_ms,
            })
            .await?;

        tracing::info!(prompt_id = %prompt.prompt_id, "prompt submitted");
        Ok(prompt)
    }

    /// Updates content for the holder of the prompt's edit token. Votes and
    /// the cached score are left alone.
    pub async fn edit(
        &self,
        prompt_id: &str,
        input: PromptEdit,
        now_ms: i64,
    ) -> DomainResult<Prompt> {
        if input.edit_token.trim().is_empty() {
            return Err(DomainError::Validation("edit_token is required".into()));
        }
        let existing = self.prompts.get(prompt_id).await?;
        let authorized = existing
            .as_ref()
            .is_some_and(|prompt| prompt.edit_token == input.edit_token);
        if !authorized {
            return Err(DomainError::Forbidden(
                "edit link invalid; use the link shown after posting".into(),
            ));
        }

        let content = validate_prompt_content(
            &self.policy,
            &input.title,
            &input.prompt_text,
            &input.name,
            input.tag.as_deref(),
        )?;
        self.prompts
            .update_content(prompt_id, &content, now_ms)
            .await
    }

    pub async fn get(&self, prompt_id: &str) -> DomainResult<Prompt> {
        self.prompts
            .get(prompt_id)
            .await?
            .filter(|prompt| !prompt.is_deleted)
            .ok_or(DomainError::NotFound)
    }

    pub async fn list(&self, query: &PromptListQuery, now_ms: i64) -> DomainResult<Vec<Prompt>> {
        self.prompts
            .list(&query.to_repository_query(now_ms))
            .await
    }

    pub async fn feed(&self) -> DomainResult<Vec<Prompt>> {
        self.prompts
            .list(&PromptRepositoryQuery {
                sort: PromptSort::New,
                created_after_ms: None,
                include_deleted: false,
                limit: FEED_LIMIT,
                offset: 0,
            })
            .await
    }
}

pub fn validate_prompt_content(
    policy: &ContentPolicy,
    title: &str,
    prompt_text: &str,
    name: &str,
    tag: Option<&str>,
) -> Result<PromptContent, DomainError> {
    let title = required_field("title", title, MAX_TITLE_LENGTH)?;
    let prompt_text = required_field("prompt_text", prompt_text, MAX_PROMPT_TEXT_LENGTH)?;
    let name = required_field("name", name, MAX_NAME_LENGTH)?;

    let tag = tag
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string);
    if let Some(tag) = &tag {
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(DomainError::Validation(format!(
                "tag exceeds max length of {MAX_TAG_LENGTH}"
            )));
        }
    }

    if [&title, &prompt_text, &name]
        .into_iter()
        .any(|text| policy.contains_banned(text))
    {
        return Err(DomainError::Validation(
            "content contains inappropriate language".into(),
        ));
    }

    Ok(PromptContent {
        title,
        prompt_text,
        name,
        tag,
    })
}

fn required_field(field: &str, value: &str, max: usize) -> Result<String, DomainError> {
    let value = value.trim();
    let length = value.chars().count();
    if length == 0 || length > max {
        return Err(DomainError::Validation(format!(
            "{field} must be 1-{max} characters"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ContentPolicy {
        ContentPolicy::from_csv("spam")
    }

    #[test]
    fn trims_and_accepts_valid_content() {
        let content = validate_prompt_content(
            &policy(),
            "  Rubber duck  ",
            "Explain my code back to me",
            "ada",
            Some("  debugging "),
        )
        .expect("valid");
        assert_eq!(content.title, "Rubber duck");
        assert_eq!(content.tag.as_deref(), Some("debugging"));
    }

    #[test]
    fn blank_tag_becomes_none() {
        let content =
            validate_prompt_content(&policy(), "t", "text", "n", Some("   ")).expect("valid");
        assert_eq!(content.tag, None);
    }

    #[test]
    fn rejects_out_of_range_lengths() {
        let long_title = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(validate_prompt_content(&policy(), &long_title, "text", "n", None).is_err());
        assert!(validate_prompt_content(&policy(), "  ", "text", "n", None).is_err());
        let long_text = "x".repeat(MAX_PROMPT_TEXT_LENGTH + 1);
        assert!(validate_prompt_content(&policy(), "t", &long_text, "n", None).is_err());
        let long_name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_prompt_content(&policy(), "t", "text", &long_name, None).is_err());
        let long_tag = "x".repeat(MAX_TAG_LENGTH + 1);
        assert!(validate_prompt_content(&policy(), "t", "text", "n", Some(&long_tag)).is_err());
    }

    #[test]
    fn length_limits_count_characters_not_bytes() {
        let title = "é".repeat(MAX_TITLE_LENGTH);
        assert!(validate_prompt_content(&policy(), &title, "text", "n", None).is_ok());
    }

    #[test]
    fn rejects_banned_words_in_any_text_field() {
        assert!(validate_prompt_content(&policy(), "SPAM deal", "text", "n", None).is_err());
        assert!(validate_prompt_content(&policy(), "t", "buy spam", "n", None).is_err());
        assert!(validate_prompt_content(&policy(), "t", "text", "spammer", None).is_err());
    }

    #[test]
    fn top_range_only_applies_to_top_sort() {
        let now = 1_000 * DAY_MS;
        let top = PromptListQuery {
            sort: PromptSort::Top,
            range: TopRange::Day,
            ..PromptListQuery::default()
        };
        assert_eq!(
            top.to_repository_query(now).created_after_ms,
            Some(now - DAY_MS)
        );

        let hot = PromptListQuery {
            sort: PromptSort::Hot,
            range: TopRange::Week,
            ..PromptListQuery::default()
        };
        assert_eq!(hot.to_repository_query(now).created_after_ms, None);
    }

    #[test]
    fn list_limit_defaults_and_caps() {
        assert_eq!(PromptListQuery::default().effective_limit(), DEFAULT_LIST_LIMIT);
        let zero = PromptListQuery {
            limit: Some(0),
            ..PromptListQuery::default()
        };
        assert_eq!(zero.effective_limit(), DEFAULT_LIST_LIMIT);
        let huge = PromptListQuery {
            limit: Some(10_000),
            ..PromptListQuery::default()
        };
        assert_eq!(huge.effective_limit(), MAX_LIST_LIMIT);
    }
}
