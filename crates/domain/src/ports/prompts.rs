use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::prompts::{Prompt, PromptContent, PromptSort};
use crate::scoring::{ScoreSnapshot, ScoreUpdate};

#[derive(Clone, Debug, PartialEq)]
pub struct PromptRepositoryQuery {
    pub sort: PromptSort,
    pub created_after_ms: Option<i64>,
    pub include_deleted: bool,
    pub limit: usize,
    pub offset: usize,
}

/// Storage for prompts and their cached ranking score.
///
/// Score writes go through `compare_and_set_score`, which must apply the
/// update only while the stored vote count still equals `expected_votes`,
/// atomically with respect to every other write on the same prompt.
#[allow(clippy::needless_pass_by_value)]
pub trait PromptRepository: Send + Sync {
    fn create(&self, prompt: &Prompt) -> BoxFuture<'_, DomainResult<Prompt>>;

    fn get(&self, prompt_id: &str) -> BoxFuture<'_, DomainResult<Option<Prompt>>>;

    fn update_content(
        &self,
        prompt_id: &str,
        content: &PromptContent,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Prompt>>;

    fn set_deleted(&self, prompt_id: &str, is_deleted: bool)
    -> BoxFuture<'_, DomainResult<Prompt>>;

    fn list(&self, query: &PromptRepositoryQuery) -> BoxFuture<'_, DomainResult<Vec<Prompt>>>;

    fn score_snapshot(&self, prompt_id: &str)
    -> BoxFuture<'_, DomainResult<Option<ScoreSnapshot>>>;

    /// Snapshots of every prompt that is not soft-deleted.
    fn list_live_snapshots(&self) -> BoxFuture<'_, DomainResult<Vec<ScoreSnapshot>>>;

    /// Returns `false` when the stored vote count moved away from
    /// `expected_votes`; nothing is written in that case.
    fn compare_and_set_score(
        &self,
        prompt_id: &str,
        expected_votes: u64,
        update: &ScoreUpdate,
    ) -> BoxFuture<'_, DomainResult<bool>>;

    fn store_score(&self, prompt_id: &str, update: &ScoreUpdate)
    -> BoxFuture<'_, DomainResult<()>>;
}
