use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::votes::Vote;

#[allow(clippy::needless_pass_by_value)]
pub trait VoteRepository: Send + Sync {
    /// Fails with `DomainError::DuplicateVote` when the address already
    /// voted on the prompt.
    fn create(&self, vote: &Vote) -> BoxFuture<'_, DomainResult<Vote>>;

    /// Drops a single vote; `false` when it was not recorded.
    fn delete(&self, prompt_id: &str, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>>;

    fn has_voted(&self, prompt_id: &str, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>>;

    /// Removes every vote on the prompt and returns how many were dropped.
    fn delete_for_prompt(&self, prompt_id: &str) -> BoxFuture<'_, DomainResult<u64>>;
}
