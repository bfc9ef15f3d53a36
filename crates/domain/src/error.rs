use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("upvote already counted from your network for this prompt")]
    DuplicateVote,
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("storage failure: {0}")]
    Storage(String),
}
