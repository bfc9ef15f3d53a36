pub mod admin;
pub mod error;
pub mod jobs;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod prompts;
pub mod ranking;
pub mod scoring;
pub mod util;
pub mod votes;

pub type DomainResult<T> = Result<T, error::DomainError>;
