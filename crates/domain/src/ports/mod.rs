use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod bans;
pub mod db;
pub mod ip_events;
pub mod prompts;
pub mod votes;
