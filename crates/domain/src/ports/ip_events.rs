use crate::DomainResult;
use crate::policy::{IpEvent, IpEventKind};
use crate::ports::BoxFuture;

#[allow(clippy::needless_pass_by_value)]
pub trait IpEventRepository: Send + Sync {
    fn record(&self, event: &IpEvent) -> BoxFuture<'_, DomainResult<()>>;

    /// Events of `kind` from `hashed_ip` strictly after `since_ms`.
    fn count_since(
        &self,
        hashed_ip: &str,
        kind: IpEventKind,
        since_ms: i64,
    ) -> BoxFuture<'_, DomainResult<u64>>;
}
