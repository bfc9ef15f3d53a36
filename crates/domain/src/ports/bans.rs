use crate::DomainResult;
use crate::admin::IpBan;
use crate::ports::BoxFuture;

#[allow(clippy::needless_pass_by_value)]
pub trait BanRepository: Send + Sync {
    fn upsert(&self, ban: &IpBan) -> BoxFuture<'_, DomainResult<IpBan>>;

    fn is_banned(&self, hashed_ip: &str) -> BoxFuture<'_, DomainResult<bool>>;

    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<IpBan>>>;
}
