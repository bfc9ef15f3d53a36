use std::sync::Arc;

use promptboard_domain::admin::AdminService;
use promptboard_domain::ports::db::DbAdapter;
use promptboard_domain::prompts::PromptService;
use promptboard_domain::scoring::ScoreMaintainer;
use promptboard_domain::votes::VoteService;
use promptboard_infra::config::AppConfig;
use promptboard_infra::repositories::{Repositories, build_repositories};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub prompts: PromptService,
    pub votes: VoteService,
    pub admin: AdminService,
    pub db: Arc<dyn DbAdapter>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let repositories = build_repositories(&config).await?;
        Ok(Self::with_repositories(config, repositories))
    }

    pub fn with_repositories(config: AppConfig, repositories: Repositories) -> Self {
        let maintainer = ScoreMaintainer::new(repositories.prompts.clone())
            .with_sweep_concurrency(config.recompute_concurrency);
        let prompts = PromptService::new(
            repositories.prompts.clone(),
            repositories.bans.clone(),
            repositories.ip_events.clone(),
            config.content_policy(),
            config.submission_limits(),
        );
        let votes = VoteService::new(
            repositories.prompts.clone(),
            repositories.votes.clone(),
            repositories.bans.clone(),
            maintainer.clone(),
        );
        let admin = AdminService::new(
            repositories.prompts,
            repositories.votes,
            repositories.bans,
            maintainer,
        );
        Self {
            config,
            prompts,
            votes,
            admin,
            db: repositories.db,
        }
    }
}
