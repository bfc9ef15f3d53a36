use promptboard_domain::policy::{ContentPolicy, SubmissionLimits};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_env: String,
    pub port: u16,
    pub log_level: String,
    pub data_backend: String,
    pub redis_url: String,
    pub redis_prefix: String,
    pub admin_token: String,
    pub ip_salt: String,
    pub public_base_url: String,
    pub banned_words: String,
    pub submit_rate_limit_max: u64,
    pub submit_rate_limit_window_ms: i64,
    pub recompute_interval_ms: u64,
    pub recompute_concurrency: usize,
    pub worker_metrics_port: u16,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let cfg = config::Config::builder()
            .set_default("app_env", "development")?
            .set_default("port", 3000)?
            .set_default("log_level", "info")?
            .set_default("data_backend", "memory")?
            .set_default("redis_url", "redis://127.0.0.1:6379")?
            .set_default("redis_prefix", "promptboard")?
            .set_default("admin_token", "")?
            .set_default("ip_salt", "dev-salt")?
            .set_default("public_base_url", "http://localhost:3000")?
            .set_default("banned_words", "")?
            .set_default("submit_rate_limit_max", 10)?
            .set_default("submit_rate_limit_window_ms", 3_600_000)?
            .set_default("recompute_interval_ms", 900_000)?
            .set_default("recompute_concurrency", 8)?
            .set_default("worker_metrics_port", 9464)?
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        cfg.try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn uses_redis(&self) -> bool {
        self.data_backend.eq_ignore_ascii_case("redis")
    }

    pub fn content_policy(&self) -> ContentPolicy {
        ContentPolicy::from_csv(&self.banned_words)
    }

    pub fn submission_limits(&self) -> SubmissionLimits {
        SubmissionLimits {
            max_per_window: self.submit_rate_limit_max,
            window_ms: self.submit_rate_limit_window_ms,
        }
    }

    /// Link handed to a submitter so they can edit their prompt later.
    pub fn edit_url(&self, prompt_id: &str, edit_token: &str) -> String {
        format!(
            "{}/edit?token={edit_token}&id={prompt_id}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            app_env: "test".to_string(),
            port: 0,
            log_level: "info".to_string(),
            data_backend: "memory".to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_prefix: "promptboard".to_string(),
            admin_token: "secret".to_string(),
            ip_salt: "salt".to_string(),
            public_base_url: "https://prompts.example/".to_string(),
            banned_words: "spam,scam".to_string(),
            submit_rate_limit_max: 3,
            submit_rate_limit_window_ms: 60_000,
            recompute_interval_ms: 1_000,
            recompute_concurrency: 2,
            worker_metrics_port: 0,
        }
    }

    #[test]
    fn edit_url_avoids_double_slash() {
        assert_eq!(
            config().edit_url("abc", "tok"),
            "https://prompts.example/edit?token=tok&id=abc"
        );
    }

    #[test]
    fn derived_policy_and_limits_follow_fields() {
        let config = config();
        assert!(config.content_policy().contains_banned("a SCAM"));
        assert_eq!(config.submission_limits().max_per_window, 3);
        assert_eq!(config.submission_limits().window_ms, 60_000);
        assert!(!config.uses_redis());
    }
}
