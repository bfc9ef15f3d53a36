use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    routing::{get, post},
};
use promptboard_domain::admin::IpBan;
use promptboard_domain::jobs::now_ms;
use promptboard_domain::prompts::{DEFAULT_LIST_LIMIT, Prompt};
use promptboard_domain::util::format_ms_rfc3339;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{json_body, query_params};
use crate::{error::ApiError, observability, state::AppState, validation};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/prompts", get(list_prompts))
        .route("/v1/admin/prompts/:prompt_id/delete", post(set_deleted))
        .route("/v1/admin/prompts/:prompt_id/wipe-votes", post(wipe_votes))
        .route("/v1/admin/bans", get(list_bans).post(ban_ip))
        .route("/v1/admin/recompute-hot", post(recompute_hot))
}

#[derive(Debug, Serialize)]
struct AdminPromptView {
    id: String,
    title: String,
    prompt_text: String,
    name: String,
    tag: Option<String>,
    votes_count: u64,
    score: f64,
    is_deleted: bool,
    author_hashed_ip: String,
    created_at: String,
    updated_at: String,
}

impl From<Prompt> for AdminPromptView {
    fn from(prompt: Prompt) -> Self {
        Self {
            created_at: format_ms_rfc3339(prompt.created_at_ms),
            updated_at: format_ms_rfc3339(prompt.updated_at_ms),
            id: prompt.prompt_id,
            title: prompt.title,
            prompt_text: prompt.prompt_text,
            name: prompt.name,
            tag: prompt.tag,
            votes_count: prompt.votes_count,
            score: prompt.score_cached,
            is_deleted: prompt.is_deleted,
            author_hashed_ip: prompt.author_hashed_ip,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
struct AdminListParams {
    #[validate(range(min = 1, max = 100))]
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Serialize)]
struct AdminListResponse {
    prompts: Vec<AdminPromptView>,
    has_more: bool,
}

async fn list_prompts(
    State(state): State<AppState>,
    params: Result<Query<AdminListParams>, QueryRejection>,
) -> Result<Json<AdminListResponse>, ApiError> {
    let params = query_params(params)?;
    validation::validate(&params)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let prompts = state
        .admin
        .list_prompts(limit, params.offset.unwrap_or(0))
        .await?;
    Ok(Json(AdminListResponse {
        has_more: prompts.len() == limit,
        prompts: prompts.into_iter().map(AdminPromptView::from).collect(),
    }))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct SetDeletedRequest {
    #[serde(default = "default_true")]
    is_deleted: bool,
}

#[derive(Serialize)]
struct SetDeletedResponse {
    success: bool,
    id: String,
    is_deleted: bool,
}

async fn set_deleted(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
    payload: Result<Json<SetDeletedRequest>, JsonRejection>,
) -> Result<Json<SetDeletedResponse>, ApiError> {
    let payload = json_body(payload)?;
    let prompt = state
        .admin
        .set_deleted(&prompt_id, payload.is_deleted)
        .await?;
    Ok(Json(SetDeletedResponse {
        success: true,
        id: prompt.prompt_id,
        is_deleted: prompt.is_deleted,
    }))
}

#[derive(Serialize)]
struct WipeVotesResponse {
    success: bool,
    votes_removed: u64,
    votes_count: u64,
    score: f64,
}

async fn wipe_votes(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
) -> Result<Json<WipeVotesResponse>, ApiError> {
    let wipe = state.admin.wipe_votes(&prompt_id, now_ms()).await?;
    Ok(Json(WipeVotesResponse {
        success: true,
        votes_removed: wipe.votes_removed,
        votes_count: wipe.score.votes_count,
        score: wipe.score.score_cached,
    }))
}

#[derive(Serialize)]
struct BanView {
    hashed_ip: String,
    reason: String,
    created_at: String,
    updated_at: String,
}

impl From<IpBan> for BanView {
    fn from(ban: IpBan) -> Self {
        Self {
            created_at: format_ms_rfc3339(ban.created_at_ms),
            updated_at: format_ms_rfc3339(ban.updated_at_ms),
            hashed_ip: ban.hashed_ip,
            reason: ban.reason,
        }
    }
}

#[derive(Serialize)]
struct BanListResponse {
    bans: Vec<BanView>,
}

async fn list_bans(State(state): State<AppState>) -> Result<Json<BanListResponse>, ApiError> {
    let bans = state.admin.list_bans().await?;
    Ok(Json(BanListResponse {
        bans: bans.into_iter().map(BanView::from).collect(),
    }))
}

#[derive(Debug, Deserialize, Validate)]
struct BanRequest {
    #[validate(length(min = 1, max = 128))]
    hashed_ip: String,
    #[validate(length(max = 500))]
    reason: Option<String>,
}

#[derive(Serialize)]
struct BanResponse {
    success: bool,
    ban: BanView,
}

async fn ban_ip(
    State(state): State<AppState>,
    payload: Result<Json<BanRequest>, JsonRejection>,
) -> Result<Json<BanResponse>, ApiError> {
    let payload = json_body(payload)?;
    validation::validate(&payload)?;
    let ban = state
        .admin
        .ban_ip(
            &payload.hashed_ip,
            payload.reason.as_deref().unwrap_or_default(),
            now_ms(),
        )
        .await?;
    Ok(Json(BanResponse {
        success: true,
        ban: ban.into(),
    }))
}

#[derive(Serialize)]
struct RecomputeResponse {
    success: bool,
    scanned: u64,
    updated: u64,
    superseded: u64,
    failed: u64,
}

async fn recompute_hot(State(state): State<AppState>) -> Result<Json<RecomputeResponse>, ApiError> {
    let started = Instant::now();
    let report = state.admin.recompute_hot(now_ms()).await?;
    observability::register_recompute(&report, started.elapsed());
    tracing::info!(
        scanned = report.scanned,
        updated = report.updated,
        superseded = report.superseded,
        failed = report.failed,
        "admin recompute finished"
    );
    Ok(Json(RecomputeResponse {
        success: true,
        scanned: report.scanned,
        updated: report.updated,
        superseded: report.superseded,
        failed: report.failed,
    }))
}
