mod admin;

use std::collections::HashSet;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use promptboard_domain::error::DomainError;
use promptboard_domain::jobs::now_ms;
use promptboard_domain::prompts::{
    Prompt, PromptCreate, PromptEdit, PromptListQuery, PromptSort, TopRange,
};
use promptboard_domain::util::format_ms_rfc3339;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use validator::Validate;

use crate::middleware::{
    ClientAddress, EDIT_TOKENS_COOKIE, UPVOTES_COOKIE, append_cookie_list, cookie_list,
};
use crate::{
    error::ApiError, middleware as app_middleware, observability, state::AppState, validation,
};

pub fn router(state: AppState) -> Router {
    let admin = admin::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        app_middleware::require_admin_middleware,
    ));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/v1/prompts", get(list_prompts).post(submit_prompt))
        .route("/v1/prompts/:prompt_id", get(get_prompt))
        .route("/v1/prompts/:prompt_id/edit", post(edit_prompt))
        .route("/v1/prompts/:prompt_id/upvote", post(upvote_prompt))
        .route("/v1/feed.json", get(feed))
        .merge(admin)
        .layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer());

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        if let Some(rate_limit) = app_middleware::rate_limit_layer() {
            app = app.layer(rate_limit);
        }
    }

    app.with_state(state)
}

pub(crate) fn json_body<T: DeserializeOwned>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

pub(crate) fn query_params<T: DeserializeOwned>(
    query: Result<Query<T>, QueryRejection>,
) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

fn with_cookie(
    mut response: Response,
    headers: &HeaderMap,
    name: &str,
    entry: &str,
    secure: bool,
) -> Response {
    match append_cookie_list(headers, name, entry, secure) {
        Some(cookie) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
        None => tracing::warn!(cookie = name, "cookie value not representable as a header"),
    }
    response
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
    storage: StorageHealth,
}

#[derive(Serialize)]
struct StorageHealth {
    backend: &'static str,
    status: &'static str,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = match state.db.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(
                error = %err,
                backend = state.db.backend(),
                "storage health check failed"
            );
            false
        }
    };
    let (code, status) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
        storage: StorageHealth {
            backend: state.db.backend(),
            status: if healthy { "ok" } else { "unavailable" },
        },
    };
    (code, Json(body))
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed",
        )
            .into_response(),
    }
}

/// Cookie-held state of the caller, used to flag their own posts and votes.
struct Viewer {
    edit_tokens: HashSet<String>,
    upvotes: HashSet<String>,
}

impl Viewer {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            edit_tokens: cookie_list(headers, EDIT_TOKENS_COOKIE).into_iter().collect(),
            upvotes: cookie_list(headers, UPVOTES_COOKIE).into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PromptView {
    id: String,
    title: String,
    prompt_text: String,
    name: String,
    tag: Option<String>,
    votes_count: u64,
    score: f64,
    created_at: String,
    updated_at: String,
    is_owner: bool,
    has_upvoted: bool,
}

impl PromptView {
    fn new(prompt: Prompt, viewer: &Viewer) -> Self {
        Self {
            is_owner: viewer.edit_tokens.contains(&prompt.edit_token),
            has_upvoted: viewer.upvotes.contains(&prompt.prompt_id),
            created_at: format_ms_rfc3339(prompt.created_at_ms),
            updated_at: format_ms_rfc3339(prompt.updated_at_ms),
            id: prompt.prompt_id,
            title: prompt.title,
            prompt_text: prompt.prompt_text,
            name: prompt.name,
            tag: prompt.tag,
            votes_count: prompt.votes_count,
            score: prompt.score_cached,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListPromptsParams {
    sort: Option<String>,
    range: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ListPromptsParams {
    /// Unknown sort or range values fall back to the defaults.
    fn into_query(self) -> PromptListQuery {
        let sort = match self.sort.as_deref() {
            Some("new") => PromptSort::New,
            Some("top") => PromptSort::Top,
            _ => PromptSort::Hot,
        };
        let range = match self.range.as_deref() {
            Some("7d") => TopRange::Week,
            Some("24h") => TopRange::Day,
            _ => TopRange::All,
        };
        PromptListQuery {
            sort,
            range,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Serialize)]
struct ListPromptsResponse {
    prompts: Vec<PromptView>,
    has_more: bool,
}

async fn list_prompts(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<ListPromptsParams>, QueryRejection>,
) -> Result<Json<ListPromptsResponse>, ApiError> {
    let query = query_params(params)?.into_query();
    let prompts = state.prompts.list(&query, now_ms()).await?;
    let viewer = Viewer::from_headers(&headers);
    let has_more = prompts.len() == query.effective_limit();
    Ok(Json(ListPromptsResponse {
        prompts: prompts
            .into_iter()
            .map(|prompt| PromptView::new(prompt, &viewer))
            .collect(),
        has_more,
    }))
}

async fn get_prompt(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PromptView>, ApiError> {
    let prompt = state.prompts.get(&prompt_id).await?;
    Ok(Json(PromptView::new(prompt, &Viewer::from_headers(&headers))))
}

#[derive(Debug, Deserialize)]
struct SubmitPromptRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    prompt_text: String,
    #[serde(default)]
    name: String,
    tag: Option<String>,
    honeypot: Option<String>,
}

#[derive(Serialize)]
struct SubmitPromptResponse {
    success: bool,
    id: String,
    edit_token: String,
    edit_url: String,
}

fn submission_result(err: &DomainError) -> &'static str {
    match err {
        DomainError::Validation(_) => "invalid",
        DomainError::Forbidden(_) => "banned",
        DomainError::RateLimited(_) => "rate_limited",
        _ => "error",
    }
}

async fn submit_prompt(
    State(state): State<AppState>,
    ClientAddress(hashed_ip): ClientAddress,
    headers: HeaderMap,
    payload: Result<Json<SubmitPromptRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(payload)?;
    let input = PromptCreate {
        title: payload.title,
        prompt_text: payload.prompt_text,
        name: payload.name,
        tag: payload.tag,
        honeypot: payload.honeypot,
    };
    let prompt = state
        .prompts
        .submit(&hashed_ip, input, now_ms())
        .await
        .inspect_err(|err| observability::register_submission(submission_result(err)))?;
    observability::register_submission("accepted");

    let body = SubmitPromptResponse {
        success: true,
        edit_url: state.config.edit_url(&prompt.prompt_id, &prompt.edit_token),
        id: prompt.prompt_id,
        edit_token: prompt.edit_token.clone(),
    };
    let response = (StatusCode::CREATED, Json(body)).into_response();
    Ok(with_cookie(
        response,
        &headers,
        EDIT_TOKENS_COOKIE,
        &prompt.edit_token,
        state.config.is_production(),
    ))
}

#[derive(Debug, Deserialize, Validate)]
struct EditPromptRequest {
    #[validate(length(min = 1, max = 128))]
    edit_token: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    prompt_text: String,
    #[serde(default)]
    name: String,
    tag: Option<String>,
}

#[derive(Serialize)]
struct EditPromptResponse {
    success: bool,
    prompt: PromptView,
}

async fn edit_prompt(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<EditPromptRequest>, JsonRejection>,
) -> Result<Json<EditPromptResponse>, ApiError> {
    let payload = json_body(payload)?;
    validation::validate(&payload)?;
    let input = PromptEdit {
        edit_token: payload.edit_token,
        title: payload.title,
        prompt_text: payload.prompt_text,
        name: payload.name,
        tag: payload.tag,
    };
    let prompt = state.prompts.edit(&prompt_id, input, now_ms()).await?;
    tracing::info!(prompt_id = %prompt.prompt_id, "prompt edited");
    Ok(Json(EditPromptResponse {
        success: true,
        prompt: PromptView::new(prompt, &Viewer::from_headers(&headers)),
    }))
}

#[derive(Serialize)]
struct UpvoteResponse {
    success: bool,
    votes_count: u64,
    score: f64,
}

async fn upvote_prompt(
    State(state): State<AppState>,
    Path(prompt_id): Path<String>,
    ClientAddress(hashed_ip): ClientAddress,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let receipt = state
        .votes
        .upvote(&prompt_id, &hashed_ip, now_ms())
        .await
        .inspect_err(|err| {
            observability::register_upvote(match err {
                DomainError::DuplicateVote => "duplicate",
                DomainError::Storage(_) | DomainError::Conflict => "error",
                _ => "rejected",
            })
        })?;
    observability::register_upvote("accepted");

    let response = Json(UpvoteResponse {
        success: true,
        votes_count: receipt.votes_count,
        score: receipt.score,
    })
    .into_response();
    Ok(with_cookie(
        response,
        &headers,
        UPVOTES_COOKIE,
        &receipt.prompt_id,
        state.config.is_production(),
    ))
}

#[derive(Serialize)]
struct FeedItem {
    id: String,
    title: String,
    prompt_text: String,
    name: String,
    tag: Option<String>,
    votes_count: u64,
    created_at: String,
}

#[derive(Serialize)]
struct FeedResponse {
    prompts: Vec<FeedItem>,
}

async fn feed(State(state): State<AppState>) -> Result<Json<FeedResponse>, ApiError> {
    let prompts = state
        .prompts
        .feed()
        .await?
        .into_iter()
        .map(|prompt| FeedItem {
            created_at: format_ms_rfc3339(prompt.created_at_ms),
            id: prompt.prompt_id,
            title: prompt.title,
            prompt_text: prompt.prompt_text,
            name: prompt.name,
            tag: prompt.tag,
            votes_count: prompt.votes_count,
        })
        .collect();
    Ok(Json(FeedResponse { prompts }))
}
