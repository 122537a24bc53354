//! Axum REST API over the escrow ledger.
//!
//! Mutating routes identify the caller by the `x-caller-identity` header;
//! authentication of that header is the deployment's concern.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use milestone_escrow::{
    Amount, Campaign, CampaignDraft, CampaignId, EscrowLedger, Identity, LedgerError, Milestone,
    MilestoneIndex, MilestoneSpec,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db;
use crate::errors::{ApiError, Result};
use crate::events::EventRecord;

pub const CALLER_HEADER: &str = "x-caller-identity";

const DEFAULT_PAGE: usize = 20;
const MAX_PAGE: usize = 100;

#[derive(Clone)]
pub struct ApiState {
    pub ledger: Arc<EscrowLedger>,
    pub pool: SqlitePool,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/campaigns", post(create_campaign).get(list_active_campaigns))
        .route("/campaigns/count", get(campaign_count))
        .route("/campaigns/:id", get(get_campaign))
        .route("/campaigns/:id/fund", post(fund_campaign))
        .route("/campaigns/:id/cancel", post(cancel_campaign))
        .route("/campaigns/:id/refund", post(claim_refund))
        .route("/campaigns/:id/events", get(get_campaign_events))
        .route("/campaigns/:id/contributions/:backer", get(get_contribution))
        .route("/campaigns/:id/milestones", get(get_milestones))
        .route("/campaigns/:id/milestones/:index", get(get_milestone))
        .route("/campaigns/:id/milestones/:index/start", post(start_milestone))
        .route("/campaigns/:id/milestones/:index/complete", post(complete_milestone))
        .route("/campaigns/:id/milestones/:index/fail", post(fail_milestone))
        .route("/events", get(get_all_events))
        .route("/admin/pause", post(pause))
        .route("/admin/unpause", post(unpause))
        .route("/admin/authority", post(transfer_authority))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Caller extraction
// ─────────────────────────────────────────────────────────

/// Identity of the party making a mutating request.
pub struct Caller(pub Identity);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Caller(Identity::new(value)))
            .ok_or(ApiError::MissingCaller)
    }
}

/// JSON request body whose rejections use the API error shape.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub title: String,
    pub description: String,
    pub funding_goal: Amount,
    pub duration_days: u64,
    pub milestone_titles: Vec<String>,
    pub milestone_descriptions: Vec<String>,
    pub milestone_percentages: Vec<u32>,
    pub milestone_durations: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct FundRequest {
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct AuthorityRequest {
    pub new_authority: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub start: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct CampaignsResponse {
    pub count: usize,
    pub campaigns: Vec<Campaign>,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Serialize)]
pub struct PayoutResponse {
    pub campaign_id: CampaignId,
    pub amount: Amount,
}

#[derive(Serialize)]
pub struct ContributionResponse {
    pub campaign_id: CampaignId,
    pub backer: Identity,
    pub amount: Amount,
}

#[derive(Serialize)]
pub struct ProtocolResponse {
    pub authority: Identity,
    pub paused: bool,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub campaign_id: CampaignId,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /campaigns`
pub async fn create_campaign(
    State(state): State<Arc<ApiState>>,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>)> {
    let milestones = MilestoneSpec::zip(
        req.milestone_titles,
        req.milestone_descriptions,
        req.milestone_percentages,
        req.milestone_durations,
    )
    .map_err(LedgerError::from)?;
    let draft = CampaignDraft {
        title: req.title,
        description: req.description,
        funding_goal: req.funding_goal,
        duration_days: req.duration_days,
        milestones,
    };
    let campaign = state.ledger.create_campaign(&caller, draft)?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// `GET /campaigns?start&limit`
///
/// Active campaigns in id order. `limit` defaults to 20 and is capped at 100.
pub async fn list_active_campaigns(
    State(state): State<Arc<ApiState>>,
    Query(page): Query<PageParams>,
) -> Json<CampaignsResponse> {
    let limit = page.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
    let campaigns = state
        .ledger
        .active_campaigns(page.start.unwrap_or(0), limit);
    Json(CampaignsResponse {
        count: campaigns.len(),
        campaigns,
    })
}

/// `GET /campaigns/count`
pub async fn campaign_count(State(state): State<Arc<ApiState>>) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.ledger.campaign_count(),
    })
}

/// `GET /campaigns/:id`
pub async fn get_campaign(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> Result<Json<Campaign>> {
    Ok(Json(state.ledger.get_campaign(id)?))
}

/// `GET /campaigns/:id/milestones`
pub async fn get_milestones(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> Result<Json<Vec<Milestone>>> {
    Ok(Json(state.ledger.get_milestones(id)?))
}

/// `GET /campaigns/:id/milestones/:index`
pub async fn get_milestone(
    State(state): State<Arc<ApiState>>,
    Path((id, index)): Path<(CampaignId, MilestoneIndex)>,
) -> Result<Json<Milestone>> {
    Ok(Json(state.ledger.get_milestone(id, index)?))
}

/// `POST /campaigns/:id/fund`
pub async fn fund_campaign(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<FundRequest>,
) -> Result<Json<Campaign>> {
    Ok(Json(state.ledger.fund_campaign(id, req.amount, &caller)?))
}

/// `POST /campaigns/:id/milestones/:index/start`
pub async fn start_milestone(
    State(state): State<Arc<ApiState>>,
    Path((id, index)): Path<(CampaignId, MilestoneIndex)>,
    Caller(caller): Caller,
) -> Result<Json<Milestone>> {
    Ok(Json(state.ledger.start_milestone(id, index, &caller)?))
}

/// `POST /campaigns/:id/milestones/:index/complete`
///
/// Responds 502 when the milestone was approved but the payout failed; the
/// release is not retried.
pub async fn complete_milestone(
    State(state): State<Arc<ApiState>>,
    Path((id, index)): Path<(CampaignId, MilestoneIndex)>,
    Caller(caller): Caller,
) -> Result<Json<PayoutResponse>> {
    let amount = state.ledger.complete_milestone(id, index, &caller).await?;
    Ok(Json(PayoutResponse {
        campaign_id: id,
        amount,
    }))
}

/// `POST /campaigns/:id/milestones/:index/fail`
pub async fn fail_milestone(
    State(state): State<Arc<ApiState>>,
    Path((id, index)): Path<(CampaignId, MilestoneIndex)>,
    Caller(caller): Caller,
) -> Result<Json<Campaign>> {
    state.ledger.fail_milestone(id, index, &caller)?;
    Ok(Json(state.ledger.get_campaign(id)?))
}

/// `POST /campaigns/:id/cancel`
pub async fn cancel_campaign(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
    Caller(caller): Caller,
) -> Result<Json<Campaign>> {
    state.ledger.cancel_campaign(id, &caller)?;
    Ok(Json(state.ledger.get_campaign(id)?))
}

/// `POST /campaigns/:id/refund`
pub async fn claim_refund(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
    Caller(caller): Caller,
) -> Result<Json<PayoutResponse>> {
    let amount = state.ledger.claim_refund(id, &caller).await?;
    Ok(Json(PayoutResponse {
        campaign_id: id,
        amount,
    }))
}

/// `GET /campaigns/:id/contributions/:backer`
pub async fn get_contribution(
    State(state): State<Arc<ApiState>>,
    Path((id, backer)): Path<(CampaignId, String)>,
) -> Result<Json<ContributionResponse>> {
    let backer = Identity::new(backer);
    let amount = state.ledger.contribution_of(id, &backer)?;
    Ok(Json(ContributionResponse {
        campaign_id: id,
        backer,
        amount,
    }))
}

/// `GET /campaigns/:id/events`
///
/// Journaled events for one campaign, in publication order.
pub async fn get_campaign_events(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<CampaignId>,
) -> Result<Json<EventsResponse>> {
    state.ledger.get_campaign(id)?;
    let key = i64::try_from(id).unwrap_or(i64::MAX);
    let events = db::get_events_for_campaign(&state.pool, key).await?;
    Ok(Json(EventsResponse {
        campaign_id: id,
        count: events.len(),
        events,
    }))
}

/// `GET /events`
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> Result<Json<AllEventsResponse>> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}

/// `POST /admin/pause`
pub async fn pause(
    State(state): State<Arc<ApiState>>,
    Caller(caller): Caller,
) -> Result<Json<ProtocolResponse>> {
    state.ledger.pause(&caller)?;
    Ok(Json(protocol_status(&state.ledger)))
}

/// `POST /admin/unpause`
pub async fn unpause(
    State(state): State<Arc<ApiState>>,
    Caller(caller): Caller,
) -> Result<Json<ProtocolResponse>> {
    state.ledger.unpause(&caller)?;
    Ok(Json(protocol_status(&state.ledger)))
}

/// `POST /admin/authority`
pub async fn transfer_authority(
    State(state): State<Arc<ApiState>>,
    Caller(caller): Caller,
    JsonBody(req): JsonBody<AuthorityRequest>,
) -> Result<Json<ProtocolResponse>> {
    state
        .ledger
        .transfer_authority(&caller, Identity::new(req.new_authority))?;
    Ok(Json(protocol_status(&state.ledger)))
}

fn protocol_status(ledger: &EscrowLedger) -> ProtocolResponse {
    ProtocolResponse {
        authority: ledger.authority(),
        paused: ledger.is_paused(),
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
