//! HTTP API for the syndicate daemon.
//!
//! Provides REST endpoints under `/api/syndicate` for:
//! - Health check and ledger status
//! - Leaderboard, members, theses and trades
//! - Thesis submission (structured or forum comment)
//! - Seed deposit (SOL → USDC → piggyUSDC) and retry of a partial deposit

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use syndicate_domain::{
    evaluate_thesis, parse_thesis_from_comment, AgentId, Conviction, Direction, Member, Thesis,
    ThesisEvaluation, ThesisProposal, Trade, Treasury, TwoLegPlan,
};
use syndicate_exec::{
    CancellationToken, ChainPort, ExecError, LegOutcome, SwapOrchestrator, TradeContext,
    TwoLegOutcome,
};
use syndicate_store::LedgerStore;

use crate::error::DaemonError;

/// Route prefix for every endpoint
pub const API_PREFIX: &str = "/api/syndicate";

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<C: ChainPort + 'static, S: LedgerStore + 'static> {
    pub store: Arc<S>,
    pub orchestrator: Arc<SwapOrchestrator<C, S>>,
    pub deposit: DepositSettings,
    /// Held for the duration of a deposit or retry. Holds the confirmed
    /// first leg of a partial deposit until its second leg succeeds.
    pub deposit_lock: Mutex<Option<LegOutcome>>,
    /// Cancelled on shutdown
    pub shutdown: CancellationToken,
}

/// Fixed parameters of the deposit endpoint.
#[derive(Debug, Clone, Copy)]
pub struct DepositSettings {
    /// Native amount converted (lamports)
    pub lamports: u64,
    /// Agent credited with the trades
    pub agent_id: AgentId,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Ledger status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub syndicate: String,
    pub treasury: Treasury,
    pub member_count: usize,
    pub theses_count: usize,
    pub trade_count: usize,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<Member>,
}

#[derive(Debug, Serialize)]
pub struct ThesesResponse {
    pub theses: Vec<Thesis>,
}

#[derive(Debug, Serialize)]
pub struct TradesResponse {
    pub trades: Vec<Trade>,
}

/// Thesis submission: either a forum `comment` or structured fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThesisRequest {
    pub agent_id: AgentId,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub conviction: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Thesis submission result.
#[derive(Debug, Serialize)]
pub struct ThesisResponse {
    pub evaluation: ThesisEvaluation,
    /// Recorded thesis, present only when approved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thesis: Option<Thesis>,
}

/// Deposit outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    pub success: bool,
    /// "completed", "partial", "failed" or "busy"
    pub status: String,
    pub legs: Vec<LegOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub held_intermediate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treasury: Option<Treasury>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Structured error carried in deposit responses.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<C, S>(state: Arc<ApiState<C, S>>) -> Router
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let routes = Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/members", get(members_handler))
        .route("/theses", get(theses_handler).post(submit_thesis_handler))
        .route("/trades", get(trades_handler))
        .route("/deposit-piggy", post(deposit_handler))
        .route("/retry-piggy", post(retry_handler))
        .with_state(state);

    Router::new()
        .nest(API_PREFIX, routes)
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn status_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> Result<Json<StatusResponse>, ApiError>
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let ledger = state.store.load().await.map_err(|e| to_error_response(e.into()))?;
    Ok(Json(StatusResponse {
        member_count: ledger.members.len(),
        theses_count: ledger.theses.len(),
        trade_count: ledger.trades.len(),
        syndicate: ledger.syndicate,
        treasury: ledger.treasury,
    }))
}

async fn leaderboard_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> Result<Json<LeaderboardResponse>, ApiError>
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let leaderboard = state
        .store
        .leaderboard()
        .await
        .map_err(|e| to_error_response(e.into()))?;
    Ok(Json(LeaderboardResponse { leaderboard }))
}

async fn members_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> Result<Json<MembersResponse>, ApiError>
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let ledger = state.store.load().await.map_err(|e| to_error_response(e.into()))?;
    Ok(Json(MembersResponse {
        members: ledger.members,
    }))
}

async fn theses_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> Result<Json<ThesesResponse>, ApiError>
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let ledger = state.store.load().await.map_err(|e| to_error_response(e.into()))?;
    Ok(Json(ThesesResponse {
        theses: ledger.theses,
    }))
}

async fn trades_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> Result<Json<TradesResponse>, ApiError>
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let ledger = state.store.load().await.map_err(|e| to_error_response(e.into()))?;
    Ok(Json(TradesResponse {
        trades: ledger.trades,
    }))
}

/// Evaluate a thesis; approved ones are recorded.
async fn submit_thesis_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
    Json(req): Json<ThesisRequest>,
) -> Result<(StatusCode, Json<ThesisResponse>), ApiError>
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let agent_id = req.agent_id;
    let agent_name = req
        .agent_name
        .clone()
        .unwrap_or_else(|| format!("agent-{}", agent_id));
    let proposal = proposal_from_request(req).map_err(to_error_response)?;

    let direction: Direction = proposal
        .direction
        .parse()
        .map_err(|e: syndicate_domain::DomainError| to_error_response(e.into()))?;
    let conviction: Conviction = proposal
        .conviction
        .parse()
        .map_err(|e: syndicate_domain::DomainError| to_error_response(e.into()))?;

    let evaluation = evaluate_thesis(&proposal);
    info!(
        agent_id,
        token = %proposal.token,
        score = evaluation.score,
        approved = evaluation.approved,
        "Thesis evaluated"
    );

    if !evaluation.approved {
        return Ok((
            StatusCode::OK,
            Json(ThesisResponse {
                evaluation,
                thesis: None,
            }),
        ));
    }

    let thesis = Thesis::new(
        agent_id,
        agent_name.clone(),
        proposal.token,
        direction,
        proposal.timeframe,
        conviction,
        proposal.reasoning,
    );
    state
        .store
        .add_member(agent_id, &agent_name)
        .await
        .map_err(|e| to_error_response(e.into()))?;
    state
        .store
        .add_thesis(thesis.clone())
        .await
        .map_err(|e| to_error_response(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(ThesisResponse {
            evaluation,
            thesis: Some(thesis),
        }),
    ))
}

/// Run the seed deposit. Only one deposit runs at a time.
async fn deposit_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> (StatusCode, Json<DepositResponse>)
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let Ok(mut pending) = state.deposit_lock.try_lock() else {
        warn!("Deposit rejected, another deposit is running");
        return deposit_failure(DaemonError::DepositInProgress, "busy");
    };
    if let Some(first) = pending.as_ref() {
        warn!(first = %first.signature, "Deposit rejected, partial deposit pending");
        let held_intermediate = first.out_amount;
        let (code, mut body) =
            deposit_failure(DaemonError::PartialPending { held_intermediate }, "partial");
        body.legs = vec![first.clone()];
        body.held_intermediate = Some(held_intermediate);
        return (code, body);
    }

    let DepositSettings { lamports, agent_id } = state.deposit;
    info!(lamports, agent_id, wallet = %state.orchestrator.wallet(), "Deposit started");

    match state
        .orchestrator
        .deposit(lamports, agent_id, &state.shutdown)
        .await
    {
        Ok(TwoLegOutcome::Completed {
            first,
            second,
            treasury,
        }) => {
            info!(
                first = %first.signature,
                second = %second.signature,
                target_balance = %treasury.target_balance,
                "Deposit completed"
            );
            (
                StatusCode::OK,
                Json(DepositResponse {
                    success: true,
                    status: "completed".to_string(),
                    legs: vec![first, second],
                    held_intermediate: None,
                    treasury: Some(treasury),
                    error: None,
                }),
            )
        },
        Ok(TwoLegOutcome::Partial {
            first,
            held_intermediate,
            error,
        }) => {
            warn!(
                first = %first.signature,
                held_intermediate,
                kind = error.kind(),
                "Deposit partially completed"
            );
            *pending = Some(first.clone());
            (
                StatusCode::OK,
                Json(DepositResponse {
                    success: false,
                    status: "partial".to_string(),
                    legs: vec![first],
                    held_intermediate: Some(held_intermediate),
                    treasury: None,
                    error: Some(exec_detail(&error)),
                }),
            )
        },
        Err(e) => deposit_failure(DaemonError::Exec(e), "failed"),
    }
}

/// Re-attempt the second leg of a partial deposit.
async fn retry_handler<C, S>(
    State(state): State<Arc<ApiState<C, S>>>,
) -> (StatusCode, Json<DepositResponse>)
where
    C: ChainPort + 'static,
    S: LedgerStore + 'static,
{
    let Ok(mut pending) = state.deposit_lock.try_lock() else {
        warn!("Retry rejected, a deposit is running");
        return deposit_failure(DaemonError::DepositInProgress, "busy");
    };
    let Some(first) = pending.clone() else {
        return deposit_failure(DaemonError::NothingToRetry, "failed");
    };

    let context = TradeContext::seed_deposit(state.deposit.agent_id);
    match state
        .orchestrator
        .retry_second_leg(&TwoLegPlan::sol_to_piggy(), &first, &context, &state.shutdown)
        .await
    {
        Ok((second, treasury)) => {
            info!(
                first = %first.signature,
                second = %second.signature,
                target_balance = %treasury.target_balance,
                "Partial deposit completed"
            );
            *pending = None;
            (
                StatusCode::OK,
                Json(DepositResponse {
                    success: true,
                    status: "completed".to_string(),
                    legs: vec![first, second],
                    held_intermediate: None,
                    treasury: Some(treasury),
                    error: None,
                }),
            )
        },
        Err(e) => {
            warn!(first = %first.signature, kind = e.kind(), "Retry failed, intermediate still held");
            let held_intermediate = first.out_amount;
            let (code, mut body) = deposit_failure(DaemonError::Exec(e), "partial");
            body.legs = vec![first];
            body.held_intermediate = Some(held_intermediate);
            (code, body)
        },
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// A comment, when present, takes precedence over structured fields.
fn proposal_from_request(req: ThesisRequest) -> Result<ThesisProposal, DaemonError> {
    if let Some(comment) = req.comment {
        let mut proposal = parse_thesis_from_comment(&comment).ok_or_else(|| {
            DaemonError::InvalidRequest("comment has no Token: line".to_string())
        })?;
        proposal.direction = proposal.direction.to_lowercase();
        return Ok(proposal);
    }

    let token = req
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DaemonError::InvalidRequest("token or comment is required".to_string()))?;

    Ok(ThesisProposal {
        token,
        direction: req.direction.unwrap_or_else(|| "long".to_string()).to_lowercase(),
        timeframe: req.timeframe.unwrap_or_else(|| "3d".to_string()),
        conviction: req
            .conviction
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_else(|| "medium".to_string()),
        reasoning: req.reasoning.unwrap_or_default(),
    })
}

fn exec_detail(error: &ExecError) -> ErrorDetail {
    ErrorDetail {
        kind: error.kind().to_string(),
        message: error.to_string(),
    }
}

fn deposit_failure(error: DaemonError, status: &str) -> (StatusCode, Json<DepositResponse>) {
    let (code, detail) = match &error {
        DaemonError::Exec(e) => (exec_status(e), exec_detail(e)),
        DaemonError::DepositInProgress => (
            StatusCode::CONFLICT,
            ErrorDetail {
                kind: "deposit_in_progress".to_string(),
                message: error.to_string(),
            },
        ),
        DaemonError::PartialPending { .. } => (
            StatusCode::CONFLICT,
            ErrorDetail {
                kind: "partial_pending".to_string(),
                message: error.to_string(),
            },
        ),
        DaemonError::NothingToRetry => (
            StatusCode::CONFLICT,
            ErrorDetail {
                kind: "nothing_to_retry".to_string(),
                message: error.to_string(),
            },
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorDetail {
                kind: "internal".to_string(),
                message: other.to_string(),
            },
        ),
    };
    (
        code,
        Json(DepositResponse {
            success: false,
            status: status.to_string(),
            legs: Vec::new(),
            held_intermediate: None,
            treasury: None,
            error: Some(detail),
        }),
    )
}

fn exec_status(error: &ExecError) -> StatusCode {
    match error {
        ExecError::RoutingService { .. }
        | ExecError::MalformedTransaction(_)
        | ExecError::ExecutionRejected { .. }
        | ExecError::Broadcast { .. }
        | ExecError::TransactionFailed { .. }
        | ExecError::Rpc(_) => StatusCode::BAD_GATEWAY,
        ExecError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ExecError::AlreadyExecuted(_) => StatusCode::CONFLICT,
        ExecError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ExecError::Domain(_) => StatusCode::BAD_REQUEST,
        ExecError::Config(_) | ExecError::Journal(_) | ExecError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}

fn to_error_response(error: DaemonError) -> ApiError {
    let status = match &error {
        DaemonError::Domain(_) | DaemonError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        DaemonError::Store(syndicate_store::StoreError::Duplicate { .. }) => StatusCode::CONFLICT,
        DaemonError::Store(syndicate_store::StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DaemonError::DepositInProgress
        | DaemonError::PartialPending { .. }
        | DaemonError::NothingToRetry => StatusCode::CONFLICT,
        DaemonError::Exec(e) => exec_status(e),
        DaemonError::Store(_) | DaemonError::Config(_) | DaemonError::Server(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// =============================================================================
// Tests
// =============================================================================
